//! Core types for distro-torrents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Identifier for a release provider (e.g. `ubuntu`, `listing:fedora`)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Create a new ProviderId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A torrent file that a provider believes belongs to the current release
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseCandidate {
    /// Stable file stem; the sink writes `{name}.torrent`
    pub name: String,

    /// Absolute URL of the torrent metadata
    pub source_url: String,

    /// Display name used for allow-list filtering (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ReleaseCandidate {
    /// Create a candidate whose label is its name
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            label: None,
        }
    }

    /// Attach a display label used by allow-list filters
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The name filters should match against
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// What happened to a single provider during a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProviderOutcome {
    /// Toggle was off; no network calls were made
    Disabled,
    /// Discovery succeeded but nothing qualified
    Empty,
    /// Discovery produced candidates, which were passed through the sink
    Completed {
        /// Number of candidates the provider returned
        candidates: usize,
        /// Number of new torrent files written
        saved: usize,
    },
    /// Discovery failed
    Failed {
        /// Diagnostic message
        error: String,
    },
}

impl ProviderOutcome {
    /// A provider counts as successful if it returned a non-empty, non-failing result
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ProviderOutcome::Completed { .. })
    }
}

/// Per-run tally, logged at the end of every invocation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTally {
    /// Providers whose discovery produced candidates
    pub providers_succeeded: usize,
    /// Providers that failed or found nothing
    pub providers_failed: usize,
    /// Providers skipped because their toggle was off
    pub providers_disabled: usize,
    /// Torrent files written this run
    pub torrents_saved: usize,
    /// Candidates already present in the watch directory
    pub torrents_skipped: usize,
    /// Candidates whose retrieval failed
    pub fetch_failures: usize,
}

impl RunTally {
    /// Fold a provider outcome into the tally
    pub fn record_provider(&mut self, outcome: &ProviderOutcome) {
        match outcome {
            ProviderOutcome::Disabled => self.providers_disabled += 1,
            o if o.is_success() => self.providers_succeeded += 1,
            _ => self.providers_failed += 1,
        }
    }
}

/// Result of one complete run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Outcome per provider, in registry order
    pub providers: Vec<(ProviderId, ProviderOutcome)>,
    /// Aggregated counters
    pub tally: RunTally,
}

/// Event emitted while a run progresses
///
/// Subscribers receive these through the broadcast channel handed to the
/// [`Runner`](crate::runner::Runner) and [`FetchSink`](crate::sink::FetchSink).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Provider toggle was off
    ProviderDisabled {
        /// Provider ID
        provider: ProviderId,
    },

    /// Provider discovery finished
    ProviderDiscovered {
        /// Provider ID
        provider: ProviderId,
        /// Number of candidates found
        candidates: usize,
    },

    /// Provider discovery failed
    ProviderFailed {
        /// Provider ID
        provider: ProviderId,
        /// Error message
        error: String,
    },

    /// Torrent already present in the watch directory (or its `.added` marker)
    TorrentSkipped {
        /// Candidate name
        name: String,
    },

    /// New torrent file committed
    TorrentSaved {
        /// Candidate name
        name: String,
        /// Final path in the watch directory
        path: PathBuf,
        /// Size in bytes
        size_bytes: u64,
    },

    /// Retrieval or commit of a torrent file failed
    FetchFailed {
        /// Candidate name
        name: String,
        /// Source URL
        url: String,
        /// Error message
        error: String,
    },

    /// Cleanup removed (or would remove) an outdated torrent from the client
    TorrentRemoved {
        /// Torrent name as reported by the client
        name: String,
        /// Whether this was a dry run
        dry_run: bool,
    },

    /// Run finished
    RunComplete {
        /// Final tally
        tally: RunTally,
    },
}
