//! Arch Linux monthly ISO via the releng JSON API

use super::Provider;
use crate::config::ProviderSettings;
use crate::error::{Error, Result};
use crate::http::HttpFetcher;
use crate::types::{ProviderId, ReleaseCandidate};
use crate::version::{self, DottedVersion};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;
use url::Url;

/// Default releng endpoint
pub const RELENG_URL: &str = "https://archlinux.org/releng/releases/json/";

/// Top-level releng document (only the fields we read)
#[derive(Debug, Deserialize)]
pub struct RelengFeed {
    /// Version the site currently advertises
    #[serde(default)]
    pub latest_version: Option<String>,
    /// Every release the site knows about
    #[serde(default)]
    pub releases: Vec<RelengRelease>,
}

/// One entry of `releases`
#[derive(Debug, Deserialize)]
pub struct RelengRelease {
    /// Release date as version, e.g. `2024.10.01`
    pub version: String,
    /// Whether images are published
    #[serde(default)]
    pub available: bool,
    /// Torrent location, usually relative to the site root
    #[serde(default)]
    pub torrent_url: Option<String>,
}

impl RelengFeed {
    /// The release to fetch: `latest_version` when it has a torrent, otherwise
    /// the highest available release with one
    pub fn current(&self) -> Option<&RelengRelease> {
        let downloadable = |r: &&RelengRelease| r.available && r.torrent_url.is_some();

        if let Some(latest) = &self.latest_version
            && let Some(release) = self
                .releases
                .iter()
                .filter(downloadable)
                .find(|r| &r.version == latest)
        {
            return Some(release);
        }

        version::max_by_version(self.releases.iter().filter(downloadable), |r| {
            DottedVersion::parse(&r.version)
        })
    }
}

/// Arch Linux x86_64 ISO
pub struct ArchProvider {
    settings: ProviderSettings,
    endpoint: String,
}

impl ArchProvider {
    /// Provider reading archlinux.org
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            endpoint: RELENG_URL.to_string(),
        }
    }

    /// Read the feed from another URL (mirrors, tests)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Turn a parsed feed into the candidate for the current release
    ///
    /// # Errors
    /// No downloadable release, or a torrent URL that cannot be resolved
    pub fn candidate_from_feed(&self, feed: &RelengFeed) -> Result<ReleaseCandidate> {
        let release = feed
            .current()
            .ok_or_else(|| Error::parse("arch", "no available release with a torrent"))?;
        let torrent_url = release.torrent_url.as_deref().unwrap_or_default();

        let base = Url::parse(&self.endpoint)
            .map_err(|e| Error::parse("arch", format!("bad endpoint {}: {e}", self.endpoint)))?;
        let source = base
            .join(torrent_url)
            .map_err(|e| Error::parse("arch", format!("bad torrent_url '{torrent_url}': {e}")))?;

        Ok(ReleaseCandidate::new(
            format!("archlinux-{}-x86_64", release.version),
            source.to_string(),
        ))
    }
}

#[async_trait]
impl Provider for ArchProvider {
    fn id(&self) -> ProviderId {
        ProviderId::from("arch")
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    async fn discover(&self, http: &HttpFetcher) -> Result<Vec<ReleaseCandidate>> {
        let feed: RelengFeed = http.get_json(&self.endpoint).await?;
        let candidate = self.candidate_from_feed(&feed)?;
        info!(name = %candidate.name, "detected Arch Linux release");
        Ok(vec![candidate])
    }
}
