//! Ubuntu LTS family
//!
//! `meta-release-lts` is a list of blank-line separated blocks:
//!
//! ```text
//! Dist: noble
//! Name: Noble Numbat
//! Version: 24.04.1 LTS
//! Date: Thu, 25 April 2024 22:12:00 UTC
//! Supported: 1
//! ```
//!
//! Every supported block yields five flavour torrents built from the version
//! and codename.

use super::Provider;
use crate::config::{ProviderSettings, UbuntuScope};
use crate::error::{Error, Result};
use crate::http::HttpFetcher;
use crate::types::{ProviderId, ReleaseCandidate};
use crate::version;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Default meta-release feed
pub const META_RELEASE_LTS_URL: &str = "https://changelogs.ubuntu.com/meta-release-lts";

#[allow(clippy::expect_used)]
static SUPPORTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Supported:\s*1\s*$").expect("supported regex is valid"));
#[allow(clippy::expect_used)]
static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Version:\s*([\d.]+)").expect("version regex is valid"));
#[allow(clippy::expect_used)]
static DIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Dist:\s*(\w+)").expect("dist regex is valid"));

/// A supported LTS release from the feed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LtsRelease {
    /// Point version, e.g. `24.04.1`
    pub version: String,
    /// Codename, e.g. `noble`
    pub codename: String,
}

/// Parse `meta-release-lts`, keeping supported releases, newest first
///
/// # Errors
/// A supported block without `Version:` or `Dist:`
pub fn parse_meta_release(text: &str) -> Result<Vec<LtsRelease>> {
    let text = text.replace("\r\n", "\n");
    let mut releases = Vec::new();

    for block in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        if !SUPPORTED.is_match(block) {
            continue;
        }
        let version = VERSION
            .captures(block)
            .map(|c| c[1].trim_end_matches('.').to_string())
            .ok_or_else(|| Error::parse("ubuntu", "supported release without a Version field"))?;
        let codename = DIST
            .captures(block)
            .map(|c| c[1].to_string())
            .ok_or_else(|| Error::parse("ubuntu", format!("release {version} without a Dist field")))?;
        releases.push(LtsRelease { version, codename });
    }

    releases.sort_by(|a, b| version::compare(&b.version, &a.version));
    Ok(releases)
}

/// Torrents published for one LTS release
pub fn candidates_for(release: &LtsRelease) -> Vec<ReleaseCandidate> {
    let LtsRelease { version: v, codename: c } = release;
    vec![
        ReleaseCandidate::new(
            format!("ubuntu-{v}-desktop"),
            format!("https://releases.ubuntu.com/{c}/ubuntu-{v}-desktop-amd64.iso.torrent"),
        ),
        ReleaseCandidate::new(
            format!("ubuntu-{v}-live-server"),
            format!("https://releases.ubuntu.com/{c}/ubuntu-{v}-live-server-amd64.iso.torrent"),
        ),
        ReleaseCandidate::new(
            format!("lubuntu-{v}-desktop"),
            format!(
                "https://cdimage.ubuntu.com/lubuntu/releases/{c}/release/lubuntu-{v}-desktop-amd64.iso.torrent"
            ),
        ),
        ReleaseCandidate::new(
            format!("xubuntu-{v}-desktop"),
            format!(
                "https://torrent.ubuntu.com/xubuntu/releases/{c}/release/desktop/xubuntu-{v}-desktop-amd64.iso.torrent"
            ),
        ),
        ReleaseCandidate::new(
            format!("xubuntu-{v}-minimal"),
            format!(
                "https://torrent.ubuntu.com/xubuntu/releases/{c}/release/minimal/xubuntu-{v}-minimal-amd64.iso.torrent"
            ),
        ),
    ]
}

/// Ubuntu, Lubuntu and Xubuntu LTS images
pub struct UbuntuProvider {
    settings: ProviderSettings,
    scope: UbuntuScope,
    endpoint: String,
}

impl UbuntuProvider {
    /// Provider reading the public meta-release feed
    pub fn new(settings: ProviderSettings, scope: UbuntuScope) -> Self {
        Self {
            settings,
            scope,
            endpoint: META_RELEASE_LTS_URL.to_string(),
        }
    }

    /// Read the feed from another URL (mirrors, tests)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Provider for UbuntuProvider {
    fn id(&self) -> ProviderId {
        ProviderId::from("ubuntu")
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    async fn discover(&self, http: &HttpFetcher) -> Result<Vec<ReleaseCandidate>> {
        let text = http.get_text(&self.endpoint).await?;
        let mut releases = parse_meta_release(&text)?;
        if releases.is_empty() {
            return Err(Error::parse("ubuntu", "no supported LTS release in meta-release feed"));
        }
        if self.scope == UbuntuScope::Latest {
            releases.truncate(1);
        }

        for release in &releases {
            debug!(version = %release.version, codename = %release.codename, "supported LTS release");
        }
        info!(
            releases = releases.len(),
            newest = %releases[0].version,
            "discovered Ubuntu LTS releases"
        );

        Ok(releases.iter().flat_map(candidates_for).collect())
    }
}
