//! Directory-listing providers
//!
//! A listing provider scans one or more index pages for links accepted by a
//! [`SuffixMatcher`] and turns one link per page into a candidate. Debian's
//! `bt-dvd`/`bt-cd` directories list DVD-1/CD-1 first, so the Debian preset
//! takes the first match; user-defined listings can instead pick the link
//! with the highest version in its file name.
//!
//! A page without matching links is a normal outcome (nothing published
//! yet, or a mirror mid-sync) and contributes no candidates.

use super::Provider;
use crate::config::{ListingConfig, ListingSelection, ProviderSettings};
use crate::error::{Error, Result};
use crate::html::{self, LinkMatcher, SuffixMatcher};
use crate::http::HttpFetcher;
use crate::types::{ProviderId, ReleaseCandidate};
use crate::version;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

/// Debian stable torrent directories (amd64/arm64, DVD/CD)
pub const DEBIAN_LISTINGS: [&str; 4] = [
    "https://cdimage.debian.org/debian-cd/current/amd64/bt-dvd/",
    "https://cdimage.debian.org/debian-cd/current/arm64/bt-dvd/",
    "https://cdimage.debian.org/debian-cd/current/amd64/bt-cd/",
    "https://cdimage.debian.org/debian-cd/current/arm64/bt-cd/",
];

/// Scans index pages for torrent links
pub struct ListingProvider {
    id: ProviderId,
    settings: ProviderSettings,
    urls: Vec<String>,
    matcher: SuffixMatcher,
    selection: ListingSelection,
}

impl ListingProvider {
    /// Provider with an explicit id and page list
    pub fn new(
        id: impl Into<String>,
        settings: ProviderSettings,
        urls: Vec<String>,
        suffix: impl Into<String>,
        selection: ListingSelection,
    ) -> Self {
        Self {
            id: ProviderId::new(id),
            settings,
            urls,
            matcher: SuffixMatcher::new(suffix),
            selection,
        }
    }

    /// Debian stable, first `.iso.torrent` per directory
    pub fn debian(settings: ProviderSettings) -> Self {
        Self::new(
            "debian",
            settings,
            DEBIAN_LISTINGS.iter().map(|u| u.to_string()).collect(),
            ".iso.torrent",
            ListingSelection::First,
        )
    }

    /// User-defined listing; id is `listing:<name>`
    pub fn from_config(config: &ListingConfig) -> Self {
        Self::new(
            format!("listing:{}", config.name),
            config.settings.clone(),
            config.urls.clone(),
            config.suffix.clone(),
            config.selection,
        )
    }

    /// Replace the pages to scan (mirrors, tests)
    #[must_use]
    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    /// Pick the release link from a page according to the selection rule
    pub fn select<'a>(&self, links: &'a [String]) -> Option<&'a str> {
        match self.selection {
            ListingSelection::First => links.first().map(String::as_str),
            ListingSelection::HighestVersion => {
                version::max_by_version(links.iter().map(String::as_str), |href| {
                    version::find_embedded(&html::file_name(href)).map(|(_, v)| v)
                })
            }
        }
    }

    /// Candidate for one page, or `None` when nothing on it matches
    ///
    /// # Errors
    /// Page URL or link that cannot be resolved to an absolute URL
    pub fn candidate_from_page(&self, page_url: &str, page: &str) -> Result<Option<ReleaseCandidate>> {
        let links = html::matching_links(page, &self.matcher);
        let Some(href) = self.select(&links) else {
            info!(provider = %self.id, url = page_url, "no matching torrent links on listing");
            return Ok(None);
        };

        let base = Url::parse(page_url)
            .map_err(|e| Error::parse(self.id.as_str(), format!("bad listing URL {page_url}: {e}")))?;
        let source = html::resolve(&base, href)
            .ok_or_else(|| Error::parse(self.id.as_str(), format!("unresolvable link '{href}'")))?;

        let file = html::file_name(href);
        let name = file
            .strip_suffix(self.matcher.suffix())
            .unwrap_or(file.as_str())
            .to_string();
        debug!(provider = %self.id, name = %name, "selected listing entry");
        Ok(Some(ReleaseCandidate::new(name, source.to_string())))
    }
}

impl LinkMatcher for ListingProvider {
    fn is_target_artifact(&self, href: &str) -> bool {
        self.matcher.is_target_artifact(href)
    }
}

#[async_trait]
impl Provider for ListingProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    async fn discover(&self, http: &HttpFetcher) -> Result<Vec<ReleaseCandidate>> {
        let mut candidates = Vec::new();
        for url in &self.urls {
            let page = http.get_text(url).await?;
            if let Some(candidate) = self.candidate_from_page(url, &page)? {
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }
}
