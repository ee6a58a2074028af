//! Release providers
//!
//! Each provider knows how to find the current release of one distribution
//! family and turn it into [`ReleaseCandidate`]s. Providers only read from
//! the network; writing is the [`FetchSink`](crate::sink::FetchSink)'s job.
//!
//! - [`ubuntu`] - LTS meta-release feed (Ubuntu, Lubuntu, Xubuntu)
//! - [`listing`] - directory listings (Debian and user-defined listings)
//! - [`kali`] - Kali download page
//! - [`arch`] - Arch Linux releng JSON API

pub mod arch;
pub mod kali;
pub mod listing;
pub mod ubuntu;

pub use arch::ArchProvider;
pub use kali::KaliProvider;
pub use listing::ListingProvider;
pub use ubuntu::UbuntuProvider;

use crate::config::{ProviderSettings, ProvidersConfig};
use crate::error::Result;
use crate::http::HttpFetcher;
use crate::types::{ProviderId, ReleaseCandidate};
use async_trait::async_trait;

/// A source of release candidates for one distribution family
///
/// # Examples
///
/// ```no_run
/// use distro_torrents::config::{HttpConfig, ProviderSettings};
/// use distro_torrents::http::HttpFetcher;
/// use distro_torrents::providers::{KaliProvider, Provider};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let http = HttpFetcher::new(&HttpConfig::default())?;
/// let kali = KaliProvider::new(ProviderSettings::enabled());
/// for candidate in kali.discover(&http).await? {
///     println!("{} <- {}", candidate.name, candidate.source_url);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier used in logs and events
    fn id(&self) -> ProviderId;

    /// Toggle and allow-list
    fn settings(&self) -> &ProviderSettings;

    /// Fetch the provider's pages and build candidates for the latest release
    ///
    /// An empty list means "nothing to fetch right now" and is not an error.
    ///
    /// # Errors
    /// Transport failures, non-success statuses and pages missing the expected
    /// structure
    async fn discover(&self, http: &HttpFetcher) -> Result<Vec<ReleaseCandidate>>;
}

/// Ordered set of providers iterated by the run driver
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in providers followed by configured listings
    ///
    /// Disabled providers are registered too; the driver reports them as
    /// disabled without calling them.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let mut registry = Self::new();
        registry.register(UbuntuProvider::new(config.ubuntu.clone(), config.ubuntu_scope));
        registry.register(ListingProvider::debian(config.debian.clone()));
        registry.register(KaliProvider::new(config.kali.clone()));
        registry.register(ArchProvider::new(config.arch.clone()));
        for listing in &config.listings {
            registry.register(ListingProvider::from_config(listing));
        }
        registry
    }

    /// Append a provider
    pub fn register<P: Provider + 'static>(&mut self, provider: P) {
        self.providers.push(Box::new(provider));
    }

    /// Providers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Provider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no providers are registered
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
