//! # distro-torrents
//!
//! Keeps a torrent client's watch directory stocked with the current
//! releases of popular Linux distributions.
//!
//! Each run asks every enabled [`Provider`](providers::Provider) for the
//! torrents of its latest release, filters them through the provider's
//! allow-list, and hands them to the [`FetchSink`](sink::FetchSink), which
//! writes `{name}.torrent` exactly once. Names already present as
//! `{name}.torrent` or `{name}.torrent.added` are never fetched again.
//!
//! ## Quick Start
//!
//! ```no_run
//! use distro_torrents::{Config, Runner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.watch_dir = "/srv/watch".into();
//!     config.providers.debian.enabled = true;
//!     config.providers.kali.enabled = true;
//!
//!     let runner = Runner::new(config)?;
//!
//!     let mut events = runner.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = runner.run().await;
//!     println!("{} new torrents", summary.tally.torrents_saved);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Removal of superseded releases
pub mod cleanup;
/// Configuration types
pub mod config;
/// Filesystem usage report
pub mod disk;
/// Error types
pub mod error;
/// Allow-list filtering
pub mod filter;
/// Anchor scraping for listing pages
pub mod html;
/// Shared HTTP client
pub mod http;
/// Release providers
pub mod providers;
/// Run driver
pub mod runner;
/// Watch-directory writer
pub mod sink;
/// Transmission RPC client
pub mod transmission;
/// Core types and events
pub mod types;
/// Dotted version comparison
pub mod version;

// Re-export commonly used types
pub use config::{Config, ProviderSettings};
pub use error::{Error, Result};
pub use filter::NameFilter;
pub use providers::{Provider, ProviderRegistry};
pub use runner::Runner;
pub use sink::{FetchOutcome, FetchSink};
pub use types::{Event, ProviderId, ProviderOutcome, ReleaseCandidate, RunSummary, RunTally};
