//! One complete fetch run
//!
//! The runner walks the provider registry in order, passes every discovered
//! candidate through the [`FetchSink`], and then runs the auxiliary steps:
//! seed-ratio report, duplicate cleanup and disk usage. Nothing in a run is
//! fatal; every failure is logged, counted and published as an [`Event`].

use crate::cleanup;
use crate::config::Config;
use crate::disk;
use crate::error::Result;
use crate::http::HttpFetcher;
use crate::providers::{Provider, ProviderRegistry};
use crate::sink::{FetchOutcome, FetchSink};
use crate::transmission::{self, TorrentInfo, TransmissionClient};
use crate::types::{Event, ProviderOutcome, RunSummary, RunTally};
use chrono::Utc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Drives providers, the fetch sink and the auxiliary report steps
pub struct Runner {
    config: Config,
    registry: ProviderRegistry,
    http: HttpFetcher,
    sink: FetchSink,
    event_tx: broadcast::Sender<Event>,
}

impl Runner {
    /// Runner with the providers described by `config`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config.providers);
        Self::with_registry(config, registry)
    }

    /// Runner with an explicit provider registry
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn with_registry(config: Config, registry: ProviderRegistry) -> Result<Self> {
        let http = HttpFetcher::new(&config.http)?;
        let (event_tx, _rx) = broadcast::channel(1000);
        let sink = FetchSink::new(config.watch_dir.clone(), http.clone()).with_events(event_tx.clone());
        Ok(Self {
            config,
            registry,
            http,
            sink,
            event_tx,
        })
    }

    /// Subscribe to run events
    ///
    /// Each subscriber receives every event sent after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Execute one run; never fails
    pub async fn run(&self) -> RunSummary {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            watch_dir = %self.config.watch_dir.display(),
            providers = self.registry.len(),
            "starting torrent fetch run"
        );
        if self.registry.is_empty() {
            warn!("no providers registered");
        }

        let mut tally = RunTally::default();
        let mut providers = Vec::with_capacity(self.registry.len());
        for provider in self.registry.iter() {
            let outcome = self.run_provider(provider, &mut tally).await;
            tally.record_provider(&outcome);
            providers.push((provider.id(), outcome));
        }

        self.torrent_client_steps().await;
        if self.config.disk_usage.enabled {
            self.report_disk_usage();
        }

        let elapsed = start.elapsed();
        info!(
            elapsed_secs = elapsed.as_secs_f64(),
            succeeded = tally.providers_succeeded,
            failed = tally.providers_failed,
            disabled = tally.providers_disabled,
            saved = tally.torrents_saved,
            skipped = tally.torrents_skipped,
            "Run complete in {:.2} seconds. {} successful, {} failed.",
            elapsed.as_secs_f64(),
            tally.providers_succeeded,
            tally.providers_failed
        );
        self.emit(Event::RunComplete {
            tally: tally.clone(),
        });

        RunSummary {
            started_at,
            elapsed,
            providers,
            tally,
        }
    }

    async fn run_provider(&self, provider: &dyn Provider, tally: &mut RunTally) -> ProviderOutcome {
        let id = provider.id();
        let settings = provider.settings();

        if !settings.enabled {
            info!(provider = %id, "provider disabled, skipping");
            self.emit(Event::ProviderDisabled { provider: id });
            return ProviderOutcome::Disabled;
        }

        let discovered = match provider.discover(&self.http).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(provider = %id, error = %e, code = e.error_code(), "provider failed");
                self.emit(Event::ProviderFailed {
                    provider: id,
                    error: e.to_string(),
                });
                return ProviderOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        if discovered.is_empty() {
            info!(provider = %id, "no release candidates found");
            self.emit(Event::ProviderDiscovered {
                provider: id,
                candidates: 0,
            });
            return ProviderOutcome::Empty;
        }

        let found = discovered.len();
        let candidates = settings.filter.apply(discovered);
        if candidates.len() < found {
            debug!(
                provider = %id,
                found,
                kept = candidates.len(),
                "allow-list applied"
            );
        }
        self.emit(Event::ProviderDiscovered {
            provider: id.clone(),
            candidates: candidates.len(),
        });

        let mut saved = 0;
        for candidate in &candidates {
            match self.sink.fetch(candidate).await {
                FetchOutcome::Saved { .. } => {
                    saved += 1;
                    tally.torrents_saved += 1;
                }
                FetchOutcome::AlreadyHandled => tally.torrents_skipped += 1,
                FetchOutcome::Failed { .. } => tally.fetch_failures += 1,
            }
        }
        info!(provider = %id, candidates = candidates.len(), saved, "provider finished");

        ProviderOutcome::Completed {
            candidates: candidates.len(),
            saved,
        }
    }

    async fn torrent_client_steps(&self) {
        let wants_ratios = self.config.transmission.seed_ratios;
        let wants_cleanup = self.config.cleanup.enabled;
        if !wants_ratios && !wants_cleanup {
            return;
        }

        let client = match TransmissionClient::new(&self.config.transmission) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "could not create Transmission client");
                return;
            }
        };
        let torrents = match client.torrents().await {
            Ok(torrents) => torrents,
            Err(e) => {
                warn!(
                    url = %self.config.transmission.rpc_url,
                    error = %e,
                    "could not query Transmission"
                );
                return;
            }
        };

        if wants_ratios {
            transmission::log_seed_ratios(&torrents);
        }
        if wants_cleanup {
            self.remove_superseded(&client, &torrents).await;
        }
    }

    async fn remove_superseded(&self, client: &TransmissionClient, torrents: &[TorrentInfo]) {
        let removals = cleanup::plan_removals(torrents);
        if removals.is_empty() {
            debug!("no superseded torrents");
            return;
        }

        let dry_run = self.config.cleanup.dry_run;
        for torrent in &removals {
            info!(name = %torrent.name, id = torrent.id, dry_run, "removing superseded torrent");
        }
        if !dry_run {
            let ids: Vec<i64> = removals.iter().map(|t| t.id).collect();
            if let Err(e) = client
                .remove(&ids, self.config.cleanup.delete_local_data)
                .await
            {
                warn!(error = %e, "could not remove superseded torrents");
                return;
            }
        }
        for torrent in removals {
            self.emit(Event::TorrentRemoved {
                name: torrent.name,
                dry_run,
            });
        }
    }

    fn report_disk_usage(&self) {
        let dir = &self.config.downloads_dir;
        match disk::usage(dir) {
            Ok(usage) => info!(
                path = %dir.display(),
                used_bytes = usage.used,
                total_bytes = usage.total,
                "Downloads folder usage: {} GB used / {} GB total",
                usage.used_gib(),
                usage.total_gib()
            ),
            Err(e) => warn!(error = %e, "could not read disk usage"),
        }
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
