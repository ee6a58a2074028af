//! Common test utilities for distro-torrents integration tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use distro_torrents::Config;
use std::path::Path;

/// Configuration that writes into `watch_dir` and skips the Transmission and
/// disk usage steps
pub fn offline_config(watch_dir: &Path) -> Config {
    let mut config = Config {
        watch_dir: watch_dir.to_path_buf(),
        ..Default::default()
    };
    config.transmission.seed_ratios = false;
    config.disk_usage.enabled = false;
    config
}
