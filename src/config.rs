//! Configuration types for distro-torrents
//!
//! Configuration is layered: built-in defaults, then an optional JSON file,
//! then environment toggles. The environment is read through a lookup
//! function rather than `std::env` directly so tests can supply their own.

use crate::error::{Error, Result};
use crate::filter::NameFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory watched by the torrent client (default: "/watch")
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Directory whose disk usage is reported at the end of a run (default: "/downloads")
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Per-provider toggles and filters
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Torrent client RPC settings
    #[serde(default)]
    pub transmission: TransmissionConfig,

    /// Removal of superseded releases from the torrent client
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Disk usage report
    #[serde(default)]
    pub disk_usage: DiskUsageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            downloads_dir: default_downloads_dir(),
            http: HttpConfig::default(),
            providers: ProvidersConfig::default(),
            transmission: TransmissionConfig::default(),
            cleanup: CleanupConfig::default(),
            disk_usage: DiskUsageConfig::default(),
        }
    }
}

/// Outbound HTTP settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Toggle and allow-list shared by every provider
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Whether the provider runs at all (absent = disabled)
    #[serde(default)]
    pub enabled: bool,

    /// Case-insensitive substring allow-list over candidate labels (empty = no filter)
    #[serde(default)]
    pub filter: NameFilter,
}

impl ProviderSettings {
    /// Enabled settings with no filter
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            filter: NameFilter::default(),
        }
    }
}

/// Which Ubuntu LTS releases to fetch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UbuntuScope {
    /// Every LTS release still marked `Supported: 1`
    #[default]
    AllSupported,
    /// Only the highest supported LTS version
    Latest,
}

impl FromStr for UbuntuScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all-supported" | "all" => Ok(Self::AllSupported),
            "latest" => Ok(Self::Latest),
            other => Err(Error::config(
                "UBUNTU_SCOPE",
                format!("expected 'all-supported' or 'latest', got '{other}'"),
            )),
        }
    }
}

/// How a directory listing picks its release
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingSelection {
    /// First matching link in page order
    #[default]
    First,
    /// Matching link carrying the highest dotted version in its file name
    HighestVersion,
}

/// A user-defined directory-listing provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Short name; the provider id becomes `listing:<name>`
    pub name: String,

    /// Listing pages to scan
    pub urls: Vec<String>,

    /// File suffix identifying torrent links (default: ".iso.torrent")
    #[serde(default = "default_listing_suffix")]
    pub suffix: String,

    /// Selection rule when several links match
    #[serde(default)]
    pub selection: ListingSelection,

    /// Toggle and allow-list
    #[serde(flatten)]
    pub settings: ProviderSettings,
}

/// Per-provider configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Ubuntu family (Ubuntu, Lubuntu, Xubuntu)
    #[serde(default)]
    pub ubuntu: ProviderSettings,

    /// Which Ubuntu LTS releases to fetch
    #[serde(default)]
    pub ubuntu_scope: UbuntuScope,

    /// Debian stable
    #[serde(default)]
    pub debian: ProviderSettings,

    /// Kali Linux
    #[serde(default)]
    pub kali: ProviderSettings,

    /// Arch Linux
    #[serde(default)]
    pub arch: ProviderSettings,

    /// Generic directory listings
    #[serde(default)]
    pub listings: Vec<ListingConfig>,
}

impl ProvidersConfig {
    /// Mutable settings for a built-in provider id
    pub fn builtin_mut(&mut self, id: &str) -> Option<&mut ProviderSettings> {
        match id {
            "ubuntu" => Some(&mut self.ubuntu),
            "debian" => Some(&mut self.debian),
            "kali" => Some(&mut self.kali),
            "arch" => Some(&mut self.arch),
            _ => None,
        }
    }
}

/// Transmission RPC settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransmissionConfig {
    /// Log seed ratios at the end of each run (default: true)
    #[serde(default = "default_true")]
    pub seed_ratios: bool,

    /// RPC endpoint (default: "http://localhost:9091/transmission/rpc")
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Basic-auth username
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password
    #[serde(default)]
    pub password: Option<String>,

    /// RPC request timeout in seconds (default: 15)
    #[serde(default = "default_rpc_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            seed_ratios: true,
            rpc_url: default_rpc_url(),
            username: None,
            password: None,
            timeout: default_rpc_timeout(),
        }
    }
}

/// Removal of superseded releases from the torrent client
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Run the cleanup step (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Also delete downloaded data of removed torrents (default: false)
    #[serde(default)]
    pub delete_local_data: bool,

    /// Log what would be removed without calling the client (default: false)
    #[serde(default)]
    pub dry_run: bool,
}

/// Disk usage report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiskUsageConfig {
    /// Log usage of `downloads_dir` at the end of each run (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for DiskUsageConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Built-in providers that can be toggled from the environment
pub const BUILTIN_PROVIDERS: [&str; 4] = ["ubuntu", "debian", "kali", "arch"];

impl Config {
    /// Read a JSON configuration file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid configuration
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("invalid config file {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Defaults, then the optional file, then environment overrides
    ///
    /// # Errors
    /// Returns error for unreadable files and malformed environment values
    pub fn load<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Overlay environment-style toggles
    ///
    /// Recognized keys: `WATCH_DIR`, `DOWNLOADS_DIR`, `HTTP_TIMEOUT_SECS`,
    /// `{UBUNTU,DEBIAN,KALI,ARCH}_ENABLED`, `{UBUNTU,DEBIAN,KALI,ARCH}_FILTER`,
    /// `UBUNTU_SCOPE`, `TRANSMISSION_RPC_URL`, `TRANSMISSION_USERNAME`,
    /// `TRANSMISSION_PASSWORD`, `SEED_RATIOS_ENABLED`, `CLEANUP_ENABLED`,
    /// `CLEANUP_DELETE_DATA`, `CLEANUP_DRY_RUN`, `DISK_USAGE_ENABLED`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the key when a value cannot be parsed
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("WATCH_DIR") {
            self.watch_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("DOWNLOADS_DIR") {
            self.downloads_dir = PathBuf::from(dir);
        }
        if let Some(secs) = get("HTTP_TIMEOUT_SECS") {
            self.http.timeout = parse_secs("HTTP_TIMEOUT_SECS", &secs)?;
        }

        for id in BUILTIN_PROVIDERS {
            let prefix = id.to_ascii_uppercase();
            let enabled = get(&format!("{prefix}_ENABLED"));
            let filter = get(&format!("{prefix}_FILTER"));
            if let Some(settings) = self.providers.builtin_mut(id) {
                if let Some(value) = enabled {
                    settings.enabled = parse_bool(&value);
                }
                if let Some(value) = filter {
                    settings.filter = NameFilter::parse(&value);
                }
            }
        }
        if let Some(scope) = get("UBUNTU_SCOPE") {
            self.providers.ubuntu_scope = scope.parse()?;
        }

        if let Some(url) = get("TRANSMISSION_RPC_URL") {
            self.transmission.rpc_url = url;
        }
        if let Some(user) = get("TRANSMISSION_USERNAME") {
            self.transmission.username = Some(user);
        }
        if let Some(pass) = get("TRANSMISSION_PASSWORD") {
            self.transmission.password = Some(pass);
        }
        if let Some(value) = get("SEED_RATIOS_ENABLED") {
            self.transmission.seed_ratios = parse_bool(&value);
        }

        if let Some(value) = get("CLEANUP_ENABLED") {
            self.cleanup.enabled = parse_bool(&value);
        }
        if let Some(value) = get("CLEANUP_DELETE_DATA") {
            self.cleanup.delete_local_data = parse_bool(&value);
        }
        if let Some(value) = get("CLEANUP_DRY_RUN") {
            self.cleanup.dry_run = parse_bool(&value);
        }
        if let Some(value) = get("DISK_USAGE_ENABLED") {
            self.disk_usage.enabled = parse_bool(&value);
        }

        Ok(())
    }

    /// Enable exactly the named providers, disabling every other one
    ///
    /// Names are built-in ids or generic listing names.
    ///
    /// # Errors
    /// Returns error if a name matches no provider
    pub fn restrict_to(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            let known = BUILTIN_PROVIDERS.contains(&name.as_str())
                || self.providers.listings.iter().any(|l| &l.name == name);
            if !known {
                return Err(Error::config("--only", format!("unknown provider '{name}'")));
            }
        }
        for id in BUILTIN_PROVIDERS {
            let on = names.iter().any(|n| n == id);
            if let Some(settings) = self.providers.builtin_mut(id) {
                settings.enabled = on;
            }
        }
        for listing in &mut self.providers.listings {
            listing.settings.enabled = names.contains(&listing.name);
        }
        Ok(())
    }
}

/// Truthy toggle values: `1`, `true`, `yes`, `on` (case-insensitive)
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::config(key, format!("expected whole seconds, got '{value}'")))
}

// Default value functions
fn default_watch_dir() -> PathBuf {
    PathBuf::from("/watch")
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("/downloads")
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("distro-torrents/{}", env!("CARGO_PKG_VERSION"))
}

fn default_rpc_url() -> String {
    "http://localhost:9091/transmission/rpc".to_string()
}

fn default_rpc_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_listing_suffix() -> String {
    ".iso.torrent".to_string()
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_disable_every_provider() {
        let config = Config::default();
        assert!(!config.providers.ubuntu.enabled);
        assert!(!config.providers.debian.enabled);
        assert!(!config.providers.kali.enabled);
        assert!(!config.providers.arch.enabled);
        assert!(config.providers.kali.filter.is_empty());
        assert_eq!(config.watch_dir, PathBuf::from("/watch"));
        assert_eq!(config.http.timeout, Duration::from_secs(30));
        assert!(config.transmission.seed_ratios);
        assert!(!config.cleanup.enabled);
    }

    #[test]
    fn env_toggles_enable_and_filter_providers() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("KALI_ENABLED", "yes"),
                ("KALI_FILTER", "kali-purple,Kali-Installer"),
                ("UBUNTU_ENABLED", "TRUE"),
                ("DEBIAN_ENABLED", "0"),
                ("WATCH_DIR", "/srv/watch"),
                ("HTTP_TIMEOUT_SECS", "12"),
            ]))
            .unwrap();

        assert!(config.providers.kali.enabled);
        assert_eq!(
            config.providers.kali.filter.entries(),
            ["kali-purple", "kali-installer"]
        );
        assert!(config.providers.ubuntu.enabled);
        assert!(!config.providers.debian.enabled);
        assert_eq!(config.watch_dir, PathBuf::from("/srv/watch"));
        assert_eq!(config.http.timeout, Duration::from_secs(12));
    }

    #[test]
    fn unrecognized_toggle_values_mean_disabled() {
        for value in ["no", "off", "false", "enabled-ish", "2"] {
            assert!(!parse_bool(value), "{value:?} must not enable");
        }
        for value in ["1", "true", "Yes", " on "] {
            assert!(parse_bool(value), "{value:?} must enable");
        }
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.providers.arch.enabled = true;
        config
            .apply_env(env(&[("ARCH_ENABLED", "  "), ("WATCH_DIR", "")]))
            .unwrap();
        assert!(config.providers.arch.enabled);
        assert_eq!(config.watch_dir, PathBuf::from("/watch"));
    }

    #[test]
    fn malformed_timeout_names_the_key() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("HTTP_TIMEOUT_SECS", "thirty")]))
            .unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("HTTP_TIMEOUT_SECS")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn ubuntu_scope_parses_from_env() {
        let mut config = Config::default();
        config.apply_env(env(&[("UBUNTU_SCOPE", "Latest")])).unwrap();
        assert_eq!(config.providers.ubuntu_scope, UbuntuScope::Latest);
        assert!(config.apply_env(env(&[("UBUNTU_SCOPE", "newest")])).is_err());
    }

    #[test]
    fn json_file_fills_missing_fields_with_defaults() {
        let json = r#"{
            "watch_dir": "/data/watch",
            "providers": {
                "kali": { "enabled": true, "filter": ["kali-purple"] },
                "listings": [
                    { "name": "fedora", "urls": ["https://example.org/torrents/"], "enabled": true,
                      "selection": "highest-version", "suffix": ".torrent" }
                ]
            },
            "http": { "timeout": 5 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.watch_dir, PathBuf::from("/data/watch"));
        assert_eq!(config.downloads_dir, PathBuf::from("/downloads"));
        assert_eq!(config.http.timeout, Duration::from_secs(5));
        assert!(config.http.user_agent.starts_with("distro-torrents/"));
        assert!(config.providers.kali.enabled);
        assert!(config.providers.kali.filter.allows("Kali-Purple-amd64"));
        assert!(!config.providers.ubuntu.enabled);

        let listing = &config.providers.listings[0];
        assert_eq!(listing.selection, ListingSelection::HighestVersion);
        assert_eq!(listing.suffix, ".torrent");
        assert!(listing.settings.enabled);
    }

    #[test]
    fn load_reads_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"providers": {"debian": {"enabled": true}}}"#).unwrap();

        let config = Config::load(Some(&path), env(&[("DEBIAN_ENABLED", "off")])).unwrap();
        assert!(!config.providers.debian.enabled, "environment wins over file");
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/config.json")), |_| None).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn restrict_to_enables_only_named_providers() {
        let mut config = Config::default();
        config.providers.ubuntu.enabled = true;
        config.providers.listings.push(ListingConfig {
            name: "fedora".into(),
            urls: vec![],
            suffix: default_listing_suffix(),
            selection: ListingSelection::First,
            settings: ProviderSettings::default(),
        });

        config
            .restrict_to(&["kali".to_string(), "fedora".to_string()])
            .unwrap();
        assert!(!config.providers.ubuntu.enabled);
        assert!(config.providers.kali.enabled);
        assert!(config.providers.listings[0].settings.enabled);

        assert!(config.restrict_to(&["gentoo".to_string()]).is_err());
    }
}
