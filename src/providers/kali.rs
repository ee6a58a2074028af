//! Kali Linux
//!
//! The download page mentions installer images as
//! `kali-linux-<year>.<n>-installer-...`; the highest such version is the
//! current release. Torrent URLs for that release follow fixed templates on
//! the cdimage and ARM image mirrors.

use super::Provider;
use crate::config::ProviderSettings;
use crate::error::{Error, Result};
use crate::http::HttpFetcher;
use crate::types::{ProviderId, ReleaseCandidate};
use crate::version;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

/// Default download page
pub const DOWNLOAD_PAGE_URL: &str = "https://www.kali.org/get-kali/";

const CDIMAGE_BASE: &str = "https://cdimage.kali.org";
const ARM_IMAGES_BASE: &str = "https://kali.download/arm-images";

#[allow(clippy::expect_used)]
static INSTALLER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"kali-linux-(\d+\.\d+)-installer-").expect("installer version regex is valid")
});

#[derive(Clone, Copy)]
enum Mirror {
    Cdimage,
    ArmImages,
}

/// (mirror, artifact after `kali-linux-{ver}-`, short label)
const IMAGES: [(Mirror, &str, &str); 11] = [
    (Mirror::Cdimage, "installer-amd64.iso", "kali-installer-amd64"),
    (Mirror::Cdimage, "installer-netinst-amd64.iso", "kali-netinst-amd64"),
    (Mirror::Cdimage, "installer-everything-amd64.iso", "kali-everything-amd64"),
    (Mirror::Cdimage, "installer-arm64.iso", "kali-installer-arm64"),
    (Mirror::Cdimage, "installer-netinst-arm64.iso", "kali-netinst-arm64"),
    (Mirror::Cdimage, "installer-purple-amd64.iso", "kali-purple-amd64"),
    (Mirror::ArmImages, "raspberry-pi-armhf.img.xz", "kali-raspberry-pi-armhf"),
    (
        Mirror::ArmImages,
        "raspberry-pi-zero-2-w-armhf.img.xz",
        "kali-raspberry-pi-zero-2-w-armhf",
    ),
    (
        Mirror::ArmImages,
        "raspberry-pi-zero-w-armel.img.xz",
        "kali-raspberry-pi-zero-w-armel",
    ),
    (Mirror::ArmImages, "cloud-genericcloud-amd64.tar.xz", "kali-cloud-amd64"),
    (Mirror::ArmImages, "cloud-genericcloud-arm64.tar.xz", "kali-cloud-arm64"),
];

/// Highest installer version mentioned on the page
pub fn latest_version(page: &str) -> Option<String> {
    let found = INSTALLER_VERSION
        .captures_iter(page)
        .filter_map(|c| c.get(1).map(|m| m.as_str()));
    version::latest(found).map(str::to_string)
}

/// Candidates for one release
pub fn candidates_for(version: &str) -> Vec<ReleaseCandidate> {
    IMAGES
        .iter()
        .map(|(mirror, artifact, label)| {
            let base = match mirror {
                Mirror::Cdimage => CDIMAGE_BASE,
                Mirror::ArmImages => ARM_IMAGES_BASE,
            };
            let name = format!("kali-linux-{version}-{artifact}");
            let url = format!("{base}/kali-{version}/{name}.torrent");
            ReleaseCandidate::new(name, url).with_label(*label)
        })
        .collect()
}

/// Kali installer, Purple, Raspberry Pi and cloud images
pub struct KaliProvider {
    settings: ProviderSettings,
    endpoint: String,
}

impl KaliProvider {
    /// Provider reading the public download page
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            endpoint: DOWNLOAD_PAGE_URL.to_string(),
        }
    }

    /// Read the download page from another URL (mirrors, tests)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Provider for KaliProvider {
    fn id(&self) -> ProviderId {
        ProviderId::from("kali")
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    async fn discover(&self, http: &HttpFetcher) -> Result<Vec<ReleaseCandidate>> {
        let page = http.get_text(&self.endpoint).await?;
        let version = latest_version(&page).ok_or_else(|| {
            Error::parse("kali", format!("no release number found on {}", self.endpoint))
        })?;
        info!(version = %version, "detected Kali release");
        Ok(candidates_for(&version))
    }
}
