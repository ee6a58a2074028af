//! Idempotent, atomic delivery of torrent files into the watch directory
//!
//! A candidate is "already handled" when either `{name}.torrent` or the
//! torrent client's `{name}.torrent.added` marker exists. Otherwise the file is
//! downloaded in full, written to a hidden temporary file next to its final
//! location, and committed by hard-linking the temporary onto the final name.
//! The link fails if the name already exists, so two overlapping runs can
//! never both commit, and a reader never observes a truncated `.torrent`.
//! Temporary files left behind by a crashed run are swept on the next commit
//! of the same name.

use crate::error::{Error, Result};
use crate::http::HttpFetcher;
use crate::types::{Event, ReleaseCandidate};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Suffix of committed torrent files
pub const TORRENT_SUFFIX: &str = ".torrent";

/// Suffix of the marker the torrent client leaves after ingesting a file
pub const ADDED_SUFFIX: &str = ".torrent.added";

const PART_SUFFIX: &str = ".part";

/// Temporary files older than this belong to a run that no longer exists
const STALE_PART_AGE: Duration = Duration::from_secs(60 * 60);

/// What happened to a single candidate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// New file committed
    Saved {
        /// Final path
        path: PathBuf,
        /// Bytes written
        size_bytes: u64,
    },
    /// `.torrent` or `.torrent.added` already present, or another writer won the commit
    AlreadyHandled,
    /// Invalid candidate, transport failure or filesystem failure
    Failed {
        /// Diagnostic message
        error: String,
    },
}

/// Writes torrent files into the watch directory exactly once per name
#[derive(Clone, Debug)]
pub struct FetchSink {
    watch_dir: PathBuf,
    http: HttpFetcher,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl FetchSink {
    /// Create a sink writing into `watch_dir`
    pub fn new(watch_dir: impl Into<PathBuf>, http: HttpFetcher) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            http,
            event_tx: None,
        }
    }

    /// Report progress on an event channel
    #[must_use]
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// `{watch_dir}/{name}.torrent`
    pub fn torrent_path(&self, name: &str) -> PathBuf {
        self.watch_dir.join(format!("{name}{TORRENT_SUFFIX}"))
    }

    /// `{watch_dir}/{name}.torrent.added`
    pub fn marker_path(&self, name: &str) -> PathBuf {
        self.watch_dir.join(format!("{name}{ADDED_SUFFIX}"))
    }

    /// Whether either the torrent or its `.added` marker exists
    pub fn is_handled(&self, name: &str) -> bool {
        self.torrent_path(name).exists() || self.marker_path(name).exists()
    }

    /// Fetch the candidate unless it was handled before
    ///
    /// Returns `true` only when a new `{name}.torrent` was committed. Skips,
    /// invalid candidates and failures all return `false`; the reason is
    /// logged and published as an [`Event`].
    pub async fn ensure_fetched(&self, candidate: &ReleaseCandidate) -> bool {
        matches!(self.fetch(candidate).await, FetchOutcome::Saved { .. })
    }

    /// Like [`ensure_fetched`](Self::ensure_fetched) but reports why nothing was written
    pub async fn fetch(&self, candidate: &ReleaseCandidate) -> FetchOutcome {
        if let Err(e) = validate(candidate) {
            warn!(name = %candidate.name, error = %e, "rejecting release candidate");
            return self.failed(candidate, e);
        }

        if self.is_handled(&candidate.name) {
            info!(name = %candidate.name, "skip: torrent already present");
            self.emit(Event::TorrentSkipped {
                name: candidate.name.clone(),
            });
            return FetchOutcome::AlreadyHandled;
        }

        info!(name = %candidate.name, url = %candidate.source_url, "fetching torrent");
        let body = match self.http.get_bytes(&candidate.source_url).await {
            Ok(body) => body,
            Err(e) => {
                error!(
                    name = %candidate.name,
                    url = %candidate.source_url,
                    error = %e,
                    code = e.error_code(),
                    "failed to download torrent"
                );
                return self.failed(candidate, e);
            }
        };

        match self.commit(&candidate.name, &body).await {
            Ok(Some(path)) => {
                let size_bytes = body.len() as u64;
                info!(path = %path.display(), size_bytes, "saved torrent");
                self.emit(Event::TorrentSaved {
                    name: candidate.name.clone(),
                    path: path.clone(),
                    size_bytes,
                });
                FetchOutcome::Saved { path, size_bytes }
            }
            Ok(None) => {
                info!(name = %candidate.name, "skip: torrent appeared while downloading");
                self.emit(Event::TorrentSkipped {
                    name: candidate.name.clone(),
                });
                FetchOutcome::AlreadyHandled
            }
            Err(e) => {
                error!(name = %candidate.name, error = %e, "failed to write torrent");
                self.failed(candidate, e)
            }
        }
    }

    /// Atomically publish `body` as `{name}.torrent`
    ///
    /// Returns `Ok(None)` if the final name already exists. The temporary
    /// file is removed on every path.
    pub(crate) async fn commit(&self, name: &str, body: &[u8]) -> Result<Option<PathBuf>> {
        tokio::fs::create_dir_all(&self.watch_dir).await?;
        self.remove_stale_parts(name).await;

        let final_path = self.torrent_path(name);
        let tmp_path = self.watch_dir.join(format!(
            ".{name}{TORRENT_SUFFIX}.{:016x}{PART_SUFFIX}",
            rand::random::<u64>()
        ));

        let result = write_and_link(&tmp_path, &final_path, body).await;

        if let Err(e) = tokio::fs::remove_file(&tmp_path).await
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %tmp_path.display(), error = %e, "could not remove temporary file");
        }

        match result {
            Ok(()) => Ok(Some(final_path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete `.{name}.torrent.<hex>.part` files older than [`STALE_PART_AGE`]
    ///
    /// Younger files may belong to a concurrent run and are left alone.
    async fn remove_stale_parts(&self, name: &str) {
        let prefix = format!(".{name}{TORRENT_SUFFIX}.");
        let mut dir = match tokio::fs::read_dir(&self.watch_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                debug!(error = %e, "cannot scan watch directory for stale temporary files");
                return;
            }
        };

        while let Ok(Some(entry)) = dir.next_entry().await {
            let file_name = entry.file_name();
            let Some(tag) = file_name
                .to_str()
                .and_then(|f| f.strip_prefix(prefix.as_str()))
                .and_then(|rest| rest.strip_suffix(PART_SUFFIX))
            else {
                continue;
            };
            if tag.len() != 16 || !tag.bytes().all(|b| b.is_ascii_hexdigit()) {
                continue;
            }

            let stale = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age >= STALE_PART_AGE);
            if !stale {
                continue;
            }

            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!(path = %path.display(), "removed stale temporary file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove stale temporary file"),
            }
        }
    }

    fn failed(&self, candidate: &ReleaseCandidate, error: Error) -> FetchOutcome {
        let message = error.to_string();
        self.emit(Event::FetchFailed {
            name: candidate.name.clone(),
            url: candidate.source_url.clone(),
            error: message.clone(),
        });
        FetchOutcome::Failed { error: message }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            // No subscribers is fine
            tx.send(event).ok();
        }
    }
}

async fn write_and_link(tmp_path: &Path, final_path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp_path)
        .await?;
    file.write_all(body).await?;
    file.sync_all().await?;
    drop(file);

    match tokio::fs::hard_link(tmp_path, final_path).await {
        Ok(()) => Ok(()),
        // Filesystems without hard links (FAT, some network mounts)
        Err(e) if matches!(e.kind(), ErrorKind::Unsupported | ErrorKind::PermissionDenied) => {
            warn!(
                path = %final_path.display(),
                error = %e,
                "hard link unavailable, writing torrent in place"
            );
            write_exclusive(final_path, body).await
        }
        Err(e) => Err(e),
    }
}

/// Create `path` exclusively and write `body` into it
///
/// Fails with `AlreadyExists` without touching an existing file. A partial
/// file is removed if the write fails.
async fn write_exclusive(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    let written = async {
        file.write_all(body).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        tokio::fs::remove_file(path).await.ok();
        return Err(e);
    }
    Ok(())
}

/// Reject names that would escape the watch directory or hide the file
fn validate(candidate: &ReleaseCandidate) -> Result<()> {
    let reject = |reason: &str| {
        Err(Error::InvalidCandidate {
            name: candidate.name.clone(),
            reason: reason.to_string(),
        })
    };

    let name = candidate.name.as_str();
    if name.trim().is_empty() {
        return reject("name is empty");
    }
    if name.starts_with('.') {
        return reject("name starts with '.'");
    }
    if name.contains(['/', '\\', '\0']) {
        return reject("name contains a path separator");
    }

    match url::Url::parse(&candidate.source_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => reject(&format!("unsupported URL scheme '{}'", url.scheme())),
        Err(e) => reject(&format!("invalid URL: {e}")),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TORRENT_BYTES: &[u8] = b"d8:announce35:https://torrent.ubuntu.com/announce4:infod4:name33:ubuntu-24.04-desktop-amd64.isoee";

    fn sink(dir: &TempDir) -> FetchSink {
        let http = HttpFetcher::new(&HttpConfig {
            timeout: Duration::from_secs(5),
            ..HttpConfig::default()
        })
        .unwrap();
        FetchSink::new(dir.path(), http)
    }

    fn entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn saves_exact_response_bytes() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/noble/ubuntu-24.04-desktop-amd64.iso.torrent"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(TORRENT_BYTES))
            .expect(1)
            .mount(&server)
            .await;

        let candidate = ReleaseCandidate::new(
            "ubuntu-24.04-desktop",
            format!("{}/noble/ubuntu-24.04-desktop-amd64.iso.torrent", server.uri()),
        );

        assert!(sink(&dir).ensure_fetched(&candidate).await);
        assert_eq!(entries(&dir), ["ubuntu-24.04-desktop.torrent"]);
        let written = std::fs::read(dir.path().join("ubuntu-24.04-desktop.torrent")).unwrap();
        assert_eq!(written, TORRENT_BYTES);
    }

    #[tokio::test]
    async fn existing_torrent_skips_without_network() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(TORRENT_BYTES))
            .expect(0)
            .mount(&server)
            .await;

        std::fs::write(dir.path().join("debian-12.5.0-amd64-DVD-1.torrent"), b"old").unwrap();
        let candidate = ReleaseCandidate::new(
            "debian-12.5.0-amd64-DVD-1",
            format!("{}/debian-12.5.0-amd64-DVD-1.iso.torrent", server.uri()),
        );

        let sink = sink(&dir);
        assert!(!sink.ensure_fetched(&candidate).await);
        assert_eq!(sink.fetch(&candidate).await, FetchOutcome::AlreadyHandled);
        let kept = std::fs::read(dir.path().join("debian-12.5.0-amd64-DVD-1.torrent")).unwrap();
        assert_eq!(kept, b"old", "existing file must not be overwritten");
    }

    #[tokio::test]
    async fn added_marker_skips_without_network() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(TORRENT_BYTES))
            .expect(0)
            .mount(&server)
            .await;

        std::fs::write(dir.path().join("ubuntu-24.04-desktop.torrent.added"), b"").unwrap();
        let candidate =
            ReleaseCandidate::new("ubuntu-24.04-desktop", format!("{}/x.torrent", server.uri()));

        let (tx, mut rx) = broadcast::channel(8);
        let sink = sink(&dir).with_events(tx);
        assert!(!sink.ensure_fetched(&candidate).await);
        assert_eq!(entries(&dir), ["ubuntu-24.04-desktop.torrent.added"]);
        assert!(matches!(
            rx.try_recv().unwrap(),
            Event::TorrentSkipped { name } if name == "ubuntu-24.04-desktop"
        ));
    }

    #[tokio::test]
    async fn http_error_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let candidate =
            ReleaseCandidate::new("kali-linux-2024.4-installer-amd64.iso", format!("{}/k.torrent", server.uri()));
        match sink(&dir).fetch(&candidate).await {
            FetchOutcome::Failed { error } => assert!(error.contains("404"), "got: {error}"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn truncated_transfer_leaves_no_file() {
        // Server promises 4096 bytes, sends 16, then hangs up
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Type: application/x-bittorrent\r\nContent-Length: 4096\r\n\r\nd8:announce3:abc",
                    )
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let dir = TempDir::new().unwrap();
        let candidate = ReleaseCandidate::new(
            "archlinux-2024.10.01-x86_64",
            format!("http://{addr}/archlinux.torrent"),
        );
        assert!(!sink(&dir).ensure_fetched(&candidate).await);
        assert!(
            entries(&dir).is_empty(),
            "no final or temporary file may remain, found {:?}",
            entries(&dir)
        );
    }

    #[tokio::test]
    async fn invalid_names_are_rejected_before_any_request() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(TORRENT_BYTES))
            .expect(0)
            .mount(&server)
            .await;

        let sink = sink(&dir);
        for name in ["", "  ", "../escape", "sub/dir", ".hidden"] {
            let candidate = ReleaseCandidate::new(name, format!("{}/x.torrent", server.uri()));
            assert!(!sink.ensure_fetched(&candidate).await, "{name:?} must be rejected");
        }
        let bad_url = ReleaseCandidate::new("fine-name", "ftp://example.com/x.torrent");
        assert!(matches!(sink.fetch(&bad_url).await, FetchOutcome::Failed { .. }));
        let not_a_url = ReleaseCandidate::new("fine-name", "not a url");
        assert!(!sink.ensure_fetched(&not_a_url).await);
    }

    #[tokio::test]
    async fn commit_refuses_to_replace_existing_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("race.torrent"), b"winner").unwrap();

        let result = sink(&dir).commit("race", b"loser").await.unwrap();
        assert_eq!(result, None);
        assert_eq!(std::fs::read(dir.path().join("race.torrent")).unwrap(), b"winner");
        assert_eq!(entries(&dir), ["race.torrent"], "temporary file must be cleaned up");
    }

    fn backdate(path: &Path, age: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(std::time::SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn commit_sweeps_stale_temporary_files_for_the_same_name() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join(".race.torrent.00000000deadbeef.part");
        let fresh = dir.path().join(".race.torrent.0123456789abcdef.part");
        let other = dir.path().join(".other.torrent.00000000deadbeef.part");
        for path in [&stale, &fresh, &other] {
            std::fs::write(path, b"partial").unwrap();
        }
        backdate(&stale, Duration::from_secs(2 * 60 * 60));
        backdate(&other, Duration::from_secs(2 * 60 * 60));

        let path = sink(&dir).commit("race", TORRENT_BYTES).await.unwrap().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), TORRENT_BYTES);
        assert_eq!(
            entries(&dir),
            [
                ".other.torrent.00000000deadbeef.part",
                ".race.torrent.0123456789abcdef.part",
                "race.torrent",
            ],
            "only old leftovers of the committed name are removed"
        );
    }

    #[tokio::test]
    async fn exclusive_write_never_replaces_an_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("race.torrent");
        std::fs::write(&target, b"winner").unwrap();

        let err = write_exclusive(&target, b"loser").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&target).unwrap(), b"winner");

        let fresh = dir.path().join("fresh.torrent");
        write_exclusive(&fresh, TORRENT_BYTES).await.unwrap();
        assert_eq!(std::fs::read(&fresh).unwrap(), TORRENT_BYTES);
    }

    #[tokio::test]
    async fn commit_creates_missing_watch_dir() {
        let dir = TempDir::new().unwrap();
        let http = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let nested = dir.path().join("watch");
        let sink = FetchSink::new(&nested, http);

        let path = sink.commit("fresh", b"d4:infodee").await.unwrap().unwrap();
        assert_eq!(path, nested.join("fresh.torrent"));
        assert!(sink.is_handled("fresh"));
    }
}
