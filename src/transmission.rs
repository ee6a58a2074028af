//! Minimal Transmission RPC client
//!
//! Transmission rejects the first request of a session with `409 Conflict`
//! and an `X-Transmission-Session-Id` header; the request is repeated with
//! that header set. The id is cached for subsequent calls and refreshed
//! whenever the daemon answers 409 again.

use crate::config::TransmissionConfig;
use crate::error::{Error, Result};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Header carrying the CSRF session token
pub const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// A torrent as reported by `torrent-get`
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TorrentInfo {
    /// Client-local torrent id
    pub id: i64,
    /// Torrent name
    pub name: String,
    /// Upload ratio; Transmission reports `-1` when not available
    #[serde(rename = "uploadRatio", default)]
    pub upload_ratio: f64,
}

#[derive(Serialize)]
struct RpcRequest<'a, A> {
    method: &'a str,
    arguments: A,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: String,
    arguments: Option<T>,
}

#[derive(Serialize)]
struct TorrentGetArgs {
    fields: [&'static str; 3],
}

#[derive(Deserialize)]
struct TorrentList {
    #[serde(default)]
    torrents: Vec<TorrentInfo>,
}

#[derive(Serialize)]
struct TorrentRemoveArgs<'a> {
    ids: &'a [i64],
    #[serde(rename = "delete-local-data")]
    delete_local_data: bool,
}

/// Client for the Transmission JSON-RPC endpoint
pub struct TransmissionClient {
    client: reqwest::Client,
    rpc_url: String,
    username: Option<String>,
    password: Option<String>,
    session_id: Mutex<Option<String>>,
}

impl TransmissionClient {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns error if the underlying TLS backend cannot be initialized
    pub fn new(config: &TransmissionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create RPC client: {}", e)))?;
        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            session_id: Mutex::new(None),
        })
    }

    async fn call<A, T>(&self, method: &str, arguments: A) -> Result<T>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let body = RpcRequest { method, arguments };

        // One retry for the session handshake; a second 409 means the daemon
        // keeps rotating ids and we give up.
        for _ in 0..2 {
            let mut request = self.client.post(&self.rpc_url).json(&body);
            if let Some(id) = self.session_id.lock().await.as_deref() {
                request = request.header(SESSION_ID_HEADER, id);
            }
            if let Some(user) = &self.username {
                request = request.basic_auth(user, self.password.as_deref());
            }

            let response = request.send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::CONFLICT {
                let id = response
                    .headers()
                    .get(SESSION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| Error::Rpc(format!("409 without {SESSION_ID_HEADER} header")))?
                    .to_string();
                debug!("received Transmission session id");
                *self.session_id.lock().await = Some(id);
                continue;
            }
            if !status.is_success() {
                return Err(Error::HttpStatus {
                    url: self.rpc_url.clone(),
                    status: status.as_u16(),
                });
            }

            let text = response.text().await?;
            let reply: RpcResponse<T> = serde_json::from_str(&text)?;
            if reply.result != "success" {
                return Err(Error::Rpc(format!("{method}: {}", reply.result)));
            }
            return reply
                .arguments
                .ok_or_else(|| Error::Rpc(format!("{method}: response without arguments")));
        }

        Err(Error::Rpc("session id handshake failed".to_string()))
    }

    /// All torrents with their id, name and upload ratio
    ///
    /// # Errors
    /// Transport failure, authentication failure or an RPC-level error
    pub async fn torrents(&self) -> Result<Vec<TorrentInfo>> {
        let list: TorrentList = self
            .call(
                "torrent-get",
                TorrentGetArgs {
                    fields: ["id", "name", "uploadRatio"],
                },
            )
            .await?;
        Ok(list.torrents)
    }

    /// Remove torrents by id, optionally deleting their downloaded data
    ///
    /// # Errors
    /// Transport failure, authentication failure or an RPC-level error
    pub async fn remove(&self, ids: &[i64], delete_local_data: bool) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let _: IgnoredAny = self
            .call(
                "torrent-remove",
                TorrentRemoveArgs {
                    ids,
                    delete_local_data,
                },
            )
            .await?;
        Ok(())
    }
}

/// Torrents ordered by upload ratio, highest first
///
/// Unavailable ratios (negative or NaN) sort last.
pub fn sorted_by_ratio(torrents: &[TorrentInfo]) -> Vec<&TorrentInfo> {
    let key = |t: &TorrentInfo| {
        if t.upload_ratio.is_nan() || t.upload_ratio < 0.0 {
            f64::NEG_INFINITY
        } else {
            t.upload_ratio
        }
    };
    let mut sorted: Vec<&TorrentInfo> = torrents.iter().collect();
    sorted.sort_by(|a, b| key(b).total_cmp(&key(a)));
    sorted
}

/// Log one `[ratio]` line per torrent, highest ratio first
pub fn log_seed_ratios(torrents: &[TorrentInfo]) {
    for t in sorted_by_ratio(torrents) {
        info!(name = %t.name, ratio = t.upload_ratio, "[ratio] {} → {:.3}", t.name, t.upload_ratio);
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> TransmissionConfig {
        TransmissionConfig {
            rpc_url: format!("{}/transmission/rpc", server.uri()),
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    fn info(id: i64, name: &str, ratio: f64) -> TorrentInfo {
        TorrentInfo {
            id,
            name: name.to_string(),
            upload_ratio: ratio,
        }
    }

    #[tokio::test]
    async fn performs_session_handshake_then_lists_torrents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transmission/rpc"))
            .and(header(SESSION_ID_HEADER, "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "success",
                "arguments": {"torrents": [
                    {"id": 1, "name": "debian-12.5.0-amd64-DVD-1.iso", "uploadRatio": 0.5},
                    {"id": 2, "name": "kali-linux-2024.4-installer-amd64.iso", "uploadRatio": 2.25}
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transmission/rpc"))
            .respond_with(ResponseTemplate::new(409).insert_header(SESSION_ID_HEADER, "abc123"))
            .expect(1)
            .mount(&server)
            .await;

        let client = TransmissionClient::new(&config(&server)).unwrap();
        let torrents = client.torrents().await.unwrap();
        assert_eq!(torrents.len(), 2);
        assert_eq!(torrents[1].upload_ratio, 2.25);
    }

    #[tokio::test]
    async fn sends_basic_auth_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "success", "arguments": {"torrents": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.username = Some("admin".into());
        cfg.password = Some("secret".into());
        let client = TransmissionClient::new(&cfg).unwrap();
        assert!(client.torrents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_passes_ids_and_delete_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "method": "torrent-remove",
                "arguments": {"ids": [3, 7], "delete-local-data": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "success", "arguments": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TransmissionClient::new(&config(&server)).unwrap();
        client.remove(&[3, 7], true).await.unwrap();
        client.remove(&[], true).await.unwrap();
    }

    #[tokio::test]
    async fn rpc_level_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "no such method", "arguments": {}
            })))
            .mount(&server)
            .await;

        let client = TransmissionClient::new(&config(&server)).unwrap();
        let err = client.torrents().await.unwrap_err();
        assert!(matches!(err, Error::Rpc(msg) if msg.contains("no such method")));
    }

    #[tokio::test]
    async fn unauthorized_is_an_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = TransmissionClient::new(&config(&server)).unwrap();
        let err = client.torrents().await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
    }

    #[test]
    fn ratios_sort_descending_with_unavailable_last() {
        let torrents = vec![
            info(1, "a", 0.5),
            info(2, "b", -1.0),
            info(3, "c", 3.0),
            info(4, "d", f64::NAN),
            info(5, "e", 1.25),
        ];
        let order: Vec<&str> = sorted_by_ratio(&torrents)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(&order[..3], ["c", "e", "a"]);
        assert!(order[3..].contains(&"b") && order[3..].contains(&"d"));
    }
}
