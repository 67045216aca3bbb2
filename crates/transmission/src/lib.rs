//! Names of torrents known to a Transmission daemon.
//!
//! Transmission protects its RPC endpoint against CSRF with a session id: a
//! request without the current id is answered with HTTP 409 and the id in the
//! `X-Transmission-Session-Id` header, and must be repeated with it.

pub mod error;

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use sweep_library::ActiveDownloads;
use sweep_library::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};

pub const SESSION_HEADER: &str = "X-Transmission-Session-Id";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Option<TorrentList>,
}

#[derive(Deserialize)]
struct TorrentList {
    #[serde(default)]
    torrents: Vec<Torrent>,
}

#[derive(Deserialize)]
struct Torrent {
    #[serde(default)]
    name: Option<String>,
}

pub struct TransmissionSource {
    client: reqwest::Client,
    url: String,
    credentials: Option<(String, Option<String>)>,
    session: Mutex<Option<String>>,
}
impl TransmissionSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().or_raise(|| ErrorKind::Client)?;
        Ok(Self { client, url: url.into(), credentials: None, session: Mutex::new(None) })
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.credentials = Some((username.into(), password));
        self
    }

    fn session_id(&self) -> Option<String> {
        self.session.lock().ok().and_then(|guard| guard.clone())
    }

    fn set_session_id(&self, id: String) {
        if let Ok(mut guard) = self.session.lock() {
            *guard = Some(id);
        }
    }

    async fn send(&self, body: &serde_json::Value) -> Result<reqwest::Response> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, password.as_deref());
        }
        if let Some(id) = self.session_id() {
            request = request.header(SESSION_HEADER, id);
        }
        Ok(request.send().await.map_err(ErrorKind::Request)?)
    }

    /// Calls `torrent-get` and returns the non-blank torrent names.
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    pub async fn torrent_names(&self) -> Result<HashSet<String>> {
        let body = serde_json::json!({ "method": "torrent-get", "arguments": { "fields": ["name"] } });
        let mut response = self.send(&body).await?;
        if response.status() == StatusCode::CONFLICT {
            let Some(id) = response.headers().get(SESSION_HEADER).and_then(|v| v.to_str().ok()) else {
                exn::bail!(ErrorKind::Handshake);
            };
            tracing::debug!("Refreshed Transmission session id");
            self.set_session_id(id.to_string());
            response = self.send(&body).await?;
        }
        match response.status() {
            StatusCode::CONFLICT => exn::bail!(ErrorKind::Handshake),
            StatusCode::UNAUTHORIZED => exn::bail!(ErrorKind::Unauthorized),
            status if !status.is_success() => exn::bail!(ErrorKind::Status(status.as_u16())),
            _ => {},
        }
        let rpc: RpcResponse = response.json().await.or_raise(|| ErrorKind::Decode)?;
        if rpc.result != "success" {
            exn::bail!(ErrorKind::Rpc(rpc.result));
        }
        let names: HashSet<String> = rpc
            .arguments
            .map(|args| args.torrents)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|torrent| torrent.name)
            .filter(|name| !name.trim().is_empty())
            .collect();
        tracing::info!(count = names.len(), "Fetched active torrents");
        Ok(names)
    }
}

#[async_trait]
impl ActiveDownloads for TransmissionSource {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn fetch(&self) -> LibraryResult<HashSet<String>> {
        self.torrent_names().await.or_raise(|| LibraryErrorKind::Fetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn torrents(names: &[&str]) -> serde_json::Value {
        let torrents: Vec<_> = names.iter().map(|n| serde_json::json!({ "name": n })).collect();
        serde_json::json!({ "result": "success", "arguments": { "torrents": torrents } })
    }

    async fn source(server: &MockServer) -> TransmissionSource {
        TransmissionSource::new(format!("{}/transmission/rpc", server.uri()), DEFAULT_TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn test_session_handshake() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(SESSION_HEADER, "abc123"))
            .and(body_partial_json(serde_json::json!({ "method": "torrent-get" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(torrents(&["MovieA", "", "Show S01"])))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).insert_header(SESSION_HEADER, "abc123"))
            .expect(1)
            .mount(&server)
            .await;

        let names = source(&server).await.fetch().await.unwrap();
        let expected: HashSet<String> = ["MovieA", "Show S01"].into_iter().map(String::from).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_basic_auth_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(torrents(&[])))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(401)).mount(&server).await;

        let names = source(&server).await.with_credentials("admin", Some("secret".into())).torrent_names().await;
        assert!(names.unwrap().is_empty());
        let err = source(&server).await.torrent_names().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unauthorized));
    }

    #[tokio::test]
    async fn test_rpc_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "no such method" })))
            .mount(&server)
            .await;
        let err = source(&server).await.torrent_names().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Rpc(msg) if msg == "no such method"));
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_fetch_failure() {
        let source = TransmissionSource::new("http://127.0.0.1:9/transmission/rpc", Duration::from_secs(2)).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(&*err, LibraryErrorKind::Fetch));
    }
}
