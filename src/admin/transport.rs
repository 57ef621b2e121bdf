//! Authenticated HTTP transport for the Pulsar admin API.
//!
//! The transport only moves bytes: it injects the bearer token and applies the
//! TLS hostname override, but leaves status code interpretation to the
//! resource clients.

use super::error::{PulsarError, PulsarResult};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Default location of the mounted Pulsar admin token
pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/pulsar/TOKEN";

/// HTTP verbs used against the admin API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(verb)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Status code and body text of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    /// 200 through 204, the range most admin writes answer with.
    pub fn is_success(&self) -> bool {
        (200..=204).contains(&self.status)
    }

    /// Decode the body, reporting failures as [`PulsarError::Parsing`].
    pub fn json<T: DeserializeOwned>(&self) -> PulsarResult<T> {
        serde_json::from_str(&self.body).map_err(|e| PulsarError::Parsing(e.to_string()))
    }
}

/// Issues requests against the admin API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Only a missing response is an error here.
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> PulsarResult<TransportResponse>;
}

/// Settings for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Admin API root, e.g. `https://pulsar-proxy.pulsar.svc:443/admin/v2`
    pub base_url: String,
    /// Hostname expected in the broker certificate when it differs from the
    /// connection hostname
    pub sni: Option<String>,
    /// File holding the bearer token, re-read on every request
    pub token_path: PathBuf,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            sni: None,
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`Transport`] backed by `reqwest` with rustls.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    sni: Option<String>,
    token_path: PathBuf,
}

impl HttpTransport {
    /// Build the client.
    ///
    /// With an SNI override the override hostname is pinned to the addresses
    /// of the base URL host, so connections still reach the configured
    /// service while certificate verification uses the override name.
    pub async fn new(config: HttpTransportConfig) -> PulsarResult<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout);

        if let Some(sni) = &config.sni {
            let base = Url::parse(&config.base_url)
                .map_err(|e| PulsarError::Transport(format!("Invalid base URL: {}", e)))?;
            let host = base
                .host_str()
                .ok_or_else(|| PulsarError::Transport("Base URL has no host".to_string()))?;
            let port = base.port_or_known_default().unwrap_or(443);
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
                .await
                .map_err(|e| PulsarError::Transport(format!("Unable to resolve {}: {}", host, e)))?
                .collect();
            debug!(sni = %sni, host = %host, addrs = ?addrs, "Pinning TLS hostname override");
            builder = builder.resolve_to_addrs(sni, &addrs);
        }

        let client = builder
            .build()
            .map_err(|e| PulsarError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url,
            sni: config.sni,
            token_path: config.token_path,
        })
    }

    /// Address HTTPS requests under the base URL to the override hostname.
    fn target_url(&self, url: &str) -> PulsarResult<Url> {
        let mut target =
            Url::parse(url).map_err(|e| PulsarError::Transport(format!("Invalid URL {}: {}", url, e)))?;

        if let Some(sni) = &self.sni {
            if target.scheme() == "https" && url.starts_with(&self.base_url) {
                target
                    .set_host(Some(sni))
                    .map_err(|e| PulsarError::Transport(format!("Invalid SNI {}: {}", sni, e)))?;
            }
        }

        Ok(target)
    }

    async fn read_token(&self) -> PulsarResult<Option<String>> {
        match tokio::fs::read_to_string(&self.token_path).await {
            Ok(token) => Ok(Some(token.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PulsarError::Transport(format!(
                "Unable to read token {}: {}",
                self.token_path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> PulsarResult<TransportResponse> {
        let mut request = self.client.request(method.into(), self.target_url(url)?);

        if let Some(token) = self.read_token().await? {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(method = %method, url = %url, "Sending admin request");
        let response = request
            .send()
            .await
            .map_err(|e| PulsarError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PulsarError::Transport(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
