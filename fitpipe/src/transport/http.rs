//! `reqwest`-backed transport.

use super::TransportExecutor;
use crate::config::ClientConfig;
use crate::core::{ApiRequest, ApiResponse, Method};
use crate::errors::{ConfigError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::error::Error as _;
use url::Url;

/// Sends requests with a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Builds a transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the TLS backend cannot
    /// be initialised.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Wraps an existing client. `base_url` should end with a slash.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a request path against the base URL.
    ///
    /// A leading slash is ignored so a base URL with a path prefix keeps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined.
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::new(TransportErrorKind::Request, format!("{path}: {e}")))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn map_error(err: &reqwest::Error) -> TransportError {
    let message = describe(err);
    let lowered = message.to_ascii_lowercase();

    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("handshake") {
        TransportErrorKind::Tls
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_builder() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    };

    TransportError::new(kind, message)
}

#[async_trait]
impl TransportExecutor for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;

        let mut builder = self.client.request(to_reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| map_error(&e))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| map_error(&e))?;

        Ok(ApiResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::new(&ClientConfig::new().with_base_url(base)).unwrap()
    }

    #[test]
    fn test_url_for_joins_relative_paths() {
        let t = transport("https://10.0.2.2:8443/");
        assert_eq!(
            t.url_for("api/entrenamientos/5").unwrap().as_str(),
            "https://10.0.2.2:8443/api/entrenamientos/5"
        );
        assert_eq!(t.url_for("/login").unwrap().as_str(), "https://10.0.2.2:8443/login");
    }

    #[test]
    fn test_url_for_keeps_base_prefix() {
        let t = transport("https://gym.example.com/backend");
        assert_eq!(
            t.url_for("/api/series?x=1").unwrap().as_str(),
            "https://gym.example.com/backend/api/series?x=1"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        assert!(ReqwestTransport::new(&ClientConfig::new().with_base_url("::")).is_err());
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_connect() {
        // Port 1 on loopback is closed in any sane environment.
        let t = transport("http://127.0.0.1:1/");
        let err = t.execute(&ApiRequest::get("api/entrenamientos")).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Connect);
    }
}
