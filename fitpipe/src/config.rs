//! Client configuration.
//!
//! Every field has a serde default so partial JSON documents and empty
//! environments both produce a usable configuration. Values are only checked
//! by [`ClientConfig::validate`], which the client builder calls once at
//! startup.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::core::path_without_query;

/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "FITPIPE_BASE_URL";
/// Environment variable overriding the transport timeout.
pub const ENV_TIMEOUT_SECONDS: &str = "FITPIPE_TIMEOUT_SECONDS";
/// Environment variable enabling self-signed development certificates.
pub const ENV_ACCEPT_INVALID_CERTS: &str = "FITPIPE_ACCEPT_INVALID_CERTS";
/// Environment variable selecting the HTTP log level.
pub const ENV_LOG_LEVEL: &str = "FITPIPE_LOG_LEVEL";

/// Login endpoint suffix; never carries a credential.
pub const LOGIN_SUFFIX: &str = "/login";
/// Registration endpoint suffix; never carries a credential.
pub const REGISTER_SUFFIX: &str = "/usuarios/registrar";
/// Current-password check suffix; a 401 here means "wrong password".
pub const VALIDATE_PASSWORD_SUFFIX: &str = "/validate-password";

/// How much of each exchange the logging stage writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpLogLevel {
    /// Logging stage is not installed.
    None,
    /// Method, path, status and latency.
    #[default]
    Basic,
    /// Basic plus headers (credentials redacted).
    Headers,
    /// Headers plus bodies.
    Body,
}

impl FromStr for HttpLogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            "headers" => Ok(Self::Headers),
            "body" => Ok(Self::Body),
            other => Err(ConfigError::invalid_value(
                "log_level",
                format!("unknown level '{other}'"),
            )),
        }
    }
}

/// Path suffixes that change how the pipeline treats a request.
///
/// Suffixes are matched against the encoded path (query stripped, leading
/// slash implied), mirroring what the backend routes on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedPaths {
    /// Requests whose path ends with one of these never get a bearer header.
    #[serde(default = "default_injection_exempt")]
    pub injection_exempt: Vec<String>,
    /// A 401 on one of these paths does not end the session.
    #[serde(default = "default_logout_exempt")]
    pub logout_exempt: Vec<String>,
}

fn default_injection_exempt() -> Vec<String> {
    vec![LOGIN_SUFFIX.to_string(), REGISTER_SUFFIX.to_string()]
}

fn default_logout_exempt() -> Vec<String> {
    vec![VALIDATE_PASSWORD_SUFFIX.to_string()]
}

impl Default for ExcludedPaths {
    fn default() -> Self {
        Self {
            injection_exempt: default_injection_exempt(),
            logout_exempt: default_logout_exempt(),
        }
    }
}

impl ExcludedPaths {
    /// Whether the credential injector must leave this path alone.
    #[must_use]
    pub fn is_injection_exempt(&self, path: &str) -> bool {
        matches_suffix(&self.injection_exempt, path)
    }

    /// Whether a 401 on this path must not trigger a forced logout.
    #[must_use]
    pub fn is_logout_exempt(&self, path: &str) -> bool {
        matches_suffix(&self.logout_exempt, path)
    }
}

fn encoded_path(path: &str) -> Cow<'_, str> {
    let path = path_without_query(path);
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

fn matches_suffix(suffixes: &[String], path: &str) -> bool {
    let path = encoded_path(path);
    suffixes.iter().any(|suffix| path.ends_with(suffix.as_str()))
}

/// Configuration for the API client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend root; request paths are resolved against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Transport timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Accept self-signed certificates (development backends only).
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Diagnostic logging level.
    #[serde(default)]
    pub log_level: HttpLogLevel,
    /// Clear the session and redirect to login when connectivity drops.
    #[serde(default = "default_logout_on_connectivity_loss")]
    pub logout_on_connectivity_loss: bool,
    /// Exempt path table.
    #[serde(default)]
    pub excluded_paths: ExcludedPaths,
}

fn default_base_url() -> String {
    // Host loopback as seen from the Android emulator.
    "https://10.0.2.2:8443/".to_string()
}

fn default_timeout() -> f64 {
    30.0
}

fn default_logout_on_connectivity_loss() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            accept_invalid_certs: false,
            log_level: HttpLogLevel::default(),
            logout_on_connectivity_loss: default_logout_on_connectivity_loss(),
            excluded_paths: ExcludedPaths::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: HttpLogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Enables or disables self-signed certificates.
    #[must_use]
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Enables or disables logout on connectivity loss.
    #[must_use]
    pub fn with_logout_on_connectivity_loss(mut self, enabled: bool) -> Self {
        self.logout_on_connectivity_loss = enabled;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON for this type.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::load("json", e.to_string()))
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::load(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&contents)
            .map_err(|e| ConfigError::load(path.display().to_string(), e.to_string()))
    }

    /// Builds a configuration from defaults overlaid with `FITPIPE_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlays values from a lookup function onto this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value is malformed.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECONDS) {
            self.timeout_seconds = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_value(ENV_TIMEOUT_SECONDS, format!("'{raw}' is not a number")))?;
        }
        if let Some(raw) = lookup(ENV_ACCEPT_INVALID_CERTS) {
            self.accept_invalid_certs = parse_bool(ENV_ACCEPT_INVALID_CERTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            self.log_level = raw.parse()?;
        }
        Ok(self)
    }

    /// Validates the configuration and returns the normalised base URL.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or non-HTTP base URL or a
    /// non-positive timeout.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(ConfigError::invalid_value(
                "timeout_seconds",
                "must be a positive number of seconds",
            ));
        }

        let mut url = Url::parse(self.base_url.trim())
            .map_err(|e| ConfigError::invalid_base_url(&self.base_url, e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid_base_url(
                &self.base_url,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::invalid_base_url(&self.base_url, "missing host"));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(key, format!("'{raw}' is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_excluded_paths_defaults() {
        let paths = ExcludedPaths::default();

        assert!(paths.is_injection_exempt("login"));
        assert!(paths.is_injection_exempt("/login"));
        assert!(paths.is_injection_exempt("api/usuarios/registrar"));
        assert!(!paths.is_injection_exempt("api/entrenamientos"));
        assert!(!paths.is_injection_exempt("api/usuarios/registrar/extra"));

        assert!(paths.is_logout_exempt("api/usuarios/username/alice/validate-password"));
        assert!(!paths.is_logout_exempt("api/entrenamientos/5"));
    }

    #[test]
    fn test_excluded_paths_ignore_query() {
        let paths = ExcludedPaths::default();
        assert!(paths.is_injection_exempt("login?redirect=home"));
        assert!(paths.is_logout_exempt("api/usuarios/username/bob/validate-password?x=1"));
    }

    #[test]
    fn test_suffix_is_segment_sensitive() {
        // "/relogin" ends with "login" but not with "/login".
        assert!(!ExcludedPaths::default().is_injection_exempt("api/relogin"));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://10.0.2.2:8443/");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.log_level, HttpLogLevel::Basic);
        assert!(config.logout_on_connectivity_loss);
    }

    #[test]
    fn test_partial_json() {
        let config =
            ClientConfig::from_json_str(r#"{"base_url": "http://localhost:8080", "log_level": "body"}"#)
                .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.log_level, HttpLogLevel::Body);
        assert_eq!(config.excluded_paths, ExcludedPaths::default());
    }

    #[test]
    fn test_validate_normalises_trailing_slash() {
        let url = ClientConfig::new()
            .with_base_url("https://gym.example.com/backend")
            .validate()
            .unwrap();
        assert_eq!(url.as_str(), "https://gym.example.com/backend/");
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        assert!(ClientConfig::new().with_base_url("not a url").validate().is_err());
        assert!(ClientConfig::new().with_base_url("ftp://example.com/").validate().is_err());
        assert!(ClientConfig::new().with_timeout(0.0).validate().is_err());
    }

    #[test]
    fn test_overlay_from_lookup() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://127.0.0.1:9000/"),
            (ENV_TIMEOUT_SECONDS, "5"),
            (ENV_ACCEPT_INVALID_CERTS, "yes"),
            (ENV_LOG_LEVEL, "headers"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::default()
            .overlay(|key| env.get(key).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:9000/");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.accept_invalid_certs);
        assert_eq!(config.log_level, HttpLogLevel::Headers);
    }

    #[test]
    fn test_overlay_rejects_malformed_values() {
        let result = ClientConfig::default().overlay(|key| {
            (key == ENV_TIMEOUT_SECONDS).then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, r#"{"timeout_seconds": 12.5}"#).unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs_f64(12.5));

        assert!(ClientConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
