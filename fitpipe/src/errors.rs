//! Error types for the request pipeline.
//!
//! The pipeline itself never invents failures: transport errors are passed
//! through untouched and HTTP error statuses are ordinary responses. The
//! types here cover what sits around the pipeline (configuration, session
//! persistence, the auth API) plus the wrapper handed back to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The transport could not complete the exchange.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Client construction or configuration failed.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A request or response body could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A typed helper received a non-success status.
    #[error("Unexpected status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// The worker running the request died before producing a result.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Returns the transport error if this is one.
    #[must_use]
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Coarse classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The host could not be reached (refused, reset, DNS).
    Connect,
    /// The exchange did not finish in time.
    Timeout,
    /// TLS negotiation or certificate validation failed.
    Tls,
    /// The request could not be built or sent.
    Request,
    /// Anything else the transport reports.
    Other,
}

impl TransportErrorKind {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Tls => "tls",
            Self::Request => "request",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error raised when the transport fails before any response arrives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transport failure ({kind}): {message}")]
pub struct TransportError {
    /// What kind of failure occurred.
    pub kind: TransportErrorKind,
    /// Human-readable cause.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a connection failure.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    /// Creates a timeout failure.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Creates a TLS failure.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Tls, message)
    }

    /// Returns true for connection failures.
    #[must_use]
    pub fn is_connect(&self) -> bool {
        self.kind == TransportErrorKind::Connect
    }

    /// Returns true for timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

/// Errors raised while loading or validating client configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The base URL could not be parsed.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration value was out of range or malformed.
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// The configuration key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configuration source could not be read or parsed.
    #[error("Failed to load configuration from {source_name}: {reason}")]
    Load {
        /// File path or other source label.
        source_name: String,
        /// Underlying cause.
        reason: String,
    },

    /// The HTTP transport could not be initialised.
    #[error("Failed to build transport: {0}")]
    Transport(String),
}

impl ConfigError {
    /// Creates an invalid base URL error.
    #[must_use]
    pub fn invalid_base_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a load error.
    #[must_use]
    pub fn load(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by session persistence backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file could not be read or written.
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file contents were not valid.
    #[error("Storage data corrupt: {0}")]
    Corrupt(String),
}

/// Errors returned by the authentication API.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend rejected the credentials.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The backend answered with an unexpected status.
    #[error("Unexpected status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Body excerpt or backend message.
        message: String,
    },

    /// The login response was missing required fields.
    #[error("Malformed login response: {0}")]
    MalformedResponse(String),

    /// The request never produced a response.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        Self::Pipeline(PipelineError::Transport(err))
    }
}
