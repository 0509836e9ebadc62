//! The HTTP executor the pipeline wraps.
//!
//! The pipeline never speaks HTTP itself. It hands a fully formed
//! [`ApiRequest`] to a [`TransportExecutor`] and gets back either a response
//! (any status) or a [`TransportError`].

#[cfg(feature = "reqwest-transport")]
mod http;

#[cfg(feature = "reqwest-transport")]
pub use http::ReqwestTransport;

use crate::core::{ApiRequest, ApiResponse};
use crate::errors::TransportError;
use async_trait::async_trait;

/// Protocol for executing a request on the wire.
#[async_trait]
pub trait TransportExecutor: Send + Sync {
    /// Sends the request and waits for the complete response.
    ///
    /// HTTP error statuses are `Ok`; only failures to obtain a response at
    /// all are `Err`.
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;

    /// Short label used in log lines.
    fn name(&self) -> &str {
        "transport"
    }
}
