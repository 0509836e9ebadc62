//! Interceptor chain for ordered request/response handling.

use crate::core::{ApiRequest, ApiResponse};
use crate::errors::TransportError;
use crate::transport::TransportExecutor;
use std::sync::Arc;
use tracing::trace;

/// A pipeline stage.
///
/// Stages are synchronous: the transport call is the only suspension point
/// of a request. A stage may rewrite the outgoing request and observe or
/// rewrite the response, but it can never turn a transport failure into a
/// response or swallow it.
pub trait Interceptor: Send + Sync {
    /// Returns the stage name used in log lines.
    fn name(&self) -> &str;

    /// Called before the transport runs.
    fn before(&self, request: ApiRequest) -> ApiRequest {
        request
    }

    /// Called after a response arrived, whatever its status.
    fn after(&self, _request: &ApiRequest, response: ApiResponse) -> ApiResponse {
        response
    }

    /// Called when the transport failed. The error is propagated afterwards.
    fn on_error(&self, _request: &ApiRequest, _error: &TransportError) {}
}

/// An ordered list of stages.
///
/// Both phases walk the stages in insertion order: every `before` runs,
/// then the transport, then every `after` (or `on_error`).
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.interceptors.iter().map(|i| i.name()))
            .finish()
    }
}

impl InterceptorChain {
    /// Creates a new empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Appends a stage.
    pub fn add(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Appends a stage, builder style.
    #[must_use]
    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.add(interceptor);
        self
    }

    /// Runs every `before` hook.
    #[must_use]
    pub fn run_before(&self, mut request: ApiRequest) -> ApiRequest {
        for interceptor in &self.interceptors {
            trace!(stage = interceptor.name(), request_id = %request.id, "before");
            request = interceptor.before(request);
        }
        request
    }

    /// Runs every `after` hook.
    #[must_use]
    pub fn run_after(&self, request: &ApiRequest, mut response: ApiResponse) -> ApiResponse {
        for interceptor in &self.interceptors {
            trace!(stage = interceptor.name(), request_id = %request.id, status = response.status, "after");
            response = interceptor.after(request, response);
        }
        response
    }

    /// Runs every `on_error` hook.
    pub fn handle_error(&self, request: &ApiRequest, error: &TransportError) {
        for interceptor in &self.interceptors {
            trace!(stage = interceptor.name(), request_id = %request.id, "on_error");
            interceptor.on_error(request, error);
        }
    }

    /// Runs the full chain around one transport call.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged after the `on_error` hooks ran.
    pub async fn execute(
        &self,
        request: ApiRequest,
        transport: &dyn TransportExecutor,
    ) -> Result<ApiResponse, TransportError> {
        let request = self.run_before(request);
        match transport.execute(&request).await {
            Ok(response) => Ok(self.run_after(&request, response)),
            Err(error) => {
                self.handle_error(&request, &error);
                Err(error)
            }
        }
    }

    /// Returns the stage names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.interceptors.iter().map(|i| i.name().to_string()).collect()
    }

    /// Returns the number of interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}
