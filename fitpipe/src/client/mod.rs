//! Pipeline composition and the client handed to callers.
//!
//! An [`ApiClient`] owns the fixed stage chain, the transport and handles to
//! the shared session and connectivity services. Clones are cheap and share
//! everything.

mod builder;
mod provider;

pub use builder::ApiClientBuilder;
pub use provider::ApiClientProvider;

use crate::config::ClientConfig;
use crate::connectivity::{ConnectivityState, Subscription};
use crate::core::{ApiRequest, ApiResponse, ClassifiedOutcome, Method};
use crate::errors::PipelineError;
use crate::interceptors::InterceptorChain;
use crate::session::SessionStore;
use crate::transport::TransportExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

struct ClientInner {
    config: ClientConfig,
    base_url: Url,
    chain: InterceptorChain,
    transport: Arc<dyn TransportExecutor>,
    session: Arc<SessionStore>,
    connectivity: Arc<ConnectivityState>,
    logout_watcher: Option<Subscription>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(ref subscription) = self.logout_watcher {
            self.connectivity.unsubscribe(subscription);
        }
    }
}

/// The composed request pipeline.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("stages", &self.inner.chain)
            .field("transport", &self.inner.transport.name())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Starts a builder for `config`.
    #[must_use]
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    /// Runs `request` through the pipeline.
    ///
    /// The chain runs on its own task: if the returned future is dropped
    /// the request still completes and its session and connectivity side
    /// effects are still applied.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Transport`] when no response arrived and
    /// [`PipelineError::Internal`] if the worker task died. HTTP error
    /// statuses are returned as responses.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, PipelineError> {
        let inner = self.inner.clone();
        let request_id = request.id;
        debug!(request_id = %request_id, method = %request.method, path = %request.path, "Dispatching request");

        let worker = tokio::spawn(async move {
            inner
                .chain
                .execute(request, inner.transport.as_ref())
                .await
        });

        match worker.await {
            Ok(result) => result.map_err(PipelineError::from),
            Err(e) => {
                error!(request_id = %request_id, error = %e, "Request worker failed");
                Err(PipelineError::Internal(format!("request worker failed: {e}")))
            }
        }
    }

    /// Runs `request` and classifies the result.
    ///
    /// Transport failures are folded into the outcome rather than returned
    /// as errors.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Internal`] if the worker task died.
    pub async fn execute_classified(
        &self,
        request: ApiRequest,
    ) -> Result<ClassifiedOutcome, PipelineError> {
        let probe = request.clone();
        let result = match self.execute(request).await {
            Ok(response) => Ok(response),
            Err(PipelineError::Transport(e)) => Err(e),
            Err(other) => return Err(other),
        };
        Ok(ClassifiedOutcome::classify(
            &probe,
            result,
            &self.inner.config.excluded_paths,
        ))
    }

    /// GETs `path` and decodes a 2xx JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Status`] for non-2xx responses, plus the
    /// errors of [`ApiClient::execute`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PipelineError> {
        let response = self.execute(ApiRequest::get(path)).await?;
        decode(&response)
    }

    /// Sends `body` as JSON and decodes a 2xx JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Serialization`] if `body` cannot be encoded,
    /// [`PipelineError::Status`] for non-2xx responses, plus the errors of
    /// [`ApiClient::execute`].
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, PipelineError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(method, path).with_json(body)?;
        let response = self.execute(request).await?;
        decode(&response)
    }

    /// Returns the shared session store.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    /// Returns the shared connectivity state.
    #[must_use]
    pub fn connectivity(&self) -> &Arc<ConnectivityState> {
        &self.inner.connectivity
    }

    /// Returns the configuration the client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the validated base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.inner.chain.names()
    }

    /// Returns true if both handles share the same pipeline.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, PipelineError> {
    if !response.is_success() {
        return Err(PipelineError::Status {
            status: response.status,
            message: response.text(),
        });
    }
    if response.body.is_empty() {
        return Ok(serde_json::from_value(serde_json::Value::Null)?);
    }
    Ok(response.json_body()?)
}
