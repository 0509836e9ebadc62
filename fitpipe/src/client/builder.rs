//! Client builder with the fixed stage order.

use super::{ApiClient, ClientInner};
use crate::config::{ClientConfig, HttpLogLevel};
use crate::connectivity::{ConnectivityState, Subscription};
use crate::errors::PipelineError;
use crate::interceptors::{
    CredentialInjector, FailureClassifier, InterceptorChain, LoggingInterceptor,
    ReachabilityMonitor,
};
use crate::redirect::{
    dispatch_redirect, LoggingRedirector, RedirectNotice, RedirectReason, SessionRedirector,
};
use crate::session::SessionStore;
use crate::transport::TransportExecutor;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builder for [`ApiClient`].
///
/// Services not supplied are created fresh: an in-memory session, a new
/// connectivity state (initially up), a logging-only redirector and, with
/// the `reqwest-transport` feature, a [`crate::transport::ReqwestTransport`].
#[derive(Clone)]
pub struct ApiClientBuilder {
    config: ClientConfig,
    session: Option<Arc<SessionStore>>,
    connectivity: Option<Arc<ConnectivityState>>,
    redirector: Option<Arc<dyn SessionRedirector>>,
    transport: Option<Arc<dyn TransportExecutor>>,
}

impl ApiClientBuilder {
    /// Creates a builder for `config`.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            session: None,
            connectivity: None,
            redirector: None,
            transport: None,
        }
    }

    /// Uses a shared session store.
    #[must_use]
    pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Uses a shared connectivity state.
    #[must_use]
    pub fn with_connectivity(mut self, connectivity: Arc<ConnectivityState>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Sets the UI port for login redirects.
    #[must_use]
    pub fn with_redirector(mut self, redirector: Arc<dyn SessionRedirector>) -> Self {
        self.redirector = Some(redirector);
        self
    }

    /// Sets the transport executor.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn TransportExecutor>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validates the configuration and composes the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for an invalid base URL or timeout,
    /// or if the transport cannot be created.
    pub fn build(self) -> Result<ApiClient, PipelineError> {
        let base_url = self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport(&self.config)?,
        };
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(SessionStore::in_memory()));
        let connectivity = self
            .connectivity
            .unwrap_or_else(|| Arc::new(ConnectivityState::new()));
        let redirector = self
            .redirector
            .unwrap_or_else(|| Arc::new(LoggingRedirector));
        let excluded = self.config.excluded_paths.clone();

        let mut chain = InterceptorChain::new()
            .with(Arc::new(CredentialInjector::new(session.clone(), excluded.clone())))
            .with(Arc::new(ReachabilityMonitor::new(connectivity.clone())))
            .with(Arc::new(FailureClassifier::new(
                session.clone(),
                redirector.clone(),
                excluded,
            )));
        if self.config.log_level != HttpLogLevel::None {
            chain.add(Arc::new(LoggingInterceptor::new(self.config.log_level)));
        }

        let logout_watcher = self
            .config
            .logout_on_connectivity_loss
            .then(|| watch_connectivity_loss(&connectivity, session.clone(), redirector));

        info!(
            base_url = %base_url,
            transport = transport.name(),
            stages = ?chain.names(),
            "API client ready"
        );

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                base_url,
                chain,
                transport,
                session,
                connectivity,
                logout_watcher,
            }),
        })
    }
}

/// Ends the session whenever the backend is flagged unreachable.
///
/// Acts on the current flag, not the queued value: a `false` already
/// overtaken by `mark_up` is ignored. Only redirects if there was a session
/// to end.
fn watch_connectivity_loss(
    connectivity: &Arc<ConnectivityState>,
    session: Arc<SessionStore>,
    redirector: Arc<dyn SessionRedirector>,
) -> Subscription {
    let state = Arc::downgrade(connectivity);
    connectivity.subscribe(move |up| {
        if up {
            return;
        }
        if state.upgrade().map_or(true, |c| c.is_up()) {
            debug!("Stale connectivity loss ignored");
            return;
        }
        if session.clear() {
            warn!("Backend unreachable; ending session");
            dispatch_redirect(
                redirector.clone(),
                RedirectNotice::new(RedirectReason::ConnectivityLost),
            );
        }
    })
}

#[cfg(feature = "reqwest-transport")]
fn default_transport(config: &ClientConfig) -> Result<Arc<dyn TransportExecutor>, PipelineError> {
    Ok(Arc::new(crate::transport::ReqwestTransport::new(config)?))
}

#[cfg(not(feature = "reqwest-transport"))]
fn default_transport(_config: &ClientConfig) -> Result<Arc<dyn TransportExecutor>, PipelineError> {
    Err(crate::errors::ConfigError::Transport(
        "no transport supplied and the reqwest-transport feature is disabled".to_string(),
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingRedirector, ScriptedTransport};
    use std::time::Duration;

    fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config).with_transport(Arc::new(ScriptedTransport::new()))
    }

    #[tokio::test]
    async fn test_fixed_stage_order() {
        let client = builder(ClientConfig::new()).build().unwrap();
        assert_eq!(
            client.stage_names(),
            vec!["credentials", "reachability", "classifier", "logging"]
        );
    }

    #[tokio::test]
    async fn test_logging_stage_omitted_at_none() {
        let client = builder(ClientConfig::new().with_log_level(HttpLogLevel::None))
            .build()
            .unwrap();
        assert_eq!(
            client.stage_names(),
            vec!["credentials", "reachability", "classifier"]
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = builder(ClientConfig::new().with_base_url("ftp://gym.example.com"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test]
    async fn test_watcher_follows_config() {
        let connectivity = Arc::new(ConnectivityState::new());

        let client = builder(ClientConfig::new())
            .with_connectivity(connectivity.clone())
            .build()
            .unwrap();
        assert_eq!(connectivity.observer_count(), 1);
        drop(client);
        assert_eq!(connectivity.observer_count(), 0);

        let _client = builder(ClientConfig::new().with_logout_on_connectivity_loss(false))
            .with_connectivity(connectivity.clone())
            .build()
            .unwrap();
        assert_eq!(connectivity.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_overtaken_loss_keeps_session() {
        let connectivity = Arc::new(ConnectivityState::new());
        let redirector = Arc::new(RecordingRedirector::new());
        let client = builder(ClientConfig::new())
            .with_connectivity(connectivity.clone())
            .with_redirector(redirector.clone())
            .build()
            .unwrap();
        client.session().save("abc", "alice", ["ROLE_USER"]);

        connectivity.mark_down();
        connectivity.mark_up();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(connectivity.is_up());
        assert_eq!(client.session().token().as_deref(), Some("abc"));
        assert_eq!(redirector.count(), 0);
    }

    #[tokio::test]
    async fn test_current_loss_ends_session() {
        let connectivity = Arc::new(ConnectivityState::new());
        let redirector = Arc::new(RecordingRedirector::new());
        let client = builder(ClientConfig::new())
            .with_connectivity(connectivity.clone())
            .with_redirector(redirector.clone())
            .build()
            .unwrap();
        client.session().save("abc", "alice", ["ROLE_USER"]);

        connectivity.mark_down();

        let notices = redirector.wait_for(1, Duration::from_secs(2)).await;
        assert_eq!(notices[0].reason, RedirectReason::ConnectivityLost);
        assert!(!client.session().is_logged_in());
    }

    #[cfg(feature = "reqwest-transport")]
    #[tokio::test]
    async fn test_default_transport_is_reqwest() {
        let client = ApiClientBuilder::new(ClientConfig::new()).build().unwrap();
        assert_eq!(client.base_url().as_str(), "https://10.0.2.2:8443/");
        assert!(format!("{client:?}").contains("reqwest"));
    }
}
