//! Stage 1: bearer credential injection.

use super::Interceptor;
use crate::config::ExcludedPaths;
use crate::core::{ApiRequest, AUTHORIZATION};
use crate::session::SessionStore;
use std::sync::Arc;
use tracing::debug;

/// Attaches `Authorization: Bearer <token>` from the session store.
///
/// Login and registration are left untouched regardless of session state.
/// Without a token the request goes out bare and the backend's 401 is
/// handled further down the chain.
pub struct CredentialInjector {
    session: Arc<SessionStore>,
    excluded: ExcludedPaths,
}

impl CredentialInjector {
    /// Creates a new injector.
    #[must_use]
    pub fn new(session: Arc<SessionStore>, excluded: ExcludedPaths) -> Self {
        Self { session, excluded }
    }
}

impl Interceptor for CredentialInjector {
    fn name(&self) -> &str {
        "credentials"
    }

    fn before(&self, mut request: ApiRequest) -> ApiRequest {
        if self.excluded.is_injection_exempt(&request.path) {
            debug!(path = %request.path, "Credential injection skipped for exempt path");
            return request;
        }

        if let Some(token) = self.session.token() {
            request.set_header(AUTHORIZATION, format!("Bearer {token}"));
        }
        request
    }
}
