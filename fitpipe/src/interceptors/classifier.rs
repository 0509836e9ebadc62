//! Stage 3: forced logout on a rejected credential.

use super::Interceptor;
use crate::config::ExcludedPaths;
use crate::core::{ApiRequest, ApiResponse};
use crate::redirect::{dispatch_redirect, RedirectNotice, RedirectReason, SessionRedirector};
use crate::session::SessionStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ends the session when the backend answers 401.
///
/// The current-password check is exempt: there a 401 means the password the
/// user typed was wrong, and logging out would throw away a perfectly good
/// session. Otherwise the login fields are cleared, a redirect to login is
/// dispatched in the background, and the 401 still reaches the caller.
/// The request is never retried.
pub struct FailureClassifier {
    session: Arc<SessionStore>,
    redirector: Arc<dyn SessionRedirector>,
    excluded: ExcludedPaths,
}

impl FailureClassifier {
    /// Creates a new classifier.
    #[must_use]
    pub fn new(
        session: Arc<SessionStore>,
        redirector: Arc<dyn SessionRedirector>,
        excluded: ExcludedPaths,
    ) -> Self {
        Self {
            session,
            redirector,
            excluded,
        }
    }
}

impl Interceptor for FailureClassifier {
    fn name(&self) -> &str {
        "classifier"
    }

    fn after(&self, request: &ApiRequest, response: ApiResponse) -> ApiResponse {
        if !response.is_unauthorized() {
            return response;
        }

        if self.excluded.is_logout_exempt(&request.path) {
            debug!(path = %request.path, "401 on password validation; session kept");
            return response;
        }

        warn!(path = %request.path, "401 received; ending session");
        self.session.clear();
        dispatch_redirect(
            self.redirector.clone(),
            RedirectNotice::new(RedirectReason::SessionExpired).with_path(request.route()),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::MockSessionRedirector;
    use crate::testing::RecordingRedirector;
    use std::time::Duration;

    fn logged_in() -> Arc<SessionStore> {
        let session = Arc::new(SessionStore::in_memory());
        session.save("abc", "alice", ["ROLE_USER"]);
        session
    }

    #[tokio::test]
    async fn test_non_401_passes_through() {
        let session = logged_in();
        let mut mock = MockSessionRedirector::new();
        mock.expect_redirect_to_login().never();
        let classifier =
            FailureClassifier::new(session.clone(), Arc::new(mock), ExcludedPaths::default());

        for status in [200, 403, 404, 500] {
            let response = classifier.after(&ApiRequest::get("api/series"), ApiResponse::new(status));
            assert_eq!(response.status, status);
        }
        assert_eq!(session.token(), Some("abc".to_string()));
    }

    #[tokio::test]
    async fn test_password_validation_401_keeps_session() {
        let session = logged_in();
        let redirector = Arc::new(RecordingRedirector::new());
        let classifier =
            FailureClassifier::new(session.clone(), redirector.clone(), ExcludedPaths::default());

        let response = classifier.after(
            &ApiRequest::post("api/usuarios/username/alice/validate-password"),
            ApiResponse::new(401),
        );

        assert_eq!(response.status, 401);
        assert_eq!(session.token(), Some("abc".to_string()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(redirector.count(), 0);
    }

    #[tokio::test]
    async fn test_401_clears_session_and_redirects_once() {
        let session = logged_in();
        let redirector = Arc::new(RecordingRedirector::new());
        let classifier =
            FailureClassifier::new(session.clone(), redirector.clone(), ExcludedPaths::default());

        let response = classifier.after(
            &ApiRequest::get("api/entrenamientos/5?expand=true"),
            ApiResponse::new(401).with_body("expired"),
        );

        assert_eq!(response.status, 401);
        assert_eq!(response.text(), "expired");
        assert!(session.token().is_none());

        let notice = redirector.wait_for(1, Duration::from_secs(2)).await.remove(0);
        assert_eq!(notice.reason, RedirectReason::SessionExpired);
        assert_eq!(notice.path.as_deref(), Some("api/entrenamientos/5"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(redirector.count(), 1);
    }
}
