//! Port through which the pipeline asks the UI to return to the login screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Why the user is being sent back to login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// The backend rejected the bearer token.
    SessionExpired,
    /// The backend became unreachable while logged in.
    ConnectivityLost,
}

impl RedirectReason {
    /// Default user-visible message for this reason.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::SessionExpired => "Your session has expired. Please log in again.",
            Self::ConnectivityLost => "Connection to the server was lost. Please log in again.",
        }
    }
}

/// A request to show the login screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectNotice {
    /// Why the redirect was requested.
    pub reason: RedirectReason,
    /// Toast-style message to show the user.
    pub message: String,
    /// Path of the request that caused it, if any.
    pub path: Option<String>,
    /// When the pipeline asked for it.
    pub issued_at: DateTime<Utc>,
}

impl RedirectNotice {
    /// Creates a notice with the reason's default message.
    #[must_use]
    pub fn new(reason: RedirectReason) -> Self {
        Self {
            reason,
            message: reason.default_message().to_string(),
            path: None,
            issued_at: Utc::now(),
        }
    }

    /// Records the triggering path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Implemented by the UI layer to perform the transition to login.
#[cfg_attr(test, mockall::automock)]
pub trait SessionRedirector: Send + Sync {
    /// Shows `notice.message` and navigates to the login screen.
    fn redirect_to_login(&self, notice: &RedirectNotice);
}

/// A redirector that only logs, for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRedirector;

impl SessionRedirector for LoggingRedirector {
    fn redirect_to_login(&self, notice: &RedirectNotice) {
        warn!(reason = ?notice.reason, path = ?notice.path, "{}", notice.message);
    }
}

/// Hands a notice to the redirector without blocking the caller.
///
/// Runs on a blocking-pool task inside a tokio runtime, on a fresh thread
/// otherwise. A panicking redirector is logged and otherwise ignored.
pub fn dispatch_redirect(redirector: Arc<dyn SessionRedirector>, notice: RedirectNotice) {
    debug!(reason = ?notice.reason, "Dispatching login redirect");

    let run = move || {
        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            redirector.redirect_to_login(&notice);
        })) {
            warn!("Session redirector panicked: {:?}", e);
        }
    };

    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn_blocking(run);
    } else {
        std::thread::spawn(run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_notice_defaults() {
        let notice = RedirectNotice::new(RedirectReason::SessionExpired).with_path("api/series/1");
        assert_eq!(notice.message, RedirectReason::SessionExpired.default_message());
        assert_eq!(notice.path.as_deref(), Some("api/series/1"));
    }

    #[tokio::test]
    async fn test_dispatch_calls_redirector_once() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut mock = MockSessionRedirector::new();
        mock.expect_redirect_to_login()
            .withf(|n| n.reason == RedirectReason::ConnectivityLost)
            .times(1)
            .returning(move |_| {
                let _ = tx.send(());
            });

        dispatch_redirect(Arc::new(mock), RedirectNotice::new(RedirectReason::ConnectivityLost));

        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_logging_redirector_does_not_panic() {
        LoggingRedirector.redirect_to_login(&RedirectNotice::new(RedirectReason::SessionExpired));
    }
}
