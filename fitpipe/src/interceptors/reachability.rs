//! Stage 2: reachability monitoring around the transport call.

use super::Interceptor;
use crate::connectivity::ConnectivityState;
use crate::core::{ApiRequest, ApiResponse};
use crate::errors::{TransportError, TransportErrorKind};
use std::sync::Arc;
use tracing::debug;

/// Flags connectivity from the transport outcome.
///
/// Any response proves the host is reachable and marks up; a 5xx then marks
/// down again because the service is unhealthy. Transport failures mark
/// down, except `TransportErrorKind::Request`: a request that could not be
/// built never reached the network and says nothing about the backend.
/// Nothing is swallowed.
pub struct ReachabilityMonitor {
    connectivity: Arc<ConnectivityState>,
}

impl ReachabilityMonitor {
    /// Creates a new monitor.
    #[must_use]
    pub fn new(connectivity: Arc<ConnectivityState>) -> Self {
        Self { connectivity }
    }
}

impl Interceptor for ReachabilityMonitor {
    fn name(&self) -> &str {
        "reachability"
    }

    fn after(&self, request: &ApiRequest, response: ApiResponse) -> ApiResponse {
        self.connectivity.mark_up();
        if response.is_server_error() {
            debug!(path = %request.path, status = response.status, "Server error; marking backend down");
            self.connectivity.mark_down();
        }
        response
    }

    fn on_error(&self, request: &ApiRequest, error: &TransportError) {
        if error.kind == TransportErrorKind::Request {
            debug!(path = %request.path, error = %error, "Request not sent; connectivity unchanged");
            return;
        }
        debug!(path = %request.path, error = %error, "Transport failure; marking backend down");
        self.connectivity.mark_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn monitor() -> (ReachabilityMonitor, Arc<ConnectivityState>) {
        let connectivity = Arc::new(ConnectivityState::new());
        (ReachabilityMonitor::new(connectivity.clone()), connectivity)
    }

    #[test]
    fn test_transport_failure_marks_down() {
        let (monitor, connectivity) = monitor();
        monitor.on_error(&ApiRequest::get("api/series"), &TransportError::connect("refused"));
        assert!(!connectivity.is_up());
    }

    #[test]
    fn test_unbuildable_request_leaves_connectivity() {
        let (monitor, connectivity) = monitor();
        monitor.on_error(
            &ApiRequest::get("api/series"),
            &TransportError::new(TransportErrorKind::Request, "invalid header value"),
        );
        assert!(connectivity.is_up());

        connectivity.mark_down();
        monitor.on_error(
            &ApiRequest::get("api/series"),
            &TransportError::new(TransportErrorKind::Request, "bad url"),
        );
        assert!(!connectivity.is_up());
    }

    #[test]
    fn test_response_marks_up() {
        let (monitor, connectivity) = monitor();
        connectivity.mark_down();

        let response = monitor.after(&ApiRequest::get("api/series"), ApiResponse::new(404));
        assert_eq!(response.status, 404);
        assert!(connectivity.is_up());
    }

    #[test]
    fn test_server_error_ends_down() {
        let (monitor, connectivity) = monitor();
        let response = monitor.after(&ApiRequest::get("api/series"), ApiResponse::new(503));
        assert_eq!(response.status, 503);
        assert!(!connectivity.is_up());
    }

    #[tokio::test]
    async fn test_server_error_notifies_up_then_down() {
        let (monitor, connectivity) = monitor();
        let (tx, mut rx) = mpsc::unbounded_channel();
        connectivity.subscribe(move |up| {
            let _ = tx.send(up);
        });

        let _ = monitor.after(&ApiRequest::get("api/series"), ApiResponse::new(500));

        let mut seen = Vec::new();
        for _ in 0..2 {
            seen.push(
                tokio::time::timeout(Duration::from_secs(2), rx.recv())
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        assert_eq!(seen, vec![true, false]);
    }
}
