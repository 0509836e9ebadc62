//! Mock transports and redirectors for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::core::{ApiRequest, ApiResponse};
use crate::errors::{TransportError, TransportErrorKind};
use crate::redirect::{RedirectNotice, SessionRedirector};
use crate::transport::TransportExecutor;

/// A transport that replays queued results in order and records every
/// request it receives.
///
/// An exhausted script yields a `TransportErrorKind::Other` failure.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    /// Creates a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    #[must_use]
    pub fn respond(self, response: ApiResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queues a response with only a status code.
    #[must_use]
    pub fn respond_status(self, status: u16) -> Self {
        self.respond(ApiResponse::new(status))
    }

    /// Queues a transport failure.
    #[must_use]
    pub fn fail(self, error: TransportError) -> Self {
        self.push(Err(error));
        self
    }

    /// Delays every call, to keep requests in flight.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a result on a shared transport.
    pub fn push(&self, result: Result<ApiResponse, TransportError>) {
        self.script.lock().push_back(result);
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the number of unused scripted results.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl TransportExecutor for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        next.unwrap_or_else(|| {
            Err(TransportError::new(
                TransportErrorKind::Other,
                format!("no scripted result for {}", request.path),
            ))
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A redirector that records notices.
#[derive(Debug, Default)]
pub struct RecordingRedirector {
    notices: Mutex<Vec<RedirectNotice>>,
}

impl RecordingRedirector {
    /// Creates a new recording redirector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of redirects so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.notices.lock().len()
    }

    /// Returns all recorded notices.
    #[must_use]
    pub fn notices(&self) -> Vec<RedirectNotice> {
        self.notices.lock().clone()
    }

    /// Waits until at least `count` redirects arrived or `timeout` elapsed,
    /// then returns what was recorded.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<RedirectNotice> {
        let deadline = Instant::now() + timeout;
        while self.count() < count && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.notices()
    }
}

impl SessionRedirector for RecordingRedirector {
    fn redirect_to_login(&self, notice: &RedirectNotice) {
        self.notices.lock().push(notice.clone());
    }
}
