//! Stage 4: request/response logging.

use super::Interceptor;
use crate::config::HttpLogLevel;
use crate::core::{ApiRequest, ApiResponse, AUTHORIZATION};
use crate::errors::TransportError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

const REDACTED: &str = "<redacted>";

/// Masks credential-bearing header values.
#[must_use]
pub fn redact_header<'a>(name: &str, value: &'a str) -> &'a str {
    if name.eq_ignore_ascii_case(AUTHORIZATION) || name.eq_ignore_ascii_case("cookie") {
        REDACTED
    } else {
        value
    }
}

fn redacted(headers: &BTreeMap<String, String>) -> BTreeMap<&str, &str> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str(), redact_header(name, value)))
        .collect()
}

/// Writes each exchange to `tracing`.
///
/// Runs last so the logged request is the one that went on the wire.
/// Bearer tokens are never written.
pub struct LoggingInterceptor {
    level: HttpLogLevel,
    started: Mutex<HashMap<Uuid, Instant>>,
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new(HttpLogLevel::Basic)
    }
}

impl LoggingInterceptor {
    /// Creates a logging stage at `level`.
    #[must_use]
    pub fn new(level: HttpLogLevel) -> Self {
        Self {
            level,
            started: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configured level.
    #[must_use]
    pub fn level(&self) -> HttpLogLevel {
        self.level
    }

    /// Number of requests sent but not yet answered.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.started.lock().len()
    }

    fn elapsed_ms(&self, id: &Uuid) -> Option<u128> {
        self.started.lock().remove(id).map(|t| t.elapsed().as_millis())
    }
}

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    fn before(&self, request: ApiRequest) -> ApiRequest {
        if self.level == HttpLogLevel::None {
            return request;
        }
        self.started.lock().insert(request.id, Instant::now());

        info!(request_id = %request.id, method = %request.method, path = %request.path, "--> request");
        if matches!(self.level, HttpLogLevel::Headers | HttpLogLevel::Body) {
            debug!(request_id = %request.id, headers = ?redacted(&request.headers), "--> headers");
        }
        if self.level == HttpLogLevel::Body {
            if let Some(ref body) = request.body {
                debug!(request_id = %request.id, body = %body, "--> body");
            }
        }
        request
    }

    fn after(&self, request: &ApiRequest, response: ApiResponse) -> ApiResponse {
        if self.level == HttpLogLevel::None {
            return response;
        }
        let elapsed_ms = self.elapsed_ms(&request.id);

        info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            status = response.status,
            elapsed_ms = ?elapsed_ms,
            "<-- response"
        );
        if matches!(self.level, HttpLogLevel::Headers | HttpLogLevel::Body) {
            debug!(request_id = %request.id, headers = ?redacted(&response.headers), "<-- headers");
        }
        if self.level == HttpLogLevel::Body && !response.body.is_empty() {
            debug!(request_id = %request.id, body = %response.text(), "<-- body");
        }
        response
    }

    fn on_error(&self, request: &ApiRequest, error: &TransportError) {
        if self.level == HttpLogLevel::None {
            return;
        }
        let elapsed_ms = self.elapsed_ms(&request.id);
        warn!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            kind = error.kind.as_str(),
            elapsed_ms = ?elapsed_ms,
            "<-- failed: {}", error.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_header() {
        assert_eq!(redact_header("Authorization", "Bearer abc"), REDACTED);
        assert_eq!(redact_header("authorization", "Bearer abc"), REDACTED);
        assert_eq!(redact_header("content-type", "application/json"), "application/json");
    }

    #[test]
    fn test_redacted_map_hides_token() {
        let request = ApiRequest::get("api/series")
            .with_header("Authorization", "Bearer secret")
            .with_header("Accept", "application/json");
        let map = redacted(&request.headers);
        assert!(!format!("{map:?}").contains("secret"));
        assert_eq!(map.get("accept"), Some(&"application/json"));
    }

    #[test]
    fn test_tracks_in_flight_requests() {
        let stage = LoggingInterceptor::new(HttpLogLevel::Body);
        let request = stage.before(ApiRequest::get("api/series"));
        assert_eq!(stage.in_flight(), 1);

        let response = stage.after(&request, ApiResponse::new(200).with_body("[]"));
        assert_eq!(response.text(), "[]");
        assert_eq!(stage.in_flight(), 0);

        let request = stage.before(ApiRequest::get("api/series"));
        stage.on_error(&request, &TransportError::timeout("slow"));
        assert_eq!(stage.in_flight(), 0);
    }

    #[test]
    fn test_none_level_records_nothing() {
        let stage = LoggingInterceptor::new(HttpLogLevel::None);
        let request = stage.before(ApiRequest::get("api/series"));
        assert_eq!(stage.in_flight(), 0);
        let _ = stage.after(&request, ApiResponse::new(200));
        assert_eq!(stage.level(), HttpLogLevel::None);
    }
}
