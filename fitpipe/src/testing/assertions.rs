//! Test assertions for classified outcomes.

use crate::core::ClassifiedOutcome;

/// Asserts that the outcome is a success.
pub fn assert_success(outcome: &ClassifiedOutcome) {
    assert!(outcome.is_success(), "Expected success, got: {outcome:?}");
}

/// Asserts that the outcome ended the session.
pub fn assert_session_expired(outcome: &ClassifiedOutcome) {
    assert!(
        outcome.is_session_expired(),
        "Expected session expiry, got: {outcome:?}"
    );
}

/// Asserts that the outcome is a server error with `status`.
pub fn assert_server_error(outcome: &ClassifiedOutcome, status: u16) {
    assert_eq!(
        outcome,
        &ClassifiedOutcome::ServerError(status),
        "Expected server error {status}, got {outcome:?}"
    );
}

/// Asserts that the outcome is a non-401 client error with `status`.
pub fn assert_rejected(outcome: &ClassifiedOutcome, status: u16) {
    assert_eq!(
        outcome,
        &ClassifiedOutcome::Rejected(status),
        "Expected rejection {status}, got {outcome:?}"
    );
}

/// Asserts that no response arrived.
pub fn assert_transport_failure(outcome: &ClassifiedOutcome) {
    assert!(
        matches!(outcome, ClassifiedOutcome::TransportFailure(_)),
        "Expected transport failure, got: {outcome:?}"
    );
}
