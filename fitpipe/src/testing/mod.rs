//! Testing utilities for fitpipe clients.
//!
//! This module provides:
//! - A scripted transport that replays canned responses
//! - A redirector that records every login redirect
//! - Assertions over classified outcomes

mod assertions;
mod mocks;

pub use assertions::{
    assert_rejected, assert_server_error, assert_session_expired, assert_success,
    assert_transport_failure,
};
pub use mocks::{RecordingRedirector, ScriptedTransport};
