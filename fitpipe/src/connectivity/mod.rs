//! Process-wide connectivity state.
//!
//! This module provides:
//! - `ConnectivityState`, a shared up/down flag
//! - Observer subscriptions with ordered, asynchronous delivery

mod state;

pub use state::{ConnectivityObserver, ConnectivityState, Subscription};
