//! Session state and its persistence.
//!
//! This module provides:
//! - The `Session` value (token, username, roles, user id)
//! - `SessionStore`, the single owner of the current session
//! - `KeyValueStore` backends that let a session survive restarts

mod storage;
mod store;

pub use storage::{InMemoryKeyValueStore, JsonFileKeyValueStore, KeyValueStore};
pub use store::{Session, SessionStore, ADMIN_ROLES, SESSION_NAMESPACE};
