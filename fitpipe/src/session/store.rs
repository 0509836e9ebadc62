//! The session store.

use super::KeyValueStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Namespace holding the login fields in the key-value store.
pub const SESSION_NAMESPACE: &str = "facilgim_session";

const KEY_TOKEN: &str = "key_token";
const KEY_USERNAME: &str = "key_username";
const KEY_AUTHORITIES: &str = "key_authorities";
const KEY_USER_ID: &str = "key_user_id";

const SESSION_KEYS: [&str; 4] = [KEY_TOKEN, KEY_USERNAME, KEY_AUTHORITIES, KEY_USER_ID];

/// Role names that grant admin rights. `ADMIN` is the legacy spelling.
pub const ADMIN_ROLES: [&str; 2] = ["ROLE_ADMIN", "ADMIN"];

/// The current authentication context.
///
/// Either everything is absent (logged out) or at least `token` and
/// `username` are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token.
    pub token: Option<String>,
    /// Logged-in username.
    pub username: Option<String>,
    /// Granted authorities.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Backend user id, when the login response carried one.
    pub user_id: Option<i64>,
}

impl Session {
    /// Creates a logged-in session.
    #[must_use]
    pub fn new<I, S>(token: impl Into<String>, username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            token: Some(token.into()),
            username: Some(username.into()),
            roles: roles.into_iter().map(Into::into).collect(),
            user_id: None,
        }
    }

    /// Sets the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Returns true for the logged-out session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.username.is_none()
    }

    /// Returns true if the token and username are both usable.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
            && self.username.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Returns true if any role grants admin rights.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| ADMIN_ROLES.contains(&r.as_str()))
    }
}

fn join_roles(roles: &BTreeSet<String>) -> String {
    roles.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

fn parse_roles(csv: &str) -> BTreeSet<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Owns the current session.
///
/// Reads and writes go through one lock over the whole [`Session`], so a
/// reader never sees a token from one login paired with roles from another.
/// The key-value backend is written under the same lock; if it fails the
/// in-memory session still changes and the failure is logged.
pub struct SessionStore {
    state: RwLock<Session>,
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("SessionStore")
            .field("logged_in", &!state.is_empty())
            .field("username", &state.username)
            .field("roles", &state.roles)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates an empty store over a backend, ignoring anything persisted.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: RwLock::new(Session::default()),
            backend,
        }
    }

    /// Creates a store backed by process memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(super::InMemoryKeyValueStore::new()))
    }

    /// Creates a store and restores the persisted session, if any.
    ///
    /// A persisted record missing its token or username is treated as
    /// logged out.
    #[must_use]
    pub fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        let session = match read_persisted(backend.as_ref()) {
            Ok(session) if session.is_complete() => session,
            Ok(_) => Session::default(),
            Err(e) => {
                warn!(error = %e, "Failed to restore persisted session");
                Session::default()
            }
        };

        if !session.is_empty() {
            info!(username = ?session.username, "Restored persisted session");
        }

        Self {
            state: RwLock::new(session),
            backend,
        }
    }

    /// Replaces the session with a fresh login.
    ///
    /// An empty token or username is a logout, not a half session.
    pub fn save<I, S>(&self, token: impl Into<String>, username: impl Into<String>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.save_session(Session::new(token, username, roles));
    }

    /// Replaces the session.
    pub fn save_session(&self, session: Session) {
        if !session.is_complete() {
            debug!("Incomplete session saved; clearing instead");
            self.clear();
            return;
        }

        let mut state = self.state.write();

        let mut entries = vec![
            (KEY_TOKEN, session.token.clone().unwrap_or_default()),
            (KEY_USERNAME, session.username.clone().unwrap_or_default()),
            (KEY_AUTHORITIES, join_roles(&session.roles)),
        ];
        if let Some(id) = session.user_id {
            entries.push((KEY_USER_ID, id.to_string()));
        }
        let stale_user_id = session.user_id.is_none();

        if let Err(e) = self.backend.set_many(SESSION_NAMESPACE, &entries) {
            warn!(error = %e, "Failed to persist session");
        }
        if stale_user_id {
            if let Err(e) = self.backend.remove_many(SESSION_NAMESPACE, &[KEY_USER_ID]) {
                warn!(error = %e, "Failed to drop stale user id");
            }
        }

        info!(username = ?session.username, roles = ?session.roles, "Session saved");
        *state = session;
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.state.read().username.clone()
    }

    /// Returns the granted roles.
    #[must_use]
    pub fn roles(&self) -> BTreeSet<String> {
        self.state.read().roles.clone()
    }

    /// Returns the backend user id.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.state.read().user_id
    }

    /// Returns a consistent copy of the whole session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.read().clone()
    }

    /// Returns true if `ROLE_ADMIN` or `ADMIN` is granted.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.read().is_admin()
    }

    /// Returns true if a session is present.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        !self.state.read().is_empty()
    }

    /// Drops the login fields. Other namespaces of the backend are untouched.
    ///
    /// Idempotent. Returns true if a session was present.
    pub fn clear(&self) -> bool {
        let mut state = self.state.write();
        let was_present = !state.is_empty();

        if let Err(e) = self.backend.remove_many(SESSION_NAMESPACE, &SESSION_KEYS) {
            warn!(error = %e, "Failed to remove persisted session");
        }
        *state = Session::default();

        if was_present {
            info!("Session cleared");
        }
        was_present
    }
}

fn read_persisted(backend: &dyn KeyValueStore) -> Result<Session, crate::errors::StorageError> {
    let token = backend.get(SESSION_NAMESPACE, KEY_TOKEN)?;
    let username = backend.get(SESSION_NAMESPACE, KEY_USERNAME)?;
    let roles = backend
        .get(SESSION_NAMESPACE, KEY_AUTHORITIES)?
        .map(|csv| parse_roles(&csv))
        .unwrap_or_default();
    let user_id = backend
        .get(SESSION_NAMESPACE, KEY_USER_ID)?
        .and_then(|raw| raw.parse().ok());

    Ok(Session {
        token,
        username,
        roles,
        user_id,
    })
}
