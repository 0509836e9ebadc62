//! Login, registration and password checks against the FacilGim backend.
//!
//! These calls go through the same pipeline as everything else, so the
//! exclusion table decides which of them carry a credential and which 401s
//! end the session.

use crate::client::ApiClient;
use crate::core::ApiRequest;
use crate::errors::AuthError;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Login endpoint, relative to the base URL.
pub const LOGIN_PATH: &str = "login";
/// Registration endpoint, relative to the base URL.
pub const REGISTER_PATH: &str = "api/usuarios/registrar";

/// Path of the current-password check for `username`.
///
/// The username is percent-encoded as a single path segment, so `#`, `?`
/// and `/` cannot change the route.
#[must_use]
pub fn validate_password_path(username: &str) -> String {
    format!(
        "api/usuarios/username/{}/validate-password",
        urlencoding::encode(username)
    )
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct PasswordCheck<'a> {
    password: &'a str,
}

/// Body returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token.
    #[serde(default)]
    pub token: Option<String>,
    /// Canonical username.
    #[serde(default)]
    pub username: Option<String>,
    /// Backend message.
    #[serde(default)]
    pub mensaje: Option<String>,
    /// Granted roles.
    #[serde(default)]
    pub authorities: Vec<String>,
    /// Numeric user id.
    #[serde(default, rename = "userId")]
    pub user_id: Option<i64>,
}

/// New account data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Login name.
    pub username: String,
    /// Plain-text password, sent over TLS.
    pub password: String,
    /// Given name.
    pub nombre: String,
    /// Family name.
    pub apellido: String,
    /// Email address.
    pub correo: String,
    /// Postal address.
    pub direccion: String,
}

/// Authentication calls bound to a client and its session.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    /// Creates the API over `client`.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Logs in and stores the resulting session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on 401/403,
    /// [`AuthError::MalformedResponse`] if no token came back, and
    /// [`AuthError::Status`] for any other non-2xx status.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let request = ApiRequest::post(LOGIN_PATH)
            .with_json(&LoginRequest { username, password })
            .map_err(crate::errors::PipelineError::from)?;
        let response = self.client.execute(request).await?;

        match response.status {
            401 | 403 => return Err(AuthError::InvalidCredentials),
            status if !response.is_success() => {
                return Err(AuthError::Status {
                    status,
                    message: response.text(),
                })
            }
            _ => {}
        }

        let body: LoginResponse = response
            .json_body()
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let token = body
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("missing token".to_string()))?;
        let name = body.username.clone().unwrap_or_else(|| username.to_string());

        let mut session = Session::new(token, name, body.authorities.iter().cloned());
        if let Some(id) = body.user_id {
            session = session.with_user_id(id);
        }
        self.client.session().save_session(session);

        info!(username = %username, "Logged in");
        Ok(body)
    }

    /// Registers a new account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Status`] for a non-2xx status.
    pub async fn register(&self, account: &RegisterRequest) -> Result<(), AuthError> {
        let request = ApiRequest::post(REGISTER_PATH)
            .with_json(account)
            .map_err(crate::errors::PipelineError::from)?;
        let response = self.client.execute(request).await?;

        if response.is_success() {
            info!(username = %account.username, "Account registered");
            Ok(())
        } else {
            Err(AuthError::Status {
                status: response.status,
                message: response.text(),
            })
        }
    }

    /// Checks the current password of `username`.
    ///
    /// A wrong password is `Ok(false)` and leaves the session intact.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Status`] for statuses other than 2xx and 401.
    pub async fn validate_current_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, AuthError> {
        let request = ApiRequest::post(validate_password_path(username))
            .with_json(&PasswordCheck { password })
            .map_err(crate::errors::PipelineError::from)?;
        let response = self.client.execute(request).await?;

        match response.status {
            _ if response.is_success() => Ok(true),
            401 => {
                debug!(username = %username, "Current password rejected");
                Ok(false)
            }
            status => Err(AuthError::Status {
                status,
                message: response.text(),
            }),
        }
    }

    /// Ends the local session. Returns true if one was present.
    pub fn logout(&self) -> bool {
        self.client.session().clear()
    }
}
