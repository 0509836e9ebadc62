//! Outbound API requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Header name used for the bearer credential.
pub const AUTHORIZATION: &str = "authorization";

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Returns the canonical method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strips the query string and fragment from a request path.
///
/// Exemption rules match on the encoded path only, so `/login?next=x` is
/// still the login endpoint.
#[must_use]
pub fn path_without_query(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// A single logical API call travelling through the pipeline.
///
/// Header names are stored lower-cased; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Correlation id used in log lines.
    pub id: Uuid,
    /// HTTP method.
    pub method: Method,
    /// Path relative to the configured base URL, optionally with a query.
    pub path: String,
    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Optional JSON body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Creates a new request without body or headers.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Creates a PUT request.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes a value as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Sets a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets a header in place, replacing any previous value.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the bearer token carried by the request, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION)
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Returns the path without query string or fragment.
    #[must_use]
    pub fn route(&self) -> &str {
        path_without_query(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_without_query() {
        assert_eq!(path_without_query("/login?next=home"), "/login");
        assert_eq!(path_without_query("api/entrenamientos#top"), "api/entrenamientos");
        assert_eq!(path_without_query("api/series/3"), "api/series/3");
    }

    #[test]
    fn test_headers_case_insensitive() {
        let request = ApiRequest::get("api/ejercicios").with_header("Accept", "application/json");

        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.header("ACCEPT"), Some("application/json"));
        assert!(request.bearer_token().is_none());
    }

    #[test]
    fn test_bearer_token() {
        let request =
            ApiRequest::get("api/entrenamientos").with_header("Authorization", "Bearer abc");
        assert_eq!(request.bearer_token(), Some("abc"));
    }

    #[test]
    fn test_with_json_body() {
        #[derive(Serialize)]
        struct Password<'a> {
            password: &'a str,
        }

        let request = ApiRequest::post("api/usuarios/username/alice/validate-password")
            .with_json(&Password { password: "s3cret" })
            .unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body, Some(serde_json::json!({"password": "s3cret"})));
    }

    #[test]
    fn test_route_strips_query() {
        let request = ApiRequest::get("api/entrenamientos/fecha?fechaInicio=2024-01-01");
        assert_eq!(request.route(), "api/entrenamientos/fecha");
    }
}
