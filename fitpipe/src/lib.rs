//! # fitpipe
//!
//! The authenticated request pipeline of the FacilGim fitness client.
//!
//! Every outbound call passes through a fixed chain of stages:
//!
//! - **Credential injection**: attaches the session's bearer token, except on
//!   login and registration
//! - **Reachability monitoring**: flags the backend up or down from the
//!   transport outcome
//! - **Failure classification**: a rejected token ends the session and sends
//!   the user back to login
//! - **Diagnostic logging**: `tracing` output with credentials redacted
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fitpipe::prelude::*;
//!
//! let provider = ApiClientProvider::new(
//!     ApiClient::builder(ClientConfig::from_env()?)
//!         .with_redirector(Arc::new(MyLoginScreen)),
//! );
//! let client = provider.client()?;
//!
//! AuthApi::new(client.clone()).login("alice", "secret").await?;
//! let workouts: Vec<Workout> = client.get_json("api/entrenamientos").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod auth;
pub mod client;
pub mod config;
pub mod connectivity;
pub mod core;
pub mod errors;
pub mod interceptors;
pub mod redirect;
pub mod session;
pub mod telemetry;
pub mod testing;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{AuthApi, LoginResponse, RegisterRequest};
    pub use crate::client::{ApiClient, ApiClientBuilder, ApiClientProvider};
    pub use crate::config::{ClientConfig, ExcludedPaths, HttpLogLevel};
    pub use crate::connectivity::{ConnectivityState, Subscription};
    pub use crate::core::{ApiRequest, ApiResponse, ClassifiedOutcome, Method};
    pub use crate::errors::{
        AuthError, ConfigError, PipelineError, StorageError, TransportError,
        TransportErrorKind,
    };
    pub use crate::interceptors::{Interceptor, InterceptorChain};
    pub use crate::redirect::{
        LoggingRedirector, RedirectNotice, RedirectReason, SessionRedirector,
    };
    pub use crate::session::{
        InMemoryKeyValueStore, JsonFileKeyValueStore, KeyValueStore, Session, SessionStore,
    };
    pub use crate::telemetry::{init_tracing, LogFormat};
    pub use crate::transport::TransportExecutor;

    #[cfg(feature = "reqwest-transport")]
    pub use crate::transport::ReqwestTransport;
}
