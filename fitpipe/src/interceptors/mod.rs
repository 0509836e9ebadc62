//! Pipeline stages applied to every request.
//!
//! The client installs them in a fixed order:
//! 1. `CredentialInjector` attaches the bearer token
//! 2. `ReachabilityMonitor` watches the transport outcome
//! 3. `FailureClassifier` turns a rejected token into a logout
//! 4. `LoggingInterceptor` writes diagnostics (optional)

mod chain;
mod classifier;
mod credentials;
mod logging;
mod reachability;

pub use chain::{Interceptor, InterceptorChain};
pub use classifier::FailureClassifier;
pub use credentials::CredentialInjector;
pub use logging::{redact_header, LoggingInterceptor};
pub use reachability::ReachabilityMonitor;
