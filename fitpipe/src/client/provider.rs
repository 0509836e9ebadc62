//! Lazily built, process-wide client.

use super::{ApiClient, ApiClientBuilder};
use crate::errors::PipelineError;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out one shared [`ApiClient`], built on first use.
///
/// Concurrent first callers block on the cell instead of building twice.
/// A failed build is not cached, so the next call tries again.
pub struct ApiClientProvider {
    builder: ApiClientBuilder,
    cell: OnceCell<ApiClient>,
    builds: AtomicUsize,
}

impl ApiClientProvider {
    /// Creates a provider that will build from `builder`.
    #[must_use]
    pub fn new(builder: ApiClientBuilder) -> Self {
        Self {
            builder,
            cell: OnceCell::new(),
            builds: AtomicUsize::new(0),
        }
    }

    /// Returns the shared client, building it if needed.
    ///
    /// # Errors
    ///
    /// Returns the build error if construction fails.
    pub fn client(&self) -> Result<ApiClient, PipelineError> {
        self.cell
            .get_or_try_init(|| {
                self.builds.fetch_add(1, Ordering::SeqCst);
                self.builder.clone().build()
            })
            .cloned()
    }

    /// Returns true once a client has been built.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Number of build attempts so far.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}
