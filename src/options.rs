//! Configuration for fetching and resolving.
//!
//! - [`FetchOptions`]: headers, timeout and cancellation applied to every fetch
//! - [`ResolveOptions`]: fetch settings plus the resolver's fetch concurrency
//!
//! Options are passed explicitly to each call; there is no process-wide
//! default to mutate.
//!
//! ## Examples
//!
//! ```rust
//! use serde_dataref::{FetchOptions, ResolveOptions};
//! use std::time::Duration;
//!
//! let options = ResolveOptions::new()
//!     .with_fetch(
//!         FetchOptions::new()
//!             .with_header("authorization", "Bearer secret")
//!             .with_timeout(Duration::from_secs(10)),
//!     )
//!     .with_max_concurrent_fetches(8);
//!
//! assert_eq!(options.max_concurrent_fetches, Some(8));
//! ```

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Settings forwarded to every fetch of a URL-backed token.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::FetchOptions;
/// use tokio_util::sync::CancellationToken;
///
/// let cancel = CancellationToken::new();
/// let options = FetchOptions::new().with_cancellation(cancel.clone());
/// cancel.cancel();
/// assert!(options.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct FetchOptions {
    /// Extra request headers, sent in insertion order.
    pub headers: Vec<(String, String)>,
    /// Upper bound for a single fetch, including reading the body.
    pub timeout: Option<Duration>,
    /// Aborts in-flight fetches when cancelled.
    pub cancellation: Option<CancellationToken>,
}

impl FetchOptions {
    /// Creates options with no headers, no timeout and no cancellation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the per-fetch timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the token that aborts fetches when cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns `true` when the cancellation token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Resolver configuration.
#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    pub fetch: FetchOptions,
    /// Caps simultaneous fetches. `None` launches every fetch at once.
    pub max_concurrent_fetches: Option<usize>,
}

impl ResolveOptions {
    /// Creates options with default fetch settings and no concurrency cap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    /// Caps the number of fetches in flight. Zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = Some(limit.max(1));
        self
    }
}
