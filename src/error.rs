//! Error types for token encoding, decoding and resolution.
//!
//! ## Error Categories
//!
//! - **Malformed tokens**: the string claims to be a token but has no header/payload separator
//! - **Payload mismatches**: the header is fine but the payload does not parse under the declared kind
//! - **Numeric array tags**: a missing or unknown `type` parameter
//! - **Serialization**: a value could not be turned into JSON at encode time
//! - **Fetch failures**: a URL-backed token could not be retrieved
//!
//! Errors raised by the resolver are wrapped in [`Error::AtPath`] so callers
//! can tell which node of the tree failed. [`Error::kind`] looks through the
//! wrapper.
//!
//! ## Examples
//!
//! ```rust
//! use serde_dataref::{decode_text, ErrorKind};
//!
//! let err = decode_text("data:text/plain;charset=utf-8").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::MalformedToken);
//! ```

use crate::Path;
use thiserror::Error;

/// Represents all possible errors raised by this crate.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The string is not a structurally valid token.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The header is valid but the payload cannot be read as `expected`.
    #[error("payload is not valid {expected}: {msg}")]
    PayloadMismatch { expected: String, msg: String },

    /// A numeric array was requested from a token without a `type` parameter.
    #[error("octet-stream token carries no `type` parameter; a numeric array variant is required")]
    MissingTypeTag,

    /// The `type` parameter names a variant outside the supported set.
    #[error("unsupported numeric array type: {0}")]
    UnsupportedVariant(String),

    /// The value could not be serialized to JSON.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The referenced URL could not be fetched.
    #[error("fetch of {url} failed{}: {detail}", status_suffix(.status))]
    FetchFailed {
        url: String,
        status: Option<u16>,
        detail: String,
    },

    /// An error raised while resolving the token at `path`.
    #[error("at {path}: {source}")]
    AtPath { path: Path, source: Box<Error> },
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" with status {}", code))
        .unwrap_or_default()
}

/// The taxonomy member of an [`Error`], ignoring any path wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedToken,
    PayloadMismatch,
    MissingTypeTag,
    UnsupportedVariant,
    Serialization,
    FetchFailed,
}

impl Error {
    /// Creates a malformed-token error.
    pub fn malformed(msg: &str) -> Self {
        Error::MalformedToken(msg.to_string())
    }

    /// Creates a payload mismatch error for the given expected kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_dataref::Error;
    ///
    /// let err = Error::payload_mismatch("JSON", "expected value at line 1 column 1");
    /// assert!(err.to_string().contains("not valid JSON"));
    /// ```
    pub fn payload_mismatch<T: std::fmt::Display>(expected: &str, msg: T) -> Self {
        Error::PayloadMismatch {
            expected: expected.to_string(),
            msg: msg.to_string(),
        }
    }

    /// Creates an unsupported-variant error for an unknown `type` tag.
    pub fn unsupported_variant(tag: &str) -> Self {
        Error::UnsupportedVariant(tag.to_string())
    }

    /// Creates a serialization error.
    pub fn serialization<T: std::fmt::Display>(msg: T) -> Self {
        Error::Serialization(msg.to_string())
    }

    /// Creates a fetch failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_dataref::Error;
    ///
    /// let err = Error::fetch_failed("https://example.com/a", Some(404), "Not Found");
    /// assert!(err.to_string().contains("status 404"));
    /// ```
    pub fn fetch_failed<T: std::fmt::Display>(url: &str, status: Option<u16>, detail: T) -> Self {
        Error::FetchFailed {
            url: url.to_string(),
            status,
            detail: detail.to_string(),
        }
    }

    /// Wraps this error with the tree path where it happened.
    #[must_use]
    pub fn at(self, path: Path) -> Self {
        Error::AtPath {
            path,
            source: Box::new(self),
        }
    }

    /// Returns the taxonomy member of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedToken(_) => ErrorKind::MalformedToken,
            Error::PayloadMismatch { .. } => ErrorKind::PayloadMismatch,
            Error::MissingTypeTag => ErrorKind::MissingTypeTag,
            Error::UnsupportedVariant(_) => ErrorKind::UnsupportedVariant,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::FetchFailed { .. } => ErrorKind::FetchFailed,
            Error::AtPath { source, .. } => source.kind(),
        }
    }

    /// Returns the tree path attached by the resolver, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::AtPath { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
