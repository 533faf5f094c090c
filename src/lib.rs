//! # serde_dataref
//!
//! Self-describing value tokens and concurrent resolution of trees that
//! contain them.
//!
//! ## What is a token?
//!
//! A token is a `data:` URI that carries a value and says how to read it:
//! text, JSON, raw bytes, a typed numeric array, or a URL whose content
//! should be fetched. Tokens can be embedded anywhere a string fits, so a
//! JSON document can hold binary data and references to remote content
//! without a schema change. See [`format`] for the exact grammar.
//!
//! ## Key Features
//!
//! - **Codec**: encode and decode every payload kind, with a typed
//!   [`Token`] newtype and free functions over plain `&str`
//! - **Resolver**: replace every token in a [`Value`] tree concurrently,
//!   fetching URL references through a pluggable [`Fetch`] implementation
//! - **Structural Sharing**: untouched subtrees of a resolved tree are the
//!   same allocation as in the input
//! - **Serde Compatible**: [`to_token`] and [`from_token`] work with any
//!   `Serialize`/`Deserialize` type
//! - **Legacy Detection**: recognize object-shaped references from older
//!   producers
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_dataref::{decode_bytes, decode_text, encode_bytes, encode_text};
//!
//! let token = encode_text("Hello, World!");
//! assert_eq!(token.as_str(), "data:text/plain;charset=utf-8,Hello%2C%20World%21");
//! assert_eq!(decode_text(token.as_str()).unwrap(), "Hello, World!");
//!
//! let token = encode_bytes(&[0, 1, 2]);
//! assert_eq!(token.as_str(), "data:application/octet-stream;base64,AAEC");
//! assert_eq!(decode_bytes(token.as_str()).unwrap(), vec![0u8, 1, 2]);
//! ```
//!
//! ### Numeric Arrays
//!
//! ```rust
//! use serde_dataref::{decode_numeric, encode_numeric, NumericArray};
//!
//! let array = NumericArray::Float32(vec![1.0, 2.0]);
//! let token = encode_numeric(&array);
//! assert!(token.as_str().starts_with("data:application/octet-stream;type=Float32Array;base64,"));
//! assert_eq!(decode_numeric(token.as_str()).unwrap(), array);
//! ```
//!
//! ### Resolving a Tree
//!
//! ```rust
//! use serde_dataref::{encode_bytes, encode_text, value, Resolver};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> serde_dataref::Result<()> {
//! let tree = value!({
//!     "title": (encode_text("Report")),
//!     "attachments": [(encode_bytes(b"PK")), "not a token"]
//! });
//!
//! let resolved = Resolver::new().resolve(&tree).await?;
//! assert_eq!(resolved.get("title").and_then(|v| v.as_str()), Some("Report"));
//! # Ok(())
//! # }
//! ```
//!
//! URL references are fetched with the resolver's [`Fetch`] implementation
//! ([`HttpFetcher`] by default) under the headers, timeout and cancellation
//! in [`FetchOptions`].
//!
//! ## Logging
//!
//! The resolver and the HTTP fetcher emit [`tracing`] events: `debug` when a
//! tree starts and finishes resolving and for each HTTP request, `trace` for
//! every token's progress. Install any `tracing` subscriber to see them.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`]. Errors raised while
//! resolving a tree are wrapped in [`Error::AtPath`]; use [`Error::kind`]
//! and [`Error::path`] to inspect them.

pub mod error;
pub mod fetch;
pub mod format;
pub mod header;
pub mod legacy;
pub mod macros;
pub mod map;
pub mod numeric;
pub mod options;
pub mod path;
pub mod resolve;
pub mod token;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use fetch::{fetch_with, Fetch, Fetched, HttpFetcher};
pub use header::{Header, MediaKind, PREFIX};
pub use legacy::{is_reference, LegacyKind, LegacyMetadata, LegacyReference, LegacyShape, Reference};
pub use map::Map;
pub use numeric::{NumericArray, NumericKind};
pub use options::{FetchOptions, ResolveOptions};
pub use path::{Path, PathSegment};
pub use resolve::{Resolution, Resolver};
pub use token::{
    decode_bytes, decode_json, decode_numeric, decode_numeric_as, decode_text, decode_url, encode,
    encode_bytes, encode_json, encode_numeric, encode_text, encode_url, encode_url_fetched,
    fetch_url, from_token, is_token, media_kind, parameters, to_token, Payload, Token,
};
pub use tokio_util::sync::CancellationToken;
pub use value::{Number, Value};

use serde::Serialize;

/// Resolves every token in `tree` over HTTP.
///
/// Shorthand for a [`Resolver`] with an [`HttpFetcher`] and `options`.
///
/// # Errors
///
/// Returns the first failing token in path order, wrapped in
/// [`Error::AtPath`].
pub async fn resolve(tree: &Value, options: &FetchOptions) -> Result<Value> {
    Resolver::new()
        .with_options(ResolveOptions::new().with_fetch(options.clone()))
        .resolve(tree)
        .await
}

/// Convert any `T: Serialize` to a [`Value`].
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{to_value, Value};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let value: Value = to_value(&Point { x: 1, y: 2 }).unwrap();
/// assert!(value.is_object());
/// ```
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the value has no JSON form, such as a
/// map with non-string keys.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    serde_json::to_value(value)
        .map(Value::from)
        .map_err(Error::serialization)
}
