//! Token header parsing.
//!
//! The header is everything between the `data:` prefix and the first comma:
//! a media type, optional `name=value` parameters, and an optional trailing
//! `base64` marker, all separated by semicolons.
//!
//! ```text
//! data:application/octet-stream;type=Float32Array;base64,AACAPwAAAEA=
//!      \______________________/ \_______________/ \____/ \__________/
//!             media type            parameter     marker   payload
//! ```

use crate::{Error, NumericKind, Result};
use indexmap::IndexMap;
use std::fmt;

/// Literal every token starts with.
pub const PREFIX: &str = "data:";

pub(crate) const BASE64_MARKER: &str = "base64";
pub(crate) const CHARSET_UTF8: &str = "utf-8";

/// Payload categories a token can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// `text/plain`
    PlainText,
    /// `application/json`
    Json,
    /// `application/octet-stream`
    OctetStream,
    /// `text/x-uri`
    UriReference,
}

impl MediaKind {
    /// Returns the media type string written into the header.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            MediaKind::PlainText => "text/plain",
            MediaKind::Json => "application/json",
            MediaKind::OctetStream => "application/octet-stream",
            MediaKind::UriReference => "text/x-uri",
        }
    }

    /// Maps a media type string to a known kind, ignoring ASCII case.
    ///
    /// An empty media type means `text/plain`, as for any data URI.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        if mime.is_empty() || mime.eq_ignore_ascii_case("text/plain") {
            Some(MediaKind::PlainText)
        } else if mime.eq_ignore_ascii_case("application/json") {
            Some(MediaKind::Json)
        } else if mime.eq_ignore_ascii_case("application/octet-stream") {
            Some(MediaKind::OctetStream)
        } else if mime.eq_ignore_ascii_case("text/x-uri") {
            Some(MediaKind::UriReference)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// A parsed token header.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{Header, MediaKind};
///
/// let header = Header::parse("application/octet-stream;type=Uint8Array;base64");
/// assert_eq!(header.kind(), Some(MediaKind::OctetStream));
/// assert_eq!(header.parameter("type"), Some("Uint8Array"));
/// assert!(header.is_base64());
/// assert_eq!(header.to_string(), "application/octet-stream;type=Uint8Array;base64");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    media_type: String,
    parameters: IndexMap<String, String>,
    base64: bool,
}

impl Header {
    pub(crate) fn new(media_type: &str) -> Self {
        Header {
            media_type: media_type.to_string(),
            parameters: IndexMap::new(),
            base64: false,
        }
    }

    pub(crate) fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.parameters.insert(name.to_string(), value.to_string());
        self
    }

    pub(crate) fn with_base64(mut self) -> Self {
        self.base64 = true;
        self
    }

    /// Parses the header segment of a token (without the prefix and payload).
    ///
    /// Parsing never fails: unknown parameters are kept, segments without
    /// `=` other than a trailing `base64` marker are ignored.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let mut segments: Vec<&str> = header.split(';').collect();
        let base64 = segments.len() > 1
            && segments
                .last()
                .is_some_and(|last| last.trim().eq_ignore_ascii_case(BASE64_MARKER));
        if base64 {
            segments.pop();
        }

        let media_type = segments.first().map(|s| s.trim()).unwrap_or_default();
        let parameters = segments
            .iter()
            .skip(1)
            .filter_map(|segment| segment.split_once('='))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();

        Header {
            media_type: media_type.to_string(),
            parameters,
            base64,
        }
    }

    /// Returns the media type as written, e.g. `image/png`.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Returns the known media kind, or `None` for other media types.
    #[must_use]
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime(&self.media_type)
    }

    /// Returns a parameter value by (lowercase) name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Returns every parameter in header order.
    #[must_use]
    pub fn parameters(&self) -> &IndexMap<String, String> {
        &self.parameters
    }

    /// Returns `true` when the payload is base64 rather than percent-escaped.
    #[must_use]
    pub fn is_base64(&self) -> bool {
        self.base64
    }

    /// Reads the numeric array variant from the `type` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVariant`] when the tag is unknown.
    pub fn numeric_kind(&self) -> Result<Option<NumericKind>> {
        self.parameter("type")
            .map(|tag| NumericKind::from_tag(tag).ok_or_else(|| Error::unsupported_variant(tag)))
            .transpose()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.media_type)?;
        for (name, value) in &self.parameters {
            write!(f, ";{}={}", name, value)?;
        }
        if self.base64 {
            write!(f, ";{}", BASE64_MARKER)?;
        }
        Ok(())
    }
}

/// Splits a token into its header and payload segments.
pub(crate) fn split_token(token: &str) -> Result<(&str, &str)> {
    let rest = token
        .strip_prefix(PREFIX)
        .ok_or_else(|| Error::malformed("missing `data:` prefix"))?;
    rest.split_once(',')
        .ok_or_else(|| Error::malformed("missing `,` between header and payload"))
}
