//! Detection of object-shaped references from older producers.
//!
//! Before tokens, references were stored as small objects. Two shapes are
//! still found in stored trees:
//!
//! ```text
//! tagged:   {"refType": "text", "value": "hi", "contentType": "text/plain"}
//! envelope: {"__ref": {"kind": "string", "data": "hi", "mime": "text/plain"}}
//! ```
//!
//! Both are recognized so callers can tell a reference from ordinary data,
//! but neither is decoded. The resolver leaves them untouched.

use crate::token::{is_token, Token};
use crate::{Map, Value};
use chrono::{DateTime, TimeZone, Utc};

const TAGGED_KIND: &str = "refType";
const TAGGED_VALUE: &str = "value";
const ENVELOPE_KEY: &str = "__ref";
const ENVELOPE_KIND: &str = "kind";
const ENVELOPE_VALUE: &str = "data";

/// What a legacy reference points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegacyKind {
    /// Raw bytes, stored as a base64 string or an array of byte values.
    RawBytes,
    /// A URL to fetch.
    ExternalUrl,
    Text,
    /// An embedded JSON document of any shape.
    Json,
    /// A key into some external store.
    OpaqueKey,
}

impl LegacyKind {
    /// Name used by the tagged shape.
    #[must_use]
    pub const fn tagged_name(self) -> &'static str {
        match self {
            LegacyKind::RawBytes => "bytes",
            LegacyKind::ExternalUrl => "url",
            LegacyKind::Text => "text",
            LegacyKind::Json => "json",
            LegacyKind::OpaqueKey => "key",
        }
    }

    /// Name used by the envelope shape.
    #[must_use]
    pub const fn envelope_name(self) -> &'static str {
        match self {
            LegacyKind::RawBytes => "binary",
            LegacyKind::ExternalUrl => "link",
            LegacyKind::Text => "string",
            LegacyKind::Json => "object",
            LegacyKind::OpaqueKey => "blob",
        }
    }

    fn from_name(shape: LegacyShape, name: &str) -> Option<Self> {
        const ALL: [LegacyKind; 5] = [
            LegacyKind::RawBytes,
            LegacyKind::ExternalUrl,
            LegacyKind::Text,
            LegacyKind::Json,
            LegacyKind::OpaqueKey,
        ];
        ALL.into_iter().find(|kind| match shape {
            LegacyShape::Tagged => kind.tagged_name() == name,
            LegacyShape::Envelope => kind.envelope_name() == name,
        })
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            LegacyKind::Json => true,
            LegacyKind::RawBytes => match value {
                Value::String(_) | Value::Bytes(_) => true,
                Value::Array(items) => items
                    .iter()
                    .all(|item| item.as_i64().is_some_and(|b| (0..=255).contains(&b))),
                _ => false,
            },
            LegacyKind::ExternalUrl | LegacyKind::Text | LegacyKind::OpaqueKey => value.is_string(),
        }
    }
}

/// Which historical layout a legacy reference uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegacyShape {
    Tagged,
    Envelope,
}

/// Optional metadata carried next to a legacy reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegacyMetadata {
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub hash: Option<String>,
    /// Creation time, stored either as RFC 3339 text or epoch milliseconds.
    pub created_at: Option<DateTime<Utc>>,
}

/// A recognized legacy reference.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{value, LegacyKind, LegacyReference, LegacyShape};
///
/// let tagged = value!({"refType": "url", "value": "https://example.com/a.png", "size": 1024});
/// let reference = LegacyReference::detect(&tagged).unwrap();
/// assert_eq!(reference.shape(), LegacyShape::Tagged);
/// assert_eq!(reference.kind(), LegacyKind::ExternalUrl);
/// assert_eq!(reference.metadata().size, Some(1024));
///
/// assert!(LegacyReference::detect(&value!({"refType": "url"})).is_none());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct LegacyReference {
    shape: LegacyShape,
    kind: LegacyKind,
    value: Value,
    metadata: LegacyMetadata,
}

impl LegacyReference {
    /// Recognizes either legacy shape.
    ///
    /// Returns `None` unless the discriminator names a known kind, the value
    /// has the shape that kind expects, and every metadata field present has
    /// the expected type.
    #[must_use]
    pub fn detect(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if let Some(inner) = obj.get(ENVELOPE_KEY) {
            return Self::from_fields(
                LegacyShape::Envelope,
                inner.as_object()?,
                ENVELOPE_KIND,
                ENVELOPE_VALUE,
                ["mime", "byteLength", "digest", "timestamp"],
            );
        }
        Self::from_fields(
            LegacyShape::Tagged,
            obj,
            TAGGED_KIND,
            TAGGED_VALUE,
            ["contentType", "size", "hash", "createdAt"],
        )
    }

    fn from_fields(
        shape: LegacyShape,
        fields: &Map,
        kind_key: &str,
        value_key: &str,
        [content_type, size, hash, created_at]: [&str; 4],
    ) -> Option<Self> {
        let kind = LegacyKind::from_name(shape, fields.get(kind_key)?.as_str()?)?;
        let value = fields.get(value_key)?;
        if !kind.accepts(value) {
            return None;
        }

        let metadata = LegacyMetadata {
            content_type: optional(fields, content_type, |v| v.as_str().map(str::to_string))?,
            size: optional(fields, size, |v| v.as_i64().and_then(|n| u64::try_from(n).ok()))?,
            hash: optional(fields, hash, |v| v.as_str().map(str::to_string))?,
            created_at: optional(fields, created_at, parse_timestamp)?,
        };

        Some(LegacyReference {
            shape,
            kind,
            value: value.clone(),
            metadata,
        })
    }

    pub fn shape(&self) -> LegacyShape {
        self.shape
    }

    pub fn kind(&self) -> LegacyKind {
        self.kind
    }

    /// The stored value, exactly as found.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn metadata(&self) -> &LegacyMetadata {
        &self.metadata
    }
}

/// Reads an optional field. The outer `None` means the field is present but
/// has the wrong type; `Some(None)` means it is absent or null.
fn optional<T>(fields: &Map, key: &str, read: impl FnOnce(&Value) -> Option<T>) -> Option<Option<T>> {
    match fields.get(key) {
        None | Some(Value::Null) => Some(None),
        Some(value) => read(value).map(Some),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}

/// Any value that refers to content elsewhere.
#[derive(Clone, Debug, PartialEq)]
pub enum Reference {
    Token(Token),
    Legacy(LegacyReference),
}

impl Reference {
    /// Classifies `value` as a token, a legacy reference, or neither.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_dataref::{encode_text, value, Reference, Value};
    ///
    /// let token = Value::from(encode_text("hi"));
    /// assert!(matches!(Reference::classify(&token), Some(Reference::Token(_))));
    ///
    /// let legacy = value!({"__ref": {"kind": "string", "data": "hi"}});
    /// assert!(matches!(Reference::classify(&legacy), Some(Reference::Legacy(_))));
    ///
    /// assert!(Reference::classify(&value!("hi")).is_none());
    /// ```
    #[must_use]
    pub fn classify(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Token::parse(s).ok().map(Reference::Token),
            Value::Object(_) => LegacyReference::detect(value).map(Reference::Legacy),
            _ => None,
        }
    }
}

/// Returns `true` for a token string or either legacy shape.
#[must_use]
pub fn is_reference(value: &Value) -> bool {
    match value {
        Value::String(s) => is_token(s),
        Value::Object(_) => LegacyReference::detect(value).is_some(),
        _ => false,
    }
}
