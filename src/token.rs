//! The token codec.
//!
//! Encoding turns a [`Payload`] into a [`Token`]; decoding reads a token
//! string back into a typed value. Every function here is pure except
//! [`encode_url_fetched`] and [`fetch_url`], which go through an injected
//! [`Fetch`] implementation.
//!
//! ## Examples
//!
//! ```rust
//! use serde_dataref::{decode_text, encode_text, media_kind, MediaKind};
//!
//! let token = encode_text("Hello, World!");
//! assert_eq!(token.as_str(), "data:text/plain;charset=utf-8,Hello%2C%20World%21");
//! assert_eq!(media_kind(token.as_str()), Some(MediaKind::PlainText));
//! assert_eq!(decode_text(token.as_str()).unwrap(), "Hello, World!");
//! ```

use crate::fetch::{fetch_with, Fetch};
use crate::header::{split_token, Header, MediaKind, CHARSET_UTF8, PREFIX};
use crate::{Error, FetchOptions, NumericArray, NumericKind, Result, Value};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// A self-describing `data:` token.
///
/// A `Token` is always structurally valid: it starts with `data:` and has a
/// comma between header and payload. Whether the payload decodes under the
/// declared kind is only known when decoding.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{MediaKind, Token};
///
/// let token: Token = "data:application/json;charset=utf-8,%7B%7D".parse().unwrap();
/// assert_eq!(token.header().kind(), Some(MediaKind::Json));
/// assert_eq!(token.payload(), "%7B%7D");
///
/// assert!(Token::parse("data:text/plain").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token {
    text: String,
    /// Byte offset of the comma ending the header.
    comma: usize,
}

impl Token {
    /// Validates `s` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the prefix or the separator is
    /// missing.
    pub fn parse(s: &str) -> Result<Self> {
        Token::try_from(s.to_string())
    }

    fn from_parts(header: &Header, payload: &str) -> Self {
        let header = header.to_string();
        let comma = PREFIX.len() + header.len();
        Token {
            text: format!("{}{},{}", PREFIX, header, payload),
            comma,
        }
    }

    /// Returns the full token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Unwraps the token into its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }

    /// Returns the parsed header.
    #[must_use]
    pub fn header(&self) -> Header {
        Header::parse(self.parts().0)
    }

    /// Returns the raw (still encoded) payload segment.
    #[must_use]
    pub fn payload(&self) -> &str {
        self.parts().1
    }

    fn parts(&self) -> (&str, &str) {
        (&self.text[PREFIX.len()..self.comma], &self.text[self.comma + 1..])
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Token::parse(s)
    }
}

impl TryFrom<String> for Token {
    type Error = Error;

    fn try_from(text: String) -> Result<Self> {
        let (header, _) = split_token(&text)?;
        let comma = PREFIX.len() + header.len();
        Ok(Token { text, comma })
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.text
    }
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        Value::String(token.text)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Everything a token can carry.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{encode, NumericArray, Payload};
///
/// let token = encode(&Payload::Numeric(NumericArray::Uint8(vec![1, 2, 3]))).unwrap();
/// assert_eq!(token.as_str(), "data:application/octet-stream;type=Uint8Array;base64,AQID");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
    Bytes(Bytes),
    Numeric(NumericArray),
    Url(String),
}

/// Encodes any payload.
///
/// # Errors
///
/// Only [`Payload::Json`] can fail, with [`Error::Serialization`].
pub fn encode(payload: &Payload) -> Result<Token> {
    match payload {
        Payload::Text(text) => Ok(encode_text(text)),
        Payload::Json(value) => encode_json(value),
        Payload::Bytes(bytes) => Ok(encode_bytes(bytes)),
        Payload::Numeric(array) => Ok(encode_numeric(array)),
        Payload::Url(url) => Ok(encode_url(url)),
    }
}

fn text_header(kind: MediaKind) -> Header {
    Header::new(kind.mime()).with_parameter("charset", CHARSET_UTF8)
}

fn escape(text: &str) -> Cow<'_, str> {
    urlencoding::encode(text)
}

/// Encodes text as a `text/plain` token.
#[must_use]
pub fn encode_text(text: &str) -> Token {
    Token::from_parts(&text_header(MediaKind::PlainText), &escape(text))
}

/// Encodes the canonical JSON form of `value` as an `application/json` token.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{decode_json, encode_json, value};
///
/// let original = value!({"name": "John", "age": 30});
/// let token = encode_json(&original).unwrap();
/// assert_eq!(decode_json(token.as_str()).unwrap(), original);
/// ```
///
/// # Errors
///
/// Returns [`Error::Serialization`] if `value` has no JSON form (non-finite
/// floats, maps with non-string keys, failing `Serialize` impls).
pub fn encode_json<T>(value: &T) -> Result<Token>
where
    T: ?Sized + Serialize,
{
    let json = serde_json::to_string(value).map_err(Error::serialization)?;
    Ok(Token::from_parts(&text_header(MediaKind::Json), &escape(&json)))
}

/// Encodes raw bytes as an untyped `application/octet-stream` token.
#[must_use]
pub fn encode_bytes(bytes: &[u8]) -> Token {
    let header = Header::new(MediaKind::OctetStream.mime()).with_base64();
    Token::from_parts(&header, &STANDARD.encode(bytes))
}

/// Encodes a typed numeric array, tagging the token with its variant.
#[must_use]
pub fn encode_numeric(array: &NumericArray) -> Token {
    let header = Header::new(MediaKind::OctetStream.mime())
        .with_parameter("type", array.kind().tag())
        .with_base64();
    Token::from_parts(&header, &STANDARD.encode(array.to_bytes()))
}

/// Encodes a URL as a `text/x-uri` reference token without touching the
/// network.
#[must_use]
pub fn encode_url(url: &str) -> Token {
    Token::from_parts(&text_header(MediaKind::UriReference), &escape(url))
}

/// Fetches `url` and encodes its content as a base64 token.
///
/// The token's media type is the response content type (without
/// parameters), or `application/octet-stream` when the response has none.
///
/// # Errors
///
/// Returns [`Error::FetchFailed`] if the fetch fails.
pub async fn encode_url_fetched(
    url: &str,
    fetcher: &dyn Fetch,
    options: &FetchOptions,
) -> Result<Token> {
    let fetched = fetch_with(fetcher, url, options).await?;
    let media_type = fetched
        .content_type_essence()
        .unwrap_or(MediaKind::OctetStream.mime());
    let header = Header::new(media_type).with_base64();
    Ok(Token::from_parts(&header, &STANDARD.encode(&fetched.body)))
}

/// Serializes `value` into an `application/json` token.
///
/// Alias of [`encode_json`] for symmetry with [`from_token`].
///
/// # Errors
///
/// Returns [`Error::Serialization`] if `value` cannot be serialized.
pub fn to_token<T>(value: &T) -> Result<Token>
where
    T: ?Sized + Serialize,
{
    encode_json(value)
}

/// Deserializes a typed value from an `application/json` token.
///
/// # Examples
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use serde_dataref::{from_token, to_token};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct User { name: String, age: u32 }
///
/// let user = User { name: "John".to_string(), age: 30 };
/// let token = to_token(&user).unwrap();
/// let back: User = from_token(token.as_str()).unwrap();
/// assert_eq!(back, user);
/// ```
///
/// # Errors
///
/// Returns [`Error::PayloadMismatch`] when the token is not JSON or does not
/// match `T`.
pub fn from_token<T>(token: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let text = decode_json_text(token)?;
    serde_json::from_str(&text).map_err(|e| Error::payload_mismatch("JSON", e))
}

/// Decodes the payload bytes of a token according to its encoding marker.
fn payload_bytes(header: &Header, payload: &str) -> Result<Vec<u8>> {
    if header.is_base64() {
        STANDARD
            .decode(payload)
            .map_err(|e| Error::payload_mismatch("base64", e))
    } else {
        check_escapes(payload)?;
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}

/// Every `%` must start a two-digit hex escape.
fn check_escapes(payload: &str) -> Result<()> {
    let bytes = payload.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(Error::payload_mismatch(
                    "percent-escaped text",
                    format!("invalid escape at byte {}", i),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

fn payload_text(header: &Header, payload: &str) -> Result<String> {
    let bytes = payload_bytes(header, payload)?;
    String::from_utf8(bytes).map_err(|e| Error::payload_mismatch("UTF-8 text", e))
}

fn parse(token: &str) -> Result<(Header, &str)> {
    let (header, payload) = split_token(token)?;
    Ok((Header::parse(header), payload))
}

fn expect_kind(header: &Header, accepted: &[MediaKind], expected: &str) -> Result<()> {
    match header.kind() {
        Some(kind) if accepted.contains(&kind) => Ok(()),
        _ => Err(Error::payload_mismatch(
            expected,
            format!("token declares `{}`", header.media_type()),
        )),
    }
}

/// Decodes a `text/plain` or `application/json` token to its text.
///
/// # Errors
///
/// [`Error::MalformedToken`] for structurally invalid tokens,
/// [`Error::PayloadMismatch`] for other media kinds or non-UTF-8 payloads.
pub fn decode_text(token: &str) -> Result<String> {
    let (header, payload) = parse(token)?;
    expect_kind(&header, &[MediaKind::PlainText, MediaKind::Json], "text")?;
    payload_text(&header, payload)
}

fn decode_json_text(token: &str) -> Result<String> {
    let (header, payload) = parse(token)?;
    expect_kind(&header, &[MediaKind::Json], "JSON")?;
    payload_text(&header, payload)
}

/// Decodes an `application/json` token.
///
/// # Errors
///
/// [`Error::PayloadMismatch`] when the token is not JSON or the payload does
/// not parse.
pub fn decode_json(token: &str) -> Result<Value> {
    let text = decode_json_text(token)?;
    serde_json::from_str(&text).map_err(|e| Error::payload_mismatch("JSON", e))
}

/// Decodes a token's payload to raw bytes.
///
/// Works for every inline token (text, JSON and octet-stream, typed or
/// not); uri-reference tokens have no inline content and are rejected.
///
/// # Errors
///
/// [`Error::PayloadMismatch`] for uri-reference tokens and invalid base64.
pub fn decode_bytes(token: &str) -> Result<Bytes> {
    let (header, payload) = parse(token)?;
    if header.kind() == Some(MediaKind::UriReference) {
        return Err(Error::payload_mismatch(
            "inline content",
            "uri-reference tokens must be fetched",
        ));
    }
    payload_bytes(&header, payload).map(Bytes::from)
}

/// Decodes a numeric array token using its `type` parameter.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{decode_numeric, encode_bytes, encode_numeric, ErrorKind, NumericArray};
///
/// let token = encode_numeric(&NumericArray::Float32(vec![1.0, -2.5]));
/// assert_eq!(decode_numeric(token.as_str()).unwrap(), NumericArray::Float32(vec![1.0, -2.5]));
///
/// let untyped = encode_bytes(&[1, 2, 3]);
/// assert_eq!(decode_numeric(untyped.as_str()).unwrap_err().kind(), ErrorKind::MissingTypeTag);
/// ```
///
/// # Errors
///
/// [`Error::MissingTypeTag`] without a `type` parameter,
/// [`Error::UnsupportedVariant`] for unknown tags,
/// [`Error::PayloadMismatch`] for non-octet-stream tokens and byte lengths
/// that do not fit the element width.
pub fn decode_numeric(token: &str) -> Result<NumericArray> {
    let (header, payload) = parse(token)?;
    expect_kind(&header, &[MediaKind::OctetStream], "numeric array")?;
    let kind = header.numeric_kind()?.ok_or(Error::MissingTypeTag)?;
    NumericArray::from_bytes(kind, &payload_bytes(&header, payload)?)
}

/// Decodes an octet-stream token as `kind`, regardless of its `type`
/// parameter. The bytes are reinterpreted, not converted.
///
/// # Errors
///
/// [`Error::PayloadMismatch`] for non-octet-stream tokens and byte lengths
/// that do not fit the element width.
pub fn decode_numeric_as(token: &str, kind: NumericKind) -> Result<NumericArray> {
    let (header, payload) = parse(token)?;
    expect_kind(&header, &[MediaKind::OctetStream], "numeric array")?;
    NumericArray::from_bytes(kind, &payload_bytes(&header, payload)?)
}

/// Extracts the URL from a `text/x-uri` token without fetching it.
///
/// # Errors
///
/// [`Error::PayloadMismatch`] for other media kinds.
pub fn decode_url(token: &str) -> Result<String> {
    let (header, payload) = parse(token)?;
    expect_kind(&header, &[MediaKind::UriReference], "URL reference")?;
    payload_text(&header, payload)
}

/// Fetches the content a `text/x-uri` token points to.
///
/// # Errors
///
/// [`Error::PayloadMismatch`] for other media kinds,
/// [`Error::FetchFailed`] when the fetch fails.
pub async fn fetch_url(token: &str, fetcher: &dyn Fetch, options: &FetchOptions) -> Result<Bytes> {
    let url = decode_url(token)?;
    let fetched = fetch_with(fetcher, &url, options).await?;
    Ok(fetched.body)
}

/// Returns `true` if `s` starts with the token prefix.
///
/// This is a constant-time prefix check; a string passing it may still be
/// malformed.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{encode_text, is_token};
///
/// assert!(is_token(encode_text("").as_str()));
/// assert!(!is_token("hello"));
/// ```
#[must_use]
pub fn is_token(s: &str) -> bool {
    s.starts_with(PREFIX)
}

/// Returns the declared media kind, or `None` for malformed tokens and
/// unknown media types.
#[must_use]
pub fn media_kind(token: &str) -> Option<MediaKind> {
    split_token(token)
        .ok()
        .and_then(|(header, _)| Header::parse(header).kind())
}

/// Returns the header parameters, or an empty map for malformed tokens.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{encode_numeric, parameters, NumericArray};
///
/// let token = encode_numeric(&NumericArray::Int32(vec![7]));
/// let params = parameters(token.as_str());
/// assert_eq!(params.get("type").map(String::as_str), Some("Int32Array"));
/// assert!(parameters("not a token").is_empty());
/// ```
#[must_use]
pub fn parameters(token: &str) -> IndexMap<String, String> {
    split_token(token)
        .map(|(header, _)| Header::parse(header).parameters().clone())
        .unwrap_or_default()
}

/// Decodes a token to the value the resolver substitutes for it, without
/// fetching.
///
/// Returns `Ok(None)` for uri-reference tokens, whose value needs a fetch.
pub(crate) fn decode_inline(token: &str) -> Result<Option<Value>> {
    let (header, payload) = parse(token)?;
    let value = match header.kind() {
        Some(MediaKind::Json) => {
            let text = payload_text(&header, payload)?;
            serde_json::from_str::<Value>(&text).map_err(|e| Error::payload_mismatch("JSON", e))?
        }
        Some(MediaKind::PlainText) => Value::String(payload_text(&header, payload)?),
        Some(MediaKind::OctetStream) => {
            let bytes = payload_bytes(&header, payload)?;
            match header.numeric_kind()? {
                Some(kind) => Value::Numeric(NumericArray::from_bytes(kind, &bytes)?),
                None => Value::Bytes(Bytes::from(bytes)),
            }
        }
        Some(MediaKind::UriReference) => return Ok(None),
        None if header.is_base64() => Value::Bytes(Bytes::from(payload_bytes(&header, payload)?)),
        None => Value::String(payload_text(&header, payload)?),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_text_token_layout() {
        let token = encode_text("a b");
        assert_eq!(token.as_str(), "data:text/plain;charset=utf-8,a%20b");
    }

    #[test]
    fn test_empty_payloads() {
        assert_eq!(decode_text(encode_text("").as_str()).unwrap(), "");
        assert!(decode_bytes(encode_bytes(&[]).as_str()).unwrap().is_empty());
        assert_eq!(
            encode_bytes(&[]).as_str(),
            "data:application/octet-stream;base64,"
        );
    }

    #[test]
    fn test_json_layout() {
        let token = encode_json(&serde_json::json!({"k": "v"})).unwrap();
        assert_eq!(
            token.as_str(),
            "data:application/json;charset=utf-8,%7B%22k%22%3A%22v%22%7D"
        );
    }

    #[test]
    fn test_url_token_round_trip() {
        let url = "https://example.com/a?b=c&d=e,f";
        let token = encode_url(url);
        assert_eq!(media_kind(token.as_str()), Some(MediaKind::UriReference));
        assert_eq!(decode_url(token.as_str()).unwrap(), url);
    }

    #[test]
    fn test_url_token_has_no_inline_content() {
        let token = encode_url("https://example.com/data.bin");
        assert_eq!(
            decode_text(token.as_str()).unwrap_err().kind(),
            ErrorKind::PayloadMismatch
        );
        assert_eq!(
            decode_json(token.as_str()).unwrap_err().kind(),
            ErrorKind::PayloadMismatch
        );
        assert_eq!(
            decode_bytes(token.as_str()).unwrap_err().kind(),
            ErrorKind::PayloadMismatch
        );
        assert!(decode_inline(token.as_str()).unwrap().is_none());
    }

    #[test]
    fn test_scheme_is_chosen_by_marker() {
        // Plain text may also arrive base64 encoded.
        let token = "data:text/plain;base64,aGk=";
        assert_eq!(decode_text(token).unwrap(), "hi");
        assert_eq!(
            decode_inline(token).unwrap(),
            Some(Value::String("hi".to_string()))
        );
    }

    #[test]
    fn test_invalid_base64_is_payload_mismatch() {
        let err = decode_bytes("data:application/octet-stream;base64,***").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadMismatch);
    }

    #[test]
    fn test_invalid_json_is_payload_mismatch() {
        let err = decode_json("data:application/json;charset=utf-8,%7Bnope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadMismatch);
    }

    #[test]
    fn test_invalid_utf8_is_payload_mismatch() {
        let err = decode_text("data:text/plain,%FF%FE").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadMismatch);
    }

    #[test]
    fn test_bad_percent_escapes_are_payload_mismatch() {
        for token in [
            "data:text/plain;charset=utf-8,100%ZZ",
            "data:text/plain,50%",
            "data:text/plain,%4",
            "data:application/json;charset=utf-8,%22a%2%22",
            "data:text/x-uri;charset=utf-8,https%3A%2F%2Fx.test%2",
        ] {
            let err = decode_inline(token).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PayloadMismatch, "{}", token);
        }
        assert_eq!(decode_text("data:text/plain,100%25").unwrap(), "100%");
    }

    #[test]
    fn test_token_parts() {
        let token = Token::parse("data:text/plain;charset=utf-8,a,b").unwrap();
        assert_eq!(token.header().media_type(), "text/plain");
        assert_eq!(token.payload(), "a,b");

        let built = encode_bytes(&[1]);
        assert_eq!(built.payload(), "AQ==");
        assert_eq!(Token::parse(built.as_str()).unwrap(), built);
        assert_eq!(Token::parse("data:,").unwrap().payload(), "");
    }

    #[test]
    fn test_unknown_type_tag() {
        let err = decode_numeric("data:application/octet-stream;type=Float16Array;base64,AAAA")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVariant);
    }

    #[test]
    fn test_decode_inline_unknown_media_types() {
        assert_eq!(
            decode_inline("data:image/png;base64,AQI=").unwrap(),
            Some(Value::Bytes(Bytes::from_static(&[1, 2])))
        );
        assert_eq!(
            decode_inline("data:text/csv,a%2Cb").unwrap(),
            Some(Value::String("a,b".to_string()))
        );
    }

    #[test]
    fn test_token_serde_is_transparent() {
        let token = encode_text("x");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{}\"", token));
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
        assert!(serde_json::from_str::<Token>("\"plain\"").is_err());
    }

    #[test]
    fn test_reencoding_is_stable() {
        let token = encode_json(&serde_json::json!({"b": [1, 2], "a": null})).unwrap();
        let decoded = decode_json(token.as_str()).unwrap();
        assert_eq!(encode_json(&decoded).unwrap(), token);
    }
}
