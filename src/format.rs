//! Token format reference
//!
//! This module documents the token format as implemented by this library.
//! It contains no code.
//!
//! # Overview
//!
//! A token is a single string that carries a value together with a
//! description of how to read it. Tokens are data URIs: they travel inside
//! JSON documents, query strings and log lines without escaping problems,
//! and a reader can tell a token from ordinary text by its prefix alone.
//!
//! # Grammar
//!
//! ```text
//! token     = "data:" header "," payload
//! header    = media-type *( ";" name "=" value ) [ ";base64" ]
//! payload   = percent-escaped text | base64 bytes
//! ```
//!
//! Everything up to the first comma is the header. The payload may itself
//! contain commas.
//!
//! ## Media types
//!
//! | Media type | Decodes to | Encoding |
//! |------------|------------|----------|
//! | `text/plain;charset=utf-8` | string | percent escapes |
//! | `application/json;charset=utf-8` | any JSON value | percent escapes |
//! | `application/octet-stream` | bytes | base64 |
//! | `application/octet-stream;type=<Variant>` | numeric array | base64 |
//! | `text/x-uri;charset=utf-8` | bytes fetched from the URL | percent escapes |
//!
//! An empty media type means `text/plain`. Other media types, such as
//! those produced by fetching a URL at encode time (`image/png;base64`),
//! decode by their encoding: base64 payloads as bytes, percent-escaped
//! payloads as text.
//!
//! ## Escaping
//!
//! Text payloads escape every byte outside `A-Z a-z 0-9 - . _ ~` as `%XX`
//! of its UTF-8 encoding. Decoding accepts any valid escapes and rejects a
//! `%` not followed by two hex digits. Base64
//! payloads use the standard alphabet with padding.
//!
//! ## Numeric arrays
//!
//! The `type` parameter names the element type:
//!
//! | Tag | Element |
//! |-----|---------|
//! | `Int8Array` | `i8` |
//! | `Uint8Array` | `u8` |
//! | `Uint8ClampedArray` | `u8`, saturating |
//! | `Int16Array` | `i16` |
//! | `Uint16Array` | `u16` |
//! | `Int32Array` | `i32` |
//! | `Uint32Array` | `u32` |
//! | `BigInt64Array` | `i64` |
//! | `BigUint64Array` | `u64` |
//! | `Float32Array` | `f32` |
//! | `Float64Array` | `f64` |
//!
//! Elements are stored in the host's native byte order with no padding, so
//! the payload length must be a multiple of the element size. Decoding a
//! numeric token without a `type` parameter is an error.
//!
//! # Examples
//!
//! ```text
//! data:text/plain;charset=utf-8,Hello%2C%20World%21
//! data:application/json;charset=utf-8,%7B%22key%22%3A%22value%22%7D
//! data:application/octet-stream;base64,AAEC
//! data:application/octet-stream;type=Float32Array;base64,AACAPwAAAEA=
//! data:text/x-uri;charset=utf-8,https%3A%2F%2Fexample.com%2Fimage.png
//! ```
//!
//! # Resolution
//!
//! Resolving a tree replaces every string that starts with `data:` by its
//! decoded value. Object keys are never resolved. Values that are not
//! tokens, including the object-shaped references described in
//! [`legacy`](crate::legacy), are kept as they are.
