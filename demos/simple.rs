//! Encoding and decoding each kind of token.
//!
//! Run with: cargo run --example simple

use serde::{Deserialize, Serialize};
use serde_dataref::{
    decode_bytes, decode_numeric, decode_text, decode_url, encode_bytes, encode_numeric,
    encode_text, encode_url, from_token, to_token, NumericArray,
};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
    email: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let text = encode_text("Hello, World!");
    println!("text:    {}", text);
    assert_eq!(decode_text(text.as_str())?, "Hello, World!");

    let user = User {
        id: 42,
        name: "Alice Johnson".to_string(),
        email: "alice@example.com".to_string(),
    };
    let json = to_token(&user)?;
    println!("json:    {}", json);
    let user_back: User = from_token(json.as_str())?;
    assert_eq!(user, user_back);

    let bytes = encode_bytes(&[0xde, 0xad, 0xbe, 0xef]);
    println!("bytes:   {}", bytes);
    assert_eq!(decode_bytes(bytes.as_str())?, vec![0xde_u8, 0xad, 0xbe, 0xef]);

    let samples = NumericArray::Float32(vec![0.25, -1.5, 3.0]);
    let numeric = encode_numeric(&samples);
    println!("numeric: {}", numeric);
    assert_eq!(decode_numeric(numeric.as_str())?, samples);

    let url = encode_url("https://example.com/logo.png");
    println!("url:     {}", url);
    assert_eq!(decode_url(url.as_str())?, "https://example.com/logo.png");

    println!("✓ Round-trip successful");
    Ok(())
}
