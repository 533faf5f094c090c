//! Resolving a document that mixes tokens with ordinary values.
//!
//! URL references are served by an in-memory fetcher, so the demo runs
//! offline.
//!
//! Run with: cargo run --example resolve_tree

use async_trait::async_trait;
use bytes::Bytes;
use serde_dataref::{
    encode_json, encode_numeric, encode_text, encode_url, value, Fetch, FetchOptions, Fetched,
    NumericArray, ResolveOptions, Resolver, Result,
};
use std::time::Duration;

struct StaticFetcher;

#[async_trait]
impl Fetch for StaticFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<Fetched> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Fetched {
            body: Bytes::from(format!("<contents of {}>", url)),
            content_type: Some("text/plain".to_string()),
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let document = value!({
        "title": (encode_text("Quarterly report")),
        "summary": (encode_json(&value!({"revenue": 1200, "growth": 0.08}))?),
        "series": (encode_numeric(&NumericArray::Float64(vec![1.0, 1.5, 2.25]))),
        "attachments": [
            (encode_url("https://example.com/a.pdf")),
            (encode_url("https://example.com/b.pdf")),
            "inline note"
        ],
        "version": 3
    });

    let resolver = Resolver::with_fetcher(StaticFetcher).with_options(
        ResolveOptions::new()
            .with_fetch(FetchOptions::new().with_timeout(Duration::from_secs(5)))
            .with_max_concurrent_fetches(4),
    );

    let resolved = resolver.resolve(&document).await?;
    println!("{:#?}", resolved);

    let broken = value!({"ok": (encode_text("fine")), "bad": "data:application/json,%7B"});
    let resolution = resolver.resolve_partial(&broken).await;
    for failure in &resolution.failures {
        println!("failed: {}", failure);
    }
    println!("partial: {:?}", resolution.value);

    Ok(())
}
