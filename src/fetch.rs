//! Fetching the content behind URL-backed tokens.
//!
//! The codec and the resolver never reach for a global HTTP client. They are
//! handed something implementing [`Fetch`], by default an [`HttpFetcher`]
//! built on `reqwest`. Tests and hosts with their own transport plug in a
//! different implementation.
//!
//! Timeouts and cancellation from [`FetchOptions`] are enforced by
//! [`fetch_with`] around any fetcher, so implementations only need to apply
//! the request headers.

use crate::{Error, FetchOptions, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use url::Url;

/// Body and content type of a fetched URL.
#[derive(Clone, Debug, PartialEq)]
pub struct Fetched {
    /// Response body.
    pub body: Bytes,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
}

impl Fetched {
    /// Returns the content type without parameters, e.g. `text/html` for
    /// `text/html; charset=utf-8`.
    #[must_use]
    pub fn content_type_essence(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
    }
}

/// Retrieves the bytes behind a URL.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches `url`, sending `options.headers`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] for transport errors and non-success
    /// statuses.
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Fetched>;
}

/// A [`Fetch`] implementation that issues HTTP `GET` requests.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a default `reqwest` client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (proxies, TLS roots, connection pool).
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Fetched> {
        let parsed = Url::parse(url).map_err(|e| Error::fetch_failed(url, None, e))?;

        let mut request = self.http_client.get(parsed);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!(url, "fetching referenced content");
        let res = request
            .send()
            .await
            .map_err(|e| Error::fetch_failed(url, None, e))?;

        let status = res.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "fetch returned non-success status");
            return Err(Error::fetch_failed(
                url,
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("request failed"),
            ));
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let body = res
            .bytes()
            .await
            .map_err(|e| Error::fetch_failed(url, Some(status.as_u16()), e))?;

        tracing::debug!(url, bytes = body.len(), "fetched referenced content");
        Ok(Fetched { body, content_type })
    }
}

/// Runs `fetcher` under the timeout and cancellation of `options`.
///
/// A timed-out or cancelled fetch fails with [`Error::FetchFailed`] like any
/// other fetch error.
///
/// # Errors
///
/// Returns whatever the fetcher returns, or [`Error::FetchFailed`] on
/// timeout or cancellation.
pub async fn fetch_with(fetcher: &dyn Fetch, url: &str, options: &FetchOptions) -> Result<Fetched> {
    if options.is_cancelled() {
        return Err(Error::fetch_failed(url, None, "aborted"));
    }

    let bounded = async {
        match options.timeout {
            Some(limit) => tokio::time::timeout(limit, fetcher.fetch(url, options))
                .await
                .map_err(|_| Error::fetch_failed(url, None, format!("timed out after {:?}", limit)))?,
            None => fetcher.fetch(url, options).await,
        }
    };

    match &options.cancellation {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::fetch_failed(url, None, "aborted")),
                result = bounded => result,
            }
        }
        None => bounded.await,
    }
}
