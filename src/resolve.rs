//! Resolving every token inside a tree.
//!
//! [`Resolver`] walks a [`Value`] tree, finds every string that is a token,
//! decodes all of them concurrently (fetching URL references through its
//! [`Fetch`] implementation) and rebuilds the tree with each token replaced
//! by its value.
//!
//! The rebuild only allocates new containers along the paths that changed.
//! Every other subtree is the same `Arc` as in the input, and a tree
//! without tokens comes back unchanged.
//!
//! ## Examples
//!
//! ```rust
//! use serde_dataref::{encode_json, encode_text, value, Resolver, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tree = value!({
//!     "message": (encode_text("Hello, World!")),
//!     "items": [(encode_json(&value!({"key": "value"})).unwrap()), 123]
//! });
//!
//! let resolved = Resolver::new().resolve(&tree).await.unwrap();
//! assert_eq!(resolved, value!({
//!     "message": "Hello, World!",
//!     "items": [{"key": "value"}, 123]
//! }));
//! # }
//! ```

use crate::fetch::{fetch_with, Fetch, HttpFetcher};
use crate::token::{decode_inline, decode_url, is_token};
use crate::{Error, Map, Path, PathSegment, ResolveOptions, Result, Value};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Resolves tokens in trees.
///
/// A resolver holds its fetcher and options; it keeps no state between
/// calls and can be shared across tasks.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn Fetch>,
    options: ResolveOptions,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a best-effort resolution.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// The tree with every successfully resolved token replaced. Tokens that
    /// failed are left in place as strings.
    pub value: Value,
    /// One [`Error::AtPath`] per failed token, in path order.
    pub failures: Vec<Error>,
}

impl Resolution {
    /// Returns `true` when every token resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A token found during discovery.
struct Pending<'a> {
    path: Path,
    token: &'a str,
}

struct Replacement {
    path: Path,
    value: Option<Value>,
}

impl Resolver {
    /// Creates a resolver that fetches URL references over HTTP.
    pub fn new() -> Self {
        Self::with_fetcher(HttpFetcher::new())
    }

    /// Creates a resolver that fetches URL references through `fetcher`.
    pub fn with_fetcher(fetcher: impl Fetch + 'static) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            options: ResolveOptions::default(),
        }
    }

    /// Replaces the resolver's options.
    #[must_use]
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the options used for every resolution.
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolves every token in `tree`, failing if any token fails.
    ///
    /// All tokens are resolved before the outcome is decided; a failure does
    /// not cancel the others. The error returned is the failure whose path
    /// comes first in depth-first order, wrapped in [`Error::AtPath`].
    ///
    /// # Errors
    ///
    /// Returns the first failure in path order. No partially resolved tree
    /// is exposed.
    pub async fn resolve(&self, tree: &Value) -> Result<Value> {
        let resolution = self.run(tree).await;
        match resolution.failures.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(resolution.value),
        }
    }

    /// Resolves every token in `tree`, keeping whatever succeeds.
    pub async fn resolve_partial(&self, tree: &Value) -> Resolution {
        self.run(tree).await
    }

    async fn run(&self, tree: &Value) -> Resolution {
        let mut pending = Vec::new();
        discover(tree, &mut Path::root(), &mut pending);

        if pending.is_empty() {
            return Resolution {
                value: tree.clone(),
                failures: Vec::new(),
            };
        }

        tracing::debug!(tokens = pending.len(), "resolving tree");

        let limiter = self.options.max_concurrent_fetches.map(Semaphore::new);
        let outcomes = join_all(
            pending
                .iter()
                .map(|p| self.resolve_task(p, limiter.as_ref())),
        )
        .await;

        let mut replacements = Vec::with_capacity(pending.len());
        let mut failures = Vec::new();
        for (p, outcome) in pending.into_iter().zip(outcomes) {
            match outcome {
                Ok(value) => replacements.push(Replacement {
                    path: p.path,
                    value: Some(value),
                }),
                Err(err) => failures.push(err.at(p.path)),
            }
        }

        tracing::debug!(
            resolved = replacements.len(),
            failed = failures.len(),
            "resolved tree"
        );

        let value = rebuild(tree, 0, &mut replacements);
        Resolution { value, failures }
    }

    async fn resolve_task(&self, pending: &Pending<'_>, limiter: Option<&Semaphore>) -> Result<Value> {
        tracing::trace!(path = %pending.path, "resolving");
        let outcome = self.resolve_token(pending.token, limiter).await;
        match &outcome {
            Ok(value) => tracing::trace!(path = %pending.path, kind = value.type_name(), "resolved"),
            Err(err) => tracing::trace!(path = %pending.path, error = %err, "failed"),
        }
        outcome
    }

    async fn resolve_token(&self, token: &str, limiter: Option<&Semaphore>) -> Result<Value> {
        if let Some(value) = decode_inline(token)? {
            return Ok(value);
        }

        let url = decode_url(token)?;
        let _permit = match limiter {
            Some(semaphore) => Some(
                semaphore
                    .acquire()
                    .await
                    .map_err(|e| Error::fetch_failed(&url, None, e))?,
            ),
            None => None,
        };
        let fetched = fetch_with(self.fetcher.as_ref(), &url, &self.options.fetch).await?;
        Ok(Value::Bytes(fetched.body))
    }
}

/// Depth-first walk recording every token string and its path.
fn discover<'a>(node: &'a Value, path: &mut Path, out: &mut Vec<Pending<'a>>) {
    match node {
        Value::String(s) if is_token(s) => out.push(Pending {
            path: path.clone(),
            token: s,
        }),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                discover(item, path, out);
                path.pop();
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter() {
                path.push(PathSegment::Key(key.clone()));
                discover(item, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Copies `node`, applying `replacements`.
///
/// Every replacement path starts with the `depth` segments leading to
/// `node`, and replacements for the same child are contiguous (discovery
/// order). Tokens are leaves, so no path is a prefix of another.
fn rebuild(node: &Value, depth: usize, replacements: &mut [Replacement]) -> Value {
    if replacements.is_empty() {
        return node.clone();
    }
    if replacements.len() == 1 && replacements[0].path.len() == depth {
        return replacements[0].value.take().unwrap_or_else(|| node.clone());
    }

    match node {
        Value::Array(items) => {
            let mut out = items.to_vec();
            for_each_child(replacements, depth, |segment, group| {
                if let PathSegment::Index(index) = segment {
                    if let Some(slot) = out.get_mut(*index) {
                        *slot = rebuild(&items[*index], depth + 1, group);
                    }
                }
            });
            Value::from(out)
        }
        Value::Object(map) => {
            let mut out = Map::clone(map);
            for_each_child(replacements, depth, |segment, group| {
                if let PathSegment::Key(key) = segment {
                    if let (Some(slot), Some(original)) = (out.get_mut(key), map.get(key)) {
                        *slot = rebuild(original, depth + 1, group);
                    }
                }
            });
            Value::from(out)
        }
        _ => node.clone(),
    }
}

fn for_each_child<F>(replacements: &mut [Replacement], depth: usize, mut apply: F)
where
    F: FnMut(&PathSegment, &mut [Replacement]),
{
    let mut rest = replacements;
    while let Some(first) = rest.first() {
        let Some(segment) = first.path.segments().get(depth).cloned() else {
            break;
        };
        let len = rest
            .iter()
            .take_while(|r| r.path.segments().get(depth) == Some(&segment))
            .count();
        let (group, tail) = std::mem::take(&mut rest).split_at_mut(len);
        apply(&segment, group);
        rest = tail;
    }
}
