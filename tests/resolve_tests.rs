use async_trait::async_trait;
use bytes::Bytes;
use serde_dataref::{
    encode_bytes, encode_json, encode_numeric, encode_text, encode_url, encode_url_fetched,
    fetch_url, value, CancellationToken, Error, ErrorKind, Fetch, FetchOptions, Fetched,
    NumericArray, Path, PathSegment, ResolveOptions, Resolver, Result, Value,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Serves `body of <url>` after a per-URL delay and records what it saw.
#[derive(Clone, Default)]
struct MockFetcher {
    delays: HashMap<String, Duration>,
    content_types: HashMap<String, Option<String>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    seen_headers: Arc<Mutex<Vec<Vec<(String, String)>>>>,
}

impl MockFetcher {
    fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Overrides the `text/plain` content type served for `url`.
    fn with_content_type(mut self, url: &str, content_type: Option<&str>) -> Self {
        self.content_types
            .insert(url.to_string(), content_type.map(str::to_string));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Fetched> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_headers
            .lock()
            .unwrap()
            .push(options.headers.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(url).copied().unwrap_or(Duration::from_millis(1));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if url.contains("missing") {
            return Err(Error::fetch_failed(url, Some(404), "Not Found"));
        }
        Ok(Fetched {
            body: Bytes::from(format!("body of {}", url)),
            content_type: self
                .content_types
                .get(url)
                .cloned()
                .unwrap_or_else(|| Some("text/plain".to_string())),
        })
    }
}

fn resolver(fetcher: &MockFetcher) -> Resolver {
    Resolver::with_fetcher(fetcher.clone())
}

#[tokio::test]
async fn test_resolve_flat_object() {
    let tree = value!({
        "message": (encode_text("Hello, World!")),
        "count": 42
    });

    let resolved = resolver(&MockFetcher::default()).resolve(&tree).await.unwrap();
    assert_eq!(resolved, value!({"message": "Hello, World!", "count": 42}));
}

#[tokio::test]
async fn test_resolve_mixed_array() {
    let tree = value!({
        "items": [
            (encode_text("item1")),
            "regular",
            (encode_json(&value!({"key": "value"})).unwrap()),
            123
        ]
    });

    let resolved = resolver(&MockFetcher::default()).resolve(&tree).await.unwrap();
    assert_eq!(
        resolved,
        value!({"items": ["item1", "regular", {"key": "value"}, 123]})
    );
}

#[tokio::test]
async fn test_resolve_binary_kinds() {
    let tree = value!({
        "raw": (encode_bytes(&[9, 8, 7])),
        "samples": (encode_numeric(&NumericArray::Float64(vec![0.5, -1.0])))
    });

    let resolved = resolver(&MockFetcher::default()).resolve(&tree).await.unwrap();
    assert_eq!(
        resolved.get("raw").and_then(Value::as_bytes),
        Some(&[9u8, 8, 7][..])
    );
    assert_eq!(
        resolved.get("samples").and_then(Value::as_numeric),
        Some(&NumericArray::Float64(vec![0.5, -1.0]))
    );
}

#[tokio::test]
async fn test_zero_tokens_returns_input() {
    let tree = value!({"a": [1, {"b": "data-ish but not a token"}], "c": null});
    let fetcher = MockFetcher::default();

    let resolved = resolver(&fetcher).resolve(&tree).await.unwrap();
    assert_eq!(resolved, tree);
    assert!(resolved.ptr_eq(&tree));
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_root_token() {
    let tree = Value::from(encode_text("just me"));
    let resolved = resolver(&MockFetcher::default()).resolve(&tree).await.unwrap();
    assert_eq!(resolved, value!("just me"));
}

#[tokio::test]
async fn test_deep_nesting_and_sharing() {
    let untouched = value!({"x": [1, 2, {"y": "z"}]});
    let sibling = value!(["keep", "me"]);
    let tree = value!({
        "untouched": (untouched.clone()),
        "level1": {
            "sibling": (sibling.clone()),
            "level2": [
                {"level3": [(encode_text("deep")), "plain"]},
                7
            ]
        }
    });

    let resolved = resolver(&MockFetcher::default()).resolve(&tree).await.unwrap();
    assert_eq!(
        resolved,
        value!({
            "untouched": {"x": [1, 2, {"y": "z"}]},
            "level1": {
                "sibling": ["keep", "me"],
                "level2": [
                    {"level3": ["deep", "plain"]},
                    7
                ]
            }
        })
    );

    assert!(resolved.get("untouched").unwrap().ptr_eq(&untouched));
    let level1 = resolved.get("level1").unwrap();
    assert!(level1.get("sibling").unwrap().ptr_eq(&sibling));
    assert!(!level1.ptr_eq(tree.get("level1").unwrap()));

    // the input is not modified
    let original_leaf = &tree.get("level1").unwrap().get("level2").unwrap().as_array().unwrap()[0];
    assert!(original_leaf.get("level3").unwrap().as_array().unwrap()[0]
        .as_str()
        .unwrap()
        .starts_with("data:"));
}

#[tokio::test]
async fn test_object_keys_are_not_resolved() {
    let key = encode_text("key").into_string();
    let mut map = serde_dataref::Map::new();
    map.insert(key.clone(), Value::from(encode_text("value")));
    let tree = Value::from(map);

    let resolved = resolver(&MockFetcher::default()).resolve(&tree).await.unwrap();
    assert_eq!(resolved.get(&key), Some(&value!("value")));
}

#[tokio::test]
async fn test_legacy_shapes_pass_through() {
    let legacy = value!({"refType": "text", "value": "hi"});
    let tree = value!({"old": (legacy.clone()), "new": (encode_text("hi"))});

    let resolved = resolver(&MockFetcher::default()).resolve(&tree).await.unwrap();
    assert!(resolved.get("old").unwrap().ptr_eq(&legacy));
    assert_eq!(resolved.get("new"), Some(&value!("hi")));
}

#[tokio::test]
async fn test_url_tokens_are_fetched() {
    let fetcher = MockFetcher::default();
    let tree = value!({"image": (encode_url("https://example.com/a.png"))});

    let resolved = resolver(&fetcher).resolve(&tree).await.unwrap();
    assert_eq!(
        resolved.get("image").and_then(Value::as_bytes),
        Some(&b"body of https://example.com/a.png"[..])
    );
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_fetch_options_forwarded_to_every_fetch() {
    let fetcher = MockFetcher::default();
    let tree = value!([
        (encode_url("https://example.com/1")),
        (encode_url("https://example.com/2"))
    ]);
    let options = ResolveOptions::new()
        .with_fetch(FetchOptions::new().with_header("authorization", "Bearer t"));

    resolver(&fetcher)
        .with_options(options)
        .resolve(&tree)
        .await
        .unwrap();

    let seen = fetcher.seen_headers.lock().unwrap();
    assert_eq!(seen.len(), 2);
    for headers in seen.iter() {
        assert_eq!(
            headers,
            &vec![("authorization".to_string(), "Bearer t".to_string())]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_fetches_run_in_parallel() {
    let urls = ["https://a.test/1", "https://a.test/2", "https://a.test/3", "https://a.test/4"];
    let fetcher = urls
        .iter()
        .enumerate()
        .fold(MockFetcher::default(), |f, (i, url)| {
            f.with_delay(url, Duration::from_millis(50 * (i as u64 + 1)))
        });
    let tree = Value::from(
        urls.iter()
            .map(|url| Value::from(encode_url(url)))
            .collect::<Vec<_>>(),
    );

    let start = Instant::now();
    let resolved = resolver(&fetcher).resolve(&tree).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(fetcher.calls(), 4);
    assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 4);
    assert_eq!(resolved.as_array().unwrap().len(), 4);
    // slowest fetch is 200ms, the sum would be 500ms
    assert!(elapsed >= Duration::from_millis(200), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(300), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_cap() {
    let urls: Vec<String> = (0..6).map(|i| format!("https://cap.test/{}", i)).collect();
    let fetcher = urls.iter().fold(MockFetcher::default(), |f, url| {
        f.with_delay(url, Duration::from_millis(10))
    });
    let tree = Value::from(
        urls.iter()
            .map(|url| Value::from(encode_url(url)))
            .collect::<Vec<_>>(),
    );

    let start = Instant::now();
    resolver(&fetcher)
        .with_options(ResolveOptions::new().with_max_concurrent_fetches(2))
        .resolve(&tree)
        .await
        .unwrap();

    assert_eq!(fetcher.calls(), 6);
    assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_malformed_token_fails_with_path() {
    let tree = value!({
        "good": (encode_text("fine")),
        "list": [1, "data:application/json;charset=utf-8,%7Bbroken"],
        "also_good": (encode_json(&value!([1])).unwrap())
    });

    let err = resolver(&MockFetcher::default())
        .resolve(&tree)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PayloadMismatch);
    let expected: Path = vec![PathSegment::Key("list".to_string()), PathSegment::Index(1)].into();
    assert_eq!(err.path(), Some(&expected));
    assert!(err.to_string().starts_with("at $.list[1]:"), "{}", err);
}

#[tokio::test]
async fn test_structurally_invalid_token() {
    let tree = value!(["data:no-comma-here"]);
    let err = resolver(&MockFetcher::default())
        .resolve(&tree)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedToken);
}

#[tokio::test(start_paused = true)]
async fn test_first_failure_in_path_order_wins() {
    // the later path fails first in time
    let fetcher = MockFetcher::default()
        .with_delay("https://x.test/missing-a", Duration::from_millis(100))
        .with_delay("https://x.test/missing-b", Duration::from_millis(1));
    let tree = value!({
        "a": (encode_url("https://x.test/missing-a")),
        "b": (encode_url("https://x.test/missing-b")),
        "c": (encode_url("https://x.test/ok"))
    });

    let err = resolver(&fetcher).resolve(&tree).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FetchFailed);
    assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("$.a"));
    // failures do not cancel siblings
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_partial_resolution() {
    let tree = value!({
        "ok": (encode_text("fine")),
        "bad": (encode_url("https://x.test/missing")),
        "worse": "data:application/octet-stream;type=Float16Array;base64,AAA=",
        "plain": [1, 2]
    });

    let resolution = resolver(&MockFetcher::default()).resolve_partial(&tree).await;
    assert!(!resolution.is_complete());
    assert_eq!(resolution.value.get("ok"), Some(&value!("fine")));
    assert_eq!(resolution.value.get("bad"), tree.get("bad"));
    assert_eq!(resolution.value.get("worse"), tree.get("worse"));
    assert!(resolution
        .value
        .get("plain")
        .unwrap()
        .ptr_eq(tree.get("plain").unwrap()));

    let kinds: Vec<_> = resolution.failures.iter().map(Error::kind).collect();
    assert_eq!(kinds, vec![ErrorKind::FetchFailed, ErrorKind::UnsupportedVariant]);
    let paths: Vec<_> = resolution
        .failures
        .iter()
        .map(|e| e.path().map(ToString::to_string))
        .collect();
    assert_eq!(paths, vec![Some("$.bad".to_string()), Some("$.worse".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_surfaces_as_fetch_failed() {
    let fetcher = MockFetcher::default().with_delay("https://slow.test/", Duration::from_secs(10));
    let tree = value!([(encode_url("https://slow.test/"))]);
    let options =
        ResolveOptions::new().with_fetch(FetchOptions::new().with_timeout(Duration::from_millis(100)));

    let err = resolver(&fetcher)
        .with_options(options)
        .resolve(&tree)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FetchFailed);
    assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("$[0]"));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let fetcher = MockFetcher::default();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let tree = value!({"inline": (encode_text("still works")), "remote": (encode_url("https://c.test/"))});
    let options = ResolveOptions::new().with_fetch(FetchOptions::new().with_cancellation(cancel));

    let resolution = resolver(&fetcher)
        .with_options(options)
        .resolve_partial(&tree)
        .await;
    assert_eq!(resolution.value.get("inline"), Some(&value!("still works")));
    assert_eq!(resolution.failures.len(), 1);
    assert_eq!(resolution.failures[0].kind(), ErrorKind::FetchFailed);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_bad_percent_escape_fails_at_path() {
    let tree = value!({"ok": (encode_text("fine")), "t": "data:text/plain,50%"});

    let err = resolver(&MockFetcher::default()).resolve(&tree).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PayloadMismatch);
    assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("$.t"));
}

#[tokio::test]
async fn test_encode_url_fetched_uses_content_type() {
    let url = "https://text.test/readme";
    let fetcher = MockFetcher::default().with_content_type(url, Some("text/plain; charset=utf-8"));

    let token = encode_url_fetched(url, &fetcher, &FetchOptions::new()).await.unwrap();
    println!("Fetched token: {}", token);
    assert!(token.as_str().starts_with("data:text/plain;base64,"));
    assert_eq!(fetcher.calls(), 1);

    let resolved = resolver(&fetcher)
        .resolve(&Value::from(token))
        .await
        .unwrap();
    assert_eq!(resolved, value!("body of https://text.test/readme"));
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_encode_url_fetched_without_content_type() {
    let url = "https://blob.test/raw";
    let fetcher = MockFetcher::default().with_content_type(url, None);

    let token = encode_url_fetched(url, &fetcher, &FetchOptions::new()).await.unwrap();
    assert!(token.as_str().starts_with("data:application/octet-stream;base64,"));

    let resolved = resolver(&fetcher)
        .resolve(&Value::from(token))
        .await
        .unwrap();
    assert_eq!(resolved, Value::Bytes(Bytes::from("body of https://blob.test/raw")));
}

#[tokio::test]
async fn test_encode_url_fetched_propagates_failure() {
    let err = encode_url_fetched("https://x.test/missing", &MockFetcher::default(), &FetchOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FetchFailed);
}

#[tokio::test]
async fn test_fetch_url() {
    let fetcher = MockFetcher::default();
    let options = FetchOptions::new().with_header("x-trace", "1");

    let body = fetch_url(encode_url("https://a.test/doc").as_str(), &fetcher, &options)
        .await
        .unwrap();
    assert_eq!(body, Bytes::from("body of https://a.test/doc"));
    assert_eq!(
        fetcher.seen_headers.lock().unwrap()[0],
        vec![("x-trace".to_string(), "1".to_string())]
    );

    let err = fetch_url(encode_text("x").as_str(), &fetcher, &options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PayloadMismatch);

    let err = fetch_url(encode_url("https://a.test/missing").as_str(), &fetcher, &options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FetchFailed);
    assert_eq!(fetcher.calls(), 2);
}
