//! Engine behaviour against an in-process transport.

use futures::future::BoxFuture;
use slimnet::http::streamfactory::full_body;
use slimnet::{
    HopRequest, HopResponse, NetError, RequestOptions, TransferEngine, Transport, TransportCode,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Serves `/start -> /mid -> /end` and counts exchanges.
#[derive(Default)]
struct RedirectingTransport {
    exchanges: AtomicUsize,
    seen: Mutex<Vec<HopRequest>>,
}

impl Transport for RedirectingTransport {
    fn exchange(
        &self,
        request: HopRequest,
        _options: Arc<RequestOptions>,
    ) -> BoxFuture<'static, Result<HopResponse, NetError>> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let path = request.url.path().to_string();
        self.seen.lock().unwrap().push(request);
        Box::pin(async move {
            let builder = http::Response::builder();
            let response = match path.as_str() {
                "/start" => builder
                    .status(301)
                    .header("location", "/mid")
                    .header("x-hop", "start")
                    .body(full_body("")),
                "/mid" => builder
                    .status(301)
                    .header("location", "http://example.com/end")
                    .header("x-hop", "mid")
                    .body(full_body("")),
                _ => builder
                    .status(200)
                    .header("x-final", "yes")
                    .body(full_body("done")),
            };
            Ok(response.unwrap())
        })
    }
}

fn engine(transport: Arc<RedirectingTransport>, jar: &Path) -> TransferEngine {
    TransferEngine::builder()
        .transport(transport)
        .cookie_jar(jar)
        .build()
        .unwrap()
}

#[test]
fn test_post_with_missing_file_never_touches_network() {
    let dir = tempdir().unwrap();
    let transport = Arc::new(RedirectingTransport::default());
    let mut engine = engine(transport.clone(), &dir.path().join("jar.txt"));

    let missing = dir.path().join("does-not-exist.bin");
    let err = engine
        .post("http://example.com/upload", &[("k", "v")], &[("f", missing.as_path())], &[])
        .unwrap_err();

    match err {
        NetError::MissingFile(path) => assert_eq!(path, missing),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(transport.exchanges.load(Ordering::SeqCst), 0);
}

#[test]
fn test_get_follows_redirect_chain() {
    let dir = tempdir().unwrap();
    let transport = Arc::new(RedirectingTransport::default());
    let mut engine = engine(transport.clone(), &dir.path().join("jar.txt"));

    let resp = engine.get("http://example.com/start", &[], &[]).unwrap();

    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.text(), "done");
    assert_eq!(resp.headers().matches("HTTP/").count(), 3);

    let map = resp.headers_map();
    assert_eq!(map.at("x-final").unwrap(), "yes");
    assert!(map.get("x-hop").is_none());
    assert!(map.get("location").is_none());

    let paths: Vec<String> = transport
        .seen
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(paths, ["/start", "/mid", "/end"]);
}

#[test]
fn test_redirect_not_followed_when_disabled() {
    let dir = tempdir().unwrap();
    let transport = Arc::new(RedirectingTransport::default());
    let mut engine = engine(transport.clone(), &dir.path().join("jar.txt"));
    engine.set_allow_redirects(false);

    let resp = engine.get("http://example.com/start", &[], &[]).unwrap();
    assert_eq!(resp.status_code(), 301);
    assert_eq!(resp.headers_map().at("location").unwrap(), "/mid");
    assert_eq!(transport.exchanges.load(Ordering::SeqCst), 1);
}

#[test]
fn test_caller_headers_reach_the_wire_and_are_dropped_after() {
    let dir = tempdir().unwrap();
    let transport = Arc::new(RedirectingTransport::default());
    let mut engine = engine(transport.clone(), &dir.path().join("jar.txt"));

    engine
        .get("http://example.com/end", &[], &[("X-Trace", "abc")])
        .unwrap();
    engine.get("http://example.com/end", &[], &[]).unwrap();

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen[0].headers.get("x-trace").unwrap(), "abc");
    assert!(seen[1].headers.get("x-trace").is_none());
}

#[test]
fn test_bad_header_pair_is_rejected() {
    let dir = tempdir().unwrap();
    let transport = Arc::new(RedirectingTransport::default());
    let mut engine = engine(transport.clone(), &dir.path().join("jar.txt"));

    let err = engine
        .get("http://example.com/end", &[], &[("Bad Name", "v")])
        .unwrap_err();
    assert!(err.code().is_some());
    assert_eq!(transport.exchanges.load(Ordering::SeqCst), 0);
}

/// Transport whose exchange dies mid-transfer.
struct CrashingTransport;

impl Transport for CrashingTransport {
    fn exchange(
        &self,
        _request: HopRequest,
        _options: Arc<RequestOptions>,
    ) -> BoxFuture<'static, Result<HopResponse, NetError>> {
        Box::pin(futures::future::lazy(|_| -> Result<HopResponse, NetError> {
            panic!("transport crashed")
        }))
    }
}

#[test]
fn test_lost_transfer_post_returns_partial_get_fails() {
    let dir = tempdir().unwrap();
    let mut engine = TransferEngine::builder()
        .transport(Arc::new(CrashingTransport))
        .cookie_jar(dir.path().join("jar.txt"))
        .build()
        .unwrap();

    // POST stops quietly on a group error and hands back what it has.
    let resp = engine
        .post_raw("http://example.com/submit", "a=1", &[])
        .unwrap();
    assert_eq!(resp.status_code(), 0);
    assert!(resp.headers().is_empty());
    assert!(resp.body().is_empty());

    // GET propagates the same failure.
    let err = engine.get("http://example.com/", &[], &[]).unwrap_err();
    assert_eq!(err.code(), Some(TransportCode::BadTransferGroup));
}
