#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use crl_revocation::pki::MemoryCertificateStore;
use crl_revocation::telemetry;
use crl_revocation::pki::crl::{CrlFetcher, DefaultCrlFetcher, FetchError, PrefixRedirectResolver};
use url::Url;

/// Prefix the fixture certificates use for their distribution points.
pub const FIXTURE_HOST: &str = "http://JUNIT";

pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

pub fn crl_bytes(name: &str) -> Vec<u8> {
    std::fs::read(data_dir().join("crl").join(name)).expect("fixture should exist")
}

pub fn fixture_store() -> MemoryCertificateStore {
    MemoryCertificateStore::load_dir(data_dir().join("certs")).expect("fixtures should load")
}

/// Serves the `http://JUNIT/...` distribution points from `tests/data/crl`.
pub fn local_resolver() -> PrefixRedirectResolver {
    let crl_dir = Url::from_directory_path(data_dir().join("crl")).expect("absolute path");
    PrefixRedirectResolver::default().redirect(
        format!("{FIXTURE_HOST}/"),
        crl_dir.to_string(),
    )
}

pub fn default_fetcher() -> DefaultCrlFetcher {
    DefaultCrlFetcher::new(Duration::from_secs(5), Duration::from_secs(2))
        .expect("failed to build fetcher")
}

/// Wraps a fetcher and records every URI it is asked for.
pub struct CountingFetcher<F> {
    inner: F,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl<F: CrlFetcher> CountingFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self::with_delay(inner, Duration::ZERO)
    }

    /// Every fetch sleeps for `delay` first, widening race windows.
    pub fn with_delay(inner: F, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_for(&self, uri: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == uri).count()
    }
}

impl<F: CrlFetcher> CrlFetcher for CountingFetcher<F> {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(uri.to_string());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.fetch(uri)
    }
}

/// How long the `/slow.crl` route stalls before answering.
pub const SLOW_RESPONSE: Duration = Duration::from_secs(5);

/// Serve the fixture CRLs over plain HTTP on an ephemeral port.
///
/// The server runs on its own runtime thread so blocking fetchers can be
/// exercised from ordinary `#[test]` functions. Returns the base URL.
pub fn spawn_crl_server() -> String {
    telemetry::init_tracing();

    let certs = crl_bytes("certs.crl");
    let pem = crl_bytes("certs.pem");

    let app = Router::new()
        .route("/certs.crl", get(move || async move { certs }))
        .route("/certs.pem", get(move || async move { pem }))
        .route("/error.crl", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/gone.crl", get(|| async { StatusCode::GONE }))
        .route(
            "/slow.crl",
            get(|| async {
                tokio::time::sleep(SLOW_RESPONSE).await;
                Vec::<u8>::new()
            }),
        );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build runtime");
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local address");

    std::thread::spawn(move || {
        runtime.block_on(async move { axum::serve(listener, app).await.unwrap() });
    });

    format!("http://{addr}")
}

/// Serve `body` once per connection with chunked transfer encoding, so the
/// client never sees a `Content-Length`. Returns the base URL.
pub fn spawn_chunked_server(body: Vec<u8>) -> String {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let addr = listener.local_addr().expect("no local address");

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };

            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut line = String::new();
            while reader.read_line(&mut line).is_ok_and(|n| n > 0) && line != "\r\n" {
                line.clear();
            }

            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
            );
            for chunk in body.chunks(64) {
                let _ = stream.write_all(format!("{:x}\r\n", chunk.len()).as_bytes());
                let _ = stream.write_all(chunk);
                let _ = stream.write_all(b"\r\n");
            }
            let _ = stream.write_all(b"0\r\n\r\n");
        }
    });

    format!("http://{addr}")
}
