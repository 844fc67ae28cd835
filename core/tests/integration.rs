//! End-to-end exchanges against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port inside the test's runtime, then
//! drives real handles over the default reqwest transport. Validates that
//! option dispatch, callbacks and result shaping hold up on the wire.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use cocurl_core::transport::ERR_CONNECT;
use cocurl_core::{curl, ExecOutcome, OptionKey, OptionValue, RequestHandle};
use mock_server::Echo;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn start_server() -> SocketAddr {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await });
    addr
}

fn handle_for(url: &str) -> RequestHandle {
    let mut handle = curl::init();
    curl::setopt(&mut handle, OptionKey::Url, url).unwrap();
    handle
}

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn collect_headers(handle: &mut RequestHandle) -> Arc<Mutex<Vec<String>>> {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    handle
        .set_option(
            OptionKey::HeaderFunction,
            OptionValue::header_fn(move |_, line| sink.lock().unwrap().push(line.to_string())),
        )
        .unwrap();
    lines
}

#[tokio::test]
async fn get_returns_body() {
    let addr = start_server().await;
    let mut handle = handle_for(&format!("http://{addr}/bytes/10"));

    let outcome = curl::exec(&mut handle).await.unwrap();
    let body = outcome.body().expect("body");
    assert_eq!(body.len(), 10);
    assert!(body.iter().all(|b| *b == b'x'));
    assert_eq!(curl::errno(&handle), 0);
}

#[tokio::test]
async fn encoding_option_decodes_gzip_body() {
    let addr = start_server().await;
    let mut handle = handle_for(&format!("http://{addr}/gzip"));
    curl::setopt(&mut handle, OptionKey::Encoding, "").unwrap();

    let outcome = curl::exec(&mut handle).await.unwrap();
    assert_eq!(&outcome.body().unwrap()[..], mock_server::GZIP_BODY.as_bytes());
    assert_eq!(curl::errno(&handle), 0);
}

#[tokio::test]
async fn post_sends_method_and_headers() {
    let addr = start_server().await;
    let mut handle = handle_for(&format!("http://{addr}/echo/a?b=c#frag"));
    let ok = curl::setopt_array(
        &mut handle,
        vec![
            (OptionKey::Post, OptionValue::from(true)),
            (OptionKey::Encoding, OptionValue::from("")),
            (
                OptionKey::HttpHeader,
                OptionValue::from(vec!["X-Token: abc".to_string(), "X-Empty: ".to_string()]),
            ),
        ],
    );
    assert!(ok);

    let outcome = curl::exec(&mut handle).await.unwrap();
    let echo: Echo = serde_json::from_slice(outcome.body().unwrap()).unwrap();
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.path, "/echo/a");
    assert_eq!(echo.query.as_deref(), Some("b=c"));
    assert_eq!(echo.headers["x-token"], "abc");
    assert_eq!(echo.headers["accept-encoding"], "gzip");
    assert!(!echo.headers.contains_key("x-empty"));
}

#[tokio::test]
async fn header_callback_sees_status_line_and_terminator() {
    let addr = start_server().await;
    let mut handle = handle_for(&format!("http://{addr}/headers?x-a=1"));
    let lines = collect_headers(&mut handle);

    curl::exec(&mut handle).await.unwrap();
    let lines = lines.lock().unwrap();
    assert_eq!(lines.first().map(String::as_str), Some("HTTP/1.1 200 OK\r\n"));
    assert_eq!(lines.last().map(String::as_str), Some(""));
    assert!(lines.iter().any(|l| l == "x-a: 1\r\n"));
}

#[tokio::test]
async fn non_200_has_no_status_line() {
    let addr = start_server().await;
    let mut handle = handle_for(&format!("http://{addr}/status/404"));
    let lines = collect_headers(&mut handle);

    let outcome = curl::exec(&mut handle).await.unwrap();
    assert_eq!(&outcome.body().unwrap()[..], b"status 404");
    let lines = lines.lock().unwrap();
    assert!(lines.iter().all(|l| !l.starts_with("HTTP/1.1")));
    assert!(lines.iter().any(|l| l == "x-status: 404\r\n"));
    assert_eq!(lines.last().map(String::as_str), Some(""));
}

#[tokio::test]
async fn body_written_to_sink() {
    let addr = start_server().await;
    let mut handle = handle_for(&format!("http://{addr}/bytes/10"));
    let sink = SharedSink::default();
    let notified = Arc::new(Mutex::new(None));
    let record = notified.clone();
    handle.set_option(OptionKey::ReturnTransfer, false.into()).unwrap();
    handle
        .set_option(OptionKey::File, OptionValue::sink(sink.clone()))
        .unwrap();
    handle
        .set_option(
            OptionKey::ReadFunction,
            OptionValue::read_fn(move |_, _, len| *record.lock().unwrap() = Some(len)),
        )
        .unwrap();

    let outcome = curl::exec(&mut handle).await.unwrap();
    assert_eq!(outcome, ExecOutcome::Written { complete: true });
    assert_eq!(sink.0.lock().unwrap().as_slice(), b"xxxxxxxxxx");
    assert_eq!(*notified.lock().unwrap(), Some(10));
}

#[tokio::test]
async fn refused_connection_reports_error() {
    init_tracing();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut handle = handle_for(&format!("http://{addr}/"));
    let outcome = curl::exec(&mut handle).await.unwrap();
    assert_eq!(outcome, ExecOutcome::Failed);
    assert_eq!(curl::errno(&handle), ERR_CONNECT);
    assert!(!curl::error(&handle).is_empty());
}

#[tokio::test]
async fn reset_then_execute_repeats_request() {
    let addr = start_server().await;
    let mut handle = handle_for(&format!("http://{addr}/echo"));
    curl::setopt(&mut handle, OptionKey::Post, 1i64).unwrap();
    curl::setopt(&mut handle, OptionKey::HttpHeader, vec!["X-Run: 1".to_string()]).unwrap();

    let first: Echo =
        serde_json::from_slice(curl::exec(&mut handle).await.unwrap().body().unwrap()).unwrap();
    curl::reset(&mut handle);
    assert!(handle.connection().unwrap().body().is_empty());
    let second: Echo =
        serde_json::from_slice(curl::exec(&mut handle).await.unwrap().body().unwrap()).unwrap();

    assert_eq!(first.method, second.method);
    assert_eq!(first.headers["x-run"], second.headers["x-run"]);
    curl::close(handle);
}
