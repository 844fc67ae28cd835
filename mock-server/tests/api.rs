use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_path_and_headers() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo/a?b=c")
                .header("X-Token", "abc")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.path, "/echo/a");
    assert_eq!(echo.query.as_deref(), Some("b=c"));
    assert_eq!(echo.headers["x-token"], "abc");
}

#[tokio::test]
async fn echo_without_query() {
    let resp = app().oneshot(get("/echo")).await.unwrap();
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert!(echo.query.is_none());
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app().oneshot(get("/status/404")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["x-status"], "404");
    assert_eq!(body_bytes(resp).await, "status 404");
}

#[tokio::test]
async fn status_rejects_invalid_code() {
    let resp = app().oneshot(get("/status/42")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- bytes ---

#[tokio::test]
async fn bytes_returns_exact_length() {
    let resp = app().oneshot(get("/bytes/10")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await.len(), 10);
}

#[tokio::test]
async fn bytes_refuses_oversized_bodies() {
    let uri = format!("/bytes/{}", mock_server::MAX_BYTES + 1);
    let resp = app().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// --- headers ---

#[tokio::test]
async fn headers_reflects_query_params() {
    let resp = app().oneshot(get("/headers?x-a=1&x-b=two")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-a"], "1");
    assert_eq!(resp.headers()["x-b"], "two");
    assert_eq!(body_bytes(resp).await, "ok");
}

// --- gzip ---

#[tokio::test]
async fn gzip_serves_compressed_body() {
    use std::io::Read;

    let resp = app().oneshot(get("/gzip")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-encoding"], "gzip");

    let compressed = body_bytes(resp).await;
    assert_ne!(&compressed[..], mock_server::GZIP_BODY.as_bytes());
    let mut plain = String::new();
    flate2::read::GzDecoder::new(&compressed[..])
        .read_to_string(&mut plain)
        .unwrap();
    assert_eq!(plain, mock_server::GZIP_BODY);
}
