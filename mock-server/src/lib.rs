use std::collections::BTreeMap;
use std::io::Write;

use axum::{
    extract::{Path, Query},
    http::{header::CONTENT_ENCODING, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use flate2::{write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Largest body `/bytes/{n}` will produce.
pub const MAX_BYTES: usize = 1 << 20;

/// Body served by `/gzip`, before compression.
pub const GZIP_BODY: &str = "hello gzip";

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", get(status))
        .route("/bytes/{n}", get(bytes))
        .route("/headers", get(headers))
        .route("/gzip", get(gzip))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, [(&'static str, String); 1], String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, [("x-status", code.to_string())], format!("status {code}")))
}

async fn bytes(Path(n): Path<usize>) -> Result<Vec<u8>, StatusCode> {
    if n > MAX_BYTES {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }
    Ok(vec![b'x'; n])
}

/// Reflect query parameters back as response headers.
async fn headers(Query(params): Query<BTreeMap<String, String>>) -> (HeaderMap, &'static str) {
    let mut out = HeaderMap::new();
    for (name, value) in params {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            out.insert(name, value);
        }
    }
    (out, "ok")
}

/// `GZIP_BODY` compressed, whatever the request asked for.
async fn gzip() -> Result<([(HeaderName, &'static str); 1], Vec<u8>), StatusCode> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(GZIP_BODY.as_bytes())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let body = encoder.finish().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(([(CONTENT_ENCODING, "gzip")], body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_serializes_to_json() {
        let echo = Echo {
            method: "GET".to_string(),
            path: "/echo".to_string(),
            query: None,
            headers: BTreeMap::from([("x-a".to_string(), "1".to_string())]),
        };
        let json = serde_json::to_value(&echo).unwrap();
        assert_eq!(json["method"], "GET");
        assert_eq!(json["path"], "/echo");
        assert!(json["query"].is_null());
        assert_eq!(json["headers"]["x-a"], "1");
    }

    #[test]
    fn echo_roundtrips_through_json() {
        let echo = Echo {
            method: "POST".to_string(),
            path: "/echo/a".to_string(),
            query: Some("b=c".to_string()),
            headers: BTreeMap::new(),
        };
        let json = serde_json::to_string(&echo).unwrap();
        let back: Echo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, echo);
    }
}
