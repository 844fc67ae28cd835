//! HTTP round-trip capability used by `Connection`.
//!
//! # Design
//! The adapter never speaks HTTP itself. A `Transport` performs exactly one
//! request/response exchange and reports failure as a `TransportError`
//! carrying an errno-style code, which the connection exposes as
//! `err_code` / `err_msg`. The trait is object safe (`async-trait`) so a
//! handle can swap in a scripted transport for tests.
//!
//! `ReqwestTransport` is the default backend. It disables redirects to match
//! the legacy client, which never followed `Location` on its own, and hands
//! back bodies already decoded per `Content-Encoding` (gzip, brotli, deflate).

use async_trait::async_trait;
use bytes::Bytes;

use crate::connection::ConnectionSettings;

/// Timed out while connecting or waiting for the response.
pub const ERR_TIMEOUT: i32 = 110;
/// The peer could not be reached (refused, unresolvable, TLS handshake).
pub const ERR_CONNECT: i32 = 111;
/// Any other failure while exchanging the request.
pub const ERR_PROTOCOL: i32 = 71;

/// Where a connection points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl Endpoint {
    /// `scheme://host:port` without a trailing slash.
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

/// One request as handed to a `Transport`.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub endpoint: Endpoint,
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub settings: ConnectionSettings,
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// A failed exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct TransportError {
    pub code: i32,
    pub message: String,
}

impl TransportError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Performs one HTTP request/response exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(feature = "reqwest-transport")]
pub use reqwest_backend::ReqwestTransport;

#[cfg(feature = "reqwest-transport")]
mod reqwest_backend {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, PoisonError};

    use super::*;

    /// A [`Transport`] backed by [`reqwest`].
    ///
    /// One client is kept per distinct `ConnectionSettings` value so
    /// keep-alive connections survive across exchanges while the settings
    /// in force still apply.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        clients: Arc<Mutex<HashMap<ConnectionSettings, reqwest::Client>>>,
    }

    impl ReqwestTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn client(&self, settings: &ConnectionSettings) -> Result<reqwest::Client, TransportError> {
            let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(client) = clients.get(settings) {
                return Ok(client.clone());
            }
            let client = build_client(settings)?;
            tracing::debug!(?settings, "reqwest client built");
            clients.insert(settings.clone(), client.clone());
            Ok(client)
        }

        #[cfg(test)]
        fn cached_clients(&self) -> usize {
            self.clients.lock().unwrap_or_else(PoisonError::into_inner).len()
        }
    }

    fn build_client(settings: &ConnectionSettings) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if settings.ssl_verify_peer == Some(false) {
            builder = builder.danger_accept_invalid_certs(true);
        }
        builder.build().map_err(map_reqwest_error)
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn round_trip(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            let client = self.client(&request.settings)?;
            let method = reqwest::Method::from_bytes(request.method.as_bytes())
                .map_err(|e| TransportError::new(ERR_PROTOCOL, e.to_string()))?;
            let url = format!("{}{}", request.endpoint.base_url(), request.path);

            let mut builder = client.request(method, &url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response.bytes().await.map_err(map_reqwest_error)?;

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        }
    }

    /// Map a reqwest error onto an errno-style [`TransportError`].
    fn map_reqwest_error(err: reqwest::Error) -> TransportError {
        let code = if err.is_timeout() {
            ERR_TIMEOUT
        } else if err.is_connect() {
            ERR_CONNECT
        } else {
            ERR_PROTOCOL
        };
        TransportError::new(code, err.to_string())
    }

    #[cfg(test)]
    mod tests {
        use std::time::Duration;

        use super::*;

        #[test]
        fn clients_are_reused_per_settings() {
            let transport = ReqwestTransport::new();
            let default = ConnectionSettings::default();
            let short = ConnectionSettings {
                connect_timeout: Some(Duration::from_millis(250)),
                ..ConnectionSettings::default()
            };

            transport.client(&default).unwrap();
            transport.client(&default).unwrap();
            assert_eq!(transport.cached_clients(), 1);

            transport.client(&short).unwrap();
            assert_eq!(transport.cached_clients(), 2);

            let shared = transport.clone();
            shared.client(&short).unwrap();
            assert_eq!(transport.cached_clients(), 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_uses_scheme_for_secure() {
        let e = Endpoint {
            host: "example.com".to_string(),
            port: 8443,
            secure: true,
        };
        assert_eq!(e.base_url(), "https://example.com:8443");
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::new(ERR_CONNECT, "connection refused");
        assert_eq!(err.to_string(), "[111] connection refused");
    }
}
