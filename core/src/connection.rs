//! The async client a handle drives.
//!
//! # Design
//! A `Connection` is bound to one endpoint for its whole life. Method,
//! headers and the settings bag are configured on it before each exchange;
//! after `execute` it buffers the status, headers and body, or the error
//! code and message when the exchange failed. A failed exchange clears the
//! response state so nothing stale is mistaken for a result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::transport::{Endpoint, Transport, TransportRequest};

/// Connection-level settings.
///
/// Every field is optional; applying a bag with `Connection::set` only
/// overrides the keys it carries. `connect_timeout` is expressed in
/// (fractional) seconds on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default, with = "seconds", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_verify_peer: Option<bool>,
}

impl ConnectionSettings {
    pub fn merge(&mut self, other: ConnectionSettings) {
        if other.connect_timeout.is_some() {
            self.connect_timeout = other.connect_timeout;
        }
        if other.ssl_verify_peer.is_some() {
            self.ssl_verify_peer = other.ssl_verify_peer;
        }
    }
}

mod seconds {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        match Option::<f64>::deserialize(d)? {
            Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
            Some(secs) => Err(D::Error::custom(format!(
                "connect_timeout must be a non-negative number of seconds, got {secs}"
            ))),
            None => Ok(None),
        }
    }
}

/// An async HTTP client bound to `{host, port, secure}`.
pub struct Connection {
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
    method: String,
    headers: Vec<(String, String)>,
    settings: ConnectionSettings,
    status_code: u16,
    response_headers: Vec<(String, String)>,
    body: Bytes,
    err_code: i32,
    err_msg: String,
}

impl Connection {
    pub fn new(endpoint: Endpoint, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
            method: "GET".to_string(),
            headers: Vec::new(),
            settings: ConnectionSettings::default(),
            status_code: 0,
            response_headers: Vec::new(),
            body: Bytes::new(),
            err_code: 0,
            err_msg: String::new(),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn set_method(&mut self, method: &str) {
        self.method = method.to_string();
    }

    pub fn set_headers(&mut self, headers: &HashMap<String, String>) {
        self.headers = headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
    }

    /// Merge a settings bag into the current settings.
    pub fn set(&mut self, settings: ConnectionSettings) {
        self.settings.merge(settings);
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Run one exchange against `path`. Returns `false` on transport failure,
    /// leaving the cause in `err_code` / `err_msg`.
    pub async fn execute(&mut self, path: &str) -> bool {
        let request = TransportRequest {
            endpoint: self.endpoint.clone(),
            method: self.method.clone(),
            path: path.to_string(),
            headers: self.headers.clone(),
            settings: self.settings.clone(),
        };

        match self.transport.round_trip(request).await {
            Ok(response) => {
                debug!(
                    status = response.status,
                    body_len = response.body.len(),
                    "exchange completed"
                );
                self.status_code = response.status;
                self.response_headers = collapse_headers(response.headers);
                self.body = response.body;
                self.err_code = 0;
                self.err_msg.clear();
                true
            }
            Err(err) => {
                warn!(code = err.code, message = %err.message, "exchange failed");
                self.status_code = 0;
                self.response_headers.clear();
                self.body = Bytes::new();
                self.err_code = err.code;
                self.err_msg = err.message;
                false
            }
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.response_headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn clear_body(&mut self) {
        self.body = Bytes::new();
    }

    pub fn err_code(&self) -> i32 {
        self.err_code
    }

    pub fn err_msg(&self) -> &str {
        &self.err_msg
    }
}

/// Fold repeated header names into one entry. The last value wins and the
/// entry keeps the position of the first occurrence.
fn collapse_headers(raw: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(raw.len());
    for (name, value) in raw {
        match out.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => out.push((name, value)),
        }
    }
    out
}
