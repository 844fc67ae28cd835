//! Blocking-style curl handle API on top of an async HTTP client.
//!
//! # Overview
//! A `RequestHandle` is configured with curl-like options (URL, headers,
//! encoding, output sink, callbacks) and executed with `execute().await`,
//! which suspends only the calling task while one request/response cycle
//! runs. The response is fanned out through the legacy shapes: header
//! callback, body-size notification, direct return or sink write.
//!
//! # Design
//! - Options are a closed `OptionKey` enum with an explicit `Unknown` branch;
//!   values are a loosely typed `OptionValue` coerced per option.
//! - The network round trip sits behind the `Transport` trait. The default
//!   `ReqwestTransport` is behind the `reqwest-transport` feature.
//! - Configuration mistakes are `Err(CurlError)`; transport failures are
//!   `ExecOutcome::Failed` plus `error_code` / `error_message`.
//! - `curl` holds a free-function façade mirroring the legacy call shapes.

pub mod callbacks;
pub mod connection;
pub mod curl;
pub mod error;
pub mod handle;
pub mod options;
pub mod target;
pub mod transport;

pub use callbacks::{HeaderCallback, ProgressCallback, ReadCallback, WriteCallback};
pub use connection::{Connection, ConnectionSettings};
pub use error::CurlError;
pub use handle::{parse_header_line, ExecOutcome, RequestHandle};
pub use options::{OptionKey, OptionValue, PROTO_HTTP, PROTO_HTTPS};
pub use target::TargetUrl;
#[cfg(feature = "reqwest-transport")]
pub use transport::ReqwestTransport;
pub use transport::{Endpoint, Transport, TransportError, TransportRequest, TransportResponse};
