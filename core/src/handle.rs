//! The request handle: option dispatch and the execution protocol.
//!
//! # Design
//! A `RequestHandle` accumulates configuration through `set_option` and
//! drives one exchange per `execute` on its `Connection`. The connection is
//! created by the `Url` option and replaced every time the URL changes, so
//! connection-level options (`SslVerifyPeer`, `ConnectTimeout`) only stick
//! when applied after the URL.
//!
//! Errors travel on two channels. Configuration mistakes return
//! `Err(CurlError)`. Transport failures return `Ok(ExecOutcome::Failed)` and
//! leave the cause in `error_code` / `error_message`.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::callbacks::{HeaderCallback, ProgressCallback, ReadCallback, WriteCallback};
use crate::connection::{Connection, ConnectionSettings};
use crate::error::CurlError;
use crate::options::{OptionKey, OptionValue, PROTO_HTTP, PROTO_HTTPS};
use crate::target::TargetUrl;
use crate::transport::Transport;

const STATUS_LINE_200: &str = "HTTP/1.1 200 OK\r\n";

/// What `execute` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The exchange failed at the transport level. See `error_code`.
    Failed,
    /// `ReturnTransfer` was on: the response body.
    Body(Bytes),
    /// `ReturnTransfer` was off: the body went to the output sink (or
    /// stdout). `complete` is false when the sink took fewer bytes than the
    /// body holds.
    Written { complete: bool },
}

impl ExecOutcome {
    /// The legacy truthiness: a body, or a complete write.
    pub fn is_success(&self) -> bool {
        match self {
            ExecOutcome::Failed => false,
            ExecOutcome::Body(_) => true,
            ExecOutcome::Written { complete } => *complete,
        }
    }

    pub fn body(&self) -> Option<&Bytes> {
        match self {
            ExecOutcome::Body(body) => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LastError {
    code: i32,
    message: String,
}

/// One logical request: its configuration, callbacks and connection.
pub struct RequestHandle {
    id: Uuid,
    transport: Arc<dyn Transport>,
    target: Option<TargetUrl>,
    method: String,
    headers: HashMap<String, String>,
    return_transfer: bool,
    output: Option<Box<dyn Write + Send>>,
    header_fn: Option<Box<dyn HeaderCallback>>,
    read_fn: Option<Box<dyn ReadCallback>>,
    write_fn: Option<Box<dyn WriteCallback>>,
    progress_fn: Option<Box<dyn ProgressCallback>>,
    connection: Option<Connection>,
    last_error: LastError,
}

#[cfg(feature = "reqwest-transport")]
impl Default for RequestHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestHandle {
    /// A handle backed by [`crate::transport::ReqwestTransport`].
    #[cfg(feature = "reqwest-transport")]
    pub fn new() -> Self {
        Self::with_transport(Arc::new(crate::transport::ReqwestTransport::new()))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transport,
            target: None,
            method: "GET".to_string(),
            headers: HashMap::new(),
            return_transfer: true,
            output: None,
            header_fn: None,
            read_fn: None,
            write_fn: None,
            progress_fn: None,
            connection: None,
            last_error: LastError::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> Option<&TargetUrl> {
        self.target.as_ref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn return_transfer(&self) -> bool {
        self.return_transfer
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    /// Point the handle at `url`, replacing the connection.
    ///
    /// Settings forwarded to the previous connection are lost.
    pub fn create(&mut self, url: &str) -> Result<(), CurlError> {
        let target = TargetUrl::parse(url)?;
        let endpoint = target.endpoint();
        if let Some(old) = &self.connection {
            if *old.settings() != ConnectionSettings::default() {
                debug!(handle = %self.id, "replacing connection; forwarded settings discarded");
            }
        }
        debug!(
            handle = %self.id,
            host = %endpoint.host,
            port = endpoint.port,
            secure = endpoint.secure,
            "connection created"
        );
        self.connection = Some(Connection::new(endpoint, Arc::clone(&self.transport)));
        self.target = Some(target);
        Ok(())
    }

    /// Apply one option.
    pub fn set_option(&mut self, key: OptionKey, value: OptionValue) -> Result<(), CurlError> {
        trace!(handle = %self.id, %key, ?value, "set option");
        match key {
            OptionKey::Url => {
                let url = value.into_string(key)?;
                self.create(&url)?;
            }
            OptionKey::ReturnTransfer => self.return_transfer = value.into_bool(key)?,
            OptionKey::Encoding => {
                let mut encoding = value.into_string(key)?;
                if encoding.is_empty() {
                    encoding = "gzip".to_string();
                }
                self.headers.insert("Accept-Encoding".to_string(), encoding);
            }
            OptionKey::Post => self.method = "POST".to_string(),
            OptionKey::HttpHeader => {
                for line in value.into_list(key)? {
                    if let Some((name, value)) = parse_header_line(&line) {
                        self.headers.insert(name, value);
                    }
                }
            }
            OptionKey::CustomRequest => {
                debug!(handle = %self.id, ?value, "custom request method ignored");
            }
            OptionKey::Protocols => {
                let mask = value.into_long(key)?;
                if mask > PROTO_HTTP | PROTO_HTTPS {
                    return Err(CurlError::UnsupportedOption {
                        key,
                        value: Some(mask.to_string()),
                    });
                }
            }
            OptionKey::HttpVersion | OptionKey::SslVerifyHost | OptionKey::Header => {}
            OptionKey::SslVerifyPeer => {
                let verify = value.into_bool(key)?;
                self.connection_mut()?.set(ConnectionSettings {
                    ssl_verify_peer: Some(verify),
                    ..ConnectionSettings::default()
                });
            }
            OptionKey::ConnectTimeout => {
                let timeout = value.into_duration(key)?;
                self.connection_mut()?.set(ConnectionSettings {
                    connect_timeout: Some(timeout),
                    ..ConnectionSettings::default()
                });
            }
            OptionKey::File => self.output = Some(value.into_sink(key)?),
            OptionKey::HeaderFunction => self.header_fn = Some(value.into_header_fn(key)?),
            OptionKey::ReadFunction => self.read_fn = Some(value.into_read_fn(key)?),
            OptionKey::WriteFunction => self.write_fn = Some(value.into_write_fn(key)?),
            OptionKey::ProgressFunction => self.progress_fn = Some(value.into_progress_fn(key)?),
            OptionKey::Unknown(_) => return Err(CurlError::unsupported(key)),
        }
        Ok(())
    }

    /// Apply options in order, stopping at the first failure. Options applied
    /// before the failure keep their effect.
    pub fn set_options<I>(&mut self, options: I) -> Result<(), CurlError>
    where
        I: IntoIterator<Item = (OptionKey, OptionValue)>,
    {
        for (key, value) in options {
            self.set_option(key, value)?;
        }
        Ok(())
    }

    /// Merge a settings bag into the current connection.
    pub fn set_connection_settings(&mut self, settings: ConnectionSettings) -> Result<(), CurlError> {
        self.connection_mut()?.set(settings);
        Ok(())
    }

    /// Run one request/response cycle.
    ///
    /// Suspends the calling task until the full response is buffered.
    /// Fails only when there is no connection; transport errors come back as
    /// `ExecOutcome::Failed`.
    #[instrument(skip(self), fields(handle = %self.id, path = tracing::field::Empty))]
    pub async fn execute(&mut self) -> Result<ExecOutcome, CurlError> {
        let connection = self.connection.as_mut().ok_or(CurlError::NoConnection)?;
        let path = self
            .target
            .as_ref()
            .ok_or(CurlError::NoConnection)?
            .request_path();
        tracing::Span::current().record("path", path.as_str());

        connection.set_method(&self.method);
        if !self.headers.is_empty() {
            connection.set_headers(&self.headers);
        }

        if !connection.execute(&path).await {
            self.last_error = LastError {
                code: connection.err_code(),
                message: connection.err_msg().to_string(),
            };
            return Ok(ExecOutcome::Failed);
        }

        let status = connection.status_code();
        let response_headers = connection.headers().to_vec();
        let body = connection.body().clone();
        self.last_error = LastError::default();

        self.emit_headers(status, &response_headers);
        if !body.is_empty() {
            self.notify_body(body.len());
        }
        Ok(self.deliver(body))
    }

    pub fn error_code(&self) -> i32 {
        self.last_error.code
    }

    pub fn error_message(&self) -> &str {
        &self.last_error.message
    }

    /// Drop the buffered response body, keeping all configuration.
    pub fn reset(&mut self) {
        if let Some(connection) = self.connection.as_mut() {
            connection.clear_body();
        }
    }

    /// Release the connection. Later executions fail with `NoConnection`;
    /// the last error stays readable.
    pub fn close(&mut self) {
        if self.connection.take().is_some() {
            debug!(handle = %self.id, "connection closed");
        }
    }

    fn connection_mut(&mut self) -> Result<&mut Connection, CurlError> {
        self.connection.as_mut().ok_or(CurlError::NoConnection)
    }

    fn emit_headers(&mut self, status: u16, headers: &[(String, String)]) {
        if headers.is_empty() {
            return;
        }
        let Some(mut cb) = self.header_fn.take() else {
            return;
        };
        if status == 200 {
            cb.on_header(self, STATUS_LINE_200);
        }
        for (name, value) in headers {
            cb.on_header(self, &format!("{name}: {value}\r\n"));
        }
        cb.on_header(self, "");
        self.header_fn = Some(cb);
    }

    fn notify_body(&mut self, len: usize) {
        let Some(mut cb) = self.read_fn.take() else {
            return;
        };
        let mut sink = self.output.take();
        cb.on_body(
            self,
            sink.as_deref_mut().map(|w| w as &mut (dyn Write + Send)),
            len,
        );
        self.output = sink;
        self.read_fn = Some(cb);
    }

    fn deliver(&mut self, body: Bytes) -> ExecOutcome {
        if self.return_transfer {
            return ExecOutcome::Body(body);
        }
        match self.output.as_mut() {
            Some(sink) => {
                let written = write_fully(sink.as_mut(), &body);
                ExecOutcome::Written {
                    complete: written == body.len(),
                }
            }
            None => {
                let mut stdout = io::stdout().lock();
                if let Err(e) = stdout.write_all(&body).and_then(|()| stdout.flush()) {
                    warn!(handle = %self.id, error = %e, "writing body to stdout failed");
                }
                ExecOutcome::Written { complete: true }
            }
        }
    }
}

/// Write as much of `buf` as the sink accepts, returning the byte count.
fn write_fully(sink: &mut (dyn Write + Send), buf: &[u8]) -> usize {
    let mut written = 0;
    while written < buf.len() {
        match sink.write(&buf[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, written, "output sink write failed");
                break;
            }
        }
    }
    if let Err(e) = sink.flush() {
        warn!(error = %e, "output sink flush failed");
    }
    written
}

/// Split a raw `"Name: value"` header line on its first colon.
///
/// Returns `None` when there is no colon or the trimmed value is empty.
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("return_transfer", &self.return_transfer)
            .field("output", &self.output.is_some())
            .field("header_fn", &self.header_fn.is_some())
            .field("read_fn", &self.read_fn.is_some())
            .field("write_fn", &self.write_fn.is_some())
            .field("progress_fn", &self.progress_fn.is_some())
            .field("connected", &self.connection.is_some())
            .field("last_error", &self.last_error)
            .finish()
    }
}
