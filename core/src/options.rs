//! Option keys and loosely typed option values.
//!
//! # Design
//! `OptionKey` is a closed enum over the options the adapter understands,
//! plus `Unknown` carrying any other numeric key so legacy integer keys can
//! still be routed (and rejected) explicitly. Numeric codes follow libcurl's
//! `CURLOPT_*` constants.
//!
//! `OptionValue` mirrors the loose typing of the legacy API: integers stand
//! in for booleans, seconds for durations. Each `into_*` accessor performs
//! the coercion the option needs or fails with `InvalidOptionValue`.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use crate::callbacks::{HeaderCallback, ProgressCallback, ReadCallback, WriteCallback};
use crate::error::CurlError;

/// Protocol bit for plain HTTP in the `Protocols` bitmask.
pub const PROTO_HTTP: i64 = 1;
/// Protocol bit for HTTPS in the `Protocols` bitmask.
pub const PROTO_HTTPS: i64 = 2;

/// An option recognised by `RequestHandle::set_option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    Url,
    ReturnTransfer,
    Encoding,
    Post,
    HttpHeader,
    CustomRequest,
    Protocols,
    HttpVersion,
    SslVerifyHost,
    SslVerifyPeer,
    ConnectTimeout,
    File,
    Header,
    HeaderFunction,
    ReadFunction,
    WriteFunction,
    ProgressFunction,
    /// Any key outside the modelled set. Always rejected.
    Unknown(u32),
}

impl OptionKey {
    pub fn code(self) -> u32 {
        match self {
            OptionKey::Url => 10002,
            OptionKey::ReturnTransfer => 19913,
            OptionKey::Encoding => 10102,
            OptionKey::Post => 47,
            OptionKey::HttpHeader => 10023,
            OptionKey::CustomRequest => 10036,
            OptionKey::Protocols => 181,
            OptionKey::HttpVersion => 84,
            OptionKey::SslVerifyHost => 81,
            OptionKey::SslVerifyPeer => 64,
            OptionKey::ConnectTimeout => 78,
            OptionKey::File => 10001,
            OptionKey::Header => 42,
            OptionKey::HeaderFunction => 20079,
            OptionKey::ReadFunction => 20012,
            OptionKey::WriteFunction => 20011,
            OptionKey::ProgressFunction => 20056,
            OptionKey::Unknown(code) => code,
        }
    }
}

impl From<u32> for OptionKey {
    fn from(code: u32) -> Self {
        match code {
            10002 => OptionKey::Url,
            19913 => OptionKey::ReturnTransfer,
            10102 => OptionKey::Encoding,
            47 => OptionKey::Post,
            10023 => OptionKey::HttpHeader,
            10036 => OptionKey::CustomRequest,
            181 => OptionKey::Protocols,
            84 => OptionKey::HttpVersion,
            81 => OptionKey::SslVerifyHost,
            64 => OptionKey::SslVerifyPeer,
            78 => OptionKey::ConnectTimeout,
            10001 => OptionKey::File,
            42 => OptionKey::Header,
            20079 => OptionKey::HeaderFunction,
            20012 => OptionKey::ReadFunction,
            20011 => OptionKey::WriteFunction,
            20056 => OptionKey::ProgressFunction,
            other => OptionKey::Unknown(other),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A value passed to `RequestHandle::set_option`.
pub enum OptionValue {
    Bool(bool),
    Long(i64),
    Str(String),
    List(Vec<String>),
    Duration(Duration),
    Sink(Box<dyn Write + Send>),
    HeaderFn(Box<dyn HeaderCallback>),
    ReadFn(Box<dyn ReadCallback>),
    WriteFn(Box<dyn WriteCallback>),
    ProgressFn(Box<dyn ProgressCallback>),
}

impl OptionValue {
    /// Short rendering for error messages. Sinks and callbacks have none.
    pub(crate) fn describe(&self) -> Option<String> {
        match self {
            OptionValue::Bool(b) => Some(b.to_string()),
            OptionValue::Long(n) => Some(n.to_string()),
            OptionValue::Str(s) => Some(s.clone()),
            OptionValue::List(items) => Some(format!("{items:?}")),
            OptionValue::Duration(d) => Some(format!("{d:?}")),
            _ => None,
        }
    }

    pub(crate) fn into_bool(self, key: OptionKey) -> Result<bool, CurlError> {
        match self {
            OptionValue::Bool(b) => Ok(b),
            OptionValue::Long(n) => Ok(n != 0),
            OptionValue::Str(s) => Ok(!s.is_empty() && s != "0"),
            _ => Err(invalid(key, "a boolean")),
        }
    }

    pub(crate) fn into_long(self, key: OptionKey) -> Result<i64, CurlError> {
        match self {
            OptionValue::Long(n) => Ok(n),
            OptionValue::Bool(b) => Ok(i64::from(b)),
            OptionValue::Str(s) => s.trim().parse().map_err(|_| invalid(key, "an integer")),
            _ => Err(invalid(key, "an integer")),
        }
    }

    pub(crate) fn into_string(self, key: OptionKey) -> Result<String, CurlError> {
        match self {
            OptionValue::Str(s) => Ok(s),
            OptionValue::Long(n) => Ok(n.to_string()),
            // The legacy API stringifies `false` to "".
            OptionValue::Bool(b) => Ok(if b { "1".to_string() } else { String::new() }),
            _ => Err(invalid(key, "a string")),
        }
    }

    pub(crate) fn into_list(self, key: OptionKey) -> Result<Vec<String>, CurlError> {
        match self {
            OptionValue::List(items) => Ok(items),
            _ => Err(invalid(key, "a list of strings")),
        }
    }

    /// Integers are read as whole seconds.
    pub(crate) fn into_duration(self, key: OptionKey) -> Result<Duration, CurlError> {
        match self {
            OptionValue::Duration(d) => Ok(d),
            OptionValue::Long(n) if n >= 0 => Ok(Duration::from_secs(n as u64)),
            _ => Err(invalid(key, "a non-negative duration")),
        }
    }

    pub(crate) fn into_sink(self, key: OptionKey) -> Result<Box<dyn Write + Send>, CurlError> {
        match self {
            OptionValue::Sink(sink) => Ok(sink),
            _ => Err(invalid(key, "a writable sink")),
        }
    }

    pub(crate) fn into_header_fn(self, key: OptionKey) -> Result<Box<dyn HeaderCallback>, CurlError> {
        match self {
            OptionValue::HeaderFn(cb) => Ok(cb),
            _ => Err(invalid(key, "a header callback")),
        }
    }

    pub(crate) fn into_read_fn(self, key: OptionKey) -> Result<Box<dyn ReadCallback>, CurlError> {
        match self {
            OptionValue::ReadFn(cb) => Ok(cb),
            _ => Err(invalid(key, "a read callback")),
        }
    }

    pub(crate) fn into_write_fn(self, key: OptionKey) -> Result<Box<dyn WriteCallback>, CurlError> {
        match self {
            OptionValue::WriteFn(cb) => Ok(cb),
            _ => Err(invalid(key, "a write callback")),
        }
    }

    pub(crate) fn into_progress_fn(
        self,
        key: OptionKey,
    ) -> Result<Box<dyn ProgressCallback>, CurlError> {
        match self {
            OptionValue::ProgressFn(cb) => Ok(cb),
            _ => Err(invalid(key, "a progress callback")),
        }
    }

    /// Wrap a closure as a header callback value.
    pub fn header_fn<F>(f: F) -> Self
    where
        F: FnMut(&crate::RequestHandle, &str) + Send + 'static,
    {
        OptionValue::HeaderFn(Box::new(f))
    }

    /// Wrap a closure as a read (body-size notification) callback value.
    pub fn read_fn<F>(f: F) -> Self
    where
        F: FnMut(&crate::RequestHandle, Option<&mut (dyn Write + Send)>, usize) + Send + 'static,
    {
        OptionValue::ReadFn(Box::new(f))
    }

    pub fn write_fn<F>(f: F) -> Self
    where
        F: FnMut(&crate::RequestHandle, &[u8]) -> usize + Send + 'static,
    {
        OptionValue::WriteFn(Box::new(f))
    }

    pub fn progress_fn<F>(f: F) -> Self
    where
        F: FnMut(&crate::RequestHandle, u64, u64, u64, u64) -> bool + Send + 'static,
    {
        OptionValue::ProgressFn(Box::new(f))
    }

    pub fn sink<W: Write + Send + 'static>(writer: W) -> Self {
        OptionValue::Sink(Box::new(writer))
    }
}

fn invalid(key: OptionKey, expected: &'static str) -> CurlError {
    CurlError::InvalidOptionValue { key, expected }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Sink(_) => f.write_str("Sink(..)"),
            OptionValue::HeaderFn(_) => f.write_str("HeaderFn(..)"),
            OptionValue::ReadFn(_) => f.write_str("ReadFn(..)"),
            OptionValue::WriteFn(_) => f.write_str("WriteFn(..)"),
            OptionValue::ProgressFn(_) => f.write_str("ProgressFn(..)"),
            other => match other.describe() {
                Some(text) => f.write_str(&text),
                None => f.write_str(".."),
            },
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        OptionValue::Long(n)
    }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> Self {
        OptionValue::Long(i64::from(n))
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Str(s)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(items: Vec<String>) -> Self {
        OptionValue::List(items)
    }
}

impl From<&[&str]> for OptionValue {
    fn from(items: &[&str]) -> Self {
        OptionValue::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Duration> for OptionValue {
    fn from(d: Duration) -> Self {
        OptionValue::Duration(d)
    }
}
