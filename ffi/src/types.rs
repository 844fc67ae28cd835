//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! The handle is opaque to C. Results come back in a single
//! `FfiExecResult` envelope whose body is a length-prefixed byte buffer
//! (bodies may contain NUL bytes). C callbacks are wrapped in small structs
//! implementing the core callback traits so the core never sees raw
//! function pointers.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use cocurl_core::{CurlError, HeaderCallback, ReadCallback, RequestHandle};

/// Opaque handle to a `RequestHandle` plus the runtime that drives it.
///
/// `cocurl_exec` blocks the calling thread on `runtime`, which gives C
/// callers the blocking shape they expect.
pub struct FfiCurlHandle {
    pub(crate) inner: RequestHandle,
    pub(crate) runtime: tokio::runtime::Runtime,
}

/// Status codes returned by every fallible FFI function.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    Ok = 0,
    UnsupportedOption = 1,
    InvalidValue = 2,
    MalformedUrl = 3,
    NoConnection = 4,
    TransportFailed = 5,
    IncompleteWrite = 6,
    InvalidSettings = 7,
    Io = 8,
    NullArg = 9,
    Panic = 10,
}

impl From<&CurlError> for FfiStatus {
    fn from(err: &CurlError) -> Self {
        match err {
            CurlError::UnsupportedOption { .. } => FfiStatus::UnsupportedOption,
            CurlError::InvalidOptionValue { .. } => FfiStatus::InvalidValue,
            CurlError::MalformedUrl { .. } => FfiStatus::MalformedUrl,
            CurlError::NoConnection => FfiStatus::NoConnection,
        }
    }
}

/// Header line callback: `(user_data, line, line_len)`. `line` is a
/// NUL-terminated string valid only for the duration of the call; the
/// end-of-headers call passes an empty string.
pub type FfiHeaderFn = extern "C" fn(user_data: *mut c_void, line: *const c_char, len: usize);

/// Body notification callback: `(user_data, body_len)`.
pub type FfiReadFn = extern "C" fn(user_data: *mut c_void, body_len: usize);

pub(crate) struct CHeaderCallback {
    pub(crate) f: FfiHeaderFn,
    pub(crate) user_data: *mut c_void,
}

// SAFETY: the callback only runs on the thread that calls `cocurl_exec`; the
// C caller owns `user_data` and guarantees it outlives the handle.
unsafe impl Send for CHeaderCallback {}

impl HeaderCallback for CHeaderCallback {
    fn on_header(&mut self, _handle: &RequestHandle, line: &str) {
        let c_line = c_header_line(line);
        (self.f)(self.user_data, c_line.as_ptr(), c_line.as_bytes().len());
    }
}

/// A header line as a C string. A line with an interior NUL is cut at the
/// NUL so `len` always matches what C can read.
fn c_header_line(line: &str) -> CString {
    let end = line.find('\0').unwrap_or(line.len());
    CString::new(&line[..end]).unwrap_or_default()
}

pub(crate) struct CReadCallback {
    pub(crate) f: FfiReadFn,
    pub(crate) user_data: *mut c_void,
}

// SAFETY: see `CHeaderCallback`.
unsafe impl Send for CReadCallback {}

impl ReadCallback for CReadCallback {
    fn on_body(
        &mut self,
        _handle: &RequestHandle,
        _sink: Option<&mut (dyn std::io::Write + Send)>,
        len: usize,
    ) {
        (self.f)(self.user_data, len);
    }
}

/// Result envelope for `cocurl_exec`.
///
/// On success `status` is `Ok`, `error_message` is null and `body` holds the
/// response body when return-transfer is on (null otherwise). On failure
/// `status` names the category and `error_message` is a C string.
/// `http_status` is the response status when one was received, else 0.
#[repr(C)]
pub struct FfiExecResult {
    pub status: FfiStatus,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub body: *mut u8,
    pub body_len: usize,
}

impl FfiExecResult {
    pub(crate) fn ok(http_status: u16, body: Option<&[u8]>) -> *mut Self {
        let (ptr, len) = match body {
            Some(bytes) => {
                let boxed: Box<[u8]> = bytes.into();
                let len = boxed.len();
                (Box::into_raw(boxed) as *mut u8, len)
            }
            None => (std::ptr::null_mut(), 0),
        };
        Box::into_raw(Box::new(FfiExecResult {
            status: FfiStatus::Ok,
            error_message: std::ptr::null_mut(),
            http_status,
            body: ptr,
            body_len: len,
        }))
    }

    pub(crate) fn error(status: FfiStatus, http_status: u16, message: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiExecResult {
            status,
            error_message: CString::new(message).unwrap_or_default().into_raw(),
            http_status,
            body: std::ptr::null_mut(),
            body_len: 0,
        }))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiStatus::NullArg, 0, &format!("null argument: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiStatus::Panic, 0, msg)
    }
}
