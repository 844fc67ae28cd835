//! C-ABI wrapper around `cocurl-core`.
//!
//! # Overview
//! Exposes the curl-style handle through `extern "C"` functions so any
//! language with a C FFI can configure and execute requests without linking
//! to an async runtime directly.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Each handle owns a current-thread tokio runtime; `cocurl_exec` blocks on
//!   it for the duration of one exchange.
//! - Options are set through typed entry points (`_long`, `_str`, `_list`,
//!   `_file`, callbacks) that all funnel into `RequestHandle::set_option`
//!   with libcurl's numeric keys.
//! - The C caller owns every returned pointer and must release it with the
//!   matching `cocurl_free_*` function.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use cocurl_core::{ConnectionSettings, ExecOutcome, OptionKey, OptionValue, RequestHandle};

use types::*;

/// Borrow a C string as UTF-8. Invalid UTF-8 is replaced lossily.
fn c_str(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Apply an option and translate the outcome into an `FfiStatus`.
fn apply(handle: *mut FfiCurlHandle, key: u32, value: OptionValue) -> FfiStatus {
    let handle = unsafe { &mut *handle };
    match handle.inner.set_option(OptionKey::from(key), value) {
        Ok(()) => FfiStatus::Ok,
        Err(e) => {
            tracing::debug!(error = %e, "cocurl setopt rejected");
            FfiStatus::from(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// Handle lifecycle
// ---------------------------------------------------------------------------

/// Create a new handle with no URL.
///
/// Returns null if the runtime cannot be built or an internal panic occurs.
/// The caller must release the handle with `cocurl_close`.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_init() -> *mut FfiCurlHandle {
    catch_unwind(|| {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!(error = %e, "cocurl runtime build failed");
                return std::ptr::null_mut();
            }
        };
        Box::into_raw(Box::new(FfiCurlHandle {
            inner: RequestHandle::new(),
            runtime,
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a new handle and set its URL.
///
/// Returns null if `url` is null or malformed.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_init_url(url: *const c_char) -> *mut FfiCurlHandle {
    if url.is_null() {
        return std::ptr::null_mut();
    }
    let handle = cocurl_init();
    if handle.is_null() {
        return handle;
    }
    if cocurl_setopt_str(handle, OptionKey::Url.code(), url) != FfiStatus::Ok {
        cocurl_close(handle);
        return std::ptr::null_mut();
    }
    handle
}

/// Close and free a handle. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_close(handle: *mut FfiCurlHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let mut handle = unsafe { Box::from_raw(handle) };
            handle.inner.close();
        }));
    }
}

/// Drop the buffered response body, keeping the configuration.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_reset(handle: *mut FfiCurlHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            unsafe { &mut *handle }.inner.reset();
        }));
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Set an integer or boolean option (`Post`, `ReturnTransfer`, `Protocols`,
/// `ConnectTimeout` in seconds, ...).
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_setopt_long(handle: *mut FfiCurlHandle, key: u32, value: i64) -> FfiStatus {
    if handle.is_null() {
        return FfiStatus::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| apply(handle, key, OptionValue::Long(value))))
        .unwrap_or(FfiStatus::Panic)
}

/// Set a string option (`Url`, `Encoding`, `CustomRequest`).
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_setopt_str(
    handle: *mut FfiCurlHandle,
    key: u32,
    value: *const c_char,
) -> FfiStatus {
    if handle.is_null() || value.is_null() {
        return FfiStatus::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| apply(handle, key, OptionValue::Str(c_str(value)))))
        .unwrap_or(FfiStatus::Panic)
}

/// Set a string-list option (`HttpHeader`). `items` points to `len` C
/// strings; null entries are skipped.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_setopt_list(
    handle: *mut FfiCurlHandle,
    key: u32,
    items: *const *const c_char,
    len: usize,
) -> FfiStatus {
    if handle.is_null() || (items.is_null() && len > 0) {
        return FfiStatus::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let list = if len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(items, len) }
                .iter()
                .filter(|p| !p.is_null())
                .map(|p| c_str(*p))
                .collect()
        };
        apply(handle, key, OptionValue::List(list))
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Write response bodies to the file at `path` (created or truncated) when
/// return-transfer is off.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_setopt_file(handle: *mut FfiCurlHandle, path: *const c_char) -> FfiStatus {
    if handle.is_null() || path.is_null() {
        return FfiStatus::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let path = c_str(path);
        match std::fs::File::create(&path) {
            Ok(file) => apply(handle, OptionKey::File.code(), OptionValue::sink(file)),
            Err(e) => {
                tracing::warn!(%path, error = %e, "cocurl output file open failed");
                FfiStatus::Io
            }
        }
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Register a header-line callback. `user_data` is passed back verbatim.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_setopt_header_function(
    handle: *mut FfiCurlHandle,
    callback: Option<FfiHeaderFn>,
    user_data: *mut c_void,
) -> FfiStatus {
    let Some(f) = callback else {
        return FfiStatus::NullArg;
    };
    if handle.is_null() {
        return FfiStatus::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let cb = CHeaderCallback { f, user_data };
        apply(handle, OptionKey::HeaderFunction.code(), OptionValue::HeaderFn(Box::new(cb)))
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Register a body-length notification callback.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_setopt_read_function(
    handle: *mut FfiCurlHandle,
    callback: Option<FfiReadFn>,
    user_data: *mut c_void,
) -> FfiStatus {
    let Some(f) = callback else {
        return FfiStatus::NullArg;
    };
    if handle.is_null() {
        return FfiStatus::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let cb = CReadCallback { f, user_data };
        apply(handle, OptionKey::ReadFunction.code(), OptionValue::ReadFn(Box::new(cb)))
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Merge a JSON settings bag, e.g. `{"connect_timeout": 1.5,
/// "ssl_verify_peer": false}`, into the current connection.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_set_connection_settings(
    handle: *mut FfiCurlHandle,
    json: *const c_char,
) -> FfiStatus {
    if handle.is_null() || json.is_null() {
        return FfiStatus::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let settings: ConnectionSettings = match serde_json::from_str(&c_str(json)) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(error = %e, "cocurl settings rejected");
                return FfiStatus::InvalidSettings;
            }
        };
        let handle = unsafe { &mut *handle };
        match handle.inner.set_connection_settings(settings) {
            Ok(()) => FfiStatus::Ok,
            Err(e) => FfiStatus::from(&e),
        }
    }))
    .unwrap_or(FfiStatus::Panic)
}

// ---------------------------------------------------------------------------
// Execution and diagnostics
// ---------------------------------------------------------------------------

/// Run one request/response cycle, blocking the calling thread.
///
/// The caller must free the returned pointer with `cocurl_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_exec(handle: *mut FfiCurlHandle) -> *mut FfiExecResult {
    if handle.is_null() {
        return FfiExecResult::null_arg("handle");
    }
    catch_unwind(AssertUnwindSafe(|| {
        let FfiCurlHandle { inner, runtime } = unsafe { &mut *handle };
        let outcome = runtime.block_on(inner.execute());
        let http_status = inner.connection().map_or(0, |c| c.status_code());
        match outcome {
            Ok(ExecOutcome::Body(body)) => FfiExecResult::ok(http_status, Some(&body)),
            Ok(ExecOutcome::Written { complete: true }) => FfiExecResult::ok(http_status, None),
            Ok(ExecOutcome::Written { complete: false }) => FfiExecResult::error(
                FfiStatus::IncompleteWrite,
                http_status,
                "output sink accepted fewer bytes than the body holds",
            ),
            Ok(ExecOutcome::Failed) => {
                FfiExecResult::error(FfiStatus::TransportFailed, 0, inner.error_message())
            }
            Err(e) => FfiExecResult::error(FfiStatus::from(&e), 0, &e.to_string()),
        }
    }))
    .unwrap_or_else(|_| {
        tracing::error!("panic in cocurl_exec");
        FfiExecResult::panic("panic in cocurl_exec")
    })
}

/// Last transport error code; 0 after a successful exchange, -1 for a null
/// handle.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_errno(handle: *const FfiCurlHandle) -> i32 {
    if handle.is_null() {
        return -1;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*handle }.inner.error_code())).unwrap_or(-1)
}

/// Last transport error message. Returns null for a null handle.
/// The caller must free the string with `cocurl_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_error(handle: *const FfiCurlHandle) -> *mut c_char {
    if handle.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        let msg = unsafe { &*handle }.inner.error_message();
        CString::new(msg).unwrap_or_default().into_raw()
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiExecResult` returned by `cocurl_exec`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_free_result(result: *mut FfiExecResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.body.is_null() {
            let slice = std::ptr::slice_from_raw_parts_mut(result.body, result.body_len);
            drop(unsafe { Box::from_raw(slice) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn cocurl_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
