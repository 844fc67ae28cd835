//! Typed callback slots.
//!
//! One trait per callback role, each implemented for closures of the
//! matching shape so callers can register plain closures.

use std::io::Write;

use crate::handle::RequestHandle;

/// Receives response header lines after a successful execution.
///
/// Called once per header as `"Name: value\r\n"` (preceded by a synthetic
/// `"HTTP/1.1 200 OK\r\n"` when the status is exactly 200), then once with
/// an empty string to mark the end of the headers.
pub trait HeaderCallback: Send {
    fn on_header(&mut self, handle: &RequestHandle, line: &str);
}

impl<F> HeaderCallback for F
where
    F: FnMut(&RequestHandle, &str) + Send,
{
    fn on_header(&mut self, handle: &RequestHandle, line: &str) {
        self(handle, line)
    }
}

/// Notified once with the output sink and body length when a non-empty body
/// arrives. Despite the slot name it never supplies request data.
pub trait ReadCallback: Send {
    fn on_body(&mut self, handle: &RequestHandle, sink: Option<&mut (dyn Write + Send)>, len: usize);
}

impl<F> ReadCallback for F
where
    F: FnMut(&RequestHandle, Option<&mut (dyn Write + Send)>, usize) + Send,
{
    fn on_body(&mut self, handle: &RequestHandle, sink: Option<&mut (dyn Write + Send)>, len: usize) {
        self(handle, sink, len)
    }
}

/// Received-data callback. Stored on the handle but not invoked; bodies are
/// delivered through the return value or the output sink.
pub trait WriteCallback: Send {
    fn on_write(&mut self, handle: &RequestHandle, chunk: &[u8]) -> usize;
}

impl<F> WriteCallback for F
where
    F: FnMut(&RequestHandle, &[u8]) -> usize + Send,
{
    fn on_write(&mut self, handle: &RequestHandle, chunk: &[u8]) -> usize {
        self(handle, chunk)
    }
}

/// Progress callback: `(download_total, download_now, upload_total,
/// upload_now)`, returning `false` to abort. Stored but not invoked.
pub trait ProgressCallback: Send {
    fn on_progress(
        &mut self,
        handle: &RequestHandle,
        dl_total: u64,
        dl_now: u64,
        ul_total: u64,
        ul_now: u64,
    ) -> bool;
}

impl<F> ProgressCallback for F
where
    F: FnMut(&RequestHandle, u64, u64, u64, u64) -> bool + Send,
{
    fn on_progress(
        &mut self,
        handle: &RequestHandle,
        dl_total: u64,
        dl_now: u64,
        ul_total: u64,
        ul_now: u64,
    ) -> bool {
        self(handle, dl_total, dl_now, ul_total, ul_now)
    }
}
