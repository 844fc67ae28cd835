//! Free-function façade in the shape of the legacy easy-handle API.
//!
//! Each function delegates to the matching `RequestHandle` method. There is
//! no process-wide state; every handle stands alone.

use std::sync::Arc;

use crate::error::CurlError;
use crate::handle::{ExecOutcome, RequestHandle};
use crate::options::{OptionKey, OptionValue};
use crate::transport::Transport;

/// A fresh handle on the default transport.
#[cfg(feature = "reqwest-transport")]
pub fn init() -> RequestHandle {
    RequestHandle::new()
}

pub fn init_with_transport(transport: Arc<dyn Transport>) -> RequestHandle {
    RequestHandle::with_transport(transport)
}

/// Set one option. Accepts legacy numeric keys (`u32`) as well as
/// `OptionKey` values.
pub fn setopt(
    handle: &mut RequestHandle,
    key: impl Into<OptionKey>,
    value: impl Into<OptionValue>,
) -> Result<(), CurlError> {
    handle.set_option(key.into(), value.into())
}

/// Set options in order. Returns `false` at the first rejected option;
/// options applied before it are not rolled back.
pub fn setopt_array<K, I>(handle: &mut RequestHandle, options: I) -> bool
where
    K: Into<OptionKey>,
    I: IntoIterator<Item = (K, OptionValue)>,
{
    match handle.set_options(options.into_iter().map(|(k, v)| (k.into(), v))) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(handle = %handle.id(), error = %e, "option batch stopped");
            false
        }
    }
}

pub async fn exec(handle: &mut RequestHandle) -> Result<ExecOutcome, CurlError> {
    handle.execute().await
}

/// Close and drop the handle.
pub fn close(mut handle: RequestHandle) {
    handle.close();
}

pub fn reset(handle: &mut RequestHandle) {
    handle.reset();
}

pub fn error(handle: &RequestHandle) -> String {
    handle.error_message().to_string()
}

pub fn errno(handle: &RequestHandle) -> i32 {
    handle.error_code()
}
