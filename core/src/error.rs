//! Configuration-time errors for request handles.
//!
//! # Design
//! Only programmer errors surface here: an option the adapter does not model,
//! a value that cannot be coerced to what the option needs, a URL with no
//! host, or an operation that needs a connection before one exists.
//! Transport failures never become a `CurlError`; they are reported through
//! `ExecOutcome::Failed` and the handle's `error_code` / `error_message`.

use crate::options::OptionKey;

/// Errors returned while configuring or driving a `RequestHandle`.
#[derive(Debug, thiserror::Error)]
pub enum CurlError {
    /// The option key is not modelled, or the supplied value asks for
    /// behaviour the adapter refuses (e.g. a non-HTTP protocol).
    #[error("option[{key}{}] not supported", value.as_deref().map(|v| format!("={v}")).unwrap_or_default())]
    UnsupportedOption {
        key: OptionKey,
        value: Option<String>,
    },

    /// The option is modelled but the value has the wrong shape.
    #[error("option[{key}] expects {expected}")]
    InvalidOptionValue { key: OptionKey, expected: &'static str },

    /// The URL could not be decomposed into scheme, host and port.
    #[error("malformed url {url:?}: {reason}")]
    MalformedUrl { url: String, reason: String },

    /// No URL has been set yet, or the handle was closed.
    #[error("handle has no connection; set a url first")]
    NoConnection,
}

impl CurlError {
    pub(crate) fn unsupported(key: OptionKey) -> Self {
        CurlError::UnsupportedOption { key, value: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_names_key_and_value() {
        let err = CurlError::UnsupportedOption {
            key: OptionKey::Protocols,
            value: Some("4".to_string()),
        };
        assert_eq!(err.to_string(), "option[181=4] not supported");
    }

    #[test]
    fn unsupported_message_without_value() {
        let err = CurlError::unsupported(OptionKey::Unknown(99));
        assert_eq!(err.to_string(), "option[99] not supported");
    }
}
