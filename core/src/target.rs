//! Target URL decomposition.
//!
//! # Design
//! Parsing is delegated to the `url` crate; this module only keeps the
//! components the adapter needs and applies the legacy port and path rules.
//! Empty query and fragment components are treated as absent.

use url::Url;

use crate::error::CurlError;
use crate::transport::Endpoint;

/// A decomposed absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl TargetUrl {
    /// Decompose `raw`. The port is the explicit one when given, otherwise
    /// 443 for `https` and 80 for every other scheme.
    pub fn parse(raw: &str) -> Result<Self, CurlError> {
        let url = Url::parse(raw).map_err(|e| CurlError::MalformedUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => {
                return Err(CurlError::MalformedUrl {
                    url: raw.to_string(),
                    reason: "missing host".to_string(),
                })
            }
        };
        let scheme = url.scheme().to_string();
        let port = explicit_port(raw)
            .or_else(|| url.port())
            .unwrap_or(if scheme == "https" { 443 } else { 80 });

        Ok(Self {
            scheme,
            host,
            port,
            path: url.path().to_string(),
            query: url.query().filter(|q| !q.is_empty()).map(str::to_string),
            fragment: url.fragment().filter(|f| !f.is_empty()).map(str::to_string),
        })
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
            secure: self.is_secure(),
        }
    }

    /// The path sent on the request line.
    ///
    /// The fragment is only appended when a query is also present. This
    /// matches the legacy handle and is kept for compatibility.
    pub fn request_path(&self) -> String {
        let mut out = if self.path.is_empty() {
            "/".to_string()
        } else {
            self.path.clone()
        };
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
            if let Some(fragment) = &self.fragment {
                out.push('#');
                out.push_str(fragment);
            }
        }
        out
    }
}

/// The port written in `raw`. `Url::port` reports a port equal to the
/// scheme's well-known default as absent, so the authority is read again.
fn explicit_port(raw: &str) -> Option<u16> {
    raw.parse::<http::Uri>().ok()?.port_u16()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_defaults_to_443() {
        let t = TargetUrl::parse("https://example.com/a").unwrap();
        assert_eq!(t.host, "example.com");
        assert_eq!(t.port, 443);
        assert!(t.is_secure());
    }

    #[test]
    fn http_defaults_to_80() {
        let t = TargetUrl::parse("http://example.com").unwrap();
        assert_eq!(t.port, 80);
        assert!(!t.is_secure());
    }

    #[test]
    fn explicit_port_wins() {
        let t = TargetUrl::parse("https://example.com:8443/").unwrap();
        assert_eq!(t.port, 8443);
        let t = TargetUrl::parse("http://example.com:443/").unwrap();
        assert_eq!(t.port, 443);
        assert!(!t.is_secure());
    }

    #[test]
    fn explicit_default_port_of_other_scheme_is_kept() {
        let t = TargetUrl::parse("wss://example.com:443/a").unwrap();
        assert_eq!(t.port, 443);
        assert!(!t.is_secure());
        let t = TargetUrl::parse("ftp://example.com:21/a").unwrap();
        assert_eq!(t.port, 21);
        let t = TargetUrl::parse("http://example.com:80/a?b=c#top").unwrap();
        assert_eq!(t.port, 80);
    }

    #[test]
    fn non_http_scheme_falls_back_to_80() {
        let t = TargetUrl::parse("ftp://files.example.com/pub").unwrap();
        assert_eq!(t.port, 80);
        assert!(!t.is_secure());
    }

    #[test]
    fn missing_host_is_malformed() {
        let err = TargetUrl::parse("mailto:someone@example.com").unwrap_err();
        assert!(matches!(err, CurlError::MalformedUrl { .. }));
    }

    #[test]
    fn relative_url_is_malformed() {
        let err = TargetUrl::parse("/just/a/path").unwrap_err();
        assert!(matches!(err, CurlError::MalformedUrl { .. }));
    }

    #[test]
    fn request_path_with_query() {
        let t = TargetUrl::parse("http://example.com/a?b=c").unwrap();
        assert_eq!(t.request_path(), "/a?b=c");
    }

    #[test]
    fn fragment_dropped_without_query() {
        let t = TargetUrl::parse("http://example.com/a#frag").unwrap();
        assert_eq!(t.fragment.as_deref(), Some("frag"));
        assert_eq!(t.request_path(), "/a");
    }

    #[test]
    fn fragment_kept_with_query() {
        let t = TargetUrl::parse("http://example.com/a?b=c#frag").unwrap();
        assert_eq!(t.request_path(), "/a?b=c#frag");
    }

    #[test]
    fn empty_query_is_absent() {
        let t = TargetUrl::parse("http://example.com/a?").unwrap();
        assert!(t.query.is_none());
        assert_eq!(t.request_path(), "/a");
    }

    #[test]
    fn endpoint_carries_host_port_secure() {
        let e = TargetUrl::parse("https://api.example.com:9000/x").unwrap().endpoint();
        assert_eq!(e.host, "api.example.com");
        assert_eq!(e.port, 9000);
        assert!(e.secure);
    }
}
