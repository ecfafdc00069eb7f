//! Trust checks for URLs the client did not build itself.
//!
//! Two independent checks:
//!
//! - [`TrustPolicy::validate_next_url`] guards pagination links and any other
//!   absolute request target. The bearer token is attached to whatever URL is
//!   fetched next, so an off-host link would leak it.
//! - [`TrustPolicy::validate_analytics_download_url`] guards report download
//!   links. These are fetched without the token and may live on a CDN, so the
//!   concern is the origin of the content rather than credential leakage.

use thiserror::Error;
use url::Url;

use crate::error::sanitize_for_display;
use crate::rest::endpoints::API_HOST;

/// Maximum number of characters of a rejected URL kept in an error.
const MAX_URL_CHARS: usize = 120;

const HTTPS_PORT: u16 = 443;

/// First-party hosts trusted for analytics downloads (exact or subdomain match).
pub const ANALYTICS_TRUSTED_HOSTS: &[&str] = &["apple.com", "mzstatic.com"];

/// CDN hosts allowed for analytics downloads when the URL is signed
/// (exact or subdomain match).
pub const ANALYTICS_CDN_HOSTS: &[&str] =
    &["cloudfront.net", "amazonaws.com", "storage.googleapis.com"];

/// Query parameters that mark a CDN URL as signed by its origin.
pub const SIGNED_URL_PARAMS: &[&str] = &["X-Amz-Signature", "Signature", "X-Goog-Signature"];

/// A URL refused by the trust policy.
///
/// The offending URL is stored sanitized and truncated so it can be printed
/// safely.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// The URL could not be parsed
    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl {
        /// Sanitized URL
        url: String,
        /// Parse failure
        reason: String,
    },

    /// The URL does not use HTTPS
    #[error("refusing non-HTTPS URL \"{url}\"")]
    InsecureScheme {
        /// Sanitized URL
        url: String,
    },

    /// The URL has no host
    #[error("refusing URL without a host \"{url}\"")]
    MissingHost {
        /// Sanitized URL
        url: String,
    },

    /// The host is not on the relevant allow-list
    #[error("refusing URL \"{url}\": host \"{host}\" is not trusted")]
    UntrustedHost {
        /// Sanitized URL
        url: String,
        /// Sanitized host
        host: String,
    },

    /// A CDN URL without a recognized signature parameter
    #[error("refusing unsigned CDN URL \"{url}\"")]
    UnsignedCdnUrl {
        /// Sanitized URL
        url: String,
    },
}

/// Allow-lists consulted before dereferencing URLs.
#[derive(Debug, Clone)]
pub struct TrustPolicy {
    api_host: String,
    api_port: u16,
    first_party_hosts: Vec<String>,
    cdn_hosts: Vec<String>,
    signed_params: Vec<String>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self::new(API_HOST)
    }
}

impl TrustPolicy {
    /// A policy for the given API host with the built-in analytics tables.
    pub fn new(api_host: impl Into<String>) -> Self {
        Self {
            api_host: api_host.into().to_ascii_lowercase(),
            api_port: HTTPS_PORT,
            first_party_hosts: to_owned(ANALYTICS_TRUSTED_HOSTS),
            cdn_hosts: to_owned(ANALYTICS_CDN_HOSTS),
            signed_params: to_owned(SIGNED_URL_PARAMS),
        }
    }

    /// A policy whose API host is the host of `base_url`.
    pub fn for_base_url(base_url: &Url) -> Self {
        Self::new(base_url.host_str().unwrap_or(API_HOST))
            .with_api_port(base_url.port_or_known_default().unwrap_or(HTTPS_PORT))
    }

    /// Set the port pagination links must point at.
    pub fn with_api_port(mut self, port: u16) -> Self {
        self.api_port = port;
        self
    }

    /// Replace the first-party analytics host table.
    pub fn with_first_party_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.first_party_hosts = hosts.into_iter().map(|h| h.into().to_ascii_lowercase()).collect();
        self
    }

    /// Replace the CDN host table.
    pub fn with_cdn_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cdn_hosts = hosts.into_iter().map(|h| h.into().to_ascii_lowercase()).collect();
        self
    }

    /// The host pagination links must point at.
    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// The port pagination links must point at.
    pub fn api_port(&self) -> u16 {
        self.api_port
    }

    /// Check a pagination link (or any absolute request target) before the
    /// bearer token is sent to it.
    ///
    /// Absolute URLs must be HTTPS. Relative links are resolved against the API
    /// origin first. Either way the result must be on the API host and port.
    pub fn validate_next_url(&self, raw: &str) -> Result<(), SecurityError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SecurityError::InvalidUrl {
                url: String::new(),
                reason: "empty URL".to_string(),
            });
        }

        // `//host/path` and `\\host` resolve to another host against any base.
        if trimmed.starts_with("//") || trimmed.starts_with('\\') {
            return Err(SecurityError::UntrustedHost {
                url: display_url(trimmed),
                host: String::new(),
            });
        }

        let url = match Url::parse(trimmed) {
            Ok(url) => {
                if url.scheme() != "https" {
                    return Err(SecurityError::InsecureScheme {
                        url: display_url(trimmed),
                    });
                }
                url
            }
            // URL parsing treats `\` like `/` and drops tabs and newlines, so a
            // relative link can still name another host. Check where it lands.
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.api_origin(trimmed)?
                    .join(raw)
                    .map_err(|e| SecurityError::InvalidUrl {
                        url: display_url(trimmed),
                        reason: e.to_string(),
                    })?
            }
            Err(e) => {
                return Err(SecurityError::InvalidUrl {
                    url: display_url(trimmed),
                    reason: e.to_string(),
                });
            }
        };

        let host = url.host_str().unwrap_or_default();
        if host.is_empty() {
            return Err(SecurityError::MissingHost {
                url: display_url(trimmed),
            });
        }
        let port = url.port_or_known_default();
        if host != self.api_host || port != Some(self.api_port) {
            let authority = match port {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            return Err(SecurityError::UntrustedHost {
                url: display_url(trimmed),
                host: display_url(&authority),
            });
        }

        Ok(())
    }

    fn api_origin(&self, raw: &str) -> Result<Url, SecurityError> {
        Url::parse(&format!("https://{}:{}/", self.api_host, self.api_port)).map_err(|e| {
            SecurityError::InvalidUrl {
                url: display_url(raw),
                reason: format!("API host {:?} is not usable as a base: {e}", self.api_host),
            }
        })
    }

    /// Check a report download link returned by the API.
    ///
    /// The URL must be HTTPS. First-party hosts are accepted as is; CDN hosts
    /// additionally need a signed-URL query parameter. Everything else is refused.
    pub fn validate_analytics_download_url(&self, raw: &str) -> Result<Url, SecurityError> {
        let trimmed = raw.trim();
        let url = Url::parse(trimmed).map_err(|e| SecurityError::InvalidUrl {
            url: display_url(trimmed),
            reason: e.to_string(),
        })?;

        if url.scheme() != "https" {
            return Err(SecurityError::InsecureScheme {
                url: display_url(trimmed),
            });
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if host.is_empty() {
            return Err(SecurityError::MissingHost {
                url: display_url(trimmed),
            });
        }

        if matches_any(&host, &self.first_party_hosts) {
            return Ok(url);
        }

        if matches_any(&host, &self.cdn_hosts) {
            let signed = url.query_pairs().any(|(name, value)| {
                !value.is_empty()
                    && self
                        .signed_params
                        .iter()
                        .any(|param| param.eq_ignore_ascii_case(&name))
            });
            if signed {
                return Ok(url);
            }
            return Err(SecurityError::UnsignedCdnUrl {
                url: display_url(trimmed),
            });
        }

        Err(SecurityError::UntrustedHost {
            url: display_url(trimmed),
            host: display_url(&host),
        })
    }
}

/// Require `resolved` to have the scheme, host and port of `base`.
pub(crate) fn ensure_same_origin(base: &Url, resolved: &Url) -> Result<(), SecurityError> {
    let same_origin = resolved.scheme() == base.scheme()
        && resolved.host_str() == base.host_str()
        && resolved.port_or_known_default() == base.port_or_known_default();
    if same_origin {
        return Ok(());
    }
    Err(SecurityError::UntrustedHost {
        url: display_url(resolved.as_str()),
        host: display_url(resolved.host_str().unwrap_or_default()),
    })
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// `host` equals an entry or is a subdomain of it.
fn matches_any(host: &str, entries: &[String]) -> bool {
    entries.iter().any(|entry| {
        host == entry
            || host
                .strip_suffix(entry.as_str())
                .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
    })
}

fn display_url(raw: &str) -> String {
    sanitize_for_display(raw, MAX_URL_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TrustPolicy {
        TrustPolicy::default()
    }

    #[test]
    fn test_next_url_relative_accepted() {
        let p = policy();
        assert!(p.validate_next_url("/v1/apps?cursor=AQ").is_ok());
        assert!(p.validate_next_url("v1/apps").is_ok());
        assert!(p.validate_next_url("?cursor=AQ").is_ok());
    }

    #[test]
    fn test_next_url_same_host_https_accepted() {
        let p = policy();
        assert!(
            p.validate_next_url("https://api.appstoreconnect.apple.com/v1/apps?cursor=AQ")
                .is_ok()
        );
        assert!(
            p.validate_next_url("HTTPS://API.AppStoreConnect.apple.com/v1/apps")
                .is_ok()
        );
    }

    #[test]
    fn test_next_url_wrong_scheme_rejected() {
        let err = policy()
            .validate_next_url("http://api.appstoreconnect.apple.com/v1/apps")
            .unwrap_err();
        assert!(matches!(err, SecurityError::InsecureScheme { .. }));
    }

    #[test]
    fn test_next_url_wrong_host_rejected() {
        let p = policy();
        let err = p.validate_next_url("https://evil.example/v1/apps").unwrap_err();
        assert!(matches!(err, SecurityError::UntrustedHost { .. }));

        // A subdomain of the API host is not the API host.
        let err = p
            .validate_next_url("https://x.api.appstoreconnect.apple.com/v1/apps")
            .unwrap_err();
        assert!(matches!(err, SecurityError::UntrustedHost { .. }));

        // Look-alike suffix.
        let err = p
            .validate_next_url("https://api.appstoreconnect.apple.com.evil.example/v1")
            .unwrap_err();
        assert!(matches!(err, SecurityError::UntrustedHost { .. }));
    }

    #[test]
    fn test_next_url_scheme_relative_rejected() {
        let p = policy();
        assert!(p.validate_next_url("//evil.example/v1/apps").is_err());
        assert!(p.validate_next_url("\\\\evil.example/v1/apps").is_err());
        assert!(p.validate_next_url("").is_err());
        assert!(matches!(
            p.validate_next_url("javascript:alert(1)"),
            Err(SecurityError::InsecureScheme { .. })
        ));
    }

    #[test]
    fn test_next_url_relative_link_cannot_switch_host() {
        let p = policy();
        for link in [
            "/\\evil.example/v1/apps",
            "/\t/evil.example/v1/apps",
            "/\n/evil.example/x",
            "/\r\n/evil.example/x",
            "\t//evil.example/v1/apps",
        ] {
            assert!(
                matches!(
                    p.validate_next_url(link),
                    Err(SecurityError::UntrustedHost { .. })
                ),
                "{link:?}"
            );
        }

        let err = p
            .validate_next_url("/\\api.appstoreconnect.apple.com:8443/v1/apps")
            .unwrap_err();
        assert!(matches!(err, SecurityError::UntrustedHost { .. }));
    }

    #[test]
    fn test_next_url_non_default_port_rejected() {
        let p = policy();
        let err = p
            .validate_next_url("https://api.appstoreconnect.apple.com:8443/v1/apps")
            .unwrap_err();
        match err {
            SecurityError::UntrustedHost { host, .. } => {
                assert_eq!(host, "api.appstoreconnect.apple.com:8443")
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(
            p.validate_next_url("https://api.appstoreconnect.apple.com:443/v1/apps")
                .is_ok()
        );
    }

    #[test]
    fn test_next_url_follows_configured_port() {
        let base = Url::parse("https://asc.internal.example:8443").unwrap();
        let p = TrustPolicy::for_base_url(&base);
        assert_eq!(p.api_port(), 8443);
        assert!(p.validate_next_url("https://asc.internal.example:8443/v1/apps").is_ok());
        assert!(p.validate_next_url("/v1/apps?cursor=AQ").is_ok());
        assert!(p.validate_next_url("https://asc.internal.example/v1/apps").is_err());
    }

    #[test]
    fn test_same_origin() {
        let base = Url::parse("https://api.appstoreconnect.apple.com").unwrap();
        let ok = base.join("/v1/apps").unwrap();
        assert!(ensure_same_origin(&base, &ok).is_ok());

        for other in [
            "https://evil.example/v1/apps",
            "http://api.appstoreconnect.apple.com/v1/apps",
            "https://api.appstoreconnect.apple.com:8443/v1/apps",
        ] {
            let url = Url::parse(other).unwrap();
            assert!(ensure_same_origin(&base, &url).is_err(), "{other}");
        }
    }

    #[test]
    fn test_next_url_follows_configured_host() {
        let base = Url::parse("https://asc.internal.example").unwrap();
        let p = TrustPolicy::for_base_url(&base);
        assert_eq!(p.api_host(), "asc.internal.example");
        assert!(p.validate_next_url("https://asc.internal.example/v1/apps").is_ok());
        assert!(
            p.validate_next_url("https://api.appstoreconnect.apple.com/v1/apps")
                .is_err()
        );
    }

    #[test]
    fn test_analytics_first_party_accepted() {
        let p = policy();
        assert!(
            p.validate_analytics_download_url("https://apps.apple.com/report.csv")
                .is_ok()
        );
        assert!(
            p.validate_analytics_download_url("https://apple.com/report.csv")
                .is_ok()
        );
    }

    #[test]
    fn test_analytics_signed_cdn_accepted() {
        let p = policy();
        let url = p
            .validate_analytics_download_url(
                "https://abc.cloudfront.net/file?X-Amz-Signature=deadbeef&X-Amz-Expires=300",
            )
            .unwrap();
        assert_eq!(url.host_str(), Some("abc.cloudfront.net"));
        assert!(
            p.validate_analytics_download_url(
                "https://bucket.s3.amazonaws.com/file?x-amz-signature=abc"
            )
            .is_ok()
        );
    }

    #[test]
    fn test_analytics_unsigned_cdn_rejected() {
        let p = policy();
        let err = p
            .validate_analytics_download_url("https://abc.cloudfront.net/file")
            .unwrap_err();
        assert!(matches!(err, SecurityError::UnsignedCdnUrl { .. }));

        let err = p
            .validate_analytics_download_url("https://abc.cloudfront.net/file?X-Amz-Signature=")
            .unwrap_err();
        assert!(matches!(err, SecurityError::UnsignedCdnUrl { .. }));
    }

    #[test]
    fn test_analytics_insecure_or_untrusted_rejected() {
        let p = policy();
        assert!(matches!(
            p.validate_analytics_download_url("http://apps.apple.com/report.csv"),
            Err(SecurityError::InsecureScheme { .. })
        ));
        assert!(matches!(
            p.validate_analytics_download_url("https://evil.example/report.csv"),
            Err(SecurityError::UntrustedHost { .. })
        ));
        assert!(matches!(
            p.validate_analytics_download_url("https://notapple.com/report.csv"),
            Err(SecurityError::UntrustedHost { .. })
        ));
        assert!(matches!(
            p.validate_analytics_download_url("/relative/report.csv"),
            Err(SecurityError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_error_message_is_sanitized() {
        let err = policy()
            .validate_next_url("https://evil.example/\x1b]0;pwned\x07")
            .unwrap_err();
        let message = err.to_string();
        assert!(!message.contains('\x1b'));
        assert!(!message.contains('\x07'));
        assert!(message.len() < 300);
    }
}
