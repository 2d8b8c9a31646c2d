#![warn(missing_docs)]
//! # pod-shell-auth
//!
//! ## Purpose
//! Implements the pod login flow: resolve the configured pod address, probe
//! its auth-status endpoint, and recover from proxy authentication failures by
//! asking the user for proxy credentials.
//!
//! ## Responsibilities
//! - Canonicalise a pod address into an HTTPS origin ([`PodAddress`]).
//! - Probe `<origin>/login/checkauth?type=user` through an injectable
//!   [`ProbeTransport`] ([`HttpProbeTransport`] in production).
//! - Hold the session-scoped proxy state ([`LoginSession`]) and the single
//!   shared credential suspension point ([`CredentialGate`]).
//! - Decide the terminal [`LoginOutcome`] (SSO redirect, direct load, abandon).
//!
//! ## Data flow
//! Config/CLI address -> [`resolve_pod_address`] -> [`PodLoginFlow::login`] ->
//! transport probe -> on proxy rejection [`CredentialPrompt`] -> retry ->
//! [`LoginOutcome`] applied by the app crate.
//!
//! ## Ownership and lifetimes
//! The flow owns its session context behind a short-lived mutex that is never
//! held across an await; transport and prompt are shared `Arc<dyn _>` seams.
//!
//! ## Error model
//! Address and transport failures are [`AuthError`] values. Only
//! [`AuthError::ProxyAuthRejected`] (and [`AuthError::TooManyRetries`] while a
//! proxy login is in progress) enter the credential retry path; everything else
//! abandons the flow without surfacing an error to the renderer.
//!
//! ## Security and privacy notes
//! Proxy passwords are never logged and are masked in `Debug` output.
//!
//! ## Example
//! ```rust
//! use pod_shell_auth::PodAddress;
//!
//! let address = PodAddress::parse("acme.symphony.com").unwrap();
//! assert_eq!(address.origin_string(), "https://acme.symphony.com");
//! ```

mod flow;
mod gate;
mod http;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use flow::{LoginOutcome, LoginSession, PodLoginFlow};
pub use gate::{CredentialGate, GateState};
pub use http::HttpProbeTransport;

/// Auth-status endpoint path probed on every login attempt.
pub const CHECK_AUTH_PATH: &str = "/login/checkauth";

/// Query string sent with the auth-status probe.
pub const CHECK_AUTH_QUERY: &str = "type=user";

/// SSO entry point opened externally for SSO pods.
pub const SSO_INIT_PATH: &str = "/login/sso/initsso";

/// Pod address split into its host components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodAddress {
    /// Labels left of the registrable domain (may be empty).
    pub subdomain: String,
    /// Registrable domain label.
    pub domain: String,
    /// Top-level domain including the leading dot, e.g. `.com`.
    pub tld: String,
}

impl PodAddress {
    /// Parses a configured pod address.
    ///
    /// Accepts bare hosts (`acme.symphony.com`) and `http(s)://` URLs; path,
    /// query, and port are discarded.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidAddress`] for empty input, non-web schemes,
    /// IP literals, or hosts with fewer than two labels.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AuthError::InvalidAddress("address is empty".to_string()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        let parsed = Url::parse(&candidate)
            .map_err(|error| AuthError::InvalidAddress(format!("invalid pod url: {error}")))?;

        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(AuthError::InvalidAddress(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let host = match parsed.host() {
            Some(url::Host::Domain(host)) => host.trim_end_matches('.').to_string(),
            Some(_) => {
                return Err(AuthError::InvalidAddress(
                    "pod address must be a domain name".to_string(),
                ));
            }
            None => return Err(AuthError::InvalidAddress("pod url has no host".to_string())),
        };

        let mut labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
            return Err(AuthError::InvalidAddress(format!(
                "host {host} is not a qualified domain"
            )));
        }

        let tld = labels.pop().unwrap_or_default();
        let domain = labels.pop().unwrap_or_default();

        Ok(Self {
            subdomain: labels.join("."),
            domain: domain.to_string(),
            tld: format!(".{tld}"),
        })
    }

    /// Reassembled host name.
    pub fn host(&self) -> String {
        if self.subdomain.is_empty() {
            format!("{}{}", self.domain, self.tld)
        } else {
            format!("{}.{}{}", self.subdomain, self.domain, self.tld)
        }
    }

    /// Canonical HTTPS origin without trailing slash.
    pub fn origin_string(&self) -> String {
        format!("https://{}", self.host())
    }

    /// Canonical HTTPS origin as a URL.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidAddress`] if the host does not re-parse.
    pub fn origin(&self) -> Result<Url, AuthError> {
        Url::parse(&self.origin_string())
            .map_err(|error| AuthError::InvalidAddress(format!("invalid origin: {error}")))
    }

    /// Auth-status probe URL.
    ///
    /// # Errors
    /// See [`PodAddress::origin`].
    pub fn check_auth_url(&self) -> Result<Url, AuthError> {
        let mut url = self.origin()?;
        url.set_path(CHECK_AUTH_PATH);
        url.set_query(Some(CHECK_AUTH_QUERY));
        Ok(url)
    }

    /// SSO entry URL.
    ///
    /// # Errors
    /// See [`PodAddress::origin`].
    pub fn sso_url(&self) -> Result<Url, AuthError> {
        let mut url = self.origin()?;
        url.set_path(SSO_INIT_PATH);
        Ok(url)
    }
}

/// Picks the first non-blank address in priority order
/// (command line, user config, global config).
pub fn resolve_pod_address<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
}

/// Response body of the auth-status probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    /// `sso` for single-sign-on pods; anything else means password login.
    #[serde(default)]
    pub authentication_type: Option<String>,
}

impl AuthStatus {
    /// Returns `true` when the pod requires SSO.
    pub fn is_sso(&self) -> bool {
        self.authentication_type
            .as_deref()
            .is_some_and(|kind| kind.eq_ignore_ascii_case("sso"))
    }
}

/// User-provided proxy credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Proxy account username.
    pub username: String,
    /// Proxy account password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Proxy credentials stored for the current login session.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProxyCredentials {
    /// Proxy account username.
    pub username: String,
    /// Proxy account password.
    pub password: String,
    /// Host the credentials were requested for.
    pub hostname: String,
    /// Number of credential submissions in this session.
    pub retry_count: u32,
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("hostname", &self.hostname)
            .field("retry_count", &self.retry_count)
            .finish()
    }
}

/// Transport used to probe the pod's auth-status endpoint.
#[async_trait::async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Issues the probe, authenticating against the proxy when `proxy` is set.
    async fn check_auth(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredentials>,
    ) -> Result<AuthStatus, AuthError>;
}

/// Interactive proxy credential entry.
#[async_trait::async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Asks the user for credentials for `hostname`.
    ///
    /// `is_retry` distinguishes the first prompt from re-entry after a
    /// rejected submission. `None` means the user dismissed the prompt.
    async fn request_credentials(&self, hostname: &str, is_retry: bool) -> Option<Credentials>;
}

/// Errors produced by address parsing and the auth probe.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Address could not be turned into an HTTPS origin.
    #[error("invalid pod address: {0}")]
    InvalidAddress(String),
    /// Proxy rejected the request's (missing or wrong) credentials.
    #[error("proxy authentication rejected")]
    ProxyAuthRejected {
        /// Proxy host, when the transport knows it.
        proxy_host: Option<String>,
    },
    /// Transport gave up after too many redirects or auth retries.
    #[error("too many retries")]
    TooManyRetries,
    /// Proxy credentials were supplied but no proxy server is known to send
    /// them to.
    #[error("no proxy server to authenticate against")]
    ProxyUnresolved,
    /// Any other network failure.
    #[error("auth transport failure: {0}")]
    Transport(String),
    /// Probe answered with an unexpected body.
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for address canonicalisation.

    use super::*;

    #[test]
    fn splits_host_into_components() {
        let address = PodAddress::parse("https://corp.acme.symphony.com/client/index.html")
            .expect("address should parse");
        assert_eq!(address.subdomain, "corp.acme");
        assert_eq!(address.domain, "symphony");
        assert_eq!(address.tld, ".com");
        assert_eq!(address.origin_string(), "https://corp.acme.symphony.com");
    }

    #[test]
    fn upgrades_http_and_drops_port() {
        let address = PodAddress::parse("http://acme.symphony.com:8080").expect("parse");
        assert_eq!(address.origin_string(), "https://acme.symphony.com");
    }

    #[test]
    fn rejects_unusable_addresses() {
        assert!(PodAddress::parse("   ").is_err());
        assert!(PodAddress::parse("localhost").is_err());
        assert!(PodAddress::parse("https://10.0.0.1").is_err());
        assert!(PodAddress::parse("ftp://acme.symphony.com").is_err());
    }

    #[test]
    fn builds_probe_and_sso_urls() {
        let address = PodAddress::parse("acme.symphony.com").expect("parse");
        assert_eq!(
            address.check_auth_url().expect("url").as_str(),
            "https://acme.symphony.com/login/checkauth?type=user"
        );
        assert_eq!(
            address.sso_url().expect("url").as_str(),
            "https://acme.symphony.com/login/sso/initsso"
        );
    }

    #[test]
    fn address_priority_skips_blank_candidates() {
        let picked =
            resolve_pod_address([None, Some("  "), Some("user.symphony.com"), Some("g.com")]);
        assert_eq!(picked, Some("user.symphony.com"));
        assert_eq!(resolve_pod_address([None, None]), None);
    }

    #[test]
    fn credentials_debug_masks_password() {
        let credentials = ProxyCredentials {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            hostname: "proxy.corp".to_string(),
            retry_count: 1,
        };
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("alice"));
    }
}
