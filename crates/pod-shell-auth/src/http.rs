//! HTTPS probe transport backed by `reqwest`.

use std::error::Error as _;
use std::time::Duration;

use reqwest::{Client, Proxy, StatusCode, redirect};
use tracing::debug;
use url::Url;

use crate::{AuthError, AuthStatus, ProbeTransport, ProxyCredentials};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;

/// Proxy environment variables consulted per target scheme, in order.
const HTTPS_PROXY_VARS: [&str; 4] = ["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"];
const HTTP_PROXY_VARS: [&str; 4] = ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"];

/// Probe transport that issues a real HTTPS GET.
///
/// Without stored credentials the client uses the platform proxy settings
/// (`HTTPS_PROXY` and friends). With credentials, basic proxy authentication
/// is attached to `proxy_server`, or to the proxy named by the environment
/// when no server is configured.
#[derive(Debug, Clone)]
pub struct HttpProbeTransport {
    proxy_server: Option<Url>,
    timeout: Duration,
    env: fn(&str) -> Option<String>,
}

impl HttpProbeTransport {
    /// Creates a transport with an optional explicit proxy.
    pub fn new(proxy_server: Option<Url>) -> Self {
        Self {
            proxy_server,
            timeout: DEFAULT_TIMEOUT,
            env: env_var,
        }
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Proxy the credentials for a request to `target` are sent to.
    fn credential_proxy(&self, target: &Url) -> Option<Url> {
        if let Some(server) = &self.proxy_server {
            return Some(server.clone());
        }

        let vars = if target.scheme() == "http" {
            &HTTP_PROXY_VARS
        } else {
            &HTTPS_PROXY_VARS
        };
        vars.iter()
            .filter_map(|name| (self.env)(name))
            .find_map(|raw| parse_proxy_url(&raw))
    }

    fn client_for(
        &self,
        target: &Url,
        proxy: Option<&ProxyCredentials>,
    ) -> Result<(Client, Option<Url>), AuthError> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS));

        let mut proxy_server = self.proxy_server.clone();
        if let Some(credentials) = proxy {
            let Some(server) = self.credential_proxy(target) else {
                return Err(AuthError::ProxyUnresolved);
            };
            debug!(proxy = %server, "attaching proxy credentials");
            let proxy = Proxy::all(server.as_str())
                .map_err(|error| AuthError::Transport(format!("invalid proxy server: {error}")))?
                .basic_auth(&credentials.username, &credentials.password);
            builder = builder.proxy(proxy);
            proxy_server = Some(server);
        }

        let client = builder
            .build()
            .map_err(|error| AuthError::Transport(format!("http client init failed: {error}")))?;
        Ok((client, proxy_server))
    }
}

impl Default for HttpProbeTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait::async_trait]
impl ProbeTransport for HttpProbeTransport {
    async fn check_auth(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredentials>,
    ) -> Result<AuthStatus, AuthError> {
        let (client, proxy_server) = self.client_for(url, proxy)?;
        let proxy_host = proxy_server
            .as_ref()
            .and_then(|server| server.host_str().map(str::to_string));

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| classify(&error, proxy_host.clone()))?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "auth probe answered");
        if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
            return Err(AuthError::ProxyAuthRejected { proxy_host });
        }
        if !status.is_success() {
            return Err(AuthError::Transport(format!("unexpected status {status}")));
        }

        response
            .json::<AuthStatus>()
            .await
            .map_err(|error| AuthError::InvalidResponse(error.to_string()))
    }
}

fn classify(error: &reqwest::Error, proxy_host: Option<String>) -> AuthError {
    if error.is_redirect() {
        return AuthError::TooManyRetries;
    }
    classify_detail(error_chain(error), proxy_host)
}

fn classify_detail(detail: String, proxy_host: Option<String>) -> AuthError {
    let lowered = detail.to_ascii_lowercase();
    if lowered.contains("407") || lowered.contains("proxy authentication") {
        return AuthError::ProxyAuthRejected { proxy_host };
    }
    AuthError::Transport(detail)
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        detail.push_str(": ");
        detail.push_str(&inner.to_string());
        source = inner.source();
    }
    detail
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Accepts `scheme://host:port` or bare `host:port` (http assumed).
fn parse_proxy_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    Url::parse(&candidate)
        .ok()
        .filter(|url| url.host_str().is_some())
}

#[cfg(test)]
mod tests {
    //! Unit tests for proxy resolution and error classification.

    use super::*;

    fn credentials() -> ProxyCredentials {
        ProxyCredentials {
            username: "alice".to_string(),
            password: "secret".to_string(),
            hostname: "proxy.corp.test".to_string(),
            retry_count: 1,
        }
    }

    fn transport_with_env(env: fn(&str) -> Option<String>) -> HttpProbeTransport {
        HttpProbeTransport {
            env,
            ..HttpProbeTransport::new(None)
        }
    }

    fn pod() -> Url {
        Url::parse("https://acme.symphony.com/login/checkauth?type=user").expect("url")
    }

    #[test]
    fn configured_server_wins_over_environment() {
        let configured = Url::parse("http://configured.corp.test:3128").expect("url");
        let transport = HttpProbeTransport {
            env: |_| Some("http://env.corp.test:8080".to_string()),
            ..HttpProbeTransport::new(Some(configured.clone()))
        };

        assert_eq!(transport.credential_proxy(&pod()), Some(configured));
    }

    #[test]
    fn environment_proxy_follows_target_scheme() {
        let transport = transport_with_env(|name| match name {
            "https_proxy" => Some("secure.corp.test:8443".to_string()),
            "HTTP_PROXY" => Some("http://plain.corp.test:8080".to_string()),
            _ => None,
        });

        let https = transport.credential_proxy(&pod()).expect("https proxy");
        assert_eq!(https.host_str(), Some("secure.corp.test"));
        assert_eq!(https.port(), Some(8443));

        let plain = Url::parse("http://acme.symphony.com/").expect("url");
        let http = transport.credential_proxy(&plain).expect("http proxy");
        assert_eq!(http.host_str(), Some("plain.corp.test"));
    }

    #[test]
    fn all_proxy_is_the_fallback() {
        let transport = transport_with_env(|name| {
            (name == "ALL_PROXY").then(|| "socks.corp.test:1080".to_string())
        });

        let proxy = transport.credential_proxy(&pod()).expect("proxy");
        assert_eq!(proxy.host_str(), Some("socks.corp.test"));
    }

    #[test]
    fn credentials_without_any_proxy_are_not_retried() {
        let transport = transport_with_env(|_| None);

        let result = transport.client_for(&pod(), Some(&credentials()));

        assert!(matches!(result, Err(AuthError::ProxyUnresolved)));
    }

    #[test]
    fn no_credentials_needs_no_proxy() {
        let transport = transport_with_env(|_| None);

        let (_, proxy) = transport.client_for(&pod(), None).expect("client");

        assert_eq!(proxy, None);
    }

    #[test]
    fn proxy_failures_in_error_text_become_rejections() {
        for detail in [
            "error sending request: proxy authentication required",
            "tunnel failed: HTTP/1.1 407 Proxy Authentication Required",
        ] {
            let error = classify_detail(detail.to_string(), Some("proxy.corp.test".to_string()));
            assert!(
                matches!(
                    &error,
                    AuthError::ProxyAuthRejected { proxy_host: Some(host) }
                        if host == "proxy.corp.test"
                ),
                "{detail} classified as {error:?}"
            );
        }

        let error = classify_detail("connection refused".to_string(), None);
        assert!(matches!(error, AuthError::Transport(detail) if detail == "connection refused"));
    }

    #[test]
    fn blank_or_hostless_proxy_values_are_ignored() {
        assert_eq!(parse_proxy_url("  "), None);
        assert_eq!(parse_proxy_url("http://"), None);
        assert_eq!(
            parse_proxy_url("proxy.corp.test:3128").map(|url| url.to_string()),
            Some("http://proxy.corp.test:3128/".to_string())
        );
    }
}
