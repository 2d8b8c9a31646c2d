//! Pod login flow with proxy credential retry.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use url::Url;

use crate::{
    AuthError, CredentialGate, CredentialPrompt, PodAddress, ProbeTransport, ProxyCredentials,
};

/// Terminal state of one login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Pod uses SSO; open this URL in the external browser.
    Sso {
        /// SSO entry URL.
        sso_url: Url,
    },
    /// Load the pod directly into the main view and trust its origin.
    LoadPod {
        /// Canonical pod origin.
        origin: Url,
    },
    /// Flow stopped without a user-visible result.
    Abandoned {
        /// Log-safe reason.
        reason: String,
    },
}

/// Session-scoped proxy state shared by login attempts.
#[derive(Debug, Default, Clone)]
pub struct LoginSession {
    /// Canonical origin the session belongs to.
    pub origin: Option<String>,
    /// Credentials and retry counter for this session.
    pub credentials: ProxyCredentials,
    /// Set once an attempt suspended on a credential request.
    pub in_proxy_login: bool,
    /// The single outstanding (or last) credential request.
    pub pending: Option<CredentialGate>,
}

/// Resolves a pod address, probes it, and retries through proxy auth.
pub struct PodLoginFlow {
    transport: Arc<dyn ProbeTransport>,
    prompt: Arc<dyn CredentialPrompt>,
    session: Mutex<LoginSession>,
}

impl PodLoginFlow {
    /// Creates a flow with an empty session.
    pub fn new(transport: Arc<dyn ProbeTransport>, prompt: Arc<dyn CredentialPrompt>) -> Self {
        Self {
            transport,
            prompt,
            session: Mutex::new(LoginSession::default()),
        }
    }

    /// Snapshot of the current session context.
    pub fn session(&self) -> LoginSession {
        self.lock_session().clone()
    }

    /// Runs the login flow for `raw_address` until a terminal outcome.
    ///
    /// A login for a different canonical origin than the previous one starts
    /// a fresh session (retry counter and stored credentials cleared).
    pub async fn login(&self, raw_address: &str) -> LoginOutcome {
        let address = match PodAddress::parse(raw_address) {
            Ok(address) => address,
            Err(error) => {
                warn!(error = %error, "pod login skipped");
                return abandoned(error.to_string());
            }
        };
        let (probe_url, origin, sso_url) =
            match (address.check_auth_url(), address.origin(), address.sso_url()) {
                (Ok(probe), Ok(origin), Ok(sso)) => (probe, origin, sso),
                (Err(error), _, _) | (_, Err(error), _) | (_, _, Err(error)) => {
                    warn!(error = %error, "pod login skipped");
                    return abandoned(error.to_string());
                }
            };

        self.begin_session(&address.origin_string());

        loop {
            let proxy = self.proxy_credentials_for_request().await;
            debug!(
                url = %probe_url,
                proxy_login = proxy.is_some(),
                "probing pod auth status"
            );

            let error = match self.transport.check_auth(&probe_url, proxy.as_ref()).await {
                Ok(status) if status.is_sso() => {
                    info!(origin = %origin, "pod requires sso");
                    return LoginOutcome::Sso { sso_url };
                }
                Ok(_) => {
                    info!(origin = %origin, "pod auth probe succeeded");
                    return LoginOutcome::LoadPod { origin };
                }
                Err(error) => error,
            };

            if !self.should_request_credentials(&error) {
                warn!(error = %error, "pod auth probe failed");
                return abandoned(error.to_string());
            }

            let hostname = match &error {
                AuthError::ProxyAuthRejected {
                    proxy_host: Some(host),
                } => host.clone(),
                _ => address.host(),
            };
            if !self.acquire_credentials(&hostname).await {
                info!(hostname = %hostname, "proxy credential entry dismissed");
                return abandoned("proxy credential entry dismissed".to_string());
            }
        }
    }

    fn begin_session(&self, origin: &str) {
        let mut session = self.lock_session();
        if session.origin.as_deref() != Some(origin) {
            if session.origin.is_some() {
                debug!(origin = %origin, "pod address changed; resetting login session");
            }
            *session = LoginSession {
                origin: Some(origin.to_string()),
                ..LoginSession::default()
            };
        }
    }

    /// Proxy hook: once an attempt has suspended on a credential request,
    /// every probe waits for that request before attaching stored credentials.
    async fn proxy_credentials_for_request(&self) -> Option<ProxyCredentials> {
        let gate = {
            let session = self.lock_session();
            if !session.in_proxy_login {
                return None;
            }
            session.pending.clone()
        };

        if let Some(gate) = gate {
            gate.wait().await;
        }

        Some(self.lock_session().credentials.clone())
    }

    fn should_request_credentials(&self, error: &AuthError) -> bool {
        match error {
            AuthError::ProxyAuthRejected { .. } => true,
            AuthError::TooManyRetries => self.lock_session().in_proxy_login,
            _ => false,
        }
    }

    /// Returns `true` when fresh credentials are available for a retry.
    async fn acquire_credentials(&self, hostname: &str) -> bool {
        let (gate, is_retry) = {
            let mut session = self.lock_session();
            if let Some(gate) = session.pending.clone().filter(CredentialGate::is_pending) {
                drop(session);
                debug!(
                    hostname = %hostname,
                    "awaiting credential prompt opened by another attempt"
                );
                return gate.wait().await;
            }

            let gate = CredentialGate::new();
            session.pending = Some(gate.clone());
            session.in_proxy_login = true;
            (gate, session.credentials.retry_count > 0)
        };

        info!(hostname = %hostname, is_retry, "requesting proxy credentials");
        match self.prompt.request_credentials(hostname, is_retry).await {
            Some(credentials) => {
                {
                    let mut session = self.lock_session();
                    session.credentials.username = credentials.username;
                    session.credentials.password = credentials.password;
                    session.credentials.hostname = hostname.to_string();
                    session.credentials.retry_count =
                        session.credentials.retry_count.saturating_add(1);
                }
                gate.resolve();
                true
            }
            None => {
                gate.dismiss();
                false
            }
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, LoginSession> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn abandoned(reason: String) -> LoginOutcome {
    LoginOutcome::Abandoned { reason }
}
