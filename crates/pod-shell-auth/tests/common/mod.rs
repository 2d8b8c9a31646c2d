//! Shared fakes for login flow integration tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use pod_shell_auth::{
    AuthError, AuthStatus, CredentialPrompt, Credentials, ProbeTransport, ProxyCredentials,
};
use tokio::sync::Notify;
use url::Url;

/// Proxy that only lets requests through with the expected password.
pub struct ProxyGatedTransport {
    pub authentication_type: String,
    pub accepted_password: Option<String>,
    pub calls: Mutex<Vec<(String, Option<String>)>>,
}

#[allow(dead_code)]
impl ProxyGatedTransport {
    /// No proxy in the way; every probe succeeds.
    pub fn open(authentication_type: &str) -> Self {
        Self {
            authentication_type: authentication_type.to_string(),
            accepted_password: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Probes fail with a proxy rejection until `password` is supplied.
    pub fn requiring(password: &str) -> Self {
        Self {
            authentication_type: "password".to_string(),
            accepted_password: Some(password.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait::async_trait]
impl ProbeTransport for ProxyGatedTransport {
    async fn check_auth(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredentials>,
    ) -> Result<AuthStatus, AuthError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((url.to_string(), proxy.map(|login| login.username.clone())));

        if let Some(expected) = &self.accepted_password {
            let supplied = proxy.map(|login| login.password.as_str());
            if supplied != Some(expected.as_str()) {
                return Err(AuthError::ProxyAuthRejected {
                    proxy_host: Some("proxy.corp.test".to_string()),
                });
            }
        }

        Ok(AuthStatus {
            authentication_type: Some(self.authentication_type.clone()),
        })
    }
}

/// Fails every probe with a fixed error kind.
pub struct FailingTransport(pub fn() -> AuthError);

#[async_trait::async_trait]
impl ProbeTransport for FailingTransport {
    async fn check_auth(
        &self,
        _url: &Url,
        _proxy: Option<&ProxyCredentials>,
    ) -> Result<AuthStatus, AuthError> {
        Err((self.0)())
    }
}

/// Prompt answering from a script, optionally holding each answer until
/// released.
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Option<Credentials>>>,
    pub calls: Mutex<Vec<(String, bool)>>,
    pub release: Option<Notify>,
}

#[allow(dead_code)]
impl ScriptedPrompt {
    pub fn answering(passwords: &[Option<&str>]) -> Self {
        Self {
            answers: Mutex::new(
                passwords
                    .iter()
                    .map(|password| {
                        password.map(|password| Credentials {
                            username: "alice".to_string(),
                            password: password.to_string(),
                        })
                    })
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
            release: None,
        }
    }

    pub fn held(mut self) -> Self {
        self.release = Some(Notify::new());
        self
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait::async_trait]
impl CredentialPrompt for ScriptedPrompt {
    async fn request_credentials(&self, hostname: &str, is_retry: bool) -> Option<Credentials> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((hostname.to_string(), is_retry));
        if let Some(release) = &self.release {
            release.notified().await;
        }
        self.answers
            .lock()
            .expect("answers lock")
            .pop_front()
            .flatten()
    }
}

/// Rejects anonymous probes; credentialed probes find no proxy to carry them.
pub struct NoProxyRouteTransport;

#[async_trait::async_trait]
impl ProbeTransport for NoProxyRouteTransport {
    async fn check_auth(
        &self,
        _url: &Url,
        proxy: Option<&ProxyCredentials>,
    ) -> Result<AuthStatus, AuthError> {
        match proxy {
            None => Err(AuthError::ProxyAuthRejected { proxy_host: None }),
            Some(_) => Err(AuthError::ProxyUnresolved),
        }
    }
}
