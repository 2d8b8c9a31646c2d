//! `browserLogin`: resolves the pod address and applies the login outcome.

use std::sync::Arc;

use pod_shell_auth::{LoginOutcome, PodLoginFlow, resolve_pod_address};
use tracing::{info, warn};

use crate::config::{ConfigScope, ConfigStore};
use crate::host::{ExternalShell, Host, WindowRegistry};

/// Runs the pod login flow for the configured address.
#[derive(Clone)]
pub struct LoginController {
    flow: Arc<PodLoginFlow>,
    config: Arc<dyn ConfigStore>,
    windows: Arc<dyn WindowRegistry>,
    shell: Arc<dyn ExternalShell>,
    cli_url: Option<String>,
}

impl LoginController {
    /// Creates a controller reading configuration and applying outcomes
    /// through `host`. `cli_url` takes priority over configuration.
    pub fn new(flow: Arc<PodLoginFlow>, host: &Host, cli_url: Option<String>) -> Self {
        Self {
            flow,
            config: host.config.clone(),
            windows: host.windows.clone(),
            shell: host.shell.clone(),
            cli_url,
        }
    }

    /// Shared login flow.
    pub fn flow(&self) -> &Arc<PodLoginFlow> {
        &self.flow
    }

    /// Pod address in priority order: command line, user config, global
    /// config.
    pub fn pod_address(&self) -> Option<String> {
        resolve_pod_address([
            self.cli_url.as_deref(),
            self.config.get(ConfigScope::User).url.as_deref(),
            self.config.get(ConfigScope::Global).url.as_deref(),
        ])
        .map(str::to_string)
    }

    /// Logs in and applies the outcome. Returns `None` when no address is
    /// configured.
    pub async fn browser_login(&self) -> Option<LoginOutcome> {
        let Some(address) = self.pod_address() else {
            warn!("browser login requested without a configured pod address");
            return None;
        };

        let outcome = self.flow.login(&address).await;
        self.apply(&outcome);
        Some(outcome)
    }

    fn apply(&self, outcome: &LoginOutcome) {
        match outcome {
            LoginOutcome::Sso { sso_url } => {
                info!(url = %sso_url, "opening sso login externally");
                if let Err(error) = self.shell.open_external(sso_url) {
                    warn!(url = %sso_url, error = %error, "failed to open sso login");
                }
            }
            LoginOutcome::LoadPod { origin } => {
                info!(origin = %origin, "loading pod into main view");
                self.windows.set_trusted_origin(origin);
                self.windows.load_main_view(origin);
            }
            LoginOutcome::Abandoned { reason } => {
                info!(reason = %reason, "pod login abandoned");
            }
        }
    }
}
