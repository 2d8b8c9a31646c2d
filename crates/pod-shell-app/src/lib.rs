#![warn(missing_docs)]
//! # pod-shell-app
//!
//! ## Purpose
//! Main-process control layer of `pod-shell`: validates and routes renderer
//! messages to window, capture, login, and other host collaborators.
//!
//! ## Responsibilities
//! - Reject messages from windows and views the host does not track.
//! - Log every dispatched command with sensitive fields redacted.
//! - Route each command tag through the fire-and-forget or invoke table.
//! - Trigger the pod login flow and apply its outcome to the main view.
//! - Bridge the capture session to the window registry and push channel.
//! - Serve the newline-delimited JSON host protocol used by the binary.
//!
//! ## Data flow
//! shell line -> [`stdio::Inbound`] -> [`Dispatcher::dispatch`] /
//! [`Dispatcher::invoke`] -> sender validation -> redacted log record ->
//! handler -> collaborator call or [`stdio::Outbound`] event.
//!
//! ## Ownership and lifetimes
//! Collaborators are shared as `Arc<dyn Trait>` inside [`Host`]. The
//! dispatcher is shared behind `Arc` by every in-flight message task; the
//! capture session and login flow keep their own interior state.
//!
//! ## Error model
//! Setup failures (configuration, temp directory, I/O) are [`AppError`].
//! Handlers never fail: malformed fields skip the command, subsystem errors
//! are logged or turned into `ERROR` capture payloads.
//!
//! ## Security and privacy notes
//! - Untracked senders are rejected before any handler runs.
//! - Notification text, data URLs, pipe bytes, thumbnails, merged images,
//!   clipboard text, and log file contents never reach the log.
//! - `POD_SHELL_CAPTURE_ENABLED` can disable screen capture at runtime.

pub mod capture_host;
pub mod config;
pub mod dispatch;
pub mod host;
pub mod login;
pub mod redact;
pub mod stdio;
pub mod validate;

use pod_shell_auth::AuthError;
use pod_shell_capture::CaptureError;
use pod_shell_core::CoreError;
use thiserror::Error;

pub use capture_host::{SCREEN_SNIPPET_CHANNEL, WindowCaptureHost};
pub use config::{ConfigScope, ConfigStore, HostConfig, JsonConfigStore};
pub use dispatch::{DispatchOutcome, DispatchSettings, Dispatcher};
pub use host::Host;
pub use login::LoginController;
pub use redact::{REDACTED, redact_message, redact_sensitive, redacted_record};
pub use validate::SenderValidator;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("POD_SHELL_VERSION");

/// Target triple the binary was built for.
pub const BUILD_TARGET: &str = env!("POD_SHELL_TARGET");

/// Environment variable that can disable screen capture.
pub const CAPTURE_KILL_SWITCH_ENV: &str = "POD_SHELL_CAPTURE_ENABLED";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Checks the runtime capture kill switch.
///
/// Semantics:
/// - Unset => capture enabled.
/// - `0`, `false`, `off` (case-insensitive) => capture disabled.
/// - Any other value => capture enabled.
pub fn capture_enabled_from_env() -> bool {
    match std::env::var(CAPTURE_KILL_SWITCH_ENV) {
        Ok(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !(normalized == "0" || normalized == "false" || normalized == "off")
        }
        Err(_) => true,
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration file unreadable or invalid.
    #[error("config error: {0}")]
    Config(String),
    /// System browser could not open a URL.
    #[error("external open failed: {0}")]
    ExternalOpen(String),
    /// Auth subsystem error.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    /// Capture subsystem error.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Core model error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    /// Host protocol I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Host protocol line could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
