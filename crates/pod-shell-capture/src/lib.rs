#![warn(missing_docs)]
//! # pod-shell-capture
//!
//! ## Purpose
//! Owns the screen-capture session: at most one external capture-tool
//! invocation at a time, producing an image payload or cancelling cleanly.
//!
//! ## Responsibilities
//! - Describe the per-platform capture tool invocation ([`CapturePolicy`]).
//! - Run the external tool as a killable child process ([`CaptureTool`],
//!   [`ProcessCaptureTool`]).
//! - Enforce kill-before-replace on the single capture slot and run cleanup
//!   on every exit path ([`ScreenSnippetSession`]).
//! - Hand captures to the snippet editor window and accept its one-shot
//!   merged image on platforms that use it.
//!
//! ## Data flow
//! `openScreenSnippet` -> [`ScreenSnippetSession::capture`] -> tool writes
//! `<temp>/symphonyImage-*.png` -> file is base64-encoded (or routed through
//! the editor window) -> [`pod_shell_core::ImagePayload`] delivered through
//! [`CaptureHost::deliver`].
//!
//! ## Ownership and lifetimes
//! The session is shared behind `Arc`; its mutable slot lives in a mutex that
//! is never held across an await. Each capture owns a guard that restores
//! window state and deletes its temp file when dropped.
//!
//! ## Error model
//! Tool and filesystem failures are [`CaptureError`] values inside the crate
//! and are converted to `ERROR` payloads (or a dropped delivery when a newer
//! capture superseded the failing one) before they reach the caller.
//!
//! ## Security and privacy notes
//! Captured images only touch disk in the session temp directory and are
//! deleted as soon as the capture finishes.

mod process;
mod session;

use std::path::{Path, PathBuf};

use pod_shell_core::{ImageDimensions, ImagePayload, SenderRef};
use thiserror::Error;
use tokio::sync::oneshot;

pub use process::ProcessCaptureTool;
pub use session::{CaptureSnapshot, ScreenSnippetSession};

/// Image format requested from every capture tool.
pub const CAPTURE_IMAGE_FORMAT: &str = "png";

/// File name prefix of capture artifacts.
pub const CAPTURE_FILE_PREFIX: &str = "symphonyImage-";

/// Host platform families with distinct capture tool policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    /// `screencapture` with editor hand-off.
    MacOs,
    /// Bundled `ScreenSnippet.exe`, supports cancellation.
    Windows,
    /// `gnome-screenshot`.
    Linux,
    /// Anything else; the tool runs without arguments.
    Other,
}

impl PlatformFamily {
    /// Family of the compile target.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    /// Parses `macos`/`windows`/`linux`/`other` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "macos" | "mac" | "darwin" => Some(Self::MacOs),
            "windows" | "win32" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Returns `true` when the tool supports a no-argument cancel run.
    pub fn supports_cancel(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Returns `true` when captures are routed through the editor window.
    pub fn uses_editor_handoff(self) -> bool {
        matches!(self, Self::MacOs)
    }

    fn default_tool_path(self) -> PathBuf {
        match self {
            Self::MacOs => PathBuf::from("/usr/sbin/screencapture"),
            Self::Windows => PathBuf::from("ScreenSnippet.exe"),
            Self::Linux => PathBuf::from("/usr/bin/gnome-screenshot"),
            Self::Other => PathBuf::from("screen-snippet"),
        }
    }
}

/// Program and argument vector for one tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Executable path.
    pub program: PathBuf,
    /// Arguments in order.
    pub args: Vec<String>,
}

/// Platform policy deciding how the capture tool is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePolicy {
    /// Platform family.
    pub platform: PlatformFamily,
    /// Capture tool executable.
    pub tool_path: PathBuf,
    /// Locale passed to tools that localise their UI.
    pub locale: String,
}

impl CapturePolicy {
    /// Default policy for a platform family.
    pub fn for_platform(platform: PlatformFamily) -> Self {
        Self {
            platform,
            tool_path: platform.default_tool_path(),
            locale: "en-US".to_string(),
        }
    }

    /// Overrides the tool executable.
    pub fn with_tool_path(mut self, tool_path: impl Into<PathBuf>) -> Self {
        self.tool_path = tool_path.into();
        self
    }

    /// Overrides the locale passed to the tool.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Invocation writing a capture to `output`.
    pub fn capture_invocation(&self, output: &Path) -> ToolInvocation {
        let output = output.display().to_string();
        let args = match self.platform {
            PlatformFamily::MacOs => vec![
                "-i".to_string(),
                "-s".to_string(),
                "-t".to_string(),
                CAPTURE_IMAGE_FORMAT.to_string(),
                output,
            ],
            PlatformFamily::Windows => vec![output, self.locale.clone()],
            PlatformFamily::Linux => vec!["-a".to_string(), "-f".to_string(), output],
            PlatformFamily::Other => Vec::new(),
        };

        ToolInvocation {
            program: self.tool_path.clone(),
            args,
        }
    }

    /// Invocation that cancels a running capture, when the platform has one.
    pub fn cancel_invocation(&self) -> Option<ToolInvocation> {
        self.platform.supports_cancel().then(|| ToolInvocation {
            program: self.tool_path.clone(),
            args: Vec::new(),
        })
    }
}

/// How a tool run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolExit {
    /// Process exited on its own.
    Exited {
        /// Exit code when the platform reports one.
        code: Option<i32>,
    },
    /// Process was terminated through the kill signal.
    Killed,
}

/// External capture tool runner.
#[async_trait::async_trait]
pub trait CaptureTool: Send + Sync {
    /// Runs `invocation` until it exits, or terminates it once `kill` fires
    /// (or its sender is dropped) and reports [`ToolExit::Killed`].
    async fn run(
        &self,
        invocation: &ToolInvocation,
        kill: oneshot::Receiver<()>,
    ) -> Result<ToolExit, CaptureError>;
}

/// Window-side collaborators used around a capture.
pub trait CaptureHost: Send + Sync {
    /// Current always-on-top setting of the main window.
    fn always_on_top(&self) -> bool;
    /// Applies the always-on-top setting.
    fn set_always_on_top(&self, enabled: bool);
    /// Window id holding focus when the capture starts.
    fn focused_window(&self) -> Option<u64>;
    /// Gives focus back to a window that still exists.
    fn refocus(&self, window: u64);
    /// Opens the snippet editor seeded with a capture.
    fn open_snippet_editor(&self, image: &Path, dimensions: ImageDimensions);
    /// Pushes a capture result to a view.
    fn deliver(&self, target: SenderRef, payload: ImagePayload);
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Tool could not be started.
    #[error("capture tool spawn failed: {0}")]
    Spawn(String),
    /// Waiting on the tool failed.
    #[error("capture tool wait failed: {0}")]
    Wait(String),
    /// Tool was killed before finishing.
    #[error("capture tool was terminated")]
    Killed,
    /// Tool finished without producing an image.
    #[error("no image was captured: {0}")]
    MissingOutput(String),
    /// Capture file could not be read or measured.
    #[error("capture file unreadable: {0}")]
    Unreadable(String),
    /// Editor hand-off payload is not `"<type>,<base64>"`.
    #[error("invalid merged image data: {0}")]
    InvalidMergedImage(String),
}

/// Splits editor output `"data:<mime>,<base64>"` into mime tag and data.
///
/// # Errors
/// Returns [`CaptureError::InvalidMergedImage`] when the separator is missing
/// or the data part is not valid base64.
pub fn split_merged_image(merged: &str) -> Result<(String, String), CaptureError> {
    use base64::Engine as _;

    let (kind, data) = merged
        .split_once(',')
        .ok_or_else(|| CaptureError::InvalidMergedImage("missing ',' separator".to_string()))?;
    let kind = kind.trim().trim_start_matches("data:");
    if kind.is_empty() || data.is_empty() {
        return Err(CaptureError::InvalidMergedImage(
            "empty type or data".to_string(),
        ));
    }

    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|error| CaptureError::InvalidMergedImage(error.to_string()))?;

    Ok((kind.to_string(), data.to_string()))
}
