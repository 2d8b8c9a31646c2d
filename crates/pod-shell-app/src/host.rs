//! Collaborator interfaces the dispatcher drives.
//!
//! Everything outside the control layer (windows, notifications, pipes,
//! media queries, the system browser) is reached through these narrow
//! traits so handlers can be exercised against in-memory fakes.

use std::path::PathBuf;
use std::sync::Arc;

use pod_shell_core::{ImageDimensions, SenderRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::AppError;
use crate::config::ConfigStore;

/// Action applied to one tracked window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum WindowAction {
    /// Bring to front and take focus.
    Activate,
    /// Bring to front without stealing focus.
    BringToFront {
        /// Renderer-supplied reason, for logging by the shell.
        reason: String,
    },
    /// Give focus back to the window.
    Focus,
    /// Close the window.
    Close,
    /// Minimize.
    Minimize,
    /// Maximize.
    Maximize,
    /// Restore from maximized.
    Unmaximize,
    /// Reload the hosted content.
    Reload,
    /// Pop up the application menu anchored at the window.
    PopupMenu,
    /// Set the content zoom level.
    SetZoom {
        /// Zoom level as understood by the web view.
        level: f64,
    },
}

/// Auxiliary windows the dispatcher can open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AuxWindow {
    /// Notification settings, positioned over `window_name`.
    #[serde(rename_all = "camelCase")]
    NotificationSettings {
        /// Window the settings window belongs to.
        window_name: String,
    },
    /// Screen/window source picker for a sharing request.
    #[serde(rename_all = "camelCase")]
    ScreenPicker {
        /// View that asked for the picker.
        requester: SenderRef,
        /// Capturable sources offered to the user.
        sources: Vec<Value>,
        /// Renderer request id echoed back with the selection.
        request_id: u64,
    },
    /// "You are sharing your screen" indicator.
    #[serde(rename_all = "camelCase")]
    SharingIndicator {
        /// View that started the share.
        requester: SenderRef,
        /// Display being shared.
        display_id: String,
        /// Renderer request id.
        request_id: u64,
        /// Media stream id used to close the indicator later.
        stream_id: String,
    },
    /// Snippet editor seeded with a fresh capture.
    #[serde(rename_all = "camelCase")]
    SnippetEditor {
        /// Capture file.
        image: PathBuf,
        /// Pixel size of the capture.
        dimensions: ImageDimensions,
    },
}

/// Main window state reported by `getMainWindowState`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainWindowState {
    /// Window is maximized.
    pub maximized: bool,
    /// Window is minimized.
    pub minimized: bool,
    /// Window is full screen.
    pub full_screen: bool,
}

/// Window and view bookkeeping owned by the native shell.
pub trait WindowRegistry: Send + Sync {
    /// Returns `true` when the sender is a window or view the host created
    /// and still tracks.
    fn is_tracked(&self, sender: &SenderRef) -> bool;
    /// Window that owns `sender`.
    fn window_of(&self, sender: &SenderRef) -> Option<u64>;
    /// Looks a window up by its registered name.
    fn find_by_name(&self, name: &str) -> Option<u64>;
    /// Main application window.
    fn main_window(&self) -> Option<u64>;
    /// Window currently holding focus.
    fn focused_window(&self) -> Option<u64>;
    /// Applies an action to a window.
    fn apply(&self, window: u64, action: WindowAction);
    /// Current main window state.
    fn main_window_state(&self) -> MainWindowState;
    /// Platform window handle bytes.
    fn native_handle(&self, window: u64) -> Option<Vec<u8>>;
    /// Loads `origin` into the main content view.
    fn load_main_view(&self, origin: &Url);
    /// Records the origin the main view is allowed to navigate within.
    fn set_trusted_origin(&self, origin: &Url);
    /// Opens an auxiliary window.
    fn open_aux(&self, window: AuxWindow);
    /// Closes one auxiliary window by type and key.
    fn close_aux(&self, window_type: &str, key: &str);
    /// Closes every auxiliary window.
    fn close_all_aux(&self);
    /// Current always-on-top setting of the main window.
    fn always_on_top(&self) -> bool;
    /// Applies always-on-top to the main window.
    fn set_always_on_top(&self, enabled: bool);
}

/// Delivers asynchronous results to a specific view.
pub trait PushChannel: Send + Sync {
    /// Pushes `payload` on `channel` to `target`.
    fn push(&self, target: SenderRef, channel: &str, payload: Value);
}

/// Opens URLs outside the application.
pub trait ExternalShell: Send + Sync {
    /// Opens `url` in the system browser.
    ///
    /// # Errors
    /// Returns [`AppError::ExternalOpen`] when the platform opener fails.
    fn open_external(&self, url: &Url) -> Result<(), AppError>;
}

/// Opens URLs with the platform opener (`open` crate).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl ExternalShell for SystemBrowser {
    fn open_external(&self, url: &Url) -> Result<(), AppError> {
        open::that(url.as_str()).map_err(|error| AppError::ExternalOpen(error.to_string()))
    }
}

/// Pipe and external shell session operations, keyed by the requesting view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PipeAction {
    /// Connect to a named pipe.
    Connect {
        /// Pipe name.
        pipe: String,
    },
    /// Write bytes to the connected pipe.
    Write {
        /// Raw bytes.
        data: Vec<u8>,
    },
    /// Close the pipe.
    Close,
    /// Launch the external shell session.
    Launch,
    /// Terminate the external shell session.
    Terminate,
}

/// External pipe/shell bridge.
pub trait PipeBridge: Send + Sync {
    /// Performs a pipe action on behalf of `sender`.
    fn perform(&self, sender: SenderRef, action: PipeAction);
}

/// Media permission status strings (`granted`, `denied`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAccess {
    /// Camera access.
    pub camera: String,
    /// Microphone access.
    pub microphone: String,
    /// Screen recording access.
    pub screen: String,
}

/// One capturable screen or window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    /// Source id (`screen:*` or `window:*`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Display id for screen sources.
    #[serde(default)]
    pub display_id: String,
    /// Base64 thumbnail, when one was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Process CPU usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuUsage {
    /// Percent CPU since the previous sample.
    #[serde(rename = "percentCPUUsage")]
    pub percent_cpu_usage: f64,
    /// Idle wakeups per second.
    pub idle_wakeups_per_second: u64,
}

/// Synchronous media and system queries answered on the invoke channel.
pub trait MediaInfo: Send + Sync {
    /// Camera/microphone/screen permission status.
    fn media_access(&self) -> MediaAccess;
    /// Capturable sources of the given `types` (`screen`, `window`).
    fn sources(&self, types: &[String], with_thumbnails: bool) -> Vec<SourceInfo>;
    /// Citrix media redirection status.
    fn citrix_media_redirection_status(&self) -> String;
    /// Current CPU usage.
    fn cpu_usage(&self) -> CpuUsage;
}

/// Download item actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadActionKind {
    /// Open the downloaded file.
    Open,
    /// Reveal it in the file manager.
    Show,
    /// Clear the download list.
    Clear,
}

impl DownloadActionKind {
    /// Parses the renderer's `type` field.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "open" => Some(Self::Open),
            "show" => Some(Self::Show),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }
}

/// Auto-update steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateStep {
    /// Check for a new version.
    Check,
    /// Download the available version.
    Download,
    /// Install and restart.
    InstallAndRestart,
}

/// Renderer-visible notification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    /// Notification id chosen by the renderer.
    #[serde(default)]
    pub id: Option<u64>,
    /// Title line.
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub body: String,
    /// Grouping tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Image data URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Opaque data echoed back on click.
    #[serde(default)]
    pub data: Option<Value>,
    /// Keep on screen until dismissed.
    #[serde(default)]
    pub sticky: bool,
}

/// Registrations of a view for host-originated events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Registration {
    /// Receives host log lines.
    Logger,
    /// Receives protocol (deep link) URLs.
    ProtocolHandler,
    /// Receives idle/activity reports every `period_ms`.
    #[serde(rename_all = "camelCase")]
    ActivityDetection {
        /// Reporting period.
        period_ms: u64,
    },
    /// Receives window bounds changes.
    BoundsChange,
}

/// Fire-and-forget side effects owned by other host subsystems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SystemAction {
    /// Network connectivity changed.
    SetOnline {
        /// New state.
        online: bool,
    },
    /// Dock/taskbar badge count.
    BadgeCount {
        /// Unread count.
        count: u64,
    },
    /// Overlay badge image.
    #[serde(rename_all = "camelCase")]
    BadgeImage {
        /// Image data URL.
        data_url: String,
        /// Unread count.
        count: u64,
    },
    /// View registration.
    Register {
        /// Registered view.
        sender: SenderRef,
        /// What it registered for.
        registration: Registration,
    },
    /// Locale switch.
    SetLocale {
        /// BCP 47 locale.
        locale: String,
    },
    /// Forwarded key press.
    #[serde(rename_all = "camelCase")]
    KeyPress {
        /// Key code.
        key_code: u64,
    },
    /// Download item action.
    Download {
        /// Action kind.
        kind: DownloadActionKind,
        /// Target file, empty for `clear`.
        path: String,
    },
    /// Show a notification.
    ShowNotification(NotificationRequest),
    /// Close a notification.
    CloseNotification {
        /// Notification id.
        id: u64,
    },
    /// Cloud entitlements.
    CloudConfig {
        /// Entitlement objects as sent by the renderer.
        config: Value,
    },
    /// Restart the application.
    Restart,
    /// New-client mode flag.
    #[serde(rename_all = "camelCase")]
    SetIsMana {
        /// Flag value.
        is_mana: bool,
    },
    /// Clipboard write.
    #[serde(rename_all = "camelCase")]
    Clipboard {
        /// Clipboard text.
        data: String,
        /// Clipboard format.
        clipboard_type: String,
    },
    /// Presence update.
    Presence {
        /// Presence object.
        presence: Value,
    },
    /// Renderer log files for the log collector.
    #[serde(rename_all = "camelCase")]
    SendLogs {
        /// Archive name.
        log_name: String,
        /// Log file entries.
        log_files: Vec<Value>,
    },
    /// Taskbar thumbnail.
    Thumbnail {
        /// Image data URL.
        image: String,
    },
    /// Auto-update step.
    Update {
        /// Step to perform.
        step: UpdateStep,
        /// What triggered it (`manual`, `automatic`).
        trigger: Option<String>,
    },
}

/// Performs [`SystemAction`]s.
pub trait SystemActions: Send + Sync {
    /// Carries out one action.
    fn perform(&self, action: SystemAction);
}

/// Bundle of collaborators handed to the dispatcher.
#[derive(Clone)]
pub struct Host {
    /// Windows and views.
    pub windows: Arc<dyn WindowRegistry>,
    /// Read-only configuration.
    pub config: Arc<dyn ConfigStore>,
    /// Push channel to views.
    pub push: Arc<dyn PushChannel>,
    /// System browser.
    pub shell: Arc<dyn ExternalShell>,
    /// Pipe/shell bridge.
    pub pipes: Arc<dyn PipeBridge>,
    /// Media and system queries.
    pub media: Arc<dyn MediaInfo>,
    /// Other host side effects.
    pub system: Arc<dyn SystemActions>,
}
