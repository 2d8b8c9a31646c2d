#![warn(missing_docs)]
//! # pod-shell-core
//!
//! ## Purpose
//! Defines the pure data model shared by the `pod-shell` control layer.
//!
//! ## Responsibilities
//! - Name the closed set of command tags renderers may send.
//! - Parse raw inbound JSON into a tagged [`InboundMessage`] envelope.
//! - Identify message senders ([`SenderRef`]).
//! - Describe capture results delivered back to views ([`ImagePayload`]).
//!
//! ## Data flow
//! A renderer emits `{cmd, ...fields}` -> [`InboundMessage::parse`] resolves
//! the tag against [`ApiCmd`] -> the dispatcher reads typed fields through the
//! `*_field` accessors -> handlers may answer with an [`ImagePayload`].
//!
//! ## Ownership and lifetimes
//! Messages own their field map (`serde_json::Map`) so handlers can move the
//! envelope into spawned tasks without borrowing the transport buffer.
//!
//! ## Error model
//! Structurally malformed envelopes return [`CoreError`]. Unknown tags are not
//! errors: parsing yields `Ok(None)` so callers can drop them silently.
//!
//! ## Security and privacy notes
//! Field values are opaque here. Redaction before logging happens in the app
//! crate, which knows which fields carry sensitive payloads.
//!
//! ## Example
//! ```rust
//! use pod_shell_core::{ApiCmd, InboundMessage};
//!
//! let raw = serde_json::json!({ "cmd": "setBadgeCount", "count": 3 });
//! let message = InboundMessage::parse(raw).unwrap().expect("known tag");
//! assert_eq!(message.cmd, ApiCmd::SetBadgeCount);
//! assert_eq!(message.u64_field("count"), Some(3));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Status text attached to successful capture payloads.
pub const IMAGE_PAYLOAD_SUCCESS: &str = "success";

/// Payload type tag for failed captures.
pub const IMAGE_PAYLOAD_ERROR_TYPE: &str = "ERROR";

macro_rules! api_commands {
    ($($(#[$doc:meta])* $variant:ident => $tag:literal,)+) => {
        /// Closed set of command tags accepted from renderer/view processes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ApiCmd {
            $($(#[$doc])* $variant,)+
        }

        impl ApiCmd {
            /// Every known tag, in declaration order.
            pub const ALL: &'static [ApiCmd] = &[$(ApiCmd::$variant,)+];

            /// Wire tag as sent by renderers.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(ApiCmd::$variant => $tag,)+
                }
            }

            /// Resolves a wire tag; `None` for anything outside the closed set.
            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some(ApiCmd::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

api_commands! {
    /// Connectivity report from the web app.
    IsOnline => "isOnline",
    /// Dock/taskbar badge count.
    SetBadgeCount => "setBadgeCount",
    /// Overlay badge rendered by the web app as a data URL.
    BadgeDataUrl => "badgeDataUrl",
    /// Bring a named window to front and focus it.
    Activate => "activate",
    /// Bring a named window to front without stealing focus.
    BringToFront => "bringToFront",
    /// Register the sender as renderer log sink.
    RegisterLogger => "registerLogger",
    /// Register the sender for protocol URL delivery.
    RegisterProtocolHandler => "registerProtocolHandler",
    /// Register the sender for activity reports.
    RegisterActivityDetection => "registerActivityDetection",
    /// Register the sender for window bounds changes.
    RegisterBoundsChange => "registerBoundsChange",
    /// Open notification settings.
    ShowNotificationSettings => "showNotificationSettings",
    /// Open the screen picker window.
    OpenScreenPickerWindow => "openScreenPickerWindow",
    /// Open the screen sharing indicator.
    OpenScreenSharingIndicator => "openScreenSharingIndicator",
    /// Close the screen sharing indicator.
    CloseScreenSharingIndicator => "closeScreenSharingIndicator",
    /// Pop up the application menu.
    PopupMenu => "popupMenu",
    /// Switch locale.
    SetLocale => "setLocale",
    /// Forward a key press.
    KeyPress => "keyPress",
    /// Start a screen capture.
    OpenScreenSnippet => "openScreenSnippet",
    /// Cancel the active screen capture.
    CloseScreenSnippet => "closeScreenSnippet",
    /// Merged image emitted by the snippet editor window.
    UploadSnippet => "uploadSnippet",
    /// Close a named auxiliary window.
    CloseWindow => "closeWindow",
    /// Close every auxiliary window.
    CloseAllWrapperWindows => "closeAllWrapperWindows",
    /// Download item action.
    DownloadManagerAction => "downloadManagerAction",
    /// Show a notification.
    ShowNotification => "showNotification",
    /// Close a notification.
    CloseNotification => "closeNotification",
    /// Cloud configuration entitlements.
    SetCloudConfig => "setCloudConfig",
    /// Restart the host.
    RestartApp => "restartApp",
    /// Toggle new-client mode.
    SetIsMana => "setIsMana",
    /// Main view zoom level.
    SetZoomLevel => "setZoomLevel",
    /// Clipboard write from the about window.
    AboutAppClipBoardData => "aboutAppClipBoardData",
    /// Close the main window.
    CloseMainWindow => "closeMainWindow",
    /// Minimize the main window.
    MinimizeMainWindow => "minimizeMainWindow",
    /// Maximize the main window.
    MaximizeMainWindow => "maximizeMainWindow",
    /// Restore the main window from maximized.
    UnmaximizeMainWindow => "unmaximizeMainWindow",
    /// Reload the main window.
    ReloadWindow => "reloadWindow",
    /// Connect an external pipe session.
    ConnectCloud9Pipe => "connectCloud9Pipe",
    /// Write bytes into the external pipe.
    WriteCloud9Pipe => "writeCloud9Pipe",
    /// Close the external pipe session.
    CloseCloud9Pipe => "closeCloud9Pipe",
    /// Launch the external shell session.
    LaunchCloud9 => "launchCloud9",
    /// Terminate the external shell session.
    TerminateCloud9 => "terminateCloud9",
    /// Presence update.
    UpdateMyPresence => "updateMyPresence",
    /// Run the pod login flow.
    BrowserLogin => "browserLogin",
    /// Renderer log bundle.
    SendLogs => "sendLogs",
    /// Taskbar thumbnail image.
    UpdateThumbnail => "updateThumbnail",
    /// Check for updates.
    CheckForUpdates => "checkForUpdates",
    /// Download a pending update.
    DownloadUpdate => "downloadUpdate",
    /// Install a downloaded update and restart.
    UpdateAndRestart => "updateAndRestart",
    /// Renderer log lines.
    Log => "log",
    /// Media permission status (invoke).
    CheckMediaPermission => "checkMediaPermission",
    /// Capturable screen/window sources (invoke).
    GetSources => "getSources",
    /// Native window handle (invoke).
    GetNativeWindowHandle => "getNativeWindowHandle",
    /// Citrix media redirection status (invoke).
    GetCitrixMediaRedirectionStatus => "getCitrixMediaRedirectionStatus",
    /// Main window state flags (invoke).
    GetMainWindowState => "getMainWindowState",
    /// Process CPU usage (invoke).
    GetCpuUsage => "getCPUUsage",
}

impl fmt::Display for ApiCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of surface a message originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SenderKind {
    /// Top-level window.
    Window,
    /// Embedded web view.
    View,
}

/// Handle of the window or view a message originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderRef {
    /// Surface kind.
    pub kind: SenderKind,
    /// Host-assigned identifier.
    pub id: u64,
}

impl SenderRef {
    /// Sender for a top-level window.
    pub fn window(id: u64) -> Self {
        Self {
            kind: SenderKind::Window,
            id,
        }
    }

    /// Sender for an embedded view.
    pub fn view(id: u64) -> Self {
        Self {
            kind: SenderKind::View,
            id,
        }
    }
}

impl fmt::Display for SenderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SenderKind::Window => write!(f, "window#{}", self.id),
            SenderKind::View => write!(f, "view#{}", self.id),
        }
    }
}

/// Tagged message received from a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Resolved command tag.
    pub cmd: ApiCmd,
    /// Remaining command-specific fields (`cmd` removed).
    pub fields: Map<String, Value>,
}

impl InboundMessage {
    /// Builds a message from a tag and field map.
    pub fn new(cmd: ApiCmd, fields: Map<String, Value>) -> Self {
        Self { cmd, fields }
    }

    /// Parses a raw `{cmd, ...fields}` object.
    ///
    /// # Returns
    /// - `Ok(Some(_))` for a known tag.
    /// - `Ok(None)` when `cmd` is a string outside the closed tag set.
    ///
    /// # Errors
    /// Returns [`CoreError::MalformedMessage`] when the value is not an object
    /// or `cmd` is missing or not a string.
    pub fn parse(raw: Value) -> Result<Option<Self>, CoreError> {
        let Value::Object(mut fields) = raw else {
            return Err(CoreError::MalformedMessage(
                "message is not a JSON object".to_string(),
            ));
        };

        let tag = match fields.remove("cmd") {
            Some(Value::String(tag)) => tag,
            Some(_) => {
                return Err(CoreError::MalformedMessage(
                    "cmd is not a string".to_string(),
                ));
            }
            None => return Err(CoreError::MalformedMessage("cmd is missing".to_string())),
        };

        Ok(ApiCmd::from_tag(&tag).map(|cmd| Self { cmd, fields }))
    }

    /// Returns a string field.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Returns a boolean field.
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    /// Returns a numeric field.
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    /// Returns a non-negative integer field.
    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(Value::as_u64)
    }

    /// Returns an array field.
    pub fn array_field(&self, key: &str) -> Option<&Vec<Value>> {
        self.fields.get(key).and_then(Value::as_array)
    }

    /// Returns an object field.
    pub fn object_field(&self, key: &str) -> Option<&Map<String, Value>> {
        self.fields.get(key).and_then(Value::as_object)
    }

    /// Deserializes the whole field map into a typed struct.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when fields do not match `T`.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, CoreError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(CoreError::Codec)
    }
}

/// Capture result pushed to the requesting view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Status text (`success` or an error description).
    pub message: String,
    /// Base64 image bytes; absent for errors.
    pub data: Option<String>,
    /// Mime tag such as `image/png;base64`, or `ERROR`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl ImagePayload {
    /// Successful capture carrying base64 data of the given image format.
    pub fn success(data: impl Into<String>, format: &str) -> Self {
        Self {
            message: IMAGE_PAYLOAD_SUCCESS.to_string(),
            data: Some(data.into()),
            kind: format!("image/{format};base64"),
        }
    }

    /// Successful capture with an explicit mime tag from the editor window.
    pub fn success_with_type(data: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            message: IMAGE_PAYLOAD_SUCCESS.to_string(),
            data: Some(data.into()),
            kind: kind.into(),
        }
    }

    /// Failed or aborted capture.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            kind: IMAGE_PAYLOAD_ERROR_TYPE.to_string(),
        }
    }

    /// Returns `true` for `ERROR` payloads.
    pub fn is_error(&self) -> bool {
        self.kind == IMAGE_PAYLOAD_ERROR_TYPE
    }
}

/// Pixel dimensions of a captured image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Merged image emitted once by the snippet editor window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetUpload {
    /// Path of the capture the editor was seeded with.
    pub screen_snippet_path: String,
    /// `"<type>,<base64>"` pair, e.g. `data:image/png;base64,iVBOR...`.
    pub merged_image_data: String,
}

/// Error type for envelope validation and codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Envelope shape is not `{cmd: string, ...}`.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    /// JSON encoding/decoding error.
    #[error("message codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}
