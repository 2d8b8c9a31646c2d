//! Capture session collaborators backed by the window registry.

use std::path::Path;
use std::sync::Arc;

use pod_shell_capture::CaptureHost;
use pod_shell_core::{ImageDimensions, ImagePayload, SenderRef};
use tracing::warn;

use crate::host::{AuxWindow, PushChannel, WindowAction, WindowRegistry};

/// Push channel carrying capture results.
pub const SCREEN_SNIPPET_CHANNEL: &str = "screen-snippet-data";

/// [`CaptureHost`] over the app's window registry and push channel.
#[derive(Clone)]
pub struct WindowCaptureHost {
    windows: Arc<dyn WindowRegistry>,
    push: Arc<dyn PushChannel>,
}

impl WindowCaptureHost {
    /// Creates the adapter.
    pub fn new(windows: Arc<dyn WindowRegistry>, push: Arc<dyn PushChannel>) -> Self {
        Self { windows, push }
    }
}

impl CaptureHost for WindowCaptureHost {
    fn always_on_top(&self) -> bool {
        self.windows.always_on_top()
    }

    fn set_always_on_top(&self, enabled: bool) {
        self.windows.set_always_on_top(enabled);
    }

    fn focused_window(&self) -> Option<u64> {
        self.windows.focused_window()
    }

    fn refocus(&self, window: u64) {
        self.windows.apply(window, WindowAction::Focus);
    }

    fn open_snippet_editor(&self, image: &Path, dimensions: ImageDimensions) {
        self.windows.open_aux(AuxWindow::SnippetEditor {
            image: image.to_path_buf(),
            dimensions,
        });
    }

    fn deliver(&self, target: SenderRef, payload: ImagePayload) {
        match serde_json::to_value(&payload) {
            Ok(payload) => self.push.push(target, SCREEN_SNIPPET_CHANNEL, payload),
            Err(error) => {
                warn!(target = %target, error = %error, "capture payload not serializable");
            }
        }
    }
}
