//! Sender validation.

use std::sync::Arc;

use pod_shell_core::SenderRef;
use tracing::error;

use crate::host::WindowRegistry;

/// Accepts only senders the host created and still tracks.
#[derive(Clone)]
pub struct SenderValidator {
    windows: Arc<dyn WindowRegistry>,
}

impl SenderValidator {
    /// Creates a validator over the window registry.
    pub fn new(windows: Arc<dyn WindowRegistry>) -> Self {
        Self { windows }
    }

    /// Returns `true` when `sender` is tracked. Logs the rejected command tag
    /// otherwise.
    pub fn is_valid(&self, sender: &SenderRef, cmd: &str) -> bool {
        if self.windows.is_tracked(sender) {
            return true;
        }

        error!(sender = %sender, cmd, "rejected message from untracked sender");
        false
    }
}
