//! Capture tool backed by a real child process.

use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::{CaptureError, CaptureTool, ToolExit, ToolInvocation};

/// Runs the capture tool through `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCaptureTool;

impl ProcessCaptureTool {
    /// Creates the process-backed tool.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CaptureTool for ProcessCaptureTool {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        kill: oneshot::Receiver<()>,
    ) -> Result<ToolExit, CaptureError> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        command.kill_on_drop(true);
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());

        let mut child = command.spawn().map_err(|error| {
            warn!(
                program = %invocation.program.display(),
                error = %error,
                "failed to spawn capture tool"
            );
            CaptureError::Spawn(error.to_string())
        })?;
        let child_pid = child.id();
        info!(
            program = %invocation.program.display(),
            child_pid = ?child_pid,
            "capture tool spawned"
        );

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|error| CaptureError::Wait(error.to_string()))?;
                debug!(child_pid = ?child_pid, code = ?status.code(), "capture tool exited");
                Ok(ToolExit::Exited { code: status.code() })
            }
            _ = kill => {
                if let Err(error) = child.start_kill() {
                    warn!(child_pid = ?child_pid, error = %error, "capture tool kill failed");
                }
                let _ = child.wait().await;
                info!(child_pid = ?child_pid, "capture tool terminated");
                Ok(ToolExit::Killed)
            }
        }
    }
}
