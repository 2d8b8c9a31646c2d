//! Single-slot screen capture session.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use base64::Engine as _;
use pod_shell_core::{ImageDimensions, ImagePayload, SenderRef, SnippetUpload};
use time::OffsetDateTime;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::{
    CAPTURE_FILE_PREFIX, CAPTURE_IMAGE_FORMAT, CaptureError, CaptureHost, CapturePolicy,
    CaptureTool, ToolExit, split_merged_image,
};

/// Observable session fields, for status queries and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSnapshot {
    /// Output file of the active capture.
    pub output_file: Option<PathBuf>,
    /// Tool arguments of the active capture.
    pub tool_args: Option<Vec<String>>,
    /// Whether a tool process is live.
    pub tool_running: bool,
    /// Whether the editor window hand-off is outstanding.
    pub awaiting_editor: bool,
    /// Window that held focus when the capture started.
    pub focused_window: Option<u64>,
    /// Whether always-on-top must be re-enabled after the capture.
    pub pending_always_on_top_restore: bool,
}

#[derive(Default)]
struct SessionState {
    generation: u64,
    output_file: Option<PathBuf>,
    tool_args: Option<Vec<String>>,
    running: Option<RunningTool>,
    editor: Option<EditorRegistration>,
    focused_window: Option<u64>,
    pending_always_on_top_restore: bool,
    closed: bool,
}

struct RunningTool {
    generation: u64,
    kill: oneshot::Sender<()>,
    finished: oneshot::Receiver<()>,
}

struct EditorRegistration {
    generation: u64,
    output: PathBuf,
    upload: oneshot::Sender<SnippetUpload>,
}

/// Owns at most one live capture tool invocation.
///
/// Starting a capture while another is running terminates the running tool
/// and waits for it to exit before the new tool is spawned.
pub struct ScreenSnippetSession {
    temp_dir: PathBuf,
    policy: CapturePolicy,
    tool: Arc<dyn CaptureTool>,
    host: Arc<dyn CaptureHost>,
    state: Mutex<SessionState>,
    sequence: AtomicU64,
}

impl ScreenSnippetSession {
    /// Creates a session writing captures under `temp_dir`.
    ///
    /// # Errors
    /// Returns [`CaptureError::Unreadable`] when the temp directory cannot be
    /// created.
    pub fn new(
        temp_dir: impl Into<PathBuf>,
        policy: CapturePolicy,
        tool: Arc<dyn CaptureTool>,
        host: Arc<dyn CaptureHost>,
    ) -> Result<Self, CaptureError> {
        let temp_dir = temp_dir.into();
        std::fs::create_dir_all(&temp_dir).map_err(|error| {
            CaptureError::Unreadable(format!(
                "cannot create temp dir {}: {error}",
                temp_dir.display()
            ))
        })?;

        Ok(Self {
            temp_dir,
            policy,
            tool,
            host,
            state: Mutex::new(SessionState::default()),
            sequence: AtomicU64::new(0),
        })
    }

    /// Active platform policy.
    pub fn policy(&self) -> &CapturePolicy {
        &self.policy
    }

    /// Returns `true` while a capture tool is live.
    pub fn is_capturing(&self) -> bool {
        self.lock_state().running.is_some()
    }

    /// Current session fields.
    pub fn snapshot(&self) -> CaptureSnapshot {
        let state = self.lock_state();
        CaptureSnapshot {
            output_file: state.output_file.clone(),
            tool_args: state.tool_args.clone(),
            tool_running: state.running.is_some(),
            awaiting_editor: state.editor.is_some(),
            focused_window: state.focused_window,
            pending_always_on_top_restore: state.pending_always_on_top_restore,
        }
    }

    /// Captures a screen region and delivers the result to `target`.
    ///
    /// Never fails: errors become an `ERROR` payload, or are dropped when a
    /// newer capture replaced this one.
    pub async fn capture(&self, target: SenderRef) {
        let (generation, previous) = {
            let mut state = self.lock_state();
            if state.closed {
                debug!(target = %target, "capture requested after shutdown");
                return;
            }
            state.generation = state.generation.wrapping_add(1);
            state.editor = None;
            (state.generation, state.running.take())
        };

        if let Some(previous) = previous {
            info!(
                previous = previous.generation,
                next = generation,
                "terminating running capture tool before new capture"
            );
            let _ = previous.kill.send(());
            let _ = previous.finished.await;
        }

        let output = self.next_output_path();
        let invocation = self.policy.capture_invocation(&output);
        let (kill_tx, kill_rx) = oneshot::channel();
        let (finished_tx, finished_rx) = oneshot::channel();
        let running = RunningTool {
            generation,
            kill: kill_tx,
            finished: finished_rx,
        };

        let Some(mut guard) =
            CaptureGuard::acquire(self, generation, output, &invocation.args, running)
        else {
            debug!(generation, "capture superseded before it started");
            return;
        };

        info!(
            generation,
            target = %target,
            output = %guard.output.display(),
            "starting screen capture"
        );
        let exit = self.tool.run(&invocation, kill_rx).await;
        let _ = finished_tx.send(());
        guard.release_tool();
        guard.restore_window_state();

        let result = match exit {
            Ok(ToolExit::Exited { code }) => {
                debug!(generation, code = ?code, "capture tool finished");
                self.collect(&guard).await
            }
            Ok(ToolExit::Killed) => Err(CaptureError::Killed),
            Err(error) => Err(error),
        };

        match result {
            Ok(Some(payload)) => {
                info!(generation, kind = %payload.kind, "delivering screen capture");
                self.host.deliver(target, payload);
            }
            Ok(None) => debug!(generation, "screen capture produced no delivery"),
            Err(error) if guard.is_superseded() => {
                debug!(generation, error = %error, "superseded capture dropped");
            }
            Err(error) => {
                warn!(generation, error = %error, "screen capture failed");
                self.host.deliver(target, ImagePayload::error(error.to_string()));
            }
        }
    }

    /// Cancels the active capture through the tool's cancel invocation and
    /// restores always-on-top. No-op where the platform cannot cancel.
    pub async fn cancel_capture(&self) {
        let Some(invocation) = self.policy.cancel_invocation() else {
            debug!(platform = ?self.policy.platform, "capture cancel not supported");
            return;
        };

        let (kill_tx, kill_rx) = oneshot::channel();
        match self.tool.run(&invocation, kill_rx).await {
            Ok(exit) => debug!(exit = ?exit, "capture cancel signalled"),
            Err(error) => warn!(error = %error, "capture cancel failed"),
        }
        drop(kill_tx);

        let restore = std::mem::take(&mut self.lock_state().pending_always_on_top_restore);
        if restore {
            self.host.set_always_on_top(true);
        }
    }

    /// Terminates the live tool process, if any. Returns `true` when a
    /// process was signalled.
    pub fn kill_child_process(&self) -> bool {
        let running = self.lock_state().running.take();
        match running {
            Some(running) => {
                info!(generation = running.generation, "killing capture tool");
                let _ = running.kill.send(());
                true
            }
            None => false,
        }
    }

    /// Ends the session: kills the live tool, abandons an outstanding editor
    /// hand-off and refuses later captures. Returns `true` when a running
    /// capture was interrupted.
    pub fn shutdown(&self) -> bool {
        let (running, editor) = {
            let mut state = self.lock_state();
            state.closed = true;
            (state.running.take(), state.editor.take())
        };

        if let Some(editor) = &editor {
            info!(generation = editor.generation, "abandoning snippet editor hand-off");
        }
        let killed = running.map(|running| {
            info!(generation = running.generation, "killing capture tool at shutdown");
            let _ = running.kill.send(());
        });
        killed.is_some() || editor.is_some()
    }

    /// Accepts the editor window's merged image. Fires at most once per
    /// capture; returns `false` when nothing was waiting for this path.
    pub fn complete_editor_upload(&self, upload: SnippetUpload) -> bool {
        let registration = {
            let mut state = self.lock_state();
            match state.editor.take() {
                Some(registration)
                    if Path::new(&upload.screen_snippet_path) == registration.output =>
                {
                    registration
                }
                Some(registration) => {
                    warn!("snippet upload does not match the active capture");
                    state.editor = Some(registration);
                    return false;
                }
                None => {
                    debug!("snippet upload arrived with no capture waiting");
                    return false;
                }
            }
        };

        registration.upload.send(upload).is_ok()
    }

    async fn collect(
        &self,
        guard: &CaptureGuard<'_>,
    ) -> Result<Option<ImagePayload>, CaptureError> {
        if self.policy.platform.uses_editor_handoff() {
            tokio::fs::metadata(&guard.output)
                .await
                .map_err(output_error)?;
            return self.hand_off_to_editor(guard).await;
        }

        let bytes = tokio::fs::read(&guard.output).await.map_err(output_error)?;
        let data = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(Some(ImagePayload::success(data, CAPTURE_IMAGE_FORMAT)))
    }

    async fn hand_off_to_editor(
        &self,
        guard: &CaptureGuard<'_>,
    ) -> Result<Option<ImagePayload>, CaptureError> {
        let (width, height) = image::image_dimensions(&guard.output)
            .map_err(|error| CaptureError::Unreadable(error.to_string()))?;

        let (upload_tx, upload_rx) = oneshot::channel();
        {
            let mut state = self.lock_state();
            if state.closed || state.generation != guard.generation {
                return Ok(None);
            }
            state.editor = Some(EditorRegistration {
                generation: guard.generation,
                output: guard.output.clone(),
                upload: upload_tx,
            });
        }

        self.host
            .open_snippet_editor(&guard.output, ImageDimensions { width, height });
        let Ok(upload) = upload_rx.await else {
            info!(generation = guard.generation, "snippet editor closed without upload");
            return Ok(None);
        };

        let (kind, data) = split_merged_image(&upload.merged_image_data)?;
        Ok(Some(ImagePayload::success_with_type(data, kind)))
    }

    fn next_output_path(&self) -> PathBuf {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.temp_dir.join(format!(
            "{CAPTURE_FILE_PREFIX}{}-{sequence}.{CAPTURE_IMAGE_FORMAT}",
            timestamp_compact_utc()
        ))
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Per-capture cleanup: restores window state and deletes the temp file on
/// every exit path, including cancellation of the capture future.
struct CaptureGuard<'a> {
    session: &'a ScreenSnippetSession,
    generation: u64,
    output: PathBuf,
    window_state_restored: bool,
}

impl<'a> CaptureGuard<'a> {
    fn acquire(
        session: &'a ScreenSnippetSession,
        generation: u64,
        output: PathBuf,
        args: &[String],
        running: RunningTool,
    ) -> Option<Self> {
        let mut state = session.lock_state();
        if state.closed || state.generation != generation {
            return None;
        }

        state.output_file = Some(output.clone());
        state.tool_args = Some(args.to_vec());
        state.running = Some(running);

        // A superseded capture hands its focus and always-on-top duties over.
        if state.focused_window.is_none() {
            state.focused_window = session.host.focused_window();
        }
        if !state.pending_always_on_top_restore && session.host.always_on_top() {
            session.host.set_always_on_top(false);
            state.pending_always_on_top_restore = true;
        }

        Some(Self {
            session,
            generation,
            output,
            window_state_restored: false,
        })
    }

    fn is_superseded(&self) -> bool {
        self.session.lock_state().generation != self.generation
    }

    fn release_tool(&self) {
        let mut state = self.session.lock_state();
        if state
            .running
            .as_ref()
            .is_some_and(|running| running.generation == self.generation)
        {
            state.running = None;
        }
    }

    fn restore_window_state(&mut self) {
        if self.window_state_restored {
            return;
        }
        self.window_state_restored = true;

        let (restore, focused) = {
            let mut state = self.session.lock_state();
            if state.generation != self.generation {
                return;
            }
            (
                std::mem::take(&mut state.pending_always_on_top_restore),
                state.focused_window.take(),
            )
        };

        if restore {
            self.session.host.set_always_on_top(true);
        }
        if let Some(window) = focused {
            self.session.host.refocus(window);
        }
    }
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.release_tool();
        self.restore_window_state();

        if let Err(error) = std::fs::remove_file(&self.output)
            && error.kind() != ErrorKind::NotFound
        {
            warn!(
                output = %self.output.display(),
                error = %error,
                "failed to delete capture file"
            );
        }

        let mut state = self.session.lock_state();
        if state.generation == self.generation {
            state.output_file = None;
            state.tool_args = None;
        }
        if state
            .editor
            .as_ref()
            .is_some_and(|editor| editor.generation == self.generation)
        {
            state.editor = None;
        }
    }
}

fn output_error(error: std::io::Error) -> CaptureError {
    if error.kind() == ErrorKind::NotFound {
        CaptureError::MissingOutput("capture tool produced no image".to_string())
    } else {
        CaptureError::Unreadable(error.to_string())
    }
}

fn timestamp_compact_utc() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}_{:03}",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.millisecond()
    )
}
