//! Shared fakes for capture session integration tests.

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pod_shell_capture::{
    CaptureError, CaptureHost, CapturePolicy, CaptureTool, PlatformFamily, ScreenSnippetSession,
    ToolExit, ToolInvocation,
};
use pod_shell_core::{ImageDimensions, ImagePayload, SenderRef};
use tokio::sync::{Notify, oneshot};

/// What the fake tool does on one run.
#[allow(dead_code)]
pub enum ToolBehavior {
    /// Writes these bytes to the output path and exits 0.
    WriteFile(Vec<u8>),
    /// Exits 1 without writing anything.
    WriteNothing,
    /// Blocks until killed.
    WaitForKill,
}

/// Scripted capture tool recording spawn/kill ordering.
pub struct FakeTool {
    behaviors: Mutex<VecDeque<ToolBehavior>>,
    pub events: Mutex<Vec<String>>,
    pub invocations: Mutex<Vec<ToolInvocation>>,
    pub spawned: Notify,
}

#[allow(dead_code)]
impl FakeTool {
    pub fn scripted(behaviors: Vec<ToolBehavior>) -> Self {
        Self {
            behaviors: Mutex::new(behaviors.into()),
            events: Mutex::new(Vec::new()),
            invocations: Mutex::new(Vec::new()),
            spawned: Notify::new(),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().expect("invocations lock").clone()
    }

    fn record(&self, event: String) {
        self.events.lock().expect("events lock").push(event);
    }
}

#[async_trait::async_trait]
impl CaptureTool for FakeTool {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        kill: oneshot::Receiver<()>,
    ) -> Result<ToolExit, CaptureError> {
        let run = {
            let mut invocations = self.invocations.lock().expect("invocations lock");
            invocations.push(invocation.clone());
            invocations.len()
        };
        self.record(format!("spawn:{run}"));
        self.spawned.notify_one();

        let behavior = self
            .behaviors
            .lock()
            .expect("behaviors lock")
            .pop_front()
            .unwrap_or(ToolBehavior::WriteNothing);

        match behavior {
            ToolBehavior::WriteFile(bytes) => {
                let output = invocation.args.last().expect("output path argument");
                std::fs::write(output, bytes).expect("fake tool writes output");
                self.record(format!("exited:{run}"));
                Ok(ToolExit::Exited { code: Some(0) })
            }
            ToolBehavior::WriteNothing => {
                self.record(format!("exited:{run}"));
                Ok(ToolExit::Exited { code: Some(1) })
            }
            ToolBehavior::WaitForKill => {
                let _ = kill.await;
                self.record(format!("killed:{run}"));
                Ok(ToolExit::Killed)
            }
        }
    }
}

/// Window-side fake recording every collaborator call.
pub struct FakeHost {
    pub always_on_top: Mutex<bool>,
    pub always_on_top_history: Mutex<Vec<bool>>,
    pub focused: Option<u64>,
    pub refocused: Mutex<Vec<u64>>,
    pub editors: Mutex<Vec<(PathBuf, ImageDimensions)>>,
    pub editor_opened: Notify,
    pub delivered: Mutex<Vec<(SenderRef, ImagePayload)>>,
}

#[allow(dead_code)]
impl FakeHost {
    pub fn new(always_on_top: bool, focused: Option<u64>) -> Self {
        Self {
            always_on_top: Mutex::new(always_on_top),
            always_on_top_history: Mutex::new(Vec::new()),
            focused,
            refocused: Mutex::new(Vec::new()),
            editors: Mutex::new(Vec::new()),
            editor_opened: Notify::new(),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<(SenderRef, ImagePayload)> {
        self.delivered.lock().expect("delivered lock").clone()
    }

    pub fn always_on_top_now(&self) -> bool {
        *self.always_on_top.lock().expect("aot lock")
    }

    pub fn always_on_top_history(&self) -> Vec<bool> {
        self.always_on_top_history.lock().expect("history lock").clone()
    }

    pub fn refocused(&self) -> Vec<u64> {
        self.refocused.lock().expect("refocus lock").clone()
    }

    pub fn editors(&self) -> Vec<(PathBuf, ImageDimensions)> {
        self.editors.lock().expect("editors lock").clone()
    }
}

impl CaptureHost for FakeHost {
    fn always_on_top(&self) -> bool {
        self.always_on_top_now()
    }

    fn set_always_on_top(&self, enabled: bool) {
        *self.always_on_top.lock().expect("aot lock") = enabled;
        self.always_on_top_history
            .lock()
            .expect("history lock")
            .push(enabled);
    }

    fn focused_window(&self) -> Option<u64> {
        self.focused
    }

    fn refocus(&self, window: u64) {
        self.refocused.lock().expect("refocus lock").push(window);
    }

    fn open_snippet_editor(&self, image: &Path, dimensions: ImageDimensions) {
        self.editors
            .lock()
            .expect("editors lock")
            .push((image.to_path_buf(), dimensions));
        self.editor_opened.notify_one();
    }

    fn deliver(&self, target: SenderRef, payload: ImagePayload) {
        self.delivered
            .lock()
            .expect("delivered lock")
            .push((target, payload));
    }
}

/// Builds a session over fakes in a fresh temp directory.
#[allow(dead_code)]
pub fn session(
    platform: PlatformFamily,
    tool: Arc<FakeTool>,
    host: Arc<FakeHost>,
) -> (tempfile::TempDir, ScreenSnippetSession) {
    let temp = tempfile::tempdir().expect("temp dir");
    let session = ScreenSnippetSession::new(
        temp.path(),
        CapturePolicy::for_platform(platform),
        tool,
        host,
    )
    .expect("session builds");
    (temp, session)
}

/// Encodes a small RGBA image as PNG bytes.
#[allow(dead_code)]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("png encodes");
    buffer.into_inner()
}

/// Number of files left in a directory.
#[allow(dead_code)]
pub fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read temp dir").count()
}
