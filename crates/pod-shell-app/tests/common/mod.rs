//! Shared fakes for app integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pod_shell_app::host::{
    AuxWindow, CpuUsage, ExternalShell, Host, MainWindowState, MediaAccess, MediaInfo, PipeAction,
    PipeBridge, PushChannel, SourceInfo, SystemAction, SystemActions, WindowAction, WindowRegistry,
};
use pod_shell_app::{
    AppError, DispatchSettings, Dispatcher, HostConfig, JsonConfigStore, LoginController,
    WindowCaptureHost,
};
use pod_shell_auth::{
    AuthError, AuthStatus, CredentialPrompt, Credentials, PodLoginFlow, ProbeTransport,
    ProxyCredentials,
};
use pod_shell_capture::{
    CaptureError, CapturePolicy, CaptureTool, PlatformFamily, ScreenSnippetSession, ToolExit,
    ToolInvocation,
};
use pod_shell_core::SenderRef;
use serde_json::Value;
use tokio::sync::oneshot;
use url::Url;

/// Main window id used by every harness.
pub const MAIN_WINDOW: u64 = 1;
/// View hosted by the main window.
pub const MAIN_VIEW: u64 = 10;

/// In-memory window registry recording every mutation.
#[derive(Default)]
pub struct FakeWindows {
    pub names: HashMap<String, u64>,
    pub views: HashMap<u64, u64>,
    pub handles: HashMap<u64, Vec<u8>>,
    pub state: MainWindowState,
    pub actions: Mutex<Vec<(u64, WindowAction)>>,
    pub opened: Mutex<Vec<AuxWindow>>,
    pub closed: Mutex<Vec<(String, String)>>,
    pub loaded: Mutex<Vec<String>>,
    pub trusted: Mutex<Vec<String>>,
    pub always_on_top: Mutex<bool>,
}

#[allow(dead_code)]
impl FakeWindows {
    pub fn standard() -> Self {
        let mut windows = Self::default();
        windows.names.insert("main".to_string(), MAIN_WINDOW);
        windows.names.insert("about".to_string(), 2);
        windows.views.insert(MAIN_VIEW, MAIN_WINDOW);
        windows.handles.insert(MAIN_WINDOW, vec![0x2a, 0, 0, 0]);
        windows
    }

    pub fn actions(&self) -> Vec<(u64, WindowAction)> {
        self.actions.lock().expect("actions lock").clone()
    }

    pub fn opened(&self) -> Vec<AuxWindow> {
        self.opened.lock().expect("opened lock").clone()
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().expect("loaded lock").clone()
    }

    pub fn trusted(&self) -> Vec<String> {
        self.trusted.lock().expect("trusted lock").clone()
    }

    /// Total number of recorded mutations of any kind.
    pub fn mutation_count(&self) -> usize {
        self.actions.lock().expect("actions lock").len()
            + self.opened.lock().expect("opened lock").len()
            + self.closed.lock().expect("closed lock").len()
            + self.loaded.lock().expect("loaded lock").len()
            + self.trusted.lock().expect("trusted lock").len()
    }
}

impl WindowRegistry for FakeWindows {
    fn is_tracked(&self, sender: &SenderRef) -> bool {
        self.window_of(sender).is_some()
    }

    fn window_of(&self, sender: &SenderRef) -> Option<u64> {
        match sender.kind {
            pod_shell_core::SenderKind::Window => self
                .names
                .values()
                .find(|window| **window == sender.id)
                .copied(),
            pod_shell_core::SenderKind::View => self.views.get(&sender.id).copied(),
        }
    }

    fn find_by_name(&self, name: &str) -> Option<u64> {
        self.names.get(name).copied()
    }

    fn main_window(&self) -> Option<u64> {
        Some(MAIN_WINDOW)
    }

    fn focused_window(&self) -> Option<u64> {
        Some(MAIN_WINDOW)
    }

    fn apply(&self, window: u64, action: WindowAction) {
        self.actions.lock().expect("actions lock").push((window, action));
    }

    fn main_window_state(&self) -> MainWindowState {
        self.state
    }

    fn native_handle(&self, window: u64) -> Option<Vec<u8>> {
        self.handles.get(&window).cloned()
    }

    fn load_main_view(&self, origin: &Url) {
        self.loaded.lock().expect("loaded lock").push(origin.to_string());
    }

    fn set_trusted_origin(&self, origin: &Url) {
        self.trusted.lock().expect("trusted lock").push(origin.to_string());
    }

    fn open_aux(&self, window: AuxWindow) {
        self.opened.lock().expect("opened lock").push(window);
    }

    fn close_aux(&self, window_type: &str, key: &str) {
        self.closed
            .lock()
            .expect("closed lock")
            .push((window_type.to_string(), key.to_string()));
    }

    fn close_all_aux(&self) {
        self.closed
            .lock()
            .expect("closed lock")
            .push(("*".to_string(), "*".to_string()));
    }

    fn always_on_top(&self) -> bool {
        *self.always_on_top.lock().expect("aot lock")
    }

    fn set_always_on_top(&self, enabled: bool) {
        *self.always_on_top.lock().expect("aot lock") = enabled;
    }
}

/// Records pushes, browser opens, pipe actions, and system actions.
#[derive(Default)]
pub struct Recorder {
    pub pushes: Mutex<Vec<(SenderRef, String, Value)>>,
    pub external: Mutex<Vec<String>>,
    pub pipes: Mutex<Vec<(SenderRef, PipeAction)>>,
    pub system: Mutex<Vec<SystemAction>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn pushes(&self) -> Vec<(SenderRef, String, Value)> {
        self.pushes.lock().expect("pushes lock").clone()
    }

    pub fn external(&self) -> Vec<String> {
        self.external.lock().expect("external lock").clone()
    }

    pub fn pipes(&self) -> Vec<(SenderRef, PipeAction)> {
        self.pipes.lock().expect("pipes lock").clone()
    }

    pub fn system(&self) -> Vec<SystemAction> {
        self.system.lock().expect("system lock").clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.pushes().len() + self.external().len() + self.pipes().len() + self.system().len()
    }
}

impl PushChannel for Recorder {
    fn push(&self, target: SenderRef, channel: &str, payload: Value) {
        self.pushes
            .lock()
            .expect("pushes lock")
            .push((target, channel.to_string(), payload));
    }
}

impl ExternalShell for Recorder {
    fn open_external(&self, url: &Url) -> Result<(), AppError> {
        self.external.lock().expect("external lock").push(url.to_string());
        Ok(())
    }
}

impl PipeBridge for Recorder {
    fn perform(&self, sender: SenderRef, action: PipeAction) {
        self.pipes.lock().expect("pipes lock").push((sender, action));
    }
}

impl SystemActions for Recorder {
    fn perform(&self, action: SystemAction) {
        self.system.lock().expect("system lock").push(action);
    }
}

impl MediaInfo for Recorder {
    fn media_access(&self) -> MediaAccess {
        MediaAccess {
            camera: "granted".to_string(),
            microphone: "denied".to_string(),
            screen: "granted".to_string(),
        }
    }

    fn sources(&self, types: &[String], with_thumbnails: bool) -> Vec<SourceInfo> {
        types
            .iter()
            .map(|kind| SourceInfo {
                id: format!("{kind}:0"),
                name: format!("{kind} zero"),
                display_id: "0".to_string(),
                thumbnail: with_thumbnails.then(|| "aGVsbG8=".to_string()),
            })
            .collect()
    }

    fn citrix_media_redirection_status(&self) -> String {
        "unsupported".to_string()
    }

    fn cpu_usage(&self) -> CpuUsage {
        CpuUsage {
            percent_cpu_usage: 12.5,
            idle_wakeups_per_second: 3,
        }
    }
}

/// Probe answering with a fixed authentication type.
pub struct FixedProbe(pub &'static str);

#[async_trait::async_trait]
impl ProbeTransport for FixedProbe {
    async fn check_auth(
        &self,
        _url: &Url,
        _proxy: Option<&ProxyCredentials>,
    ) -> Result<AuthStatus, AuthError> {
        Ok(AuthStatus {
            authentication_type: Some(self.0.to_string()),
        })
    }
}

/// Proxy that rejects every auth check, with or without credentials.
#[allow(dead_code)]
pub struct ProxyWall;

#[async_trait::async_trait]
impl ProbeTransport for ProxyWall {
    async fn check_auth(
        &self,
        _url: &Url,
        _proxy: Option<&ProxyCredentials>,
    ) -> Result<AuthStatus, AuthError> {
        Err(AuthError::ProxyAuthRejected {
            proxy_host: Some("proxy.corp.test".to_string()),
        })
    }
}

/// Encoded PNG of the given size.
#[allow(dead_code)]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbImage::new(width, height)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

/// Prompt that is never answered.
pub struct NoPrompt;

#[async_trait::async_trait]
impl CredentialPrompt for NoPrompt {
    async fn request_credentials(&self, _hostname: &str, _is_retry: bool) -> Option<Credentials> {
        None
    }
}

/// Capture tool that writes fixed bytes, or waits until killed.
pub struct BytesTool(pub Option<Vec<u8>>);

#[async_trait::async_trait]
impl CaptureTool for BytesTool {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        kill: oneshot::Receiver<()>,
    ) -> Result<ToolExit, CaptureError> {
        match (&self.0, invocation.args.last()) {
            (Some(bytes), Some(output)) => {
                std::fs::write(output, bytes).expect("fake tool writes output");
                Ok(ToolExit::Exited { code: Some(0) })
            }
            _ => {
                let _ = kill.await;
                Ok(ToolExit::Killed)
            }
        }
    }
}

/// Dispatcher wired to fakes.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub windows: Arc<FakeWindows>,
    pub recorder: Arc<Recorder>,
    _temp: tempfile::TempDir,
}

/// Options for [`harness_with`].
pub struct HarnessOptions {
    pub auth_type: &'static str,
    pub user_config: HostConfig,
    pub global_config: HostConfig,
    pub cli_url: Option<String>,
    pub capture_bytes: Option<Vec<u8>>,
    pub capture_enabled: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            auth_type: "password",
            user_config: HostConfig::default(),
            global_config: HostConfig::default(),
            cli_url: None,
            capture_bytes: Some(b"\x89PNG fake".to_vec()),
            capture_enabled: true,
        }
    }
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(HarnessOptions::default())
}

pub fn harness_with(options: HarnessOptions) -> Harness {
    let windows = Arc::new(FakeWindows::standard());
    let recorder = Arc::new(Recorder::default());
    let config = Arc::new(JsonConfigStore::new(
        options.user_config,
        options.global_config,
    ));
    let host = Host {
        windows: windows.clone(),
        config,
        push: recorder.clone(),
        shell: recorder.clone(),
        pipes: recorder.clone(),
        media: recorder.clone(),
        system: recorder.clone(),
    };

    let temp = tempfile::tempdir().expect("temp dir");
    let capture = Arc::new(
        ScreenSnippetSession::new(
            temp.path(),
            CapturePolicy::for_platform(PlatformFamily::Linux),
            Arc::new(BytesTool(options.capture_bytes)),
            Arc::new(WindowCaptureHost::new(windows.clone(), recorder.clone())),
        )
        .expect("capture session"),
    );

    let flow = Arc::new(PodLoginFlow::new(
        Arc::new(FixedProbe(options.auth_type)),
        Arc::new(NoPrompt),
    ));
    let login = LoginController::new(flow, &host, options.cli_url);

    let dispatcher = Dispatcher::new(
        host,
        capture,
        login,
        DispatchSettings {
            capture_enabled: options.capture_enabled,
        },
    );

    Harness {
        dispatcher,
        windows,
        recorder,
        _temp: temp,
    }
}

#[allow(dead_code)]
pub fn main_view() -> SenderRef {
    SenderRef::view(MAIN_VIEW)
}
