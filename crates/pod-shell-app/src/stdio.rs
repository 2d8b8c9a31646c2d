//! Newline-delimited JSON host used by the `pod-shell` binary.
//!
//! The embedding shell writes one [`Inbound`] object per line to stdin and
//! reads one [`Outbound`] object per line from stdout. Collaborators without a
//! native implementation in this layer (windows, notifications, pipes) are
//! surfaced as outbound events; queries are answered from the last
//! [`HostState`] the shell reported.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use pod_shell_auth::{CredentialPrompt, Credentials};
use pod_shell_core::{SenderKind, SenderRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::AppError;
use crate::config::ConfigStore;
use crate::dispatch::Dispatcher;
use crate::host::{
    AuxWindow, CpuUsage, ExternalShell, Host, MainWindowState, MediaAccess, MediaInfo,
    PipeAction, PipeBridge, PushChannel, SourceInfo, SystemAction, SystemActions, WindowAction,
    WindowRegistry,
};

/// One window the shell created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedWindow {
    /// Window id.
    pub id: u64,
    /// Registered window name.
    pub name: String,
    /// Views hosted by the window.
    #[serde(default)]
    pub views: Vec<u64>,
    /// Platform handle bytes.
    #[serde(default)]
    pub native_handle: Option<Vec<u8>>,
}

/// Shell-reported state used to answer registry and media queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostState {
    /// Windows and their views.
    pub windows: Vec<TrackedWindow>,
    /// Main window id.
    pub main_window: Option<u64>,
    /// Focused window id.
    pub focused_window: Option<u64>,
    /// Main window state.
    pub main_window_state: MainWindowState,
    /// Media permission status.
    pub media_access: MediaAccess,
    /// Capturable sources.
    pub sources: Vec<SourceInfo>,
    /// Citrix media redirection status.
    pub citrix_status: String,
    /// CPU usage sample.
    pub cpu_usage: CpuUsage,
}

/// Lines read from the embedding shell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inbound {
    /// Fire-and-forget renderer message.
    Send {
        /// Originating window or view.
        sender: SenderRef,
        /// `{cmd, ...fields}`.
        message: Value,
    },
    /// Request/response renderer message.
    Invoke {
        /// Correlation id echoed in the result.
        id: u64,
        /// Originating window or view.
        sender: SenderRef,
        /// `{cmd, ...fields}`.
        message: Value,
    },
    /// Proxy credentials entered by the user.
    Credentials {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// The credential dialog was closed without input.
    CredentialsDismissed,
    /// Replaces the shell-reported state.
    HostState {
        /// New state.
        state: HostState,
    },
}

/// Lines written to the embedding shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outbound {
    /// Push to a view.
    Push {
        /// Receiving view.
        target: SenderRef,
        /// Channel name.
        channel: String,
        /// Payload.
        payload: Value,
    },
    /// Answer to an [`Inbound::Invoke`].
    InvokeResult {
        /// Correlation id.
        id: u64,
        /// Result, `null` when the request produced none.
        result: Option<Value>,
    },
    /// Window action.
    Window {
        /// Target window.
        window: u64,
        /// Action.
        action: WindowAction,
    },
    /// Load the pod into the main view.
    LoadMainView {
        /// Origin URL.
        origin: String,
    },
    /// Origin the main view may navigate within.
    TrustedOrigin {
        /// Origin URL.
        origin: String,
    },
    /// Open an auxiliary window.
    OpenWindow {
        /// Window description.
        window: AuxWindow,
    },
    /// Close one auxiliary window.
    #[serde(rename_all = "camelCase")]
    CloseWindow {
        /// Window type.
        window_type: String,
        /// Window key.
        key: String,
    },
    /// Close every auxiliary window.
    CloseAllWindows,
    /// Main window always-on-top changed.
    AlwaysOnTop {
        /// New setting.
        enabled: bool,
    },
    /// Pipe/shell session action.
    Pipe {
        /// Requesting view.
        sender: SenderRef,
        /// Action.
        action: PipeAction,
    },
    /// Other host side effect.
    System {
        /// Action.
        action: SystemAction,
    },
    /// Ask the user for proxy credentials.
    #[serde(rename_all = "camelCase")]
    CredentialsRequired {
        /// Host the credentials are for.
        hostname: String,
        /// A previous answer was rejected.
        is_retry: bool,
    },
}

/// Outstanding credential prompt; closed once input has ended.
#[derive(Default)]
struct CredentialSlot {
    waiting: Option<oneshot::Sender<Option<Credentials>>>,
    closed: bool,
}

/// Collaborator implementation talking to the embedding shell.
pub struct StdioHost {
    state: Mutex<HostState>,
    always_on_top: AtomicBool,
    outbound: mpsc::UnboundedSender<Outbound>,
    credentials: Mutex<CredentialSlot>,
}

impl StdioHost {
    /// Creates the host and the receiving end of its outbound events.
    pub fn new(always_on_top: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let host = Arc::new(Self {
            state: Mutex::new(HostState::default()),
            always_on_top: AtomicBool::new(always_on_top),
            outbound,
            credentials: Mutex::new(CredentialSlot::default()),
        });
        (host, receiver)
    }

    /// Bundles this host as every collaborator except configuration and the
    /// system browser.
    pub fn collaborators(
        self: &Arc<Self>,
        config: Arc<dyn ConfigStore>,
        shell: Arc<dyn ExternalShell>,
    ) -> Host {
        Host {
            windows: self.clone(),
            config,
            push: self.clone(),
            shell,
            pipes: self.clone(),
            media: self.clone(),
            system: self.clone(),
        }
    }

    /// Replaces the shell-reported state.
    pub fn update_state(&self, state: HostState) {
        debug!(windows = state.windows.len(), "host state updated");
        *self.lock_state() = state;
    }

    /// Answers the outstanding credential prompt. Returns `false` when no
    /// prompt was waiting.
    pub fn supply_credentials(&self, answer: Option<Credentials>) -> bool {
        let waiting = self.lock_credentials().waiting.take();
        match waiting {
            Some(waiting) => waiting.send(answer).is_ok(),
            None => false,
        }
    }

    /// Dismisses the outstanding prompt and answers every later prompt with
    /// `None`. Called once the shell has closed its input.
    pub fn close_prompts(&self) {
        let waiting = {
            let mut slot = self.lock_credentials();
            slot.closed = true;
            slot.waiting.take()
        };
        if let Some(waiting) = waiting {
            debug!("dismissing credential prompt at shutdown");
            let _ = waiting.send(None);
        }
    }

    fn lock_credentials(&self) -> MutexGuard<'_, CredentialSlot> {
        self.credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: Outbound) {
        if self.outbound.send(event).is_err() {
            debug!("outbound channel closed, event dropped");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, HostState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WindowRegistry for StdioHost {
    fn is_tracked(&self, sender: &SenderRef) -> bool {
        self.window_of(sender).is_some()
    }

    fn window_of(&self, sender: &SenderRef) -> Option<u64> {
        let state = self.lock_state();
        let window = state.windows.iter().find(|window| match sender.kind {
            SenderKind::Window => window.id == sender.id,
            SenderKind::View => window.views.contains(&sender.id),
        })?;
        Some(window.id)
    }

    fn find_by_name(&self, name: &str) -> Option<u64> {
        self.lock_state()
            .windows
            .iter()
            .find(|window| window.name == name)
            .map(|window| window.id)
    }

    fn main_window(&self) -> Option<u64> {
        self.lock_state().main_window
    }

    fn focused_window(&self) -> Option<u64> {
        self.lock_state().focused_window
    }

    fn apply(&self, window: u64, action: WindowAction) {
        self.emit(Outbound::Window { window, action });
    }

    fn main_window_state(&self) -> MainWindowState {
        self.lock_state().main_window_state
    }

    fn native_handle(&self, window: u64) -> Option<Vec<u8>> {
        self.lock_state()
            .windows
            .iter()
            .find(|tracked| tracked.id == window)
            .and_then(|tracked| tracked.native_handle.clone())
    }

    fn load_main_view(&self, origin: &Url) {
        self.emit(Outbound::LoadMainView {
            origin: origin.to_string(),
        });
    }

    fn set_trusted_origin(&self, origin: &Url) {
        self.emit(Outbound::TrustedOrigin {
            origin: origin.to_string(),
        });
    }

    fn open_aux(&self, window: AuxWindow) {
        self.emit(Outbound::OpenWindow { window });
    }

    fn close_aux(&self, window_type: &str, key: &str) {
        self.emit(Outbound::CloseWindow {
            window_type: window_type.to_string(),
            key: key.to_string(),
        });
    }

    fn close_all_aux(&self) {
        self.emit(Outbound::CloseAllWindows);
    }

    fn always_on_top(&self) -> bool {
        self.always_on_top.load(Ordering::Relaxed)
    }

    fn set_always_on_top(&self, enabled: bool) {
        self.always_on_top.store(enabled, Ordering::Relaxed);
        self.emit(Outbound::AlwaysOnTop { enabled });
    }
}

impl PushChannel for StdioHost {
    fn push(&self, target: SenderRef, channel: &str, payload: Value) {
        self.emit(Outbound::Push {
            target,
            channel: channel.to_string(),
            payload,
        });
    }
}

impl PipeBridge for StdioHost {
    fn perform(&self, sender: SenderRef, action: PipeAction) {
        self.emit(Outbound::Pipe { sender, action });
    }
}

impl MediaInfo for StdioHost {
    fn media_access(&self) -> MediaAccess {
        self.lock_state().media_access.clone()
    }

    fn sources(&self, types: &[String], with_thumbnails: bool) -> Vec<SourceInfo> {
        self.lock_state()
            .sources
            .iter()
            .filter(|source| {
                let kind = source.id.split(':').next().unwrap_or_default();
                types.iter().any(|wanted| wanted == kind)
            })
            .map(|source| SourceInfo {
                thumbnail: if with_thumbnails {
                    source.thumbnail.clone()
                } else {
                    None
                },
                ..source.clone()
            })
            .collect()
    }

    fn citrix_media_redirection_status(&self) -> String {
        self.lock_state().citrix_status.clone()
    }

    fn cpu_usage(&self) -> CpuUsage {
        self.lock_state().cpu_usage
    }
}

impl SystemActions for StdioHost {
    fn perform(&self, action: SystemAction) {
        self.emit(Outbound::System { action });
    }
}

#[async_trait::async_trait]
impl CredentialPrompt for StdioHost {
    async fn request_credentials(&self, hostname: &str, is_retry: bool) -> Option<Credentials> {
        let (answer, waiting) = oneshot::channel();
        {
            let mut slot = self.lock_credentials();
            if slot.closed {
                debug!(hostname = %hostname, "credential prompt after input closed");
                return None;
            }
            slot.waiting = Some(answer);
        }
        self.emit(Outbound::CredentialsRequired {
            hostname: hostname.to_string(),
            is_retry,
        });

        waiting.await.ok().flatten()
    }
}

/// Serves the line protocol until `input` ends.
///
/// Must run inside a [`tokio::task::LocalSet`]: each fire-and-forget message
/// is dispatched as a local task so captures and logins can suspend while
/// further lines are processed. At end of input the capture session is shut
/// down and credential prompts are closed so those tasks can finish.
///
/// # Errors
/// Returns [`AppError::Io`] when reading input or writing output fails.
pub async fn serve<R, W>(
    dispatcher: Arc<Dispatcher>,
    host: Arc<StdioHost>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    input: R,
    output: W,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let reader = async move {
        let result = read_loop(&dispatcher, &host, input).await;
        let _ = shutdown_tx.send(());
        result
    };
    let (read, write) = tokio::join!(reader, write_loop(outbound, output, shutdown_rx));
    read.and(write)
}

async fn read_loop<R>(
    dispatcher: &Arc<Dispatcher>,
    host: &Arc<StdioHost>,
    input: R,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
{
    let mut tasks = JoinSet::new();
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        handle_line(dispatcher, host, &mut tasks, &line);
        while tasks.try_join_next().is_some() {}
    }

    info!(pending = tasks.len(), "input closed, shutting down");
    if dispatcher.capture().shutdown() {
        info!("interrupted the running screen capture");
    }
    host.close_prompts();
    while tasks.join_next().await.is_some() {}
    Ok(())
}

fn handle_line(
    dispatcher: &Arc<Dispatcher>,
    host: &Arc<StdioHost>,
    tasks: &mut JoinSet<()>,
    line: &str,
) {
    if line.trim().is_empty() {
        return;
    }
    let inbound = match serde_json::from_str::<Inbound>(line) {
        Ok(inbound) => inbound,
        Err(error) => {
            warn!(error = %error, "unreadable host line ignored");
            return;
        }
    };

    match inbound {
        Inbound::Send { sender, message } => {
            let dispatcher = dispatcher.clone();
            tasks.spawn_local(async move {
                let outcome = dispatcher.dispatch(sender, message).await;
                debug!(sender = %sender, outcome = ?outcome, "send handled");
            });
        }
        Inbound::Invoke {
            id,
            sender,
            message,
        } => {
            let result = dispatcher.invoke(sender, message);
            host.emit(Outbound::InvokeResult { id, result });
        }
        Inbound::Credentials { username, password } => {
            if !host.supply_credentials(Some(Credentials { username, password })) {
                debug!("credentials arrived with no prompt waiting");
            }
        }
        Inbound::CredentialsDismissed => {
            host.supply_credentials(None);
        }
        Inbound::HostState { state } => host.update_state(state),
    }
}

async fn write_loop<W>(
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    mut output: W,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            event = outbound.recv() => match event {
                Some(event) => write_event(&mut output, &event).await?,
                None => break,
            },
            _ = &mut shutdown => {
                while let Ok(event) = outbound.try_recv() {
                    write_event(&mut output, &event).await?;
                }
                break;
            }
        }
    }
    output.flush().await?;
    Ok(())
}

async fn write_event<W>(output: &mut W, event: &Outbound) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
