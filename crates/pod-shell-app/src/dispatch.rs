//! Command and invoke dispatch tables.
//!
//! Each known tag maps to one handler. Handlers read their fields through
//! the typed accessors and return `None` when a field is missing or has the
//! wrong type; the command is then skipped without side effects.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pod_shell_capture::ScreenSnippetSession;
use pod_shell_core::{ApiCmd, InboundMessage, SenderRef, SnippetUpload};
use serde_json::{Map, Value};
use tracing::{debug, error, info, trace, warn};

use crate::host::{
    AuxWindow, DownloadActionKind, Host, NotificationRequest, PipeAction, Registration,
    SystemAction, UpdateStep, WindowAction,
};
use crate::login::LoginController;
use crate::redact::{redact_sensitive, redacted_record};
use crate::validate::SenderValidator;

/// Result of dispatching one fire-and-forget message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handler ran its action.
    Handled(ApiCmd),
    /// A field failed its type check; nothing happened.
    Skipped(ApiCmd),
    /// Sender is not a tracked window or view.
    Rejected,
    /// Envelope is not `{cmd: string, ...}`.
    Malformed,
    /// Tag is outside the vocabulary of this channel.
    Unknown,
}

/// Runtime switches for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// `openScreenSnippet` is honoured only when set.
    pub capture_enabled: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            capture_enabled: true,
        }
    }
}

type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Option<()>> + 'a>>;
type ImmediateHandler = fn(&Dispatcher, SenderRef, &InboundMessage) -> Option<()>;
type DeferredHandler =
    for<'a> fn(&'a Dispatcher, SenderRef, &'a InboundMessage) -> HandlerFuture<'a>;
type InvokeHandler = fn(&Dispatcher, SenderRef, &InboundMessage) -> Option<Value>;

#[derive(Clone, Copy)]
enum CommandHandler {
    Immediate(ImmediateHandler),
    Deferred(DeferredHandler),
}

/// Validates, logs, and routes inbound renderer messages.
pub struct Dispatcher {
    host: Host,
    validator: SenderValidator,
    capture: Arc<ScreenSnippetSession>,
    login: LoginController,
    settings: DispatchSettings,
    commands: HashMap<ApiCmd, CommandHandler>,
    invokes: HashMap<ApiCmd, InvokeHandler>,
}

impl Dispatcher {
    /// Creates a dispatcher over the host collaborators and the two stateful
    /// subsystems.
    pub fn new(
        host: Host,
        capture: Arc<ScreenSnippetSession>,
        login: LoginController,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            validator: SenderValidator::new(host.windows.clone()),
            host,
            capture,
            login,
            settings,
            commands: command_table(),
            invokes: invoke_table(),
        }
    }

    /// Capture session driven by `openScreenSnippet`.
    pub fn capture(&self) -> &Arc<ScreenSnippetSession> {
        &self.capture
    }

    /// Login controller driven by `browserLogin`.
    pub fn login(&self) -> &LoginController {
        &self.login
    }

    /// Handles one fire-and-forget message. Long-running handlers (capture,
    /// login) complete before this returns.
    pub async fn dispatch(&self, sender: SenderRef, raw: Value) -> DispatchOutcome {
        let message = match self.accept(sender, raw) {
            Ok(message) => message,
            Err(outcome) => return outcome,
        };

        let Some(handler) = self.commands.get(&message.cmd).copied() else {
            debug!(cmd = %message.cmd, "invoke-only command on send channel ignored");
            return DispatchOutcome::Unknown;
        };

        let done = match handler {
            CommandHandler::Immediate(handle) => handle(self, sender, &message),
            CommandHandler::Deferred(handle) => handle(self, sender, &message).await,
        };

        match done {
            Some(()) => DispatchOutcome::Handled(message.cmd),
            None => {
                debug!(cmd = %message.cmd, sender = %sender, "command fields failed type check");
                DispatchOutcome::Skipped(message.cmd)
            }
        }
    }

    /// Handles one request/response message. Returns `None` for rejected,
    /// unknown, or malformed requests.
    pub fn invoke(&self, sender: SenderRef, raw: Value) -> Option<Value> {
        let message = self.accept(sender, raw).ok()?;
        let Some(handler) = self.invokes.get(&message.cmd) else {
            debug!(cmd = %message.cmd, "command has no invoke handler");
            return None;
        };
        handler(self, sender, &message)
    }

    fn accept(&self, sender: SenderRef, raw: Value) -> Result<InboundMessage, DispatchOutcome> {
        let tag = raw
            .get("cmd")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_string();
        if !self.validator.is_valid(&sender, &tag) {
            return Err(DispatchOutcome::Rejected);
        }

        match InboundMessage::parse(raw) {
            Ok(Some(message)) => {
                info!(sender = %sender, record = %redacted_record(&message), "dispatching command");
                Ok(message)
            }
            Ok(None) => {
                debug!(cmd = %tag, "unknown command ignored");
                Err(DispatchOutcome::Unknown)
            }
            Err(error) => {
                debug!(sender = %sender, error = %error, "malformed message ignored");
                Err(DispatchOutcome::Malformed)
            }
        }
    }

    fn system(&self, action: SystemAction) -> Option<()> {
        self.host.system.perform(action);
        Some(())
    }

    fn on_main_window(&self, action: WindowAction) -> Option<()> {
        let window = self.host.windows.main_window()?;
        self.host.windows.apply(window, action);
        Some(())
    }

    fn pipe(&self, sender: SenderRef, action: PipeAction) -> Option<()> {
        self.host.pipes.perform(sender, action);
        Some(())
    }
}

fn command_table() -> HashMap<ApiCmd, CommandHandler> {
    use CommandHandler::{Deferred, Immediate};

    let entries: [(ApiCmd, CommandHandler); 47] = [
        (ApiCmd::IsOnline, Immediate(is_online)),
        (ApiCmd::SetBadgeCount, Immediate(set_badge_count)),
        (ApiCmd::BadgeDataUrl, Immediate(badge_data_url)),
        (ApiCmd::Activate, Immediate(activate)),
        (ApiCmd::BringToFront, Immediate(bring_to_front)),
        (ApiCmd::RegisterLogger, Immediate(register_logger)),
        (ApiCmd::RegisterProtocolHandler, Immediate(register_protocol_handler)),
        (ApiCmd::RegisterActivityDetection, Immediate(register_activity_detection)),
        (ApiCmd::RegisterBoundsChange, Immediate(register_bounds_change)),
        (ApiCmd::ShowNotificationSettings, Immediate(show_notification_settings)),
        (ApiCmd::OpenScreenPickerWindow, Immediate(open_screen_picker_window)),
        (ApiCmd::OpenScreenSharingIndicator, Immediate(open_screen_sharing_indicator)),
        (ApiCmd::CloseScreenSharingIndicator, Immediate(close_screen_sharing_indicator)),
        (ApiCmd::PopupMenu, Immediate(popup_menu)),
        (ApiCmd::SetLocale, Immediate(set_locale)),
        (ApiCmd::KeyPress, Immediate(key_press)),
        (ApiCmd::OpenScreenSnippet, Deferred(open_screen_snippet)),
        (ApiCmd::CloseScreenSnippet, Deferred(close_screen_snippet)),
        (ApiCmd::UploadSnippet, Immediate(upload_snippet)),
        (ApiCmd::CloseWindow, Immediate(close_window)),
        (ApiCmd::CloseAllWrapperWindows, Immediate(close_all_wrapper_windows)),
        (ApiCmd::DownloadManagerAction, Immediate(download_manager_action)),
        (ApiCmd::ShowNotification, Immediate(show_notification)),
        (ApiCmd::CloseNotification, Immediate(close_notification)),
        (ApiCmd::SetCloudConfig, Immediate(set_cloud_config)),
        (ApiCmd::RestartApp, Immediate(restart_app)),
        (ApiCmd::SetIsMana, Immediate(set_is_mana)),
        (ApiCmd::SetZoomLevel, Immediate(set_zoom_level)),
        (ApiCmd::AboutAppClipBoardData, Immediate(about_app_clipboard_data)),
        (ApiCmd::CloseMainWindow, Immediate(close_main_window)),
        (ApiCmd::MinimizeMainWindow, Immediate(minimize_main_window)),
        (ApiCmd::MaximizeMainWindow, Immediate(maximize_main_window)),
        (ApiCmd::UnmaximizeMainWindow, Immediate(unmaximize_main_window)),
        (ApiCmd::ReloadWindow, Immediate(reload_window)),
        (ApiCmd::ConnectCloud9Pipe, Immediate(connect_cloud9_pipe)),
        (ApiCmd::WriteCloud9Pipe, Immediate(write_cloud9_pipe)),
        (ApiCmd::CloseCloud9Pipe, Immediate(close_cloud9_pipe)),
        (ApiCmd::LaunchCloud9, Immediate(launch_cloud9)),
        (ApiCmd::TerminateCloud9, Immediate(terminate_cloud9)),
        (ApiCmd::UpdateMyPresence, Immediate(update_my_presence)),
        (ApiCmd::BrowserLogin, Deferred(browser_login)),
        (ApiCmd::SendLogs, Immediate(send_logs)),
        (ApiCmd::UpdateThumbnail, Immediate(update_thumbnail)),
        (ApiCmd::CheckForUpdates, Immediate(check_for_updates)),
        (ApiCmd::DownloadUpdate, Immediate(download_update)),
        (ApiCmd::UpdateAndRestart, Immediate(update_and_restart)),
        (ApiCmd::Log, Immediate(renderer_log)),
    ];

    entries.into_iter().collect()
}

fn invoke_table() -> HashMap<ApiCmd, InvokeHandler> {
    let entries: [(ApiCmd, InvokeHandler); 6] = [
        (ApiCmd::CheckMediaPermission, check_media_permission as InvokeHandler),
        (ApiCmd::GetSources, get_sources as InvokeHandler),
        (ApiCmd::GetNativeWindowHandle, get_native_window_handle as InvokeHandler),
        (
            ApiCmd::GetCitrixMediaRedirectionStatus,
            get_citrix_media_redirection_status as InvokeHandler,
        ),
        (ApiCmd::GetMainWindowState, get_main_window_state as InvokeHandler),
        (ApiCmd::GetCpuUsage, get_cpu_usage as InvokeHandler),
    ];

    entries.into_iter().collect()
}

fn is_online(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let online = m.bool_field("isOnline")?;
    d.system(SystemAction::SetOnline { online })
}

fn set_badge_count(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let count = m.u64_field("count")?;
    d.system(SystemAction::BadgeCount { count })
}

fn badge_data_url(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let data_url = m.str_field("dataUrl")?.to_string();
    let count = m.u64_field("count")?;
    d.system(SystemAction::BadgeImage { data_url, count })
}

fn activate(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let window = d.host.windows.find_by_name(m.str_field("windowName")?)?;
    d.host.windows.apply(window, WindowAction::Activate);
    Some(())
}

fn bring_to_front(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let window = d.host.windows.find_by_name(m.str_field("windowName")?)?;
    let reason = m.str_field("reason")?.to_string();
    d.host
        .windows
        .apply(window, WindowAction::BringToFront { reason });
    Some(())
}

fn register(d: &Dispatcher, sender: SenderRef, registration: Registration) -> Option<()> {
    d.system(SystemAction::Register {
        sender,
        registration,
    })
}

fn register_logger(d: &Dispatcher, sender: SenderRef, _: &InboundMessage) -> Option<()> {
    register(d, sender, Registration::Logger)
}

fn register_protocol_handler(d: &Dispatcher, sender: SenderRef, _: &InboundMessage) -> Option<()> {
    register(d, sender, Registration::ProtocolHandler)
}

fn register_activity_detection(
    d: &Dispatcher,
    sender: SenderRef,
    m: &InboundMessage,
) -> Option<()> {
    let period_ms = m.u64_field("period")?;
    register(d, sender, Registration::ActivityDetection { period_ms })
}

fn register_bounds_change(d: &Dispatcher, sender: SenderRef, _: &InboundMessage) -> Option<()> {
    register(d, sender, Registration::BoundsChange)
}

fn show_notification_settings(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let window_name = m.str_field("windowName")?.to_string();
    d.host
        .windows
        .open_aux(AuxWindow::NotificationSettings { window_name });
    Some(())
}

fn open_screen_picker_window(d: &Dispatcher, sender: SenderRef, m: &InboundMessage) -> Option<()> {
    let sources = m.array_field("sources")?.clone();
    let request_id = m.u64_field("id")?;
    d.host.windows.open_aux(AuxWindow::ScreenPicker {
        requester: sender,
        sources,
        request_id,
    });
    Some(())
}

fn open_screen_sharing_indicator(
    d: &Dispatcher,
    sender: SenderRef,
    m: &InboundMessage,
) -> Option<()> {
    let display_id = m.str_field("displayId")?.to_string();
    let request_id = m.u64_field("id")?;
    let stream_id = m.str_field("streamId")?.to_string();
    d.host.windows.open_aux(AuxWindow::SharingIndicator {
        requester: sender,
        display_id,
        request_id,
        stream_id,
    });
    Some(())
}

fn close_screen_sharing_indicator(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let stream_id = m.str_field("streamId")?;
    d.host.windows.close_aux("screen-sharing-indicator", stream_id);
    Some(())
}

fn popup_menu(d: &Dispatcher, sender: SenderRef, _: &InboundMessage) -> Option<()> {
    let window = d.host.windows.window_of(&sender)?;
    d.host.windows.apply(window, WindowAction::PopupMenu);
    Some(())
}

fn set_locale(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let locale = m.str_field("locale")?.to_string();
    d.system(SystemAction::SetLocale { locale })
}

fn key_press(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let key_code = m.u64_field("keyCode")?;
    d.system(SystemAction::KeyPress { key_code })
}

fn open_screen_snippet<'a>(
    d: &'a Dispatcher,
    sender: SenderRef,
    _: &'a InboundMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        if !d.settings.capture_enabled {
            warn!(sender = %sender, "screen capture disabled by kill switch");
            return None;
        }
        d.capture.capture(sender).await;
        Some(())
    })
}

fn close_screen_snippet<'a>(
    d: &'a Dispatcher,
    _: SenderRef,
    _: &'a InboundMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        d.capture.cancel_capture().await;
        Some(())
    })
}

fn upload_snippet(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let upload = m.decode::<SnippetUpload>().ok()?;
    if !d.capture.complete_editor_upload(upload) {
        debug!("snippet upload not accepted");
    }
    Some(())
}

fn close_window(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let window_type = m.str_field("windowType")?;
    let win_key = m.str_field("winKey")?;
    d.host.windows.close_aux(window_type, win_key);
    Some(())
}

fn close_all_wrapper_windows(d: &Dispatcher, _: SenderRef, _: &InboundMessage) -> Option<()> {
    d.host.windows.close_all_aux();
    Some(())
}

fn download_manager_action(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let kind = DownloadActionKind::from_name(m.str_field("type")?)?;
    let path = match kind {
        DownloadActionKind::Clear => m.str_field("path").unwrap_or_default().to_string(),
        _ => m.str_field("path")?.to_string(),
    };
    d.system(SystemAction::Download { kind, path })
}

fn show_notification(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let request = m.decode::<NotificationRequest>().ok()?;
    d.system(SystemAction::ShowNotification(request))
}

fn close_notification(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let id = m.u64_field("notificationId")?;
    d.system(SystemAction::CloseNotification { id })
}

fn set_cloud_config(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let config: Map<String, Value> = [
        "podLevelEntitlements",
        "acpFeatureLevelEntitlements",
        "pmpEntitlements",
    ]
    .into_iter()
    .filter_map(|key| m.fields.get(key).map(|value| (key.to_string(), value.clone())))
    .collect();
    if config.is_empty() {
        return None;
    }
    d.system(SystemAction::CloudConfig {
        config: Value::Object(config),
    })
}

fn restart_app(d: &Dispatcher, _: SenderRef, _: &InboundMessage) -> Option<()> {
    d.system(SystemAction::Restart)
}

fn set_is_mana(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let is_mana = m.bool_field("isMana")?;
    d.system(SystemAction::SetIsMana { is_mana })
}

fn set_zoom_level(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let level = m.f64_field("zoomLevel")?;
    d.on_main_window(WindowAction::SetZoom { level })
}

fn about_app_clipboard_data(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let data = m.str_field("clipboard")?.to_string();
    let clipboard_type = m.str_field("clipboardType")?.to_string();
    d.system(SystemAction::Clipboard {
        data,
        clipboard_type,
    })
}

fn close_main_window(d: &Dispatcher, _: SenderRef, _: &InboundMessage) -> Option<()> {
    d.on_main_window(WindowAction::Close)
}

fn minimize_main_window(d: &Dispatcher, _: SenderRef, _: &InboundMessage) -> Option<()> {
    d.on_main_window(WindowAction::Minimize)
}

fn maximize_main_window(d: &Dispatcher, _: SenderRef, _: &InboundMessage) -> Option<()> {
    d.on_main_window(WindowAction::Maximize)
}

fn unmaximize_main_window(d: &Dispatcher, _: SenderRef, _: &InboundMessage) -> Option<()> {
    d.on_main_window(WindowAction::Unmaximize)
}

fn reload_window(d: &Dispatcher, sender: SenderRef, _: &InboundMessage) -> Option<()> {
    let window = d.host.windows.window_of(&sender)?;
    d.host.windows.apply(window, WindowAction::Reload);
    Some(())
}

fn connect_cloud9_pipe(d: &Dispatcher, sender: SenderRef, m: &InboundMessage) -> Option<()> {
    let pipe = m.str_field("pipe")?.to_string();
    d.pipe(sender, PipeAction::Connect { pipe })
}

fn write_cloud9_pipe(d: &Dispatcher, sender: SenderRef, m: &InboundMessage) -> Option<()> {
    let data = m
        .array_field("data")?
        .iter()
        .map(|byte| byte.as_u64().and_then(|byte| u8::try_from(byte).ok()))
        .collect::<Option<Vec<u8>>>()?;
    d.pipe(sender, PipeAction::Write { data })
}

fn close_cloud9_pipe(d: &Dispatcher, sender: SenderRef, _: &InboundMessage) -> Option<()> {
    d.pipe(sender, PipeAction::Close)
}

fn launch_cloud9(d: &Dispatcher, sender: SenderRef, _: &InboundMessage) -> Option<()> {
    d.pipe(sender, PipeAction::Launch)
}

fn terminate_cloud9(d: &Dispatcher, sender: SenderRef, _: &InboundMessage) -> Option<()> {
    d.pipe(sender, PipeAction::Terminate)
}

fn update_my_presence(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let presence = Value::Object(m.object_field("myPresence")?.clone());
    d.system(SystemAction::Presence { presence })
}

fn browser_login<'a>(
    d: &'a Dispatcher,
    _: SenderRef,
    _: &'a InboundMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        d.login.browser_login().await?;
        Some(())
    })
}

fn send_logs(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let log_name = m.str_field("logName")?.to_string();
    let log_files = m.array_field("logFiles")?.clone();
    d.system(SystemAction::SendLogs {
        log_name,
        log_files,
    })
}

fn update_thumbnail(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    let image = m.str_field("thumbnail")?.to_string();
    d.system(SystemAction::Thumbnail { image })
}

fn update_step(d: &Dispatcher, m: &InboundMessage, step: UpdateStep) -> Option<()> {
    let trigger = match m.fields.get("autoUpdateTrigger") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_str()?.to_string()),
    };
    d.system(SystemAction::Update { step, trigger })
}

fn check_for_updates(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    update_step(d, m, UpdateStep::Check)
}

fn download_update(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    update_step(d, m, UpdateStep::Download)
}

fn update_and_restart(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<()> {
    update_step(d, m, UpdateStep::InstallAndRestart)
}

/// Ordered most to least severe.
const RENDERER_LEVELS: [&str; 6] = ["error", "warn", "info", "verbose", "debug", "silly"];

fn severity(level: &str) -> Option<usize> {
    RENDERER_LEVELS.iter().position(|known| *known == level)
}

fn renderer_log(_: &Dispatcher, sender: SenderRef, m: &InboundMessage) -> Option<()> {
    let msgs = m.array_field("msgs")?;
    let threshold = match m.fields.get("logLevel") {
        None | Some(Value::Null) => None,
        Some(value) => Some(severity(value.as_str()?)?),
    };

    for entry in msgs {
        let Some(level) = entry.get("level").and_then(Value::as_str) else {
            continue;
        };
        let Some(rank) = severity(level) else {
            continue;
        };
        if threshold.is_some_and(|threshold| rank > threshold) {
            continue;
        }

        let details = match entry.get("details") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let details = redact_sensitive(&details);
        match rank {
            0 => error!(target: "renderer", sender = %sender, "{details}"),
            1 => warn!(target: "renderer", sender = %sender, "{details}"),
            2 => info!(target: "renderer", sender = %sender, "{details}"),
            3 | 4 => debug!(target: "renderer", sender = %sender, "{details}"),
            _ => trace!(target: "renderer", sender = %sender, "{details}"),
        }
    }
    Some(())
}

fn check_media_permission(d: &Dispatcher, _: SenderRef, _: &InboundMessage) -> Option<Value> {
    serde_json::to_value(d.host.media.media_access()).ok()
}

fn get_sources(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<Value> {
    let types = m
        .array_field("types")?
        .iter()
        .map(|kind| kind.as_str().map(str::to_string))
        .collect::<Option<Vec<String>>>()?;
    let with_thumbnails = m.object_field("thumbnailSize").is_some_and(|size| {
        let dimension = |key: &str| size.get(key).and_then(Value::as_u64).unwrap_or(0);
        dimension("width") > 0 && dimension("height") > 0
    });

    serde_json::to_value(d.host.media.sources(&types, with_thumbnails)).ok()
}

fn get_native_window_handle(d: &Dispatcher, _: SenderRef, m: &InboundMessage) -> Option<Value> {
    let window = d.host.windows.find_by_name(m.str_field("windowName")?)?;
    d.host.windows.native_handle(window).map(Value::from)
}

fn get_citrix_media_redirection_status(
    d: &Dispatcher,
    _: SenderRef,
    _: &InboundMessage,
) -> Option<Value> {
    Some(Value::from(d.host.media.citrix_media_redirection_status()))
}

fn get_main_window_state(d: &Dispatcher, _: SenderRef, _: &InboundMessage) -> Option<Value> {
    serde_json::to_value(d.host.windows.main_window_state()).ok()
}

fn get_cpu_usage(d: &Dispatcher, _: SenderRef, _: &InboundMessage) -> Option<Value> {
    serde_json::to_value(d.host.media.cpu_usage()).ok()
}
