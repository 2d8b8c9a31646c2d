#![warn(missing_docs)]
//! # pod-shell binary
//!
//! Runs the control layer over newline-delimited JSON on stdin/stdout for an
//! embedding native shell. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use pod_shell_app::host::{ExternalShell, SystemBrowser};
use pod_shell_app::{
    AppError, ConfigStore, DispatchSettings, Dispatcher, JsonConfigStore, LoginController,
    WindowCaptureHost, app_version, capture_enabled_from_env, stdio,
};
use pod_shell_auth::{HttpProbeTransport, PodLoginFlow};
use pod_shell_capture::{CapturePolicy, PlatformFamily, ProcessCaptureTool, ScreenSnippetSession};
use tokio::io::BufReader;
use tokio::task::LocalSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("POD_SHELL_VERSION"),
    " (",
    env!("POD_SHELL_TARGET"),
    ")"
);

/// Command line options.
#[derive(Debug, Parser)]
#[command(name = "pod-shell", version = LONG_VERSION, about = "Desktop shell control layer")]
struct Cli {
    /// Pod address; takes priority over configuration.
    #[arg(long)]
    url: Option<String>,
    /// User configuration JSON file.
    #[arg(long, env = "POD_SHELL_USER_CONFIG")]
    user_config: Option<PathBuf>,
    /// Global configuration JSON file.
    #[arg(long, env = "POD_SHELL_GLOBAL_CONFIG")]
    global_config: Option<PathBuf>,
    /// Capture platform policy (`macos`, `windows`, `linux`, `other`).
    #[arg(long, value_parser = parse_platform)]
    platform: Option<PlatformFamily>,
    /// Directory for capture files.
    #[arg(long)]
    temp_dir: Option<PathBuf>,
}

fn parse_platform(raw: &str) -> Result<PlatformFamily, String> {
    PlatformFamily::from_name(raw).ok_or_else(|| format!("unknown platform '{raw}'"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// CLI entry point.
fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            error!(error = %error, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let local = LocalSet::new();
    match local.block_on(&runtime, run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(error = %error, "pod-shell stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    info!(version = app_version(), "pod-shell starting");

    let config_store: Arc<dyn ConfigStore> = Arc::new(JsonConfigStore::load(
        cli.user_config.as_deref(),
        cli.global_config.as_deref(),
    )?);
    let always_on_top = config_store
        .effective(|config| config.always_on_top)
        .unwrap_or(false);
    let proxy_server = config_store
        .effective(|config| config.proxy_server_url().transpose())
        .transpose()?;
    let capture_tool = config_store.effective(|config| config.capture_tool.clone());

    let (stdio_host, outbound) = stdio::StdioHost::new(always_on_top);
    let shell: Arc<dyn ExternalShell> = Arc::new(SystemBrowser);
    let host = stdio_host.collaborators(config_store, shell);

    let platform = cli.platform.unwrap_or_else(PlatformFamily::current);
    let mut policy = CapturePolicy::for_platform(platform);
    if let Some(tool) = capture_tool {
        policy = policy.with_tool_path(tool);
    }
    let temp_dir = cli
        .temp_dir
        .unwrap_or_else(|| std::env::temp_dir().join("pod-shell"));
    let capture = Arc::new(ScreenSnippetSession::new(
        temp_dir,
        policy,
        Arc::new(ProcessCaptureTool::new()),
        Arc::new(WindowCaptureHost::new(
            host.windows.clone(),
            host.push.clone(),
        )),
    )?);

    let flow = Arc::new(PodLoginFlow::new(
        Arc::new(HttpProbeTransport::new(proxy_server)),
        stdio_host.clone(),
    ));
    let login = LoginController::new(flow, &host, cli.url);

    let settings = DispatchSettings {
        capture_enabled: capture_enabled_from_env(),
    };
    info!(
        platform = ?platform,
        capture_enabled = settings.capture_enabled,
        "control layer ready"
    );
    let dispatcher = Arc::new(Dispatcher::new(host, capture, login, settings));

    stdio::serve(
        dispatcher,
        stdio_host,
        outbound,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}
