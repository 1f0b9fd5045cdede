//! StarButtonBox PC server entry point.
//!
//! Loads settings, wires the OS adapters into a [`DispatchServer`], and runs
//! until Ctrl-C.
//!
//! ```text
//! main()
//!  └─ load_settings()            -- server_settings.toml (or defaults)
//!  └─ platform_emulator()        -- SendInput on Windows
//!  └─ DragLoopController::new()  -- shared across restarts
//!  └─ DispatchServer::start()    -- UDP socket, receive thread, worker pool
//!  └─ ctrl_c().await
//!  └─ DispatchServer::shutdown()
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use starbutton_server::application::{
    drag_loop::DragLoopController,
    events::{EventSink, ServerEvent, ServerStatus},
    ports::ServiceAdvertiser,
};
use starbutton_server::infrastructure::{
    browser::SystemBrowser,
    discovery::{MdnsAdvertiser, NoopAdvertiser},
    input_emulation::platform_emulator,
    network::{DispatchServer, ServerDeps},
    storage::config::{
        load_settings_from, save_settings_to, settings_file_path, ConfigError, ServerSettings,
    },
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// StarButtonBox PC server.
///
/// Receives button presses from the StarButtonBox phone app over UDP and
/// replays them as keyboard and mouse input on this machine.
#[derive(Debug, Parser)]
#[command(
    name = "starbutton-server",
    about = "Turns StarButtonBox phone buttons into keyboard and mouse input",
    version
)]
struct Cli {
    /// Settings file to load instead of the platform default.
    #[arg(long, env = "STARBUTTON_CONFIG")]
    config: Option<PathBuf>,

    /// UDP port to listen on (overrides the settings file).
    #[arg(long, env = "STARBUTTON_PORT")]
    port: Option<u16>,

    /// Address to bind, e.g. `0.0.0.0` for every interface.
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Do not advertise the server over mDNS.
    #[arg(long)]
    no_mdns: bool,

    /// Number of macro worker threads.
    #[arg(long)]
    workers: Option<usize>,

    /// Write the effective settings to the settings file and exit.
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    fn settings_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => settings_file_path(),
        }
    }

    /// Applies command-line overrides on top of the loaded settings.
    fn apply(&self, settings: &mut ServerSettings) {
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(bind) = self.bind {
            settings.server.bind_address = bind;
        }
        if let Some(workers) = self.workers {
            settings.server.worker_capacity = workers;
        }
        if self.no_mdns {
            settings.server.mdns_enabled = false;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Settings are read before logging starts because they carry the default
    // level; a load failure is reported once the subscriber is up.
    let path = cli.settings_path();
    let loaded = path
        .as_ref()
        .map_err(ToString::to_string)
        .and_then(|p| load_settings_from(p).map_err(|e| e.to_string()));
    let (mut settings, load_error) = match loaded {
        Ok(settings) => (settings, None),
        Err(e) => (ServerSettings::default(), Some(e)),
    };
    cli.apply(&mut settings);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .with_thread_names(true)
        .init();

    if let Some(e) = load_error {
        warn!("could not load settings, using defaults: {e}");
    }

    if cli.write_default_config {
        let path = path.context("no settings path available")?;
        save_settings_to(&settings, &path)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        info!("settings written to {}", path.display());
        return Ok(());
    }

    info!("StarButtonBox server starting");

    let emulator = platform_emulator();
    let drag_loop = Arc::new(DragLoopController::new(
        Arc::clone(&emulator),
        settings.drag.to_timings(),
    ));
    let advertiser: Arc<dyn ServiceAdvertiser> = if settings.server.mdns_enabled {
        Arc::new(MdnsAdvertiser::new())
    } else {
        Arc::new(NoopAdvertiser)
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            log_event(&event);
        }
    });

    let deps = ServerDeps {
        emulator,
        drag_loop,
        browser: Arc::new(SystemBrowser::new()),
        advertiser,
        events: EventSink::new(event_tx),
    };

    let mut server = DispatchServer::start(settings.server.to_server_config(), deps)
        .context("failed to start dispatch server")?;
    info!("listening on {}", server.local_addr());

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => warn!("failed to listen for Ctrl+C, shutting down: {e}"),
    }

    // Shutdown joins threads; keep it off the async workers.
    tokio::task::spawn_blocking(move || server.shutdown())
        .await
        .context("shutdown task failed")?;

    info!("StarButtonBox server stopped");
    Ok(())
}

fn log_event(event: &ServerEvent) {
    match event {
        ServerEvent::Status(ServerStatus::Starting { port }) => {
            info!("status: starting on port {port}")
        }
        ServerEvent::Status(ServerStatus::Running { port, discovery }) => {
            info!("status: running on port {port} (discovery {discovery:?})")
        }
        ServerEvent::Status(ServerStatus::Stopped) => info!("status: stopped"),
        // Latency is already logged under `starbutton::latency`.
        ServerEvent::Latency(_) => {}
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
