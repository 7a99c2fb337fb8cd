//! Waits for the host to come up, then serves its operations as MCP tools.

use anyhow::Context;
use clap::Parser;
use hostmcp::config::{HostMcpConfig, LayeredConfigOptions};
use hostmcp::runtime::ReadinessMonitor;
use hostmcp::{StartupReport, StartupSequence, init_logging, poll_schedule, readiness_probe};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the bridge process.
#[derive(Parser)]
#[command(name = "hostmcp", version)]
struct Cli {
    /// Extra hostmcp.json5 layered on top of the discovered ones
    #[arg(long)]
    config: Option<PathBuf>,
    /// Host address override
    #[arg(long)]
    host_address: Option<String>,
    /// Host port override
    #[arg(long)]
    host_port: Option<u16>,
    /// Address the tool server listens on
    #[arg(long)]
    listen: Option<String>,
    /// Port the tool server listens on
    #[arg(long)]
    port: Option<u16>,
    /// Readiness attempts before giving up
    #[arg(long)]
    max_attempts: Option<u32>,
}

impl Cli {
    fn apply(&self, config: &mut HostMcpConfig) {
        if let Some(address) = &self.host_address {
            config.host.address = address.clone();
        }
        if let Some(port) = self.host_port {
            config.host.port = port;
        }
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.readiness.max_attempts = max_attempts;
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<HostMcpConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = &cli.config {
        info!("adding runtime config layer: {}", path.display());
        options = options.with_runtime_path(path);
    }
    let layered = HostMcpConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    let mut config = layered.config;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        "starting hostmcp (host={}, listen={}, probe={:?})",
        config.host.base_url(),
        config.server.bind_addr(),
        config.readiness.probe
    );

    let sequence = StartupSequence::from_config(config.clone())
        .context("failed to build host client")?;
    let started: Arc<Mutex<Option<StartupReport>>> = Arc::new(Mutex::new(None));
    let slot = started.clone();
    let _monitor = ReadinessMonitor::start(
        poll_schedule(&config),
        readiness_probe(&config),
        move || {
            let report = sequence.run()?;
            *slot.lock() = Some(report);
            Ok::<(), hostmcp::StartupError>(())
        },
    )
    .context("failed to spawn readiness monitor")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");

    let report = started.lock().take();
    match report.and_then(|report| report.server) {
        Some(server) => tokio::task::spawn_blocking(move || server.shutdown())
            .await
            .context("server shutdown task failed")?,
        None => warn!("no tool server to stop"),
    }
    Ok(())
}
