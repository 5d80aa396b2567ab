//! Omni tracker gateway.
//!
//! Decoded updates are logged as JSON lines. Platform commands are read from
//! stdin, one JSON object per line:
//!
//! ```text
//! {"device_id": 1, "type": "engineStop"}
//! {"device_id": 1, "type": "positionPeriodic", "frequency": 30}
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use omni_gateway::{Gateway, GatewayConfig, GatewayResult};
use omni_protocol::{Command, TelemetryUpdate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "omni-gateway", version, about = "TCP gateway for Omni tracker devices")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listen address.
    #[arg(long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn load_config(cli: &Cli) -> GatewayResult<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: GatewayConfig) -> GatewayResult<()> {
    start_metrics(&config);

    let (gateway, updates) = Gateway::new(config);
    let registry = gateway.registry();
    if registry.is_empty() {
        warn!("no devices configured, every sentence will be discarded");
    }
    info!(
        devices = registry.len(),
        protocol = %gateway.config().protocol.protocol,
        "starting gateway"
    );
    let listener = gateway.bind().await?;

    tokio::spawn(log_updates(updates));
    tokio::spawn(read_commands(gateway.clone()));

    tokio::select! {
        result = gateway.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}

#[cfg(feature = "prometheus")]
fn start_metrics(config: &GatewayConfig) {
    if let Some(addr) = config.metrics_listen {
        match omni_metrics::install_prometheus(addr) {
            Ok(()) => info!(%addr, "metrics exporter listening"),
            Err(e) => warn!("metrics exporter not started: {}", e),
        }
    }
}

#[cfg(not(feature = "prometheus"))]
fn start_metrics(config: &GatewayConfig) {
    if config.metrics_listen.is_some() {
        warn!("metrics_listen ignored, built without the prometheus feature");
    }
}

async fn log_updates(mut updates: mpsc::Receiver<TelemetryUpdate>) {
    while let Some(update) = updates.recv().await {
        match serde_json::to_string(&update) {
            Ok(json) => info!(target: "omni_gateway::updates", "{}", json),
            Err(e) => warn!("failed to serialize update: {}", e),
        }
    }
}

async fn read_commands(gateway: std::sync::Arc<Gateway>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!("stdin closed: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let command: Command = match serde_json::from_str(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("invalid command: {}", e);
                continue;
            }
        };
        match gateway.send_command(&command) {
            Ok(true) => {
                let name = gateway
                    .registry()
                    .device(command.device_id)
                    .and_then(|d| d.name.as_deref());
                info!(device_id = command.device_id, ?name, kind = %command.kind, "command sent");
            }
            Ok(false) => {}
            Err(e) => warn!(device_id = command.device_id, "{}", e),
        }
    }
}
