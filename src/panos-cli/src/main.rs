//! PAN-OS MCP Server binary.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use secrecy::ExposeSecret;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use panos_api::{ClientConfig, PanosClient};
use panos_mcp_server::{McpServer, McpServerBuilder, tools};

use crate::config::{PartialSettings, Settings, parse_bool};

const SERVER_NAME: &str = "panos-mcp";

const INSTRUCTIONS: &str = "Read-only access to a Palo Alto Networks firewall or Panorama. \
    Tools return system information, address objects, security zones and security policies.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP POST plus the legacy SSE endpoints
    Http,
}

/// PAN-OS MCP Server
#[derive(Debug, Parser)]
#[command(name = "panos-mcp")]
#[command(about = "MCP server exposing read-only PAN-OS firewall and Panorama tools")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "PANOS_CONFIG")]
    config: Option<PathBuf>,

    /// Transport to serve
    #[arg(short, long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Listen address for the HTTP transport
    #[arg(short, long)]
    listen: Option<String>,

    /// Firewall or Panorama host
    #[arg(long)]
    hostname: Option<String>,

    /// Output format for tool results (json or markdown)
    #[arg(short, long)]
    format: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Remember whether the target is Panorama after the first detection
    #[arg(long)]
    cache_target_kind: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Flags given on the command line, as the top configuration layer.
    fn overrides(&self) -> PartialSettings {
        PartialSettings {
            hostname: self.hostname.clone(),
            timeout_secs: self.timeout,
            output_format: self.format.clone(),
            listen_addr: self.listen.clone(),
            verify_ssl: self.insecure.then_some(false),
            cache_target_kind: self.cache_target_kind.then_some(true),
            ..PartialSettings::default()
        }
    }
}

/// Logs always go to stderr; stdout carries the stdio transport.
fn setup_logging(level: &str, debug: bool, json: bool) {
    let level = if debug { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_server(settings: &Settings) -> Result<Arc<McpServer>> {
    let config = ClientConfig::new(&settings.hostname, settings.api_key.expose_secret())
        .with_timeout(settings.timeout)
        .with_verify_tls(settings.verify_ssl)
        .with_target_cache(settings.cache_target_kind);
    let client = PanosClient::new(config).context("Failed to create PAN-OS client")?;

    McpServerBuilder::new(SERVER_NAME, env!("CARGO_PKG_VERSION"))
        .output_format(settings.output_format)
        .tool_handlers(tools::panos_tools(&client))
        .instructions(INSTRUCTIONS)
        .build()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

async fn run(transport: Transport, settings: Settings) -> Result<()> {
    let server = build_server(&settings)?;

    info!(
        host = %settings.hostname,
        transport = ?transport,
        format = %settings.output_format,
        timeout_secs = settings.timeout.as_secs(),
        verify_ssl = settings.verify_ssl,
        tools = server.dispatcher().list_tools().len(),
        "Starting PAN-OS MCP server"
    );

    let serve = async {
        match transport {
            Transport::Stdio => server.clone().run_stdio().await,
            Transport::Http => server.clone().run_http(settings.listen_addr).await,
        }
    };

    tokio::select! {
        result = serve => result,
        _ = shutdown_signal() => {
            server.stop().await;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let dotenv = dotenvy::dotenv();
    let settings = Settings::from_env(args.config.as_deref(), args.overrides());

    let debug_enabled = match &settings {
        Ok(settings) => settings.debug,
        Err(_) => std::env::var("PANOS_DEBUG")
            .ok()
            .and_then(|v| parse_bool("PANOS_DEBUG", &v).ok())
            .unwrap_or(false),
    };
    setup_logging(&args.log_level, debug_enabled, args.json_logs);

    if let Ok(path) = &dotenv {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(args.transport, settings).await {
        error!(error = %format!("{e:#}"), "Server error");
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}
