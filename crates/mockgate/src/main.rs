//! mockgate: development HTTP mock server.
//!
//! Serves the built-in demo rules and proxies unmatched requests under the
//! proxy prefix to the configured target.
//!
//! Usage:
//!   mockgate --port 3535 --proxy-target https://staging.example.com
//!   mockgate --config mockgate.yaml --log-format json

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use mockgate::demo::demo_rules;
use mockgate::{ConfigOverrides, Dispatcher, MockServer, ServerConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Development HTTP mock server
#[derive(Parser, Debug)]
#[command(name = "mockgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (0 picks a free port)
    #[arg(short, long, env = "MOCKGATE_PORT")]
    port: Option<u16>,

    /// Bind address
    #[arg(long, env = "MOCKGATE_HOST")]
    host: Option<String>,

    /// Unmatched requests under this prefix are proxied
    #[arg(long, env = "MOCKGATE_PROXY_PREFIX")]
    proxy_prefix: Option<String>,

    /// Upstream base URL for proxied requests
    #[arg(long, env = "MOCKGATE_PROXY_TARGET")]
    proxy_target: Option<String>,

    /// Maximum request body size in bytes
    #[arg(long, env = "MOCKGATE_BODY_LIMIT")]
    body_limit: Option<usize>,

    /// Log output format
    #[arg(long, env = "MOCKGATE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Start without the demo rules; every request goes to the passthrough
    #[arg(long)]
    no_demo: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            host: self.host.clone(),
            proxy_prefix: self.proxy_prefix.clone(),
            proxy_target: self.proxy_target.clone(),
            body_limit: self.body_limit,
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = ServerConfig::load(args.config.as_deref(), args.overrides())
        .context("failed to load configuration")?;

    let rules = if args.no_demo {
        Vec::new()
    } else {
        demo_rules().context("failed to build demo rules")?
    };

    match &config.proxy_target {
        Some(target) => info!("Proxying unmatched {}* to {}", config.proxy_prefix, target),
        None => info!("No proxy target configured; unmatched requests get 404"),
    }

    let handle = MockServer::new(config, Dispatcher::new(rules)).start().await?;
    info!("Started mock server on {}", handle.url());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("Received ctrl-c, shutting down");
    handle.stop().await;
    Ok(())
}
