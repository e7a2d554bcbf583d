use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::echo::register_demo;
use crate::plugin::{CancelPlugin, MetricsPlugin, RecoverPlugin, TracingPlugin};
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpBinding, HttpServer};

/// Command-line interface for brrtdispatch
#[derive(Parser)]
#[command(name = "brrtdispatch")]
#[command(about = "Message dispatch registry served over HTTP", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the demo echo handlers over HTTP
    Serve {
        /// Listen address; overrides the config file and BRRTD_HTTP_ADDR
        #[arg(long)]
        addr: Option<String>,

        /// YAML configuration file
        #[arg(short, long, env = "BRRTD_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file and print the effective settings
    Check {
        /// YAML configuration file
        #[arg(short, long, env = "BRRTD_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Dispatcher with the standard plugin chain and the demo handlers, wrapped
/// in an HTTP service.
///
/// Chain, outermost first: tracing, metrics, panic recovery, cancellation.
pub fn build_service(config: &AppConfig) -> Result<AppService> {
    let metrics = MetricsPlugin::new();
    let builder = Dispatcher::builder()
        .plugin(TracingPlugin)
        .plugin(metrics.clone())
        .plugin(RecoverPlugin)
        .plugin(CancelPlugin);
    let dispatcher = config.dispatch.apply(builder).build();
    register_demo(&dispatcher).context("Failed to register demo handlers")?;
    info!(handlers = dispatcher.registry().len(), "Demo handlers registered");

    Ok(
        AppService::new(Arc::new(dispatcher), HttpBinding::new(config.http.clone()))
            .with_metrics(metrics),
    )
}

pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { addr, config } => {
            let mut config = AppConfig::load_with_env(config.as_deref())?;
            if let Some(addr) = addr {
                config.http.addr = addr;
            }

            let runtime = RuntimeConfig::from_env();
            runtime.apply();
            info!(
                stack_size = runtime.stack_size,
                workers = ?runtime.workers,
                "Coroutine runtime configured"
            );

            let service = build_service(&config)?;
            let handle = HttpServer(service)
                .start(config.http.addr.as_str())
                .with_context(|| format!("Failed to bind {}", config.http.addr))?;
            handle
                .join()
                .map_err(|e| anyhow!("HTTP server terminated abnormally: {e:?}"))
        }
        Commands::Check { config } => {
            let config = AppConfig::load_with_env(config.as_deref())?;
            let yaml = serde_yaml::to_string(&config).context("Failed to render config")?;
            println!("{yaml}");
            Ok(())
        }
    }
}
