//! csim-node: chain simulator proxy in front of an in-memory simulator.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use csim_node::{init_tracing, CliOverrides, LocalSimulator, NodeAppConfig};
use csim_proxy::lifecycle::Closable;
use csim_proxy::{HexAddressConverter, HttpObserverClient, Proxy, ProxyArgs};
use csim_sharding::ShardCoordinator;
use tracing::{error, info};

/// Chain simulator proxy
#[derive(Parser, Debug)]
#[command(name = "csim-node")]
#[command(about = "Shard-aware HTTP proxy in front of a local chain simulator")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Overrides `general_settings.server_port`
    #[arg(long)]
    server_port: Option<u16>,

    /// Overrides `simulator.num_of_shards`
    #[arg(long)]
    num_of_shards: Option<u32>,

    /// Overrides `logs.level`
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            server_port: self.server_port,
            num_of_shards: self.num_of_shards,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = NodeAppConfig::load(&args.config)?;
    config.apply_overrides(&args.overrides());

    init_tracing(&config.logs)?;
    config.validate()?;

    let coordinator = ShardCoordinator::new(config.simulator.num_of_shards, 0)
        .context("cannot create shard coordinator")?;

    let simulator = Arc::new(LocalSimulator::new(
        config.simulator.clone(),
        &coordinator,
        &config.proxy.observers,
    ));
    if config.simulator.auto_generate_blocks {
        simulator.start_auto_generate();
    }

    let client = HttpObserverClient::new().context("cannot create observer client")?;
    let proxy = Proxy::create(ProxyArgs {
        config: config.proxy.clone(),
        coordinator,
        client: Arc::new(client),
        converter: Arc::new(HexAddressConverter),
        simulator: Arc::clone(&simulator) as Arc<dyn csim_proxy::SimulatorHandler>,
    })
    .context("cannot create proxy")?;

    let addr = proxy.start().await?;
    info!(
        addr = %addr,
        shards = config.simulator.num_of_shards,
        "Chain simulator proxy is running. Press Ctrl+C to stop."
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    if let Err(e) = simulator.close() {
        error!(error = %e, "Failed to stop simulator");
    }
    let failures = proxy.close().await;
    if failures > 0 {
        anyhow::bail!("{} components failed to close", failures);
    }

    info!("Stopped");
    Ok(())
}
