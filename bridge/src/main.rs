use anyhow::Result;
use clap::Parser;
use tokio::signal;
use log::info;

use a2b_bridge::actions::ActionContext;
use a2b_bridge::server::start_server;
use common::Config;

#[derive(Parser, Debug)]
#[command(name = "a2b-bridge", version, about = "Brand-to-agency asset sync bridge")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = "A2B_CONFIG")]
    config: Option<String>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting A2B bridge");

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;
    info!("Config loaded from {}", config_path);
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    let bind_addr = config.server.bind_addr.clone();
    let package = config.server.package.clone();
    let ctx = ActionContext::from_config(config).await?;

    let addr = start_server(ctx, &bind_addr).await?;
    info!("Serving package {} at http://{}/api/v1/web/{}", package, addr, package);

    info!("A2B bridge is running");

    signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}
