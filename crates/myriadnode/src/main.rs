//! MyriadNode - MyriadMesh node daemon

use anyhow::Result;
use clap::Parser;
use myriadnode::{Config, Node};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "myriadnode")]
#[command(about = "MyriadMesh node daemon")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "MYRIADNODE_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long, env = "MYRIADNODE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Write a fresh configuration and exit
    #[arg(long)]
    init: bool,

    /// Log level, overrides the configured one
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.init {
        let config = Config::create_default(args.config, args.data_dir)?;
        println!("Created configuration at {}", config.config_path().display());
        println!("Data directory: {}", config.data_directory.display());
        return Ok(());
    }

    let config = Config::load(args.config, args.data_dir)?;
    init_logging(
        args.log_level.as_deref().unwrap_or(&config.logging.level),
        config.logging.json,
    );

    info!("Starting MyriadNode {}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config.config_path().display());

    let node = Node::new(config).await?;
    node.run().await
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
