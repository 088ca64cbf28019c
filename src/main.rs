use clap::Parser;
use dotenv::dotenv;
use log::info;

use market_pulse::cli::{self, Cli};
use market_pulse::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting market-pulse...");

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    cli::run(cli, config).await
}
