// src/cli.rs
use clap::{Parser, Subcommand};
use log::{error, info};

use crate::config::AppConfig;
use crate::handlers::view;
use crate::handlers::{ActionError, Dashboard, DashboardState, Notice};
use crate::models::{MetricsUpdate, MonthlyReturn};
use crate::services::cache::{FileStore, SameDayCache};
use crate::services::calculator;
use crate::services::fetcher::HttpTransport;

#[derive(Parser)]
#[command(name = "market-pulse")]
#[command(about = "US equity & macro pulse: sentiment, breadth and S&P 500 monthly returns", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load cached or fresh indicators and monthly returns, then render everything
    Dashboard,
    /// Update CNN / crypto fear & greed and VIX
    Sentiment {
        /// Skip today's cache and hit the network
        #[arg(long)]
        force: bool,
    },
    /// Update S&P 500 participation (share of members above 20/50-day MA)
    Participation {
        #[arg(long)]
        force: bool,
    },
    /// Fetch the S&P 500 monthly series and show the 15-year heatmap
    Returns,
    /// Load the dashboard, then apply a hand-entered month and indicator values
    Set {
        /// Month in YYYY-MM form
        #[arg(long)]
        month: String,
        /// S&P 500 return for that month, in percent
        #[arg(long = "return", allow_hyphen_values = true)]
        return_pct: f64,
        #[arg(long)]
        sp20: Option<f64>,
        #[arg(long)]
        sp50: Option<f64>,
        #[arg(long)]
        cnn: Option<f64>,
        #[arg(long)]
        crypto: Option<f64>,
    },
    /// Position and option scenario calculator
    Calc {
        #[command(subcommand)]
        scenario: CalcCommand,
    },
}

#[derive(Subcommand)]
pub enum CalcCommand {
    /// Target prices for an up / down percentage move
    Move {
        #[arg(long, default_value_t = 100.0)]
        buy: f64,
        #[arg(long, default_value_t = 8.0)]
        up: f64,
        #[arg(long, default_value_t = 6.0)]
        down: f64,
    },
    /// Percentage moves implied by target prices
    Target {
        #[arg(long)]
        buy: f64,
        #[arg(long)]
        up_price: Option<f64>,
        #[arg(long)]
        down_price: Option<f64>,
    },
    /// Cost basis of a short put if assigned
    Put {
        #[arg(long, default_value_t = 225.0)]
        strike: f64,
        #[arg(long, default_value_t = 3.2)]
        premium: f64,
        #[arg(long, default_value_t = 1.0)]
        contracts: f64,
    },
    /// Whole shares a budget buys at a given price
    Size {
        #[arg(long)]
        budget: f64,
        #[arg(long)]
        price: f64,
    },
}

fn report(result: Result<(DashboardState, Notice), ActionError>) -> anyhow::Result<DashboardState> {
    match result {
        Ok((state, notice)) => {
            println!("{}", notice);
            Ok(state)
        }
        Err(e) => {
            error!("{}", e);
            Err(anyhow::anyhow!(e.message))
        }
    }
}

pub fn run_calc(scenario: CalcCommand) -> anyhow::Result<()> {
    match scenario {
        CalcCommand::Move { buy, up, down } => {
            println!("{}", view::render_price_move(&calculator::price_move(buy, up, down)));
        }
        CalcCommand::Target { buy, up_price, down_price } => {
            if buy <= 0.0 {
                anyhow::bail!("buy price must be positive");
            }
            let up = up_price
                .and_then(|p| calculator::up_pct_for_target(buy, p))
                .unwrap_or(0.0);
            let down = down_price
                .and_then(|p| calculator::down_pct_for_target(buy, p))
                .unwrap_or(0.0);
            println!("{}", view::render_price_move(&calculator::price_move(buy, up, down)));
        }
        CalcCommand::Put { strike, premium, contracts } => {
            let put = calculator::sell_put(strike, premium, contracts);
            println!("{}", view::render_sell_put(&put));
        }
        CalcCommand::Size { budget, price } => {
            let size = calculator::position_size(budget, price)
                .ok_or_else(|| anyhow::anyhow!("budget and share price must be positive"))?;
            println!("{}", view::render_position_size(&size));
        }
    }
    Ok(())
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Commands::Dashboard);
    let transport = HttpTransport::new(&config.user_agent)?;
    let cache = SameDayCache::new(FileStore::new(&config.cache_dir), config.time_zone);
    let dashboard = Dashboard::new(&transport, &cache, &config);
    let state = DashboardState::default();

    let state = match command {
        Commands::Calc { scenario } => return run_calc(scenario),
        Commands::Dashboard => {
            info!("Loading dashboard");
            let loaded = dashboard.on_load(&state).await;
            dashboard.refresh_view(&loaded)
        }
        Commands::Sentiment { force } => report(dashboard.update_sentiment(&state, force).await)?,
        Commands::Participation { force } => {
            report(dashboard.update_participation(&state, force).await)?
        }
        Commands::Returns => report(dashboard.update_returns(&state).await)?,
        Commands::Set { month, return_pct, sp20, sp50, cnn, crypto } => {
            let loaded = dashboard.on_load(&state).await;
            let metrics = MetricsUpdate {
                sp_participation_20: sp20,
                sp_participation_50: sp50,
                cnn_fear_greed: cnn,
                crypto_fear_greed: crypto,
                ..Default::default()
            };
            let entry = MonthlyReturn::new(month, return_pct);
            report(dashboard.apply_manual(&loaded, entry, &metrics))?
        }
    };

    println!("{}", view::render_dashboard(&state));
    Ok(())
}
