// src/bin/probe_sources.rs
// Run with: cargo run --bin probe_sources
//
// Hits every configured endpoint (no fallback short-circuit) and reports
// whether its body is long enough and parses.

use dotenv::dotenv;
use log::{error, info, warn};

use market_pulse::config::{AppConfig, SourceList};
use market_pulse::error::Result;
use market_pulse::services::fetcher::{HttpTransport, Transport};
use market_pulse::services::market::{BREADTH_20D_TICKER, BREADTH_50D_TICKER};
use market_pulse::services::parsers;

type Parser = fn(&str) -> Result<String>;

fn monthly(body: &str) -> Result<String> {
    parsers::parse_monthly_csv(body).map(|rows| format!("{} monthly rows", rows.len()))
}

fn quote(body: &str) -> Result<String> {
    parsers::parse_quote_close(body).map(|v| format!("close {}", v))
}

fn chart(body: &str) -> Result<String> {
    parsers::parse_chart_price(body).map(|v| format!("price {}", v))
}

fn cnn(body: &str) -> Result<String> {
    parsers::parse_cnn_fear_greed(body).map(|v| format!("score {}", v))
}

fn crypto(body: &str) -> Result<String> {
    parsers::parse_crypto_fear_greed(body).map(|v| format!("score {}", v))
}

async fn probe(
    transport: &HttpTransport,
    name: &str,
    sources: &SourceList,
    parse: Parser,
) -> usize {
    let mut healthy = 0;
    for url in &sources.urls {
        info!("-----------------------------------------------------");
        info!("{}: {}", name, url);
        match transport.get_text(url).await {
            Ok(body) if body.chars().count() < sources.min_length => {
                warn!("SHORT: {} chars (need {})", body.chars().count(), sources.min_length);
            }
            Ok(body) => match parse(&body) {
                Ok(summary) => {
                    info!("OK: {}", summary);
                    healthy += 1;
                }
                Err(e) => error!("PARSE: {}", e),
            },
            Err(e) => error!("TRANSPORT: {}", e),
        }
    }
    healthy
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();
    let transport = HttpTransport::new(&config.user_agent)?;

    let families: Vec<(String, SourceList, Parser)> = vec![
        ("S&P 500 monthly".to_string(), config.spx_monthly.clone(), monthly),
        ("CNN fear & greed".to_string(), config.cnn_fear_greed.clone(), cnn),
        ("Crypto fear & greed".to_string(), config.crypto_fear_greed.clone(), crypto),
        ("VIX".to_string(), config.vix.clone(), chart),
        (
            format!("Breadth {}", BREADTH_20D_TICKER),
            config.participation.for_ticker(BREADTH_20D_TICKER),
            quote,
        ),
        (
            format!("Breadth {}", BREADTH_50D_TICKER),
            config.participation.for_ticker(BREADTH_50D_TICKER),
            quote,
        ),
    ];

    let mut dead = Vec::new();
    for (name, sources, parse) in &families {
        let healthy = probe(&transport, name, sources, *parse).await;
        info!("{}: {}/{} sources healthy", name, healthy, sources.urls.len());
        if healthy == 0 {
            dead.push(name.clone());
        }
    }

    if dead.is_empty() {
        info!("Every family has at least one working source");
        Ok(())
    } else {
        anyhow::bail!("no working source for: {}", dead.join(", "))
    }
}
