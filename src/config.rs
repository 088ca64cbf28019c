// src/config.rs
use chrono_tz::Tz;
use log::{info, warn};
use std::env;
use std::path::PathBuf;

pub const TICKER_PLACEHOLDER: &str = "{ticker}";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const SPX_MONTHLY_SOURCES: &[&str] = &[
    "https://stooq.pl/q/d/l/?s=%5Espx&i=m",
    "https://r.jina.ai/http://stooq.pl/q/d/l/?s=%5Espx&i=m",
    "https://api.allorigins.win/raw?url=https%3A%2F%2Fstooq.pl%2Fq%2Fd%2Fl%2F%3Fs%3D%255Espx%26i%3Dm",
];

const CNN_SOURCES: &[&str] = &[
    "https://production.dataviz.cnn.io/index/fearandgreed/graphdata",
    "https://r.jina.ai/https://production.dataviz.cnn.io/index/fearandgreed/graphdata",
];

const CRYPTO_SOURCES: &[&str] = &[
    "https://api.alternative.me/fng/?limit=1",
    "https://api.allorigins.win/raw?url=https://api.alternative.me/fng/?limit=1",
];

const VIX_SOURCES: &[&str] = &[
    "https://query1.finance.yahoo.com/v8/finance/chart/%5EVIX?interval=1d&range=5d",
    "https://query2.finance.yahoo.com/v8/finance/chart/%5EVIX?interval=1d&range=5d",
    "https://r.jina.ai/https://query1.finance.yahoo.com/v8/finance/chart/%5EVIX?interval=1d&range=5d",
];

const PARTICIPATION_SOURCES: &[&str] = &[
    "https://stooq.pl/q/l/?s={ticker}&f=sd2t2ohlcv&h&e=csv",
    "https://r.jina.ai/http://stooq.pl/q/l/?s={ticker}&f=sd2t2ohlcv&h&e=csv",
    "https://api.allorigins.win/raw?url=https%3A%2F%2Fstooq.pl%2Fq%2Fl%2F%3Fs%3D{ticker}%26f%3Dsd2t2ohlcv%26h%26e%3Dcsv",
];

/// An ordered list of endpoints for one feed. Earlier entries win.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceList {
    pub urls: Vec<String>,
    pub min_length: usize,
}

impl SourceList {
    pub fn new<S: Into<String>>(urls: impl IntoIterator<Item = S>, min_length: usize) -> Self {
        SourceList {
            urls: urls.into_iter().map(Into::into).collect(),
            min_length,
        }
    }

    /// Substitutes `{ticker}` in every URL.
    pub fn for_ticker(&self, ticker: &str) -> SourceList {
        SourceList {
            urls: self
                .urls
                .iter()
                .map(|u| u.replace(TICKER_PLACEHOLDER, ticker))
                .collect(),
            min_length: self.min_length,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cache_dir: PathBuf,
    /// Zone used to decide what "today" is. `None` means the machine's local zone.
    pub time_zone: Option<Tz>,
    pub user_agent: String,
    pub spx_monthly: SourceList,
    pub cnn_fear_greed: SourceList,
    pub crypto_fear_greed: SourceList,
    pub vix: SourceList,
    pub participation: SourceList,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig::from_lookup(|_| None)
    }
}

impl AppConfig {
    /// Reads configuration from the process environment. Call `dotenv().ok()`
    /// beforehand to pick up a `.env` file.
    pub fn from_env() -> Self {
        let config = AppConfig::from_lookup(|key| env::var(key).ok());
        info!("Using cache directory: {}", config.cache_dir.display());
        config
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_dir = lookup("MARKET_PULSE_CACHE_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".market-pulse-cache"));

        let time_zone = lookup("MARKET_PULSE_TZ").and_then(|raw| match raw.trim().parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(e) => {
                warn!("Ignoring MARKET_PULSE_TZ={:?}: {}", raw, e);
                None
            }
        });

        let user_agent = lookup("MARKET_PULSE_USER_AGENT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let sources = |key: &str, defaults: &[&str], min_length: usize| {
            let urls = lookup(key)
                .map(|raw| split_urls(&raw))
                .filter(|urls| !urls.is_empty())
                .unwrap_or_else(|| defaults.iter().map(|s| s.to_string()).collect());
            SourceList { urls, min_length }
        };

        AppConfig {
            cache_dir,
            time_zone,
            user_agent,
            spx_monthly: sources("MARKET_PULSE_SPX_MONTHLY_SOURCES", SPX_MONTHLY_SOURCES, 20),
            cnn_fear_greed: sources("MARKET_PULSE_CNN_SOURCES", CNN_SOURCES, 2),
            crypto_fear_greed: sources("MARKET_PULSE_CRYPTO_SOURCES", CRYPTO_SOURCES, 2),
            vix: sources("MARKET_PULSE_VIX_SOURCES", VIX_SOURCES, 2),
            participation: sources("MARKET_PULSE_PARTICIPATION_SOURCES", PARTICIPATION_SOURCES, 10),
        }
    }
}

fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
