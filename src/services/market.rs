// src/services/market.rs
use chrono::NaiveDate;
use log::{debug, info};

use crate::config::{AppConfig, SourceList};
use crate::error::Result;
use crate::models::{MetricsUpdate, MonthlyReturn};
use crate::services::cache::{
    KeyValueStore, SameDayCache, PARTICIPATION_CACHE_KEY, SENTIMENT_CACHE_KEY,
};
use crate::services::fetcher::{fetch_first_available, Transport};
use crate::services::parsers;
use crate::services::returns::derive_monthly_returns;

pub const BREADTH_20D_TICKER: &str = "s5tw";
pub const BREADTH_50D_TICKER: &str = "s5fi";

/// Where a family's values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Network,
}

pub async fn fetch_cnn_fear_greed<T: Transport + ?Sized>(
    transport: &T,
    sources: &SourceList,
) -> Result<f64> {
    let body = fetch_first_available(transport, sources).await?;
    let score = parsers::parse_cnn_fear_greed(&body)?;
    info!("CNN fear/greed score: {}", score);
    Ok(score.round())
}

pub async fn fetch_crypto_fear_greed<T: Transport + ?Sized>(
    transport: &T,
    sources: &SourceList,
) -> Result<f64> {
    let body = fetch_first_available(transport, sources).await?;
    let score = parsers::parse_crypto_fear_greed(&body)?;
    info!("Crypto fear/greed score: {}", score);
    Ok(score.round())
}

pub async fn fetch_vix<T: Transport + ?Sized>(transport: &T, sources: &SourceList) -> Result<f64> {
    let body = fetch_first_available(transport, sources).await?;
    let price = parsers::parse_chart_price(&body)?;
    info!("VIX: {}", price);
    Ok((price * 100.0).round() / 100.0)
}

/// Percentage of index members above a moving average, as a whole number.
pub async fn fetch_breadth<T: Transport + ?Sized>(
    transport: &T,
    sources: &SourceList,
    ticker: &str,
) -> Result<f64> {
    let body = fetch_first_available(transport, &sources.for_ticker(ticker)).await?;
    let close = parsers::parse_quote_close(&body)?;
    info!("Breadth {}: {}", ticker, close);
    Ok(close.round())
}

/// CNN, crypto and VIX requested together; any one failing fails the set.
pub async fn fetch_sentiment<T: Transport + ?Sized>(
    transport: &T,
    config: &AppConfig,
) -> Result<MetricsUpdate> {
    let (cnn, crypto, vix) = tokio::try_join!(
        fetch_cnn_fear_greed(transport, &config.cnn_fear_greed),
        fetch_crypto_fear_greed(transport, &config.crypto_fear_greed),
        fetch_vix(transport, &config.vix),
    )?;
    Ok(MetricsUpdate {
        vix: Some(vix),
        cnn_fear_greed: Some(cnn),
        crypto_fear_greed: Some(crypto),
        ..Default::default()
    })
}

pub async fn fetch_participation<T: Transport + ?Sized>(
    transport: &T,
    config: &AppConfig,
) -> Result<MetricsUpdate> {
    let (d20, d50) = tokio::try_join!(
        fetch_breadth(transport, &config.participation, BREADTH_20D_TICKER),
        fetch_breadth(transport, &config.participation, BREADTH_50D_TICKER),
    )?;
    Ok(MetricsUpdate {
        sp_participation_20: Some(d20),
        sp_participation_50: Some(d50),
        ..Default::default()
    })
}

pub async fn fetch_spx_monthly_returns<T: Transport + ?Sized>(
    transport: &T,
    config: &AppConfig,
    today: NaiveDate,
) -> Result<Vec<MonthlyReturn>> {
    let body = fetch_first_available(transport, &config.spx_monthly).await?;
    let rows = parsers::parse_monthly_csv(&body)?;
    debug!("Parsed {} monthly rows", rows.len());
    derive_monthly_returns(&rows, today)
}

async fn cache_first<S, F, Fut>(
    cache: &SameDayCache<S>,
    key: &str,
    force: bool,
    fetch: F,
) -> Result<(MetricsUpdate, Origin)>
where
    S: KeyValueStore,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<MetricsUpdate>>,
{
    if !force {
        if let Some(values) = cache.load::<MetricsUpdate>(key).await {
            info!("Using today's cached {}", key);
            return Ok((values, Origin::Cache));
        }
    }
    let values = fetch().await?;
    cache.save(key, &values).await;
    Ok((values, Origin::Network))
}

pub async fn load_sentiment<T, S>(
    transport: &T,
    cache: &SameDayCache<S>,
    config: &AppConfig,
    force: bool,
) -> Result<(MetricsUpdate, Origin)>
where
    T: Transport + ?Sized,
    S: KeyValueStore,
{
    cache_first(cache, SENTIMENT_CACHE_KEY, force, || fetch_sentiment(transport, config)).await
}

pub async fn load_participation<T, S>(
    transport: &T,
    cache: &SameDayCache<S>,
    config: &AppConfig,
    force: bool,
) -> Result<(MetricsUpdate, Origin)>
where
    T: Transport + ?Sized,
    S: KeyValueStore,
{
    cache_first(cache, PARTICIPATION_CACHE_KEY, force, || {
        fetch_participation(transport, config)
    })
    .await
}
