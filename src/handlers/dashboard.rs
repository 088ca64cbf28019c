// src/handlers/dashboard.rs
use log::{error, info, warn};

use crate::config::AppConfig;
use crate::models::{MarketMetrics, MetricsUpdate, MonthlyReturn};
use crate::services::cache::{local_today, KeyValueStore, SameDayCache};
use crate::services::fetcher::Transport;
use crate::services::market::{self, Origin};
use crate::services::stats::{calculate_return_stats, ReturnStats};

use super::error::{ActionError, Notice};

/// Everything the dashboard shows. Actions never mutate a state in place;
/// they hand back a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub metrics: MarketMetrics,
    pub returns: Vec<MonthlyReturn>,
}

impl DashboardState {
    pub fn with_metrics(&self, update: &MarketMetrics) -> DashboardState {
        DashboardState {
            metrics: self.metrics.merged(update),
            returns: self.returns.clone(),
        }
    }

    pub fn with_returns(&self, returns: Vec<MonthlyReturn>) -> DashboardState {
        DashboardState {
            metrics: self.metrics,
            returns,
        }
    }

    /// Inserts or replaces the return for `entry.month`, keeping the series
    /// ordered by month.
    pub fn with_month(&self, entry: MonthlyReturn) -> DashboardState {
        let mut returns: Vec<MonthlyReturn> = self
            .returns
            .iter()
            .filter(|r| r.month != entry.month)
            .cloned()
            .collect();
        let at = returns.partition_point(|r| r.month < entry.month);
        returns.insert(at, entry);
        DashboardState {
            metrics: self.metrics,
            returns,
        }
    }

    pub fn stats(&self) -> ReturnStats {
        calculate_return_stats(&self.returns)
    }
}

pub struct Dashboard<'a, T: ?Sized, S> {
    transport: &'a T,
    cache: &'a SameDayCache<S>,
    config: &'a AppConfig,
}

fn origin_suffix(origin: Origin) -> &'static str {
    match origin {
        Origin::Cache => " (from today's cache)",
        Origin::Network => "",
    }
}

impl<'a, T, S> Dashboard<'a, T, S>
where
    T: Transport + ?Sized,
    S: KeyValueStore,
{
    pub fn new(transport: &'a T, cache: &'a SameDayCache<S>, config: &'a AppConfig) -> Self {
        Dashboard {
            transport,
            cache,
            config,
        }
    }

    /// Startup refresh. Each family is cache-first; failures are logged and
    /// the previous values stay on screen.
    pub async fn on_load(&self, state: &DashboardState) -> DashboardState {
        let (sentiment, participation) = tokio::join!(
            market::load_sentiment(self.transport, self.cache, self.config, false),
            market::load_participation(self.transport, self.cache, self.config, false),
        );

        let mut next = state.clone();
        match sentiment {
            Ok((values, _)) => next = next.with_metrics(&values),
            Err(e) => warn!("Automatic sentiment refresh failed: {}", e),
        }
        match participation {
            Ok((values, _)) => next = next.with_metrics(&values),
            Err(e) => warn!("Automatic participation refresh failed: {}", e),
        }

        let today = local_today(self.config.time_zone);
        match market::fetch_spx_monthly_returns(self.transport, self.config, today).await {
            Ok(returns) => next = next.with_returns(returns),
            Err(e) => warn!("Automatic monthly returns refresh failed: {}", e),
        }
        next
    }

    /// Manual entry: one month's return plus any indicator values the user
    /// typed in. Nothing is fetched or cached.
    pub fn apply_manual(
        &self,
        state: &DashboardState,
        entry: MonthlyReturn,
        metrics: &MetricsUpdate,
    ) -> Result<(DashboardState, Notice), ActionError> {
        let (year, month) = entry.year_month().ok_or_else(|| {
            ActionError::new(format!("Month must look like YYYY-MM, got {:?}", entry.month))
        })?;
        if !entry.return_pct.is_finite() {
            return Err(ActionError::new("Monthly return must be a number"));
        }
        let month = format!("{:04}-{:02}", year, month);
        info!("Manual entry for {}: {}%", month, entry.return_pct);
        Ok((
            state
                .with_month(MonthlyReturn::new(month.clone(), entry.return_pct))
                .with_metrics(metrics),
            Notice(format!("Manual values applied for {}.", month)),
        ))
    }

    /// Re-derives the view from the current state without fetching.
    pub fn refresh_view(&self, state: &DashboardState) -> DashboardState {
        info!("Refreshing view");
        state.clone()
    }

    pub async fn update_sentiment(
        &self,
        state: &DashboardState,
        force: bool,
    ) -> Result<(DashboardState, Notice), ActionError> {
        let (values, origin) =
            market::load_sentiment(self.transport, self.cache, self.config, force)
                .await
                .map_err(|e| {
                    error!("Sentiment update failed: {}", e);
                    ActionError::from(e)
                })?;
        Ok((
            state.with_metrics(&values),
            Notice(format!("Sentiment indicators updated{}.", origin_suffix(origin))),
        ))
    }

    pub async fn update_participation(
        &self,
        state: &DashboardState,
        force: bool,
    ) -> Result<(DashboardState, Notice), ActionError> {
        let (values, origin) =
            market::load_participation(self.transport, self.cache, self.config, force)
                .await
                .map_err(|e| {
                    error!("Participation update failed: {}", e);
                    ActionError::from(e)
                })?;
        Ok((
            state.with_metrics(&values),
            Notice(format!("S&P participation updated{}.", origin_suffix(origin))),
        ))
    }

    /// Replaces the whole return series; nothing is merged.
    pub async fn update_returns(
        &self,
        state: &DashboardState,
    ) -> Result<(DashboardState, Notice), ActionError> {
        let today = local_today(self.config.time_zone);
        let returns = market::fetch_spx_monthly_returns(self.transport, self.config, today)
            .await
            .map_err(|e| {
                error!("Monthly returns update failed: {}", e);
                ActionError::from(e)
            })?;
        let count = returns.len();
        Ok((
            state.with_returns(returns),
            Notice(format!("Monthly returns updated ({} months).", count)),
        ))
    }
}
