//! Time-windowed dashboard statistics
//!
//! Four stat cards, each comparing a current window against a prior
//! comparable window and deriving a trend direction plus a formatted delta.
//! Pure reads: the calculator never mutates the store and is safe to call
//! concurrently with itself and with the aggregator.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::format;
use crate::store::RunStore;

/// Direction of a stat's movement against its comparison window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    fn from_diff(diff: f64) -> Self {
        if diff > 0.0 {
            Trend::Up
        } else if diff < 0.0 {
            Trend::Down
        } else {
            Trend::Neutral
        }
    }
}

/// One dashboard stat, formatted for display plus the raw value for
/// programmatic consumers
#[derive(Debug, Clone, Serialize)]
pub struct StatCard {
    pub title: String,
    pub value: String,
    pub change: String,
    pub icon: String,
    pub trend: Trend,
    pub raw: f64,
}

/// The five reference points every card derives its windows from
#[derive(Debug, Clone, Copy)]
struct Windows {
    now: DateTime<Utc>,
    today: DateTime<Utc>,
    yesterday: DateTime<Utc>,
    last_week: DateTime<Utc>,
    last_hour: DateTime<Utc>,
    last_48h: DateTime<Utc>,
}

impl Windows {
    fn at(now: DateTime<Utc>) -> Self {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            now,
            today,
            yesterday: today - Duration::days(1),
            last_week: today - Duration::days(7),
            last_hour: now - Duration::hours(1),
            last_48h: now - Duration::hours(48),
        }
    }
}

pub struct DashboardStatsCalculator {
    store: Arc<dyn RunStore>,
}

impl DashboardStatsCalculator {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }

    /// Compute the four stat cards as of `now`. Calendar-day windows are
    /// taken in UTC.
    pub async fn compute(&self, now: DateTime<Utc>) -> Result<[StatCard; 4], StoreError> {
        let w = Windows::at(now);
        Ok([
            self.active_agents(&w).await?,
            self.runs_today(&w).await?,
            self.avg_response_time(&w).await?,
            self.cost_today(&w).await?,
        ])
    }

    /// Distinct agents with runs in the last 48 hours, compared against the
    /// distinct count since the start of last week.
    async fn active_agents(&self, w: &Windows) -> Result<StatCard, StoreError> {
        let current = self.store.active_agent_count(w.last_48h).await?;
        let previous = self.store.active_agent_count(w.last_week).await?;
        let diff = current as i64 - previous as i64;

        Ok(StatCard {
            title: "Active Agents".to_string(),
            value: current.to_string(),
            change: format!("{} from last week", format::signed_count(diff)),
            icon: "Bot".to_string(),
            trend: Trend::from_diff(diff as f64),
            raw: current as f64,
        })
    }

    async fn runs_today(&self, w: &Windows) -> Result<StatCard, StoreError> {
        let current = self.store.run_count_between(w.today, w.now).await?;
        let previous = self.store.run_count_between(w.yesterday, w.today).await?;
        let percent = percent_change(current as f64, previous as f64);

        Ok(StatCard {
            title: "Total Runs Today".to_string(),
            value: format::group_thousands(current),
            change: format!("{} from yesterday", format::signed_percent(percent)),
            icon: "Activity".to_string(),
            trend: Trend::from_diff(percent),
            raw: current as f64,
        })
    }

    /// Mean run time over the last hour against the hour before it. Trend
    /// "up" means the current window is slower, which is worse; readers of
    /// the card invert the color accordingly.
    async fn avg_response_time(&self, w: &Windows) -> Result<StatCard, StoreError> {
        let prev_hour = w.last_hour - Duration::hours(1);
        let current = self
            .store
            .avg_run_time_between(w.last_hour, w.now)
            .await?
            .unwrap_or(0.0);
        let previous = self
            .store
            .avg_run_time_between(prev_hour, w.last_hour)
            .await?
            .unwrap_or(0.0);
        let diff = current - previous;

        Ok(StatCard {
            title: "Avg Response Time".to_string(),
            value: format::seconds(current),
            change: format!("{} from last hour", format::signed_seconds(diff)),
            icon: "Clock".to_string(),
            trend: Trend::from_diff(diff),
            raw: current,
        })
    }

    async fn cost_today(&self, w: &Windows) -> Result<StatCard, StoreError> {
        let current = self.store.total_cost_between(w.today, w.now).await?;
        let previous = self.store.total_cost_between(w.yesterday, w.today).await?;
        let percent = percent_change(current, previous);

        Ok(StatCard {
            title: "Total Cost Today".to_string(),
            value: format::currency(current),
            change: format!("{} from yesterday", format::signed_percent(percent)),
            icon: "DollarSign".to_string(),
            trend: Trend::from_diff(percent),
            raw: current,
        })
    }
}

/// Percent change with a zero-comparison guard: a previous value of zero
/// yields 0 rather than an infinite or undefined change.
fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        ((current - previous) / previous) * 100.0
    }
}
