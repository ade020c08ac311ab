//! agentpulse - agent run metrics
//!
//! Tracks agents, their deployed versions, and individual execution runs,
//! and materializes per-version statistics for a dashboard.
//!
//! Two entry points matter:
//!
//! 1. [`MetricsAggregator`] - a batch pass that recomputes one summary
//!    document per agent version over a bounded worker pool and upserts it
//!    into the summary store.
//! 2. [`DashboardStatsCalculator`] - four time-windowed comparison
//!    statistics (active agents, runs today, average response time, cost
//!    today), each with a trend against a prior comparable window.
//!
//! Both read through the [`store::RunStore`] trait; swap in
//! [`store::MemoryStore`] for tests or [`store::SqliteStore`] for the real
//! thing.
//!
//! ```ignore
//! let store = Arc::new(SqliteStore::open_default()?);
//! let report = MetricsAggregator::new(store.clone(), store.clone())
//!     .aggregate(CancellationToken::new())
//!     .await?;
//! let cards = DashboardStatsCalculator::new(store).compute(Utc::now()).await?;
//! ```

pub mod aggregator;
pub mod config;
pub mod dashboard;
pub mod duration;
pub mod error;
pub mod format;
pub mod model;
pub mod store;

pub use aggregator::{AggregateReport, MetricsAggregator, DEFAULT_WORKER_COUNT};
pub use dashboard::{DashboardStatsCalculator, StatCard, Trend};
pub use error::StoreError;
