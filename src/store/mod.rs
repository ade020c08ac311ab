//! Store layer: persistence seams for runs and materialized metrics
//!
//! Both traits are constructor-injected into the aggregator and the
//! dashboard calculator, so tests can swap in [`MemoryStore`]. The default
//! backing store is [`SqliteStore`]; both implementations satisfy both
//! traits since runs and summaries live in the same physical database.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{ActivityEntry, Agent, AgentRun, AgentVersion, VersionMetrics};

/// Per-version aggregate over all of a version's runs
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunRollup {
    /// Mean run time over runs with a parseable duration; `None` when no
    /// run carries one
    pub avg_run_time: Option<f64>,
    pub total_cost: f64,
}

/// Read and ingestion operations over agents, versions, and runs
///
/// Windowed queries filter on the run's `created` (event) timestamp and use
/// half-open `[start, end)` windows.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn insert_agent(&self, agent: &Agent) -> Result<(), StoreError>;
    /// Fails with [`StoreError::NotFound`] when the owning agent is absent.
    async fn insert_version(&self, version: &AgentVersion) -> Result<(), StoreError>;
    /// Fails with [`StoreError::NotFound`] when the owning version is absent.
    async fn insert_run(&self, run: &AgentRun) -> Result<(), StoreError>;

    async fn list_agents(&self) -> Result<Vec<Agent>, StoreError>;
    async fn list_versions(&self) -> Result<Vec<AgentVersion>, StoreError>;

    async fn run_count(&self, version_id: Uuid) -> Result<u64, StoreError>;
    async fn run_count_with_status(
        &self,
        version_id: Uuid,
        status: &str,
    ) -> Result<u64, StoreError>;
    /// The version's most recent run by recorded-at time
    async fn latest_run(&self, version_id: Uuid) -> Result<Option<AgentRun>, StoreError>;
    async fn run_rollup(&self, version_id: Uuid) -> Result<RunRollup, StoreError>;

    /// Count of distinct agents with at least one run since `since`
    async fn active_agent_count(&self, since: DateTime<Utc>) -> Result<u64, StoreError>;
    async fn run_count_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
    async fn avg_run_time_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, StoreError>;
    async fn total_cost_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, StoreError>;

    /// The most recent runs joined with agent names, newest first
    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, StoreError>;
}

/// Materialized metrics, one document per agent version
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Replace-entire-document upsert keyed by version id
    async fn upsert_metrics(&self, metrics: &VersionMetrics) -> Result<(), StoreError>;
    async fn list_metrics(&self) -> Result<Vec<VersionMetrics>, StoreError>;
}
