//! In-memory store for deterministic tests and local experimentation

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{action_for_status, ActivityEntry, Agent, AgentRun, AgentVersion, VersionMetrics};
use crate::store::{RunRollup, RunStore, SummaryStore};

#[derive(Debug, Default)]
struct Inner {
    agents: Vec<Agent>,
    versions: Vec<AgentVersion>,
    runs: Vec<AgentRun>,
    metrics: HashMap<Uuid, VersionMetrics>,
}

/// Stores everything behind a single mutex; cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn insert_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        self.inner().agents.push(agent.clone());
        Ok(())
    }

    async fn insert_version(&self, version: &AgentVersion) -> Result<(), StoreError> {
        let mut inner = self.inner();
        if !inner.agents.iter().any(|a| a.id == version.agent_id) {
            return Err(StoreError::not_found("agent"));
        }
        inner.versions.push(version.clone());
        Ok(())
    }

    async fn insert_run(&self, run: &AgentRun) -> Result<(), StoreError> {
        let mut inner = self.inner();
        if !inner.versions.iter().any(|v| v.id == run.version_id) {
            return Err(StoreError::not_found("agent version"));
        }
        inner.runs.push(run.clone());
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, StoreError> {
        Ok(self.inner().agents.clone())
    }

    async fn list_versions(&self) -> Result<Vec<AgentVersion>, StoreError> {
        Ok(self.inner().versions.clone())
    }

    async fn run_count(&self, version_id: Uuid) -> Result<u64, StoreError> {
        let inner = self.inner();
        Ok(inner.runs.iter().filter(|r| r.version_id == version_id).count() as u64)
    }

    async fn run_count_with_status(
        &self,
        version_id: Uuid,
        status: &str,
    ) -> Result<u64, StoreError> {
        let inner = self.inner();
        Ok(inner
            .runs
            .iter()
            .filter(|r| r.version_id == version_id && r.status == status)
            .count() as u64)
    }

    async fn latest_run(&self, version_id: Uuid) -> Result<Option<AgentRun>, StoreError> {
        let inner = self.inner();
        Ok(inner
            .runs
            .iter()
            .filter(|r| r.version_id == version_id)
            .max_by_key(|r| r.recorded_at)
            .cloned())
    }

    async fn run_rollup(&self, version_id: Uuid) -> Result<RunRollup, StoreError> {
        let inner = self.inner();
        let mut total_cost = 0.0;
        let mut time_sum = 0.0;
        let mut time_count = 0u64;
        for run in inner.runs.iter().filter(|r| r.version_id == version_id) {
            total_cost += run.cost;
            if let Some(seconds) = run.run_time_seconds {
                time_sum += seconds;
                time_count += 1;
            }
        }
        let avg_run_time = (time_count > 0).then(|| time_sum / time_count as f64);
        Ok(RunRollup { avg_run_time, total_cost })
    }

    async fn active_agent_count(&self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let inner = self.inner();
        let agents: std::collections::HashSet<Uuid> = inner
            .runs
            .iter()
            .filter(|r| r.created >= since)
            .map(|r| r.agent_id)
            .collect();
        Ok(agents.len() as u64)
    }

    async fn run_count_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let inner = self.inner();
        Ok(inner
            .runs
            .iter()
            .filter(|r| r.created >= start && r.created < end)
            .count() as u64)
    }

    async fn avg_run_time_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, StoreError> {
        let inner = self.inner();
        let mut sum = 0.0;
        let mut count = 0u64;
        for run in &inner.runs {
            if run.created >= start && run.created < end {
                if let Some(seconds) = run.run_time_seconds {
                    sum += seconds;
                    count += 1;
                }
            }
        }
        Ok((count > 0).then(|| sum / count as f64))
    }

    async fn total_cost_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, StoreError> {
        let inner = self.inner();
        Ok(inner
            .runs
            .iter()
            .filter(|r| r.created >= start && r.created < end)
            .map(|r| r.cost)
            .sum())
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, StoreError> {
        let inner = self.inner();
        let names: HashMap<Uuid, &str> =
            inner.agents.iter().map(|a| (a.id, a.name.as_str())).collect();

        let mut runs: Vec<&AgentRun> = inner.runs.iter().collect();
        runs.sort_by(|a, b| b.created.cmp(&a.created));

        Ok(runs
            .into_iter()
            .filter_map(|run| {
                let agent = names.get(&run.agent_id)?;
                Some(ActivityEntry {
                    id: run.run_id,
                    agent: agent.to_string(),
                    action: action_for_status(&run.status).to_string(),
                    status: run.status.clone(),
                    time: run.created,
                    duration: run.run_time_seconds,
                    cost: run.cost,
                })
            })
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn upsert_metrics(&self, metrics: &VersionMetrics) -> Result<(), StoreError> {
        self.inner().metrics.insert(metrics.version_id, metrics.clone());
        Ok(())
    }

    async fn list_metrics(&self) -> Result<Vec<VersionMetrics>, StoreError> {
        Ok(self.inner().metrics.values().cloned().collect())
    }
}
