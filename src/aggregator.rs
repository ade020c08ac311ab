//! Batch aggregation of per-version metrics
//!
//! One pass lists every agent and version, then fans one unit of work per
//! version out across a fixed pool of workers. Each unit recomputes that
//! version's metrics from raw runs and upserts the summary document. Units
//! are independent: a failing unit is counted and skipped, never aborting
//! its siblings. The pass returns a structured report instead of relying on
//! log output alone.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Agent, AgentVersion, VersionMetrics, STATUS_ERROR};
use crate::store::{RunStore, SummaryStore};

/// Default number of concurrent workers per aggregation pass
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Outcome of one aggregation pass
#[derive(Debug, Default)]
pub struct AggregateReport {
    pub processed: usize,
    pub failed: usize,
    pub failures: Vec<VersionFailure>,
}

impl AggregateReport {
    fn merge(&mut self, other: AggregateReport) {
        self.processed += other.processed;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }
}

/// A version whose unit of work failed; its summary document is left
/// unchanged until the next pass.
#[derive(Debug)]
pub struct VersionFailure {
    pub version_id: Uuid,
    pub version: String,
    pub reason: String,
}

pub struct MetricsAggregator {
    runs: Arc<dyn RunStore>,
    summaries: Arc<dyn SummaryStore>,
    worker_count: usize,
}

impl MetricsAggregator {
    pub fn new(runs: Arc<dyn RunStore>, summaries: Arc<dyn SummaryStore>) -> Self {
        Self { runs, summaries, worker_count: DEFAULT_WORKER_COUNT }
    }

    /// Set the worker pool size (clamped to at least one worker)
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    /// Run one full aggregation pass over all known agent versions.
    ///
    /// Returns an error only when the initial agent/version scans fail;
    /// per-version failures are reported in the [`AggregateReport`]. When
    /// `cancel` fires, in-flight units finish, queued work is abandoned,
    /// and the partial report is returned.
    pub async fn aggregate(
        &self,
        cancel: CancellationToken,
    ) -> Result<AggregateReport, StoreError> {
        let agents = self.runs.list_agents().await?;
        let versions = self.runs.list_versions().await?;
        info!(agents = agents.len(), versions = versions.len(), "starting aggregation pass");

        // Read-only lookup shared by every worker
        let lookup: Arc<HashMap<Uuid, Agent>> =
            Arc::new(agents.into_iter().map(|a| (a.id, a)).collect());

        // Bounded to the pool size so dispatch blocks when workers are busy
        let (tx, rx) = mpsc::channel::<AgentVersion>(self.worker_count);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut workers = JoinSet::new();
        for _ in 0..self.worker_count {
            let rx = Arc::clone(&rx);
            let runs = Arc::clone(&self.runs);
            let summaries = Arc::clone(&self.summaries);
            let lookup = Arc::clone(&lookup);
            let cancel = cancel.clone();

            workers.spawn(async move {
                let mut report = AggregateReport::default();
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let version = { rx.lock().await.recv().await };
                    let Some(version) = version else { break };

                    match process_version(runs.as_ref(), summaries.as_ref(), &lookup, &version)
                        .await
                    {
                        Ok(()) => {
                            debug!(version_id = %version.id, version = %version.version, "version aggregated");
                            report.processed += 1;
                        }
                        Err(reason) => {
                            warn!(
                                version_id = %version.id,
                                version = %version.version,
                                %reason,
                                "skipping version"
                            );
                            report.failed += 1;
                            report.failures.push(VersionFailure {
                                version_id: version.id,
                                version: version.version,
                                reason,
                            });
                        }
                    }
                }
                report
            });
        }

        for version in versions {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("aggregation pass cancelled, abandoning queued work");
                    break;
                }
                sent = tx.send(version) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        drop(tx);

        // Join barrier: the pass does not return until every worker drained
        let mut total = AggregateReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(part) => total.merge(part),
                Err(err) => warn!(%err, "aggregation worker panicked"),
            }
        }

        info!(processed = total.processed, failed = total.failed, "aggregation pass finished");
        Ok(total)
    }
}

/// Compute and upsert one version's metrics. The error string is the
/// per-unit failure reason recorded in the report.
async fn process_version(
    runs: &dyn RunStore,
    summaries: &dyn SummaryStore,
    agents: &HashMap<Uuid, Agent>,
    version: &AgentVersion,
) -> Result<(), String> {
    let total = runs
        .run_count(version.id)
        .await
        .map_err(|err| format!("run count: {err}"))?;
    let errors = runs
        .run_count_with_status(version.id, STATUS_ERROR)
        .await
        .map_err(|err| format!("error count: {err}"))?;
    let last = runs
        .latest_run(version.id)
        .await
        .map_err(|err| format!("latest run: {err}"))?
        .ok_or_else(|| "no runs recorded".to_string())?;
    let rollup = runs
        .run_rollup(version.id)
        .await
        .map_err(|err| format!("run rollup: {err}"))?;

    let success_rate = if total == 0 {
        0.0
    } else {
        (total.saturating_sub(errors) as f64 / total as f64) * 100.0
    };

    // An orphaned version (agent missing from the lookup) is not an error;
    // the denormalized fields are just left empty.
    let (name, project) = match agents.get(&version.agent_id) {
        Some(agent) => (agent.name.clone(), agent.project.clone()),
        None => (String::new(), String::new()),
    };

    let metrics = VersionMetrics {
        version_id: version.id,
        name,
        project,
        status: last.status.clone(),
        last_seen: last.recorded_at,
        version: version.version.clone(),
        avg_run_time: rollup.avg_run_time.unwrap_or(0.0),
        success_rate,
        total_runs: total,
        spend: rollup.total_cost,
        tools: version.tools.clone(),
        models: version.models.clone(),
        cluster: version.cluster.clone(),
    };

    summaries
        .upsert_metrics(&metrics)
        .await
        .map_err(|err| format!("upsert: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AgentRun;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn agent(name: &str) -> Agent {
        let now = Utc::now();
        Agent {
            id: Uuid::new_v4(),
            name: name.to_string(),
            project: format!("{name}-project"),
            created_at: now,
            updated_at: now,
        }
    }

    fn version(agent_id: Uuid, label: &str) -> AgentVersion {
        let now = Utc::now();
        AgentVersion {
            id: Uuid::new_v4(),
            agent_id,
            version: label.to_string(),
            cluster: "production".to_string(),
            tools: vec!["search".to_string()],
            models: vec!["gpt-4".to_string()],
            deployment: "kubernetes".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn run(version: &AgentVersion, status: &str, seconds: Option<f64>, cost: f64) -> AgentRun {
        let at = Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap();
        AgentRun {
            id: Uuid::new_v4(),
            agent_id: version.agent_id,
            version_id: version.id,
            version: version.version.clone(),
            created: at,
            status: status.to_string(),
            run_time_seconds: seconds,
            initiator: "test".to_string(),
            tools: vec![],
            models: vec![],
            cost,
            run_id: 1,
            task_id: 1,
            recorded_at: at,
        }
    }

    #[tokio::test]
    async fn computes_metrics_for_mixed_statuses() {
        let store = Arc::new(MemoryStore::new());
        let a = agent("search-agent");
        let v = version(a.id, "1.0.0");
        store.insert_agent(&a).await.unwrap();
        store.insert_version(&v).await.unwrap();
        store.insert_run(&run(&v, "success", Some(2.0), 1.0)).await.unwrap();
        store.insert_run(&run(&v, "error", Some(4.0), 2.0)).await.unwrap();

        let aggregator = MetricsAggregator::new(store.clone(), store.clone());
        let report = aggregator.aggregate(CancellationToken::new()).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 0);

        let metrics = store.list_metrics().await.unwrap();
        assert_eq!(metrics.len(), 1);
        let m = &metrics[0];
        assert_eq!(m.total_runs, 2);
        assert_eq!(m.success_rate, 50.0);
        assert_eq!(m.avg_run_time, 3.0);
        assert!((m.spend - 3.0).abs() < 1e-9);
        assert_eq!(m.name, "search-agent");
        assert_eq!(m.project, "search-agent-project");
        assert_eq!(m.status, "error");
    }

    #[tokio::test]
    async fn version_without_runs_is_reported_not_upserted() {
        let store = Arc::new(MemoryStore::new());
        let a = agent("chat-agent");
        let v = version(a.id, "1.0.0");
        store.insert_agent(&a).await.unwrap();
        store.insert_version(&v).await.unwrap();

        let aggregator = MetricsAggregator::new(store.clone(), store.clone());
        let report = aggregator.aggregate(CancellationToken::new()).await.unwrap();

        assert_eq!(report.processed, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].version_id, v.id);
        assert_eq!(report.failures[0].reason, "no runs recorded");
        assert!(store.list_metrics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn aggregation_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let a = agent("code-agent");
        let v = version(a.id, "1.1.0");
        store.insert_agent(&a).await.unwrap();
        store.insert_version(&v).await.unwrap();
        store.insert_run(&run(&v, "success", Some(1.5), 0.2)).await.unwrap();

        let aggregator = MetricsAggregator::new(store.clone(), store.clone());
        aggregator.aggregate(CancellationToken::new()).await.unwrap();
        let first = store.list_metrics().await.unwrap();
        aggregator.aggregate(CancellationToken::new()).await.unwrap();
        let second = store.list_metrics().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn orphaned_version_gets_empty_agent_fields() {
        let store = Arc::new(MemoryStore::new());
        let a = agent("data-agent");
        let v = version(a.id, "2.0.0");
        store.insert_agent(&a).await.unwrap();
        store.insert_version(&v).await.unwrap();
        store.insert_run(&run(&v, "success", Some(1.0), 0.1)).await.unwrap();

        // An empty lookup simulates the orphan case without a second store
        let lookup = HashMap::new();
        process_version(store.as_ref(), store.as_ref(), &lookup, &v)
            .await
            .unwrap();

        let metrics = store.list_metrics().await.unwrap();
        assert_eq!(metrics[0].name, "");
        assert_eq!(metrics[0].project, "");
    }

    #[tokio::test]
    async fn cancelled_pass_returns_promptly_with_partial_report() {
        let store = Arc::new(MemoryStore::new());
        let a = agent("image-agent");
        store.insert_agent(&a).await.unwrap();
        for i in 0..50 {
            let v = version(a.id, &format!("1.0.{i}"));
            store.insert_version(&v).await.unwrap();
            store.insert_run(&run(&v, "success", Some(1.0), 0.1)).await.unwrap();
        }

        let cancel = CancellationToken::new();
        cancel.cancel();
        let aggregator = MetricsAggregator::new(store.clone(), store.clone());
        let report = aggregator.aggregate(cancel).await.unwrap();

        assert!(report.processed + report.failed < 50);
    }
}
