//! Data models for agents, versions, runs, and materialized metrics
//!
//! Runs are insert-only: once ingested they are never mutated or deleted.
//! `VersionMetrics` is a derived projection that is fully recomputed and
//! overwritten on every aggregation pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duration::RawDuration;

/// Well-known run status values. Status is deliberately an open string set;
/// producers may send anything, these are just the values the system reacts to.
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";
pub const STATUS_TIMEOUT: &str = "timeout";
pub const STATUS_RUNNING: &str = "running";

/// A named software entity whose executions are tracked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub project: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A specific deployed revision of an agent
///
/// The (agent_id, version) pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentVersion {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub version: String,
    pub cluster: String,
    pub tools: Vec<String>,
    pub models: Vec<String>,
    pub deployment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One execution of an agent version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub version_id: Uuid,
    pub version: String,
    /// When the run happened (event time, reported by the producer)
    pub created: DateTime<Utc>,
    pub status: String,
    /// Run time in seconds, normalized once at ingestion. `None` when the
    /// producer sent an unparseable value; such runs contribute nothing to
    /// averages.
    pub run_time_seconds: Option<f64>,
    pub initiator: String,
    pub tools: Vec<String>,
    pub models: Vec<String>,
    pub cost: f64,
    /// Producer-side run identifier
    pub run_id: i64,
    pub task_id: i64,
    /// When the run was persisted here
    pub recorded_at: DateTime<Utc>,
}

/// Materialized per-version statistics, keyed by the version id
///
/// A cache, not a source of truth: every field can be rebuilt from the raw
/// run and version records, and every aggregation pass replaces the whole
/// document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetrics {
    #[serde(rename = "id")]
    pub version_id: Uuid,
    pub name: String,
    pub project: String,
    pub status: String,
    #[serde(rename = "lastSeen")]
    pub last_seen: DateTime<Utc>,
    pub version: String,
    #[serde(rename = "avgRuntime")]
    pub avg_run_time: f64,
    #[serde(rename = "successRate")]
    pub success_rate: f64,
    #[serde(rename = "totalRuns")]
    pub total_runs: u64,
    pub spend: f64,
    pub tools: Vec<String>,
    pub models: Vec<String>,
    pub cluster: String,
}

/// One row of the recent-activity feed (latest runs joined with agent names)
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub agent: String,
    pub action: String,
    pub status: String,
    pub time: DateTime<Utc>,
    pub duration: Option<f64>,
    pub cost: f64,
}

/// Human-readable action label for an activity row
pub fn action_for_status(status: &str) -> &'static str {
    match status {
        STATUS_ERROR => "failed run",
        STATUS_TIMEOUT => "timed out",
        STATUS_RUNNING => "started run",
        _ => "completed run",
    }
}

/// Ingestion payload for a single run
///
/// `time_taken` arrives as either a number of seconds or a suffixed string
/// ("3.2s"); it is coerced exactly once, here at the boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRunRequest {
    pub created: DateTime<Utc>,
    pub status: String,
    pub time_taken: RawDuration,
    pub initiator: String,
    #[serde(default)]
    pub tools: Vec<String>,
    pub cost: f64,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(rename = "id")]
    pub run_id: i64,
    pub task_id: i64,
}

impl RegisterRunRequest {
    /// Build the stored run record for a known version, normalizing the
    /// duration and stamping the recorded-at time.
    pub fn into_run(self, version: &AgentVersion, recorded_at: DateTime<Utc>) -> AgentRun {
        AgentRun {
            id: Uuid::new_v4(),
            agent_id: version.agent_id,
            version_id: version.id,
            version: version.version.clone(),
            created: self.created,
            status: self.status,
            run_time_seconds: self.time_taken.as_seconds(),
            initiator: self.initiator,
            tools: self.tools,
            models: self.models,
            cost: self.cost,
            run_id: self.run_id,
            task_id: self.task_id,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version() -> AgentVersion {
        let now = Utc::now();
        AgentVersion {
            id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            version: "1.2.0".to_string(),
            cluster: "production".to_string(),
            tools: vec!["search".to_string()],
            models: vec!["gpt-4".to_string()],
            deployment: "kubernetes".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn register_run_normalizes_string_duration() {
        let version = version();
        let request: RegisterRunRequest = serde_json::from_value(serde_json::json!({
            "created": "2026-08-20T10:00:00Z",
            "status": "success",
            "time_taken": "3.2s",
            "initiator": "user",
            "cost": 0.05,
            "id": 42,
            "task_id": 7,
        }))
        .unwrap();

        let run = request.into_run(&version, Utc::now());
        assert_eq!(run.run_time_seconds, Some(3.2));
        assert_eq!(run.version_id, version.id);
        assert_eq!(run.version, "1.2.0");
    }

    #[test]
    fn register_run_keeps_numeric_duration() {
        let version = version();
        let request: RegisterRunRequest = serde_json::from_value(serde_json::json!({
            "created": "2026-08-20T10:00:00Z",
            "status": "error",
            "time_taken": 3.2,
            "initiator": "system",
            "cost": 0.01,
            "id": 43,
            "task_id": 7,
        }))
        .unwrap();

        let run = request.into_run(&version, Utc::now());
        assert_eq!(run.run_time_seconds, Some(3.2));
    }

    #[test]
    fn unparseable_duration_becomes_none() {
        let version = version();
        let request: RegisterRunRequest = serde_json::from_value(serde_json::json!({
            "created": "2026-08-20T10:00:00Z",
            "status": "success",
            "time_taken": "fast",
            "initiator": "user",
            "cost": 0.0,
            "id": 44,
            "task_id": 7,
        }))
        .unwrap();

        assert_eq!(request.into_run(&version, Utc::now()).run_time_seconds, None);
    }

    #[test]
    fn action_labels() {
        assert_eq!(action_for_status("error"), "failed run");
        assert_eq!(action_for_status("timeout"), "timed out");
        assert_eq!(action_for_status("running"), "started run");
        assert_eq!(action_for_status("success"), "completed run");
        assert_eq!(action_for_status("anything-else"), "completed run");
    }
}
