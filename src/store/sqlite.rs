//! SQLite-backed store
//!
//! Single connection behind a mutex, WAL mode for concurrent readers, and
//! schema bootstrap on open. Timestamps are stored as integer milliseconds
//! since the epoch; tool and model lists as JSON text.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::config::Config;
use crate::error::StoreError;
use crate::model::{action_for_status, ActivityEntry, Agent, AgentRun, AgentVersion, VersionMetrics};
use crate::store::{RunRollup, RunStore, SummaryStore};

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the metrics database at the default location
    /// (`~/.agentpulse/metrics.db`).
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(&Config::data_dir().join("metrics.db"))
    }

    /// Open or create the metrics database at a specific path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create data dir: {}", parent.display()))
                .map_err(StoreError::unavailable)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open metrics db: {}", path.display()))
            .map_err(StoreError::unavailable)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("metrics db lock poisoned")
    }

    fn version_exists(conn: &Connection, version_id: Uuid) -> Result<bool, StoreError> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM agent_versions WHERE id = ?1)",
            [version_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    fn agent_exists(conn: &Connection, agent_id: Uuid) -> Result<bool, StoreError> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM agents WHERE id = ?1)",
            [agent_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }
}

#[async_trait]
impl RunStore for SqliteStore {
    async fn insert_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            r#"INSERT INTO agents (id, name, project, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                agent.id.to_string(),
                agent.name,
                agent.project,
                agent.created_at.timestamp_millis(),
                agent.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    async fn insert_version(&self, version: &AgentVersion) -> Result<(), StoreError> {
        let conn = self.conn();
        if !Self::agent_exists(&conn, version.agent_id)? {
            return Err(StoreError::not_found("agent"));
        }
        conn.execute(
            r#"INSERT INTO agent_versions
               (id, agent_id, version, cluster, deployment, tools, models, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                version.id.to_string(),
                version.agent_id.to_string(),
                version.version,
                version.cluster,
                version.deployment,
                to_json(&version.tools),
                to_json(&version.models),
                version.created_at.timestamp_millis(),
                version.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    async fn insert_run(&self, run: &AgentRun) -> Result<(), StoreError> {
        let conn = self.conn();
        if !Self::version_exists(&conn, run.version_id)? {
            return Err(StoreError::not_found("agent version"));
        }
        conn.execute(
            r#"INSERT INTO agent_runs
               (id, agent_id, version_id, version, created, status, run_time_seconds,
                initiator, tools, models, cost, run_id, task_id, recorded_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
            params![
                run.id.to_string(),
                run.agent_id.to_string(),
                run.version_id.to_string(),
                run.version,
                run.created.timestamp_millis(),
                run.status,
                run.run_time_seconds,
                run.initiator,
                to_json(&run.tools),
                to_json(&run.models),
                run.cost,
                run.run_id,
                run.task_id,
                run.recorded_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, project, created_at, updated_at FROM agents")?;
        let rows = stmt.query_map([], agent_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn list_versions(&self) -> Result<Vec<AgentVersion>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, agent_id, version, cluster, deployment, tools, models, created_at, updated_at
             FROM agent_versions",
        )?;
        let rows = stmt.query_map([], version_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn run_count(&self, version_id: Uuid) -> Result<u64, StoreError> {
        let conn = self.conn();
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM agent_runs WHERE version_id = ?1",
            [version_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn run_count_with_status(
        &self,
        version_id: Uuid,
        status: &str,
    ) -> Result<u64, StoreError> {
        let conn = self.conn();
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM agent_runs WHERE version_id = ?1 AND status = ?2",
            params![version_id.to_string(), status],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn latest_run(&self, version_id: Uuid) -> Result<Option<AgentRun>, StoreError> {
        let conn = self.conn();
        let run = conn
            .query_row(
                r#"SELECT id, agent_id, version_id, version, created, status, run_time_seconds,
                          initiator, tools, models, cost, run_id, task_id, recorded_at
                   FROM agent_runs WHERE version_id = ?1
                   ORDER BY recorded_at DESC LIMIT 1"#,
                [version_id.to_string()],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    async fn run_rollup(&self, version_id: Uuid) -> Result<RunRollup, StoreError> {
        let conn = self.conn();
        // AVG skips NULL durations, so unparseable ingests don't skew the mean
        let rollup = conn.query_row(
            r#"SELECT AVG(run_time_seconds), COALESCE(SUM(cost), 0.0)
               FROM agent_runs WHERE version_id = ?1"#,
            [version_id.to_string()],
            |row| {
                Ok(RunRollup {
                    avg_run_time: row.get(0)?,
                    total_cost: row.get(1)?,
                })
            },
        )?;
        Ok(rollup)
    }

    async fn active_agent_count(&self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.conn();
        let count: u64 = conn.query_row(
            "SELECT COUNT(DISTINCT agent_id) FROM agent_runs WHERE created >= ?1",
            [since.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn run_count_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let conn = self.conn();
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM agent_runs WHERE created >= ?1 AND created < ?2",
            params![start.timestamp_millis(), end.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn avg_run_time_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, StoreError> {
        let conn = self.conn();
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(run_time_seconds) FROM agent_runs WHERE created >= ?1 AND created < ?2",
            params![start.timestamp_millis(), end.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(avg)
    }

    async fn total_cost_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, StoreError> {
        let conn = self.conn();
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(cost), 0.0) FROM agent_runs WHERE created >= ?1 AND created < ?2",
            params![start.timestamp_millis(), end.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"SELECT r.run_id, a.name, r.status, r.created, r.run_time_seconds, r.cost
               FROM agent_runs r
               INNER JOIN agents a ON a.id = r.agent_id
               ORDER BY r.created DESC
               LIMIT ?1"#,
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            let status: String = row.get(2)?;
            Ok(ActivityEntry {
                id: row.get(0)?,
                agent: row.get(1)?,
                action: action_for_status(&status).to_string(),
                status,
                time: millis_to_datetime(row.get(3)?),
                duration: row.get(4)?,
                cost: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[async_trait]
impl SummaryStore for SqliteStore {
    async fn upsert_metrics(&self, metrics: &VersionMetrics) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            r#"INSERT OR REPLACE INTO version_metrics
               (version_id, name, project, status, last_seen, version, avg_run_time,
                success_rate, total_runs, spend, tools, models, cluster)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
            params![
                metrics.version_id.to_string(),
                metrics.name,
                metrics.project,
                metrics.status,
                metrics.last_seen.timestamp_millis(),
                metrics.version,
                metrics.avg_run_time,
                metrics.success_rate,
                metrics.total_runs,
                metrics.spend,
                to_json(&metrics.tools),
                to_json(&metrics.models),
                metrics.cluster,
            ],
        )?;
        Ok(())
    }

    async fn list_metrics(&self) -> Result<Vec<VersionMetrics>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"SELECT version_id, name, project, status, last_seen, version, avg_run_time,
                      success_rate, total_runs, spend, tools, models, cluster
               FROM version_metrics"#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(VersionMetrics {
                version_id: parse_uuid(0, row.get(0)?)?,
                name: row.get(1)?,
                project: row.get(2)?,
                status: row.get(3)?,
                last_seen: millis_to_datetime(row.get(4)?),
                version: row.get(5)?,
                avg_run_time: row.get(6)?,
                success_rate: row.get(7)?,
                total_runs: row.get(8)?,
                spend: row.get(9)?,
                tools: parse_list(10, row.get(10)?)?,
                models: parse_list(11, row.get(11)?)?,
                cluster: row.get(12)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: parse_uuid(0, row.get(0)?)?,
        name: row.get(1)?,
        project: row.get(2)?,
        created_at: millis_to_datetime(row.get(3)?),
        updated_at: millis_to_datetime(row.get(4)?),
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<AgentVersion> {
    Ok(AgentVersion {
        id: parse_uuid(0, row.get(0)?)?,
        agent_id: parse_uuid(1, row.get(1)?)?,
        version: row.get(2)?,
        cluster: row.get(3)?,
        deployment: row.get(4)?,
        tools: parse_list(5, row.get(5)?)?,
        models: parse_list(6, row.get(6)?)?,
        created_at: millis_to_datetime(row.get(7)?),
        updated_at: millis_to_datetime(row.get(8)?),
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRun> {
    Ok(AgentRun {
        id: parse_uuid(0, row.get(0)?)?,
        agent_id: parse_uuid(1, row.get(1)?)?,
        version_id: parse_uuid(2, row.get(2)?)?,
        version: row.get(3)?,
        created: millis_to_datetime(row.get(4)?),
        status: row.get(5)?,
        run_time_seconds: row.get(6)?,
        initiator: row.get(7)?,
        tools: parse_list(8, row.get(8)?)?,
        models: parse_list(9, row.get(9)?)?,
        cost: row.get(10)?,
        run_id: row.get(11)?,
        task_id: row.get(12)?,
        recorded_at: millis_to_datetime(row.get(13)?),
    })
}

fn parse_uuid(idx: usize, text: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&text).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

fn parse_list(idx: usize, text: String) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&text).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

fn to_json(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// SQL schema for the metrics database
const SCHEMA_SQL: &str = r#"
-- Registered agents
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    project TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Deployed revisions, one agent to many versions
CREATE TABLE IF NOT EXISTS agent_versions (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL REFERENCES agents(id),
    version TEXT NOT NULL,
    cluster TEXT NOT NULL DEFAULT '',
    deployment TEXT NOT NULL DEFAULT '',
    tools TEXT NOT NULL DEFAULT '[]',
    models TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE(agent_id, version)
);
CREATE INDEX IF NOT EXISTS idx_version_agent ON agent_versions(agent_id);

-- Run records, insert-only
CREATE TABLE IF NOT EXISTS agent_runs (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    version_id TEXT NOT NULL REFERENCES agent_versions(id),
    version TEXT NOT NULL DEFAULT '',
    created INTEGER NOT NULL,
    status TEXT NOT NULL,
    run_time_seconds REAL,
    initiator TEXT NOT NULL DEFAULT '',
    tools TEXT NOT NULL DEFAULT '[]',
    models TEXT NOT NULL DEFAULT '[]',
    cost REAL NOT NULL DEFAULT 0.0,
    run_id INTEGER NOT NULL DEFAULT 0,
    task_id INTEGER NOT NULL DEFAULT 0,
    recorded_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_run_version ON agent_runs(version_id);
CREATE INDEX IF NOT EXISTS idx_run_created ON agent_runs(created);
CREATE INDEX IF NOT EXISTS idx_run_agent ON agent_runs(agent_id);

-- Materialized per-version metrics, overwritten each aggregation pass
CREATE TABLE IF NOT EXISTS version_metrics (
    version_id TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    project TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    last_seen INTEGER NOT NULL,
    version TEXT NOT NULL DEFAULT '',
    avg_run_time REAL NOT NULL DEFAULT 0.0,
    success_rate REAL NOT NULL DEFAULT 0.0,
    total_runs INTEGER NOT NULL DEFAULT 0,
    spend REAL NOT NULL DEFAULT 0.0,
    tools TEXT NOT NULL DEFAULT '[]',
    models TEXT NOT NULL DEFAULT '[]',
    cluster TEXT NOT NULL DEFAULT ''
);
"#;
