//! `agentpulse seed` - deterministic demo data
//!
//! Inserts a small fleet of agents with versions and a spread of runs over
//! the windows the dashboard queries (last hour, today, yesterday, last
//! week), so `aggregate` and `dashboard` have something to show.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use agentpulse::model::{Agent, AgentRun, AgentVersion};
use agentpulse::store::{RunStore, SqliteStore};

const AGENTS: [(&str, &str); 5] = [
    ("search-agent", "search"),
    ("chat-agent", "chat"),
    ("code-agent", "code"),
    ("data-agent", "data"),
    ("image-agent", "image"),
];

const VERSIONS: [&str; 3] = ["1.0.0", "1.1.0", "1.2.0"];
const CLUSTERS: [&str; 3] = ["production", "staging", "development"];
const DEPLOYMENTS: [&str; 3] = ["kubernetes", "docker", "serverless"];
const STATUSES: [&str; 3] = ["success", "error", "timeout"];
const INITIATORS: [&str; 3] = ["user", "system", "scheduled"];

pub async fn seed_command(db_path: &Path) -> Result<()> {
    let store = Arc::new(SqliteStore::open(db_path)?);
    let now = Utc::now();
    let mut run_id = 0i64;

    for (i, (name, project)) in AGENTS.iter().enumerate() {
        let agent = Agent {
            id: Uuid::new_v4(),
            name: name.to_string(),
            project: project.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.insert_agent(&agent).await?;

        for (j, label) in VERSIONS.iter().enumerate() {
            let version = AgentVersion {
                id: Uuid::new_v4(),
                agent_id: agent.id,
                version: label.to_string(),
                cluster: CLUSTERS[j % CLUSTERS.len()].to_string(),
                tools: vec!["search".to_string(), "browser".to_string()],
                models: vec!["gpt-4".to_string(), "claude-3".to_string()],
                deployment: DEPLOYMENTS[j % DEPLOYMENTS.len()].to_string(),
                created_at: now - Duration::hours(24 * j as i64),
                updated_at: now - Duration::hours(24 * j as i64),
            };
            store.insert_version(&version).await?;

            // Spread runs across the dashboard's comparison windows
            for k in 0..12 {
                let offset = match k % 4 {
                    0 => Duration::minutes(5 + 4 * k),          // last hour
                    1 => Duration::hours(3 + k % 8),            // today / last 48h
                    2 => Duration::hours(26 + k % 8),           // yesterday
                    _ => Duration::days(3 + (k % 4)),           // earlier this week
                };
                let spread = (i + j + k as usize) % 10;
                let run = AgentRun {
                    id: Uuid::new_v4(),
                    agent_id: agent.id,
                    version_id: version.id,
                    version: version.version.clone(),
                    created: now - offset,
                    status: STATUSES[k as usize % STATUSES.len()].to_string(),
                    run_time_seconds: Some(0.5 + spread as f64 * 0.45),
                    initiator: INITIATORS[k as usize % INITIATORS.len()].to_string(),
                    tools: version.tools.clone(),
                    models: version.models.clone(),
                    cost: 0.01 + spread as f64 * 0.049,
                    run_id,
                    task_id: run_id / 3,
                    recorded_at: now - offset + Duration::seconds(2),
                };
                store.insert_run(&run).await?;
                run_id += 1;
            }
        }
    }

    info!(agents = AGENTS.len(), runs = run_id, "seeded demo data");
    println!("seeded {} agents, {} runs into {}", AGENTS.len(), run_id, db_path.display());
    Ok(())
}
