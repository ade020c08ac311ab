//! `agentpulse fleet` - print materialized per-version metrics

use std::path::Path;

use anyhow::Result;

use agentpulse::store::{SqliteStore, SummaryStore};

pub async fn fleet_command(db_path: &Path) -> Result<()> {
    let store = SqliteStore::open(db_path)?;
    let metrics = store.list_metrics().await?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
