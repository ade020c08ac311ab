//! `agentpulse activity` - print the recent-run feed

use std::path::Path;

use anyhow::Result;

use agentpulse::store::{RunStore, SqliteStore};

pub async fn activity_command(db_path: &Path, limit: usize) -> Result<()> {
    let store = SqliteStore::open(db_path)?;
    let activity = store.recent_activity(limit).await?;
    println!("{}", serde_json::to_string_pretty(&activity)?);
    Ok(())
}
