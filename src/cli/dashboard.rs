//! `agentpulse dashboard` - print the four stat cards

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use agentpulse::store::SqliteStore;
use agentpulse::DashboardStatsCalculator;

pub async fn dashboard_command(db_path: &Path) -> Result<()> {
    let store = Arc::new(SqliteStore::open(db_path)?);
    let cards = DashboardStatsCalculator::new(store).compute(Utc::now()).await?;
    println!("{}", serde_json::to_string_pretty(&cards)?);
    Ok(())
}
