//! `agentpulse aggregate` - run one aggregation pass

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use agentpulse::store::SqliteStore;
use agentpulse::MetricsAggregator;

pub async fn aggregate_command(db_path: &Path, workers: usize) -> Result<()> {
    let store = Arc::new(SqliteStore::open(db_path)?);
    let aggregator =
        MetricsAggregator::new(store.clone(), store).with_worker_count(workers);

    // Ctrl-C cancels the pass: in-flight versions finish, queued work is dropped
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling aggregation pass");
            signal_cancel.cancel();
        }
    });

    let report = aggregator.aggregate(cancel).await?;

    println!("processed: {}", report.processed);
    println!("failed:    {}", report.failed);
    for failure in &report.failures {
        println!("  {} ({}): {}", failure.version_id, failure.version, failure.reason);
    }

    Ok(())
}
