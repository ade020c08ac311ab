//! End-to-end pass over the SQLite store: ingest, aggregate, read back

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use agentpulse::model::{Agent, AgentVersion, RegisterRunRequest};
use agentpulse::store::{RunStore, SqliteStore, SummaryStore};
use agentpulse::{DashboardStatsCalculator, MetricsAggregator, Trend};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 20, 14, 0, 0).unwrap()
}

fn register(created: DateTime<Utc>, status: &str, time_taken: serde_json::Value, cost: f64, run_id: i64) -> RegisterRunRequest {
    serde_json::from_value(serde_json::json!({
        "created": created.to_rfc3339(),
        "status": status,
        "time_taken": time_taken,
        "initiator": "user",
        "cost": cost,
        "id": run_id,
        "task_id": 1,
    }))
    .unwrap()
}

#[tokio::test]
async fn ingest_aggregate_and_query() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("metrics.db")).unwrap());

    let agent = Agent {
        id: Uuid::new_v4(),
        name: "search-agent".to_string(),
        project: "search".to_string(),
        created_at: now(),
        updated_at: now(),
    };
    store.insert_agent(&agent).await.unwrap();

    let version = AgentVersion {
        id: Uuid::new_v4(),
        agent_id: agent.id,
        version: "1.2.0".to_string(),
        cluster: "production".to_string(),
        tools: vec!["search".to_string()],
        models: vec!["gpt-4".to_string()],
        deployment: "kubernetes".to_string(),
        created_at: now(),
        updated_at: now(),
    };
    store.insert_version(&version).await.unwrap();

    // Mixed duration shapes on the wire, normalized once at ingestion
    let requests = vec![
        register(now() - Duration::minutes(30), "success", serde_json::json!("3.2s"), 1.0, 1),
        register(now() - Duration::minutes(20), "error", serde_json::json!(3.2), 2.0, 2),
        register(now() - Duration::hours(20), "success", serde_json::json!("oops"), 0.5, 3),
    ];
    for request in requests {
        let run = request.into_run(&version, now());
        store.insert_run(&run).await.unwrap();
    }

    // Aggregate and read the materialized document back
    let aggregator = MetricsAggregator::new(store.clone(), store.clone());
    let report = aggregator.aggregate(CancellationToken::new()).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);

    let metrics = store.list_metrics().await.unwrap();
    assert_eq!(metrics.len(), 1);
    let m = &metrics[0];
    assert_eq!(m.name, "search-agent");
    assert_eq!(m.project, "search");
    assert_eq!(m.version, "1.2.0");
    assert_eq!(m.total_runs, 3);
    // 2 of 3 runs succeeded
    assert!((m.success_rate - (2.0 / 3.0) * 100.0).abs() < 1e-9);
    // Average over the two parseable durations only
    assert!((m.avg_run_time - 3.2).abs() < 1e-9);
    assert!((m.spend - 3.5).abs() < 1e-9);
    assert_eq!(m.cluster, "production");

    // Dashboard over the same data
    let calc = DashboardStatsCalculator::new(store.clone());
    let cards = calc.compute(now()).await.unwrap();

    assert_eq!(cards[0].value, "1"); // one active agent
    assert_eq!(cards[1].value, "2"); // two runs today
    assert_eq!(cards[2].value, "3.2s");
    // 0.5 spent yesterday, 3.0 today
    assert_eq!(cards[3].value, "$3.00");
    assert_eq!(cards[3].trend, Trend::Up);

    // Activity feed is newest-first and joined with the agent name
    let activity = store.recent_activity(2).await.unwrap();
    assert_eq!(activity.len(), 2);
    assert_eq!(activity[0].agent, "search-agent");
    assert_eq!(activity[0].id, 2);
    assert_eq!(activity[0].action, "failed run");
}
