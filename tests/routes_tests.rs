// Integration tests: HTTP endpoints

mod common;

use axum_test::TestServer;
use common::*;
use nasboard::aggregator::StatsAggregator;
use nasboard::routes;
use std::sync::Arc;

fn test_server(tree: &HostTree, runner: FakeRunner) -> TestServer {
    let aggregator = StatsAggregator::new(
        &tree.config(),
        runner,
        Arc::new(FixedMountStats::default()),
    );
    TestServer::new(routes::app(Arc::new(aggregator)))
}

#[tokio::test]
async fn test_root_endpoint() {
    let tree = HostTree::new();
    let server = test_server(&tree, FakeRunner::new());
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("nasboard: host stats at /api/stats");
}

#[tokio::test]
async fn test_version_endpoint() {
    let tree = HostTree::new();
    let server = test_server(&tree, FakeRunner::new());
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("nasboard"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_stats_endpoint_returns_fresh_snapshot() {
    let tree = HostTree::new();
    tree.proc_file("meminfo", MEMINFO);
    let server = test_server(&tree, FakeRunner::new().with("hostname", "nas01\n"));

    let response = server.get("/api/stats").await;
    response.assert_status_ok();
    assert_eq!(
        response.header("cache-control").to_str().unwrap(),
        "no-store"
    );
    let json: serde_json::Value = response.json();
    assert_eq!(json["identity"]["hostname"], "nas01");
    assert_eq!(json["memory"]["percentUsed"], 50);
    assert!(json["capturedAt"].as_i64().unwrap() > 0);
    assert_eq!(json["drives"], serde_json::json!([]));
}

#[tokio::test]
async fn test_stats_endpoint_is_ok_when_everything_degrades() {
    let tree = HostTree::new();
    let server = test_server(&tree, FakeRunner::new());
    let response = server.get("/api/stats").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["temperatures"]["cpu"], serde_json::Value::Null);
    assert_eq!(json["containers"], serde_json::json!([]));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let tree = HostTree::new();
    let server = test_server(&tree, FakeRunner::new());
    let response = server.get("/api/history").await;
    response.assert_status_not_found();
}
