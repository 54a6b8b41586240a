// HTTP routes

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregator::StatsAggregator;
use crate::host::{CommandRunner, HostCommandRunner};

pub(crate) struct AppState<R = HostCommandRunner> {
    pub(crate) aggregator: Arc<StatsAggregator<R>>,
}

// Derived Clone would require R: Clone.
impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            aggregator: self.aggregator.clone(),
        }
    }
}

pub fn app<R: CommandRunner + 'static>(aggregator: Arc<StatsAggregator<R>>) -> Router {
    let state = AppState { aggregator };
    Router::new()
        .route("/", get(|| async { "nasboard: host stats at /api/stats" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/stats", get(http::stats_handler::<R>)) // GET /api/stats
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
