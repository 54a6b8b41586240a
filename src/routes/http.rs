// GET handlers: version, api/stats

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use super::AppState;
use crate::host::CommandRunner;
use crate::version::{NAME, VERSION};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/stats: fresh capture on every request. Degraded sources show up as
/// neutral fields, so this always answers 200.
pub(super) async fn stats_handler<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
) -> impl IntoResponse {
    let snapshot = state.aggregator.capture().await;
    (
        [(header::CACHE_CONTROL, "no-store")],
        axum::Json(snapshot),
    )
}
