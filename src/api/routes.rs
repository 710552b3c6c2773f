//! API Routes
//!
//! HTTP endpoints for liveness, reward distribution and metrics

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::{index, Metrics};
use crate::config::{BotConfig, TransferMode};
use crate::distribution::Distributor;

/// Shared API state
pub struct ApiState {
    pub config: Arc<BotConfig>,
    pub distributor: Arc<Distributor>,
    pub metrics: Arc<Metrics>,
}

/// Build the router. The index page only exists in gateway mode.
pub fn router(state: Arc<ApiState>) -> Router {
    let mut app = Router::new()
        // Health
        .route("/ping", get(ping))

        // Payout trigger
        .route("/distribute", post(distribute))

        // Metrics
        .route("/metrics", get(get_metrics_prometheus))
        .route("/metrics/json", get(get_metrics_json));

    if state.config.transfer_mode == TransferMode::Gateway {
        app = app.route("/", get(get_index));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Run the HTTP API server
pub async fn run_api_server(state: Arc<ApiState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.listen_host, state.config.listen_port);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 HTTP API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /ping - Liveness
async fn ping() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "running" })))
}

/// POST /distribute - Pay out rewards
async fn distribute(State(state): State<Arc<ApiState>>, body: Bytes) -> impl IntoResponse {
    state.metrics.inc_distributions_triggered();

    match state.distributor.run(&body).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "success" }))),
        Err(e) => {
            error!("Error distributing rewards: {}", e);
            state.metrics.inc_distributions_failed();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
        }
    }
}

/// GET / - Index page (gateway mode)
async fn get_index(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Html(index::render(&state.config))
}

/// GET /metrics - Prometheus format metrics
async fn get_metrics_prometheus(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.to_prometheus(),
    )
}

/// GET /metrics/json - JSON format metrics
async fn get_metrics_json(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}
