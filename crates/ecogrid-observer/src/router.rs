//! Axum router construction.
//!
//! Assembles all routes (control, status, `WebSocket`) into a single
//! [`Router`] with permissive CORS so a browser page served elsewhere can
//! drive the simulation.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `POST /start-simulation` -- start or restart a run
/// - `GET /next-iteration` -- advance one tick
/// - `GET /api/status` -- run state, tick and population
/// - `GET /api/grid` -- current grid
/// - `GET /ws/ticks` -- `WebSocket` tick summary stream
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // Simulation control
        .route("/start-simulation", post(handlers::start_simulation))
        .route("/next-iteration", get(handlers::next_iteration))
        // Read-only API
        .route("/api/status", get(handlers::get_status))
        .route("/api/grid", get(handlers::get_grid))
        // WebSocket
        .route("/ws/ticks", get(ws::ws_ticks))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
