//! REST API endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/start-simulation` | Start or restart a run |
//! | `GET` | `/next-iteration` | Advance one tick |
//! | `GET` | `/api/status` | Run state, tick and population |
//! | `GET` | `/api/grid` | Current grid without advancing |
//!
//! Failures carry a JSON body `{"error": ..., "status": ...}` rather than
//! plain text (see [`ObserverError`]).

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use ecogrid_types::{CellKind, GridSnapshot, PopulationRequest};
use tracing::{debug, info};

use crate::error::ObserverError;
use crate::state::{AppState, TickBroadcast};

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing run status, the grid, and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    let (status, grid) = {
        let simulation = state.simulation.lock().await;
        (simulation.status()?, simulation.snapshot()?)
    };
    let run_state = format!("{:?}", status.state).to_uppercase();
    let tick = status.tick;
    let plants = status.population.plants;
    let herbivores = status.population.herbivores;
    let carnivores = status.population.carnivores;
    let workers = status.workers;
    let board = render_board(&grid);

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Ecogrid</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 100px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        pre.board {{ line-height: 1.1; letter-spacing: 0.4em; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Ecogrid</h1>
    <p class="subtitle">Plants, herbivores and carnivores on a 15x15 grid</p>

    <p>Status: <span class="status">{run_state}</span> ({workers} workers)</p>

    <div>
        <div class="metric">
            <div class="label">Tick</div>
            <div class="value">{tick}</div>
        </div>
        <div class="metric">
            <div class="label">Plants</div>
            <div class="value">{plants}</div>
        </div>
        <div class="metric">
            <div class="label">Herbivores</div>
            <div class="value">{herbivores}</div>
        </div>
        <div class="metric">
            <div class="label">Carnivores</div>
            <div class="value">{carnivores}</div>
        </div>
    </div>

    <pre class="board">{board}</pre>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>POST /start-simulation -- Body <code>{{"plants": N, "herbivores": N, "carnivores": N}}</code></li>
        <li>GET <a href="/next-iteration">/next-iteration</a> -- Advance one tick</li>
        <li>GET <a href="/api/status">/api/status</a> -- Run state and population</li>
        <li>GET <a href="/api/grid">/api/grid</a> -- Current grid</li>
        <li>GET <code>ws://host:port/ws/ticks</code> -- Live tick summary stream</li>
    </ul>
</body>
</html>"#
    )))
}

/// One line per row, `.` for empty cells.
fn render_board(grid: &GridSnapshot) -> String {
    let mut board = String::new();
    for row in grid.rows() {
        for record in row {
            board.push(match record.kind {
                CellKind::Empty => '.',
                kind => kind.code(),
            });
        }
        let _ = writeln!(board);
    }
    board
}

// ---------------------------------------------------------------------------
// POST /start-simulation
// ---------------------------------------------------------------------------

/// Start a new run with the requested population and return the grid.
///
/// Responds `400 Bad Request` when the total does not fit on the grid. The
/// body is the JSON error envelope, not bare text:
///
/// ```json
/// {"error": "Too many entities", "status": 400}
/// ```
pub async fn start_simulation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PopulationRequest>,
) -> Result<Json<GridSnapshot>, ObserverError> {
    let grid = state.simulation.lock().await.initialize(request)?;
    info!(
        plants = request.plants,
        herbivores = request.herbivores,
        carnivores = request.carnivores,
        "Run started via API"
    );
    Ok(Json(grid))
}

// ---------------------------------------------------------------------------
// GET /next-iteration
// ---------------------------------------------------------------------------

/// Advance one tick and return the grid after it.
///
/// The tick runs on a blocking task so the async runtime stays free while
/// the cell workers are busy. Responds `409 Conflict` before any run has
/// been started.
pub async fn next_iteration(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GridSnapshot>, ObserverError> {
    let mut simulation = Arc::clone(&state.simulation).lock_owned().await;
    let result = tokio::task::spawn_blocking(move || simulation.advance())
        .await
        .map_err(|e| ObserverError::Internal(format!("tick task failed: {e}")))??;

    let summary = TickBroadcast::from(&result.summary);
    let receivers = state.broadcast(&summary);
    debug!(tick = summary.tick, receivers, "Tick summary broadcast");

    Ok(Json(result.grid))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Return run state, tick number, population and the last tick summary.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let status = state.simulation.lock().await.status()?;
    Ok(Json(serde_json::to_value(status)?))
}

// ---------------------------------------------------------------------------
// GET /api/grid
// ---------------------------------------------------------------------------

/// Return the current grid without advancing.
pub async fn get_grid(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GridSnapshot>, ObserverError> {
    Ok(Json(state.simulation.lock().await.snapshot()?))
}
