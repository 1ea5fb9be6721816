//! Error types for the HTTP API.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ecogrid_core::simulation::SimulationError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The simulation rejected the request.
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Simulation(SimulationError::Validation { .. }) => {
                (StatusCode::BAD_REQUEST, String::from("Too many entities"))
            }
            Self::Simulation(SimulationError::NotRunning) => (
                StatusCode::CONFLICT,
                String::from("Simulation not started; POST /start-simulation first"),
            ),
            Self::Simulation(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::Serialization(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {e}"))
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
