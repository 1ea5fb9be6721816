//! Server binary for the Ecogrid simulation.
//!
//! Loads configuration, installs structured logging, builds an idle
//! [`Simulation`], and serves the HTTP API until `Ctrl-C`. Runs are
//! started and advanced by clients through the API.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `ecogrid-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Create the simulation and its worker pool
//! 4. Serve the HTTP API
//!
//! [`Simulation`]: ecogrid_core::simulation::Simulation

mod error;

use std::path::Path;
use std::sync::Arc;

use ecogrid_core::config::{LoggingConfig, SimulationConfig};
use ecogrid_core::simulation::Simulation;
use ecogrid_observer::{AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, resolved against the working directory.
const CONFIG_PATH: &str = "ecogrid-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging setup, simulation creation
/// or the server fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, from_file) = load_config(Path::new(CONFIG_PATH))?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging)?;
    info!("ecogrid-engine starting");
    info!(
        from_file,
        world_name = config.world.name,
        seed = config.world.seed,
        workers = config.world.workers,
        port = config.server.port,
        "Configuration loaded"
    );

    // 3. Create the simulation.
    let simulation = Simulation::new(&config)?;
    let state = Arc::new(AppState::new(simulation));

    // 4. Serve until Ctrl-C.
    let server = ServerConfig::from(&config.server);
    ecogrid_observer::start_server(&server, state).await?;

    info!("ecogrid-engine stopped");
    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Environment overrides apply either way.
///
/// Returns the config and whether it came from the file.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok((config, false))
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
