//! Configuration loading and typed config structures for the Ecogrid simulation.
//!
//! The canonical configuration lives in `ecogrid-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty document (or no file at all)
//! yields the stock simulation.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `ecogrid-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (seed, worker pool size).
    #[serde(default)]
    pub world: WorldConfig,

    /// Rule constants for aging, reproduction, feeding and movement.
    #[serde(default)]
    pub rules: RuleConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `ECOGRID_SEED` overrides `world.seed`
    /// - `ECOGRID_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ECOGRID_SEED") {
            match val.parse() {
                Ok(seed) => self.world.seed = seed,
                Err(e) => tracing::warn!(value = val, error = %e, "ignoring ECOGRID_SEED"),
            }
        }
        if let Ok(val) = std::env::var("ECOGRID_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!(value = val, error = %e, "ignoring ECOGRID_PORT"),
            }
        }
    }

    /// Check that every value is within its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "world.workers",
                reason: String::from("must be at least 1"),
            });
        }
        self.rules.validate()
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of parallel cell workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            workers: default_workers(),
        }
    }
}

/// Rule constants consumed by the rule engine.
///
/// Probabilities are compared against a uniform draw in `[0, 1)`: a value
/// of `0.0` never fires and `1.0` always fires.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct RuleConfig {
    /// A plant dies when it reaches this age.
    #[serde(default = "default_plant_max_age")]
    pub plant_max_age: u32,

    /// A herbivore dies when it reaches this age.
    #[serde(default = "default_herbivore_max_age")]
    pub herbivore_max_age: u32,

    /// A carnivore dies when it reaches this age.
    #[serde(default = "default_carnivore_max_age")]
    pub carnivore_max_age: u32,

    /// Animals need strictly more energy than this to reproduce.
    #[serde(default = "default_reproduction_energy_threshold")]
    pub reproduction_energy_threshold: u32,

    /// Energy a parent animal spends on reproduction.
    #[serde(default = "default_reproduction_cost")]
    pub reproduction_cost: u32,

    /// Energy an animal spends on a move.
    #[serde(default = "default_move_cost")]
    pub move_cost: u32,

    /// Energy an animal gains from a meal.
    #[serde(default = "default_meal_energy")]
    pub meal_energy: u32,

    /// Energy of a newborn or freshly placed animal.
    #[serde(default = "default_newborn_energy")]
    pub newborn_energy: u32,

    /// Per-tick chance a plant spreads into an empty neighbor.
    #[serde(default = "default_plant_reproduction_probability")]
    pub plant_reproduction_probability: f64,

    /// Per-tick chance a herbivore reproduces.
    #[serde(default = "default_herbivore_reproduction_probability")]
    pub herbivore_reproduction_probability: f64,

    /// Per-tick chance a carnivore reproduces.
    #[serde(default = "default_carnivore_reproduction_probability")]
    pub carnivore_reproduction_probability: f64,

    /// Per-tick chance a herbivore eats an adjacent plant.
    #[serde(default = "default_herbivore_eat_probability")]
    pub herbivore_eat_probability: f64,

    /// Per-tick chance a carnivore eats an adjacent herbivore.
    #[serde(default = "default_carnivore_eat_probability")]
    pub carnivore_eat_probability: f64,

    /// Per-tick chance a herbivore moves.
    #[serde(default = "default_herbivore_move_probability")]
    pub herbivore_move_probability: f64,

    /// Per-tick chance a carnivore moves.
    ///
    /// Defaults to the herbivore movement chance (0.7). The carnivore's own
    /// nominal value is [`NOMINAL_CARNIVORE_MOVE_PROBABILITY`]; set it here
    /// to opt in.
    #[serde(default = "default_carnivore_move_probability")]
    pub carnivore_move_probability: f64,
}

/// The nominal carnivore movement chance. Not applied by default.
pub const NOMINAL_CARNIVORE_MOVE_PROBABILITY: f64 = 0.5;

impl RuleConfig {
    /// Check that every probability lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            (
                "rules.plant_reproduction_probability",
                self.plant_reproduction_probability,
            ),
            (
                "rules.herbivore_reproduction_probability",
                self.herbivore_reproduction_probability,
            ),
            (
                "rules.carnivore_reproduction_probability",
                self.carnivore_reproduction_probability,
            ),
            ("rules.herbivore_eat_probability", self.herbivore_eat_probability),
            ("rules.carnivore_eat_probability", self.carnivore_eat_probability),
            ("rules.herbivore_move_probability", self.herbivore_move_probability),
            ("rules.carnivore_move_probability", self.carnivore_move_probability),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("probability {value} is outside [0, 1]"),
                });
            }
        }
        Ok(())
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            plant_max_age: default_plant_max_age(),
            herbivore_max_age: default_herbivore_max_age(),
            carnivore_max_age: default_carnivore_max_age(),
            reproduction_energy_threshold: default_reproduction_energy_threshold(),
            reproduction_cost: default_reproduction_cost(),
            move_cost: default_move_cost(),
            meal_energy: default_meal_energy(),
            newborn_energy: default_newborn_energy(),
            plant_reproduction_probability: default_plant_reproduction_probability(),
            herbivore_reproduction_probability: default_herbivore_reproduction_probability(),
            carnivore_reproduction_probability: default_carnivore_reproduction_probability(),
            herbivore_eat_probability: default_herbivore_eat_probability(),
            carnivore_eat_probability: default_carnivore_eat_probability(),
            herbivore_move_probability: default_herbivore_move_probability(),
            carnivore_move_probability: default_carnivore_move_probability(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    String::from("Ecogrid")
}

const fn default_seed() -> u64 {
    42
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

const fn default_plant_max_age() -> u32 {
    10
}

const fn default_herbivore_max_age() -> u32 {
    50
}

const fn default_carnivore_max_age() -> u32 {
    80
}

const fn default_reproduction_energy_threshold() -> u32 {
    20
}

const fn default_reproduction_cost() -> u32 {
    10
}

const fn default_move_cost() -> u32 {
    5
}

const fn default_meal_energy() -> u32 {
    30
}

const fn default_newborn_energy() -> u32 {
    100
}

const fn default_plant_reproduction_probability() -> f64 {
    0.2
}

const fn default_herbivore_reproduction_probability() -> f64 {
    0.075
}

const fn default_carnivore_reproduction_probability() -> f64 {
    0.025
}

const fn default_herbivore_eat_probability() -> f64 {
    0.9
}

const fn default_carnivore_eat_probability() -> f64 {
    1.0
}

const fn default_herbivore_move_probability() -> f64 {
    0.7
}

const fn default_carnivore_move_probability() -> f64 {
    default_herbivore_move_probability()
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}
