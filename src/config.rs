//! # Configuration
//!
//! Layered loading via the `config` crate, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `calc.toml` in the working directory, or the file named by `CALC_CONFIG`
//! 3. the legacy bare variables `TIME_ADDITION_MS`, `TIME_SUBTRACTION_MS`,
//!    `TIME_MULTIPLICATIONS_MS`, `TIME_DIVISIONS_MS` and `COMPUTING_POWER`
//! 4. `CALC_`-prefixed variables, e.g. `CALC_POLL_INTERVAL_MS`
//!
//! The flat key space is deserialized into [`RawConfig`] and then shaped into
//! [`CalcConfig`].

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{CalcError, Result};
use crate::models::Operator;

/// Operational knobs also read as bare, unprefixed environment variables.
pub const LEGACY_ENV_KEYS: [&str; 5] = [
    "TIME_ADDITION_MS",
    "TIME_SUBTRACTION_MS",
    "TIME_MULTIPLICATIONS_MS",
    "TIME_DIVISIONS_MS",
    "COMPUTING_POWER",
];

pub const ENV_PREFIX: &str = "CALC";
pub const CONFIG_PATH_ENV: &str = "CALC_CONFIG";
pub const DEFAULT_CONFIG_NAME: &str = "calc";

/// Flat key space as seen by the `config` crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub time_addition_ms: u64,
    pub time_subtraction_ms: u64,
    pub time_multiplications_ms: u64,
    pub time_divisions_ms: u64,
    pub computing_power: usize,
    pub poll_interval_ms: u64,
    pub startup_jitter_ms: u64,
    pub submit_retry_limit: u32,
    pub submit_backoff_ms: u64,
    pub publish_retry_limit: u32,
    pub publish_backoff_ms: u64,
    pub worker_login: String,
    pub worker_password: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            time_addition_ms: 100,
            time_subtraction_ms: 100,
            time_multiplications_ms: 200,
            time_divisions_ms: 200,
            computing_power: 10,
            poll_interval_ms: 100,
            startup_jitter_ms: 1000,
            submit_retry_limit: 5,
            submit_backoff_ms: 500,
            publish_retry_limit: 60,
            publish_backoff_ms: 50,
            worker_login: "agent".to_string(),
            worker_password: "agent_password".to_string(),
        }
    }
}

/// Simulated per-operator durations that workers pad each task to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationTimings {
    pub addition_ms: u64,
    pub subtraction_ms: u64,
    pub multiplication_ms: u64,
    pub division_ms: u64,
}

impl OperationTimings {
    /// No padding at all; workers return as soon as they compute.
    pub fn zero() -> Self {
        Self::uniform(0)
    }

    pub fn uniform(ms: u64) -> Self {
        Self {
            addition_ms: ms,
            subtraction_ms: ms,
            multiplication_ms: ms,
            division_ms: ms,
        }
    }

    pub fn for_operator(&self, operator: Operator) -> u64 {
        match operator {
            Operator::Add => self.addition_ms,
            Operator::Subtract => self.subtraction_ms,
            Operator::Multiply => self.multiplication_ms,
            Operator::Divide => self.division_ms,
        }
    }
}

impl Default for OperationTimings {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

impl From<RawConfig> for OperationTimings {
    fn from(raw: RawConfig) -> Self {
        Self {
            addition_ms: raw.time_addition_ms,
            subtraction_ms: raw.time_subtraction_ms,
            multiplication_ms: raw.time_multiplications_ms,
            division_ms: raw.time_divisions_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Publish attempts against one unclaimed occupant before the expression
    /// fails. Attempts reset whenever the occupant changes.
    pub publish_retry_limit: u32,
    pub publish_backoff: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        let raw = RawConfig::default();
        Self {
            publish_retry_limit: raw.publish_retry_limit,
            publish_backoff: Duration::from_millis(raw.publish_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Number of concurrent workers in a pool.
    pub computing_power: usize,
    pub poll_interval: Duration,
    /// Upper bound of the random delay before a worker's first poll.
    pub startup_jitter: Duration,
    pub submit_retry_limit: u32,
    pub submit_backoff: Duration,
    pub login: String,
    pub password: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let raw = RawConfig::default();
        Self {
            computing_power: raw.computing_power,
            poll_interval: Duration::from_millis(raw.poll_interval_ms),
            startup_jitter: Duration::from_millis(raw.startup_jitter_ms),
            submit_retry_limit: raw.submit_retry_limit,
            submit_backoff: Duration::from_millis(raw.submit_backoff_ms),
            login: raw.worker_login,
            password: raw.worker_password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalcConfig {
    pub timings: OperationTimings,
    pub coordinator: CoordinatorConfig,
    pub worker: WorkerConfig,
}

impl From<RawConfig> for CalcConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            timings: raw.clone().into(),
            coordinator: CoordinatorConfig {
                publish_retry_limit: raw.publish_retry_limit,
                publish_backoff: Duration::from_millis(raw.publish_backoff_ms),
            },
            worker: WorkerConfig {
                computing_power: raw.computing_power,
                poll_interval: Duration::from_millis(raw.poll_interval_ms),
                startup_jitter: Duration::from_millis(raw.startup_jitter_ms),
                submit_retry_limit: raw.submit_retry_limit,
                submit_backoff: Duration::from_millis(raw.submit_backoff_ms),
                login: raw.worker_login,
                password: raw.worker_password,
            },
        }
    }
}

impl CalcConfig {
    /// Load from the process environment and an optional config file.
    pub fn load() -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let file = env.get(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from(file.as_deref(), env)
    }

    /// Load with an explicit file and environment map.
    ///
    /// An explicit `file` must exist; without one, `calc.toml` is picked up
    /// from the working directory when present.
    pub fn load_from(file: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let legacy: HashMap<String, String> = env
            .iter()
            .filter(|(key, _)| LEGACY_ENV_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let raw: RawConfig = Config::builder()
            .add_source(Config::try_from(&RawConfig::default())?)
            .add_source(file_source)
            .add_source(Environment::default().source(Some(legacy)).try_parsing(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .source(Some(env))
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        let config = CalcConfig::from(raw);
        config.validate()?;

        debug!(
            computing_power = config.worker.computing_power,
            poll_interval_ms = config.worker.poll_interval.as_millis() as u64,
            addition_ms = config.timings.addition_ms,
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker.computing_power == 0 {
            return Err(CalcError::Configuration(
                "computing_power must be at least 1".to_string(),
            ));
        }
        if self.worker.poll_interval.is_zero() {
            return Err(CalcError::Configuration(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
