//! Runtime configuration (spec §5, §1.3 of `SPEC_FULL.md`): the worker pool
//! size, submission queue depth, back-pressure policy, and per-call
//! timeouts, collected into one constructor instead of being read ad hoc
//! from `main` the way the teacher's `SERVER_BIND`/`DATABASE_URL` are.

use std::time::Duration;
use std::{env, error, fmt};

/// The default bounded worker pool size named in spec §5.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 32;
/// The default submission queue depth, chosen to absorb a short burst above
/// the worker pool size without unbounded memory growth.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;
/// The recommended default LLM call timeout (spec §5).
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);
/// The default SQL probe call timeout (spec §5).
pub const DEFAULT_SQL_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// What happens to a submission when the worker pool's queue is already at
/// [`RuntimeConfig::queue_depth`] (spec §5, "back-pressure").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackPressurePolicy {
    /// The submission waits for room in the queue.
    Queue,
    /// The submission is rejected immediately.
    Reject,
}

impl fmt::Display for BackPressurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackPressurePolicy::Queue => f.write_str("queue"),
            BackPressurePolicy::Reject => f.write_str("reject"),
        }
    }
}

/// The knobs named in spec §5: worker pool size, queue depth, back-pressure
/// policy, and per-external-call timeouts.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// The maximum number of work-order runs active at once.
    pub worker_pool_size: usize,
    /// The maximum number of queued submissions awaiting a free worker.
    pub queue_depth: usize,
    /// What to do when the queue is full.
    pub back_pressure: BackPressurePolicy,
    /// The deadline applied to each matcher LLM call.
    pub llm_timeout: Duration,
    /// The deadline applied to each `QUERY` step's probe call.
    pub sql_probe_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            back_pressure: BackPressurePolicy::Queue,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
            sql_probe_timeout: DEFAULT_SQL_PROBE_TIMEOUT,
        }
    }
}

impl RuntimeConfig {
    /// Reads configuration from the environment, falling back to the
    /// defaults above for anything unset, the same `env::var(...).unwrap_or_else`
    /// idiom `automaat-server::main` uses for `SERVER_BIND`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but does not parse as
    /// the type its knob expects.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            worker_pool_size: parse_env("WORKORDER_WORKER_POOL_SIZE", defaults.worker_pool_size)?,
            queue_depth: parse_env("WORKORDER_QUEUE_DEPTH", defaults.queue_depth)?,
            back_pressure: parse_back_pressure(defaults.back_pressure)?,
            llm_timeout: parse_env_secs("WORKORDER_LLM_TIMEOUT_SECS", defaults.llm_timeout)?,
            sql_probe_timeout: parse_env_secs("WORKORDER_SQL_PROBE_TIMEOUT_SECS", defaults.sql_probe_timeout)?,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue { key: key.to_owned(), value }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue { key: key.to_owned(), value: "<non-unicode>".to_owned() }),
    }
}

fn parse_env_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    parse_env(key, default.as_secs()).map(Duration::from_secs)
}

fn parse_back_pressure(default: BackPressurePolicy) -> Result<BackPressurePolicy, ConfigError> {
    match env::var("WORKORDER_BACK_PRESSURE") {
        Ok(value) if value.eq_ignore_ascii_case("queue") => Ok(BackPressurePolicy::Queue),
        Ok(value) if value.eq_ignore_ascii_case("reject") => Ok(BackPressurePolicy::Reject),
        Ok(value) => Err(ConfigError::InvalidValue { key: "WORKORDER_BACK_PRESSURE".to_owned(), value }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            Err(ConfigError::InvalidValue { key: "WORKORDER_BACK_PRESSURE".to_owned(), value: "<non-unicode>".to_owned() })
        }
    }
}

/// A configuration value failed to parse.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// `key` was set to `value`, which does not parse as the type its knob
    /// expects.
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => write!(f, "invalid value for {}: {:?}", key, value),
        }
    }
}

impl error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_spec() {
        let config = RuntimeConfig::default();
        assert_eq!(config.worker_pool_size, 32);
        assert_eq!(config.llm_timeout, Duration::from_secs(30));
        assert_eq!(config.sql_probe_timeout, Duration::from_secs(10));
        assert_eq!(config.back_pressure, BackPressurePolicy::Queue);
    }

    #[test]
    fn test_parse_env_falls_back_to_default_when_unset() {
        let value: usize = parse_env("WORKORDER_TEST_DEFINITELY_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }
}
