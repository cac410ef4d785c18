//! Environment-driven configuration for the bundled policies.

use std::time::Duration;

use crate::error::ConfigError;

/// Crate-wide mutex for tests that mutate process environment variables.
///
/// The process environment is global state shared across all threads;
/// every test touching `set_var`/`remove_var` must hold this lock.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum handler attempts, at least 1.
    pub max_attempts: u32,
    /// Base unit of the linear backoff schedule.
    pub backoff_base: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Resolve from `MODELWARE_RETRY_MAX_ATTEMPTS` and
    /// `MODELWARE_RETRY_BACKOFF_MS`, falling back to the defaults.
    pub fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_attempts: u32 =
            parse_optional_env("MODELWARE_RETRY_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts < 1 {
            return Err(ConfigError::InvalidValue {
                key: "MODELWARE_RETRY_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let backoff_ms: u64 = parse_optional_env(
            "MODELWARE_RETRY_BACKOFF_MS",
            defaults.backoff_base.as_millis() as u64,
        )?;
        Ok(Self {
            max_attempts,
            backoff_base: Duration::from_millis(backoff_ms),
        })
    }
}

/// Content guard configuration.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Whether the guard should be attached at all.
    pub enabled: bool,
    /// Refusal text returned on a blocked exchange.
    pub refusal_message: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refusal_message:
                "I cannot process requests containing personal or sensitive identifiers."
                    .to_string(),
        }
    }
}

impl GuardConfig {
    /// Resolve from `MODELWARE_GUARD_ENABLED` and
    /// `MODELWARE_GUARD_REFUSAL`, falling back to the defaults.
    pub fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let enabled = match optional_env("MODELWARE_GUARD_ENABLED")? {
            Some(s) => match s.to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "MODELWARE_GUARD_ENABLED".to_string(),
                        message: format!("must be 'true' or 'false', got '{s}'"),
                    });
                }
            },
            None => defaults.enabled,
        };
        let refusal_message =
            optional_env("MODELWARE_GUARD_REFUSAL")?.unwrap_or(defaults.refusal_message);
        Ok(Self {
            enabled,
            refusal_message,
        })
    }
}
