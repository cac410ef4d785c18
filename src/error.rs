//! Error types for modelware.

use std::time::Duration;

use crate::hooks::JumpTarget;

/// Top-level error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Exchange cancelled after {elapsed:?}")]
    Cancelled { elapsed: Duration },
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Pipeline composition errors, detected at build time before any
/// exchange runs.
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("Hook '{hook}' is configured to jump to undeclared target '{target}'")]
    UndeclaredJumpTarget { hook: String, target: JumpTarget },
}

/// Errors raised by the terminal handler or by call-wrapping hooks on
/// the critical call path.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Provider request failed: {reason}")]
    Provider { reason: String },

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Handler call cancelled")]
    Cancelled,

    #[error("All {attempts} attempts failed: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<HandlerError>,
    },
}

impl HandlerError {
    /// Returns `true` if the error is transient and worth retrying.
    ///
    /// Retryable: `Provider`, `RateLimited`. Non-retryable: `InvalidRequest`
    /// (a different attempt won't fix a malformed request), `Cancelled`, and
    /// `RetriesExhausted` (an inner policy already spent its budget).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HandlerError::Provider { .. } | HandlerError::RateLimited { .. }
        )
    }
}

/// Hook execution errors.
///
/// Observer hooks (pre-call/post-call) returning these are isolated by the
/// executor: logged and treated as a no-op for that hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Hook execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error("Hook timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
