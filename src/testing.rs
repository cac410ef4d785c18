//! Test doubles for exercising pipelines without a real model backend.
//!
//! Provides:
//! - [`StubHandler`]: a configurable terminal handler with call counting
//!   and scripted leading failures
//! - [`RecordingSink`]: a telemetry sink that captures span activity
//!
//! Use these in tests instead of creating ad-hoc stub implementations.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::exchange::{ModelRequest, ModelResponse};
use crate::handler::ModelHandler;
use crate::hooks::telemetry::{SpanId, TelemetrySink};

/// What kind of error the stub should produce when failing.
#[derive(Clone, Copy, Debug)]
enum StubErrorKind {
    /// Transient, retryable (`HandlerError::Provider`).
    Transient,
    /// Non-transient (`HandlerError::InvalidRequest`).
    NonTransient,
}

/// A configurable terminal handler for tests.
///
/// Fails the first `fail_first` calls with the configured error kind,
/// then returns the fixed response. Optionally sleeps before answering,
/// for cancellation tests.
pub struct StubHandler {
    response: String,
    call_count: AtomicU32,
    fail_first: u32,
    error_kind: StubErrorKind,
    delay: Option<Duration>,
}

impl StubHandler {
    /// Handler that always succeeds with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            call_count: AtomicU32::new(0),
            fail_first: 0,
            error_kind: StubErrorKind::Transient,
            delay: None,
        }
    }

    /// Fail the first `n` calls before succeeding.
    pub fn fail_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    /// Produce non-transient failures instead of transient ones.
    pub fn non_transient(mut self) -> Self {
        self.error_kind = StubErrorKind::NonTransient;
        self
    }

    /// Sleep this long before every answer.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times the handler has been invoked.
    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelHandler for StubHandler {
    async fn call(&self, _request: ModelRequest) -> Result<ModelResponse, HandlerError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if call <= self.fail_first {
            return Err(match self.error_kind {
                StubErrorKind::Transient => HandlerError::Provider {
                    reason: format!("stubbed transient failure on call {call}"),
                },
                StubErrorKind::NonTransient => {
                    HandlerError::InvalidRequest(format!("stubbed permanent failure on call {call}"))
                }
            });
        }

        Ok(ModelResponse::from_handler(self.response.clone()))
    }
}

/// A telemetry sink that records span opens and closes for assertions.
pub struct RecordingSink {
    next_id: AtomicU32,
    opens: Mutex<Vec<String>>,
    closes: Mutex<Vec<(u64, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            opens: Mutex::new(Vec::new()),
            closes: Mutex::new(Vec::new()),
        }
    }

    /// Names of every opened span, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opens.lock().unwrap().clone()
    }

    /// Outcomes of every closed span, in order.
    pub fn closed_outcomes(&self) -> Vec<String> {
        self.closes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, outcome)| outcome.clone())
            .collect()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for RecordingSink {
    fn span_open(&self, name: &str, _metadata: &serde_json::Value) -> SpanId {
        self.opens.lock().unwrap().push(name.to_string());
        SpanId(self.next_id.fetch_add(1, Ordering::SeqCst) as u64)
    }

    fn span_close(&self, span: SpanId, outcome: &str, _metadata: &serde_json::Value) {
        self.closes.lock().unwrap().push((span.0, outcome.to_string()));
    }
}
