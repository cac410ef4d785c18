//! Telemetry hook: opens a span per exchange before the handler runs and
//! closes it with outcome metadata afterwards.
//!
//! The crate owns only the two extension points (`span_open`,
//! `span_close`); where the spans go — console, collector, nowhere — is
//! the sink implementation's concern.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::context::{ContextUpdate, ExchangeContext};
use crate::error::{Error, HookError};
use crate::exchange::{ModelRequest, ModelResponse, ResponseOrigin};
use crate::hooks::{Capability, Hook, HookAdvice};

/// Context key under which the hook threads its span id through the
/// exchange.
const SPAN_KEY: &str = "telemetry.span_id";

/// Opaque handle to an open span, issued by a [`TelemetrySink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(pub u64);

/// Backend seam for telemetry emission.
///
/// Implementations must not block and must not fail: both methods are
/// infallible by signature, so a misbehaving backend can at worst drop
/// data, never disturb the exchange.
pub trait TelemetrySink: Send + Sync {
    fn span_open(&self, name: &str, metadata: &serde_json::Value) -> SpanId;
    fn span_close(&self, span: SpanId, outcome: &str, metadata: &serde_json::Value);
}

/// Default sink: emits structured `tracing` events and tracks span
/// durations in-process.
pub struct TracingSink {
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, (String, Instant)>>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            open: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for TracingSink {
    fn span_open(&self, name: &str, metadata: &serde_json::Value) -> SpanId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut open) = self.open.lock() {
            open.insert(id, (name.to_string(), Instant::now()));
        }
        tracing::info!(target: "modelware::telemetry", span = id, %name, %metadata, "span open");
        SpanId(id)
    }

    fn span_close(&self, span: SpanId, outcome: &str, metadata: &serde_json::Value) {
        let opened = self.open.lock().ok().and_then(|mut open| open.remove(&span.0));
        match opened {
            Some((name, started)) => {
                tracing::info!(
                    target: "modelware::telemetry",
                    span = span.0,
                    %name,
                    %outcome,
                    elapsed = ?started.elapsed(),
                    %metadata,
                    "span close"
                );
            }
            None => {
                tracing::debug!(
                    target: "modelware::telemetry",
                    span = span.0,
                    %outcome,
                    "span close for unknown span"
                );
            }
        }
    }
}

/// Pre+post hook recording a span per exchange.
///
/// `before_call` opens the span with a coarse size metric of the inbound
/// payload and stashes the span id in the shared context; `after_call`
/// (or `on_abort`) closes it with outcome metadata. Internal
/// inconsistencies are logged and swallowed — telemetry never surfaces
/// into the exchange result.
pub struct TelemetryHook {
    sink: Arc<dyn TelemetrySink>,
}

impl TelemetryHook {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink }
    }

    /// Hook backed by the default tracing sink.
    pub fn with_tracing_sink() -> Self {
        Self::new(Arc::new(TracingSink::new()))
    }

    fn span_from_context(&self, ctx: &ExchangeContext) -> Option<SpanId> {
        let id = ctx.get(SPAN_KEY)?.as_u64();
        if id.is_none() {
            tracing::debug!("telemetry span id missing or malformed in context");
        }
        id.map(SpanId)
    }
}

#[async_trait]
impl Hook for TelemetryHook {
    fn name(&self) -> &str {
        "telemetry"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::BeforeCall, Capability::AfterCall]
    }

    async fn before_call(
        &self,
        request: &ModelRequest,
        ctx: &ExchangeContext,
    ) -> Result<Option<HookAdvice>, HookError> {
        let metadata = serde_json::json!({
            "exchange_id": ctx.exchange_id.to_string(),
            "prompt_chars": request.latest_text().len(),
            "turns": request.messages.len(),
        });
        let span = self.sink.span_open("model.call", &metadata);

        Ok(Some(HookAdvice::update(
            ContextUpdate::new().set(SPAN_KEY, serde_json::json!(span.0)),
        )))
    }

    async fn after_call(
        &self,
        _request: &ModelRequest,
        response: &ModelResponse,
        ctx: &ExchangeContext,
    ) -> Result<Option<ContextUpdate>, HookError> {
        if let Some(span) = self.span_from_context(ctx) {
            let outcome = match response.origin {
                ResponseOrigin::Handler => "ok",
                ResponseOrigin::ShortCircuit => "short_circuit",
            };
            let metadata = serde_json::json!({
                "response_chars": response.content.len(),
            });
            self.sink.span_close(span, outcome, &metadata);
        }
        Ok(None)
    }

    async fn on_abort(
        &self,
        _request: &ModelRequest,
        error: &Error,
        ctx: &ExchangeContext,
    ) -> Result<(), HookError> {
        if let Some(span) = self.span_from_context(ctx) {
            let outcome = match error {
                Error::Cancelled { .. } => "cancelled",
                _ => "error",
            };
            let metadata = serde_json::json!({ "error": error.to_string() });
            self.sink.span_close(span, outcome, &metadata);
        }
        Ok(())
    }
}
