//! Hooks: composable units of cross-cutting behavior attached to a
//! pipeline.
//!
//! A hook implements any subset of three capabilities:
//!
//! - **BeforeCall** — observe the request, update shared context, or
//!   short-circuit the exchange with a control signal
//! - **AfterCall** — observe the response read-only, update shared context
//! - **WrapCall** — sit on the critical call path and decide whether/how
//!   to invoke the rest of the chain (retry, timeout, circuit-breaking)
//!
//! Observer capabilities fail in isolation (logged, exchange continues);
//! wrapping hooks propagate their failures by design. The bundled hooks
//! demonstrate each pattern: [`ContentGuard`] short-circuits,
//! [`RetryPolicy`] wraps, [`TelemetryHook`] observes on both sides.

pub mod guard;
pub mod hook;
pub mod retry;
pub mod telemetry;

pub use guard::ContentGuard;
pub use hook::{Capability, ControlSignal, Hook, HookAdvice, JumpTarget};
pub use retry::RetryPolicy;
pub use telemetry::{SpanId, TelemetryHook, TelemetrySink, TracingSink};
