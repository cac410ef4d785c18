//! Modelware - middleware orchestration for model exchanges.
//!
//! Independently-authored hooks observe and modify a request/response
//! exchange, short-circuit it, or wrap it with cross-cutting policies,
//! composing deterministically and failing safely in isolation from each
//! other and from the underlying exchange.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────────────── Pipeline ────────────────────────┐
//! request ──▶│ pre-call hooks ─▶ wrap chain ─▶ [handler] ─▶ post hooks │──▶ response
//!            │   (in order,       (first-declared            (in order) │    + context
//!            │    may jump)        outermost)                           │
//!            └──────────────────────────────────────────────────────────┘
//! ```
//!
//! - Pre-call hooks run in declared order; one may emit `JumpTo(End)` to
//!   short-circuit the exchange with a synthesized response.
//! - Call-wrapping hooks nest around the terminal handler, first-declared
//!   outermost, and decide whether/how to invoke what they wrap.
//! - Post-call hooks observe the response read-only, in declared order.
//! - Observer hook failures are isolated; wrapping hook failures
//!   propagate. Jump declarations are validated when the pipeline is
//!   built, never discovered mid-exchange.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use modelware::hooks::{ContentGuard, RetryPolicy, TelemetryHook};
//! use modelware::pipeline::Pipeline;
//! use modelware::exchange::ModelRequest;
//! use modelware::testing::StubHandler;
//!
//! # async fn demo() -> modelware::Result<()> {
//! let pipeline = Pipeline::builder(Arc::new(StubHandler::new("hello")))
//!     .hook(Arc::new(TelemetryHook::with_tracing_sink()))
//!     .hook(Arc::new(ContentGuard::new()))
//!     .hook(Arc::new(RetryPolicy::new(3, Duration::from_millis(200))?))
//!     .build()?;
//!
//! let outcome = pipeline.run(ModelRequest::from_user_text("hi")).await?;
//! println!("{}", outcome.response.content);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod exchange;
pub mod handler;
pub mod hooks;
pub mod pipeline;
pub mod testing;
pub mod tools;

pub use error::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::context::{ContextUpdate, ExchangeContext};
    pub use crate::error::{Error, HandlerError, Result};
    pub use crate::exchange::{ChatMessage, ModelRequest, ModelResponse, ResponseOrigin, Role};
    pub use crate::handler::{ModelHandler, Next};
    pub use crate::hooks::{
        Capability, ContentGuard, ControlSignal, Hook, HookAdvice, JumpTarget, RetryPolicy,
        TelemetryHook,
    };
    pub use crate::pipeline::{ExchangeOutcome, Pipeline};
    pub use crate::tools::{Tool, ToolSpec};
}
