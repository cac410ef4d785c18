//! Core hook types and the `Hook` trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::context::{ContextUpdate, ExchangeContext};
use crate::error::{Error, HandlerError, HookError};
use crate::exchange::{ModelRequest, ModelResponse};
use crate::handler::Next;

/// The capabilities a hook can implement.
///
/// A hook declares, statically, which of these it supports; the executor
/// dispatches only declared capabilities. There is no runtime discovery
/// of overridden methods — an undeclared `before_call` body is simply
/// never invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Observe the request before the handler runs; may short-circuit.
    BeforeCall,
    /// Observe the response after the handler runs; may not alter it.
    AfterCall,
    /// Sit on the critical call path and decide whether/how to invoke
    /// the rest of the chain (retry, timeout, circuit-breaking).
    WrapCall,
}

/// Named exchange exit points a pre-call or post-call hook can jump to.
///
/// A closed set: the executor knows how to land at each of these, and
/// the pipeline builder validates every configured jump against the
/// emitting hook's declaration before any exchange runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpTarget {
    /// Skip the handler, synthesize a response, and finish the exchange
    /// (post-call hooks still run).
    End,
}

impl std::fmt::Display for JumpTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JumpTarget::End => write!(f, "end"),
        }
    }
}

/// A value a hook emits to redirect or terminate exchange flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Proceed to the next stage normally.
    Continue,
    /// Stop the current stage and land at the named exit point.
    JumpTo(JumpTarget),
}

/// What a pre-call hook hands back to the executor: a partial context
/// update plus a control signal.
#[derive(Debug, Clone)]
pub struct HookAdvice {
    pub update: ContextUpdate,
    pub signal: ControlSignal,
}

impl HookAdvice {
    /// Update the shared context and continue normally.
    pub fn update(update: ContextUpdate) -> Self {
        Self {
            update,
            signal: ControlSignal::Continue,
        }
    }

    /// Update the shared context and jump to `target`.
    ///
    /// A short-circuiting hook supplies its synthesized payload in the
    /// update (the last appended assistant message becomes the response).
    pub fn jump(target: JumpTarget, update: ContextUpdate) -> Self {
        Self {
            update,
            signal: ControlSignal::JumpTo(target),
        }
    }
}

/// A named unit of cross-cutting behavior attached to a pipeline.
///
/// Hooks are constructed once at startup and reused across exchanges, so
/// they must be stateless with respect to any single exchange: anything
/// per-exchange lives in the [`ExchangeContext`], not in the hook.
/// Immutable configuration (retry limits, pattern sets) is fine.
#[async_trait]
pub trait Hook: Send + Sync {
    /// A unique name for this hook, used in logs and composition errors.
    fn name(&self) -> &str;

    /// The capabilities this hook implements.
    fn capabilities(&self) -> &[Capability];

    /// Jump targets this hook is permitted to emit. Empty by default.
    fn permitted_jump_targets(&self) -> &[JumpTarget] {
        &[]
    }

    /// Jump targets this instance's configuration can actually emit.
    ///
    /// The pipeline builder rejects composition when any of these is
    /// missing from [`permitted_jump_targets`](Hook::permitted_jump_targets).
    fn configured_jump_targets(&self) -> Vec<JumpTarget> {
        Vec::new()
    }

    /// Maximum time a `before_call`/`after_call` invocation may run
    /// before the executor gives up on it (isolated, fail-open).
    ///
    /// Default: 5 seconds.
    fn observer_timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Runs before the handler. Only dispatched when
    /// [`Capability::BeforeCall`] is declared.
    async fn before_call(
        &self,
        _request: &ModelRequest,
        _ctx: &ExchangeContext,
    ) -> Result<Option<HookAdvice>, HookError> {
        Ok(None)
    }

    /// Runs after the handler (or after a short-circuit). Only dispatched
    /// when [`Capability::AfterCall`] is declared. Receives the response
    /// read-only: post-call hooks observe, they do not rewrite.
    async fn after_call(
        &self,
        _request: &ModelRequest,
        _response: &ModelResponse,
        _ctx: &ExchangeContext,
    ) -> Result<Option<ContextUpdate>, HookError> {
        Ok(None)
    }

    /// Wraps the handler call chain. Only dispatched when
    /// [`Capability::WrapCall`] is declared.
    ///
    /// A wrapper cannot emit a control signal; it may only choose not to
    /// call `next` and synthesize its own response. Its own errors
    /// propagate — it sits on the critical call path by design.
    async fn wrap_call(
        &self,
        request: ModelRequest,
        next: Next<'_>,
    ) -> Result<ModelResponse, HandlerError> {
        next.run(request).await
    }

    /// Runs when the exchange ends without a response (cancellation or an
    /// unrecovered handler error), instead of `after_call`. Only
    /// dispatched when [`Capability::AfterCall`] is declared. Isolated
    /// like the other observer paths.
    async fn on_abort(
        &self,
        _request: &ModelRequest,
        _error: &Error,
        _ctx: &ExchangeContext,
    ) -> Result<(), HookError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal;

    #[async_trait]
    impl Hook for Minimal {
        fn name(&self) -> &str {
            "minimal"
        }
        fn capabilities(&self) -> &[Capability] {
            &[Capability::BeforeCall]
        }
    }

    #[tokio::test]
    async fn test_default_method_bodies_are_noops() {
        let hook = Minimal;
        let ctx = ExchangeContext::new();
        let req = ModelRequest::from_user_text("hi");

        assert!(hook.before_call(&req, &ctx).await.unwrap().is_none());
        assert!(hook
            .after_call(&req, &ModelResponse::from_handler("x"), &ctx)
            .await
            .unwrap()
            .is_none());
        assert!(hook.permitted_jump_targets().is_empty());
        assert!(hook.configured_jump_targets().is_empty());
    }

    #[test]
    fn test_jump_target_display() {
        assert_eq!(JumpTarget::End.to_string(), "end");
    }
}
