//! Pipeline composition and the exchange executor.

use std::sync::Arc;

use tokio::time::Instant;

use crate::context::ExchangeContext;
use crate::error::{CompositionError, Error, HandlerError, Result};
use crate::exchange::{ModelRequest, ModelResponse};
use crate::handler::{ModelHandler, Next};
use crate::hooks::{Capability, ControlSignal, Hook, HookAdvice};

/// Fallback payload when a short-circuiting hook supplied no message in
/// its context update.
const DEFAULT_SHORT_CIRCUIT_TEXT: &str = "The exchange was stopped before reaching the model.";

/// The final result of a successful exchange.
#[derive(Debug)]
pub struct ExchangeOutcome {
    pub response: ModelResponse,
    pub context: ExchangeContext,
}

/// An ordered sequence of hooks plus exactly one terminal handler,
/// composed into a single callable exchange.
///
/// Immutable after construction; build one at startup and reuse it across
/// concurrent exchanges. Hook order is caller-specified and significant:
///
/// - pre-call hooks run in declared order
/// - post-call hooks run in declared order (not reversed)
/// - call-wrapping hooks nest with the first-declared outermost
///
/// The asymmetry is intentional: the first-declared wrapper (say, a
/// timeout policy) bounds everything beneath it, while pre/post hooks
/// read top-to-bottom like a straight-line script.
pub struct Pipeline {
    pre_hooks: Vec<Arc<dyn Hook>>,
    post_hooks: Vec<Arc<dyn Hook>>,
    wrap_hooks: Vec<Arc<dyn Hook>>,
    handler: Arc<dyn ModelHandler>,
}

impl Pipeline {
    /// Start building a pipeline around a terminal handler.
    pub fn builder(handler: Arc<dyn ModelHandler>) -> PipelineBuilder {
        PipelineBuilder {
            handler,
            hooks: Vec::new(),
        }
    }

    /// Run one exchange with a fresh context.
    pub async fn run(&self, request: ModelRequest) -> Result<ExchangeOutcome> {
        self.run_with_context(request, ExchangeContext::new()).await
    }

    /// Run one exchange with a caller-seeded context.
    ///
    /// The context is exclusively owned by this exchange and returned in
    /// the outcome; it is discarded if the exchange fails.
    pub async fn run_with_context(
        &self,
        request: ModelRequest,
        mut ctx: ExchangeContext,
    ) -> Result<ExchangeOutcome> {
        let started = Instant::now();

        // Step 1: pre-call hooks in declared order. Failures are isolated;
        // a jump stops the stage and synthesizes a short-circuit response.
        let mut short_circuit: Option<ModelResponse> = None;
        for hook in &self.pre_hooks {
            let fut = hook.before_call(&request, &ctx);
            match tokio::time::timeout(hook.observer_timeout(), fut).await {
                Ok(Ok(Some(HookAdvice { update, signal }))) => match signal {
                    ControlSignal::Continue => ctx.apply(update),
                    ControlSignal::JumpTo(target) => {
                        let payload = update
                            .last_message()
                            .map(|m| m.content.clone())
                            .unwrap_or_else(|| DEFAULT_SHORT_CIRCUIT_TEXT.to_string());
                        ctx.apply(update);
                        tracing::debug!(
                            hook = hook.name(),
                            %target,
                            exchange = %ctx.exchange_id,
                            "pre-call hook short-circuited the exchange"
                        );
                        short_circuit = Some(ModelResponse::short_circuit(payload));
                        break;
                    }
                },
                Ok(Ok(None)) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        hook = hook.name(),
                        error = %err,
                        "pre-call hook failed, continuing"
                    );
                }
                Err(_elapsed) => {
                    tracing::warn!(
                        hook = hook.name(),
                        timeout = ?hook.observer_timeout(),
                        "pre-call hook timed out, continuing"
                    );
                }
            }
        }

        // Steps 2-3: if not short-circuited, invoke the wrapped call chain.
        // The request timeout bounds the whole chain, retry backoff included.
        let response = match short_circuit {
            Some(response) => response,
            None => {
                let next = Next::new(&self.wrap_hooks, self.handler.as_ref());
                let call = next.run(request.clone());
                let outcome = match request.timeout {
                    Some(limit) => tokio::time::timeout(limit, call)
                        .await
                        .unwrap_or(Err(HandlerError::Cancelled)),
                    None => call.await,
                };
                match outcome {
                    Ok(response) => response,
                    Err(HandlerError::Cancelled) => {
                        let err = Error::Cancelled {
                            elapsed: started.elapsed(),
                        };
                        self.run_abort_hooks(&request, &err, &ctx).await;
                        return Err(err);
                    }
                    Err(handler_err) => {
                        let err = Error::Handler(handler_err);
                        self.run_abort_hooks(&request, &err, &ctx).await;
                        return Err(err);
                    }
                }
            }
        };

        // Step 4: post-call hooks in declared order, same isolation policy.
        // They observe the response read-only and may update the context.
        for hook in &self.post_hooks {
            let fut = hook.after_call(&request, &response, &ctx);
            match tokio::time::timeout(hook.observer_timeout(), fut).await {
                Ok(Ok(Some(update))) => ctx.apply(update),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        hook = hook.name(),
                        error = %err,
                        "post-call hook failed, continuing"
                    );
                }
                Err(_elapsed) => {
                    tracing::warn!(
                        hook = hook.name(),
                        timeout = ?hook.observer_timeout(),
                        "post-call hook timed out, continuing"
                    );
                }
            }
        }

        Ok(ExchangeOutcome {
            response,
            context: ctx,
        })
    }

    /// Abort path: the exchange ended without a response, so normal
    /// post-call hooks are skipped, but post-capable hooks still get
    /// `on_abort` so cleanup (closing telemetry spans) happens.
    async fn run_abort_hooks(&self, request: &ModelRequest, error: &Error, ctx: &ExchangeContext) {
        for hook in &self.post_hooks {
            let fut = hook.on_abort(request, error, ctx);
            match tokio::time::timeout(hook.observer_timeout(), fut).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        hook = hook.name(),
                        error = %err,
                        "abort hook failed, continuing"
                    );
                }
                Err(_elapsed) => {
                    tracing::warn!(hook = hook.name(), "abort hook timed out, continuing");
                }
            }
        }
    }
}

/// Builder for [`Pipeline`]. Validates hook declarations at composition
/// time so a misconfigured pipeline fails fast, before any exchange runs.
pub struct PipelineBuilder {
    handler: Arc<dyn ModelHandler>,
    hooks: Vec<Arc<dyn Hook>>,
}

impl PipelineBuilder {
    /// Append a hook. Order of calls is the declared order.
    pub fn hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Validate declarations and assemble the pipeline.
    ///
    /// Rejects any hook configured to emit a jump target missing from its
    /// own `permitted_jump_targets` declaration.
    pub fn build(self) -> std::result::Result<Pipeline, CompositionError> {
        for hook in &self.hooks {
            let permitted = hook.permitted_jump_targets();
            for target in hook.configured_jump_targets() {
                if !permitted.contains(&target) {
                    return Err(CompositionError::UndeclaredJumpTarget {
                        hook: hook.name().to_string(),
                        target,
                    });
                }
            }
        }

        let PipelineBuilder { handler, hooks } = self;
        let with_capability = |cap: Capability| {
            hooks
                .iter()
                .filter(|h| h.capabilities().contains(&cap))
                .cloned()
                .collect::<Vec<_>>()
        };

        Ok(Pipeline {
            pre_hooks: with_capability(Capability::BeforeCall),
            post_hooks: with_capability(Capability::AfterCall),
            wrap_hooks: with_capability(Capability::WrapCall),
            handler,
        })
    }
}
