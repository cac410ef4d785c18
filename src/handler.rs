//! The terminal handler contract and the wrap-chain continuation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::exchange::{ModelRequest, ModelResponse};
use crate::hooks::Hook;

/// The innermost callable of a pipeline: performs the actual external
/// exchange (typically a model invocation).
///
/// The pipeline treats it as an opaque black box it only calls, retries,
/// and times. Implementations must be safe to share across concurrent
/// exchanges.
#[async_trait]
pub trait ModelHandler: Send + Sync {
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, HandlerError>;
}

/// Continuation handed to a call-wrapping hook.
///
/// `next.run(request)` invokes the rest of the chain: the remaining
/// wrapping hooks in declared order, then the terminal handler. A wrapper
/// may call it zero times (synthesizing its own response), once, or
/// several times (retry).
pub struct Next<'a> {
    wrappers: &'a [Arc<dyn Hook>],
    handler: &'a dyn ModelHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(wrappers: &'a [Arc<dyn Hook>], handler: &'a dyn ModelHandler) -> Self {
        Self { wrappers, handler }
    }

    /// Invoke the rest of the call chain with `request`.
    pub async fn run(&self, request: ModelRequest) -> Result<ModelResponse, HandlerError> {
        match self.wrappers.split_first() {
            Some((outer, rest)) => {
                let inner = Next {
                    wrappers: rest,
                    handler: self.handler,
                };
                outer.wrap_call(request, inner).await
            }
            None => self.handler.call(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubHandler;

    #[tokio::test]
    async fn test_empty_chain_calls_handler_directly() {
        let handler = StubHandler::new("direct");
        let next = Next::new(&[], &handler);

        let resp = next
            .run(ModelRequest::from_user_text("hi"))
            .await
            .unwrap();
        assert_eq!(resp.content, "direct");
        assert_eq!(handler.calls(), 1);
    }
}
