//! Content guard: a pre-call hook that blocks exchanges whose latest
//! turn contains sensitive identifiers.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::config::GuardConfig;
use crate::context::{ContextUpdate, ExchangeContext};
use crate::error::HookError;
use crate::exchange::{ChatMessage, ModelRequest};
use crate::hooks::{Capability, Hook, HookAdvice, JumpTarget};

/// Email-address syntax.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("static email pattern is valid")
});

/// Digit-grouped numeric shape of a national identifier (3-2-4 groups
/// with optional dash or space separators).
static NATIONAL_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{3}[- ]?\d{2}[- ]?\d{4}\b").expect("static national-id pattern is valid")
});

const DEFAULT_REFUSAL: &str =
    "I cannot process requests containing personal or sensitive identifiers.";

const PERMITTED_JUMPS: &[JumpTarget] = &[JumpTarget::End];

/// Inspects the most recent turn for sensitive-identifier patterns and
/// short-circuits the exchange with a fixed refusal on a match.
///
/// Blocking is a successful outcome: the pipeline returns the refusal as
/// a short-circuited response, never an error. On no match the hook
/// returns nothing and the pipeline continues normally.
pub struct ContentGuard {
    refusal: String,
    extra_patterns: Vec<(String, Regex)>,
}

impl ContentGuard {
    /// Guard with the built-in email and national-id patterns.
    pub fn new() -> Self {
        Self {
            refusal: DEFAULT_REFUSAL.to_string(),
            extra_patterns: Vec::new(),
        }
    }

    /// Guard configured from the environment.
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            refusal: config.refusal_message.clone(),
            extra_patterns: Vec::new(),
        }
    }

    /// Replace the refusal message.
    pub fn with_refusal(mut self, refusal: impl Into<String>) -> Self {
        self.refusal = refusal.into();
        self
    }

    /// Add a labelled pattern on top of the built-ins.
    pub fn with_pattern(mut self, label: impl Into<String>, pattern: Regex) -> Self {
        self.extra_patterns.push((label.into(), pattern));
        self
    }

    /// The label of the first matching pattern, if any.
    fn matched_pattern(&self, text: &str) -> Option<String> {
        if EMAIL_PATTERN.is_match(text) {
            return Some("email".to_string());
        }
        if NATIONAL_ID_PATTERN.is_match(text) {
            return Some("national_id".to_string());
        }
        self.extra_patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(label, _)| label.clone())
    }
}

impl Default for ContentGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for ContentGuard {
    fn name(&self) -> &str {
        "content_guard"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::BeforeCall]
    }

    fn permitted_jump_targets(&self) -> &[JumpTarget] {
        PERMITTED_JUMPS
    }

    fn configured_jump_targets(&self) -> Vec<JumpTarget> {
        vec![JumpTarget::End]
    }

    async fn before_call(
        &self,
        request: &ModelRequest,
        ctx: &ExchangeContext,
    ) -> Result<Option<HookAdvice>, HookError> {
        let Some(label) = self.matched_pattern(request.latest_text()) else {
            return Ok(None);
        };

        tracing::debug!(
            pattern = %label,
            exchange = %ctx.exchange_id,
            "sensitive identifier detected, blocking exchange"
        );

        let update = ContextUpdate::new()
            .set("content_guard.matched", serde_json::json!(label))
            .push_message(ChatMessage::assistant(self.refusal.clone()));

        Ok(Some(HookAdvice::jump(JumpTarget::End, update)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::testing::StubHandler;
    use std::sync::Arc;

    #[test]
    fn test_email_pattern_matches() {
        let guard = ContentGuard::new();
        assert_eq!(
            guard.matched_pattern("contact alice@example.com today"),
            Some("email".to_string())
        );
        assert_eq!(guard.matched_pattern("no identifiers here"), None);
    }

    #[test]
    fn test_national_id_pattern_matches() {
        let guard = ContentGuard::new();
        for sample in ["123-45-6789", "123 45 6789", "123456789"] {
            assert_eq!(
                guard.matched_pattern(&format!("my number is {sample}")),
                Some("national_id".to_string()),
                "sample: {sample}"
            );
        }
        // Phone-shaped numbers with different grouping do not match.
        assert_eq!(guard.matched_pattern("call 12-345-6789 ext 4"), None);
    }

    #[test]
    fn test_extra_pattern() {
        let guard = ContentGuard::new().with_pattern(
            "iban",
            Regex::new(r"\b[A-Z]{2}\d{2}[A-Z0-9]{10,30}\b").unwrap(),
        );
        assert_eq!(
            guard.matched_pattern("transfer to DE44500105175407324931 please"),
            Some("iban".to_string())
        );
    }

    #[tokio::test]
    async fn test_blocked_exchange_returns_refusal_without_calling_handler() {
        let handler = Arc::new(StubHandler::new("never"));
        let pipeline = Pipeline::builder(handler.clone())
            .hook(Arc::new(ContentGuard::new()))
            .build()
            .unwrap();

        let req = ModelRequest::from_user_text(
            "Please send this to alice@example.com and also tell me the plan.",
        );
        let outcome = pipeline.run(req).await.unwrap();

        assert!(outcome.response.is_short_circuit());
        assert_eq!(outcome.response.content, DEFAULT_REFUSAL);
        assert_eq!(handler.calls(), 0);
        assert_eq!(
            outcome.context.get("content_guard.matched"),
            Some(&serde_json::json!("email"))
        );
    }

    #[tokio::test]
    async fn test_clean_exchange_passes_through() {
        let handler = Arc::new(StubHandler::new("echo: test"));
        let pipeline = Pipeline::builder(handler.clone())
            .hook(Arc::new(ContentGuard::new()))
            .build()
            .unwrap();

        let req = ModelRequest::from_user_text("Hello agent, echo 'test' please.");
        let outcome = pipeline.run(req).await.unwrap();

        assert!(!outcome.response.is_short_circuit());
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn test_custom_refusal_message() {
        let pipeline = Pipeline::builder(Arc::new(StubHandler::new("never")))
            .hook(Arc::new(ContentGuard::new().with_refusal("blocked.")))
            .build()
            .unwrap();

        let outcome = pipeline
            .run(ModelRequest::from_user_text("mail me: b@c.org"))
            .await
            .unwrap();
        assert_eq!(outcome.response.content, "blocked.");
    }

    #[test]
    fn test_from_config_uses_configured_refusal() {
        let config = crate::config::GuardConfig {
            enabled: true,
            refusal_message: "configured refusal".to_string(),
        };
        let guard = ContentGuard::from_config(&config);
        assert_eq!(guard.refusal, "configured refusal");
    }

    #[test]
    fn test_guard_only_inspects_latest_turn() {
        let guard = ContentGuard::new();
        let req = ModelRequest::new(vec![
            ChatMessage::user("my email is old@example.com"),
            ChatMessage::user("now just echo hi"),
        ]);
        assert_eq!(guard.matched_pattern(req.latest_text()), None);
    }
}
