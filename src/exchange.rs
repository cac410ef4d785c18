//! Request and response types for a single model exchange.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tools::ToolSpec;

/// Role of a message in the conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A request flowing through the pipeline toward the terminal handler.
///
/// Immutable once constructed for a given attempt. A hook that needs a
/// different request produces a new one for the next stage rather than
/// mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Ordered prior turns, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Tools advertised to the handler. The handler owns any tool loop.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    /// Optional bound on the whole handler call chain, including any
    /// retry backoff. `None` means the exchange waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl ModelRequest {
    /// Create a request from conversation turns.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            timeout: None,
        }
    }

    /// Create a single-turn user request.
    pub fn from_user_text(text: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(text)])
    }

    /// Advertise a tool to the handler.
    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    /// Bound the handler call chain with a timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Text of the most recent turn, or `""` for an empty request.
    pub fn latest_text(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrigin {
    /// Produced by the real terminal handler.
    Handler,
    /// Synthesized by a short-circuiting hook; the handler never ran.
    ShortCircuit,
}

/// The response produced by the terminal handler or by a
/// short-circuiting hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub origin: ResponseOrigin,
}

impl ModelResponse {
    /// A response produced by the real handler.
    pub fn from_handler(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            origin: ResponseOrigin::Handler,
        }
    }

    /// A response synthesized by a short-circuiting hook.
    pub fn short_circuit(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            origin: ResponseOrigin::ShortCircuit,
        }
    }

    /// Whether the exchange was short-circuited before reaching the handler.
    pub fn is_short_circuit(&self) -> bool {
        self.origin == ResponseOrigin::ShortCircuit
    }
}
