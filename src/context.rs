//! Per-exchange shared state visible to all hooks.

use std::collections::HashMap;

use uuid::Uuid;

use crate::exchange::ChatMessage;

/// Mutable keyed state scoped to one exchange.
///
/// Created when an exchange starts and discarded when it ends — this is
/// not a cache and nothing here survives the exchange. Hooks communicate
/// through it: entries written by one hook are visible to every hook that
/// runs after it.
///
/// The message history is a typed, append-only field with explicit merge
/// semantics; everything else is hook-private extension data in a generic
/// string-keyed map.
#[derive(Debug, Clone)]
pub struct ExchangeContext {
    /// Unique id for this exchange, used in logs and telemetry metadata.
    pub exchange_id: Uuid,
    /// Append-only conversation history accumulated during the exchange.
    pub messages: Vec<ChatMessage>,
    /// Generic extension data. Last write wins per key.
    values: HashMap<String, serde_json::Value>,
}

impl ExchangeContext {
    /// Create an empty context with a fresh exchange id.
    pub fn new() -> Self {
        Self {
            exchange_id: Uuid::new_v4(),
            messages: Vec::new(),
            values: HashMap::new(),
        }
    }

    /// Look up an extension value.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Merge a partial update into this context.
    ///
    /// Plain entries overwrite (last write wins); appended messages are
    /// concatenated onto the history, never replacing it.
    pub fn apply(&mut self, update: ContextUpdate) {
        for (key, value) in update.entries {
            self.values.insert(key, value);
        }
        self.messages.extend(update.messages);
    }
}

impl Default for ExchangeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A partial update returned by a hook, merged into the
/// [`ExchangeContext`] by the executor.
#[derive(Debug, Clone, Default)]
pub struct ContextUpdate {
    pub(crate) entries: HashMap<String, serde_json::Value>,
    pub(crate) messages: Vec<ChatMessage>,
}

impl ContextUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an extension value (overwrites any existing entry for the key).
    pub fn set(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    /// Append a message to the exchange history.
    ///
    /// For a short-circuiting hook, the last appended assistant message
    /// becomes the synthesized response payload.
    pub fn push_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// The most recently appended message, if any.
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.messages.is_empty()
    }
}
