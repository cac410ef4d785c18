//! Tool contract consumed by terminal handlers.
//!
//! The pipeline never invokes tools itself: a request advertises
//! [`ToolSpec`]s and the handler owns any tool-invocation loop. The
//! trait and the bundled echo tool exist so handlers and tests have a
//! concrete surface to program against.

use serde::{Deserialize, Serialize};

/// A tool the handler can call: a name, a description for the model,
/// and a pure input-to-output function.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Execute the tool. Pure with respect to the exchange: same input,
    /// same output, no pipeline state involved.
    fn call(&self, input: &str) -> String;

    /// The advertisable spec for this tool.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Plain-data description of a tool, carried on requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// Trivial tool that echoes its input back.
pub struct EchoTool;

impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo_tool"
    }

    fn description(&self) -> &str {
        "Echoes the input back. Useful for wiring checks."
    }

    fn call(&self, input: &str) -> String {
        format!("Tool answered: received '{input}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_tool_is_pure() {
        let tool = EchoTool;
        assert_eq!(tool.call("test"), "Tool answered: received 'test'");
        assert_eq!(tool.call("test"), tool.call("test"));
    }

    #[test]
    fn test_spec_mirrors_tool() {
        let spec = EchoTool.spec();
        assert_eq!(spec.name, "echo_tool");
        assert!(!spec.description.is_empty());
    }
}
