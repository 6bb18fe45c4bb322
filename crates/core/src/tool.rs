//! Tool trait: the abstraction over editor capabilities the model may call.
//!
//! Tools are looked up by name in a [`ToolRegistry`] and run through the
//! [`ToolExecutor`], which is a total function: whatever the model sends,
//! the result is a string the conversation can carry on with.

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::transport::ToolDefinition;

/// Arguments of one call: a flat mapping of parameter name to scalar.
///
/// Extraction is tolerant. A missing parameter reads as an empty string and
/// non-string scalars are stringified; the schema is never enforced here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(serde_json::Map<String, serde_json::Value>);

impl ToolArgs {
    /// Parse the raw `arguments` string of a tool call.
    ///
    /// An empty payload is an empty mapping; anything else must be a JSON object.
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(ToolError::InvalidArguments(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
        }
    }

    /// Build from an already-decoded value; non-objects become empty.
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// String form of a parameter, `""` when absent or null.
    pub fn str(&self, key: &str) -> String {
        match self.0.get(key) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool did what it was asked (logging/events only)
    pub success: bool,

    /// The text handed back to the model
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// The core Tool trait.
///
/// Each built-in (list_directory, read_file, get_scene_tree, ...) implements
/// this trait and is registered in the [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters. Descriptive only.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: ToolArgs) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A name-keyed registry of available tools.
///
/// Names are unique; definitions are listed in registration order so the
/// catalogue advertised to the model is stable between requests.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. A second tool with the same name is rejected.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// All tool definitions, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs tool calls by name. Never fails: every problem becomes result text.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Tool definitions to advertise on every request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Execute `name` with the raw JSON `arguments` the model sent.
    pub async fn execute(&self, name: &str, arguments: &str) -> ToolResult {
        let Some(tool) = self.registry.get(name) else {
            warn!(tool = %name, "Model requested an unknown tool");
            return ToolResult::failure(format!("Error: Unknown tool '{name}'."));
        };

        let args = match ToolArgs::parse(arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = %name, error = %e, "Unparseable tool arguments");
                return ToolResult::failure(format!("Error executing tool {name}: {e}"));
            }
        };

        debug!(tool = %name, "Executing tool");

        match AssertUnwindSafe(tool.execute(args)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                ToolResult::failure(format!("Error executing tool {name}: {e}"))
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!(tool = %name, %reason, "Tool panicked");
                ToolResult::failure(format!("Error executing tool {name}: {reason}"))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
