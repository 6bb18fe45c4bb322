//! Run GDScript tool: compile and execute a throwaway snippet.
//!
//! The snippet must define a zero-argument `run` function; its return value
//! is the tool result.

use async_trait::async_trait;
use gdpilot_core::error::ToolError;
use gdpilot_core::host::{ScriptFailure, ScriptHost, ScriptOutput};
use gdpilot_core::tool::{Tool, ToolArgs, ToolResult};
use std::sync::Arc;
use tracing::debug;

/// Entry function every snippet must define.
pub const ENTRY: &str = "run";

pub struct RunGdscriptTool {
    scripts: Arc<dyn ScriptHost>,
}

impl RunGdscriptTool {
    pub fn new(scripts: Arc<dyn ScriptHost>) -> Self {
        Self { scripts }
    }
}

/// The text the model sees for each kind of failure.
fn describe_failure(failure: ScriptFailure) -> String {
    match failure {
        ScriptFailure::Compile { error, diagnostics } if !diagnostics.is_empty() => format!(
            "Script error ({error}):\n{}\n\nPlease check your code.",
            diagnostics.join("\n")
        ),
        ScriptFailure::Compile { error, .. } => format!(
            "Script syntax error: {error}. (No details captured). Please check your code."
        ),
        ScriptFailure::NotInstantiable => "Error: Script cannot be instantiated. Ensure it extends a valid class \
             (e.g., RefCounted, Node) or implicitly defaults to RefCounted."
            .to_string(),
        ScriptFailure::Instantiation(msg) => format!("Instantiation error: {msg}"),
        ScriptFailure::MissingEntry { entry } => {
            format!("Error: The provided script does not contain a 'func {entry}():' method.")
        }
        ScriptFailure::Runtime(msg) => format!("Runtime error executing script: {msg}"),
        ScriptFailure::Unavailable(msg) => format!("Error: {msg}"),
    }
}

#[async_trait]
impl Tool for RunGdscriptTool {
    fn name(&self) -> &str {
        "run_gdscript"
    }

    fn description(&self) -> &str {
        "Execute a temporary GDScript snippet immediately and return the result. \
         The script MUST contain a 'func run():' method which returns a value (String, Dictionary, or basic type). \
         Use this to perform complex calculations, inspect deep scene state, or perform batch editor operations. \
         The \"tool\" keyword was removed in Godot 4. Use the \"@tool\" annotation instead. \
         Cannot use get_tree(), use EditorInterface.get_edited_scene_root() instead."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The full GDScript code. It must extend a class (e.g., RefCounted) and implement 'func run()'."
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolResult, ToolError> {
        let code = args.str("code");

        debug!(bytes = code.len(), "Running script snippet");
        let outcome = self.scripts.run(&code, ENTRY).await;

        Ok(match outcome {
            Ok(ScriptOutput::Value(value)) => ToolResult::ok(value),
            Ok(ScriptOutput::Object { class, id }) => ToolResult::ok(format!("[Object: {class} ID:{id}]")),
            Err(failure) => ToolResult::failure(describe_failure(failure)),
        })
    }
}
