//! List directory tool: enumerate one project directory.

use async_trait::async_trait;
use gdpilot_core::error::ToolError;
use gdpilot_core::host::ProjectFs;
use gdpilot_core::tool::{Tool, ToolArgs, ToolResult};
use std::sync::Arc;

use crate::blocking::on_blocking_pool;

pub struct ListDirectoryTool {
    fs: Arc<dyn ProjectFs>,
}

impl ListDirectoryTool {
    pub fn new(fs: Arc<dyn ProjectFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List files and folders in a specific directory within the project (res://)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to list (e.g., 'res://scripts/')"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolResult, ToolError> {
        let path = args.str("path");
        let fs = Arc::clone(&self.fs);
        let listing = {
            let path = path.clone();
            on_blocking_pool("list_directory", move || fs.list_dir(&path)).await?
        };

        match listing {
            Ok(entries) => Ok(ToolResult::ok(
                entries
                    .iter()
                    .map(|e| {
                        if e.is_dir {
                            format!("[DIR] {}", e.name)
                        } else {
                            format!("[FILE] {}", e.name)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            )),
            Err(e) => Ok(ToolResult::failure(format!(
                "Error: Could not open directory {path}. {e}"
            ))),
        }
    }
}
