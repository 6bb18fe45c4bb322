//! Search files tool: find project files whose name contains a keyword.

use async_trait::async_trait;
use gdpilot_core::error::ToolError;
use gdpilot_core::host::{PROJECT_ROOT, ProjectFs, join_path};
use gdpilot_core::tool::{Tool, ToolArgs, ToolResult};
use std::sync::Arc;
use tracing::debug;

use crate::blocking::on_blocking_pool;

pub struct SearchFilesTool {
    fs: Arc<dyn ProjectFs>,
}

impl SearchFilesTool {
    pub fn new(fs: Arc<dyn ProjectFs>) -> Self {
        Self { fs }
    }
}

/// Depth-first walk; unreadable directories are skipped.
fn search(fs: &dyn ProjectFs, dir: &str, keyword: &str, hits: &mut Vec<String>) {
    let entries = match fs.list_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir, error = %e, "Skipping unreadable directory");
            return;
        }
    };

    for entry in entries {
        if entry.name == "." || entry.name == ".." {
            continue;
        }
        let full = join_path(dir, &entry.name);
        if entry.is_dir {
            search(fs, &full, keyword, hits);
        } else if entry.name.to_lowercase().contains(keyword) {
            hits.push(full);
        }
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search for files where the filename contains a specific name keyword."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "The partial filename to search for."
                }
            },
            "required": ["keyword"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolResult, ToolError> {
        let keyword = args.str("keyword").to_lowercase();
        let fs = Arc::clone(&self.fs);
        let hits = on_blocking_pool("search_files", move || {
            let mut hits = Vec::new();
            search(fs.as_ref(), PROJECT_ROOT, &keyword, &mut hits);
            hits
        })
        .await?;
        Ok(ToolResult::ok(hits.join("\n")))
    }
}
