//! Create file tool: write a text file, creating parent directories.

use async_trait::async_trait;
use gdpilot_core::error::ToolError;
use gdpilot_core::host::{ProjectFs, parent_dir};
use gdpilot_core::tool::{Tool, ToolArgs, ToolResult};
use std::sync::Arc;
use tracing::debug;

use crate::blocking::on_blocking_pool;

pub struct CreateFileTool {
    fs: Arc<dyn ProjectFs>,
}

impl CreateFileTool {
    pub fn new(fs: Arc<dyn ProjectFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a text file (e.g., .gd, .tscn, .txt) at a specific path. \
         If the directory does not exist, this tool will create it recursively. \
         Please check the directory before using this tool to ensure that files are not accidentally overwritten."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The full path (e.g., 'res://scripts/my_script.gd')."
                },
                "content": {
                    "type": "string",
                    "description": "The text content to write into the file."
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolResult, ToolError> {
        let path = args.str("path");
        let content = args.str("content");
        let fs = Arc::clone(&self.fs);
        on_blocking_pool("create_file", move || create(fs.as_ref(), &path, &content)).await
    }
}

fn create(fs: &dyn ProjectFs, path: &str, content: &str) -> ToolResult {
    let dir = parent_dir(path);
    if !fs.dir_exists(&dir)
        && let Err(e) = fs.create_dir_all(&dir)
    {
        return ToolResult::failure(format!("Error creating directory '{dir}': {e}"));
    }

    if fs.write(path, content.as_bytes()).is_err() {
        return ToolResult::failure(format!(
            "Error: Could not open file '{path}' for writing."
        ));
    }

    debug!(path = %path, bytes = content.len(), "File written");
    fs.refresh_index();
    ToolResult::ok(format!("Success: File created/overwritten at '{path}'."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    async fn create(fx: &Fixture, path: &str, content: &str) -> ToolResult {
        CreateFileTool::new(fx.ctx.fs.clone())
            .execute(ToolArgs::from_value(
                serde_json::json!({ "path": path, "content": content }),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn creates_nested_file_and_refreshes() {
        let fx = Fixture::without_scene();
        let result = create(&fx, "res://scripts/ai/enemy.gd", "extends Node\n").await;

        assert!(result.success);
        assert_eq!(
            result.output,
            "Success: File created/overwritten at 'res://scripts/ai/enemy.gd'."
        );
        assert_eq!(
            std::fs::read_to_string(fx.dir.path().join("scripts/ai/enemy.gd")).unwrap(),
            "extends Node\n"
        );
        assert_eq!(fx.fs.refresh_count(), 1);
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let fx = Fixture::without_scene();
        fx.write("notes.txt", b"old");
        let result = create(&fx, "res://notes.txt", "new").await;
        assert!(result.success);
        assert_eq!(std::fs::read_to_string(fx.dir.path().join("notes.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn directory_creation_failure() {
        let fx = Fixture::without_scene();
        // A file where a directory is needed
        fx.write("blocked", b"");
        let result = create(&fx, "res://blocked/inner/file.gd", "x").await;
        assert!(!result.success);
        assert!(result.output.starts_with("Error creating directory 'res://blocked/inner': "));
        assert_eq!(fx.fs.refresh_count(), 0);
    }

    #[tokio::test]
    async fn write_failure() {
        let fx = Fixture::without_scene();
        std::fs::create_dir(fx.dir.path().join("taken")).unwrap();
        let result = create(&fx, "res://taken", "x").await;
        assert!(!result.success);
        assert_eq!(result.output, "Error: Could not open file 'res://taken' for writing.");
    }
}
