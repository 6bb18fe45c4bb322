//! Built-in tool implementations for gdpilot.
//!
//! Tools give the model a read-mostly view of the editor: list, read and
//! search project files, walk the scene tree, inspect object properties,
//! create files and run throwaway script snippets.
//!
//! Every tool talks to the editor through the [`HostContext`] collaborators
//! only; none of them touch the disk or the scene directly.

pub mod create_file;
pub mod list_directory;
pub mod properties;
pub mod property_value;
pub mod read_file;
pub mod run_gdscript;
pub mod scene_tree;
pub mod search_files;
pub mod selected_nodes;

mod blocking;

#[cfg(test)]
mod testing;

use gdpilot_core::error::ToolError;
use gdpilot_core::host::HostContext;
use gdpilot_core::tool::ToolRegistry;

/// Create the registry with every built-in tool, in advertised order.
pub fn default_registry(host: &HostContext) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(list_directory::ListDirectoryTool::new(host.fs.clone())))?;
    registry.register(Box::new(read_file::ReadFileTool::new(host.fs.clone())))?;
    registry.register(Box::new(search_files::SearchFilesTool::new(host.fs.clone())))?;
    registry.register(Box::new(scene_tree::SceneTreeTool::new(host.scene.clone())))?;
    registry.register(Box::new(selected_nodes::SelectedNodesTool::new(host.scene.clone())))?;
    registry.register(Box::new(properties::ObjectPropertiesTool::new(host.scene.clone())))?;
    registry.register(Box::new(properties::NodePropertiesByPathTool::new(host.scene.clone())))?;
    registry.register(Box::new(property_value::NodePropertyValueTool::new(host.scene.clone())))?;
    registry.register(Box::new(create_file::CreateFileTool::new(host.fs.clone())))?;
    registry.register(Box::new(run_gdscript::RunGdscriptTool::new(host.scripts.clone())))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, ThreadRecordingFs};
    use gdpilot_core::tool::ToolExecutor;
    use std::sync::Arc;

    #[test]
    fn registry_lists_every_tool_in_order() {
        let fx = Fixture::with_scene();
        let registry = default_registry(&fx.ctx).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "list_directory",
                "read_file",
                "search_files",
                "get_scene_tree",
                "get_selected_nodes",
                "get_object_properties",
                "get_node_properties_by_path",
                "get_node_property_value",
                "create_file",
                "run_gdscript",
            ]
        );
        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object", "{} schema", def.name);
            assert!(!def.description.is_empty());
        }
    }

    #[tokio::test]
    async fn executor_runs_builtins_from_raw_json() {
        let fx = Fixture::with_scene();
        fx.write("scripts/player.gd", b"extends Node");
        let executor = ToolExecutor::new(Arc::new(default_registry(&fx.ctx).unwrap()));

        let listing = executor
            .execute("list_directory", r#"{"path": "res://scripts"}"#)
            .await;
        assert_eq!(listing.output, "[FILE] player.gd");

        // parameterless tools accept an empty payload
        let selected = executor.execute("get_selected_nodes", "").await;
        assert!(selected.output.contains("\"Mesh\""));

        let bad = executor.execute("read_file", "{not json").await;
        assert!(bad.output.starts_with("Error executing tool read_file: "));
    }

    #[tokio::test]
    async fn write_then_read_through_executor() {
        let fx = Fixture::without_scene();
        let executor = ToolExecutor::new(Arc::new(default_registry(&fx.ctx).unwrap()));

        let created = executor
            .execute(
                "create_file",
                r#"{"path": "res://scenes/level.tscn", "content": "[gd_scene format=3]"}"#,
            )
            .await;
        assert!(created.success);

        let read = executor
            .execute("read_file", r#"{"path": "res://scenes/level.tscn"}"#)
            .await;
        assert_eq!(read.output, "[gd_scene format=3]");

        let found = executor.execute("search_files", r#"{"keyword": "LEVEL"}"#).await;
        assert_eq!(found.output, "res://scenes/level.tscn");
    }

    #[tokio::test]
    async fn file_tools_stay_off_the_async_worker() {
        let fx = Fixture::without_scene();
        fx.write("scripts/player.gd", b"extends Node");
        let fs = ThreadRecordingFs::new(fx.fs.clone());
        let ctx = HostContext::new(fs.clone(), fx.ctx.scene.clone(), fx.ctx.scripts.clone());
        let executor = ToolExecutor::new(Arc::new(default_registry(&ctx).unwrap()));

        executor.execute("list_directory", r#"{"path": "res://scripts"}"#).await;
        executor.execute("read_file", r#"{"path": "res://scripts/player.gd"}"#).await;
        executor.execute("search_files", r#"{"keyword": "player"}"#).await;
        let created = executor
            .execute("create_file", r#"{"path": "res://a/b.txt", "content": "x"}"#)
            .await;
        assert!(created.success);

        // current-thread runtime: the test thread is the only async worker
        let worker = std::thread::current().id();
        let threads = fs.threads.lock().unwrap();
        assert!(threads.len() >= 4);
        assert!(threads.iter().all(|t| *t != worker));
    }
}
