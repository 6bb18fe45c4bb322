//! Selected nodes tool: what the user has selected in the editor.

use async_trait::async_trait;
use gdpilot_core::error::ToolError;
use gdpilot_core::host::SceneGraph;
use gdpilot_core::tool::{Tool, ToolArgs, ToolResult};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct SelectedNode {
    name: String,
    class: String,
    path: String,
    instance_id: String,
    scene_file: String,
}

pub struct SelectedNodesTool {
    scene: Arc<dyn SceneGraph>,
}

impl SelectedNodesTool {
    pub fn new(scene: Arc<dyn SceneGraph>) -> Self {
        Self { scene }
    }
}

#[async_trait]
impl Tool for SelectedNodesTool {
    fn name(&self) -> &str {
        "get_selected_nodes"
    }

    fn description(&self) -> &str {
        "Get the list of nodes currently selected in the Godot Editor. Returns Name, NodePath, Class, and ID."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: ToolArgs) -> Result<ToolResult, ToolError> {
        let scene = self.scene.as_ref();
        let root = scene.edited_root();

        let nodes: Vec<SelectedNode> = scene
            .selected_nodes()
            .into_iter()
            .filter_map(|id| {
                let info = scene.object(id)?;
                let node = info.node?;
                // Paths are relative to the edited root when there is one
                let path = root
                    .and_then(|r| scene.path_to(r, id))
                    .unwrap_or(node.path);
                Some(SelectedNode {
                    name: node.name,
                    class: info.class,
                    path,
                    instance_id: id.to_string(),
                    scene_file: info.scene_file.unwrap_or_default(),
                })
            })
            .collect();

        if nodes.is_empty() {
            return Ok(ToolResult::ok("No nodes currently selected."));
        }

        serde_json::to_string_pretty(&nodes)
            .map(ToolResult::ok)
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })
    }
}
