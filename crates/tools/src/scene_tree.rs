//! Scene tree tool: an outline of a node and its direct children.

use async_trait::async_trait;
use gdpilot_core::error::ToolError;
use gdpilot_core::host::{ObjectId, SceneGraph};
use gdpilot_core::tool::{Tool, ToolArgs, ToolResult};
use std::fmt::Write;
use std::sync::Arc;

/// How many levels below the requested node are listed.
const MAX_DEPTH: usize = 1;

pub struct SceneTreeTool {
    scene: Arc<dyn SceneGraph>,
}

impl SceneTreeTool {
    pub fn new(scene: Arc<dyn SceneGraph>) -> Self {
        Self { scene }
    }

    /// `"0"` is the edited root; anything else must be the id of a node.
    fn resolve(&self, node_id: &str) -> Option<ObjectId> {
        let root = self.scene.edited_root()?;
        if node_id == "0" {
            return Some(root);
        }
        let id = node_id.trim().parse::<ObjectId>().ok()?;
        self.scene.object(id)?.node.map(|_| id)
    }

    fn outline(&self, id: ObjectId, depth: usize, out: &mut String) {
        let Some(info) = self.scene.object(id) else {
            return;
        };
        let name = info.node.as_ref().map_or(info.display.as_str(), |n| n.name.as_str());

        let _ = write!(out, "{}- {} ({}) [ID: {}]", "  ".repeat(depth), name, info.class, id);
        if let Some(scene_file) = &info.scene_file {
            let _ = write!(out, " [Scene: {scene_file}]");
        }
        out.push('\n');

        if depth >= MAX_DEPTH {
            return;
        }
        for child in self.scene.children(id) {
            self.outline(child, depth + 1, out);
        }
    }
}

#[async_trait]
impl Tool for SceneTreeTool {
    fn name(&self) -> &str {
        "get_scene_tree"
    }

    fn description(&self) -> &str {
        "Get the tree structure of the currently open scene. Returns Name, Type, and Instance ID."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node_id": {
                    "type": "string",
                    "description": "The Instance ID of the node to inspect. Pass '0' to get the children of current scene root."
                }
            },
            "required": ["node_id"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolResult, ToolError> {
        let Some(id) = self.resolve(&args.str("node_id")) else {
            return Ok(ToolResult::failure(
                "Error: Could not find node or no scene is open.",
            ));
        };

        let mut out = String::new();
        self.outline(id, 0, &mut out);
        Ok(ToolResult::ok(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    async fn tree(fx: &Fixture, node_id: &str) -> ToolResult {
        SceneTreeTool::new(fx.ctx.scene.clone())
            .execute(ToolArgs::from_value(serde_json::json!({ "node_id": node_id })))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn root_outline_is_one_level_deep() {
        let fx = Fixture::with_scene();
        let result = tree(&fx, "0").await;
        assert!(result.success);
        assert_eq!(
            result.output,
            "- Main (Node3D) [ID: 100] [Scene: res://main.tscn]\n\
             \x20\x20- Player (CharacterBody3D) [ID: 101] [Scene: res://player.tscn]\n\
             \x20\x20- Camera (Camera3D) [ID: 104]\n"
        );
    }

    #[tokio::test]
    async fn subtree_by_id() {
        let fx = Fixture::with_scene();
        let result = tree(&fx, "102").await;
        assert_eq!(
            result.output,
            "- Mesh (MeshInstance3D) [ID: 102]\n  - Deep (Node) [ID: 103]\n"
        );
    }

    #[tokio::test]
    async fn resources_and_unknown_ids_are_rejected() {
        let fx = Fixture::with_scene();
        for id in ["200", "424242", "not-a-number"] {
            assert_eq!(
                tree(&fx, id).await.output,
                "Error: Could not find node or no scene is open."
            );
        }
    }

    #[tokio::test]
    async fn no_scene_open() {
        let fx = Fixture::without_scene();
        let result = tree(&fx, "0").await;
        assert!(!result.success);
        assert_eq!(result.output, "Error: Could not find node or no scene is open.");
    }
}
