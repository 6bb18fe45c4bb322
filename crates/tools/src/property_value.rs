//! Property value tool: one property or sub-resource of a node.

use async_trait::async_trait;
use gdpilot_core::error::{HostError, ToolError};
use gdpilot_core::host::{SceneGraph, Variant};
use gdpilot_core::tool::{Tool, ToolArgs, ToolResult};
use std::sync::Arc;

use crate::properties::{dump_object, object_ref, resolve_node};

pub struct NodePropertyValueTool {
    scene: Arc<dyn SceneGraph>,
}

impl NodePropertyValueTool {
    pub fn new(scene: Arc<dyn SceneGraph>) -> Self {
        Self { scene }
    }
}

#[async_trait]
impl Tool for NodePropertyValueTool {
    fn name(&self) -> &str {
        "get_node_property_value"
    }

    fn description(&self) -> &str {
        "Get a specific property value or sub-resource from a node using a path. \
         Useful for accessing nested resources like 'mesh/material/albedo_color' or 'surface_material_override/0'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node_path": {
                    "type": "string",
                    "description": "Path to the scene node (e.g. 'Player/MeshInstance')."
                },
                "property_path": {
                    "type": "string",
                    "description": "Path to the property or sub-resource (e.g. 'mesh:material:albedo_color' or 'surface_material_override/0'). Slashes are automatically converted to colons where appropriate."
                }
            },
            "required": ["node_path", "property_path"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolResult, ToolError> {
        let scene = self.scene.as_ref();
        let Some(root) = scene.edited_root() else {
            return Ok(ToolResult::failure("Error: No scene currently open."));
        };

        let node_path = args.str("node_path");
        let property_path = args.str("property_path");

        let Some(node) = resolve_node(scene, root, &node_path) else {
            return Ok(ToolResult::failure(format!(
                "Error: Could not find node at path '{node_path}'."
            )));
        };

        // None: nil all the way up to the top-level property
        let lookup = || -> Result<Option<Variant>, HostError> {
            let mut value = scene.get_indexed(node, &property_path)?;
            if value.is_nil() && property_path.contains('/') {
                value = scene.get_indexed(node, &property_path.replace('/', ":"))?;
            }
            if value.is_nil() {
                let top = property_path.split(['/', ':']).next().unwrap_or_default();
                if scene.get(node, top)?.is_nil() {
                    return Ok(None);
                }
            }
            Ok(Some(value))
        };

        Ok(match lookup() {
            Ok(Some(Variant::Object(id))) => {
                ToolResult::ok(dump_object(scene, id).unwrap_or_else(|| object_ref(scene, id)))
            }
            Ok(Some(value)) => ToolResult::ok(value.to_string()),
            Ok(None) => ToolResult::failure(format!(
                "Error: Property path '{property_path}' returned Nil (or path is invalid)."
            )),
            Err(e) => ToolResult::failure(format!(
                "Error accessing property '{property_path}': {e}"
            )),
        })
    }
}
