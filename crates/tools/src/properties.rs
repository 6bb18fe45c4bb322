//! Property dumps of live objects.
//!
//! [`dump_object`] is shared by every property tool. Object-valued properties
//! are rendered by reference and never followed, so cyclic resource graphs
//! stay finite.

use async_trait::async_trait;
use gdpilot_core::error::ToolError;
use gdpilot_core::host::{ObjectId, SceneGraph, Variant};
use gdpilot_core::tool::{Tool, ToolArgs, ToolResult};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Longest property value kept before truncation, in characters.
pub const MAX_VALUE_CHARS: usize = 200;

fn is_hidden(name: &str) -> bool {
    name.starts_with("metadata/") || name.contains("script/source") || name.ends_with(".cs")
}

fn truncate(mut value: String) -> String {
    if let Some((idx, _)) = value.char_indices().nth(MAX_VALUE_CHARS) {
        value.truncate(idx);
        value.push_str("...(truncated)");
    }
    value
}

/// One-line reference to another object.
pub fn object_ref(scene: &dyn SceneGraph, id: ObjectId) -> String {
    match scene.object(id) {
        Some(info) => format!(
            "<Object: {} (ID: {}) {}>",
            info.class,
            id,
            info.resource_path.unwrap_or_default()
        ),
        None => format!("<Object: Object (ID: {id}) >"),
    }
}

/// Pretty JSON of an object's identity and its visible properties.
///
/// Returns `None` when the object does not exist.
pub fn dump_object(scene: &dyn SceneGraph, id: ObjectId) -> Option<String> {
    let info = scene.object(id)?;
    let mut dump = Map::new();

    dump.insert(
        "_info_".into(),
        json!({
            "class": info.class,
            "instance_id": id.to_string(),
            "display": info.display,
        }),
    );

    if let Some(node) = &info.node {
        dump.insert(
            "_node_".into(),
            json!({
                "name": node.name,
                "path": node.path,
            }),
        );
    }

    for property in scene.property_list(id).unwrap_or_default() {
        if !property.usage.is_visible() || is_hidden(&property.name) {
            continue;
        }

        let rendered = match scene.get(id, &property.name) {
            Ok(Variant::Object(child)) => object_ref(scene, child),
            Ok(value) => truncate(value.to_string()),
            Err(_) => "<Error reading property>".to_string(),
        };
        dump.insert(property.name, Value::String(rendered));
    }

    Some(serde_json::to_string_pretty(&Value::Object(dump)).unwrap_or_default())
}

/// Property dump by instance id.
pub struct ObjectPropertiesTool {
    scene: Arc<dyn SceneGraph>,
}

impl ObjectPropertiesTool {
    pub fn new(scene: Arc<dyn SceneGraph>) -> Self {
        Self { scene }
    }
}

#[async_trait]
impl Tool for ObjectPropertiesTool {
    fn name(&self) -> &str {
        "get_object_properties"
    }

    fn description(&self) -> &str {
        "Get the properties of a specific object (Node or Resource) by its Instance ID."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "object_id": {
                    "type": "string",
                    "description": "The Instance ID of the object."
                }
            },
            "required": ["object_id"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolResult, ToolError> {
        let Ok(id) = args.str("object_id").trim().parse::<ObjectId>() else {
            return Ok(ToolResult::failure("Error: Invalid ID format."));
        };

        Ok(match dump_object(self.scene.as_ref(), id) {
            Some(dump) => ToolResult::ok(dump),
            None => ToolResult::failure("Error: Could not find object with that ID."),
        })
    }
}

/// Property dump of the node at a scene path.
pub struct NodePropertiesByPathTool {
    scene: Arc<dyn SceneGraph>,
}

impl NodePropertiesByPathTool {
    pub fn new(scene: Arc<dyn SceneGraph>) -> Self {
        Self { scene }
    }
}

/// Resolve a node path against the edited root (`""` and `"."` are the root).
pub(crate) fn resolve_node(scene: &dyn SceneGraph, root: ObjectId, path: &str) -> Option<ObjectId> {
    if path.is_empty() || path == "." {
        Some(root)
    } else {
        scene.node_at_path(root, path)
    }
}

#[async_trait]
impl Tool for NodePropertiesByPathTool {
    fn name(&self) -> &str {
        "get_node_properties_by_path"
    }

    fn description(&self) -> &str {
        "Get the properties of a node by its scene path (relative to the edited scene root)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The node path (e.g. 'Player/Camera3D' or '.' for root)."
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolResult, ToolError> {
        let scene = self.scene.as_ref();
        let Some(root) = scene.edited_root() else {
            return Ok(ToolResult::failure("Error: No scene currently open."));
        };

        let path = args.str("path");
        let dump = resolve_node(scene, root, &path).and_then(|id| dump_object(scene, id));

        Ok(match dump {
            Some(dump) => ToolResult::ok(dump),
            None => ToolResult::failure(format!("Error: Could not find node at path '{path}'.")),
        })
    }
}
