//! Scene graphs that live outside the editor.
//!
//! [`SnapshotScene`] answers every [`SceneGraph`] query from a JSON export of
//! the edited scene; [`NullScene`] is a host with nothing open.
//!
//! Snapshot format:
//!
//! ```json
//! {
//!   "root": 1,
//!   "selection": [2],
//!   "objects": [
//!     { "id": 1, "class": "Node3D", "display": "Main:<Node3D#1>",
//!       "node": { "name": "Main", "path": "/root/Main" },
//!       "scene_file": "res://main.tscn",
//!       "properties": [
//!         { "name": "position", "usage": { "storage": true, "editor": true },
//!           "value": { "type": "other", "value": "(0, 0, 0)" } }
//!       ] },
//!     { "id": 2, "parent": 1, "class": "MeshInstance3D", "display": "Mesh:<MeshInstance3D#2>",
//!       "node": { "name": "Mesh", "path": "/root/Main/Mesh" } }
//!   ]
//! }
//! ```
//!
//! Children are ordered as they appear in `objects`. A property marked
//! `"unreadable": true` fails on read.

use gdpilot_core::error::HostError;
use gdpilot_core::host::{NodeInfo, ObjectId, ObjectInfo, PropertyInfo, PropertyUsage, SceneGraph, Variant};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    root: Option<ObjectId>,
    #[serde(default)]
    selection: Vec<ObjectId>,
    #[serde(default)]
    objects: Vec<SnapshotObject>,
}

#[derive(Debug, Deserialize)]
struct SnapshotObject {
    id: ObjectId,
    #[serde(default)]
    parent: Option<ObjectId>,
    class: String,
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    node: Option<NodeInfo>,
    #[serde(default)]
    scene_file: Option<String>,
    #[serde(default)]
    resource_path: Option<String>,
    #[serde(default)]
    properties: Vec<SnapshotProperty>,
}

#[derive(Debug, Deserialize)]
struct SnapshotProperty {
    name: String,
    #[serde(default)]
    usage: PropertyUsage,
    #[serde(default = "nil")]
    value: Variant,
    #[serde(default)]
    unreadable: bool,
}

fn nil() -> Variant {
    Variant::Nil
}

/// A frozen copy of the edited scene.
#[derive(Debug)]
pub struct SnapshotScene {
    root: Option<ObjectId>,
    selection: Vec<ObjectId>,
    objects: HashMap<ObjectId, SnapshotObject>,
    children: HashMap<ObjectId, Vec<ObjectId>>,
}

impl SnapshotScene {
    pub fn from_json(json: &str) -> Result<Self, HostError> {
        let snapshot: Snapshot =
            serde_json::from_str(json).map_err(|e| HostError::Other(format!("invalid scene snapshot: {e}")))?;

        let mut children: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
        let mut objects = HashMap::with_capacity(snapshot.objects.len());
        for object in snapshot.objects {
            if let Some(parent) = object.parent {
                children.entry(parent).or_default().push(object.id);
            }
            objects.insert(object.id, object);
        }

        if let Some(root) = snapshot.root
            && !objects.contains_key(&root)
        {
            return Err(HostError::Other(format!("scene root {root} is not in the snapshot")));
        }

        Ok(Self {
            root: snapshot.root,
            selection: snapshot.selection,
            objects,
            children,
        })
    }

    pub fn load(path: &Path) -> Result<Self, HostError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn entry(&self, id: ObjectId) -> Result<&SnapshotObject, HostError> {
        self.objects
            .get(&id)
            .ok_or_else(|| HostError::NotFound(format!("object {id}")))
    }

    fn child_named(&self, id: ObjectId, name: &str) -> Option<ObjectId> {
        self.children.get(&id)?.iter().copied().find(|child| {
            self.objects
                .get(child)
                .and_then(|o| o.node.as_ref())
                .is_some_and(|n| n.name == name)
        })
    }

    /// `id` followed by each of its ancestors.
    fn lineage(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.objects.get(&current).and_then(|o| o.parent) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }
}

impl SceneGraph for SnapshotScene {
    fn edited_root(&self) -> Option<ObjectId> {
        self.root
    }

    fn object(&self, id: ObjectId) -> Option<ObjectInfo> {
        let o = self.objects.get(&id)?;
        Some(ObjectInfo {
            id,
            class: o.class.clone(),
            display: o
                .display
                .clone()
                .unwrap_or_else(|| format!("<{}#{}>", o.class, id)),
            node: o.node.clone(),
            scene_file: o.scene_file.clone().filter(|s| !s.is_empty()),
            resource_path: o.resource_path.clone().filter(|s| !s.is_empty()),
        })
    }

    fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        self.children.get(&id).cloned().unwrap_or_default()
    }

    fn node_at_path(&self, from: ObjectId, path: &str) -> Option<ObjectId> {
        self.objects.get(&from)?.node.as_ref()?;

        if path.starts_with('/') {
            return self
                .objects
                .values()
                .find(|o| o.node.as_ref().is_some_and(|n| n.path == path))
                .map(|o| o.id);
        }

        let mut current = from;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = match segment {
                "." => current,
                ".." => self.objects.get(&current)?.parent?,
                name => self.child_named(current, name)?,
            };
        }
        Some(current)
    }

    fn path_to(&self, from: ObjectId, to: ObjectId) -> Option<String> {
        if !self.objects.contains_key(&from) || !self.objects.contains_key(&to) {
            return None;
        }
        let up = self.lineage(from);
        let down = self.lineage(to);
        let common = up.iter().position(|a| down.contains(a))?;
        let split = down.iter().position(|d| *d == up[common])?;

        let mut segments: Vec<String> = vec!["..".to_string(); common];
        for id in down[..split].iter().rev() {
            segments.push(self.objects.get(id)?.node.as_ref()?.name.clone());
        }

        if segments.is_empty() {
            Some(".".into())
        } else {
            Some(segments.join("/"))
        }
    }

    fn selected_nodes(&self) -> Vec<ObjectId> {
        self.selection
            .iter()
            .copied()
            .filter(|id| self.objects.contains_key(id))
            .collect()
    }

    fn property_list(&self, id: ObjectId) -> Result<Vec<PropertyInfo>, HostError> {
        Ok(self
            .entry(id)?
            .properties
            .iter()
            .map(|p| PropertyInfo {
                name: p.name.clone(),
                usage: p.usage,
            })
            .collect())
    }

    fn get(&self, id: ObjectId, property: &str) -> Result<Variant, HostError> {
        match self.entry(id)?.properties.iter().find(|p| p.name == property) {
            Some(p) if p.unreadable => Err(HostError::Other(format!("property '{property}' cannot be read"))),
            Some(p) => Ok(p.value.clone()),
            None => Ok(Variant::Nil),
        }
    }

    fn get_indexed(&self, id: ObjectId, path: &str) -> Result<Variant, HostError> {
        let mut segments = path.split(':');
        let first = segments.next().unwrap_or_default();
        let mut value = self.get(id, first)?;

        for segment in segments {
            value = match value {
                Variant::Object(inner) if self.objects.contains_key(&inner) => self.get(inner, segment)?,
                _ => return Ok(Variant::Nil),
            };
        }
        Ok(value)
    }
}

/// A host with no scene open.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScene;

impl SceneGraph for NullScene {
    fn edited_root(&self) -> Option<ObjectId> {
        None
    }

    fn object(&self, _id: ObjectId) -> Option<ObjectInfo> {
        None
    }

    fn children(&self, _id: ObjectId) -> Vec<ObjectId> {
        Vec::new()
    }

    fn node_at_path(&self, _from: ObjectId, _path: &str) -> Option<ObjectId> {
        None
    }

    fn path_to(&self, _from: ObjectId, _to: ObjectId) -> Option<String> {
        None
    }

    fn selected_nodes(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    fn property_list(&self, _id: ObjectId) -> Result<Vec<PropertyInfo>, HostError> {
        Err(HostError::NoScene)
    }

    fn get(&self, _id: ObjectId, _property: &str) -> Result<Variant, HostError> {
        Err(HostError::NoScene)
    }

    fn get_indexed(&self, _id: ObjectId, _path: &str) -> Result<Variant, HostError> {
        Err(HostError::NoScene)
    }
}
