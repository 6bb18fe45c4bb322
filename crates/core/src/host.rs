//! Host collaborator traits: what the editor must provide to the tools.
//!
//! The tools never touch the editor directly. They see three black-box
//! services; only the script runner is async:
//! - [`ProjectFs`]: the project file system (`res://` paths)
//! - [`SceneGraph`]: the live scene/object graph being edited
//! - [`ScriptHost`]: compile-and-run for throwaway script snippets
//!
//! `gdpilot-host` ships stand-alone implementations; an editor embedding
//! would implement these against its own APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::HostError;

/// Opaque numeric identity of a live object (node or resource).
pub type ObjectId = u64;

/// Project path root understood by every host.
pub const PROJECT_ROOT: &str = "res://";

/// One directory entry, as enumerated by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// The project file system.
pub trait ProjectFs: Send + Sync {
    /// Enumerate a directory, in whatever order the host yields.
    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, HostError>;

    fn file_exists(&self, path: &str) -> bool;

    fn dir_exists(&self, path: &str) -> bool;

    fn file_size(&self, path: &str) -> Result<u64, HostError>;

    fn read(&self, path: &str) -> Result<Vec<u8>, HostError>;

    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &str) -> Result<(), HostError>;

    /// Create or overwrite a file.
    fn write(&self, path: &str, contents: &[u8]) -> Result<(), HostError>;

    /// Tell the host its file index is stale.
    fn refresh_index(&self);
}

/// Join a project path and a child name with exactly one separator.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// The directory part of a project path (`res://a/b.gd` → `res://a`).
pub fn parent_dir(path: &str) -> String {
    let (scheme, rest) = match path.strip_prefix(PROJECT_ROOT) {
        Some(rest) => (PROJECT_ROOT, rest),
        None => ("", path),
    };
    match rest.rfind('/') {
        Some(idx) => format!("{scheme}{}", &rest[..idx]),
        None => scheme.to_string(),
    }
}

/// Lower-cased extension of the final path segment, empty if none.
pub fn extension(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(idx) if idx > 0 => file[idx + 1..].to_lowercase(),
        _ => String::new(),
    }
}

/// Summary of a live object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: ObjectId,

    /// Engine class name (e.g. `Node3D`, `StandardMaterial3D`)
    pub class: String,

    /// The object's own string form
    pub display: String,

    /// Present for nodes only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeInfo>,

    /// Source scene for instanced nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_file: Option<String>,

    /// Backing file for saved resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_path: Option<String>,
}

/// Node-specific identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,

    /// Absolute path inside the running tree
    pub path: String,
}

/// Visibility flags of a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyUsage {
    #[serde(default)]
    pub storage: bool,
    #[serde(default)]
    pub editor: bool,
    #[serde(default)]
    pub script_variable: bool,
}

impl PropertyUsage {
    /// Whether the property is visible to scripts, the editor, or storage.
    pub fn is_visible(&self) -> bool {
        self.storage || self.editor || self.script_variable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    pub usage: PropertyUsage,
}

/// A property value as the host reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Variant {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A reference to another live object; never followed implicitly.
    Object(ObjectId),
    /// Any other engine value in its printed form (vectors, colors, ...)
    Other(String),
}

impl Variant {
    pub fn is_nil(&self) -> bool {
        matches!(self, Variant::Nil)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Nil => f.write_str("<null>"),
            Variant::Bool(b) => write!(f, "{b}"),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Float(x) => write!(f, "{x}"),
            Variant::String(s) | Variant::Other(s) => f.write_str(s),
            Variant::Object(id) => write!(f, "<Object#{id}>"),
        }
    }
}

/// The live scene/object graph.
pub trait SceneGraph: Send + Sync {
    /// Root node of the scene currently being edited.
    fn edited_root(&self) -> Option<ObjectId>;

    fn object(&self, id: ObjectId) -> Option<ObjectInfo>;

    fn children(&self, id: ObjectId) -> Vec<ObjectId>;

    /// Resolve a node path relative to `from`.
    fn node_at_path(&self, from: ObjectId, path: &str) -> Option<ObjectId>;

    /// Relative path from `from` to `to`.
    fn path_to(&self, from: ObjectId, to: ObjectId) -> Option<String>;

    /// Nodes currently selected in the editor.
    fn selected_nodes(&self) -> Vec<ObjectId>;

    fn property_list(&self, id: ObjectId) -> Result<Vec<PropertyInfo>, HostError>;

    fn get(&self, id: ObjectId, property: &str) -> Result<Variant, HostError>;

    /// Indexed lookup (`mesh:material:albedo_color`). Unknown paths yield `Nil`.
    fn get_indexed(&self, id: ObjectId, path: &str) -> Result<Variant, HostError>;
}

/// Value returned by a script's entry call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutput {
    Value(String),
    Object { class: String, id: ObjectId },
}

/// Why a script snippet did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptFailure {
    /// The snippet did not compile; `diagnostics` holds what the compiler
    /// reported while it ran.
    Compile {
        error: String,
        diagnostics: Vec<String>,
    },
    NotInstantiable,
    Instantiation(String),
    MissingEntry {
        entry: String,
    },
    Runtime(String),
    /// The host has no script runtime.
    Unavailable(String),
}

/// Compile-and-run for ephemeral snippets.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Compile `source`, instantiate it, and call the zero-argument `entry`.
    async fn run(&self, source: &str, entry: &str) -> Result<ScriptOutput, ScriptFailure>;
}

/// The bundle of collaborators the built-in tools run against.
#[derive(Clone)]
pub struct HostContext {
    pub fs: Arc<dyn ProjectFs>,
    pub scene: Arc<dyn SceneGraph>,
    pub scripts: Arc<dyn ScriptHost>,
}

impl HostContext {
    pub fn new(
        fs: Arc<dyn ProjectFs>,
        scene: Arc<dyn SceneGraph>,
        scripts: Arc<dyn ScriptHost>,
    ) -> Self {
        Self { fs, scene, scripts }
    }
}
