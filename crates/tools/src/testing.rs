//! Shared fixtures for tool tests.

use async_trait::async_trait;
use gdpilot_core::error::HostError;
use gdpilot_core::host::{DirEntry, HostContext, ProjectFs, ScriptFailure, ScriptHost, ScriptOutput};
use gdpilot_host::{DisabledScriptHost, LocalProjectFs, NullScene, SnapshotScene};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

pub const SCENE: &str = r#"{
    "root": 100,
    "selection": [102],
    "objects": [
        {"id": 100, "class": "Node3D", "display": "Main:<Node3D#100>",
         "node": {"name": "Main", "path": "/root/Main"}, "scene_file": "res://main.tscn",
         "properties": [
            {"name": "position", "usage": {"storage": true, "editor": true},
             "value": {"type": "other", "value": "(0, 0, 0)"}},
            {"name": "visible", "usage": {"editor": true}, "value": {"type": "bool", "value": true}},
            {"name": "metadata/_edit_lock_", "usage": {"storage": true}, "value": {"type": "bool", "value": true}},
            {"name": "Main.cs", "usage": {"editor": true}, "value": {"type": "other", "value": "Main.cs"}},
            {"name": "internal_cache", "usage": {}, "value": {"type": "int", "value": 3}}
         ]},
        {"id": 101, "parent": 100, "class": "CharacterBody3D", "display": "Player:<CharacterBody3D#101>",
         "node": {"name": "Player", "path": "/root/Main/Player"}, "scene_file": "res://player.tscn",
         "properties": [
            {"name": "speed", "usage": {"script_variable": true}, "value": {"type": "float", "value": 5.5}},
            {"name": "script", "usage": {"editor": true}, "value": {"type": "object", "value": 300}},
            {"name": "script/source", "usage": {"storage": true}, "value": {"type": "string", "value": "extends Node"}}
         ]},
        {"id": 102, "parent": 101, "class": "MeshInstance3D", "display": "Mesh:<MeshInstance3D#102>",
         "node": {"name": "Mesh", "path": "/root/Main/Player/Mesh"},
         "properties": [
            {"name": "mesh", "usage": {"editor": true, "storage": true}, "value": {"type": "object", "value": 200}},
            {"name": "surface_material_override/0", "usage": {"editor": true},
             "value": {"type": "object", "value": 201}},
            {"name": "broken", "usage": {"editor": true}, "unreadable": true}
         ]},
        {"id": 103, "parent": 102, "class": "Node", "node": {"name": "Deep", "path": "/root/Main/Player/Mesh/Deep"}},
        {"id": 104, "parent": 100, "class": "Camera3D", "node": {"name": "Camera", "path": "/root/Main/Camera"}},
        {"id": 200, "class": "BoxMesh", "display": "<BoxMesh#200>", "resource_path": "res://meshes/box.tres",
         "properties": [
            {"name": "material", "usage": {"storage": true}, "value": {"type": "object", "value": 201}},
            {"name": "size", "usage": {"storage": true, "editor": true}, "value": {"type": "other", "value": "(1, 1, 1)"}}
         ]},
        {"id": 201, "class": "StandardMaterial3D", "display": "<StandardMaterial3D#201>",
         "properties": [
            {"name": "albedo_color", "usage": {"storage": true}, "value": {"type": "other", "value": "(1, 0, 0, 1)"}}
         ]},
        {"id": 300, "class": "GDScript", "resource_path": "res://player.gd"}
    ]
}"#;

/// A temp project directory plus a host context over it.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub fs: Arc<LocalProjectFs>,
    pub ctx: HostContext,
}

impl Fixture {
    pub fn with_scene() -> Self {
        Self::build(Arc::new(SnapshotScene::from_json(SCENE).unwrap()), Arc::new(DisabledScriptHost))
    }

    pub fn without_scene() -> Self {
        Self::build(Arc::new(NullScene), Arc::new(DisabledScriptHost))
    }

    pub fn with_scripts(scripts: Arc<dyn ScriptHost>) -> Self {
        Self::build(Arc::new(NullScene), scripts)
    }

    fn build(scene: Arc<dyn gdpilot_core::host::SceneGraph>, scripts: Arc<dyn ScriptHost>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fs = Arc::new(LocalProjectFs::new(dir.path()).unwrap());
        let ctx = HostContext::new(fs.clone(), scene, scripts);
        Self { dir, fs, ctx }
    }

    pub fn write(&self, rel: &str, contents: &[u8]) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}

/// A script host that returns a canned result and records what it ran.
pub struct CannedScripts {
    pub result: Result<ScriptOutput, ScriptFailure>,
    pub seen: Mutex<Vec<(String, String)>>,
}

impl CannedScripts {
    pub fn new(result: Result<ScriptOutput, ScriptFailure>) -> Arc<Self> {
        Arc::new(Self {
            result,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ScriptHost for CannedScripts {
    async fn run(&self, source: &str, entry: &str) -> Result<ScriptOutput, ScriptFailure> {
        self.seen.lock().unwrap().push((source.to_string(), entry.to_string()));
        self.result.clone()
    }
}

/// Delegates to another filesystem and records the thread of every call.
pub struct ThreadRecordingFs {
    inner: Arc<dyn ProjectFs>,
    pub threads: Mutex<Vec<ThreadId>>,
}

impl ThreadRecordingFs {
    pub fn new(inner: Arc<dyn ProjectFs>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            threads: Mutex::new(Vec::new()),
        })
    }

    fn record(&self) {
        self.threads.lock().unwrap().push(std::thread::current().id());
    }
}

impl ProjectFs for ThreadRecordingFs {
    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, HostError> {
        self.record();
        self.inner.list_dir(path)
    }

    fn file_exists(&self, path: &str) -> bool {
        self.record();
        self.inner.file_exists(path)
    }

    fn dir_exists(&self, path: &str) -> bool {
        self.record();
        self.inner.dir_exists(path)
    }

    fn file_size(&self, path: &str) -> Result<u64, HostError> {
        self.record();
        self.inner.file_size(path)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, HostError> {
        self.record();
        self.inner.read(path)
    }

    fn create_dir_all(&self, path: &str) -> Result<(), HostError> {
        self.record();
        self.inner.create_dir_all(path)
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<(), HostError> {
        self.record();
        self.inner.write(path, contents)
    }

    fn refresh_index(&self) {
        self.record();
        self.inner.refresh_index();
    }
}
