//! Stand-alone editor collaborators for gdpilot.
//!
//! These implement the `gdpilot_core::host` traits without a running editor:
//! a local project directory, a JSON scene snapshot, and an external script
//! interpreter. [`context_from_config`] wires them up from [`AppConfig`].

pub mod fs;
pub mod scene;
pub mod script;

pub use fs::LocalProjectFs;
pub use scene::{NullScene, SnapshotScene};
pub use script::{DisabledScriptHost, ProcessScriptHost};

use gdpilot_config::AppConfig;
use gdpilot_core::error::HostError;
use gdpilot_core::host::{HostContext, SceneGraph, ScriptHost};
use std::sync::Arc;
use tracing::info;

/// Build the host collaborators described by the config.
pub fn context_from_config(config: &AppConfig) -> Result<HostContext, HostError> {
    let fs = LocalProjectFs::new(&config.project.root)?;

    let scene: Arc<dyn SceneGraph> = match &config.project.scene_snapshot {
        Some(path) => {
            let scene = SnapshotScene::load(path)?;
            info!(snapshot = %path.display(), "Scene snapshot loaded");
            Arc::new(scene)
        }
        None => Arc::new(NullScene),
    };

    let scripts: Arc<dyn ScriptHost> = match &config.script.program {
        Some(program) => Arc::new(ProcessScriptHost::new(program.clone(), config.script.args.clone())),
        None => Arc::new(DisabledScriptHost),
    };

    Ok(HostContext::new(Arc::new(fs), scene, scripts))
}
