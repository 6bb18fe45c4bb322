//! `gdpilot doctor`: diagnose the setup.

use gdpilot_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("gdpilot doctor");
    println!("==============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  [ok]   Config file: {}", config_path.display());
    } else {
        println!("  [warn] No config file; defaults in use (run `gdpilot config init`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Config valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  [ok]   API key configured");
    } else {
        println!("  [warn] No API key (set GDPILOT_API_KEY or `gdpilot config set api_key <key>`)");
        issues += 1;
    }
    println!("  [ok]   Endpoint: {}", config.endpoint);
    println!("  [ok]   Model: {}", config.model);

    let root = &config.project.root;
    if root.is_dir() {
        println!("  [ok]   Project root: {}", root.display());
        if !root.join("project.godot").is_file() {
            println!("  [warn] No project.godot under the project root");
            issues += 1;
        }
    } else {
        println!("  [fail] Project root is not a directory: {}", root.display());
        issues += 1;
    }

    match &config.project.scene_snapshot {
        Some(path) => match gdpilot_host::SnapshotScene::load(path) {
            Ok(_) => println!("  [ok]   Scene snapshot: {}", path.display()),
            Err(e) => {
                println!("  [fail] Scene snapshot unreadable: {e}");
                issues += 1;
            }
        },
        None => println!("  [info] No scene snapshot; scene tools will report no open scene"),
    }

    match &config.script.program {
        Some(program) => println!("  [ok]   Script interpreter: {program}"),
        None => println!("  [info] No script interpreter; run_gdscript is disabled"),
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
