//! `gdpilot tools`: list the tool catalogue sent with every request.

use gdpilot_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let host = gdpilot_host::context_from_config(&config)?;
    let registry = gdpilot_tools::default_registry(&host)?;

    println!("  {} tools available", registry.len());
    println!();
    for def in registry.definitions() {
        println!("  {}", def.name);
        println!("    {}", def.description);
        let params = serde_json::to_string_pretty(&def.parameters)?;
        for line in params.lines() {
            println!("    {line}");
        }
        println!();
    }
    Ok(())
}
