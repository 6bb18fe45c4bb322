//! `gdpilot config`: configuration management commands.

use gdpilot_config::AppConfig;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.api_key.is_some() {
        config.api_key = Some("***".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

pub fn get(key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    match config.get(key)? {
        Some(value) if key == "api_key" => println!("{}", redact(&value)),
        Some(value) => println!("{value}"),
        None => println!("(unset)"),
    }
    Ok(())
}

/// Edits the file itself, so environment overrides never get persisted.
pub fn set(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();
    let mut config = AppConfig::load_from(&path)?;
    config.set(key, value)?;
    config.save_to(&path)?;
    println!("  {key} updated in {}", path.display());
    Ok(())
}

pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();
    if path.exists() {
        println!("  Config already exists at: {}", path.display());
        println!("  Edit it manually or use `gdpilot config set`.");
        return Ok(());
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("  Created config at: {}", path.display());
    println!();
    println!("  Next steps:");
    println!("    1. gdpilot config set api_key <key>");
    println!("    2. gdpilot config set project.root <path to your Godot project>");
    println!("    3. gdpilot chat");
    Ok(())
}

/// Keep only the last four characters of a secret.
fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "***".into();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_path();
        assert!(path.to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn redacts_all_but_the_tail() {
        assert_eq!(redact("sk-abcdef1234"), "***1234");
        assert_eq!(redact("abc"), "***");
    }
}
