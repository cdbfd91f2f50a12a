//! App data and config directory management for the card demo.

use anyhow::{Context, Result};
use card_bridge::BridgeSettings;
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

pub struct AppDataPaths {
    #[allow(dead_code)]
    pub appdata_dir: PathBuf,
    pub settings_file: PathBuf,
    #[allow(dead_code)]
    pub modules_dir: PathBuf,
}

/// Set up app data directories and write a default bridge config on first
/// run.
pub fn setup_appdata() -> Result<AppDataPaths> {
    let proj_dirs = ProjectDirs::from("com", "CardKit", "CardKit_Demo")
        .context("could not determine app data directory")?;
    let appdata_dir = proj_dirs.data_dir().to_path_buf();
    let config_dir = appdata_dir.join("configs");
    let settings_file = config_dir.join("bridge.json");
    let modules_dir = appdata_dir.join("modules");

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory {config_dir:?}"))?;
    fs::create_dir_all(&modules_dir)
        .with_context(|| format!("creating modules directory {modules_dir:?}"))?;

    // Create default config if not present
    if !settings_file.exists() {
        let mut defaults = BridgeSettings::default();
        defaults.module_dir = modules_dir.clone();
        defaults
            .save(&settings_file)
            .with_context(|| format!("writing default settings to {settings_file:?}"))?;
    }

    Ok(AppDataPaths { appdata_dir, settings_file, modules_dir })
}
