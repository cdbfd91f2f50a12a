//! Bridge tunables, persisted as JSON alongside the host's other config.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::session::CardRect;

/// Tunables for the native surface bridge.
///
/// Unknown or missing fields fall back to their defaults, so an old config
/// file keeps working after an upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Explicit module paths tried before any discovery. Highest priority.
    pub module_paths: Vec<PathBuf>,

    /// Directory scanned for the native module, and the base of the
    /// conventional module path.
    pub module_dir: PathBuf,

    /// How many times the native message pump runs per tick on the platform
    /// that needs explicit pumping. The embedded control was observed to
    /// stay responsive at 5 and to stall below it; the value is empirical,
    /// not derived. Clamped to a minimum of 1 at use.
    pub pump_repeats: u32,

    /// Placement used when the host does not supply a geometry. Defaults to
    /// a portrait card roughly the size of a large phone screen.
    pub default_geometry: CardRect,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            module_paths: Vec::new(),
            module_dir: PathBuf::from("modules"),
            pump_repeats: 5,
            default_geometry: CardRect::new(120.0, 80.0, 390.0, 844.0),
        }
    }
}

impl BridgeSettings {
    /// Read settings from `path`, falling back to defaults when the file is
    /// missing or unreadable. A malformed file is reported but never fatal.
    pub fn load_or_default(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("ignoring malformed bridge settings at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Write the settings as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }
}
