use std::path::Path;

use serde::{Deserialize, Serialize};

/// Persisted UI state: which scenarios the user left enabled.
/// Load is silent-default, save is best-effort; a missing or corrupt
/// settings file just means everything starts from catalog defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    pub enabled_scenarios: Vec<String>,
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = std::fs::write(path, json);
        }
    }
}
