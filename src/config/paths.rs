//! Per-user configuration locations.

use directories::BaseDirs;
use std::path::PathBuf;

/// `$XDG_CONFIG_HOME/sweep`, falling back to the platform config dir.
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("sweep"));
        }
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().join("sweep"))
}

pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}
