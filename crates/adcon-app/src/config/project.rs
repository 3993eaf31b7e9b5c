//! Project Configuration persistence (`<state>/project.json`)
//!
//! Read-modify-write without locking: concurrent saves race and the last one
//! wins.

use std::path::Path;

use adcon_core::prelude::*;
use serde_json::Value;

use super::types::ProjectConfig;

/// Project file name within the state directory
pub const PROJECT_FILENAME: &str = "project.json";

/// Load the project configuration.
///
/// Missing or unreadable files yield defaults. Fields a stored document
/// lacks take their default; unrecognized fields are ignored.
pub fn load_project_config(state_dir: &Path) -> ProjectConfig {
    let path = state_dir.join(PROJECT_FILENAME);

    if !path.exists() {
        debug!("No project file at {:?}, using defaults", path);
        return ProjectConfig::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(project) => project,
            Err(e) => {
                warn!("Failed to parse {:?}: {}", path, e);
                ProjectConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            ProjectConfig::default()
        }
    }
}

/// Save the project configuration (atomic temp + rename)
pub fn save_project_config(state_dir: &Path, project: &ProjectConfig) -> Result<()> {
    std::fs::create_dir_all(state_dir)
        .map_err(|e| Error::config(format!("Failed to create state dir: {}", e)))?;

    let path = state_dir.join(PROJECT_FILENAME);
    let temp_path = state_dir.join(".project.json.tmp");

    let content = serde_json::to_string_pretty(project)?;
    std::fs::write(&temp_path, content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    debug!("Saved project config to {:?}", path);
    Ok(())
}

/// Load, merge `update` into, and save the project configuration
pub fn update_project_config(state_dir: &Path, update: &Value) -> Result<ProjectConfig> {
    let mut project = load_project_config(state_dir);
    project.apply_update(update);
    save_project_config(state_dir, &project)?;
    info!("Project configuration updated (root: {:?})", project.project_root);
    Ok(project)
}
