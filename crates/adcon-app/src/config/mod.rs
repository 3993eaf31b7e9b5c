//! Configuration for the Android dev console
//!
//! Everything lives in one state directory:
//! - `config.toml` - Console settings (listen address, tool paths, screen and build options)
//! - `project.json` - Project Configuration edited from the web UI

pub mod project;
pub mod settings;
pub mod types;

pub use project::{load_project_config, save_project_config, update_project_config, PROJECT_FILENAME};
pub use settings::{
    default_state_dir, load_settings, StatePaths, CONFIG_FILENAME,
};
pub use types::*;
