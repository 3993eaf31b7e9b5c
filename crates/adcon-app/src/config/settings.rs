//! State directory layout and settings file loading

use std::path::{Path, PathBuf};

use adcon_core::prelude::*;

use super::types::Settings;

/// Settings file name within the state directory
pub const CONFIG_FILENAME: &str = "config.toml";

/// Directory name under the platform data dir
const STATE_DIR_NAME: &str = "android-dev-ui";

/// Default state directory: `<data_local_dir>/android-dev-ui`
/// (`~/.local/share/android-dev-ui` on Linux)
pub fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STATE_DIR_NAME)
}

/// Locations of everything the console persists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILENAME)
    }

    pub fn project_file(&self) -> PathBuf {
        self.root.join(super::project::PROJECT_FILENAME)
    }

    /// One `build-<id>.log` per build
    pub fn build_logs_dir(&self) -> PathBuf {
        self.root.join("build-logs")
    }

    /// Console's own rolling log
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Create the state, build-log, and log directories
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.root.clone(), self.build_logs_dir(), self.logs_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                Error::config(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Load settings from `<state>/config.toml`.
///
/// A missing or unparsable file yields defaults.
pub fn load_settings(state_dir: &Path) -> Settings {
    let config_path = state_dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_load_invalid_file_gives_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "[server\nport = ").unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_load_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "[server]\nport = 5000\n\n[tools]\nemulator = \"/opt/emulator\"\n\n[build]\nshell = \"bash\"\n",
        )
        .unwrap();

        let mut expected = Settings::default();
        expected.server.port = 5000;
        expected.tools.emulator = "/opt/emulator".into();
        expected.build.shell = "bash".into();
        assert_eq!(load_settings(dir.path()), expected);
    }

    #[test]
    fn test_state_paths_layout() {
        let dir = tempdir().unwrap();
        let paths = StatePaths::new(dir.path().join("state"));
        paths.ensure().unwrap();

        assert!(paths.build_logs_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
        assert_eq!(paths.project_file(), dir.path().join("state/project.json"));
        assert_eq!(paths.settings_file(), dir.path().join("state/config.toml"));
    }

    #[test]
    fn test_default_state_dir_name() {
        assert!(default_state_dir().ends_with("android-dev-ui"));
    }
}
