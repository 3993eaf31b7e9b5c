//! Configuration types

use std::net::IpAddr;
use std::time::Duration;

use adcon_daemon::ToolOverrides;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Settings (<state>/config.toml)
// ─────────────────────────────────────────────────────────────────────────────

/// Console settings (`<state>/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub tools: ToolOverrides,

    #[serde(default)]
    pub screen: ScreenSettings,

    #[serde(default)]
    pub build: BuildSettings,
}

/// Listen address
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Screen mirroring defaults
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScreenSettings {
    /// Capture interval when the client does not pass `intervalMs`
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,

    /// Upper bound on one capture command; 0 disables the bound
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            default_interval_ms: default_interval_ms(),
            capture_timeout_ms: default_capture_timeout_ms(),
        }
    }
}

impl ScreenSettings {
    pub fn capture_timeout(&self) -> Option<Duration> {
        (self.capture_timeout_ms > 0).then(|| Duration::from_millis(self.capture_timeout_ms))
    }
}

/// Build process settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildSettings {
    /// Interpreter for the build command, invoked as `<shell> -c <command>`
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            shell: default_shell(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    4242
}

fn default_interval_ms() -> u64 {
    180
}

fn default_capture_timeout_ms() -> u64 {
    10_000
}

fn default_shell() -> String {
    "sh".to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Project Configuration (<state>/project.json)
// ─────────────────────────────────────────────────────────────────────────────

/// The Android project the console builds and installs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    pub project_root: String,
    /// Shell expression run in `project_root`
    pub build_command: String,
    /// Artifact directory, relative to `project_root`
    pub apk_dir: String,
    pub package_name: String,
    /// Launch the package after a successful install
    pub auto_launch: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_root: String::new(),
            build_command: "cd android && ./gradlew assembleDebug".to_string(),
            apk_dir: "android/app/build/outputs/apk/debug".to_string(),
            package_name: String::new(),
            auto_launch: true,
        }
    }
}

impl ProjectConfig {
    /// Whether a build can be started
    pub fn is_buildable(&self) -> bool {
        !self.project_root.is_empty() && !self.build_command.is_empty()
    }

    /// Merge a client update.
    ///
    /// Only recognized fields holding the right JSON type are applied; string
    /// fields are trimmed. Everything else in `update` is ignored.
    pub fn apply_update(&mut self, update: &Value) {
        let text = |key: &str| update.get(key).and_then(Value::as_str).map(|s| s.trim().to_string());

        if let Some(v) = text("projectRoot") {
            self.project_root = v;
        }
        if let Some(v) = text("buildCommand") {
            self.build_command = v;
        }
        if let Some(v) = text("apkDir") {
            self.apk_dir = v;
        }
        if let Some(v) = text("packageName") {
            self.package_name = v;
        }
        if let Some(v) = update.get("autoLaunch").and_then(Value::as_bool) {
            self.auto_launch = v;
        }
    }
}
