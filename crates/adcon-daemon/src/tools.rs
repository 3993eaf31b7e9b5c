//! Android SDK tool resolution
//!
//! Finds `adb`, `emulator`, and `avdmanager`. An explicit path from the
//! settings file always wins; otherwise the SDK locations named by
//! `ANDROID_HOME` / `ANDROID_SDK_ROOT` are probed, then `PATH`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adb::Adb;

/// User-provided tool paths (empty string = auto-detect)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolOverrides {
    pub adb: String,
    pub emulator: String,
    pub avdmanager: String,
}

/// Resolved tool paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidTools {
    pub adb: String,
    pub emulator: String,
    pub avdmanager: String,
}

impl Default for AndroidTools {
    fn default() -> Self {
        Self {
            adb: "adb".to_string(),
            emulator: "emulator".to_string(),
            avdmanager: "avdmanager".to_string(),
        }
    }
}

impl AndroidTools {
    /// Resolve every tool (run once at startup)
    pub fn resolve(overrides: &ToolOverrides) -> Self {
        let sdk_roots = sdk_roots();
        let tools = Self {
            adb: resolve_tool("adb", &overrides.adb, &sdk_roots),
            emulator: resolve_tool("emulator", &overrides.emulator, &sdk_roots),
            avdmanager: resolve_tool("avdmanager", &overrides.avdmanager, &sdk_roots),
        };
        tracing::info!(
            "Using adb={} emulator={} avdmanager={}",
            tools.adb,
            tools.emulator,
            tools.avdmanager
        );
        tools
    }

    pub fn adb(&self) -> Adb {
        Adb::new(self.adb.clone())
    }
}

/// SDK directories from the environment, in priority order
fn sdk_roots() -> Vec<PathBuf> {
    ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Locations of `tool` inside an SDK root
fn sdk_subpaths(tool: &str) -> &'static [&'static str] {
    match tool {
        "adb" => &["platform-tools/adb"],
        "emulator" => &["emulator/emulator"],
        "avdmanager" => &["cmdline-tools/latest/bin/avdmanager", "tools/bin/avdmanager"],
        _ => &[],
    }
}

/// Candidate paths for `tool`, in the order they are tried
fn candidate_paths(tool: &str, sdk_roots: &[PathBuf]) -> Vec<PathBuf> {
    sdk_roots
        .iter()
        .flat_map(|root| sdk_subpaths(tool).iter().map(move |sub| root.join(sub)))
        .collect()
}

fn resolve_tool(tool: &str, configured: &str, sdk_roots: &[PathBuf]) -> String {
    let configured = configured.trim();
    if !configured.is_empty() {
        return configured.to_string();
    }

    for candidate in candidate_paths(tool, sdk_roots) {
        if is_file(&candidate) {
            return candidate.to_string_lossy().into_owned();
        }
    }

    match which::which(tool) {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::debug!("{} not found on PATH: {}", tool, e);
            tool.to_string()
        }
    }
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}
