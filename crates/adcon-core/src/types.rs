//! Domain types shared by every layer

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Devices
// ─────────────────────────────────────────────────────────────────────────────

/// Connection state reported by the device bridge for one serial
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceState {
    /// Online and authorized
    Device,
    Offline,
    Unauthorized,
    /// Booting / recovery / sideload and other transient states
    Other(String),
    Unknown,
}

impl DeviceState {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Device => "device",
            DeviceState::Offline => "offline",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Other(s) => s,
            DeviceState::Unknown => "unknown",
        }
    }

    /// Whether commands can be issued to a device in this state
    pub fn is_online(&self) -> bool {
        matches!(self, DeviceState::Device)
    }
}

impl From<&str> for DeviceState {
    fn from(s: &str) -> Self {
        match s {
            "device" => DeviceState::Device,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            "" | "unknown" => DeviceState::Unknown,
            other => DeviceState::Other(other.to_string()),
        }
    }
}

impl From<String> for DeviceState {
    fn from(s: String) -> Self {
        DeviceState::from(s.as_str())
    }
}

impl From<DeviceState> for String {
    fn from(state: DeviceState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the device bridge listing.
///
/// Reconstructed on every query; the serial is the only identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub serial: String,
    pub state: DeviceState,
    /// Remainder of the listing row (`product:… model:… transport_id:…`)
    pub extras: String,
}

impl Device {
    pub fn is_emulator(&self) -> bool {
        self.serial.starts_with("emulator-")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Build Session
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of the process-wide build session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    #[default]
    Idle,
    Running,
    Cancelling,
    Success,
    Failed,
    Cancelled,
}

impl BuildStatus {
    /// A build subprocess is (or may still be) alive
    pub fn is_active(self) -> bool {
        matches!(self, BuildStatus::Running | BuildStatus::Cancelling)
    }

    /// The build reached an outcome
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildStatus::Success | BuildStatus::Failed | BuildStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Idle => "idle",
            BuildStatus::Running => "running",
            BuildStatus::Cancelling => "cancelling",
            BuildStatus::Success => "success",
            BuildStatus::Failed => "failed",
            BuildStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the build session.
///
/// Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSession {
    pub status: BuildStatus,
    pub id: Option<String>,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub exit_code: Option<i32>,
    pub log_file: Option<PathBuf>,
    pub error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Artifacts
// ─────────────────────────────────────────────────────────────────────────────

/// An installable package found in the configured output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub name: String,
    /// Absolute path; never sent to clients
    #[serde(skip)]
    pub path: PathBuf,
    pub size: u64,
    pub mtime_ms: i64,
}
