//! adcon-app - Session orchestration and persisted state for the Android dev console
//!
//! This crate owns the long-lived pieces behind the front door: the build
//! supervisor singleton and its listener fan-out, screen mirroring sessions,
//! log tail sessions, the artifact scanner, and the settings/project files in
//! the state directory.

pub mod artifacts;
pub mod broadcast;
pub mod build;
pub mod config;
pub mod logcat;
pub mod screen;

// Re-export primary types
pub use artifacts::{find_artifact, list_artifacts, resolve_project_path};
pub use broadcast::Broadcaster;
pub use build::{resolve_outcome, BuildSubscription, BuildSupervisor, CancelOutcome};
pub use config::{ProjectConfig, Settings, StatePaths};
pub use logcat::run_logcat_session;
pub use screen::{
    clamp_interval, next_delay, parse_interval, run_screen_session, AdbScreen, DeviceScreen,
    LocalDeviceScreen, ScreenLease, ScreenOutput, ScreenRegistry,
};
