//! # adcon-daemon - External Tool and Process Management
//!
//! Everything that executes an Android SDK tool or a build command lives
//! here: one-shot invocations with captured output, long-running supervised
//! processes, and the parsers for their output.
//!
//! Depends on [`adcon_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Invocation
//! - [`run()`] - Run a command to completion with capped output and optional timeout
//! - [`CommandOutput`] - Uniform `{status, stdout, stderr, error}` result
//! - [`SupervisedProcess`] - Long-running child with streamed output and graceful stop
//!
//! ### Tools
//! - [`AndroidTools`] - Resolved `adb` / `emulator` / `avdmanager` paths
//! - [`Adb`] - Device bridge wrapper (`-s <serial>` targeting)
//!
//! ### Devices and Emulators
//! - [`list_devices()`], [`parse_adb_devices()`] - Connected devices
//! - [`list_avds()`] - Configured virtual devices
//! - [`launch_emulator()`], [`kill_emulator()`], [`set_network_profile()`]
//! - [`DeviceAction`] - Stateless settings, key, and app commands
//!
//! ### Sessions
//! - [`capture_png()`], [`inject_input()`] - Screen mirroring primitives
//! - [`spawn_logcat()`] - Device log tail
//! - [`spawn_build()`] - Shell-interpreted build command in its own process group

pub mod actions;
pub mod adb;
pub mod avds;
pub mod build;
pub mod devices;
pub mod emulator;
pub mod logcat;
pub mod process;
pub mod runner;
pub mod screen;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod tools;

// Public API re-exports
pub use actions::{DeviceAction, KeyAction};
pub use adb::Adb;
pub use avds::{list_avds, parse_avd_list, parse_avd_names};
pub use build::spawn_build;
pub use devices::{list_devices, parse_adb_devices};
pub use emulator::{kill_emulator, launch_args, launch_emulator, set_network_profile, LaunchOptions};
pub use logcat::spawn_logcat;
pub use process::{ProcessGroup, StopSignal, SupervisedProcess, Utf8ChunkDecoder};
pub use runner::{run, CommandOutput, RunOptions, BINARY_OUTPUT_LIMIT, TEXT_OUTPUT_LIMIT};
pub use screen::{capture_png, inject_input};
pub use tools::{AndroidTools, ToolOverrides};
