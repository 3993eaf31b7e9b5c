//! # adcon-core - Core Domain Types
//!
//! Foundation crate for the Android dev console. Provides domain types, wire
//! events, error handling, and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`Device`], [`DeviceState`] - One row of the device bridge listing
//! - [`BuildStatus`], [`BuildSession`] - Build lifecycle snapshot
//! - [`Artifact`] - An installable package found on disk
//!
//! ### Events (`events`)
//! - [`ProcessEvent`] - Output/exit events from a supervised child process
//! - [`SessionMessage`] - JSON messages pushed over WebSocket
//! - [`InputEvent`] - Tap/swipe input from a mirroring client
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with request-boundary classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! ```rust
//! use adcon_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all adcon crates
pub mod prelude {
    pub use super::error::{Error, ErrorClass, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{Error, ErrorClass, Result, ResultExt};
pub use events::{
    encode_frame, InputEvent, ProcessEvent, SessionMessage, DEFAULT_SWIPE_MS, FRAME_TAG_PNG,
};
pub use types::{Artifact, BuildSession, BuildStatus, Device, DeviceState};

/// Current wall-clock time as Unix epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
