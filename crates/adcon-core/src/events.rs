//! Events flowing between subprocesses, sessions, and connected clients
//!
//! Three families live here:
//! - [`ProcessEvent`]: what a supervised child process reports (output chunks, exit)
//! - [`SessionMessage`]: JSON text messages pushed to WebSocket clients
//! - [`InputEvent`]: touch input sent by a screen-mirroring client
//!
//! Binary screen frames are `[tag][payload]`; byte 0 is always a discriminator
//! so new payload kinds can be added without breaking existing clients.

use serde::Serialize;
use serde_json::Value;

use crate::types::BuildStatus;

/// Tag byte for a PNG screen frame
pub const FRAME_TAG_PNG: u8 = 0x01;

/// Default swipe duration when the client omits `ms`
pub const DEFAULT_SWIPE_MS: u32 = 250;

/// Prepend a tag byte to a frame payload
pub fn encode_frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(tag);
    out.extend_from_slice(payload);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Process events
// ─────────────────────────────────────────────────────────────────────────────

/// Event reported by a supervised child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A chunk of combined stdout/stderr, decoded as UTF-8.
    /// Chunk boundaries are arbitrary and may split lines.
    Output(String),

    /// The process exited. `code` is `None` when it was terminated by a signal.
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },

    /// The process could not be started
    SpawnFailed { reason: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound session messages
// ─────────────────────────────────────────────────────────────────────────────

/// JSON text message sent to a WebSocket client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionMessage {
    Log { text: String },
    State { status: BuildStatus },
    Error { error: String },
}

impl SessionMessage {
    pub fn log(text: impl Into<String>) -> Self {
        Self::Log { text: text.into() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Serialize to the wire representation
    pub fn to_json(&self) -> String {
        // Every variant holds only strings and a unit enum.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound input events
// ─────────────────────────────────────────────────────────────────────────────

/// Touch input against the mirrored surface, in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Tap {
        x: u32,
        y: u32,
    },
    Swipe {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: u32,
    },
}

impl InputEvent {
    /// Parse a client text message.
    ///
    /// Returns `None` for malformed JSON, unknown `type`, or any missing or
    /// non-numeric coordinate. Client mistakes are never surfaced as errors.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        match value.get("type")?.as_str()? {
            "tap" => Some(InputEvent::Tap {
                x: coord(&value, "x")?,
                y: coord(&value, "y")?,
            }),
            "swipe" => {
                let duration_ms = match value.get("ms") {
                    None | Some(Value::Null) => DEFAULT_SWIPE_MS,
                    Some(v) => coerce(v)?.max(1),
                };
                Some(InputEvent::Swipe {
                    x1: coord(&value, "x1")?,
                    y1: coord(&value, "y1")?,
                    x2: coord(&value, "x2")?,
                    y2: coord(&value, "y2")?,
                    duration_ms,
                })
            }
            _ => None,
        }
    }

    /// Arguments for `input` on the device shell
    pub fn shell_args(&self) -> Vec<String> {
        match *self {
            InputEvent::Tap { x, y } => vec![
                "input".into(),
                "tap".into(),
                x.to_string(),
                y.to_string(),
            ],
            InputEvent::Swipe {
                x1,
                y1,
                x2,
                y2,
                duration_ms,
            } => vec![
                "input".into(),
                "swipe".into(),
                x1.to_string(),
                y1.to_string(),
                x2.to_string(),
                y2.to_string(),
                duration_ms.to_string(),
            ],
        }
    }
}

fn coord(value: &Value, key: &str) -> Option<u32> {
    coerce(value.get(key)?)
}

/// Floor a JSON number (or numeric string) to a non-negative integer
fn coerce(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    // `as` saturates, so huge values land on u32::MAX
    Some(n.floor().max(0.0) as u32)
}
