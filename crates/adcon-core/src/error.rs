//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// How an error surfaces at the request/connection boundary.
///
/// The front door maps each class onto an HTTP status; live sessions map
/// them onto in-band error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or invalid request parameter (400)
    Validation,
    /// Unknown route or missing resource (404)
    NotFound,
    /// Operation collides with current state (409)
    Conflict,
    /// External tool or internal failure (500)
    Internal,
}

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // External Tool/Process Errors
    // ─────────────────────────────────────────────────────────────
    #[error("{tool} not found. Install the Android SDK platform tools or set it in config.toml.")]
    ToolNotFound { tool: String },

    #[error("Failed to spawn process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Process output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    /// A tool ran but reported failure; the message is the tool's own text.
    #[error("{0}")]
    Upstream(String),

    // ─────────────────────────────────────────────────────────────
    // Request Errors
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    pub fn spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, millis: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis,
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify this error for the request/connection boundary
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Validation(_) | Error::Json(_) => ErrorClass::Validation,
            Error::NotFound(_) => ErrorClass::NotFound,
            Error::Conflict(_) => ErrorClass::Conflict,
            _ => ErrorClass::Internal,
        }
    }

}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::upstream("adb: device offline");
        assert_eq!(err.to_string(), "adb: device offline");

        let err = Error::tool_not_found("adb");
        assert!(err.to_string().starts_with("adb not found"));

        let err = Error::timeout("screencap", 1500);
        assert_eq!(err.to_string(), "screencap timed out after 1500ms");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.class(), ErrorClass::Internal);
    }

    #[test]
    fn test_error_class_mapping() {
        assert_eq!(Error::validation("Missing ?serial=").class(), ErrorClass::Validation);
        assert_eq!(Error::not_found("Artifact not found").class(), ErrorClass::NotFound);
        assert_eq!(Error::conflict("Build already running").class(), ErrorClass::Conflict);
        assert_eq!(Error::upstream("Install failed").class(), ErrorClass::Internal);
        assert_eq!(Error::spawn("permission denied").class(), ErrorClass::Internal);
    }

    #[test]
    fn test_json_errors_are_validation() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{nope")
            .unwrap_err()
            .into();
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_context_preserves_error() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result.context("opening build log").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
