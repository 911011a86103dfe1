//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

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
    // Transport Errors
    // ─────────────────────────────────────────────────────────────
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A response (or event payload) did not match the expected record shape.
    #[error("Unexpected response shape: {message}")]
    Schema { message: String },

    // ─────────────────────────────────────────────────────────────
    // Client-side Validation
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Realtime Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Realtime connection error: {message}")]
    Realtime { message: String },

    #[error("Realtime protocol error: {message}")]
    Protocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Session Storage Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Session storage error: {message}")]
    Storage { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn realtime(message: impl Into<String>) -> Self {
        Self::Realtime {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if it came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a 401 response; the session has already been cleared.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Network { .. }
                | Error::Http { .. }
                | Error::Validation { .. }
                | Error::Realtime { .. }
                | Error::Protocol { .. }
                | Error::ChannelSend { .. }
        )
    }

    /// Check if this error should trigger application exit
    ///
    /// Only startup problems qualify; every request-level failure stays local
    /// to the operation that triggered it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config { .. } | Error::ConfigNotFound { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
///
/// The context is logged at error level; the error itself is returned
/// unchanged so callers can still match on the original variant.
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
        let err = Error::http(404, "Dish not found");
        assert_eq!(err.to_string(), "HTTP 404: Dish not found");

        let err = Error::validation("name", "must not be empty");
        assert_eq!(err.to_string(), "Invalid name: must not be empty");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_status_only_for_http_errors() {
        assert_eq!(Error::http(500, "boom").status(), Some(500));
        assert_eq!(Error::network("refused").status(), None);
        assert!(Error::http(401, "expired").is_unauthorized());
        assert!(!Error::http(403, "forbidden").is_unauthorized());
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::config("bad url").is_fatal());
        assert!(Error::ConfigNotFound {
            path: PathBuf::from("/etc/waiterdesk/config.toml")
        }
        .is_fatal());
        assert!(!Error::http(401, "expired").is_fatal());
        assert!(!Error::network("timeout").is_fatal());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::network("timeout").is_recoverable());
        assert!(Error::http(503, "unavailable").is_recoverable());
        assert!(Error::realtime("closed").is_recoverable());
        assert!(!Error::ChannelClosed.is_recoverable());
        assert!(!Error::config("bad").is_recoverable());
    }

    #[test]
    fn test_context_returns_original_error() {
        let result: std::result::Result<(), Error> = Err(Error::http(409, "conflict"));
        let err = result.context("Failed to update table").unwrap_err();
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_with_context_converts_foreign_errors() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result
            .with_context(|| "Failed to write session".to_string())
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
