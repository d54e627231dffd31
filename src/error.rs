//! Error types for the bridge
//!
//! Session-fatal failures all funnel into [`BridgeError`] so the reconnect
//! supervisor is the single place that decides what happens next.

use crate::config::ConfigError;
use crate::source::SourceError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Source read failed: {0}")]
    SourceError(#[from] SourceError),

    #[error("File watcher error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Transport error: {0}")]
    TransportError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Broker connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl BridgeError {
    /// Wrap any transport-specific error
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TransportError(Box::new(error))
    }

    /// Create connection lost error
    pub fn connection_lost<S: Into<String>>(reason: S) -> Self {
        Self::ConnectionLost {
            reason: reason.into(),
        }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Error text safe to expose on the health endpoint
    pub fn health_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

const MAX_MESSAGE_LEN: usize = 500;

/// Redact credential-looking fragments and cap the length
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(truncate_suffix);
    }

    sanitized
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
