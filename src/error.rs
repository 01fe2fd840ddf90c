//! Error types for the FogBugz MCP server

use thiserror::Error;

/// Result type alias for FogBugz operations
pub type Result<T> = std::result::Result<T, FogbugzError>;

/// Main error type for the FogBugz adapter
#[derive(Error, Debug)]
pub enum FogbugzError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse FogBugz XML (status {status}). Snippet: {snippet}")]
    Parse { status: u16, snippet: String },

    #[error("Invalid FogBugz response (status {status}). Snippet: {snippet}")]
    InvalidResponse { status: u16, snippet: String },

    #[error("{message}")]
    Api { code: i64, message: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FogbugzError {
    /// Shorthand for a validation failure raised before any network call
    pub fn invalid(message: impl Into<String>) -> Self {
        FogbugzError::InvalidInput(message.into())
    }

    /// True when the error was raised locally, before contacting FogBugz
    pub fn is_validation(&self) -> bool {
        matches!(self, FogbugzError::InvalidInput(_))
    }

    /// Get error code for MCP protocol
    pub fn code(&self) -> i64 {
        match self {
            FogbugzError::Api { code, .. } => *code,
            FogbugzError::InvalidInput(_) => -32602,
            FogbugzError::Parse { .. } | FogbugzError::InvalidResponse { .. } => -32002,
            FogbugzError::Config(_) => -32003,
            _ => -32000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_remote_code() {
        let err = FogbugzError::Api {
            code: 3,
            message: "Not logged in".to_string(),
        };
        assert_eq!(err.code(), 3);
        assert_eq!(err.to_string(), "Not logged in");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_parse_error_message_includes_status() {
        let err = FogbugzError::Parse {
            status: 502,
            snippet: "<html>".to_string(),
        };
        assert!(err.to_string().contains("status 502"));
        assert!(err.to_string().contains("<html>"));
    }

    #[test]
    fn test_validation_errors() {
        let err = FogbugzError::invalid("ixProject must be positive");
        assert!(err.is_validation());
        assert_eq!(err.code(), -32602);
    }
}
