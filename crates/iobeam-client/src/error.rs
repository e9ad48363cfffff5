//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with an unexpected status and a structured error body.
    #[error("Error: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from server.
        code: u64,
        /// Error message from server.
        message: String,
        /// Extra detail from server, often empty.
        details: String,
    },

    /// Server answered with an unexpected status and no usable error body.
    #[error("Unexpected status code {status_line}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Status line, e.g. `404 Not Found`.
        status_line: String,
    },

    /// Response declared a content type we cannot decode.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Response carried a body but no content type.
    #[error("Response has no content type")]
    MissingContentType,

    /// Reading the response body failed.
    #[error("Failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// Token expiry timestamp could not be parsed.
    #[error("Malformed token expiry '{expires}': {source}")]
    MalformedExpiry {
        /// The stored timestamp.
        expires: String,
        source: chrono::ParseError,
    },

    /// Tried to refresh a token that is not project scoped.
    #[error("Cannot refresh a non-project token")]
    NotProjectToken,

    /// Refresh exchange for an expired project token failed.
    #[error("Failed to refresh project token: {source}")]
    Refresh {
        #[source]
        source: Box<Error>,
    },

    /// Reading or writing a cached token failed.
    #[error("Token file '{path}': {source}")]
    TokenFile {
        path: String,
        source: std::io::Error,
    },

    /// Profile storage failed.
    #[error(transparent)]
    Config(#[from] iobeam_config::ConfigError),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Builder(String),
}

impl Error {
    /// The observed HTTP status for a status mismatch, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::UnexpectedStatus { status, .. } => Some(*status),
            Error::Refresh { source } => source.status(),
            _ => None,
        }
    }

    /// Check if the server reported the resource as not found.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if the server rejected our credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by the API: `{"errors":[{"code","message","details"}]}`.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default, alias = "Errors")]
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorEntry {
    #[serde(default, alias = "Code")]
    pub code: u64,
    #[serde(default, alias = "Message")]
    pub message: String,
    #[serde(default, alias = "Details")]
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::Api {
            status: 400,
            code: 7,
            message: "device name taken".into(),
            details: String::new(),
        };
        assert_eq!(err.to_string(), "Error: device name taken");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_unexpected_status_display() {
        let err = Error::UnexpectedStatus {
            status: 204,
            status_line: "204 No Content".into(),
        };
        assert_eq!(err.to_string(), "Unexpected status code 204 No Content");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_refresh_error_keeps_status() {
        let err = Error::Refresh {
            source: Box::new(Error::UnexpectedStatus {
                status: 401,
                status_line: "401 Unauthorized".into(),
            }),
        };
        assert!(err.is_auth_error());
    }
}
