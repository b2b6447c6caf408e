//! Error types for the web service client.

use thiserror::Error;
use vbx_protocol::wire::result_codes;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the runtime and the typed client built on it.
///
/// Remote faults keep the operation name and the COM result code the
/// service reported, so callers can branch on the code without string
/// matching the message.
#[derive(Debug, Error)]
pub enum Error {
    /// The service rejected the logon credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A lookup by name or ID had no match on the service side.
    #[error("not found: {0}")]
    NotFound(String),

    /// A locally checked precondition failed; no request was sent.
    #[error("{0}")]
    Precondition(String),

    /// The service answered the operation with a SOAP fault.
    #[error("{operation} failed: {message}")]
    RemoteCall {
        operation: String,
        /// Normalized COM result code from the fault detail, when present.
        code: Option<String>,
        message: String,
    },

    /// HTTP or I/O failure before a response body could be read.
    #[error("transport failure in {operation}: {message}")]
    Transport { operation: String, message: String },

    /// The response body did not hold the shape the operation requires.
    #[error("malformed envelope in {operation}: {message}")]
    Envelope { operation: String, message: String },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn transport(operation: &str, message: impl std::fmt::Display) -> Self {
        Error::Transport {
            operation: operation.to_owned(),
            message: message.to_string(),
        }
    }

    pub fn envelope(operation: &str, message: impl std::fmt::Display) -> Self {
        Error::Envelope {
            operation: operation.to_owned(),
            message: message.to_string(),
        }
    }

    /// Result code of the underlying fault, when the service supplied one.
    pub fn result_code(&self) -> Option<&str> {
        match self {
            Error::RemoteCall { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// True when a fault carries the "object not found" result code.
    pub fn is_object_not_found(&self) -> bool {
        self.result_code() == Some(result_codes::OBJECT_NOT_FOUND)
    }
}
