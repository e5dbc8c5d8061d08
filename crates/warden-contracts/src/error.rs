//! Runtime error types for the WARDEN trust core.
//!
//! All fallible operations return `WardenResult<T>`.  Authorization denials
//! are not errors; they are `AuthDecision` values.

use thiserror::Error;

/// The unified error type for the WARDEN crates.
#[derive(Debug, Error)]
pub enum WardenError {
    /// The audit chain failed verification at `sequence`.
    ///
    /// Never repaired automatically.  The process keeps serving; integrity
    /// status is reported to operators.
    #[error("audit chain integrity violation at sequence {sequence}: {reason}")]
    IntegrityViolation { sequence: u64, reason: String },

    /// No routing tier matched and no default agent is configured.
    #[error("no route for channel '{channel}' and no default agent configured")]
    UnresolvedRoute { channel: String },

    /// The persistence collaborator failed to append or iterate entries.
    #[error("audit persistence failed: {reason}")]
    PersistenceFailure { reason: String },

    /// A grant-store lookup failed.
    #[error("grant store failure: {reason}")]
    GrantStoreFailure { reason: String },

    /// A tool ran after authorization and reported a failure.
    #[error("tool '{tool}' failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The framed transport could not read or write a message.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// A request was well framed but its parameters were unusable.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A frame body was not valid JSON.
    #[error("parse error: {reason}")]
    ParseError { reason: String },

    /// A frame body was valid JSON but not a JSON-RPC request object.
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// A lifecycle operation was called out of order.
    #[error("lifecycle error: {reason}")]
    Lifecycle { reason: String },
}

impl WardenError {
    /// JSON-RPC error code reported for this error.
    pub fn rpc_code(&self) -> i64 {
        match self {
            WardenError::UnresolvedRoute { .. } => -32001,
            WardenError::PersistenceFailure { .. } => -32002,
            WardenError::IntegrityViolation { .. } => -32003,
            WardenError::InvalidRequest { .. } => crate::rpc::INVALID_PARAMS,
            WardenError::ParseError { .. } => crate::rpc::PARSE_ERROR,
            WardenError::MalformedRequest { .. } => crate::rpc::INVALID_REQUEST,
            WardenError::GrantStoreFailure { .. }
            | WardenError::ToolFailed { .. }
            | WardenError::ConfigError { .. }
            | WardenError::Transport { .. }
            | WardenError::Lifecycle { .. } => -32000,
        }
    }
}

/// Convenience alias used throughout the WARDEN crates.
pub type WardenResult<T> = Result<T, WardenError>;
