//! Error types for the MCP server.
//!
//! Aggregates path, schema, validation and store failures into MCP-friendly
//! error responses.

use crate::path::PathSyntaxError;
use crate::schema::{SchemaConfigError, ValidationError};
use crate::store::StoreError;

/// MCP server errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum McpError {
    /// Malformed path string.
    #[error(transparent)]
    PathSyntax(#[from] PathSyntaxError),

    /// The dataset's manifest set cannot be compiled.
    #[error("schema error: {0}")]
    SchemaConfig(#[from] SchemaConfigError),

    /// A document does not match its type.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A revision-guarded patch found the document at another revision.
    #[error(
        "revision conflict on document '{id}': expected revision '{expected}', found '{}'",
        .actual.as_deref().unwrap_or("none")
    )]
    ConcurrencyConflict {
        /// Document id
        id: String,
        /// Revision the caller expected
        expected: String,
        /// Revision the store holds, if the document exists
        actual: Option<String>,
    },

    /// Error from the document store.
    #[error("store error during {operation}: {message}")]
    Store {
        /// Logical operation that failed
        operation: String,
        /// The error code from the store
        code: String,
        /// Human-readable error message
        message: String,
    },

    /// Unknown tool requested.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArg(String),

    /// Invalid argument value.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArg {
        /// Argument name
        name: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// A write was attempted on a read-only session.
    #[error("session is read-only: {0} rejected")]
    ReadOnly(String),

    /// JSON-RPC protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Wrap a store failure with the operation that triggered it.
    ///
    /// Revision mismatches become [`McpError::ConcurrencyConflict`] so callers
    /// can re-read and retry.
    pub fn store(operation: &str, err: StoreError) -> Self {
        match err {
            StoreError::RevisionMismatch {
                id,
                expected,
                actual,
            } => McpError::ConcurrencyConflict {
                id,
                expected,
                actual,
            },
            other => McpError::Store {
                operation: operation.to_string(),
                code: other.code().to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        McpError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::Protocol(format!("JSON error: {}", err))
    }
}

/// JSON-RPC error codes.
pub mod rpc_codes {
    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl McpError {
    /// Convert to JSON-RPC error code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            McpError::UnknownTool(_) => rpc_codes::METHOD_NOT_FOUND,
            McpError::MissingArg(_)
            | McpError::InvalidArg { .. }
            | McpError::PathSyntax(_)
            | McpError::SchemaConfig(_)
            | McpError::Validation(_)
            | McpError::ConcurrencyConflict { .. }
            | McpError::ReadOnly(_) => rpc_codes::INVALID_PARAMS,
            McpError::Protocol(_) => rpc_codes::INVALID_REQUEST,
            McpError::Store { code, .. } => {
                // Map store errors to appropriate RPC codes
                match code.as_str() {
                    "NOT_FOUND" | "ALREADY_EXISTS" | "INVALID_QUERY" | "REJECTED" => {
                        rpc_codes::INVALID_PARAMS
                    }
                    _ => rpc_codes::INTERNAL_ERROR,
                }
            }
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;
