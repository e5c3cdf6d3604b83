//! Error types for the SQL MCP Server.
//!
//! Two layers, both built with `thiserror`:
//! - [`DbError`] is what a tool handler fails with (connection, query,
//!   encoding, file system, permission, timeout).
//! - [`DispatchError`] is what the dispatcher reports back to the caller. It
//!   adds the failures detected before a handler runs (unknown tool, invalid
//!   arguments) and wraps every handler failure.
//!
//! Each variant carries a message written for the calling assistant, plus an
//! optional suggestion on how to recover.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Permission denied: {operation} - {reason}")]
    Permission { operation: String, reason: String },

    #[error("Encoding failed: {message}")]
    Encoding { message: String },

    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn permission(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a file system error for the given path.
    pub fn io(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The kind reported to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::ConnectionError,
            Self::Query { .. } => ErrorKind::QueryError,
            Self::Permission { .. } => ErrorKind::PermissionDenied,
            Self::Encoding { .. } => ErrorKind::EncodingError,
            Self::Io { .. } => ErrorKind::IoError,
            Self::Timeout { .. } => ErrorKind::TimeoutError,
            Self::Internal { .. } => ErrorKind::InternalError,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Query { suggestion, .. } => Some(suggestion),
            Self::Permission { .. } => Some(
                "Only read-only statements are accepted. Reconnect with ?writable=true to allow writes.",
            ),
            Self::Timeout { .. } => {
                Some("Consider increasing --call-timeout or optimizing the statement")
            }
            _ => None,
        }
    }

    /// Check if reissuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert sqlx errors raised while a statement runs.
///
/// Failures while opening a connection are mapped by the gateway itself so
/// that authentication errors surface as connection errors, not query errors.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::query(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::query(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::query(
                format!("Type not found: {}", type_name),
                None,
                "Check the types referenced by the statement",
            ),
            sqlx::Error::ColumnNotFound(col) => DbError::query(
                format!("Column not found: {}", col),
                None,
                "Check the column names referenced by the statement",
            ),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::encoding(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::encoding(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for handler operations.
pub type DbResult<T> = Result<T, DbError>;

/// Error kinds visible to the calling side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnknownTool,
    InvalidArguments,
    ConnectionError,
    QueryError,
    EncodingError,
    #[serde(rename = "IOError")]
    IoError,
    TimeoutError,
    PermissionDenied,
    InternalError,
}

/// Where a failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    /// The request named a tool that is not registered.
    UnknownTool,
    /// The arguments did not match the tool's parameter list.
    InvalidArguments,
    /// The handler ran and failed.
    HandlerFailure,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown tool: '{name}'")]
    UnknownTool { name: String },

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{source}")]
    HandlerFailure {
        tool: String,
        #[source]
        source: DbError,
    },
}

impl DispatchError {
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    pub fn invalid_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn handler_failure(tool: impl Into<String>, source: DbError) -> Self {
        Self::HandlerFailure {
            tool: tool.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool { .. } => ErrorKind::UnknownTool,
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::HandlerFailure { source, .. } => source.kind(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownTool { .. } => ErrorCategory::UnknownTool,
            Self::InvalidArguments { .. } => ErrorCategory::InvalidArguments,
            Self::HandlerFailure { .. } => ErrorCategory::HandlerFailure,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::UnknownTool { .. } => Some("Call tools/list to see the available tools"),
            Self::InvalidArguments { .. } => {
                Some("Check the tool's input schema for required parameters")
            }
            Self::HandlerFailure { source, .. } => source.suggestion(),
        }
    }
}
