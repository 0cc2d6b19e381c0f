//! Tree and driver error types.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// I/O error.
    Io = 0x0004,

    // Tree errors (0x0100 - 0x01FF)
    /// Reference or target node is absent.
    NotFound = 0x0100,
    /// Structurally impossible operation.
    InvalidOperation = 0x0101,
    /// Mutation attempted outside an open write scope.
    InvalidUpdate = 0x0102,
    /// Nested-set invariant violated.
    VerifyFailed = 0x0103,

    // Driver errors (0x0200 - 0x02FF)
    /// Driver is not open.
    NotConnected = 0x0200,
    /// Driver failed to execute a statement.
    DriverFailed = 0x0201,
    /// Table not found.
    TableNotFound = 0x0202,
    /// Column not found.
    ColumnNotFound = 0x0203,
    /// Type mismatch.
    TypeMismatch = 0x0204,

    // Configuration errors (0x0300 - 0x03FF)
    /// Invalid configuration.
    InvalidConfig = 0x0300,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Tree",
            0x02 => "Driver",
            0x03 => "Config",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for canopy.
///
/// Tree operations either return their declared result or fail with one
/// of these variants; nothing is retried internally.
///
/// # Example
///
/// ```rust
/// use canopy_common::error::{CanopyError, CanopyResult, ErrorCode};
///
/// fn find(id: i64) -> CanopyResult<()> {
///     Err(CanopyError::not_found(format!("node {}", id)))
/// }
///
/// assert_eq!(find(3).unwrap_err().code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Error)]
pub enum CanopyError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    // ==========================================================================
    // Tree Errors
    // ==========================================================================
    /// Reference or target node is absent.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// Structurally impossible move or position.
    #[error("invalid operation: {reason}")]
    InvalidOperation {
        /// Why the operation is impossible.
        reason: String,
    },

    /// Mutating call outside an open write scope, or while another write
    /// scope is active.
    #[error("invalid update: {reason}")]
    InvalidUpdate {
        /// Why the update was refused.
        reason: String,
    },

    /// Nested-set invariant violation found by the verifier.
    #[error("tree verification failed at node {node}: {reason}")]
    Verify {
        /// Id of the offending node.
        node: String,
        /// Violated invariant.
        reason: String,
    },

    // ==========================================================================
    // Driver Errors
    // ==========================================================================
    /// The storage driver is not open.
    #[error("storage driver is not connected")]
    NotConnected,

    /// The storage driver failed.
    #[error("storage driver error: {reason}")]
    Driver {
        /// Reason for failure.
        reason: String,
    },

    /// Table not found.
    #[error("table '{table}' not found")]
    TableNotFound {
        /// The missing table.
        table: String,
    },

    /// Column not found.
    #[error("column '{column}' not found")]
    ColumnNotFound {
        /// The missing column.
        column: String,
    },

    /// Type mismatch.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

impl CanopyError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::Io { .. } => ErrorCode::Io,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidOperation { .. } => ErrorCode::InvalidOperation,
            Self::InvalidUpdate { .. } => ErrorCode::InvalidUpdate,
            Self::Verify { .. } => ErrorCode::VerifyFailed,
            Self::NotConnected => ErrorCode::NotConnected,
            Self::Driver { .. } => ErrorCode::DriverFailed,
            Self::TableNotFound { .. } => ErrorCode::TableNotFound,
            Self::ColumnNotFound { .. } => ErrorCode::ColumnNotFound,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// Returns true if this error is retryable by the caller.
    ///
    /// Only driver connectivity problems qualify. A failed mutation has
    /// applied nothing, so the caller may run it again after reconnecting.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotConnected)
    }

    /// Returns true if this error came from the storage driver.
    #[must_use]
    pub const fn is_driver_error(&self) -> bool {
        matches!(self.code().as_u16() >> 8, 0x02)
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates an invalid operation error.
    #[must_use]
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Creates an invalid update error.
    #[must_use]
    pub fn invalid_update(reason: impl Into<String>) -> Self {
        Self::InvalidUpdate {
            reason: reason.into(),
        }
    }

    /// Creates a verification error.
    #[must_use]
    pub fn verify(node: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::Verify {
            node: node.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a driver error.
    #[must_use]
    pub fn driver(reason: impl Into<String>) -> Self {
        Self::Driver {
            reason: reason.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = CanopyError::not_found("node 42");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.code().category(), "Tree");
        assert_eq!(CanopyError::NotConnected.code().category(), "Driver");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(CanopyError::not_found("node 42").to_string(), "node 42 not found");
        assert_eq!(
            CanopyError::verify(7, "even width").to_string(),
            "tree verification failed at node 7: even width"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(CanopyError::NotConnected.is_retryable());
        assert!(!CanopyError::invalid_update("busy").is_retryable());
        assert!(!CanopyError::driver("boom").is_retryable());
    }

    #[test]
    fn test_driver_family() {
        assert!(CanopyError::driver("boom").is_driver_error());
        assert!(CanopyError::TableNotFound {
            table: "tree".to_string()
        }
        .is_driver_error());
        assert!(!CanopyError::invalid_operation("cycle").is_driver_error());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CanopyError = io_err.into();
        assert_eq!(err.code(), ErrorCode::Io);
    }
}
