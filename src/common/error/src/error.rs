//! Core error types for rowflow.

use thiserror::Error;

/// Result type alias using `FlowError`.
pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// Generic boxed error for external error sources.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for rowflow operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlowError {
    /// A derived column was booked under a name already used by a source
    /// field or another derived column.
    #[error("DuplicateBranchName: branch \"{0}\" already present")]
    DuplicateBranchName(String),

    /// A referenced branch is neither a source field nor a derived column.
    #[error("UnknownBranch: {0}")]
    UnknownBranch(String),

    /// A branch value could not be decoded into the requested type.
    #[error("TypeMismatch: branch \"{branch}\" holds {found}, expected {expected}")]
    TypeMismatch {
        /// Branch that was being read.
        branch: String,
        /// Type requested by the callback.
        expected: String,
        /// Type actually stored in the row.
        found: String,
    },

    /// Callback parameter count does not match the branch list.
    #[error(
        "ArityMismatch: mismatch between number of arguments ({expected}) and number of branches ({found})"
    )]
    ArityMismatch {
        /// Number of parameters the callback takes.
        expected: usize,
        /// Number of branches that were supplied.
        found: usize,
    },

    /// The row source failed while producing rows.
    #[error("SourceReadFailure: {0}")]
    SourceReadFailure(String),

    /// Invalid value provided.
    #[error("ValueError: {0}")]
    ValueError(String),

    /// Failure raised by a user callback or an accumulator.
    #[error("ExecutionError: {0}")]
    ExecutionError(String),

    /// Invalid configuration.
    #[error("ConfigError: {0}")]
    ConfigError(String),

    /// Internal error (bug in rowflow).
    #[error("InternalError: {0}")]
    InternalError(String),

    /// IO error.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// Arrow error.
    #[error("ArrowError: {0}")]
    ArrowError(#[from] arrow_schema::ArrowError),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// External error from third-party libraries.
    #[error("ExternalError: {0}")]
    ExternalError(GenericError),
}

impl FlowError {
    /// Create a new `DuplicateBranchName` error.
    pub fn duplicate_branch<S: Into<String>>(name: S) -> Self {
        Self::DuplicateBranchName(name.into())
    }

    /// Create a new `UnknownBranch` error.
    pub fn unknown_branch<S: Into<String>>(name: S) -> Self {
        Self::UnknownBranch(name.into())
    }

    /// Create a new `TypeMismatch` error.
    pub fn type_mismatch(
        branch: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            branch: branch.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a new `ArityMismatch` error.
    pub const fn arity_mismatch(expected: usize, found: usize) -> Self {
        Self::ArityMismatch { expected, found }
    }

    /// Create a new `SourceReadFailure`.
    pub fn source_read<S: Into<String>>(msg: S) -> Self {
        Self::SourceReadFailure(msg.into())
    }

    /// Create a new `ValueError`.
    pub fn value_error<S: Into<String>>(msg: S) -> Self {
        Self::ValueError(msg.into())
    }

    /// Create a new `ExecutionError`.
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// Create a new `ConfigError`.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new `InternalError`.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    /// Wrap an arbitrary error raised by a user callback.
    pub fn external<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ExternalError(Box::new(err))
    }

    /// Whether the error was raised while booking a node, before any traversal.
    pub const fn is_booking_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateBranchName(_) | Self::ArityMismatch { .. }
        )
    }
}

/// Ensure a condition holds, returning an `ExecutionError` (or the named
/// variant) if not.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::FlowError::$variant(format!($($msg)*)));
        }
    };
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::FlowError::ExecutionError($msg.to_string()));
        }
    };
}

/// Return early with a `ValueError`.
#[macro_export]
macro_rules! value_err {
    ($($arg:tt)*) => {
        return Err($crate::FlowError::ValueError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowError::type_mismatch("x", "Int64", "String");
        assert_eq!(
            err.to_string(),
            "TypeMismatch: branch \"x\" holds String, expected Int64"
        );

        let err = FlowError::duplicate_branch("MET");
        assert_eq!(
            err.to_string(),
            "DuplicateBranchName: branch \"MET\" already present"
        );
    }

    #[test]
    fn test_arity_message() {
        let err = FlowError::arity_mismatch(2, 3);
        assert_eq!(
            err.to_string(),
            "ArityMismatch: mismatch between number of arguments (2) and number of branches (3)"
        );
    }

    #[test]
    fn test_booking_errors() {
        assert!(FlowError::duplicate_branch("a").is_booking_error());
        assert!(FlowError::arity_mismatch(1, 0).is_booking_error());
        assert!(!FlowError::unknown_branch("a").is_booking_error());
        assert!(!FlowError::source_read("eof").is_booking_error());
    }

    fn check_positive(v: i64) -> FlowResult<i64> {
        crate::ensure!(v > 0, ValueError: "expected positive value, got {}", v);
        Ok(v)
    }

    #[test]
    fn test_ensure_macro() {
        assert_eq!(check_positive(3).unwrap(), 3);
        assert!(matches!(check_positive(-1), Err(FlowError::ValueError(_))));
    }
}
