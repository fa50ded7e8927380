//! Unified error type for configuration merging
//!
//! Every structural or data error raised while applying a delta is returned to the
//! immediate caller (the transport/decoding layer). The core never retries; whether
//! to request a fresh full resync is the transport's decision.

use crate::identifiers::{RecordId, TargetIndex};
use serde::{Deserialize, Serialize};

/// Configuration merge errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ConfigError {
    /// Identifier already bound to another live record
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(RecordId),

    /// Identifier not present in the registry
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(RecordId),

    /// Partial delta addressed a record that is not currently registered
    #[error("Unresolved delta target: {0}")]
    UnresolvedTarget(TargetIndex),

    /// Decoded value disagrees with the declared schema
    #[error("Schema mismatch at {path}: expected {expected}, found {found}")]
    SchemaMismatch {
        /// Field path from the delta target, e.g. `tags[2].name`
        path: String,
        /// Declared type
        expected: String,
        /// Shape actually received
        found: String,
    },

    /// Operation is well-typed but cannot be applied to the current tree
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Error message describing the rejected operation
        message: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Create a schema mismatch error
    pub fn schema_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, one per variant
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateIdentifier(_) => "duplicate_identifier",
            Self::UnknownIdentifier(_) => "unknown_identifier",
            Self::UnresolvedTarget(_) => "unresolved_target",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::InvalidOperation { .. } => "invalid_operation",
        }
    }

    /// Whether a full resync is the natural recovery for this error
    ///
    /// Unresolved targets and unknown identifiers mean the client view has already
    /// drifted from the server's; schema and operation errors point at a decoding
    /// bug upstream and a resync of the same data would fail the same way.
    pub fn suggests_resync(&self) -> bool {
        matches!(self, Self::UnresolvedTarget(_) | Self::UnknownIdentifier(_))
    }
}
