//! Delta - one decoded instruction to mutate the configuration tree
//!
//! A delta either replaces the target record wholesale or carries field-level
//! operations against it. Deltas are applied strictly in arrival order because a
//! later delta may address a record introduced by an earlier one in the same batch.
//!
//! # Example
//!
//! ```rust
//! use epconf_core::{Delta, FieldOp, GenericRecord, TargetIndex};
//!
//! // Full resync replaces the whole tree
//! let resync = Delta::full_resync(GenericRecord::new().with("count", 1));
//! assert!(resync.full_resync);
//!
//! // Partial update appends a Tag to the root's `tags` array
//! let insert = Delta::patch(
//!     TargetIndex::Root,
//!     vec![FieldOp::array_push("tags", GenericRecord::new().with("name", "x"))],
//! );
//! assert!(!insert.full_resync);
//! ```

use crate::errors::{ConfigError, ConfigResult};
use crate::identifiers::{RecordId, TargetIndex};
use crate::value::{GenericRecord, GenericValue};
use serde::{Deserialize, Serialize};

/// One decoded delta as delivered by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Node the delta applies to; ignored on full resync
    pub target: TargetIndex,
    /// Discard the whole tree and rebuild it from the payload
    pub full_resync: bool,
    /// Decoded operation
    pub payload: DeltaPayload,
}

impl Delta {
    /// Full resync delta replacing the root
    pub fn full_resync(root: GenericRecord) -> Self {
        Self {
            target: TargetIndex::Root,
            full_resync: true,
            payload: DeltaPayload::Replace(root),
        }
    }

    /// Partial delta replacing every field of the target record
    pub fn replace(target: impl Into<TargetIndex>, record: GenericRecord) -> Self {
        Self {
            target: target.into(),
            full_resync: false,
            payload: DeltaPayload::Replace(record),
        }
    }

    /// Partial delta carrying field operations
    pub fn patch(target: impl Into<TargetIndex>, ops: Vec<FieldOp>) -> Self {
        Self {
            target: target.into(),
            full_resync: false,
            payload: DeltaPayload::Patch(ops),
        }
    }

    /// Reject payload/mode combinations that can never apply
    pub fn check_mode(&self) -> ConfigResult<()> {
        match (&self.payload, self.full_resync) {
            (DeltaPayload::Patch(_), true) => Err(ConfigError::invalid_operation(
                "full resync requires a replacement record, got field operations",
            )),
            (DeltaPayload::Patch(ops), false) if ops.is_empty() => Err(
                ConfigError::invalid_operation("partial delta carries no field operations"),
            ),
            _ => Ok(()),
        }
    }
}

/// Decoded body of a delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeltaPayload {
    /// Replace the target record's fields wholesale
    Replace(GenericRecord),
    /// Apply field operations in order, atomically as a unit
    Patch(Vec<FieldOp>),
}

/// Field-level operation against the delta target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOp {
    /// Field of the target record
    pub field: String,
    /// What to do with it
    pub kind: FieldOpKind,
}

/// Kind of field-level operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldOpKind {
    /// Replace the field's value
    Set(GenericValue),
    /// Insert an element into an array field
    ArrayInsert {
        /// Insert position; `None` appends
        index: Option<usize>,
        /// Element to insert
        value: GenericValue,
    },
    /// Remove one element from an array field
    ArrayRemove(ArraySelector),
    /// Remove every element of an array field
    ArrayReset,
    /// Insert or replace a map entry
    MapInsert {
        /// Entry key
        key: String,
        /// Entry value
        value: GenericValue,
    },
    /// Remove a map entry
    MapRemove {
        /// Entry key
        key: String,
    },
}

/// Which array element to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArraySelector {
    /// By position
    Index(usize),
    /// The record element carrying this identifier
    Record(RecordId),
}

impl FieldOp {
    /// Set a field
    pub fn set(field: impl Into<String>, value: impl Into<GenericValue>) -> Self {
        Self {
            field: field.into(),
            kind: FieldOpKind::Set(value.into()),
        }
    }

    /// Append to an array field
    pub fn array_push(field: impl Into<String>, value: impl Into<GenericValue>) -> Self {
        Self {
            field: field.into(),
            kind: FieldOpKind::ArrayInsert {
                index: None,
                value: value.into(),
            },
        }
    }

    /// Insert into an array field at a position
    pub fn array_insert(
        field: impl Into<String>,
        index: usize,
        value: impl Into<GenericValue>,
    ) -> Self {
        Self {
            field: field.into(),
            kind: FieldOpKind::ArrayInsert {
                index: Some(index),
                value: value.into(),
            },
        }
    }

    /// Remove an array element
    pub fn array_remove(field: impl Into<String>, selector: ArraySelector) -> Self {
        Self {
            field: field.into(),
            kind: FieldOpKind::ArrayRemove(selector),
        }
    }

    /// Clear an array field
    pub fn array_reset(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FieldOpKind::ArrayReset,
        }
    }

    /// Insert or replace a map entry
    pub fn map_insert(
        field: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<GenericValue>,
    ) -> Self {
        Self {
            field: field.into(),
            kind: FieldOpKind::MapInsert {
                key: key.into(),
                value: value.into(),
            },
        }
    }

    /// Remove a map entry
    pub fn map_remove(field: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FieldOpKind::MapRemove { key: key.into() },
        }
    }
}
