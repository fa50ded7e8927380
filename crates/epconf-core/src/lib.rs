//! # Epconf Core - Foundation Types
//!
//! Shared vocabulary for the endpoint configuration synchronization engine:
//!
//! - **Identifiers**: [`RecordId`] stable 128-bit tokens and the transport-facing
//!   [`TargetIndex`] that addresses either the root or a registered record
//! - **Schema**: [`RecordSchema`] / [`FieldType`], the static description every
//!   decoded value is validated against before it touches the tree
//! - **Values**: [`GenericValue`], the tagged-variant form of an already-decoded
//!   delta payload
//! - **Deltas**: [`Delta`] with either a full [`DeltaPayload::Replace`] or a list
//!   of field-level [`FieldOp`]s
//! - **Errors**: the unified [`ConfigError`] taxonomy
//!
//! This crate performs no I/O and holds no shared state. The tree model and merge
//! engine live in `epconf-tree`; the locked manager and notification fan-out live
//! in `epconf-sync`.

#![forbid(unsafe_code)]

pub mod delta;
pub mod errors;
pub mod identifiers;
pub mod schema;
pub mod value;

pub use delta::{ArraySelector, Delta, DeltaPayload, FieldOp, FieldOpKind};
pub use errors::{ConfigError, ConfigResult};
pub use identifiers::{RecordId, TargetIndex};
pub use schema::{FieldSchema, FieldType, RecordSchema, RecordSchemaBuilder};
pub use value::{GenericRecord, GenericValue};
