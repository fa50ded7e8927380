//! # Epconf Tree - Configuration Tree and Delta Merge
//!
//! In-memory representation of a nested, schema-typed configuration record and the
//! engine that applies indexed deltas to it.
//!
//! ## Architecture
//!
//! - **Record model**: records live in an arena and own their children by key, so
//!   the tree has exactly one owner per node and no reference cycles
//! - **Identifier registry**: [`RecordId`](epconf_core::RecordId) to arena key,
//!   giving O(1) delta targeting without walking from the root
//! - **Merge engine**: [`ConfigTree::apply_delta`] validates the payload, applies it
//!   inside an undo journal and either commits or restores the exact prior state
//! - **Views**: consumers read immutable [`RecordView`] snapshots, never arena nodes
//!
//! This crate is single-threaded by construction; `epconf-sync` wraps a
//! [`ConfigTree`] in the lock that makes concurrent delivery and reads safe.
//!
//! ## Usage
//!
//! ```rust
//! use epconf_core::{Delta, FieldOp, FieldType, GenericRecord, RecordSchema, TargetIndex};
//! use epconf_tree::ConfigTree;
//!
//! let tag = RecordSchema::builder("Tag").field("name", FieldType::String).build();
//! let schema = RecordSchema::builder("Config")
//!     .field("count", FieldType::Int)
//!     .field("tags", FieldType::array(FieldType::record(tag)))
//!     .build();
//!
//! let mut tree = ConfigTree::new(schema).unwrap();
//! tree.apply_delta(&Delta::full_resync(GenericRecord::new().with("count", 1))).unwrap();
//! tree.apply_delta(&Delta::patch(
//!     TargetIndex::Root,
//!     vec![FieldOp::array_push("tags", GenericRecord::new().with("name", "x"))],
//! ))
//! .unwrap();
//!
//! let root = tree.root_view();
//! assert_eq!(root.get_int("count"), Some(1));
//! assert_eq!(root.get_array("tags").unwrap().len(), 1);
//! ```

#![forbid(unsafe_code)]

mod consistency;
mod merge;
mod record;
mod registry;
mod tree;
mod txn;
mod view;

pub use consistency::InvariantViolation;
pub use merge::MergeOutcome;
pub use record::NodeKey;
pub use registry::IdentifierRegistry;
pub use tree::{ConfigTree, DEFAULT_MAX_DEPTH};
pub use view::{RecordView, ViewValue};
