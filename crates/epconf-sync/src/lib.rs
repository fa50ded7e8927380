//! # Epconf Sync - Configuration Manager
//!
//! Thread-safe front of the configuration engine. A transport delivers decoded
//! deltas and a "batch complete" signal; application code reads snapshots and
//! subscribes receivers that are told about each completed batch.
//!
//! ## Concurrency
//!
//! - One exclusive lock covers delta application, subscription changes and reads
//! - Receivers run after the lock is released, against an immutable snapshot, so
//!   a receiver may call back into the manager
//! - Concurrent batch notifications are serialized and never interleave
//!
//! ## Usage
//!
//! ```rust
//! use epconf_core::{Delta, FieldType, GenericRecord, RecordSchema};
//! use epconf_sync::{receiver_fn, ConfigurationManager};
//!
//! let schema = RecordSchema::builder("Config").field("limit", FieldType::Int).build();
//! let manager = ConfigurationManager::new(schema).unwrap();
//! manager.subscribe(receiver_fn(|root| {
//!     assert_eq!(root.get_int("limit"), Some(10));
//!     Ok(())
//! }));
//!
//! manager.apply_delta(&Delta::full_resync(GenericRecord::new().with("limit", 10))).unwrap();
//! let report = manager.on_batch_processed();
//! assert!(report.is_success());
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod hash;
pub mod manager;
pub mod notify;
pub mod receiver;
pub mod subscriptions;
pub mod transport;

pub use config::{ManagerConfig, ManagerConfigBuilder, ManagerConfigError};
pub use hash::{ConfigurationHash, ConfigurationHashContainer};
pub use manager::ConfigurationManager;
pub use notify::{BatchReport, ReceiverFailure};
pub use receiver::{receiver_fn, ConfigurationReceiver, FnReceiver, ReceiverError, ReceiverId};
pub use subscriptions::SubscriptionRegistry;
pub use transport::{BatchProcessedObserver, DeltaReceiver};
