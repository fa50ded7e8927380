//! Configuration receivers
//!
//! A receiver is an external observer notified with the root snapshot once per
//! completed batch. The manager holds nothing but the registration: the `Arc`
//! handle it was given and the callback behind it.

use epconf_tree::RecordView;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Observer of configuration updates
pub trait ConfigurationReceiver: Send + Sync {
    /// Called once per completed batch with the current root
    ///
    /// Runs outside the manager's lock; calling back into the manager is allowed.
    /// Batches are serialized, so waiting from here on another thread that calls
    /// `on_batch_processed` deadlocks. Re-entry on the calling thread is fine.
    fn on_configuration_updated(&self, root: &Arc<RecordView>) -> Result<(), ReceiverError>;
}

/// Failure reported by a receiver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiverError {
    /// Receiver returned an error
    #[error("Receiver rejected configuration: {0}")]
    Rejected(String),

    /// Receiver panicked and was isolated
    #[error("Receiver panicked: {0}")]
    Panicked(String),
}

impl ReceiverError {
    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(pub u64);

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receiver-{}", self.0)
    }
}

/// Adapter turning a closure into a [`ConfigurationReceiver`]
pub struct FnReceiver<F>(F);

impl<F> ConfigurationReceiver for FnReceiver<F>
where
    F: Fn(&Arc<RecordView>) -> Result<(), ReceiverError> + Send + Sync,
{
    fn on_configuration_updated(&self, root: &Arc<RecordView>) -> Result<(), ReceiverError> {
        (self.0)(root)
    }
}

/// Wrap a closure as a shareable receiver
pub fn receiver_fn<F>(f: F) -> Arc<dyn ConfigurationReceiver>
where
    F: Fn(&Arc<RecordView>) -> Result<(), ReceiverError> + Send + Sync + 'static,
{
    Arc::new(FnReceiver(f))
}
