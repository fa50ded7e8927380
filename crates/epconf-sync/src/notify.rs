//! Batch notification fan-out
//!
//! Invokes each receiver once with the same root snapshot, in subscription order.
//! A failing receiver is recorded and skipped; the rest are still notified.

use crate::receiver::{ConfigurationReceiver, ReceiverError, ReceiverId};
use epconf_tree::RecordView;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// One receiver that failed during a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverFailure {
    /// Subscription that failed
    pub receiver: ReceiverId,
    /// What went wrong
    pub error: ReceiverError,
}

/// Result of one batch-processed notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Sequence number of the batch, starting at 1
    pub batch: u64,
    /// Receivers that accepted the update
    pub delivered: usize,
    /// Receivers that returned an error or panicked
    pub failures: Vec<ReceiverFailure>,
}

impl BatchReport {
    /// Whether every receiver accepted the update
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Receivers attempted in this batch
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Deliver `root` to one receiver, isolating panics when asked to
pub(crate) fn deliver(
    receiver: &dyn ConfigurationReceiver,
    root: &Arc<RecordView>,
    catch_panics: bool,
) -> Result<(), ReceiverError> {
    if !catch_panics {
        return receiver.on_configuration_updated(root);
    }
    match panic::catch_unwind(AssertUnwindSafe(|| receiver.on_configuration_updated(root))) {
        Ok(result) => result,
        Err(payload) => Err(ReceiverError::Panicked(panic_message(payload.as_ref()))),
    }
}

/// Accumulates per-receiver outcomes for one batch
pub(crate) struct FanOut {
    report: BatchReport,
}

impl FanOut {
    pub(crate) fn new(batch: u64) -> Self {
        Self {
            report: BatchReport {
                batch,
                delivered: 0,
                failures: Vec::new(),
            },
        }
    }

    pub(crate) fn record(&mut self, receiver: ReceiverId, outcome: Result<(), ReceiverError>) {
        match outcome {
            Ok(()) => self.report.delivered += 1,
            Err(error) => {
                warn!(
                    batch = self.report.batch,
                    receiver = %receiver,
                    error = %error,
                    "Configuration receiver failed"
                );
                self.report.failures.push(ReceiverFailure { receiver, error });
            }
        }
    }

    pub(crate) fn finish(self) -> BatchReport {
        self.report
    }
}
