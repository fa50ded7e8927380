//! Receivers for notification tests

use epconf_sync::{ConfigurationReceiver, ReceiverError};
use epconf_tree::RecordView;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared log of receiver labels in call order
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Fresh empty call log
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Records every root it is handed and appends its label to a shared log
pub struct RecordingReceiver {
    label: String,
    log: CallLog,
    seen: Mutex<Vec<Arc<RecordView>>>,
}

impl RecordingReceiver {
    /// Receiver that appends `label` to `log` on every call
    pub fn new(label: impl Into<String>, log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            log,
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Roots received so far
    pub fn seen(&self) -> Vec<Arc<RecordView>> {
        self.seen.lock().clone()
    }

    /// Number of notifications received
    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    /// Root delivered by the most recent notification
    pub fn last(&self) -> Option<Arc<RecordView>> {
        self.seen.lock().last().cloned()
    }
}

impl ConfigurationReceiver for RecordingReceiver {
    fn on_configuration_updated(&self, root: &Arc<RecordView>) -> Result<(), ReceiverError> {
        self.seen.lock().push(root.clone());
        self.log.lock().push(self.label.clone());
        Ok(())
    }
}

/// Logs its label, then fails or panics
pub struct FailingReceiver {
    label: String,
    log: CallLog,
    panic: bool,
}

impl FailingReceiver {
    /// Returns `ReceiverError::Rejected`
    pub fn rejecting(label: impl Into<String>, log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            log,
            panic: false,
        })
    }

    /// Panics inside the callback
    pub fn panicking(label: impl Into<String>, log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            log,
            panic: true,
        })
    }
}

impl ConfigurationReceiver for FailingReceiver {
    fn on_configuration_updated(&self, _root: &Arc<RecordView>) -> Result<(), ReceiverError> {
        self.log.lock().push(self.label.clone());
        if self.panic {
            panic!("{} panicked", self.label);
        }
        Err(ReceiverError::rejected(format!("{} rejected", self.label)))
    }
}

/// Upcast for subscribe/unsubscribe calls
pub fn as_receiver<R: ConfigurationReceiver + 'static>(
    receiver: &Arc<R>,
) -> Arc<dyn ConfigurationReceiver> {
    receiver.clone()
}
