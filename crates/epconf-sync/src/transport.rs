//! Transport-facing seams
//!
//! The component that receives and decodes deltas talks to the manager through
//! these traits only, so it can be driven against a fake in tests.

use crate::notify::BatchReport;
use epconf_core::{ConfigResult, DeltaPayload};
use epconf_tree::MergeOutcome;

/// Sink for decoded deltas, in arrival order
pub trait DeltaReceiver: Send + Sync {
    /// Apply one delta addressed by its raw target index (0 = root)
    fn on_delta_received(
        &self,
        target: u128,
        payload: DeltaPayload,
        full_resync: bool,
    ) -> ConfigResult<MergeOutcome>;
}

/// Sink for the "batch complete" signal
pub trait BatchProcessedObserver: Send + Sync {
    /// Every delta of the current push has been delivered
    fn on_configuration_processed(&self) -> BatchReport;
}
