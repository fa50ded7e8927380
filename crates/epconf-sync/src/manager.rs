//! Configuration manager
//!
//! Owns the configuration tree, the subscription list and the cached root
//! snapshot behind one exclusive lock. Deltas are applied in call order under the
//! lock; batch notifications take a snapshot under the lock and run receivers
//! after releasing it, so a receiver may call straight back into the manager.

use crate::config::ManagerConfig;
use crate::hash::{ConfigurationHash, ConfigurationHashContainer};
use crate::notify::{deliver, BatchReport, FanOut};
use crate::receiver::{ConfigurationReceiver, ReceiverId};
use crate::subscriptions::SubscriptionRegistry;
use crate::transport::{BatchProcessedObserver, DeltaReceiver};
use epconf_core::{ConfigResult, Delta, DeltaPayload, RecordId, RecordSchema, TargetIndex};
use epconf_tree::{ConfigTree, MergeOutcome, RecordView};
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

struct ManagerState {
    tree: ConfigTree,
    subscriptions: SubscriptionRegistry,
    snapshot: Option<Arc<RecordView>>,
    batches: u64,
    pending_deltas: usize,
}

impl ManagerState {
    fn snapshot(&mut self) -> Arc<RecordView> {
        match &self.snapshot {
            Some(root) => root.clone(),
            None => {
                let root = self.tree.root_view();
                self.snapshot = Some(root.clone());
                root
            }
        }
    }
}

/// Thread-safe entry point for delta delivery, reads and subscriptions
pub struct ConfigurationManager {
    state: Mutex<ManagerState>,
    fan_out_gate: ReentrantMutex<()>,
    config: ManagerConfig,
}

impl ConfigurationManager {
    /// Manager over `schema` with default settings
    ///
    /// The root starts out as the schema default record.
    pub fn new(schema: Arc<RecordSchema>) -> ConfigResult<Self> {
        Self::with_config(schema, ManagerConfig::default())
    }

    /// Manager over `schema` with explicit settings
    pub fn with_config(schema: Arc<RecordSchema>, config: ManagerConfig) -> ConfigResult<Self> {
        let tree = ConfigTree::with_max_depth(schema, config.max_value_depth)?;
        debug!(
            schema = %tree.schema().name,
            root = %tree.root_id(),
            "Configuration manager initialized"
        );
        Ok(Self {
            state: Mutex::new(ManagerState {
                tree,
                subscriptions: SubscriptionRegistry::new(),
                snapshot: None,
                batches: 0,
                pending_deltas: 0,
            }),
            fan_out_gate: ReentrantMutex::new(()),
            config,
        })
    }

    /// Active settings
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Apply one delta; on error nothing changes
    pub fn apply_delta(&self, delta: &Delta) -> ConfigResult<MergeOutcome> {
        let mut state = self.state.lock();
        match state.tree.apply_delta(delta) {
            Ok(outcome) => {
                state.snapshot = None;
                state.pending_deltas += 1;
                debug!(
                    target = %outcome.target,
                    full_resync = outcome.full_resync,
                    installed = outcome.installed,
                    decommissioned = outcome.decommissioned,
                    "Applied configuration delta"
                );
                if self.config.verify_invariants {
                    if let Err(violation) = state.tree.check_consistency() {
                        error!(
                            target = %outcome.target,
                            violation = %violation,
                            "Configuration tree invariant violated"
                        );
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    target = %delta.target,
                    full_resync = delta.full_resync,
                    code = err.code(),
                    suggests_resync = err.suggests_resync(),
                    error = %err,
                    "Rejected configuration delta"
                );
                Err(err)
            }
        }
    }

    /// Notify every subscribed receiver once with the current root
    ///
    /// Receivers run in subscription order, outside the state lock. Concurrent
    /// calls are serialized; a receiver calling this again on the same thread
    /// starts a nested batch instead of deadlocking.
    pub fn on_batch_processed(&self) -> BatchReport {
        let _gate = self.fan_out_gate.lock();
        let (batch, deltas, root, receivers) = {
            let mut state = self.state.lock();
            state.batches += 1;
            let deltas = std::mem::take(&mut state.pending_deltas);
            (
                state.batches,
                deltas,
                state.snapshot(),
                state.subscriptions.snapshot(),
            )
        };

        let mut fan_out = FanOut::new(batch);
        for (id, receiver) in receivers {
            // Skip receivers removed by an earlier receiver or another thread.
            if !self.state.lock().subscriptions.contains_id(id) {
                continue;
            }
            let outcome = deliver(receiver.as_ref(), &root, self.config.catch_receiver_panics);
            fan_out.record(id, outcome);
        }
        let report = fan_out.finish();
        info!(
            batch,
            deltas,
            delivered = report.delivered,
            failed = report.failures.len(),
            "Configuration batch processed"
        );
        report
    }

    /// Add a receiver; subscribing the same handle again returns its existing id
    pub fn subscribe(&self, receiver: Arc<dyn ConfigurationReceiver>) -> ReceiverId {
        let (id, added) = self.state.lock().subscriptions.subscribe(receiver);
        if added {
            debug!(receiver = %id, "Configuration receiver subscribed");
        }
        id
    }

    /// Remove a receiver; `false` if it was not subscribed
    pub fn unsubscribe(&self, receiver: &Arc<dyn ConfigurationReceiver>) -> bool {
        let removed = self.state.lock().subscriptions.unsubscribe(receiver);
        if removed {
            debug!("Configuration receiver unsubscribed");
        }
        removed
    }

    /// Remove a receiver by the id `subscribe` returned
    pub fn unsubscribe_id(&self, id: ReceiverId) -> bool {
        let removed = self.state.lock().subscriptions.unsubscribe_id(id);
        if removed {
            debug!(receiver = %id, "Configuration receiver unsubscribed");
        }
        removed
    }

    /// Number of subscribed receivers
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Current root snapshot
    ///
    /// The same `Arc` is returned until the next successful delta.
    pub fn get_configuration(&self) -> Arc<RecordView> {
        self.state.lock().snapshot()
    }

    /// Snapshot of a registered record
    pub fn resolve(&self, id: &RecordId) -> ConfigResult<Arc<RecordView>> {
        self.state.lock().tree.view_of(id)
    }

    /// Every identifier currently in the registry
    pub fn registered_ids(&self) -> Vec<RecordId> {
        self.state.lock().tree.registry().ids().copied().collect()
    }

    /// Identifier of the current root record
    pub fn root_id(&self) -> RecordId {
        self.state.lock().tree.root_id()
    }

    /// Batches notified so far
    pub fn batch_count(&self) -> u64 {
        self.state.lock().batches
    }

    /// Run the tree/registry invariant check on demand
    pub fn check_consistency(&self) -> Result<(), epconf_tree::InvariantViolation> {
        self.state.lock().tree.check_consistency()
    }
}

impl ConfigurationHashContainer for ConfigurationManager {
    fn configuration_hash(&self) -> ConfigurationHash {
        let root = self.get_configuration();
        ConfigurationHash::of(&root)
    }
}

impl DeltaReceiver for ConfigurationManager {
    fn on_delta_received(
        &self,
        target: u128,
        payload: DeltaPayload,
        full_resync: bool,
    ) -> ConfigResult<MergeOutcome> {
        let delta = Delta {
            target: TargetIndex::from_raw(target),
            full_resync,
            payload,
        };
        self.apply_delta(&delta)
    }
}

impl BatchProcessedObserver for ConfigurationManager {
    fn on_configuration_processed(&self) -> BatchReport {
        self.on_batch_processed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::{receiver_fn, ReceiverError};
    use assert_matches::assert_matches;
    use epconf_core::{ConfigError, FieldOp, FieldType, GenericRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema() -> Arc<RecordSchema> {
        let tag = RecordSchema::builder("Tag")
            .field("name", FieldType::String)
            .build();
        RecordSchema::builder("Config")
            .field("limit", FieldType::Int)
            .field("tags", FieldType::array(FieldType::record(tag)))
            .build()
    }

    fn manager() -> ConfigurationManager {
        ConfigurationManager::new(schema()).unwrap()
    }

    #[test]
    fn snapshot_is_cached_until_next_delta() {
        let manager = manager();
        let first = manager.get_configuration();
        assert!(Arc::ptr_eq(&first, &manager.get_configuration()));
        manager
            .apply_delta(&Delta::patch(TargetIndex::Root, vec![FieldOp::set("limit", 5)]))
            .unwrap();
        let second = manager.get_configuration();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.get_int("limit"), Some(5));
    }

    #[test]
    fn rejected_delta_keeps_snapshot() {
        let manager = manager();
        let before = manager.get_configuration();
        let err = manager
            .apply_delta(&Delta::patch(RecordId::new(), vec![FieldOp::set("limit", 1)]))
            .unwrap_err();
        assert_matches!(err, ConfigError::UnresolvedTarget(_));
        assert!(Arc::ptr_eq(&before, &manager.get_configuration()));
    }

    #[test]
    fn transport_form_targets_root_with_zero() {
        let manager = manager();
        let outcome = manager
            .on_delta_received(
                TargetIndex::ROOT_RAW,
                DeltaPayload::Patch(vec![FieldOp::set("limit", 9)]),
                false,
            )
            .unwrap();
        assert_eq!(outcome.target, manager.root_id());
        assert_eq!(manager.get_configuration().get_int("limit"), Some(9));
    }

    #[test]
    fn batch_without_receivers_is_empty_success() {
        let report = manager().on_batch_processed();
        assert_eq!(report.batch, 1);
        assert_eq!(report.delivered, 0);
        assert!(report.is_success());
    }

    #[test]
    fn failing_receiver_does_not_stop_fan_out() {
        let manager = manager();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        manager.subscribe(receiver_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        let failing = manager.subscribe(receiver_fn(|_| Err(ReceiverError::rejected("nope"))));
        let counter = calls.clone();
        manager.subscribe(receiver_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let report = manager.on_batch_processed();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].receiver, failing);
    }

    #[test]
    fn unsubscribed_receiver_is_not_notified() {
        let manager = manager();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let receiver = receiver_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        manager.subscribe(receiver.clone());
        manager.subscribe(receiver.clone());
        manager.on_batch_processed();
        assert!(manager.unsubscribe(&receiver));
        assert!(!manager.unsubscribe(&receiver));
        manager.on_batch_processed();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hash_tracks_content() {
        let manager = manager();
        let before = manager.configuration_hash();
        manager
            .apply_delta(&Delta::patch(
                TargetIndex::Root,
                vec![FieldOp::array_push("tags", GenericRecord::new().with("name", "a"))],
            ))
            .unwrap();
        assert_ne!(before, manager.configuration_hash());
    }

    #[test]
    fn registered_ids_include_root() {
        let manager = manager();
        assert_eq!(manager.registered_ids(), vec![manager.root_id()]);
    }
}
