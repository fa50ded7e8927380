//! Subscription registry
//!
//! Ordered list of registered receivers. Identity is the `Arc` allocation, so
//! subscribing the same handle twice is a no-op and unsubscribing a handle that
//! was never registered does nothing.

use crate::receiver::{ConfigurationReceiver, ReceiverId};
use std::sync::Arc;

struct Subscription {
    id: ReceiverId,
    receiver: Arc<dyn ConfigurationReceiver>,
}

/// Receivers in subscription order
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: Vec<Subscription>,
    next_id: u64,
}

fn same_receiver(a: &Arc<dyn ConfigurationReceiver>, b: &Arc<dyn ConfigurationReceiver>) -> bool {
    // Compare data pointers only; vtable pointers are not unique per type.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl SubscriptionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver; returns its handle and whether it was newly added
    pub fn subscribe(&mut self, receiver: Arc<dyn ConfigurationReceiver>) -> (ReceiverId, bool) {
        if let Some(existing) = self
            .entries
            .iter()
            .find(|entry| same_receiver(&entry.receiver, &receiver))
        {
            return (existing.id, false);
        }
        self.next_id += 1;
        let id = ReceiverId(self.next_id);
        self.entries.push(Subscription { id, receiver });
        (id, true)
    }

    /// Remove a receiver by handle identity; `false` if it was not subscribed
    pub fn unsubscribe(&mut self, receiver: &Arc<dyn ConfigurationReceiver>) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !same_receiver(&entry.receiver, receiver));
        self.entries.len() != before
    }

    /// Remove a receiver by subscription id; `false` if unknown
    pub fn unsubscribe_id(&mut self, id: ReceiverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Whether the subscription is still live
    pub fn contains_id(&self, id: ReceiverId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is subscribed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the current list, in subscription order
    pub fn snapshot(&self) -> Vec<(ReceiverId, Arc<dyn ConfigurationReceiver>)> {
        self.entries
            .iter()
            .map(|entry| (entry.id, entry.receiver.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::receiver_fn;

    fn noop() -> Arc<dyn ConfigurationReceiver> {
        receiver_fn(|_| Ok(()))
    }

    #[test]
    fn duplicate_subscribe_is_idempotent() {
        let mut registry = SubscriptionRegistry::new();
        let receiver = noop();
        let (first, added) = registry.subscribe(receiver.clone());
        assert!(added);
        let (second, added_again) = registry.subscribe(receiver);
        assert!(!added_again);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(noop());
        assert!(!registry.unsubscribe(&noop()));
        assert!(!registry.unsubscribe_id(ReceiverId(99)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn snapshot_preserves_order() {
        let mut registry = SubscriptionRegistry::new();
        let ids: Vec<_> = (0..3).map(|_| registry.subscribe(noop()).0).collect();
        let snapshot: Vec<_> = registry.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(snapshot, ids);
    }

    #[test]
    fn resubscribe_after_unsubscribe_gets_new_id() {
        let mut registry = SubscriptionRegistry::new();
        let receiver = noop();
        let (first, _) = registry.subscribe(receiver.clone());
        assert!(registry.unsubscribe(&receiver));
        assert!(!registry.contains_id(first));
        let (second, added) = registry.subscribe(receiver);
        assert!(added);
        assert_ne!(first, second);
    }
}
