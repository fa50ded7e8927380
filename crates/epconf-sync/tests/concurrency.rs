//! Concurrent delta delivery, reads and batch notification

#![allow(clippy::unwrap_used)]

use epconf_core::{Delta, FieldOp, TargetIndex};
use epconf_sync::{receiver_fn, ConfigurationManager, ReceiverError};
use epconf_testkit::{assert_consistent, config_schema, init_test_tracing, tag};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const WRITERS: usize = 4;
const DELTAS_PER_WRITER: usize = 50;

#[test]
fn concurrent_writers_and_readers_see_consistent_trees() {
    init_test_tracing();
    let manager = Arc::new(ConfigurationManager::new(config_schema()).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let manager = manager.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut reads = 0usize;
                while !done.load(Ordering::Acquire) {
                    let root = manager.get_configuration();
                    let tags = root.get_array("tags").map_or(0, <[_]>::len);
                    assert!(tags <= WRITERS * DELTAS_PER_WRITER);
                    for id in manager.registered_ids() {
                        // A record may be gone by now; it must never be half-built.
                        if let Ok(view) = manager.resolve(&id) {
                            assert_eq!(view.id(), id);
                        }
                    }
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    let writers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let manager = manager.clone();
            thread::spawn(move || {
                for n in 0..DELTAS_PER_WRITER {
                    manager
                        .apply_delta(&Delta::patch(
                            TargetIndex::Root,
                            vec![FieldOp::array_push("tags", tag(&format!("w{writer}-{n}")))],
                        ))
                        .unwrap();
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    let root = manager.get_configuration();
    assert_eq!(
        root.get_array("tags").unwrap().len(),
        WRITERS * DELTAS_PER_WRITER
    );
    assert_eq!(manager.registered_ids().len(), 2 + WRITERS * DELTAS_PER_WRITER);
    assert_consistent!(manager);
}

#[test]
fn concurrent_batches_never_interleave() {
    init_test_tracing();
    let manager = Arc::new(ConfigurationManager::new(config_schema()).unwrap());
    let in_flight = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let in_flight = in_flight.clone();
        let overlaps = overlaps.clone();
        let calls = calls.clone();
        manager.subscribe(receiver_fn(move |_| {
            if in_flight.swap(true, Ordering::SeqCst) {
                overlaps.fetch_add(1, Ordering::SeqCst);
            }
            thread::yield_now();
            calls.fetch_add(1, Ordering::SeqCst);
            in_flight.store(false, Ordering::SeqCst);
            Ok::<(), ReceiverError>(())
        }));
    }

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    assert!(manager.on_batch_processed().is_success());
                }
            })
        })
        .collect();
    for handle in threads {
        handle.join().unwrap();
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 4 * 10 * 3);
    assert_eq!(manager.batch_count(), 40);
}

#[test]
fn delta_during_fan_out_does_not_block() {
    init_test_tracing();
    let manager = Arc::new(ConfigurationManager::new(config_schema()).unwrap());
    let writer = Arc::downgrade(&manager);
    manager.subscribe(receiver_fn(move |root| {
        let Some(manager) = writer.upgrade() else {
            return Ok(());
        };
        // Another thread applies a delta while this receiver still holds the old root.
        let limit = root.get_int("limit").unwrap_or_default();
        let handle = thread::spawn(move || {
            manager
                .apply_delta(&Delta::patch(
                    TargetIndex::Root,
                    vec![FieldOp::set("limit", limit + 1)],
                ))
                .map(|_| ())
        });
        handle
            .join()
            .map_err(|_| ReceiverError::rejected("writer panicked"))?
            .map_err(|err| ReceiverError::rejected(err.to_string()))
    }));

    assert!(manager.on_batch_processed().is_success());
    assert_eq!(manager.get_configuration().get_int("limit"), Some(1));
}
