//! Manager driven through the transport-facing traits

#![allow(clippy::unwrap_used)]

use assert_matches::assert_matches;
use epconf_core::{
    ArraySelector, ConfigError, DeltaPayload, FieldOp, FieldType, GenericRecord, GenericValue,
    RecordSchema, TargetIndex,
};
use epconf_sync::{
    BatchProcessedObserver, ConfigurationHashContainer, ConfigurationManager, DeltaReceiver,
    ManagerConfig,
};
use epconf_testkit::{
    as_receiver, call_log, config_record, config_schema, init_test_tracing, RecordingReceiver,
};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

/// Push one batch the way a transport would: deltas in order, then the signal
fn push(
    deltas: &dyn DeltaReceiver,
    observer: &dyn BatchProcessedObserver,
    batch: Vec<(u128, DeltaPayload, bool)>,
) -> Vec<Result<(), ConfigError>> {
    let results = batch
        .into_iter()
        .map(|(target, payload, full_resync)| {
            deltas
                .on_delta_received(target, payload, full_resync)
                .map(|_| ())
        })
        .collect();
    observer.on_configuration_processed();
    results
}

#[test]
fn count_and_tags_scenario() {
    init_test_tracing();
    let tag = RecordSchema::builder("Tag")
        .field("name", FieldType::String)
        .build();
    let schema = RecordSchema::builder("Config")
        .field("count", FieldType::Int)
        .field("tags", FieldType::array(FieldType::record(tag)))
        .build();
    let manager = Arc::new(ConfigurationManager::new(schema).unwrap());
    let receiver = RecordingReceiver::new("app", call_log());
    manager.subscribe(as_receiver(&receiver));

    let results = push(
        manager.as_ref(),
        manager.as_ref(),
        vec![
            (
                TargetIndex::ROOT_RAW,
                DeltaPayload::Replace(
                    GenericRecord::new()
                        .with("count", 1)
                        .with("tags", Vec::<GenericValue>::new()),
                ),
                true,
            ),
            (
                TargetIndex::ROOT_RAW,
                DeltaPayload::Patch(vec![FieldOp::array_push(
                    "tags",
                    GenericRecord::new().with("name", "x"),
                )]),
                false,
            ),
        ],
    );
    assert!(results.iter().all(Result::is_ok));
    let root = receiver.last().unwrap();
    assert_eq!(root.get_int("count"), Some(1));
    let tag_id = root.get_array("tags").unwrap()[0].as_record().unwrap().id();
    assert!(manager.registered_ids().contains(&tag_id));

    push(
        manager.as_ref(),
        manager.as_ref(),
        vec![(
            tag_id.as_u128(),
            DeltaPayload::Patch(vec![FieldOp::set("name", "y")]),
            false,
        )],
    );
    let root = receiver.last().unwrap();
    let first = root.get_array("tags").unwrap()[0].as_record().unwrap();
    assert_eq!(first.get_str("name"), Some("y"));

    let results = push(
        manager.as_ref(),
        manager.as_ref(),
        vec![
            (
                TargetIndex::ROOT_RAW,
                DeltaPayload::Patch(vec![FieldOp::array_remove(
                    "tags",
                    ArraySelector::Record(tag_id),
                )]),
                false,
            ),
            (
                tag_id.as_u128(),
                DeltaPayload::Patch(vec![FieldOp::set("name", "z")]),
                false,
            ),
        ],
    );
    assert!(results[0].is_ok());
    assert_matches!(
        &results[1],
        Err(err @ ConfigError::UnresolvedTarget(_)) if err.suggests_resync()
    );
    assert_eq!(receiver.calls(), 3);
    assert_eq!(manager.batch_count(), 3);
}

#[test]
fn resync_of_same_content_keeps_hash() {
    init_test_tracing();
    let manager = ConfigurationManager::new(config_schema()).unwrap();
    let record = config_record(json!({
        "limit": 7,
        "mode": "off",
        "tags": [{ "name": "a" }, { "name": "b" }]
    }));

    manager
        .on_delta_received(TargetIndex::ROOT_RAW, DeltaPayload::Replace(record.clone()), true)
        .unwrap();
    let first_root = manager.root_id();
    let first_hash = manager.configuration_hash();

    manager
        .on_delta_received(TargetIndex::ROOT_RAW, DeltaPayload::Replace(record), true)
        .unwrap();
    assert_ne!(manager.root_id(), first_root);
    assert_eq!(manager.configuration_hash(), first_hash);
}

#[test]
fn manager_honours_config_file() {
    init_test_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_value_depth = 2").unwrap();
    writeln!(file, "verify_invariants = true").unwrap();
    let config = ManagerConfig::load_from_file(file.path()).unwrap();

    let manager = ConfigurationManager::with_config(config_schema(), config).unwrap();
    assert!(manager.config().verify_invariants);

    // Root -> primary -> tags -> tag is deeper than two levels.
    let deep = config_record(json!({
        "primary": { "host": "h", "tags": [{ "name": "t" }] }
    }));
    let err = manager
        .on_delta_received(TargetIndex::ROOT_RAW, DeltaPayload::Replace(deep), true)
        .unwrap_err();
    assert_matches!(err, ConfigError::InvalidOperation { .. });
}
