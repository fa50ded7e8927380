//! Property test strategies for epconf types
//!
//! Every generated record conforms to [`config_schema`](crate::fixtures::config_schema).
//! Valid operations apply to any tree built from that schema; invalid ones are
//! rejected regardless of the current state.

use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use crate::fixtures::{server, tag};
use epconf_core::{ArraySelector, FieldOp, GenericRecord, GenericValue, RecordId};

/// Short lowercase identifier
pub fn arb_name() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

/// Deterministic record identifiers (never nil)
pub fn arb_record_id() -> impl Strategy<Value = RecordId> {
    (1u128..u128::MAX).prop_map(RecordId::from_u128)
}

/// `Tag` record without an identifier
pub fn arb_tag() -> impl Strategy<Value = GenericRecord> {
    arb_name().prop_map(|name| tag(&name))
}

/// `Server` record with up to two tags
pub fn arb_server() -> impl Strategy<Value = GenericRecord> {
    (
        arb_name(),
        1i32..65536,
        prop::collection::vec(arb_tag(), 0..3),
    )
        .prop_map(|(host, port, tags)| server(&host, port, tags))
}

/// Complete `Config` root record
pub fn arb_config_record() -> impl Strategy<Value = GenericRecord> {
    (
        any::<i32>(),
        arb_name(),
        prop::sample::select(vec!["auto", "manual", "off"]),
        prop::option::of(arb_name()),
        arb_server(),
        prop::collection::vec(arb_tag(), 0..4),
        prop::collection::btree_map(arb_name(), arb_server(), 0..3),
    )
        .prop_map(|(limit, name, mode, note, primary, tags, servers)| {
            GenericRecord::new()
                .with("limit", limit)
                .with("name", name)
                .with("mode", GenericValue::Enum(mode.to_string()))
                .with("note", note.map_or(GenericValue::Null, GenericValue::from))
                .with("primary", primary)
                .with(
                    "tags",
                    tags.into_iter().map(GenericValue::from).collect::<Vec<_>>(),
                )
                .with(
                    "servers",
                    GenericValue::Map(
                        servers
                            .into_iter()
                            .map(|(key, value)| (key, GenericValue::Record(value)))
                            .collect(),
                    ),
                )
        })
}

/// Root-level operation that succeeds on any `Config` tree
pub fn arb_root_op() -> impl Strategy<Value = FieldOp> {
    prop_oneof![
        any::<i32>().prop_map(|limit| FieldOp::set("limit", limit)),
        arb_name().prop_map(|name| FieldOp::set("name", name)),
        arb_server().prop_map(|primary| FieldOp::set("primary", primary)),
        arb_tag().prop_map(|tag| FieldOp::array_push("tags", tag)),
        (arb_tag(), 0usize..1).prop_map(|(tag, index)| FieldOp::array_insert("tags", index, tag)),
        Just(FieldOp::array_reset("tags")),
        (arb_name(), arb_server()).prop_map(|(key, server)| FieldOp::map_insert(
            "servers", key, server
        )),
    ]
}

/// Root-level operation that is rejected on any `Config` tree
pub fn arb_invalid_root_op() -> impl Strategy<Value = FieldOp> {
    prop_oneof![
        arb_name().prop_map(|text| FieldOp::set("limit", text)),
        any::<i32>().prop_map(|value| FieldOp::set("undeclared", value)),
        Just(FieldOp::set("mode", GenericValue::Enum("unknown".to_string()))),
        Just(FieldOp::map_remove("servers", "MISSING")),
        (10_000usize..20_000).prop_map(|index| FieldOp::array_insert("tags", index, tag("x"))),
        (10_000usize..20_000)
            .prop_map(|index| FieldOp::array_remove("tags", ArraySelector::Index(index))),
        arb_record_id()
            .prop_map(|id| FieldOp::array_remove("tags", ArraySelector::Record(id))),
    ]
}
