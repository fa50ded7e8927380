//! Read-only snapshots of the configuration tree
//!
//! Consumers never see arena nodes. They get an owned, immutable [`RecordView`]
//! shared behind an `Arc`, which stays valid after the tree moves on and can be
//! handed to receiver callbacks without holding any lock.

use epconf_core::{GenericRecord, GenericValue, RecordId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable snapshot of one record and everything below it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    id: RecordId,
    schema_name: String,
    fields: Vec<(String, ViewValue)>,
}

/// Value of a field in a [`RecordView`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ViewValue {
    /// Null or unset optional
    Null,
    /// Boolean
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Enumeration symbol
    Enum(String),
    /// Nested record
    Record(Arc<RecordView>),
    /// Ordered sequence
    Array(Vec<ViewValue>),
    /// String-keyed mapping
    Map(BTreeMap<String, ViewValue>),
}

impl RecordView {
    pub(crate) fn new(id: RecordId, schema_name: String, fields: Vec<(String, ViewValue)>) -> Self {
        Self {
            id,
            schema_name,
            fields,
        }
    }

    /// Stable identifier of this record
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Name of the record's schema
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// Fields in schema declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ViewValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Value of a field
    pub fn get(&self, name: &str) -> Option<&ViewValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Boolean field value
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ViewValue::as_bool)
    }

    /// Int field value
    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(ViewValue::as_int)
    }

    /// Long field value
    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ViewValue::as_long)
    }

    /// String or enum field value
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ViewValue::as_str)
    }

    /// Nested record field
    pub fn get_record(&self, name: &str) -> Option<&Arc<RecordView>> {
        self.get(name).and_then(ViewValue::as_record)
    }

    /// Array field elements
    pub fn get_array(&self, name: &str) -> Option<&[ViewValue]> {
        self.get(name).and_then(ViewValue::as_array)
    }

    /// Map field entries
    pub fn get_map(&self, name: &str) -> Option<&BTreeMap<String, ViewValue>> {
        self.get(name).and_then(ViewValue::as_map)
    }

    /// Depth-first search for the record carrying `id`
    pub fn find(&self, id: &RecordId) -> Option<&RecordView> {
        if self.id == *id {
            return Some(self);
        }
        self.fields.iter().find_map(|(_, value)| value.find(id))
    }

    /// Identifiers of this record and every record below it
    pub fn collect_ids(&self, out: &mut Vec<RecordId>) {
        out.push(self.id);
        for (_, value) in &self.fields {
            value.collect_ids(out);
        }
    }

    /// Convert back to a decoded record, identifiers included
    ///
    /// Feeding the result to a full resync rebuilds an identical tree.
    pub fn to_generic(&self) -> GenericRecord {
        self.to_generic_inner(true)
    }

    /// Field content only, with every identifier stripped
    pub fn content(&self) -> GenericRecord {
        self.to_generic_inner(false)
    }

    fn to_generic_inner(&self, with_ids: bool) -> GenericRecord {
        GenericRecord {
            id: with_ids.then_some(self.id),
            fields: self
                .fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_generic_inner(with_ids)))
                .collect(),
        }
    }
}

impl ViewValue {
    pub(crate) fn from_primitive(value: &GenericValue) -> Self {
        match value {
            GenericValue::Boolean(v) => ViewValue::Boolean(*v),
            GenericValue::Int(v) => ViewValue::Int(*v),
            GenericValue::Long(v) => ViewValue::Long(*v),
            GenericValue::Float(v) => ViewValue::Float(*v),
            GenericValue::Double(v) => ViewValue::Double(*v),
            GenericValue::String(v) => ViewValue::String(v.clone()),
            GenericValue::Bytes(v) => ViewValue::Bytes(v.clone()),
            GenericValue::Enum(v) => ViewValue::Enum(v.clone()),
            // Composite values never reach primitive slots.
            GenericValue::Null
            | GenericValue::Record(_)
            | GenericValue::Array(_)
            | GenericValue::Map(_) => ViewValue::Null,
        }
    }

    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, ViewValue::Null)
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ViewValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Int payload
    pub fn as_int(&self) -> Option<i32> {
        match self {
            ViewValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Long payload
    pub fn as_long(&self) -> Option<i64> {
        match self {
            ViewValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// String or enum symbol
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ViewValue::String(v) | ViewValue::Enum(v) => Some(v),
            _ => None,
        }
    }

    /// Nested record snapshot
    pub fn as_record(&self) -> Option<&Arc<RecordView>> {
        match self {
            ViewValue::Record(v) => Some(v),
            _ => None,
        }
    }

    /// Array elements
    pub fn as_array(&self) -> Option<&[ViewValue]> {
        match self {
            ViewValue::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Map entries
    pub fn as_map(&self) -> Option<&BTreeMap<String, ViewValue>> {
        match self {
            ViewValue::Map(v) => Some(v),
            _ => None,
        }
    }

    fn find(&self, id: &RecordId) -> Option<&RecordView> {
        match self {
            ViewValue::Record(record) => record.find(id),
            ViewValue::Array(items) => items.iter().find_map(|item| item.find(id)),
            ViewValue::Map(entries) => entries.values().find_map(|entry| entry.find(id)),
            _ => None,
        }
    }

    fn collect_ids(&self, out: &mut Vec<RecordId>) {
        match self {
            ViewValue::Record(record) => record.collect_ids(out),
            ViewValue::Array(items) => items.iter().for_each(|item| item.collect_ids(out)),
            ViewValue::Map(entries) => entries.values().for_each(|entry| entry.collect_ids(out)),
            _ => {}
        }
    }

    fn to_generic_inner(&self, with_ids: bool) -> GenericValue {
        match self {
            ViewValue::Null => GenericValue::Null,
            ViewValue::Boolean(v) => GenericValue::Boolean(*v),
            ViewValue::Int(v) => GenericValue::Int(*v),
            ViewValue::Long(v) => GenericValue::Long(*v),
            ViewValue::Float(v) => GenericValue::Float(*v),
            ViewValue::Double(v) => GenericValue::Double(*v),
            ViewValue::String(v) => GenericValue::String(v.clone()),
            ViewValue::Bytes(v) => GenericValue::Bytes(v.clone()),
            ViewValue::Enum(v) => GenericValue::Enum(v.clone()),
            ViewValue::Record(record) => GenericValue::Record(record.to_generic_inner(with_ids)),
            ViewValue::Array(items) => GenericValue::Array(
                items.iter().map(|item| item.to_generic_inner(with_ids)).collect(),
            ),
            ViewValue::Map(entries) => GenericValue::Map(
                entries
                    .iter()
                    .map(|(key, entry)| (key.clone(), entry.to_generic_inner(with_ids)))
                    .collect(),
            ),
        }
    }
}
