//! Schema fixtures and value builders
//!
//! `config_schema()` covers every shape the merge engine handles: primitives, an
//! enum, an optional, a nested record, an array of records and a map of records.
//! Payloads can be written as JSON and decoded against a schema with
//! [`json_record`]; a `"$id"` key carries an upstream record identifier.

use epconf_core::{FieldType, GenericRecord, GenericValue, RecordId, RecordSchema};
use serde_json::Value;
use std::sync::Arc;

/// `Tag { name: string }`
pub fn tag_schema() -> Arc<RecordSchema> {
    RecordSchema::builder("Tag")
        .field("name", FieldType::String)
        .build()
}

/// `Server { host: string, port: int, tags: array<Tag> }`
pub fn server_schema() -> Arc<RecordSchema> {
    RecordSchema::builder("Server")
        .field("host", FieldType::String)
        .field_with_default("port", FieldType::Int, GenericValue::Int(443))
        .field("tags", FieldType::array(FieldType::record(tag_schema())))
        .build()
}

/// Root schema used across the test suites
pub fn config_schema() -> Arc<RecordSchema> {
    RecordSchema::builder("Config")
        .field("limit", FieldType::Int)
        .field("name", FieldType::String)
        .field("mode", FieldType::enumeration(["auto", "manual", "off"]))
        .field("note", FieldType::optional(FieldType::String))
        .field("primary", FieldType::record(server_schema()))
        .field("tags", FieldType::array(FieldType::record(tag_schema())))
        .field("servers", FieldType::map(FieldType::record(server_schema())))
        .build()
}

/// Tag record without an identifier
pub fn tag(name: &str) -> GenericRecord {
    GenericRecord::new().with("name", name)
}

/// Tag record carrying an upstream identifier
pub fn tag_with_id(id: RecordId, name: &str) -> GenericRecord {
    GenericRecord::with_id(id).with("name", name)
}

/// Server record with the given tags
pub fn server(host: &str, port: i32, tags: Vec<GenericRecord>) -> GenericRecord {
    GenericRecord::new()
        .with("host", host)
        .with("port", port)
        .with(
            "tags",
            tags.into_iter().map(GenericValue::from).collect::<Vec<_>>(),
        )
}

/// Decode a JSON object into a record of `schema`
///
/// Panics on any shape mismatch; fixtures are expected to be well-formed.
pub fn json_record(schema: &RecordSchema, json: &Value) -> GenericRecord {
    let object = json
        .as_object()
        .unwrap_or_else(|| panic!("expected object for record {}", schema.name));
    let mut record = GenericRecord::new();
    for (key, value) in object {
        if key == "$id" {
            let text = value.as_str().expect("$id must be a string");
            record.id = Some(text.parse().expect("$id must be a record id"));
            continue;
        }
        let field = schema
            .field(key)
            .unwrap_or_else(|| panic!("{} has no field {key}", schema.name));
        record
            .fields
            .insert(key.clone(), json_value(&field.ty, value));
    }
    record
}

/// Decode a JSON value against a declared type
pub fn json_value(ty: &FieldType, json: &Value) -> GenericValue {
    match ty {
        FieldType::Null => GenericValue::Null,
        FieldType::Boolean => GenericValue::Boolean(json.as_bool().expect("boolean")),
        FieldType::Int => {
            GenericValue::Int(i32::try_from(json.as_i64().expect("int")).expect("int range"))
        }
        FieldType::Long => GenericValue::Long(json.as_i64().expect("long")),
        FieldType::Float => GenericValue::Float(json.as_f64().expect("float") as f32),
        FieldType::Double => GenericValue::Double(json.as_f64().expect("double")),
        FieldType::String => GenericValue::String(json.as_str().expect("string").to_string()),
        FieldType::Bytes => GenericValue::Bytes(
            json.as_array()
                .expect("bytes as array")
                .iter()
                .map(|b| u8::try_from(b.as_u64().expect("byte")).expect("byte range"))
                .collect(),
        ),
        FieldType::Enum(_) => GenericValue::Enum(json.as_str().expect("enum symbol").to_string()),
        FieldType::Record(schema) => GenericValue::Record(json_record(schema, json)),
        FieldType::Array(element) => GenericValue::Array(
            json.as_array()
                .expect("array")
                .iter()
                .map(|item| json_value(element, item))
                .collect(),
        ),
        FieldType::Map(value_ty) => GenericValue::Map(
            json.as_object()
                .expect("map")
                .iter()
                .map(|(key, item)| (key.clone(), json_value(value_ty, item)))
                .collect(),
        ),
        FieldType::Optional(inner) => {
            if json.is_null() {
                GenericValue::Null
            } else {
                json_value(inner, json)
            }
        }
    }
}

/// Root record built from JSON against [`config_schema`]
pub fn config_record(json: Value) -> GenericRecord {
    json_record(&config_schema(), &json)
}
