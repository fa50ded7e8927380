//! Generic decoded values
//!
//! The decoding collaborator hands the engine one [`GenericValue`] per delta. The
//! engine validates the whole value against the declared [`FieldType`] before any
//! in-place mutation, which is what makes a single delta all-or-nothing.

use crate::errors::{ConfigError, ConfigResult};
use crate::identifiers::RecordId;
use crate::schema::{FieldType, RecordSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tagged-variant form of a decoded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GenericValue {
    /// Null
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
    Record(GenericRecord),
    /// Ordered sequence
    Array(Vec<GenericValue>),
    /// String-keyed mapping
    Map(BTreeMap<String, GenericValue>),
}

/// Decoded record payload
///
/// `id` is `None` when the control plane leaves identifier assignment to the
/// endpoint; the engine mints a fresh [`RecordId`] when the record is installed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericRecord {
    /// Identifier assigned upstream, if any
    pub id: Option<RecordId>,
    /// Field values by name; omitted fields take the schema default
    pub fields: BTreeMap<String, GenericValue>,
}

impl GenericRecord {
    /// Empty record without an identifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty record carrying an upstream identifier
    pub fn with_id(id: RecordId) -> Self {
        Self {
            id: Some(id),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<GenericValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Read a field
    pub fn get(&self, name: &str) -> Option<&GenericValue> {
        self.fields.get(name)
    }

    /// Check this record against a record schema
    pub fn validate(&self, schema: &RecordSchema, path: &str, max_depth: usize) -> ConfigResult<()> {
        self.validate_at(schema, path, 0, max_depth)
    }

    fn validate_at(
        &self,
        schema: &RecordSchema,
        path: &str,
        depth: usize,
        max_depth: usize,
    ) -> ConfigResult<()> {
        if self.id.is_some_and(|id| id.is_nil()) {
            return Err(ConfigError::schema_mismatch(
                path,
                format!("record {}", schema.name),
                "record with nil identifier",
            ));
        }
        for (name, value) in &self.fields {
            let field_path = join_field(path, name);
            let Some(field) = schema.field(name) else {
                return Err(ConfigError::schema_mismatch(
                    field_path,
                    format!("field of record {}", schema.name),
                    "unknown field",
                ));
            };
            value.validate_at(&field.ty, &field_path, depth + 1, max_depth)?;
        }
        Ok(())
    }
}

impl GenericValue {
    /// Short name of the variant, used in mismatch reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            GenericValue::Null => "null",
            GenericValue::Boolean(_) => "boolean",
            GenericValue::Int(_) => "int",
            GenericValue::Long(_) => "long",
            GenericValue::Float(_) => "float",
            GenericValue::Double(_) => "double",
            GenericValue::String(_) => "string",
            GenericValue::Bytes(_) => "bytes",
            GenericValue::Enum(_) => "enum",
            GenericValue::Record(_) => "record",
            GenericValue::Array(_) => "array",
            GenericValue::Map(_) => "map",
        }
    }

    /// Check the shape of this value against a declared type
    ///
    /// Pure: nothing is mutated. `path` prefixes mismatch reports; `max_depth`
    /// bounds nesting so a hostile payload cannot exhaust the stack.
    pub fn validate(&self, ty: &FieldType, path: &str, max_depth: usize) -> ConfigResult<()> {
        self.validate_at(ty, path, 0, max_depth)
    }

    fn validate_at(
        &self,
        ty: &FieldType,
        path: &str,
        depth: usize,
        max_depth: usize,
    ) -> ConfigResult<()> {
        if depth > max_depth {
            return Err(ConfigError::invalid_operation(format!(
                "value at {path} nests deeper than {max_depth} levels"
            )));
        }
        let mismatch = || ConfigError::schema_mismatch(path, ty.to_string(), self.kind_name());

        match (ty, self) {
            (FieldType::Optional(_), GenericValue::Null) => Ok(()),
            (FieldType::Optional(inner), value) => {
                value.validate_at(inner, path, depth + 1, max_depth)
            }
            (FieldType::Null, GenericValue::Null)
            | (FieldType::Boolean, GenericValue::Boolean(_))
            | (FieldType::Int, GenericValue::Int(_))
            | (FieldType::Long, GenericValue::Long(_))
            | (FieldType::Float, GenericValue::Float(_))
            | (FieldType::Double, GenericValue::Double(_))
            | (FieldType::String, GenericValue::String(_))
            | (FieldType::Bytes, GenericValue::Bytes(_)) => Ok(()),
            (FieldType::Enum(symbols), GenericValue::Enum(symbol)) => {
                if symbols.contains(symbol) {
                    Ok(())
                } else {
                    Err(ConfigError::schema_mismatch(
                        path,
                        ty.to_string(),
                        format!("enum symbol {symbol:?}"),
                    ))
                }
            }
            (FieldType::Record(schema), GenericValue::Record(record)) => {
                record.validate_at(schema, path, depth, max_depth)
            }
            (FieldType::Array(element), GenericValue::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    item.validate_at(element, &join_index(path, index), depth + 1, max_depth)?;
                }
                Ok(())
            }
            (FieldType::Map(value_ty), GenericValue::Map(entries)) => {
                for (key, value) in entries {
                    value.validate_at(value_ty, &join_key(path, key), depth + 1, max_depth)?;
                }
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }
}

/// `parent.field`, or just `field` at the top
pub fn join_field(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

/// `parent[index]`
pub fn join_index(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// `parent["key"]`
pub fn join_key(path: &str, key: &str) -> String {
    format!("{path}[{key:?}]")
}

impl From<bool> for GenericValue {
    fn from(value: bool) -> Self {
        GenericValue::Boolean(value)
    }
}

impl From<i32> for GenericValue {
    fn from(value: i32) -> Self {
        GenericValue::Int(value)
    }
}

impl From<i64> for GenericValue {
    fn from(value: i64) -> Self {
        GenericValue::Long(value)
    }
}

impl From<f64> for GenericValue {
    fn from(value: f64) -> Self {
        GenericValue::Double(value)
    }
}

impl From<&str> for GenericValue {
    fn from(value: &str) -> Self {
        GenericValue::String(value.to_string())
    }
}

impl From<String> for GenericValue {
    fn from(value: String) -> Self {
        GenericValue::String(value)
    }
}

impl From<GenericRecord> for GenericValue {
    fn from(record: GenericRecord) -> Self {
        GenericValue::Record(record)
    }
}

impl From<Vec<GenericValue>> for GenericValue {
    fn from(items: Vec<GenericValue>) -> Self {
        GenericValue::Array(items)
    }
}
