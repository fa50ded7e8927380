//! Static schema description
//!
//! Schemas are compiled elsewhere; the engine only needs enough of a description
//! to check the shape of a decoded value before it mutates anything, and to build
//! the default record served before the first delta arrives.

use crate::value::{GenericRecord, GenericValue};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Declared type of a field, array element or map value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Null
    Null,
    /// Boolean
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Raw bytes
    Bytes,
    /// Enumeration over the given symbols
    Enum(Vec<String>),
    /// Nested record, addressable by identifier
    Record(Arc<RecordSchema>),
    /// Ordered sequence
    Array(Box<FieldType>),
    /// String-keyed mapping
    Map(Box<FieldType>),
    /// Union of null and the inner type
    Optional(Box<FieldType>),
}

impl FieldType {
    /// Nested record type
    pub fn record(schema: Arc<RecordSchema>) -> Self {
        FieldType::Record(schema)
    }

    /// Array of the given element type
    pub fn array(element: FieldType) -> Self {
        FieldType::Array(Box::new(element))
    }

    /// Map with the given value type
    pub fn map(value: FieldType) -> Self {
        FieldType::Map(Box::new(value))
    }

    /// Nullable wrapper
    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    /// Enumeration type
    pub fn enumeration<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Self {
        FieldType::Enum(symbols.into_iter().map(Into::into).collect())
    }

    /// Element type if this is an array
    pub fn array_element(&self) -> Option<&FieldType> {
        match self {
            FieldType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Value type if this is a map
    pub fn map_value(&self) -> Option<&FieldType> {
        match self {
            FieldType::Map(value) => Some(value),
            _ => None,
        }
    }

    /// Default value per the zero-value rules
    pub fn default_value(&self) -> GenericValue {
        match self {
            FieldType::Null | FieldType::Optional(_) => GenericValue::Null,
            FieldType::Boolean => GenericValue::Boolean(false),
            FieldType::Int => GenericValue::Int(0),
            FieldType::Long => GenericValue::Long(0),
            FieldType::Float => GenericValue::Float(0.0),
            FieldType::Double => GenericValue::Double(0.0),
            FieldType::String => GenericValue::String(String::new()),
            FieldType::Bytes => GenericValue::Bytes(Vec::new()),
            FieldType::Enum(symbols) => {
                GenericValue::Enum(symbols.first().cloned().unwrap_or_default())
            }
            FieldType::Record(schema) => GenericValue::Record(schema.default_record()),
            FieldType::Array(_) => GenericValue::Array(Vec::new()),
            FieldType::Map(_) => GenericValue::Map(BTreeMap::new()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Null => write!(f, "null"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Int => write!(f, "int"),
            FieldType::Long => write!(f, "long"),
            FieldType::Float => write!(f, "float"),
            FieldType::Double => write!(f, "double"),
            FieldType::String => write!(f, "string"),
            FieldType::Bytes => write!(f, "bytes"),
            FieldType::Enum(symbols) => write!(f, "enum{{{}}}", symbols.join(",")),
            FieldType::Record(schema) => write!(f, "record {}", schema.name),
            FieldType::Array(element) => write!(f, "array<{element}>"),
            FieldType::Map(value) => write!(f, "map<{value}>"),
            FieldType::Optional(inner) => write!(f, "optional<{inner}>"),
        }
    }
}

/// One named field of a record schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: FieldType,
    /// Explicit default, overriding the zero value
    pub default: Option<GenericValue>,
}

impl FieldSchema {
    /// Value used when a decoded record omits this field
    pub fn default_value(&self) -> GenericValue {
        self.default
            .clone()
            .unwrap_or_else(|| self.ty.default_value())
    }
}

/// Schema of a configuration record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Record type name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    /// Start building a schema
    pub fn builder(name: impl Into<String>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Position of a field in declaration order
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The empty record served before any delta has been applied
    pub fn default_record(&self) -> GenericRecord {
        GenericRecord {
            id: None,
            fields: self
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.default_value()))
                .collect(),
        }
    }
}

/// Builder for [`RecordSchema`]
#[derive(Debug)]
pub struct RecordSchemaBuilder {
    name: String,
    fields: Vec<FieldSchema>,
}

impl RecordSchemaBuilder {
    /// Add a field using the zero-value default
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            ty,
            default: None,
        });
        self
    }

    /// Add a field with an explicit default
    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        ty: FieldType,
        default: GenericValue,
    ) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            ty,
            default: Some(default),
        });
        self
    }

    /// Finish the schema
    pub fn build(self) -> Arc<RecordSchema> {
        Arc::new(RecordSchema {
            name: self.name,
            fields: self.fields,
        })
    }
}
