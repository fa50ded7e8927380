//! Configuration content hashing
//!
//! A [`ConfigurationHash`] is a SHA-256 digest over a canonical encoding of the
//! field content. Record identifiers are excluded, so two trees built from the
//! same values hash equal even when their records were minted independently.

use epconf_tree::{RecordView, ViewValue};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// 32-byte digest of configuration content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigurationHash(pub [u8; 32]);

impl ConfigurationHash {
    /// Hash the content below `root`
    pub fn of(root: &RecordView) -> Self {
        let mut hasher = Sha256::new();
        encode_record(&mut hasher, root);
        let result = hasher.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        Self(output)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ConfigurationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Anything that can report the hash of the configuration it holds
pub trait ConfigurationHashContainer {
    /// Digest of the current content
    fn configuration_hash(&self) -> ConfigurationHash;
}

fn encode_len(hasher: &mut Sha256, len: usize) {
    hasher.update((len as u64).to_be_bytes());
}

fn encode_str(hasher: &mut Sha256, value: &str) {
    encode_len(hasher, value.len());
    hasher.update(value.as_bytes());
}

fn encode_record(hasher: &mut Sha256, record: &RecordView) {
    hasher.update([b'R']);
    encode_str(hasher, record.schema_name());
    let fields: Vec<_> = record.fields().collect();
    encode_len(hasher, fields.len());
    for (name, value) in fields {
        encode_str(hasher, name);
        encode_value(hasher, value);
    }
}

fn encode_value(hasher: &mut Sha256, value: &ViewValue) {
    match value {
        ViewValue::Null => hasher.update([b'n']),
        ViewValue::Boolean(v) => hasher.update([b'b', u8::from(*v)]),
        ViewValue::Int(v) => {
            hasher.update([b'i']);
            hasher.update(v.to_be_bytes());
        }
        ViewValue::Long(v) => {
            hasher.update([b'l']);
            hasher.update(v.to_be_bytes());
        }
        ViewValue::Float(v) => {
            hasher.update([b'f']);
            hasher.update(v.to_bits().to_be_bytes());
        }
        ViewValue::Double(v) => {
            hasher.update([b'd']);
            hasher.update(v.to_bits().to_be_bytes());
        }
        ViewValue::String(v) => {
            hasher.update([b's']);
            encode_str(hasher, v);
        }
        ViewValue::Bytes(v) => {
            hasher.update([b'y']);
            encode_len(hasher, v.len());
            hasher.update(v);
        }
        ViewValue::Enum(v) => {
            hasher.update([b'e']);
            encode_str(hasher, v);
        }
        ViewValue::Record(record) => encode_record(hasher, record),
        ViewValue::Array(items) => {
            hasher.update([b'a']);
            encode_len(hasher, items.len());
            for item in items {
                encode_value(hasher, item);
            }
        }
        ViewValue::Map(entries) => {
            hasher.update([b'm']);
            encode_len(hasher, entries.len());
            for (key, item) in entries {
                encode_str(hasher, key);
                encode_value(hasher, item);
            }
        }
    }
}
