//! Stable identifiers for configuration records
//!
//! Every record-typed node in the configuration tree carries a [`RecordId`] for
//! its whole lifetime. Partial deltas address nodes through these identifiers
//! instead of walking a path from the root.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of a configuration record
///
/// Opaque and comparable. Uniqueness is scoped to the whole tree. The nil UUID is
/// reserved as the root sentinel of [`TargetIndex`] and is never minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Create a new random record ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create from the raw 128-bit value
    pub fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }

    /// Get the inner UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Raw 128-bit value, as carried by the transport
    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }

    /// Whether this is the reserved nil value
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record-{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("record-").unwrap_or(s);
        Uuid::parse_str(raw).map(Self)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RecordId> for Uuid {
    fn from(record_id: RecordId) -> Self {
        record_id.0
    }
}

/// Address of the node a delta applies to
///
/// On the wire the transport carries a plain 128-bit integer: `0` designates the
/// whole tree, any other value is the identifier of a registered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetIndex {
    /// The root record
    Root,
    /// A record registered under this identifier
    Record(RecordId),
}

impl TargetIndex {
    /// Raw value reserved for the root sentinel
    pub const ROOT_RAW: u128 = 0;

    /// Decode the transport representation
    pub fn from_raw(raw: u128) -> Self {
        if raw == Self::ROOT_RAW {
            TargetIndex::Root
        } else {
            TargetIndex::Record(RecordId::from_u128(raw))
        }
    }

    /// Encode to the transport representation
    pub fn to_raw(self) -> u128 {
        match self {
            TargetIndex::Root => Self::ROOT_RAW,
            TargetIndex::Record(id) => id.as_u128(),
        }
    }

    /// Check if this addresses the root sentinel
    pub fn is_root(&self) -> bool {
        matches!(self, TargetIndex::Root)
    }
}

impl From<RecordId> for TargetIndex {
    fn from(id: RecordId) -> Self {
        TargetIndex::Record(id)
    }
}

impl fmt::Display for TargetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetIndex::Root => write!(f, "root"),
            TargetIndex::Record(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_never_nil() {
        for _ in 0..64 {
            assert!(!RecordId::new().is_nil());
        }
    }

    #[test]
    fn target_index_round_trips_through_raw() {
        let id = RecordId::new();
        assert_eq!(TargetIndex::from_raw(id.as_u128()), TargetIndex::Record(id));
        assert_eq!(TargetIndex::Record(id).to_raw(), id.as_u128());
        assert_eq!(TargetIndex::from_raw(0), TargetIndex::Root);
        assert_eq!(TargetIndex::Root.to_raw(), 0);
    }

    #[test]
    fn record_id_parses_display_form() {
        let id = RecordId::new();
        let parsed: RecordId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        let bare: RecordId = id.uuid().to_string().parse().unwrap();
        assert_eq!(bare, id);
    }
}
