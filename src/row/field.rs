//! Typed field values (`spec.md` §3 "Row"/"Tuple").
//!
//! Grounded on the teacher's `storage/tuple/cell.rs::Cell` enum; extended
//! with `Null` as a first-class variant (the teacher's `Cell::Null` exists
//! but its comparator `todo!()`s on it) and an explicit externally-stored
//! marker, since §3 requires rows to carry "possibly externally-stored-BLOB"
//! fields and §4.7 requires the converter to "set external-reference".

use std::cmp::Ordering;
use std::fmt;

/// The in-memory value of one field. Variable-length values
/// (`Bytes`/`Text`) may additionally be marked `external` on the owning
/// `Field`, meaning only a BLOB pointer is stored in-page.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Bytes(Vec<u8>),
    Text(String),
}

impl FieldValue {
    /// Fixed-size fast path used by the sort comparator (§4.1 "an
    /// introspective comparator that ... has a fast path for single-column
    /// integer keys").
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Number of payload bytes this value occupies once copied into a sort
    /// buffer / page, ignoring any variable-length header (§4.7 `data_size`).
    pub fn byte_len(&self) -> usize {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int64(_) => 8,
            FieldValue::Float64(_) => 8,
            FieldValue::Bytes(b) => b.len(),
            FieldValue::Text(s) => s.len(),
        }
    }

    /// Multibyte-aware prefix truncation (§4.7 "column prefix truncation").
    /// For `Text`, truncates on a `char` boundary so multibyte UTF-8
    /// sequences are never split; for `Bytes`, truncates on raw bytes.
    pub fn truncate_prefix(&self, prefix_len: usize) -> FieldValue {
        match self {
            FieldValue::Text(s) => {
                let truncated: String = s.chars().take(prefix_len).collect();
                FieldValue::Text(truncated)
            }
            FieldValue::Bytes(b) => {
                let n = prefix_len.min(b.len());
                FieldValue::Bytes(b[..n].to_vec())
            }
            other => other.clone(),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use FieldValue::*;
        match (self, other) {
            // NULL sorts before every non-NULL value, matching the
            // leaf-page "non-decreasing key order" invariant (§8 property 4)
            // extended to nullable key columns.
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) => Some(Ordering::Less),
            (_, Null) => Some(Ordering::Greater),
            (Bool(a), Bool(b)) => a.partial_cmp(b),
            (Int64(a), Int64(b)) => a.partial_cmp(b),
            (Float64(a), Float64(b)) => a.partial_cmp(b),
            (Bytes(a), Bytes(b)) => a.partial_cmp(b),
            (Text(a), Text(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Int64(v) => write!(f, "{}", v),
            FieldValue::Float64(v) => write!(f, "{}", v),
            FieldValue::Bytes(v) => write!(f, "{:?}", v),
            FieldValue::Text(v) => write!(f, "{:?}", v),
        }
    }
}

/// One field inside a `Tuple` (§3: "an array of `(ptr, length, flags)`
/// fields"). `external` corresponds to the BLOB flag; `flags` captures
/// whatever else the row converter needs (here, just those two bits plus
/// whether this field participates in the null-bitmap).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub value: FieldValue,
    /// True if the column is declared nullable (contributes to the
    /// null-bitmap per §4.7's extra-size rule, regardless of the value).
    pub nullable: bool,
    /// True if this field's payload is stored off-page and only a pointer
    /// lives here (§4.7 "BLOB (set external-reference)").
    pub external: bool,
}

impl Field {
    pub fn new(value: FieldValue) -> Self {
        Self {
            value,
            nullable: false,
            external: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}
