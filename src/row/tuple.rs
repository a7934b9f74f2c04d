//! `Row` and `Tuple` (`spec.md` §3).
//!
//! Grounded on the teacher's `storage/tuple/tuple.rs::Tuple` /
//! `WrappedTuple`, generalized to carry the MVCC transaction-id/rollback
//! pointer §3 gives to clustered rows, and to compare on a configurable key
//! prefix (`n_unique_in_tree`) instead of the teacher's single fixed
//! `key_field` index.

use std::cmp::Ordering;

use crate::row::field::Field;
use crate::row::schema::IndexSchema;

/// A row read from the source clustered index (§3 "Row"). Carries the
/// implicit transaction-id and rollback pointer an MVCC clustered row has;
/// both are opaque to everything past the parallel scan.
#[derive(Debug, Clone)]
pub struct Row {
    pub fields: Vec<Field>,
    pub trx_id: u64,
    pub roll_ptr: u64,
}

impl Row {
    pub fn new(fields: Vec<Field>, trx_id: u64, roll_ptr: u64) -> Self {
        Self {
            fields,
            trx_id,
            roll_ptr,
        }
    }

    pub fn get(&self, i: usize) -> &Field {
        &self.fields[i]
    }
}

/// The in-memory canonical sort-buffer representation of one target-index
/// record (§3 "Tuple"). Invariant: `fields[0..n]` carry the index key order,
/// i.e. `fields[0..schema.n_unique_in_tree]` is exactly the comparison key.
#[derive(Debug, Clone)]
pub struct Tuple {
    pub fields: Vec<Field>,
}

impl Tuple {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn get_field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    /// Total payload bytes, used by the sort buffer's `will_fit` check and
    /// by §4.7's `data_size` tally.
    pub fn data_size(&self) -> usize {
        self.fields.iter().map(|f| f.value.byte_len()).sum()
    }

    /// Compare two tuples on their key prefix only (§3 "Comparison is
    /// lexicographic on the first *k* key fields").
    ///
    /// Matches §4.1's "introspective comparator": a single-int-key schema
    /// takes the fast path of comparing one `i64` directly; otherwise every
    /// key field is compared in turn.
    pub fn compare_key(&self, other: &Tuple, schema: &IndexSchema) -> Ordering {
        if schema.is_single_int_key() {
            let a = self.fields[0].value.as_i64();
            let b = other.fields[0].value.as_i64();
            return a.cmp(&b);
        }
        for i in 0..schema.n_unique_in_tree {
            let ord = self.fields[i]
                .value
                .partial_cmp(&other.fields[i].value)
                .unwrap_or(Ordering::Equal);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// True iff every key field (0..n_unique_in_tree) compares equal, used
    /// by the duplicate-detection paths of §4.8.
    pub fn key_equals(&self, other: &Tuple, schema: &IndexSchema) -> bool {
        self.compare_key(other, schema) == Ordering::Equal
    }

    /// Human-readable key rendering for duplicate-key error reporting (§7
    /// "the first offending record is reported ... together with the index
    /// identity").
    pub fn key_repr(&self, schema: &IndexSchema) -> String {
        let parts: Vec<String> = self.fields[..schema.n_unique_in_tree]
            .iter()
            .map(|f| f.value.to_string())
            .collect();
        format!("({})", parts.join(", "))
    }
}
