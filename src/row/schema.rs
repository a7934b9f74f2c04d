//! Target-index field metadata (§3 "Row": "first *k* key fields declared by
//! the index, where *k* = `n_unique_in_tree`"; §4.7 row-converter rules).
//!
//! Grounded on the teacher's `storage/schema/schema.rs::Schema` /
//! `storage/schema/types.rs::Type`, generalized with the column kinds the
//! row converter needs (virtual, FTS doc-id, externally-stored, multi-value)
//! that the teacher's heap-table schema has no notion of.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Int64,
    Float64,
    Bytes,
    Text,
}

/// The resolution strategy for one target-index column (§4.7 "Resolve each
/// target field").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Direct copy from the clustered row.
    Physical,
    /// Computed by the collaborator (`collab::virtual_column`).
    Virtual,
    /// FTS doc-id: read from the row or generated by the builder.
    FtsDocId,
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
    pub kind: ColumnKind,
    pub nullable: bool,
    /// `Some(n)` truncates the value to its first `n` characters/bytes
    /// before it is stored (§4.7 "column prefix truncation").
    pub prefix_len: Option<usize>,
    /// Values are stored off-page and referenced by pointer (§4.7 "BLOB").
    pub external: bool,
    /// "big" types always contribute a 2-byte length header regardless of
    /// actual length (§4.7 extra-size rule).
    pub is_big: bool,
    /// Multi-value column: the converter emits one tuple per value,
    /// sharing the other fields (§4.7 "For multi-value columns").
    pub multi_value: bool,
    /// Source-row column index this target column is read from, when
    /// `kind == Physical` or `kind == FtsDocId` with `fts_doc_id_generated
    /// == false`.
    pub source_index: usize,
    /// `kind == FtsDocId` only: `true` if the builder mints the doc-id from
    /// its own monotonic counter, `false` if it is read from the row at
    /// `source_index` (§4.7 "`is_generated()` governs the choice").
    pub fts_doc_id_generated: bool,
}

impl ColumnSpec {
    pub fn physical(name: &str, ty: ColumnType, source_index: usize) -> Self {
        Self {
            name: name.to_string(),
            ty,
            kind: ColumnKind::Physical,
            nullable: false,
            prefix_len: None,
            external: false,
            is_big: false,
            multi_value: false,
            source_index,
            fts_doc_id_generated: false,
        }
    }

    pub fn virtual_column(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            kind: ColumnKind::Virtual,
            nullable: false,
            prefix_len: None,
            external: false,
            is_big: false,
            multi_value: false,
            source_index: 0,
            fts_doc_id_generated: false,
        }
    }

    /// FTS doc-id minted by the builder's own counter.
    pub fn fts_doc_id_generated(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ColumnType::Int64,
            kind: ColumnKind::FtsDocId,
            nullable: false,
            prefix_len: None,
            external: false,
            is_big: false,
            multi_value: false,
            source_index: 0,
            fts_doc_id_generated: true,
        }
    }

    /// FTS doc-id read from the clustered row at `source_index`.
    pub fn fts_doc_id_from_row(name: &str, source_index: usize) -> Self {
        Self {
            name: name.to_string(),
            ty: ColumnType::Int64,
            kind: ColumnKind::FtsDocId,
            nullable: false,
            prefix_len: None,
            external: false,
            is_big: false,
            multi_value: false,
            source_index,
            fts_doc_id_generated: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_prefix(mut self, len: usize) -> Self {
        self.prefix_len = Some(len);
        self
    }

    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }

    pub fn big(mut self) -> Self {
        self.is_big = true;
        self
    }

    pub fn multi_value(mut self) -> Self {
        self.multi_value = true;
        self
    }

    fn is_variable_length(&self) -> bool {
        matches!(self.ty, ColumnType::Bytes | ColumnType::Text)
    }

    /// §4.7 "extra-size rule": bytes this column contributes to the
    /// variable-length-header / null-bitmap tally, independent of its
    /// actual runtime length (that part is added by the converter).
    pub fn extra_header_bytes(&self, value_len: usize) -> usize {
        if self.external {
            return 2;
        }
        if self.is_variable_length() {
            if !self.is_big && value_len < 128 {
                return 1;
            }
            return 2;
        }
        0
    }
}

/// Target-index descriptor (§3 "Builder": "target index descriptor").
#[derive(Debug, Clone)]
pub struct IndexSchema {
    pub index_name: String,
    pub columns: Vec<ColumnSpec>,
    /// `k`: number of leading columns that form the comparison key (§3).
    pub n_unique_in_tree: usize,
    pub unique: bool,
    pub clustered: bool,
    pub is_fts: bool,
}

impl IndexSchema {
    pub fn key_columns(&self) -> &[ColumnSpec] {
        &self.columns[..self.n_unique_in_tree]
    }

    /// Fast-path eligibility for the sort comparator (§4.1): a single
    /// integer key column with no collation/charset concerns.
    pub fn is_single_int_key(&self) -> bool {
        self.n_unique_in_tree == 1 && self.columns[0].ty == ColumnType::Int64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_header_bytes_follows_the_475_rule() {
        let short_varlen = ColumnSpec::physical("c", ColumnType::Bytes, 0);
        assert_eq!(short_varlen.extra_header_bytes(10), 1);
        assert_eq!(short_varlen.extra_header_bytes(200), 2);

        let big = ColumnSpec::physical("c", ColumnType::Bytes, 0).big();
        assert_eq!(big.extra_header_bytes(1), 2);

        let external = ColumnSpec::physical("c", ColumnType::Bytes, 0).external();
        assert_eq!(external.extra_header_bytes(1), 2);

        let fixed = ColumnSpec::physical("c", ColumnType::Int64, 0);
        assert_eq!(fixed.extra_header_bytes(8), 0);
    }
}
