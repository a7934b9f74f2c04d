//! Builder duplicate detection (`spec.md` §4.8).
//!
//! Three checks, cheapest first: an in-buffer adjacent comparison the
//! converter runs on every tuple it copies, a cross-buffer merge pass over
//! single-run spill files before the main merge, and the main merge's own
//! comparator (`sort::merge_cursor`, already wired to a `DuplicateSink`).
//! This module covers the first two; the third already lives in
//! `sort::merge_sort`.

use std::path::Path;

use crate::error::{DuplicateInfo, IxError, IxResult};
use crate::row::{IndexSchema, Tuple};
use crate::sort::buffer::DuplicateSink;
use crate::sort::file_reader::FileReader;
use crate::sort::merge_cursor::MergeCursor;
use crate::sort::spill::RunRange;

/// In-buffer adjacent check (§4.8 "fast path, clustered"): compares each
/// newly copied tuple's key fields against the previous one copied,
/// failing immediately instead of waiting for a later merge pass to notice.
#[derive(Default)]
pub struct AdjacentDupChecker {
    prev: Option<Tuple>,
}

impl AdjacentDupChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call after every successful copy into the sort buffer (§4.8: "after
    /// each successful copy the builder compares the new last tuple's
    /// unique-key fields to the previously saved `prev_fields`").
    pub fn check(&mut self, tuple: &Tuple, schema: &IndexSchema) -> IxResult<()> {
        if schema.unique {
            if let Some(prev) = &self.prev {
                if prev.key_equals(tuple, schema) {
                    return Err(IxError::DuplicateKey(DuplicateInfo {
                        index_name: schema.index_name.clone(),
                        first_key: prev.key_repr(schema),
                        second_key: tuple.key_repr(schema),
                    }));
                }
            }
        }
        self.prev = Some(tuple.clone());
        Ok(())
    }
}

/// Cross-buffer check (§4.8): for a unique index whose input arrived
/// pre-sorted so each thread's spill file holds exactly one run, merge just
/// those single runs and report the first duplicate found across the
/// run/file boundary. Writes nothing; this is a verification-only pass, the
/// real merge happens in `sort::merge_sort`.
pub fn check_duplicates(
    files: &[(&Path, RunRange)],
    schema: &IndexSchema,
    io_buffer_bytes: usize,
) -> IxResult<()> {
    if !schema.unique || files.len() < 2 {
        return Ok(());
    }

    let readers: IxResult<Vec<FileReader>> = files
        .iter()
        .map(|(path, range)| FileReader::open(path, io_buffer_bytes, range.start..range.end, schema))
        .collect();
    let mut cursor = MergeCursor::new(readers?, schema)?;
    let mut sink = DuplicateSink::new();
    while cursor.next(Some(&mut sink))?.is_some() {}

    if let Some(pair) = sink.take() {
        return Err(IxError::DuplicateKey(DuplicateInfo {
            index_name: schema.index_name.clone(),
            first_key: pair.first.key_repr(schema),
            second_key: pair.second.key_repr(schema),
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{ColumnSpec, ColumnType, Field, FieldValue};
    use crate::sort::buffer::SortBuffer;
    use crate::sort::spill::SpillWriter;

    fn schema() -> IndexSchema {
        IndexSchema {
            index_name: "idx".into(),
            columns: vec![ColumnSpec::physical("k", ColumnType::Int64, 0)],
            n_unique_in_tree: 1,
            unique: true,
            clustered: true,
            is_fts: false,
        }
    }

    fn tuple(v: i64) -> Tuple {
        Tuple::new(vec![Field::new(FieldValue::Int64(v))])
    }

    #[test]
    fn adjacent_checker_passes_strictly_increasing_keys() {
        let schema = schema();
        let mut checker = AdjacentDupChecker::new();
        for v in [1, 2, 3] {
            checker.check(&tuple(v), &schema).unwrap();
        }
    }

    #[test]
    fn adjacent_checker_rejects_repeated_key() {
        let schema = schema();
        let mut checker = AdjacentDupChecker::new();
        checker.check(&tuple(1), &schema).unwrap();
        assert!(checker.check(&tuple(1), &schema).is_err());
    }

    #[test]
    fn cross_buffer_check_finds_duplicate_across_files() {
        let schema = schema();
        let tmp = tempfile::tempdir().unwrap();

        let mut writer_a = SpillWriter::new(tmp.path(), 4096).unwrap();
        let mut buf_a = SortBuffer::new(1 << 20, 100);
        buf_a.push_fields(tuple(1));
        buf_a.push_fields(tuple(5));
        buf_a.sort(&schema, None);
        let range_a = writer_a.write_run(&buf_a, &schema).unwrap();

        let mut writer_b = SpillWriter::new(tmp.path(), 4096).unwrap();
        let mut buf_b = SortBuffer::new(1 << 20, 100);
        buf_b.push_fields(tuple(5));
        buf_b.push_fields(tuple(9));
        buf_b.sort(&schema, None);
        let range_b = writer_b.write_run(&buf_b, &schema).unwrap();

        let files = [
            (writer_a.path(), range_a),
            (writer_b.path(), range_b),
        ];
        assert!(check_duplicates(&files, &schema, 4096).is_err());
    }

    #[test]
    fn cross_buffer_check_passes_disjoint_files() {
        let schema = schema();
        let tmp = tempfile::tempdir().unwrap();

        let mut writer_a = SpillWriter::new(tmp.path(), 4096).unwrap();
        let mut buf_a = SortBuffer::new(1 << 20, 100);
        buf_a.push_fields(tuple(1));
        buf_a.push_fields(tuple(2));
        buf_a.sort(&schema, None);
        let range_a = writer_a.write_run(&buf_a, &schema).unwrap();

        let mut writer_b = SpillWriter::new(tmp.path(), 4096).unwrap();
        let mut buf_b = SortBuffer::new(1 << 20, 100);
        buf_b.push_fields(tuple(3));
        buf_b.push_fields(tuple(4));
        buf_b.sort(&schema, None);
        let range_b = writer_b.write_run(&buf_b, &schema).unwrap();

        let files = [
            (writer_a.path(), range_a),
            (writer_b.path(), range_b),
        ];
        check_duplicates(&files, &schema, 4096).unwrap();
    }
}
