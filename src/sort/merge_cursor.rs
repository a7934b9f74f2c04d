//! N-way merge cursor (`spec.md` §4.3 "Merge_cursor").
//!
//! Wraps one `FileReader` per input run plus a min-heap ordering cursors by
//! current key, so `next()` always yields the globally smallest remaining
//! tuple. Ties are broken by reader id (lowest wins) — an explicit decision
//! recorded in DESIGN.md for the open question of how to make the merge
//! deterministic when two runs hold equal keys.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::PathBuf;

use crate::error::IxResult;
use crate::row::{IndexSchema, Tuple};
use crate::sort::buffer::DuplicateSink;
use crate::sort::file_reader::FileReader;

struct HeapEntry {
    tuple: Tuple,
    reader_id: usize,
}

/// Merges `N` sorted runs, each behind its own `FileReader`, into one
/// globally sorted stream.
pub struct MergeCursor<'a> {
    readers: Vec<FileReader<'a>>,
    heap: BinaryHeap<HeapEntryWithSchema<'a>>,
    schema: &'a IndexSchema,
}

/// `BinaryHeap` needs an owned `Ord` type; this bundles the schema pointer
/// in so comparisons don't need a second parameter threaded through.
struct HeapEntryWithSchema<'a> {
    entry: HeapEntry,
    schema: &'a IndexSchema,
}

impl<'a> PartialEq for HeapEntryWithSchema<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.entry.tuple.key_equals(&other.entry.tuple, self.schema)
            && self.entry.reader_id == other.entry.reader_id
    }
}
impl<'a> Eq for HeapEntryWithSchema<'a> {}

impl<'a> PartialOrd for HeapEntryWithSchema<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Ord for HeapEntryWithSchema<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entry
            .tuple
            .compare_key(&other.entry.tuple, self.schema)
            .then_with(|| self.entry.reader_id.cmp(&other.entry.reader_id))
            .reverse()
    }
}

impl<'a> MergeCursor<'a> {
    pub fn new(mut readers: Vec<FileReader<'a>>, schema: &'a IndexSchema) -> IxResult<Self> {
        let mut heap = BinaryHeap::with_capacity(readers.len());
        for (reader_id, reader) in readers.iter_mut().enumerate() {
            if let Some(tuple) = reader.next()? {
                heap.push(HeapEntryWithSchema {
                    entry: HeapEntry { tuple, reader_id },
                    schema,
                });
            }
        }
        Ok(Self {
            readers,
            heap,
            schema,
        })
    }

    /// Pops the globally smallest tuple, refilling from the run it came
    /// from, and reports a cross-run duplicate to `dup_sink` when the
    /// returned tuple's key equals the previous one (§4.8 "across runs").
    pub fn next(&mut self, dup_sink: Option<&mut DuplicateSink>) -> IxResult<Option<Tuple>> {
        let popped = match self.heap.pop() {
            Some(e) => e,
            None => return Ok(None),
        };
        let HeapEntry { tuple, reader_id } = popped.entry;

        if let Some(next_tuple) = self.readers[reader_id].next()? {
            self.heap.push(HeapEntryWithSchema {
                entry: HeapEntry {
                    tuple: next_tuple,
                    reader_id,
                },
                schema: self.schema,
            });
        }

        if let (Some(sink), Some(peeked)) = (dup_sink, self.heap.peek()) {
            if self.schema.unique && tuple.key_equals(&peeked.entry.tuple, self.schema) {
                sink.report(tuple.clone(), peeked.entry.tuple.clone());
            }
        }

        Ok(Some(tuple))
    }
}

/// Identifies a single input run for diagnostics (§7 duplicate-key
/// reporting references the offending source, not just the key).
#[derive(Debug, Clone)]
pub struct RunSource {
    pub path: PathBuf,
    pub reader_id: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{ColumnSpec, ColumnType, Field, FieldValue, Tuple as RowTuple};
    use crate::sort::buffer::SortBuffer;
    use std::io::Write;

    fn schema() -> IndexSchema {
        IndexSchema {
            index_name: "idx".into(),
            columns: vec![ColumnSpec::physical("k", ColumnType::Int64, 0)],
            n_unique_in_tree: 1,
            unique: true,
            clustered: false,
            is_fts: false,
        }
    }

    fn write_run(values: &[i64], schema: &IndexSchema) -> (tempfile::NamedTempFile, u64) {
        let mut buf = SortBuffer::new(1 << 20, 100);
        for v in values {
            buf.push_fields(RowTuple::new(vec![Field::new(FieldValue::Int64(*v))]));
        }
        buf.sort(schema, None);
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut file = tmp.reopen().unwrap();
        let mut offset = 0u64;
        buf.serialize(schema, 128, |chunk| {
            file.write_all(chunk).unwrap();
            offset += chunk.len() as u64;
            Ok(())
        })
        .unwrap();
        (tmp, offset)
    }

    #[test]
    fn merges_two_runs_into_global_order() {
        let schema = schema();
        let (run_a, len_a) = write_run(&[1, 4, 7], &schema);
        let (run_b, len_b) = write_run(&[2, 3, 8], &schema);

        let reader_a = FileReader::open(run_a.path(), 128, 0..len_a, &schema).unwrap();
        let reader_b = FileReader::open(run_b.path(), 128, 0..len_b, &schema).unwrap();

        let mut cursor = MergeCursor::new(vec![reader_a, reader_b], &schema).unwrap();
        let mut out = Vec::new();
        while let Some(t) = cursor.next(None).unwrap() {
            out.push(t.fields[0].value.as_i64().unwrap());
        }
        assert_eq!(out, vec![1, 2, 3, 4, 7, 8]);
    }

    #[test]
    fn cross_run_duplicate_is_reported() {
        let schema = schema();
        let (run_a, len_a) = write_run(&[1, 5], &schema);
        let (run_b, len_b) = write_run(&[5, 9], &schema);

        let reader_a = FileReader::open(run_a.path(), 128, 0..len_a, &schema).unwrap();
        let reader_b = FileReader::open(run_b.path(), 128, 0..len_b, &schema).unwrap();

        let mut cursor = MergeCursor::new(vec![reader_a, reader_b], &schema).unwrap();
        let mut sink = DuplicateSink::new();
        while cursor.next(Some(&mut sink)).unwrap().is_some() {}
        assert!(sink.has_duplicate());
    }
}
