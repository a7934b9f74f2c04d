//! External merge driver (`spec.md` §4.10 "Merge_file_sort").
//!
//! Repeatedly merges up to `n_way_merge` runs at a time into a new output
//! run until one run remains, polling an interrupt signal every
//! `TRX_INTERRUPTED_CHECK` pages the way the teacher's long scans do.

use std::path::Path;

use crate::collab::{FlushObserver, LogFreeCheck};
use crate::config::BuilderConfig;
use crate::error::{IxError, IxResult};
use crate::row::IndexSchema;
use crate::sort::buffer::DuplicateSink;
use crate::sort::file_reader::FileReader;
use crate::sort::merge_cursor::MergeCursor;
use crate::sort::spill::{RunRange, SpillWriter};

/// One completed spill file plus the run ranges inside it still pending
/// merge.
pub struct RunSet {
    pub path: std::path::PathBuf,
    pub ranges: Vec<RunRange>,
}

/// Drives repeated N-way merge passes over `input` until a single run
/// remains, writing intermediate and final output through `output_dir`.
/// Polls `log_free_check`/`flush_observer.check_interrupted` every
/// `config.interrupt_check_period_pages` pages the output writer flushes.
pub fn merge_until_single_run(
    mut input: RunSet,
    schema: &IndexSchema,
    config: &BuilderConfig,
    output_dir: &Path,
    log_free_check: &dyn LogFreeCheck,
    flush_observer: &dyn FlushObserver,
) -> IxResult<RunSet> {
    loop {
        if input.ranges.len() <= 1 {
            return Ok(input);
        }

        let mut writer = SpillWriter::new(output_dir, config.merge_io_buffer_bytes)?;
        let mut next_ranges = Vec::new();

        for chunk in input.ranges.chunks(config.n_way_merge) {
            let range = merge_one_pass(
                &input.path,
                chunk,
                schema,
                config,
                &mut writer,
                log_free_check,
                flush_observer,
            )?;
            next_ranges.push(range);
        }

        input = RunSet {
            path: writer.path().to_path_buf(),
            ranges: next_ranges,
        };
    }
}

fn merge_one_pass(
    input_path: &Path,
    chunk: &[RunRange],
    schema: &IndexSchema,
    config: &BuilderConfig,
    writer: &mut SpillWriter,
    log_free_check: &dyn LogFreeCheck,
    flush_observer: &dyn FlushObserver,
) -> IxResult<RunRange> {
    let readers: IxResult<Vec<FileReader>> = chunk
        .iter()
        .map(|r| {
            FileReader::open(
                input_path,
                config.merge_io_buffer_bytes,
                r.start..r.end,
                schema,
            )
        })
        .collect();
    let readers = readers?;

    // A trailing chunk of one run still goes through the cursor/writer so
    // every surviving run ends up in the same output file at a known range.
    let mut cursor = MergeCursor::new(readers, schema)?;
    let mut dup_sink = DuplicateSink::new();
    let mut merged = crate::sort::buffer::SortBuffer::new(config.scan_buffer_bytes, usize::MAX);

    while let Some(tuple) = cursor.next(Some(&mut dup_sink))? {
        merged.push_fields(tuple);
    }

    if let Some(pair) = dup_sink.take() {
        return Err(IxError::DuplicateKey(crate::error::DuplicateInfo {
            index_name: schema.index_name.clone(),
            first_key: pair.first.key_repr(schema),
            second_key: pair.second.key_repr(schema),
        }));
    }

    // Already in non-decreasing order from the merge; re-sorting is a cheap
    // no-op pass that also satisfies `serialize`'s `is_sorted()` assertion.
    merged.sort(schema, None);

    // §4.10 per-pass cancellation: every `interrupt_check_period_pages`
    // flushed pages, poll the host for interrupt.
    writer.write_run_polled(&merged, schema, |pages_flushed| {
        if pages_flushed % config.interrupt_check_period_pages == 0 {
            if flush_observer.check_interrupted() {
                return Err(IxError::Interrupted);
            }
            if log_free_check.required() {
                log_free_check.check();
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::NoopLogFreeCheck;
    use crate::collab::flush_observer::CountingFlushObserver;
    use crate::row::{ColumnSpec, ColumnType, Field, FieldValue, Tuple as RowTuple};
    use crate::sort::buffer::SortBuffer;

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

    #[test]
    fn merges_three_runs_down_to_one() {
        let schema = schema();
        let config = BuilderConfig::default().with_n_way_merge(2);
        let tmp = tempfile::tempdir().unwrap();

        let mut writer = SpillWriter::new(tmp.path(), config.merge_io_buffer_bytes).unwrap();
        let mut ranges = Vec::new();
        for values in [[1, 9], [2, 8], [3, 7]] {
            let mut buf = SortBuffer::new(1 << 20, 100);
            for v in values {
                buf.push_fields(RowTuple::new(vec![Field::new(FieldValue::Int64(v))]));
            }
            buf.sort(&schema, None);
            ranges.push(writer.write_run(&buf, &schema).unwrap());
        }

        let input = RunSet {
            path: writer.path().to_path_buf(),
            ranges,
        };

        let log_free_check = NoopLogFreeCheck;
        let flush_observer = CountingFlushObserver::default();

        let result = merge_until_single_run(
            input,
            &schema,
            &config,
            tmp.path(),
            &log_free_check,
            &flush_observer,
        )
        .unwrap();

        assert_eq!(result.ranges.len(), 1);

        let mut reader = FileReader::open(
            &result.path,
            config.merge_io_buffer_bytes,
            result.ranges[0].start..result.ranges[0].end,
            &schema,
        )
        .unwrap();
        let mut out = Vec::new();
        while let Some(t) = reader.next().unwrap() {
            out.push(t.fields[0].value.as_i64().unwrap());
        }
        assert_eq!(out, vec![1, 2, 3, 7, 8, 9]);
    }
}
