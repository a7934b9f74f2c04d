//! Spill file writer (`spec.md` §3 "Spill run", §4.2).
//!
//! A `SpillWriter` owns one temp file per worker and appends one run per
//! `SortBuffer::serialize` call, recording each run's byte-offset range so a
//! later merge pass can open readers positioned at exactly those runs.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{IxError, IxResult};
use crate::row::IndexSchema;
use crate::sort::buffer::SortBuffer;

/// Byte-offset half-open range of one run inside a spill file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRange {
    pub start: u64,
    pub end: u64,
}

pub struct SpillWriter {
    file: File,
    path: PathBuf,
    offset: u64,
    runs: Vec<RunRange>,
    io_buffer_capacity: usize,
    pages_flushed: u64,
    _handle: NamedTempFile,
}

impl SpillWriter {
    pub fn new(tmpdir: &Path, io_buffer_capacity: usize) -> IxResult<Self> {
        let handle = NamedTempFile::new_in(tmpdir).map_err(IxError::Io)?;
        let file = handle.reopen().map_err(IxError::Io)?;
        let path = handle.path().to_path_buf();
        Ok(Self {
            file,
            path,
            offset: 0,
            runs: Vec::new(),
            io_buffer_capacity,
            pages_flushed: 0,
            _handle: handle,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn runs(&self) -> &[RunRange] {
        &self.runs
    }

    /// Total I/O-block-sized writes this writer has flushed to disk across
    /// every `write_run`/`write_run_polled` call so far.
    pub fn pages_flushed(&self) -> u64 {
        self.pages_flushed
    }

    /// Serializes `buffer` as one new run, appending it to this file.
    pub fn write_run(&mut self, buffer: &SortBuffer, schema: &IndexSchema) -> IxResult<RunRange> {
        self.write_run_polled(buffer, schema, |_pages_flushed| Ok(()))
    }

    /// Same as `write_run`, but calls `on_flush` with the writer's running
    /// `pages_flushed` count after every I/O-block-sized write. This is the
    /// hook the merge pass polls for cancellation through, every
    /// `interrupt_check_period_pages` flushes (§4.10).
    pub fn write_run_polled(
        &mut self,
        buffer: &SortBuffer,
        schema: &IndexSchema,
        mut on_flush: impl FnMut(u64) -> IxResult<()>,
    ) -> IxResult<RunRange> {
        let start = self.offset;
        let file = &mut self.file;
        let offset = &mut self.offset;
        let pages_flushed = &mut self.pages_flushed;
        let path = &self.path;
        buffer.serialize(schema, self.io_buffer_capacity, |chunk| {
            file.write_all(chunk).map_err(|e| {
                if e.raw_os_error() == Some(libc_enospc()) {
                    IxError::OutOfFileSpace(path.clone())
                } else {
                    IxError::TempFileWriteFail(path.clone())
                }
            })?;
            *offset += chunk.len() as u64;
            *pages_flushed += 1;
            on_flush(*pages_flushed)
        })?;
        let range = RunRange {
            start,
            end: self.offset,
        };
        self.runs.push(range.clone());
        Ok(range)
    }
}

/// `ENOSPC`; kept as a tiny named constant rather than importing `libc` for
/// one errno value.
fn libc_enospc() -> i32 {
    28
}
