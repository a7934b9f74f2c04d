//! In-memory sort buffer (`spec.md` §4.1, §3 "Sort buffer").
//!
//! Grounded on the teacher's `storage/tuple` ownership model: unlike the
//! original C++, a `Tuple`'s `Field`s already own their bytes (`String`,
//! `Vec<u8>`), so there is no separate "pointer into a shared scan frame" to
//! alias. `push_fields`/`deep_copy_last` are still modeled as two calls to
//! keep the §4.1 API shape recognizable, but `deep_copy_last` is a no-op
//! here — see its doc comment.

use crate::config::IO_BLOCK_SIZE;
use crate::error::{IxError, IxResult};
use crate::row::{IndexSchema, Tuple};
use crate::sort::record::encode_record;

/// Per-tuple bookkeeping overhead charged against the byte budget, in
/// addition to each field's own payload bytes: one byte reserved as the
/// trailing end-of-run marker position, per §3's "the trailing byte is
/// reserved as an end-of-run marker" invariant, amortized as a constant.
const PER_TUPLE_OVERHEAD: usize = 1;

/// Outcome of `push_fields`: `Overflow` is the §7 "Recoverable-local"
/// signal, distinct from the closed `IxError` taxonomy of §6 — it is never
/// surfaced past the builder, which flushes and retries.
#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    Overflow,
}

/// A pair of tuples whose key fields compared equal, reported by `sort`
/// (§4.1) or a merge/cross-buffer pass (§4.8).
#[derive(Debug, Clone)]
pub struct DuplicatePair {
    pub first: Tuple,
    pub second: Tuple,
}

/// Collects the first duplicate pair observed and ignores the rest — the
/// §7 "first non-success wins" write-once discipline applied to duplicate
/// reporting specifically.
#[derive(Default)]
pub struct DuplicateSink {
    first: Option<DuplicatePair>,
}

impl DuplicateSink {
    pub fn new() -> Self {
        Self { first: None }
    }

    pub fn report(&mut self, first: Tuple, second: Tuple) {
        if self.first.is_none() {
            self.first = Some(DuplicatePair { first, second });
        }
    }

    pub fn take(&mut self) -> Option<DuplicatePair> {
        self.first.take()
    }

    pub fn has_duplicate(&self) -> bool {
        self.first.is_some()
    }
}

/// Bounded by a byte budget `B` and a tuple-count budget `C` (§3).
pub struct SortBuffer {
    tuples: Vec<Tuple>,
    bytes_used: usize,
    byte_budget: usize,
    count_budget: usize,
    sorted: bool,
}

impl SortBuffer {
    pub fn new(byte_budget: usize, count_budget: usize) -> Self {
        Self {
            tuples: Vec::new(),
            bytes_used: 0,
            byte_budget,
            count_budget,
            sorted: false,
        }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// `full()`: `bytes_used + new ≥ B` or `count ≥ C` (§3).
    fn will_fit(&self, new_bytes: usize) -> bool {
        self.bytes_used + new_bytes + PER_TUPLE_OVERHEAD < self.byte_budget
            && self.tuples.len() < self.count_budget
    }

    /// Copies `tuple`'s field descriptors into the buffer's tuple array
    /// (§4.1 `push_fields`). Fails with `Overflow` when the buffer is full.
    pub fn push_fields(&mut self, tuple: Tuple) -> PushOutcome {
        let size = tuple.data_size();
        if !self.will_fit(size) {
            return PushOutcome::Overflow;
        }
        self.bytes_used += size + PER_TUPLE_OVERHEAD;
        self.tuples.push(tuple);
        self.sorted = false;
        PushOutcome::Pushed
    }

    /// §4.1: "duplicates the raw bytes of the last tuple's fields into the
    /// buffer's heap so that the pointers remain valid after the source row
    /// latches are released." Every `Field` in this crate already owns its
    /// bytes (`String`/`Vec<u8>`, not a pointer into a shared scan frame),
    /// so by the time `push_fields` returns there is nothing left to copy;
    /// this call exists only so callers can keep following the teacher's
    /// two-step protocol without a behavioral difference.
    pub fn deep_copy_last(&mut self) {}

    /// Stable-only-up-to-equal-key-order sort, reporting the first
    /// duplicate key pair to `dup_sink` if one is installed (§4.1).
    pub fn sort(&mut self, schema: &IndexSchema, mut dup_sink: Option<&mut DuplicateSink>) {
        self.tuples
            .sort_by(|a, b| a.compare_key(b, schema));

        if schema.unique {
            if let Some(ref mut sink) = dup_sink {
                for pair in self.tuples.windows(2) {
                    if pair[0].key_equals(&pair[1], schema) {
                        sink.report(pair[0].clone(), pair[1].clone());
                        break;
                    }
                }
            }
        }
        self.sorted = true;
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    pub fn clear(&mut self) {
        self.tuples.clear();
        self.bytes_used = 0;
        self.sorted = false;
    }

    /// Writes every tuple in sorted order as
    /// `extra_len_varint ‖ extra ‖ key`, flushing `io_buffer` via
    /// `persist_fn` whenever it fills, then a single `0x00` terminator
    /// padded to the I/O block boundary, then one final flush (§4.1
    /// `serialize`).
    pub fn serialize(
        &self,
        schema: &IndexSchema,
        io_buffer_capacity: usize,
        mut persist_fn: impl FnMut(&[u8]) -> IxResult<()>,
    ) -> IxResult<()> {
        debug_assert!(self.sorted, "serialize called before sort");

        let mut io_buffer = Vec::with_capacity(io_buffer_capacity);
        for tuple in &self.tuples {
            let mut record = Vec::new();
            if encode_record(tuple, schema.n_unique_in_tree, &mut record).is_none() {
                return Err(IxError::TooBigRecord {
                    size: tuple.data_size(),
                    limit: crate::config::MAX_RECORD_LEN,
                });
            }
            if record.len() > io_buffer_capacity {
                return Err(IxError::TooBigRecord {
                    size: record.len(),
                    limit: io_buffer_capacity,
                });
            }
            if io_buffer.len() + record.len() > io_buffer_capacity {
                persist_fn(&io_buffer)?;
                io_buffer.clear();
            }
            io_buffer.extend_from_slice(&record);
        }

        io_buffer.push(0x00);
        let padded_len = round_up(io_buffer.len(), IO_BLOCK_SIZE);
        io_buffer.resize(padded_len, 0);
        persist_fn(&io_buffer)?;
        Ok(())
    }
}

fn round_up(n: usize, multiple: usize) -> usize {
    if n % multiple == 0 {
        n
    } else {
        n + (multiple - n % multiple)
    }
}
