//! Per-range scan loop (`spec.md` §4.6 step 2).

use crate::collab::{PageManager, ReadView};
use crate::error::IxResult;
use crate::row::Row;
use crate::scan::cursor::Cursor;
use crate::scan::partition::PartitionRange;

/// Inputs that force the single-thread fallback (§4.6 "Single-thread
/// fallback"): virtual columns or FTS indexes on the target, or a starved
/// worker pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackInputs {
    pub has_virtual_columns: bool,
    pub has_fts_indexes: bool,
}

/// Resolves how many workers actually scan, applying the §4.6 fallback.
/// `available_threads` is what the task queue could hand out right now
/// (§9 open question: an exhausted pool means 0 available — in that case
/// every builder serializes on a single worker rather than deadlocking
/// waiting on threads that will never free up).
pub fn effective_worker_count(
    configured_workers: usize,
    available_threads: usize,
    inputs: FallbackInputs,
) -> usize {
    if inputs.has_virtual_columns || inputs.has_fts_indexes || available_threads == 0 {
        1
    } else {
        configured_workers.min(available_threads).max(1)
    }
}

/// Scans one partition range end to end, invoking `on_row` for every
/// visible record and `on_page_boundary` once per leaf page (the
/// savepoint/restore opportunity). Returns the number of records visited
/// (visible or not), matching `builder::Progress`'s "rows scanned" tally.
pub fn scan_range(
    page_manager: &dyn PageManager,
    range: PartitionRange,
    read_view: &dyn ReadView,
    thread_id: usize,
    mut on_row: impl FnMut(usize, &Row) -> IxResult<()>,
    mut on_page_boundary: impl FnMut(&mut Cursor) -> IxResult<()>,
) -> IxResult<u64> {
    let mut cursor = Cursor::open(page_manager, range.start_page, range.end_page)?;
    let mut visited = 0u64;

    loop {
        let row = match cursor.next()? {
            Some(row) => row,
            None => break,
        };
        visited += 1;

        // "invisible or delete-marked rows are skipped (consistent-read
        // version built by the collaborator on demand)".
        if let Some(visible) = read_view.build_for_consistent_read(&row) {
            on_row(thread_id, &visible)?;
        }

        if cursor.at_page_boundary() {
            on_page_boundary(&mut cursor)?;
        }
    }

    Ok(visited)
}

/// Demonstrates the savepoint/restore cycle a per-page callback may run:
/// stash position, drop the fix, do nothing, resume. A real callback would
/// do unbounded work between the two calls (§4.6).
pub fn default_savepoint_cycle(cursor: &mut Cursor) -> IxResult<()> {
    if let Some(sp) = cursor.savepoint() {
        cursor.restore_savepoint(sp)?;
    }
    Ok(())
}
