//! Range partitioning (`spec.md` §4.6 step 1).
//!
//! Descends the source tree to find a level with at least `worker_count`
//! subtrees, then slices the right-sibling chain at that level into
//! half-open page-number ranges, one per worker.

use crate::collab::{LatchMode, PageId, PageManager};
use crate::error::IxResult;
use crate::scan::source_page::SourcePage;

/// `[start_page, end_page)`; `end_page = None` marks the last, unbounded
/// range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    pub start_page: PageId,
    pub end_page: Option<PageId>,
}

fn fetch(page_manager: &dyn PageManager, page_id: PageId) -> IxResult<SourcePage> {
    let handle = page_manager.page_get(page_id, LatchMode::Shared)?;
    SourcePage::decode(page_id, &handle.read())
}

/// Leftmost page at `target_level`, found by descending leftmost-child
/// links from `root_page`.
fn leftmost_at_level(
    page_manager: &dyn PageManager,
    root_page: PageId,
    target_level: usize,
) -> IxResult<SourcePage> {
    let mut page = fetch(page_manager, root_page)?;
    while page.level > target_level {
        let child = page.leftmost_child().expect("internal page with no children");
        page = fetch(page_manager, child)?;
    }
    Ok(page)
}

/// Collects every page id at `page`'s level, walking its right-sibling
/// chain starting from `page` itself.
fn sibling_chain(page_manager: &dyn PageManager, mut page: SourcePage) -> IxResult<Vec<PageId>> {
    let mut ids = vec![page.page_id];
    while let Some(next) = page.right_sibling {
        page = fetch(page_manager, next)?;
        ids.push(page.page_id);
    }
    Ok(ids)
}

/// Partitions the source tree rooted at `root_page` into up to
/// `worker_count` ranges (§4.6 step 1). Starts one level above the leaves
/// and descends one level at a time until that level has at least
/// `worker_count` subtrees or the leaf level itself is reached.
pub fn partition_source(
    page_manager: &dyn PageManager,
    root_page: PageId,
    worker_count: usize,
) -> IxResult<Vec<PartitionRange>> {
    let root = fetch(page_manager, root_page)?;
    // "One level above the leaves": level 1, unless the whole tree is a
    // single leaf page (root.level == 0).
    let mut level = if root.level >= 1 { 1 } else { 0 };

    let subtree_roots = loop {
        let start = leftmost_at_level(page_manager, root_page, level)?;
        let ids = sibling_chain(page_manager, start)?;
        if ids.len() >= worker_count || level == 0 {
            break ids;
        }
        level -= 1;
    };

    Ok(subtree_roots
        .iter()
        .enumerate()
        .map(|(i, &start_page)| PartitionRange {
            start_page,
            end_page: subtree_roots.get(i + 1).copied(),
        })
        .collect())
}
