//! Shared fixtures for the build-scenario integration tests: a minimal
//! source index made of `SourcePage`s, assembled either as one leaf chain
//! (one row per page, many partitions) or one page (many rows, one
//! partition), matching how the scenarios in `spec.md` §8 set up their
//! inputs.

use ixbuild::collab::{InMemoryPageManager, PageId};
use ixbuild::row::{ColumnSpec, ColumnType, Field, FieldValue, IndexSchema, Row};
use ixbuild::scan::SourcePage;

pub fn int_schema(index_name: &str, unique: bool, clustered: bool) -> IndexSchema {
    IndexSchema {
        index_name: index_name.into(),
        columns: vec![ColumnSpec::physical("k", ColumnType::Int64, 0)],
        n_unique_in_tree: 1,
        unique,
        clustered,
        is_fts: false,
    }
}

/// One page per value, linked leaf to leaf in the order given — so
/// `partition_source` sees one subtree per value and can fan work out
/// across several workers.
pub fn build_chain_one_row_per_page(pm: &InMemoryPageManager, values: &[i64]) -> PageId {
    let handles: Vec<_> = values.iter().map(|_| pm.page_alloc(256).unwrap()).collect();
    let ids: Vec<PageId> = handles.iter().map(|h| h.page_id()).collect();
    for (i, handle) in handles.iter().enumerate() {
        let page = SourcePage {
            page_id: ids[i],
            level: 0,
            left_sibling: if i == 0 { None } else { Some(ids[i - 1]) },
            right_sibling: ids.get(i + 1).copied(),
            rows: vec![Row::new(vec![Field::new(FieldValue::Int64(values[i]))], 1, 0)],
            node_pointers: Vec::new(),
        };
        *handle.write() = page.encode();
    }
    ids[0]
}

/// Every value packed into a single page with no siblings, so
/// `partition_source` hands the whole scan to one worker regardless of the
/// configured worker count.
pub fn build_single_page(pm: &InMemoryPageManager, values: &[i64]) -> PageId {
    let handle = pm.page_alloc(256).unwrap();
    let page_id = handle.page_id();
    let rows = values
        .iter()
        .map(|v| Row::new(vec![Field::new(FieldValue::Int64(*v))], 1, 0))
        .collect();
    let page = SourcePage {
        page_id,
        level: 0,
        left_sibling: None,
        right_sibling: None,
        rows,
        node_pointers: Vec::new(),
    };
    *handle.write() = page.encode();
    page_id
}
