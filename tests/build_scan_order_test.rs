//! §8 scenario S1: a clustered target scanned out of physical order across
//! several workers still produces one root covering every row, with the
//! sort pipeline (not the `skip_file_sort` fast path) restoring key order.

mod common;

use std::sync::Arc;

use ixbuild::builder::BuildState;
use ixbuild::collab::{
    AlwaysVisibleView, InMemoryCatalog, InMemoryPageManager, NoVirtualColumns, NoopLogFreeCheck, NoopMtr,
};
use ixbuild::collab::flush_observer::CountingFlushObserver;
use ixbuild::{Builder, BuilderConfig};

#[test]
fn ten_rows_across_four_workers_build_a_single_root() {
    let pm = InMemoryPageManager::new();
    let values = [5, 3, 9, 1, 7, 2, 8, 6, 4, 10];
    let source_root = common::build_chain_one_row_per_page(&pm, &values);

    let mut config = BuilderConfig::default();
    config.worker_count = 4;
    let schema = common::int_schema("pk", true, true);
    let catalog = InMemoryCatalog::reserve(&pm, config.page_size).unwrap();

    let mut builder = Builder::new(
        schema,
        config,
        Arc::new(pm),
        Arc::new(AlwaysVisibleView),
        Arc::new(NoVirtualColumns),
        None,
        Arc::new(CountingFlushObserver::default()),
        Arc::new(NoopLogFreeCheck),
        Arc::new(catalog),
        false,
        false,
    );

    let mut mtr = NoopMtr::new();
    let root = builder.build(source_root, &mut mtr).unwrap();

    assert!(root > 0);
    let progress = builder.progress();
    assert_eq!(progress.rows_scanned, 10);
    assert_eq!(progress.tuples_copied, 10);
    assert_eq!(builder.state(), BuildState::Stop);
}

#[test]
fn clustered_skip_file_sort_fast_path_also_covers_every_row() {
    let pm = InMemoryPageManager::new();
    let values = [1, 2, 3, 4, 5];
    let source_root = common::build_chain_one_row_per_page(&pm, &values);

    let schema = common::int_schema("pk", true, true);
    let config = BuilderConfig::default();
    let catalog = InMemoryCatalog::reserve(&pm, config.page_size).unwrap();
    let mut builder = Builder::new(
        schema,
        config,
        Arc::new(pm),
        Arc::new(AlwaysVisibleView),
        Arc::new(NoVirtualColumns),
        None,
        Arc::new(CountingFlushObserver::default()),
        Arc::new(NoopLogFreeCheck),
        Arc::new(catalog),
        true,
        false,
    );

    let mut mtr = NoopMtr::new();
    let root = builder.build(source_root, &mut mtr).unwrap();

    assert!(root > 0);
    assert_eq!(builder.progress().rows_scanned, 5);
    assert_eq!(builder.state(), BuildState::Stop);
}
