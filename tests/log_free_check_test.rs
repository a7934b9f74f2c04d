//! §8 scenario S5: a log-free check collaborator that requires a yield
//! periodically must not change the shape of the build, just how often the
//! loader releases and re-latches its in-progress leaf page.

mod common;

use std::sync::Arc;

use ixbuild::builder::BuildState;
use ixbuild::collab::flush_observer::CountingFlushObserver;
use ixbuild::collab::{
    AlwaysVisibleView, InMemoryCatalog, InMemoryPageManager, NoVirtualColumns, NoopMtr, PeriodicLogFreeCheck,
};
use ixbuild::{Builder, BuilderConfig};

#[test]
fn periodic_yield_does_not_change_the_build_outcome() {
    let pm = InMemoryPageManager::new();
    let values: Vec<i64> = (0..200).collect();
    let source_root = common::build_chain_one_row_per_page(&pm, &values);

    let mut config = BuilderConfig::default();
    config.page_size = 64; // force frequent leaf splits/commits
    let schema = common::int_schema("pk", true, true);

    let log_free_check = Arc::new(PeriodicLogFreeCheck::new(5));
    let catalog = InMemoryCatalog::reserve(&pm, config.page_size).unwrap();

    let mut builder = Builder::new(
        schema,
        config,
        Arc::new(pm),
        Arc::new(AlwaysVisibleView),
        Arc::new(NoVirtualColumns),
        None,
        Arc::new(CountingFlushObserver::default()),
        log_free_check.clone(),
        Arc::new(catalog),
        true, // clustered fast path drives the B-tree loader directly
        false,
    );

    let mut mtr = NoopMtr::new();
    let root = builder.build(source_root, &mut mtr).unwrap();

    assert!(root > 0);
    assert_eq!(builder.progress().rows_scanned, 200);
    assert_eq!(builder.state(), BuildState::Stop);
    assert!(log_free_check.checks_performed.load(std::sync::atomic::Ordering::Acquire) > 0);
}
