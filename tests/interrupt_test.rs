//! §8 scenario S6: a build signaled for cancellation fails with
//! `Interrupted` and the state machine lands in `ERROR`, rather than
//! producing a root. The interrupt poll lives in the merge pass
//! (`sort::merge_sort::merge_one_pass`), gated on `interrupt_check_period_pages`
//! flushed output pages, so this forces more than one run per worker to
//! guarantee a merge actually runs and sets the period to 1 page.

mod common;

use std::sync::Arc;

use ixbuild::builder::BuildState;
use ixbuild::collab::flush_observer::CountingFlushObserver;
use ixbuild::collab::{
    AlwaysVisibleView, InMemoryCatalog, InMemoryPageManager, NoVirtualColumns, NoopLogFreeCheck, NoopMtr,
};
use ixbuild::error::IxError;
use ixbuild::{Builder, BuilderConfig};

#[test]
fn signaled_cancellation_fails_the_build_with_no_root_spliced_in() {
    let pm = InMemoryPageManager::new();
    let values = [5, 3, 9, 1, 7, 2, 8, 6, 4, 10];
    let source_root = common::build_single_page(&pm, &values);

    let mut config = BuilderConfig::default();
    config.worker_count = 1;
    config.scan_buffer_bytes = 40; // forces more than one spill run to merge
    config.interrupt_check_period_pages = 1;
    let schema = common::int_schema("pk", true, true);

    let flush_observer = Arc::new(CountingFlushObserver::default());
    flush_observer.signal_interrupt();
    let catalog = InMemoryCatalog::reserve(&pm, config.page_size).unwrap();

    let mut builder = Builder::new(
        schema,
        config,
        Arc::new(pm),
        Arc::new(AlwaysVisibleView),
        Arc::new(NoVirtualColumns),
        None,
        flush_observer,
        Arc::new(NoopLogFreeCheck),
        Arc::new(catalog),
        false,
        false,
    );

    let mut mtr = NoopMtr::new();
    let err = builder.build(source_root, &mut mtr).unwrap_err();

    assert!(matches!(err, IxError::Interrupted));
    assert_eq!(builder.state(), BuildState::Error);
    // The scan itself already ran to completion; only the merge pass polls
    // for cancellation, so every row was still counted.
    assert_eq!(builder.progress().rows_scanned, 10);
}
