//! §8 scenario S2: a unique secondary index whose source rows contain a
//! repeated key surfaces `DuplicateKey` after the scan completes, through
//! whichever of the four checks in `builder::dup`/`sort::merge_sort` is
//! reachable given how the duplicate pair is split across workers/runs.

mod common;

use std::sync::Arc;

use ixbuild::builder::BuildState;
use ixbuild::collab::flush_observer::CountingFlushObserver;
use ixbuild::collab::{
    AlwaysVisibleView, InMemoryCatalog, InMemoryPageManager, NoVirtualColumns, NoopLogFreeCheck, NoopMtr,
};
use ixbuild::error::IxError;
use ixbuild::{Builder, BuilderConfig};

/// All five rows land in one page, so one worker's own sort buffer holds
/// the whole run: the buffer-level check inside `flush_to_spill` is the
/// only one ever exercised here, since there is no second buffer to
/// cross-check against and no merge pass to run.
#[test]
fn collision_within_a_single_run_is_caught_before_any_merge() {
    let pm = InMemoryPageManager::new();
    let source_root = common::build_single_page(&pm, &[1, 2, 3, 3, 4]);

    let mut config = BuilderConfig::default();
    config.worker_count = 1;
    let schema = common::int_schema("uq_idx", true, false);
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
    let err = builder.build(source_root, &mut mtr).unwrap_err();

    match err {
        IxError::DuplicateKey(info) => {
            assert_eq!(info.index_name, "uq_idx");
            assert_eq!(info.first_key, "(3)");
            assert_eq!(info.second_key, "(3)");
        }
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
    assert_eq!(builder.state(), BuildState::Error);
}

/// One row per page spreads the five values across five single-row
/// partitions, so no worker's own buffer ever sees both `3`s; the
/// duplicate only surfaces once the per-thread single runs are
/// cross-checked (`builder::dup::check_duplicates`) or merged.
#[test]
fn collision_split_across_workers_is_still_caught() {
    let pm = InMemoryPageManager::new();
    let source_root = common::build_chain_one_row_per_page(&pm, &[1, 2, 3, 3, 4]);

    let mut config = BuilderConfig::default();
    config.worker_count = 4;
    let schema = common::int_schema("uq_idx", true, false);
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
    let err = builder.build(source_root, &mut mtr).unwrap_err();

    assert!(matches!(err, IxError::DuplicateKey(_)));
    assert_eq!(builder.state(), BuildState::Error);
}

#[test]
fn no_false_positive_on_distinct_keys() {
    let pm = InMemoryPageManager::new();
    let source_root = common::build_single_page(&pm, &[1, 2, 3, 4, 5]);

    let schema = common::int_schema("uq_idx", true, false);
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
        false,
        false,
    );

    let mut mtr = NoopMtr::new();
    let root = builder.build(source_root, &mut mtr).unwrap();
    assert!(root > 0);
    assert_eq!(builder.state(), BuildState::Stop);
}
