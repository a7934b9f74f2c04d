//! Builder orchestrator: wires the parallel scan, row converter, sort
//! buffers, spill/merge pipeline, duplicate detection, and B-tree loader
//! into the state machine of §4.9.
//!
//! One `Builder` builds one target index from one source B-tree. Workers
//! are served by a `TaskQueue`; the error register is write-once, so the
//! first worker to fail cancels the rest via `TaskQueue::signal()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::builder::dup::{check_duplicates, AdjacentDupChecker};
use crate::builder::state::{BuildState, StateMachine};
use crate::collab::{
    BlobStore, Catalog, FlushObserver, LogFreeCheck, MiniTransaction, PageId, PageManager, ReadView,
    VirtualColumnEvaluator,
};
use crate::config::BuilderConfig;
use crate::convert::{CopyContext, RowConverter};
use crate::error::{IxError, IxResult};
use crate::pageload::btree_loader::BTreeLoader;
use crate::row::IndexSchema;
use crate::scan::partition::{partition_source, PartitionRange};
use crate::scan::worker::{effective_worker_count, scan_range, FallbackInputs};
use crate::sort::buffer::{DuplicateSink, PushOutcome, SortBuffer};
use crate::sort::file_reader::FileReader;
use crate::sort::merge_cursor::MergeCursor;
use crate::sort::merge_sort::{merge_until_single_run, RunSet};
use crate::sort::record::encode_record;
use crate::sort::spill::SpillWriter;
use crate::taskqueue::{ErrorRegister, TaskQueue};

/// Plain progress counters (SPEC_FULL.md §A: recovered from the original's
/// `Alter_stage` progress object), updated during the scan/sort/build
/// phases and readable at any time via `Builder::progress()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Progress {
    pub rows_scanned: u64,
    pub tuples_copied: u64,
    pub runs_spilled: u64,
    pub runs_merged: u64,
}

#[derive(Default)]
struct ProgressCounters {
    rows_scanned: AtomicU64,
    tuples_copied: AtomicU64,
    runs_spilled: AtomicU64,
    runs_merged: AtomicU64,
}

impl ProgressCounters {
    fn snapshot(&self) -> Progress {
        Progress {
            rows_scanned: self.rows_scanned.load(Ordering::Relaxed),
            tuples_copied: self.tuples_copied.load(Ordering::Relaxed),
            runs_spilled: self.runs_spilled.load(Ordering::Relaxed),
            runs_merged: self.runs_merged.load(Ordering::Relaxed),
        }
    }
}

pub struct Builder {
    schema: Arc<IndexSchema>,
    config: BuilderConfig,
    page_manager: Arc<dyn PageManager>,
    read_view: Arc<dyn ReadView>,
    virtual_columns: Arc<dyn VirtualColumnEvaluator>,
    blob_store: Option<Arc<dyn BlobStore>>,
    flush_observer: Arc<dyn FlushObserver>,
    log_free_check: Arc<dyn LogFreeCheck>,
    catalog: Arc<dyn Catalog>,
    state: StateMachine,
    error_register: Arc<ErrorRegister>,
    progress: Arc<ProgressCounters>,
    doc_id_counter: Arc<AtomicU64>,
    /// §4.9 "skip_file_sort && clustered" fast path: the source scan order
    /// already matches the target key order, so rows go straight to the
    /// B-tree loader without ever touching a sort buffer.
    pub skip_file_sort: bool,
    has_virtual_columns: bool,
}

impl Builder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schema: IndexSchema,
        config: BuilderConfig,
        page_manager: Arc<dyn PageManager>,
        read_view: Arc<dyn ReadView>,
        virtual_columns: Arc<dyn VirtualColumnEvaluator>,
        blob_store: Option<Arc<dyn BlobStore>>,
        flush_observer: Arc<dyn FlushObserver>,
        log_free_check: Arc<dyn LogFreeCheck>,
        catalog: Arc<dyn Catalog>,
        skip_file_sort: bool,
        has_virtual_columns: bool,
    ) -> Self {
        Self {
            schema: Arc::new(schema),
            config,
            page_manager,
            read_view,
            virtual_columns,
            blob_store,
            flush_observer,
            log_free_check,
            catalog,
            state: StateMachine::new(),
            error_register: Arc::new(ErrorRegister::new()),
            progress: Arc::new(ProgressCounters::default()),
            doc_id_counter: Arc::new(AtomicU64::new(0)),
            skip_file_sort,
            has_virtual_columns,
        }
    }

    pub fn progress(&self) -> Progress {
        self.progress.snapshot()
    }

    pub fn state(&self) -> BuildState {
        self.state.state()
    }

    /// Drives `source_root` through the full pipeline and returns the new
    /// target index's root page id. `mtr` commits every B-tree loader page;
    /// it is touched only by this thread (BTREE_BUILD "runs once per
    /// builder", §4.9), never by the scan/sort worker threads.
    pub fn build(&mut self, source_root: PageId, mtr: &mut dyn MiniTransaction) -> IxResult<PageId> {
        self.state.start_add();
        let is_fts = self.schema.is_fts;
        let clustered_fast_path = self.skip_file_sort && self.schema.clustered && !is_fts;
        self.state
            .finish_add(is_fts, self.skip_file_sort, self.schema.clustered);
        debug!("builder[{}]: ADD -> {}", self.schema.index_name, self.state.state());

        let result = match self.state.state() {
            BuildState::Finish if clustered_fast_path => self.build_clustered_fast_path(source_root, mtr),
            BuildState::FtsSortAndBuild => {
                let root = self.run_pipeline(source_root, mtr);
                if root.is_ok() {
                    self.state.fts_sort_and_build_done();
                }
                root
            }
            BuildState::SetupSort => {
                self.state.setup_sort_done();
                self.state.sort_done();
                let root = self.run_pipeline(source_root, mtr);
                if root.is_ok() {
                    self.state.btree_build_done();
                }
                root
            }
            other => Err(IxError::Fail(format!("unexpected post-ADD state {}", other))),
        };

        match result {
            Ok(root) => {
                debug!("builder[{}]: -> {}", self.schema.index_name, self.state.state());
                self.state.finish_done();
                debug!("builder[{}]: -> {}", self.schema.index_name, self.state.state());
                Ok(root)
            }
            Err(err) => {
                self.error_register.try_set(IxError::Fail(err.to_string()));
                self.state.fail();
                debug!("builder[{}]: -> ERROR ({})", self.schema.index_name, err);
                Err(err)
            }
        }
    }

    /// `ADD -> FINISH` directly: scan in strict key order on a single
    /// worker, checking adjacent duplicates as each row arrives, and insert
    /// every tuple straight into the B-tree loader.
    fn build_clustered_fast_path(
        &mut self,
        source_root: PageId,
        mtr: &mut dyn MiniTransaction,
    ) -> IxResult<PageId> {
        let mut loader = BTreeLoader::new(self.config.clone(), false);
        let converter = RowConverter {
            schema: &self.schema,
            virtual_columns: self.virtual_columns.as_ref(),
            doc_id_counter: &self.doc_id_counter,
        };
        let mut ctx = CopyContext::default();
        let mut dup_checker = AdjacentDupChecker::new();
        let n_key_fields = self.schema.n_unique_in_tree;
        let progress = &self.progress;
        let schema = &self.schema;

        let range = PartitionRange {
            start_page: source_root,
            end_page: None,
        };

        scan_range(
            self.page_manager.as_ref(),
            range,
            self.read_view.as_ref(),
            0,
            |_tid, row| {
                progress.rows_scanned.fetch_add(1, Ordering::Relaxed);
                let tuples = converter.convert(row, &mut ctx)?;
                for tuple in tuples {
                    dup_checker.check(&tuple, schema)?;
                    progress.tuples_copied.fetch_add(1, Ordering::Relaxed);
                    let mut record = Vec::new();
                    encode_record(&tuple, n_key_fields, &mut record).ok_or_else(|| {
                        IxError::TooBigRecord {
                            size: tuple.data_size(),
                            limit: crate::config::MAX_RECORD_LEN,
                        }
                    })?;
                    let record_len = record.len();
                    loader.insert(
                        record,
                        0,
                        record_len,
                        self.page_manager.as_ref(),
                        mtr,
                        self.flush_observer.as_ref(),
                        self.log_free_check.as_ref(),
                        self.blob_store.as_deref().map(|b| (b, false)),
                    )?;
                }
                Ok(())
            },
            |_cursor| Ok(()),
        )?;

        loader.finish(
            self.page_manager.as_ref(),
            mtr,
            self.flush_observer.as_ref(),
            self.catalog.as_ref(),
        )
    }

    /// Mechanics shared by `SETUP_SORT`/`SORT`/`BTREE_BUILD` and
    /// `FTS_SORT_AND_BUILD` (§1 scopes FTS tokenization out, so both paths
    /// run the same scan+sort+load pipeline here): parallel scan+convert
    /// +spill, per-thread merge to a single run, a cross-buffer duplicate
    /// pass, then a single-threaded merge-and-load into the B-tree. Touches
    /// no state-machine transitions; the caller in `build()` owns those.
    fn run_pipeline(&mut self, source_root: PageId, mtr: &mut dyn MiniTransaction) -> IxResult<PageId> {
        let fallback = FallbackInputs {
            has_virtual_columns: self.has_virtual_columns,
            has_fts_indexes: self.schema.is_fts,
        };
        let worker_count = effective_worker_count(self.config.worker_count, self.config.worker_count, fallback);

        let ranges = partition_source(self.page_manager.as_ref(), source_root, worker_count)?;
        debug!(
            "builder[{}]: ADD scanning {} range(s) across {} worker(s)",
            self.schema.index_name,
            ranges.len(),
            worker_count
        );

        let run_sets: Arc<Mutex<Vec<RunSet>>> = Arc::new(Mutex::new(Vec::new()));
        let queue = TaskQueue::new(worker_count);

        for (thread_id, range) in ranges.into_iter().enumerate() {
            let page_manager = Arc::clone(&self.page_manager);
            let read_view = Arc::clone(&self.read_view);
            let virtual_columns = Arc::clone(&self.virtual_columns);
            let doc_id_counter = Arc::clone(&self.doc_id_counter);
            let schema = Arc::clone(&self.schema);
            let config = self.config.clone();
            let progress = Arc::clone(&self.progress);
            let run_sets = Arc::clone(&run_sets);
            let error_register = Arc::clone(&self.error_register);

            queue.submit(move || {
                if error_register.is_set() {
                    return;
                }
                match scan_convert_spill(
                    page_manager,
                    read_view,
                    virtual_columns,
                    doc_id_counter,
                    schema,
                    range,
                    thread_id,
                    config,
                    progress,
                ) {
                    Ok(run_set) => run_sets.lock().unwrap().push(run_set),
                    Err(err) => {
                        error_register.try_set(err);
                    }
                }
            });
        }
        queue.shutdown_and_join();

        if let Some(err) = self.error_register.get() {
            return Err(IxError::Fail(err.to_string()));
        }

        let run_sets = Arc::try_unwrap(run_sets)
            .map(|m| m.into_inner().unwrap())
            .unwrap_or_default();

        let mut final_runs = Vec::new();
        for run_set in run_sets {
            let merged = merge_until_single_run(
                run_set,
                &self.schema,
                &self.config,
                &self.config.tmpdir,
                self.log_free_check.as_ref(),
                self.flush_observer.as_ref(),
            )?;
            self.progress.runs_merged.fetch_add(1, Ordering::Relaxed);
            final_runs.push(merged);
        }

        if self.schema.unique && !self.schema.clustered {
            let files: Vec<(&std::path::Path, crate::sort::spill::RunRange)> = final_runs
                .iter()
                .map(|r| (r.path.as_path(), r.ranges[0].clone()))
                .collect();
            check_duplicates(&files, &self.schema, self.config.merge_io_buffer_bytes)?;
        }

        self.build_btree_from_final_runs(final_runs, mtr)
    }

    /// BTREE_BUILD: N-way merges the final single run from every thread's
    /// spill file (one reader per thread) and inserts in global key order.
    fn build_btree_from_final_runs(
        &mut self,
        final_runs: Vec<RunSet>,
        mtr: &mut dyn MiniTransaction,
    ) -> IxResult<PageId> {
        let readers: IxResult<Vec<FileReader>> = final_runs
            .iter()
            .map(|run| {
                let range = &run.ranges[0];
                FileReader::open(
                    &run.path,
                    self.config.merge_io_buffer_bytes,
                    range.start..range.end,
                    &self.schema,
                )
            })
            .collect();
        let mut cursor = MergeCursor::new(readers?, &self.schema)?;

        let mut loader = BTreeLoader::new(self.config.clone(), false);
        let n_key_fields = self.schema.n_unique_in_tree;

        while let Some(tuple) = cursor.next(None)? {
            let mut record = Vec::new();
            encode_record(&tuple, n_key_fields, &mut record).ok_or_else(|| IxError::TooBigRecord {
                size: tuple.data_size(),
                limit: crate::config::MAX_RECORD_LEN,
            })?;
            let record_len = record.len();
            loader.insert(
                record,
                0,
                record_len,
                self.page_manager.as_ref(),
                mtr,
                self.flush_observer.as_ref(),
                self.log_free_check.as_ref(),
                self.blob_store.as_deref().map(|b| (b, false)),
            )?;
        }

        loader.finish(
            self.page_manager.as_ref(),
            mtr,
            self.flush_observer.as_ref(),
            self.catalog.as_ref(),
        )
    }
}

/// One partition range's worth of work for a single worker thread: scan,
/// convert, buffer, and spill to its own temp file.
#[allow(clippy::too_many_arguments)]
fn scan_convert_spill(
    page_manager: Arc<dyn PageManager>,
    read_view: Arc<dyn ReadView>,
    virtual_columns: Arc<dyn VirtualColumnEvaluator>,
    doc_id_counter: Arc<AtomicU64>,
    schema: Arc<IndexSchema>,
    range: PartitionRange,
    thread_id: usize,
    config: BuilderConfig,
    progress: Arc<ProgressCounters>,
) -> IxResult<RunSet> {
    let converter = RowConverter {
        schema: &schema,
        virtual_columns: virtual_columns.as_ref(),
        doc_id_counter: &doc_id_counter,
    };
    let mut ctx = CopyContext::default();
    let mut buffer = SortBuffer::new(config.scan_buffer_bytes, usize::MAX);
    let mut writer = SpillWriter::new(&config.tmpdir, config.merge_io_buffer_bytes)?;

    scan_range(
        page_manager.as_ref(),
        range,
        read_view.as_ref(),
        thread_id,
        |_tid, row| {
            progress.rows_scanned.fetch_add(1, Ordering::Relaxed);
            let tuples = converter.convert(row, &mut ctx)?;
            for tuple in tuples {
                progress.tuples_copied.fetch_add(1, Ordering::Relaxed);
                if buffer.push_fields(tuple.clone()) == PushOutcome::Overflow {
                    flush_to_spill(&mut buffer, &mut writer, &schema, &progress)?;
                    if buffer.push_fields(tuple.clone()) == PushOutcome::Overflow {
                        return Err(IxError::TooBigRecord {
                            size: tuple.data_size(),
                            limit: config.scan_buffer_bytes,
                        });
                    }
                }
            }
            Ok(())
        },
        |_cursor| Ok(()),
    )?;

    flush_to_spill(&mut buffer, &mut writer, &schema, &progress)?;
    Ok(RunSet {
        path: writer.path().to_path_buf(),
        ranges: writer.runs().to_vec(),
    })
}

fn flush_to_spill(
    buffer: &mut SortBuffer,
    writer: &mut SpillWriter,
    schema: &IndexSchema,
    progress: &ProgressCounters,
) -> IxResult<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    // §4.1's own duplicate sink: a target small enough that every row lands
    // in one run, with no later merge pass to catch a repeated key, still
    // needs this check — not only the cross-buffer and in-merge passes.
    let mut dup_sink = DuplicateSink::new();
    buffer.sort(schema, Some(&mut dup_sink));
    if let Some(pair) = dup_sink.take() {
        return Err(IxError::DuplicateKey(crate::error::DuplicateInfo {
            index_name: schema.index_name.clone(),
            first_key: pair.first.key_repr(schema),
            second_key: pair.second.key_repr(schema),
        }));
    }
    writer.write_run(buffer, schema)?;
    buffer.clear();
    progress.runs_spilled.fetch_add(1, Ordering::Relaxed);
    Ok(())
}
