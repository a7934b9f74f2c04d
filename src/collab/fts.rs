//! FTS tokenizer collaborator (`spec.md` §6, conditional on an FTS target).
//!
//! Out of scope per §1 ("full-text tokenizer"). The builder state machine
//! (§4.9) routes FTS targets through `FTS_SORT_AND_BUILD` and drives this
//! collaborator instead of the generic sort/merge/bulk-load pipeline.

use crate::error::IxResult;

pub struct DocItem {
    pub doc_id: u64,
    pub text: String,
}

pub trait FtsCollector: Send + Sync {
    fn enqueue(&self, item: DocItem);
    fn scan_finished(&self) -> IxResult<()>;
    fn insert(&self) -> IxResult<()>;
}

/// Discards everything; adequate for builds whose target is not FTS, and
/// for tests that only need the state machine to take the FTS branch.
pub struct NoopFts;

impl FtsCollector for NoopFts {
    fn enqueue(&self, _item: DocItem) {}

    fn scan_finished(&self) -> IxResult<()> {
        Ok(())
    }

    fn insert(&self) -> IxResult<()> {
        Ok(())
    }
}
