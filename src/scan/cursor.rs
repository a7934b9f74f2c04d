//! Persistent scan cursor (`spec.md` §4.6 step 2).
//!
//! Walks a leaf-linked chain of `SourcePage`s, yielding rows one at a time.
//! `savepoint`/`restore_savepoint` let a caller stash position and drop its
//! buffer-pool fix to do unbounded work, then resume — the cooperative
//! yield point named in §5's ordering-guarantees note.

use crate::collab::{BlockHandle, LatchMode, PageId, PageManager};
use crate::error::IxResult;
use crate::row::Row;
use crate::scan::source_page::SourcePage;

/// Stashed cursor position. Holds no latch, so it is safe to keep across
/// arbitrary caller work (§4.6 "do unbounded work").
#[derive(Debug, Clone, Copy)]
pub struct Savepoint {
    page_id: PageId,
    row_index: usize,
}

pub struct Cursor<'a> {
    page_manager: &'a dyn PageManager,
    /// Exclusive upper bound on the leaf chain: stop before entering this
    /// page id. `None` means unbounded (the last partition range).
    end_page: Option<PageId>,
    fix: Option<BlockHandle>,
    current: Option<SourcePage>,
    row_index: usize,
}

impl<'a> Cursor<'a> {
    /// Opens at the first leaf of `start_page`'s subtree (descending via
    /// leftmost-child links if `start_page` is not already a leaf).
    pub fn open(
        page_manager: &'a dyn PageManager,
        start_page: PageId,
        end_page: Option<PageId>,
    ) -> IxResult<Self> {
        let mut page_id = start_page;
        loop {
            let (handle, page) = Self::fetch(page_manager, page_id)?;
            if page.is_leaf() {
                return Ok(Self {
                    page_manager,
                    end_page,
                    fix: Some(handle),
                    current: Some(page),
                    row_index: 0,
                });
            }
            page_id = page
                .leftmost_child()
                .expect("internal page with no node pointers");
        }
    }

    fn fetch(page_manager: &dyn PageManager, page_id: PageId) -> IxResult<(BlockHandle, SourcePage)> {
        let handle = page_manager.page_get(page_id, LatchMode::Shared)?;
        let page = SourcePage::decode(page_id, &handle.read())?;
        Ok((handle, page))
    }

    /// Next row in clustered-key order, transparently crossing leaf
    /// boundaries and stopping at `end_page` (exclusive).
    pub fn next(&mut self) -> IxResult<Option<Row>> {
        loop {
            let next_leaf = match &self.current {
                None => return Ok(None),
                Some(page) => {
                    if self.row_index < page.rows.len() {
                        let row = page.rows[self.row_index].clone();
                        self.row_index += 1;
                        return Ok(Some(row));
                    }
                    page.right_sibling
                }
            };
            match next_leaf {
                Some(id) if Some(id) != self.end_page => {
                    let (handle, page) = Self::fetch(self.page_manager, id)?;
                    self.fix = Some(handle);
                    self.current = Some(page);
                    self.row_index = 0;
                }
                _ => {
                    self.fix = None;
                    self.current = None;
                    return Ok(None);
                }
            }
        }
    }

    pub fn current_page_id(&self) -> Option<PageId> {
        self.current.as_ref().map(|p| p.page_id)
    }

    /// True once the leaf just consumed is the last one in this range.
    pub fn at_page_boundary(&self) -> bool {
        match &self.current {
            Some(page) => self.row_index >= page.rows.len(),
            None => true,
        }
    }

    /// Stash position and drop the held fix (§4.6 "store position, drop
    /// latches").
    pub fn savepoint(&mut self) -> Option<Savepoint> {
        let sp = self.current.as_ref().map(|p| Savepoint {
            page_id: p.page_id,
            row_index: self.row_index,
        });
        self.fix = None;
        sp
    }

    /// Re-fetch the stashed page and resume exactly where `savepoint` left
    /// off.
    pub fn restore_savepoint(&mut self, sp: Savepoint) -> IxResult<()> {
        let (handle, page) = Self::fetch(self.page_manager, sp.page_id)?;
        self.fix = Some(handle);
        self.current = Some(page);
        self.row_index = sp.row_index;
        Ok(())
    }
}
