//! On-disk layout for a page in the source clustered index the scan reads
//! from (`spec.md` §4.6). Distinct from `pageload::Page`, which models a
//! page *under construction*: this models one already committed, read back
//! through the collaborator's `PageManager`.

use crate::collab::PageId;
use crate::error::{IxError, IxResult};
use crate::row::Row;
use crate::sort::record::{decode_field, encode_field};

const NONE_SENTINEL: u64 = 0;
const HEADER_LEN: usize = 1 + 8 + 8 + 4;

/// One page: a level, sibling links, and the rows it holds in key order.
/// Internal (non-leaf) pages instead hold node-pointer records whose first
/// 8 bytes are a child `PageId` (`pageload::btree_loader`'s layout); those
/// are carried as raw bytes via `records_raw` rather than decoded as `Row`s.
#[derive(Debug, Clone)]
pub struct SourcePage {
    pub page_id: PageId,
    pub level: usize,
    pub left_sibling: Option<PageId>,
    pub right_sibling: Option<PageId>,
    pub rows: Vec<Row>,
    pub node_pointers: Vec<Vec<u8>>,
}

impl SourcePage {
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    /// First 8 bytes of a node-pointer record are the child page id.
    pub fn child_page_id(record: &[u8]) -> Option<PageId> {
        record
            .get(0..8)
            .map(|b| u64::from_be_bytes(b.try_into().expect("8-byte slice")))
    }

    pub fn leftmost_child(&self) -> Option<PageId> {
        self.node_pointers.first().and_then(|r| Self::child_page_id(r))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(self.level as u8);
        buf.extend_from_slice(&self.left_sibling.unwrap_or(NONE_SENTINEL).to_be_bytes());
        buf.extend_from_slice(&self.right_sibling.unwrap_or(NONE_SENTINEL).to_be_bytes());
        if self.is_leaf() {
            buf.extend_from_slice(&(self.rows.len() as u32).to_be_bytes());
            for row in &self.rows {
                let mut row_buf = Vec::new();
                row_buf.extend_from_slice(&row.trx_id.to_be_bytes());
                row_buf.extend_from_slice(&row.roll_ptr.to_be_bytes());
                row_buf.extend_from_slice(&(row.fields.len() as u32).to_be_bytes());
                for field in &row.fields {
                    encode_field(field, &mut row_buf);
                }
                buf.extend_from_slice(&(row_buf.len() as u32).to_be_bytes());
                buf.extend_from_slice(&row_buf);
            }
        } else {
            buf.extend_from_slice(&(self.node_pointers.len() as u32).to_be_bytes());
            for rec in &self.node_pointers {
                buf.extend_from_slice(&(rec.len() as u32).to_be_bytes());
                buf.extend_from_slice(rec);
            }
        }
        buf
    }

    pub fn decode(page_id: PageId, bytes: &[u8]) -> IxResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(IxError::Corruption(format!(
                "source page {page_id} shorter than its header"
            )));
        }
        let level = bytes[0] as usize;
        let left = u64::from_be_bytes(bytes[1..9].try_into().unwrap());
        let right = u64::from_be_bytes(bytes[9..17].try_into().unwrap());
        let count = u32::from_be_bytes(bytes[17..21].try_into().unwrap()) as usize;
        let mut pos = HEADER_LEN;

        let truncated = |what: &str| {
            IxError::Corruption(format!("source page {page_id} truncated {what}"))
        };

        let mut rows = Vec::new();
        let mut node_pointers = Vec::new();
        for _ in 0..count {
            let len = u32::from_be_bytes(
                bytes
                    .get(pos..pos + 4)
                    .ok_or_else(|| truncated("entry header"))?
                    .try_into()
                    .unwrap(),
            ) as usize;
            pos += 4;
            let entry = bytes
                .get(pos..pos + len)
                .ok_or_else(|| truncated("entry body"))?;
            pos += len;

            if level == 0 {
                if entry.len() < 20 {
                    return Err(truncated("row header"));
                }
                let trx_id = u64::from_be_bytes(entry[0..8].try_into().unwrap());
                let roll_ptr = u64::from_be_bytes(entry[8..16].try_into().unwrap());
                let n_fields = u32::from_be_bytes(entry[16..20].try_into().unwrap()) as usize;
                let mut fpos = 20;
                let mut fields = Vec::with_capacity(n_fields);
                for _ in 0..n_fields {
                    fields.push(decode_field(entry, &mut fpos));
                }
                rows.push(Row::new(fields, trx_id, roll_ptr));
            } else {
                node_pointers.push(entry.to_vec());
            }
        }

        Ok(SourcePage {
            page_id,
            level,
            left_sibling: if left == NONE_SENTINEL { None } else { Some(left) },
            right_sibling: if right == NONE_SENTINEL { None } else { Some(right) },
            rows,
            node_pointers,
        })
    }
}
