//! BLOB storage collaborator (`spec.md` §6): `store_big_rec`.
//!
//! Out of scope per §1 ("LOB/BLOB external storage"). The bulk loader only
//! needs to hand an externally-stored field to this collaborator and get
//! back an in-page pointer to splice into the record (§4.5 step 3).

use crate::error::IxResult;

/// Opaque pointer the collaborator hands back; the loader stores these
/// bytes in place of the externalized field's payload.
pub type BlobPointer = Vec<u8>;

pub trait BlobStore: Send + Sync {
    fn store_big_rec(&self, payload: &[u8]) -> IxResult<BlobPointer>;
}

/// In-memory BLOB store for tests: returns a pointer encoding an index into
/// an internal table, and can answer `resolve` for round-trip assertions.
pub struct InMemoryBlobStore {
    inner: std::sync::Mutex<Vec<Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn resolve(&self, pointer: &BlobPointer) -> Vec<u8> {
        let idx = u64::from_be_bytes(pointer[..8].try_into().unwrap()) as usize;
        self.inner.lock().unwrap()[idx].clone()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn store_big_rec(&self, payload: &[u8]) -> IxResult<BlobPointer> {
        let mut store = self.inner.lock().unwrap();
        let idx = store.len() as u64;
        store.push(payload.to_vec());
        Ok(idx.to_be_bytes().to_vec())
    }
}
