//! Closed error taxonomy surfaced to callers of the build engine.
//!
//! This mirrors the `dberr_t` enum referenced throughout `spec.md` §6: a
//! single flat, closed set of outcomes, because every worker thread needs to
//! agree on exactly what a non-success value means without downcasting.

use std::path::PathBuf;

use thiserror::Error;

/// The index identity and offending tuple, attached to `DuplicateKey`.
#[derive(Debug, Clone)]
pub struct DuplicateInfo {
    pub index_name: String,
    pub first_key: String,
    pub second_key: String,
}

#[derive(Debug, Error)]
pub enum IxError {
    #[error("build was interrupted")]
    Interrupted,

    #[error("out of memory")]
    OutOfMemory,

    #[error("out of file space while spilling to {0}")]
    OutOfFileSpace(PathBuf),

    #[error("failed to write temp file {0}")]
    TempFileWriteFail(PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record of {size} bytes exceeds MAX_RECORD_LEN ({limit})")]
    TooBigRecord { size: usize, limit: usize },

    #[error("duplicate key building index {}: {} vs {}", .0.index_name, .0.first_key, .0.second_key)]
    DuplicateKey(DuplicateInfo),

    #[error("failed to read AUTO_INCREMENT value")]
    AutoincReadError,

    #[error("virtual column computation failed: {0}")]
    ComputeValueFailed(String),

    #[error("input stream is not sorted in non-decreasing key order")]
    DataNotSorted,

    #[error("NULL value in column declared NOT NULL")]
    InvalidNull,

    #[error("online DDL log grew beyond its configured limit")]
    OnlineLogTooBig,

    #[error("page or record corruption detected: {0}")]
    Corruption(String),

    /// Sentinel, not a failure: a cursor/iterator has been exhausted.
    #[error("end of index")]
    EndOfIndex,

    /// Sentinel, not a failure: a file reader reached the end of its range.
    #[error("end of file")]
    EndOfFile,

    #[error("operation failed: {0}")]
    Fail(String),

    #[error("unspecified error: {0}")]
    Error(String),
}

impl IxError {
    /// §6: `END_OF_INDEX`/`END_OF_FILE` are sentinels, not build failures.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, IxError::EndOfIndex | IxError::EndOfFile)
    }

    /// §7 error taxonomy: does this failure warrant a host message-log entry?
    pub fn is_fatal_environmental(&self) -> bool {
        matches!(
            self,
            IxError::OutOfMemory
                | IxError::OutOfFileSpace(_)
                | IxError::Io(_)
                | IxError::TempFileWriteFail(_)
        )
    }
}

pub type IxResult<T> = Result<T, IxError>;
