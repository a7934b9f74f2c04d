//! Virtual-column computation collaborator, used by the row converter
//! (`spec.md` §4.7: "virtual column (call collaborator to compute)").
//!
//! Out of scope: the expression evaluator that computes a generated
//! column's value from the rest of the row is part of the host's DDL/SQL
//! layer (§1 "SQL/DDL parsing" is out of scope).

use crate::error::IxResult;
use crate::row::{FieldValue, Row};

pub trait VirtualColumnEvaluator: Send + Sync {
    fn compute(&self, column_name: &str, row: &Row) -> IxResult<FieldValue>;
}

/// Evaluator used when no target index has virtual columns.
pub struct NoVirtualColumns;

impl VirtualColumnEvaluator for NoVirtualColumns {
    fn compute(&self, column_name: &str, _row: &Row) -> IxResult<FieldValue> {
        Err(crate::error::IxError::ComputeValueFailed(format!(
            "no virtual column evaluator configured for {}",
            column_name
        )))
    }
}
