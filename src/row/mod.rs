pub mod field;
pub mod schema;
pub mod tuple;

pub use field::{Field, FieldValue};
pub use schema::{ColumnKind, ColumnSpec, ColumnType, IndexSchema};
pub use tuple::{Row, Tuple};
