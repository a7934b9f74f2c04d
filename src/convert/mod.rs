//! Row converter (`spec.md` §4.7).

pub mod row_converter;

pub use row_converter::{encode_multi_value_list, CopyContext, RowConverter};
