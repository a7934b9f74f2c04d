//! Row converter (`spec.md` §4.7).
//!
//! Turns one scanned clustered-index `Row` into zero or more target-index
//! `Tuple`s, resolving each target column by its `ColumnKind` and tallying
//! the byte counts the builder's sort buffer accounting needs.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::collab::VirtualColumnEvaluator;
use crate::error::{IxError, IxResult};
use crate::row::{ColumnKind, ColumnSpec, Field, FieldValue, IndexSchema, Row, Tuple};
use crate::sort::record::{decode_field, encode_field};

/// Running byte tallies a builder thread keeps across every row it copies
/// (§4.7 "Maintain two tallies on the thread's copy-context").
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyContext {
    /// Payload bytes copied so far.
    pub data_size: u64,
    /// Variable-length-header and null-bitmap bytes copied so far.
    pub extra_size: u64,
}

enum ResolvedColumn {
    Single(FieldValue),
    Multi(Vec<FieldValue>),
}

/// Encodes a list of values for a multi-value source column: repeated
/// `encode_field` calls over synthetic, non-nullable, non-external fields.
/// A fixture/upstream loader producing multi-value row data packs it this
/// way; `decode_multi_value_list` is its inverse.
pub fn encode_multi_value_list(values: &[FieldValue]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        encode_field(
            &Field {
                value: value.clone(),
                nullable: false,
                external: false,
            },
            &mut out,
        );
    }
    out
}

fn decode_multi_value_list(bytes: &[u8]) -> Vec<FieldValue> {
    let mut pos = 0;
    let mut values = Vec::new();
    while pos < bytes.len() {
        values.push(decode_field(bytes, &mut pos).value);
    }
    values
}

pub struct RowConverter<'a> {
    pub schema: &'a IndexSchema,
    pub virtual_columns: &'a dyn VirtualColumnEvaluator,
    /// Monotonic FTS doc-id counter, shared across every thread building
    /// this target (§4.7 "a monotonically incremented counter owned by the
    /// builder").
    pub doc_id_counter: &'a AtomicU64,
}

impl<'a> RowConverter<'a> {
    fn resolve_column(&self, column: &ColumnSpec, row: &Row) -> IxResult<ResolvedColumn> {
        match column.kind {
            ColumnKind::Physical => {
                let field = row.fields.get(column.source_index).ok_or_else(|| {
                    IxError::Corruption(format!(
                        "row converter: source column {} out of range",
                        column.source_index
                    ))
                })?;
                if column.multi_value {
                    let bytes = match &field.value {
                        FieldValue::Bytes(b) => b,
                        other => {
                            return Err(IxError::ComputeValueFailed(format!(
                                "multi-value column {} source field is {:?}, expected Bytes",
                                column.name, other
                            )))
                        }
                    };
                    Ok(ResolvedColumn::Multi(decode_multi_value_list(bytes)))
                } else {
                    Ok(ResolvedColumn::Single(field.value.clone()))
                }
            }
            ColumnKind::Virtual => Ok(ResolvedColumn::Single(
                self.virtual_columns.compute(&column.name, row)?,
            )),
            ColumnKind::FtsDocId => {
                if column.fts_doc_id_generated {
                    let id = self.doc_id_counter.fetch_add(1, Ordering::Relaxed);
                    Ok(ResolvedColumn::Single(FieldValue::Int64(id as i64)))
                } else {
                    let field = row.fields.get(column.source_index).ok_or_else(|| {
                        IxError::Corruption("row converter: fts doc-id column out of range".into())
                    })?;
                    Ok(ResolvedColumn::Single(field.value.clone()))
                }
            }
        }
    }

    /// §4.7: resolve every column, apply prefix truncation, fan out
    /// multi-value columns into one tuple per value (sharing every other
    /// field), and tally `data_size`/`extra_size` on `ctx`.
    pub fn convert(&self, row: &Row, ctx: &mut CopyContext) -> IxResult<Vec<Tuple>> {
        let mut resolved = Vec::with_capacity(self.schema.columns.len());
        for column in &self.schema.columns {
            resolved.push(self.resolve_column(column, row)?);
        }

        let fan_out = resolved
            .iter()
            .map(|r| match r {
                ResolvedColumn::Single(_) => 1,
                ResolvedColumn::Multi(values) => values.len().max(1),
            })
            .max()
            .unwrap_or(1);

        let mut tuples = Vec::with_capacity(fan_out);
        for i in 0..fan_out {
            let mut fields = Vec::with_capacity(resolved.len());
            let mut null_bitmap_bits = 0u64;

            for (column, value) in self.schema.columns.iter().zip(&resolved) {
                let raw = match value {
                    ResolvedColumn::Single(v) => v.clone(),
                    ResolvedColumn::Multi(values) => {
                        values.get(i).cloned().unwrap_or(FieldValue::Null)
                    }
                };
                let raw = match column.prefix_len {
                    Some(len) => raw.truncate_prefix(len),
                    None => raw,
                };

                if column.nullable {
                    null_bitmap_bits += 1;
                }
                ctx.data_size += raw.byte_len() as u64;
                ctx.extra_size += column.extra_header_bytes(raw.byte_len()) as u64;

                fields.push(Field {
                    value: raw,
                    nullable: column.nullable,
                    external: column.external,
                });
            }

            ctx.extra_size += (null_bitmap_bits + 7) / 8;
            tuples.push(Tuple::new(fields));
        }

        Ok(tuples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{NoVirtualColumns, VirtualColumnEvaluator};
    use crate::row::ColumnType;

    fn schema() -> IndexSchema {
        IndexSchema {
            index_name: "idx".into(),
            columns: vec![
                ColumnSpec::physical("k", ColumnType::Int64, 0),
                ColumnSpec::physical("name", ColumnType::Text, 1).with_prefix(3),
            ],
            n_unique_in_tree: 1,
            unique: true,
            clustered: false,
            is_fts: false,
        }
    }

    fn row() -> Row {
        Row::new(
            vec![
                Field::new(FieldValue::Int64(7)),
                Field::new(FieldValue::Text("hello world".into())),
            ],
            1,
            0,
        )
    }

    #[test]
    fn physical_columns_copy_and_truncate() {
        let schema = schema();
        let evaluator = NoVirtualColumns;
        let counter = AtomicU64::new(0);
        let converter = RowConverter {
            schema: &schema,
            virtual_columns: &evaluator,
            doc_id_counter: &counter,
        };
        let mut ctx = CopyContext::default();
        let tuples = converter.convert(&row(), &mut ctx).unwrap();

        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].fields[0].value, FieldValue::Int64(7));
        assert_eq!(tuples[0].fields[1].value, FieldValue::Text("hel".into()));
        assert!(ctx.data_size > 0);
    }

    #[test]
    fn generated_fts_doc_id_counts_up() {
        let mut schema = schema();
        schema.columns.push(ColumnSpec::fts_doc_id_generated("doc_id"));
        let evaluator = NoVirtualColumns;
        let counter = AtomicU64::new(100);
        let converter = RowConverter {
            schema: &schema,
            virtual_columns: &evaluator,
            doc_id_counter: &counter,
        };
        let mut ctx = CopyContext::default();
        let t1 = converter.convert(&row(), &mut ctx).unwrap();
        let t2 = converter.convert(&row(), &mut ctx).unwrap();
        assert_eq!(t1[0].fields[2].value, FieldValue::Int64(100));
        assert_eq!(t2[0].fields[2].value, FieldValue::Int64(101));
    }

    #[test]
    fn multi_value_column_fans_out_one_tuple_per_value() {
        let mut schema = schema();
        schema.columns.push(
            ColumnSpec::physical("tag", ColumnType::Int64, 2).multi_value(),
        );
        let list = encode_multi_value_list(&[
            FieldValue::Int64(1),
            FieldValue::Int64(2),
            FieldValue::Int64(3),
        ]);
        let mut row = row();
        row.fields.push(Field::new(FieldValue::Bytes(list)));

        let evaluator = NoVirtualColumns;
        let counter = AtomicU64::new(0);
        let converter = RowConverter {
            schema: &schema,
            virtual_columns: &evaluator,
            doc_id_counter: &counter,
        };
        let mut ctx = CopyContext::default();
        let tuples = converter.convert(&row, &mut ctx).unwrap();

        assert_eq!(tuples.len(), 3);
        assert_eq!(tuples[0].fields[0].value, FieldValue::Int64(7));
        assert_eq!(tuples[1].fields[2].value, FieldValue::Int64(2));
        assert_eq!(tuples[2].fields[2].value, FieldValue::Int64(3));
    }

    #[test]
    fn virtual_column_failure_propagates() {
        struct AlwaysFails;
        impl VirtualColumnEvaluator for AlwaysFails {
            fn compute(&self, name: &str, _row: &Row) -> IxResult<FieldValue> {
                Err(IxError::ComputeValueFailed(name.to_string()))
            }
        }
        let mut schema = schema();
        schema.columns.push(ColumnSpec::virtual_column("v", ColumnType::Int64));
        let evaluator = AlwaysFails;
        let counter = AtomicU64::new(0);
        let converter = RowConverter {
            schema: &schema,
            virtual_columns: &evaluator,
            doc_id_counter: &counter,
        };
        let mut ctx = CopyContext::default();
        assert!(converter.convert(&row(), &mut ctx).is_err());
    }
}
