//! Streaming reader over one spill run (`spec.md` §4.2 "File_reader").
//!
//! Reads fixed-size blocks from a byte range of a spill file and decodes
//! records one at a time, buffering the tail of a block whose last record
//! straddles the boundary into the next read.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

use crate::error::{IxError, IxResult};
use crate::row::{IndexSchema, Tuple};
use crate::sort::record::try_decode_record;
use crate::sort::varint;

pub struct FileReader<'a> {
    file: File,
    block_size: usize,
    range: Range<u64>,
    /// Absolute file offset the next block read starts at.
    next_block_start: u64,
    /// Bytes read from the file but not yet fully consumed as records.
    carry: Vec<u8>,
    exhausted: bool,
    n_key_fields: usize,
    n_extra_fields: usize,
    schema: &'a IndexSchema,
}

impl<'a> FileReader<'a> {
    pub fn open(
        path: &Path,
        block_size: usize,
        range: Range<u64>,
        schema: &'a IndexSchema,
    ) -> IxResult<Self> {
        let mut file = File::open(path).map_err(IxError::Io)?;
        file.seek(SeekFrom::Start(range.start)).map_err(IxError::Io)?;
        let n_key_fields = schema.n_unique_in_tree;
        let n_extra_fields = schema.columns.len() - n_key_fields;
        Ok(Self {
            file,
            block_size,
            next_block_start: range.start,
            range,
            carry: Vec::new(),
            exhausted: false,
            n_key_fields,
            n_extra_fields,
            schema,
        })
    }

    fn fill(&mut self) -> IxResult<bool> {
        if self.next_block_start >= self.range.end {
            return Ok(false);
        }
        let remaining = (self.range.end - self.next_block_start) as usize;
        let to_read = self.block_size.min(remaining);
        let mut block = vec![0u8; to_read];
        self.file.read_exact(&mut block).map_err(IxError::Io)?;
        self.next_block_start += to_read as u64;
        self.carry.extend_from_slice(&block);
        Ok(true)
    }

    /// Returns the next decoded tuple, `None` at end-of-run, or an error.
    pub fn next(&mut self) -> IxResult<Option<Tuple>> {
        if self.exhausted {
            return Ok(None);
        }
        loop {
            if !self.carry.is_empty() && self.carry[0] == varint::END_OF_RUN {
                self.exhausted = true;
                return Ok(None);
            }
            if let Some((tuple, consumed)) =
                try_decode_record(&self.carry, self.n_key_fields, self.n_extra_fields)
            {
                self.carry.drain(..consumed);
                return Ok(Some(tuple));
            }
            if !self.fill()? {
                if self.carry.is_empty() || self.carry[0] == varint::END_OF_RUN {
                    self.exhausted = true;
                    return Ok(None);
                }
                return Err(IxError::Corruption(
                    "spill run ended without an end-of-run marker".into(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{ColumnSpec, ColumnType, Field, FieldValue, Tuple as RowTuple};
    use crate::sort::buffer::SortBuffer;
    use std::io::Write;

    fn schema() -> IndexSchema {
        IndexSchema {
            index_name: "idx".into(),
            columns: vec![ColumnSpec::physical("k", ColumnType::Int64, 0)],
            n_unique_in_tree: 1,
            unique: true,
            clustered: false,
            is_fts: false,
        }
    }

    #[test]
    fn reads_every_record_then_stops_at_end_of_run() {
        let schema = schema();
        let mut buf = SortBuffer::new(1 << 20, 100);
        for v in [1, 2, 3] {
            buf.push_fields(RowTuple::new(vec![Field::new(FieldValue::Int64(v))]));
        }
        buf.sort(&schema, None);

        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut file = tmp.reopen().unwrap();
        let mut offset = 0u64;
        buf.serialize(&schema, 128, |chunk| {
            file.write_all(chunk).unwrap();
            offset += chunk.len() as u64;
            Ok(())
        })
        .unwrap();

        let mut reader = FileReader::open(tmp.path(), 128, 0..offset, &schema).unwrap();
        let mut seen = Vec::new();
        while let Some(t) = reader.next().unwrap() {
            seen.push(t.fields[0].value.as_i64().unwrap());
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(reader.next().unwrap().is_none());
    }
}
