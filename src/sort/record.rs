//! Physical record layout for one spilled tuple (`spec.md` §3 "Spill run").
//!
//! > `extra_len_varint ‖ extra_bytes ‖ key_bytes`
//!
//! `key_bytes` holds the leading `n_unique_in_tree` fields (the comparison
//! key); `extra_bytes` holds everything else. Each field is self-describing
//! (a type tag plus payload) so a file reader can decode a run without
//! consulting the target schema — only the merge comparator needs it.

use crate::row::{Field, FieldValue, Tuple};
use crate::sort::varint;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT64: u8 = 2;
const TAG_FLOAT64: u8 = 3;
const TAG_BYTES: u8 = 4;
const TAG_TEXT: u8 = 5;

pub(crate) fn encode_field(field: &Field, out: &mut Vec<u8>) {
    let flags = (field.nullable as u8) | ((field.external as u8) << 1);
    out.push(flags);
    match &field.value {
        FieldValue::Null => out.push(TAG_NULL),
        FieldValue::Bool(v) => {
            out.push(TAG_BOOL);
            out.push(*v as u8);
        }
        FieldValue::Int64(v) => {
            out.push(TAG_INT64);
            out.extend_from_slice(&v.to_be_bytes());
        }
        FieldValue::Float64(v) => {
            out.push(TAG_FLOAT64);
            out.extend_from_slice(&v.to_be_bytes());
        }
        FieldValue::Bytes(v) => {
            out.push(TAG_BYTES);
            out.extend_from_slice(&(v.len() as u32).to_be_bytes());
            out.extend_from_slice(v);
        }
        FieldValue::Text(v) => {
            out.push(TAG_TEXT);
            let bytes = v.as_bytes();
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(bytes);
        }
    }
}

pub(crate) fn decode_field(bytes: &[u8], pos: &mut usize) -> Field {
    let flags = bytes[*pos];
    *pos += 1;
    let tag = bytes[*pos];
    *pos += 1;
    let value = match tag {
        TAG_NULL => FieldValue::Null,
        TAG_BOOL => {
            let v = bytes[*pos] != 0;
            *pos += 1;
            FieldValue::Bool(v)
        }
        TAG_INT64 => {
            let v = i64::from_be_bytes(bytes[*pos..*pos + 8].try_into().unwrap());
            *pos += 8;
            FieldValue::Int64(v)
        }
        TAG_FLOAT64 => {
            let v = f64::from_be_bytes(bytes[*pos..*pos + 8].try_into().unwrap());
            *pos += 8;
            FieldValue::Float64(v)
        }
        TAG_BYTES => {
            let len = u32::from_be_bytes(bytes[*pos..*pos + 4].try_into().unwrap()) as usize;
            *pos += 4;
            let v = bytes[*pos..*pos + len].to_vec();
            *pos += len;
            FieldValue::Bytes(v)
        }
        TAG_TEXT => {
            let len = u32::from_be_bytes(bytes[*pos..*pos + 4].try_into().unwrap()) as usize;
            *pos += 4;
            let v = String::from_utf8(bytes[*pos..*pos + len].to_vec()).unwrap();
            *pos += len;
            FieldValue::Text(v)
        }
        _ => unreachable!("unknown field tag {}", tag),
    };
    Field {
        value,
        nullable: flags & 0x01 != 0,
        external: flags & 0x02 != 0,
    }
}

/// Splits a tuple into `(key_bytes, extra_bytes)` and writes the full
/// on-disk record (`extra_len_varint ‖ extra_bytes ‖ key_bytes`) to `out`.
/// Returns `None` if the extra portion overflows the varint's range.
pub fn encode_record(tuple: &Tuple, n_key_fields: usize, out: &mut Vec<u8>) -> Option<()> {
    let mut key_bytes = Vec::new();
    for field in &tuple.fields[..n_key_fields] {
        encode_field(field, &mut key_bytes);
    }
    let mut extra_bytes = Vec::new();
    for field in &tuple.fields[n_key_fields..] {
        encode_field(field, &mut extra_bytes);
    }
    let header = varint::encode_extra_len(extra_bytes.len())?;
    out.extend_from_slice(&header);
    out.extend_from_slice(&extra_bytes);
    out.extend_from_slice(&key_bytes);
    Some(())
}

/// Decodes one record starting at `bytes[0]`, given how many of the
/// trailing fields are "key" fields (the rest are "extra"). Returns
/// `(tuple, bytes_consumed)`. Assumes `bytes` holds the whole record.
pub fn decode_record(bytes: &[u8], n_key_fields: usize, n_extra_fields: usize) -> (Tuple, usize) {
    try_decode_record(bytes, n_key_fields, n_extra_fields)
        .expect("decode_record called on a truncated or malformed record")
}

/// Fallible form used by the streaming file reader, which may be holding a
/// record that straddles a block boundary: returns `None` (without
/// consuming anything) rather than panicking when `bytes` doesn't yet hold
/// the full record.
pub fn try_decode_record(
    bytes: &[u8],
    n_key_fields: usize,
    n_extra_fields: usize,
) -> Option<(Tuple, usize)> {
    let (extra_len, header_len) = varint::decode_extra_len(bytes)?;
    let mut pos = header_len;
    let extra_end = pos + extra_len;
    if bytes.len() < extra_end {
        return None;
    }

    let mut extra_fields = Vec::with_capacity(n_extra_fields);
    while pos < extra_end {
        extra_fields.push(try_decode_field(bytes, &mut pos)?);
    }
    debug_assert_eq!(extra_fields.len(), n_extra_fields);

    let mut key_fields = Vec::with_capacity(n_key_fields);
    for _ in 0..n_key_fields {
        key_fields.push(try_decode_field(bytes, &mut pos)?);
    }

    let mut fields = key_fields;
    fields.extend(extra_fields);
    Some((Tuple::new(fields), pos))
}

fn try_decode_field(bytes: &[u8], pos: &mut usize) -> Option<Field> {
    let flags = *bytes.get(*pos)?;
    let tag = *bytes.get(*pos + 1)?;
    let mut p = *pos + 2;
    let value = match tag {
        TAG_NULL => FieldValue::Null,
        TAG_BOOL => {
            let v = *bytes.get(p)?;
            p += 1;
            FieldValue::Bool(v != 0)
        }
        TAG_INT64 => {
            let slice = bytes.get(p..p + 8)?;
            p += 8;
            FieldValue::Int64(i64::from_be_bytes(slice.try_into().ok()?))
        }
        TAG_FLOAT64 => {
            let slice = bytes.get(p..p + 8)?;
            p += 8;
            FieldValue::Float64(f64::from_be_bytes(slice.try_into().ok()?))
        }
        TAG_BYTES => {
            let len_bytes = bytes.get(p..p + 4)?;
            let len = u32::from_be_bytes(len_bytes.try_into().ok()?) as usize;
            p += 4;
            let v = bytes.get(p..p + len)?.to_vec();
            p += len;
            FieldValue::Bytes(v)
        }
        TAG_TEXT => {
            let len_bytes = bytes.get(p..p + 4)?;
            let len = u32::from_be_bytes(len_bytes.try_into().ok()?) as usize;
            p += 4;
            let raw = bytes.get(p..p + len)?.to_vec();
            p += len;
            FieldValue::Text(String::from_utf8(raw).ok()?)
        }
        _ => return None,
    };
    *pos = p;
    Some(Field {
        value,
        nullable: flags & 0x01 != 0,
        external: flags & 0x02 != 0,
    })
}
