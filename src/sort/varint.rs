//! The spill-record `extra_len` varint (`spec.md` §3 "Spill run").
//!
//! > `extra_len_varint` uses a 1- or 2-byte encoding: values `1..127` occupy
//! > one byte; values `128..0x7FFF+1` occupy two big-endian bytes with the
//! > high bit set on the first. The logical extra length is
//! > `encoded_value − 1`. A byte `0x00` marks **end of run**.

/// Sentinel byte marking the end of a run (§3).
pub const END_OF_RUN: u8 = 0x00;

/// Largest `extra_len` this encoding can carry (two-byte form, high bit
/// reserved as the continuation flag).
pub const MAX_EXTRA_LEN: usize = 0x7FFE;

/// Encode an extra-field length as `encoded_value = extra_len + 1`.
/// Returns `None` if `extra_len` exceeds `MAX_EXTRA_LEN`.
pub fn encode_extra_len(extra_len: usize) -> Option<Vec<u8>> {
    if extra_len > MAX_EXTRA_LEN {
        return None;
    }
    let encoded = (extra_len + 1) as u16;
    if encoded <= 127 {
        Some(vec![encoded as u8])
    } else {
        let tagged = encoded | 0x8000;
        Some(tagged.to_be_bytes().to_vec())
    }
}

/// Decode starting at `bytes[0]`. Returns `(extra_len, bytes_consumed)`, or
/// `None` if `bytes[0]` is the end-of-run marker.
pub fn decode_extra_len(bytes: &[u8]) -> Option<(usize, usize)> {
    let first = bytes[0];
    if first == END_OF_RUN {
        return None;
    }
    if first & 0x80 == 0 {
        Some((first as usize - 1, 1))
    } else {
        let encoded = u16::from_be_bytes([bytes[0], bytes[1]]) & 0x7FFF;
        Some((encoded as usize - 1, 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_one_byte_range() {
        for extra_len in [0usize, 1, 50, 126] {
            let encoded = encode_extra_len(extra_len).unwrap();
            assert_eq!(encoded.len(), 1);
            let (decoded, consumed) = decode_extra_len(&encoded).unwrap();
            assert_eq!(decoded, extra_len);
            assert_eq!(consumed, 1);
        }
    }

    #[test]
    fn round_trips_two_byte_range() {
        for extra_len in [127usize, 128, 1000, MAX_EXTRA_LEN] {
            let encoded = encode_extra_len(extra_len).unwrap();
            assert_eq!(encoded.len(), 2);
            let (decoded, consumed) = decode_extra_len(&encoded).unwrap();
            assert_eq!(decoded, extra_len);
            assert_eq!(consumed, 2);
        }
    }

    #[test]
    fn end_of_run_marker_decodes_to_none() {
        assert!(decode_extra_len(&[0x00]).is_none());
    }

    #[test]
    fn rejects_lengths_past_the_encoding_ceiling() {
        assert!(encode_extra_len(MAX_EXTRA_LEN + 1).is_none());
    }
}
