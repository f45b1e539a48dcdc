//! Wire format for cells and whole bundles.
//!
//! Every multi-byte field is little-endian with a fixed width, so a blob
//! produced on one platform decodes on any other. All lengths embedded
//! in untrusted input are validated against the remaining buffer before
//! they are used; a violation is a decode error, never a panic.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::{BufMut, Bytes};

use crate::bundle::Bundle;
use crate::error::{BundleError, BundleResult};
use crate::utils::{get_bytes, get_i32_le, get_u32_le, get_u64_le, to_usize};
use crate::value::{BundleValue, ValueType};

/// Width of the checksum text prefixed to every encoded bundle: the MD5
/// digest of the payload rendered as 32 lowercase hex characters.
pub(crate) const CHECKSUM_LEN: usize = 32;

const SIZE_OF_U64: usize = std::mem::size_of::<u64>();
const SIZE_OF_U32: usize = std::mem::size_of::<u32>();
const SIZE_OF_TAG: usize = std::mem::size_of::<i32>();

/// ┌──────────────────────────────────────────────────────────────────┐
/// │ Cell record                                                      │
/// │┌ ─ ─ ─ ─ ─ ─ ─ ┬ ─ ─ ─ ─ ─┌ ─ ─ ─ ─ ─ ┬ ─ ─ ─ ─ ─┌ ─ ─ ─ ─ ─ ─ ┐│
/// │  record size   │ type tag   key len   │   key      scalar/array ││
/// ││     u64       │   i32    │   u64     │  bytes   │     tail      │
/// │ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ┘─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ┘ ─ ─ ─ ─ ─ ─ ─ │
/// └──────────────────────────────────────────────────────────────────┘
///
/// Scalar tail: `value len (u64) | value bytes`. Array tail:
/// `element count (u32) | element len (u64) × count | element bytes`.
///
/// The leading size counts the whole record including itself, so a
/// reader can step over records without parsing them. Key and string
/// payloads carry a trailing NUL on the wire (counted in their length);
/// an array hole is written as element length 0.
pub(crate) fn encode_record(key: &str, value: &BundleValue, buf: &mut Vec<u8>) {
    let key_len = key.len() + 1;
    let head_len = SIZE_OF_U64 + SIZE_OF_TAG + SIZE_OF_U64 + key_len;
    let tail_len = match value {
        BundleValue::Str(s) => SIZE_OF_U64 + s.len() + 1,
        BundleValue::Byte(b) => SIZE_OF_U64 + b.len(),
        BundleValue::StrArray(slots) => {
            SIZE_OF_U32
                + slots.len() * SIZE_OF_U64
                + slots
                    .iter()
                    .map(|s| s.as_ref().map_or(0, |s| s.len() + 1))
                    .sum::<usize>()
        }
        BundleValue::ByteArray(slots) => {
            SIZE_OF_U32
                + slots.len() * SIZE_OF_U64
                + slots
                    .iter()
                    .map(|b| b.as_ref().map_or(0, |b| b.len()))
                    .sum::<usize>()
        }
    };
    let total = head_len + tail_len;
    let start = buf.len();

    buf.reserve(total);
    buf.put_u64_le(total as u64);
    buf.put_i32_le(value.value_type().as_i32());
    buf.put_u64_le(key_len as u64);
    buf.put_slice(key.as_bytes());
    buf.put_u8(0);
    match value {
        BundleValue::Str(s) => {
            buf.put_u64_le(s.len() as u64 + 1);
            buf.put_slice(s.as_bytes());
            buf.put_u8(0);
        }
        BundleValue::Byte(b) => {
            buf.put_u64_le(b.len() as u64);
            buf.put_slice(b);
        }
        BundleValue::StrArray(slots) => {
            buf.put_u32_le(slots.len() as u32);
            for slot in slots {
                buf.put_u64_le(slot.as_ref().map_or(0, |s| s.len() as u64 + 1));
            }
            for slot in slots.iter().flatten() {
                buf.put_slice(slot.as_bytes());
                buf.put_u8(0);
            }
        }
        BundleValue::ByteArray(slots) => {
            buf.put_u32_le(slots.len() as u32);
            for slot in slots {
                buf.put_u64_le(slot.as_ref().map_or(0, |b| b.len() as u64));
            }
            for slot in slots.iter().flatten() {
                buf.put_slice(slot);
            }
        }
    }
    debug_assert_eq!(buf.len() - start, total);
}

/// Decode one record from the front of `data`. Returns the cell and the
/// number of bytes consumed so a caller can walk a record sequence.
///
/// Every embedded length is checked against the bytes that actually
/// remain; the record must be consumed exactly, with no slack.
pub(crate) fn decode_record(data: &[u8]) -> BundleResult<(String, BundleValue, usize)> {
    let (total, _) = get_u64_le(data)?;
    if total < SIZE_OF_U64 as u64 || total > data.len() as u64 {
        return Err(BundleError::decode("record size out of range"));
    }
    let total = total as usize;
    let body = &data[SIZE_OF_U64..total];

    let (tag, body) = get_i32_le(body)?;
    let value_type =
        ValueType::from_i32(tag).ok_or_else(|| BundleError::decode("unknown type tag"))?;
    let (key_len, body) = get_u64_le(body)?;
    let (key_bytes, body) = get_bytes(body, to_usize(key_len)?)?;
    let key = read_text(key_bytes)?;
    if key.is_empty() {
        return Err(BundleError::decode("record has an empty key"));
    }

    let (value, body) = match value_type {
        ValueType::Str => {
            let (val_len, body) = get_u64_le(body)?;
            let (val, body) = get_bytes(body, to_usize(val_len)?)?;
            (BundleValue::Str(read_text(val)?), body)
        }
        ValueType::Byte => {
            let (val_len, body) = get_u64_le(body)?;
            let (val, body) = get_bytes(body, to_usize(val_len)?)?;
            (BundleValue::Byte(Bytes::copy_from_slice(val)), body)
        }
        ValueType::StrArray => {
            let (sizes, mut body) = decode_element_sizes(body)?;
            let mut slots = Vec::with_capacity(sizes.len());
            for size in sizes {
                if size == 0 {
                    slots.push(None);
                    continue;
                }
                let (elem, rest) = get_bytes(body, size)?;
                slots.push(Some(read_text(elem)?));
                body = rest;
            }
            (BundleValue::StrArray(slots), body)
        }
        ValueType::ByteArray => {
            let (sizes, mut body) = decode_element_sizes(body)?;
            let mut slots = Vec::with_capacity(sizes.len());
            for size in sizes {
                if size == 0 {
                    slots.push(None);
                    continue;
                }
                let (elem, rest) = get_bytes(body, size)?;
                slots.push(Some(Bytes::copy_from_slice(elem)));
                body = rest;
            }
            (BundleValue::ByteArray(slots), body)
        }
    };

    if !body.is_empty() {
        return Err(BundleError::decode("record has trailing bytes"));
    }
    Ok((key, value, total))
}

/// Element count plus the per-element size table of an array tail. The
/// table length is validated before the element sizes are trusted.
fn decode_element_sizes(body: &[u8]) -> BundleResult<(Vec<usize>, &[u8])> {
    let (count, body) = get_u32_le(body)?;
    let count = count as usize;
    if count > body.len() / SIZE_OF_U64 {
        return Err(BundleError::decode("element size table out of range"));
    }
    let mut sizes = Vec::with_capacity(count);
    let mut body = body;
    for _ in 0..count {
        let (size, rest) = get_u64_le(body)?;
        sizes.push(to_usize(size)?);
        body = rest;
    }
    Ok((sizes, body))
}

/// A NUL-terminated UTF-8 run, with the terminator stripped.
fn read_text(bytes: &[u8]) -> BundleResult<String> {
    match bytes.split_last() {
        Some((0, text)) => std::str::from_utf8(text)
            .map(|s| s.to_owned())
            .map_err(|_| BundleError::decode("text payload is not valid utf-8")),
        _ => Err(BundleError::decode("text payload is missing its terminator")),
    }
}

/// `checksum text (32) || record × n`. The checksum is computed over the
/// record bytes only and backfilled into the reserved prefix.
pub(crate) fn encode_envelope(bundle: &Bundle) -> Vec<u8> {
    let mut out = vec![0; CHECKSUM_LEN];
    for (key, value) in bundle.iter() {
        encode_record(key, value, &mut out);
    }
    let digest = checksum_text(&out[CHECKSUM_LEN..]);
    out[..CHECKSUM_LEN].copy_from_slice(&digest);
    out
}

pub(crate) fn decode_envelope(data: &[u8]) -> BundleResult<Bundle> {
    if data.len() < CHECKSUM_LEN {
        return Err(BundleError::decode("input shorter than its checksum"));
    }
    let (stored, mut body) = data.split_at(CHECKSUM_LEN);
    if stored != checksum_text(body) {
        return Err(BundleError::ChecksumMismatch);
    }

    let mut bundle = Bundle::new();
    while !body.is_empty() {
        let (key, value, used) = decode_record(body)?;
        bundle.push_cell(key, value);
        body = &body[used..];
    }
    Ok(bundle)
}

pub(crate) fn armor(raw: &[u8]) -> String {
    STANDARD.encode(raw)
}

pub(crate) fn unarmor(text: &[u8]) -> BundleResult<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| BundleError::decode(format!("base64 ({e})")))
}

fn checksum_text(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = format!("{:x}", md5::compute(payload));
    let mut out = [0; CHECKSUM_LEN];
    out.copy_from_slice(digest.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(key: &str, value: BundleValue) {
        let mut buf = Vec::new();
        encode_record(key, &value, &mut buf);
        let (k, v, used) = decode_record(&buf).unwrap();
        assert_eq!(k, key);
        assert_eq!(v, value);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn record_round_trip_scalars() {
        round_trip("a", BundleValue::Str("123".into()));
        round_trip("empty", BundleValue::Str(String::new()));
        round_trip("raw", BundleValue::Byte(Bytes::from_static(b"\x00\x01\xff")));
        round_trip("nothing", BundleValue::Byte(Bytes::new()));
    }

    #[test]
    fn record_round_trip_arrays() {
        round_trip(
            "langs",
            BundleValue::StrArray(vec![Some("de".into()), None, Some("".into())]),
        );
        round_trip("holes-only", BundleValue::StrArray(vec![None, None]));
        round_trip("zero-len", BundleValue::StrArray(Vec::new()));
        round_trip(
            "blobs",
            BundleValue::ByteArray(vec![Some(Bytes::from_static(b"\xde\xad")), None]),
        );
    }

    #[test]
    fn record_walk_consumes_exactly() {
        let mut buf = Vec::new();
        encode_record("first", &BundleValue::Str("1".into()), &mut buf);
        let first_len = buf.len();
        encode_record("second", &BundleValue::Str("2".into()), &mut buf);

        let (key, _, used) = decode_record(&buf).unwrap();
        assert_eq!(key, "first");
        assert_eq!(used, first_len);
        let (key, _, _) = decode_record(&buf[used..]).unwrap();
        assert_eq!(key, "second");
    }

    #[test]
    fn record_rejects_bad_sizes() {
        let mut buf = Vec::new();
        encode_record("k", &BundleValue::Str("v".into()), &mut buf);

        // declared size larger than the buffer
        let mut oversize = buf.clone();
        oversize[0] = oversize[0].wrapping_add(1);
        assert!(decode_record(&oversize).is_err());

        // declared size smaller than the actual record leaves slack
        let mut undersize = buf.clone();
        undersize[0] -= 1;
        assert!(decode_record(&undersize).is_err());

        // truncated buffer
        assert!(decode_record(&buf[..buf.len() - 1]).is_err());
        assert!(decode_record(&buf[..4]).is_err());
    }

    #[test]
    fn record_rejects_bad_tag_and_key() {
        let mut buf = Vec::new();
        encode_record("k", &BundleValue::Str("v".into()), &mut buf);

        let mut bad_tag = buf.clone();
        bad_tag[8] = 0x33;
        assert!(decode_record(&bad_tag).is_err());

        // key loses its NUL terminator ("k\0" sits right after the
        // 20-byte header)
        let mut bad_key = buf.clone();
        bad_key[21] = b'x';
        assert!(decode_record(&bad_key).is_err());
    }

    #[test]
    fn record_rejects_hostile_element_table() {
        let mut buf = Vec::new();
        encode_record(
            "arr",
            &BundleValue::StrArray(vec![Some("a".into())]),
            &mut buf,
        );
        // inflate the element count field far past the data
        let count_at = buf.len() - (8 + 2); // count | one size | "a\0"
        let before = buf.clone();
        buf[count_at - 4..count_at].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(decode_record(&buf).is_err());
        assert!(decode_record(&before).is_ok());
    }

    #[test]
    fn envelope_round_trip_and_checksum() {
        let mut b = Bundle::new();
        b.add_str("a", "123").unwrap();
        b.add_str("b", "456").unwrap();
        let raw = encode_envelope(&b);
        assert!(raw[..CHECKSUM_LEN].iter().all(|c| c.is_ascii_hexdigit()));
        let back = decode_envelope(&raw).unwrap();
        assert_eq!(back, b);

        // every checksum byte is load-bearing
        let mut corrupted = raw.clone();
        corrupted[0] ^= 1;
        assert!(decode_envelope(&corrupted).is_err());

        // payload corruption is caught before any record is parsed
        let mut corrupted = raw.clone();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xff;
        assert!(matches!(
            decode_envelope(&corrupted),
            Err(BundleError::ChecksumMismatch)
        ));

        assert!(decode_envelope(&raw[..CHECKSUM_LEN - 1]).is_err());
    }

    #[test]
    fn empty_bundle_envelope() {
        let raw = encode_envelope(&Bundle::new());
        assert_eq!(raw.len(), CHECKSUM_LEN);
        let back = decode_envelope(&raw).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn armor_round_trip() {
        let raw = encode_envelope(&Bundle::new());
        let text = armor(&raw);
        assert!(text.is_ascii());
        assert_eq!(unarmor(text.as_bytes()).unwrap(), raw);
        assert!(unarmor(b"not base64 at all!").is_err());
    }
}
