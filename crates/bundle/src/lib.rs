//! # Bundle
//!
//! A string-keyed collection of scalar and array values that preserves
//! insertion order and travels between processes as a checksummed,
//! base64-armored byte blob or as a flat argument vector. This document
//! describes the wire format.
//!
//! ## Envelope
//!
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Encoded bundle (before base64)                               │
//! │┌ ─ ─ ─ ─ ─ ─ ─ ─┌ ─ ─ ─ ─ ─ ─ ┬ ─ ─ ─┌ ─ ─ ─ ─ ─ ─ ┐         │
//! │  checksum text  │ cell record   ...  │ cell record │         │
//! ││   32 bytes     │    bytes    │      │    bytes    │         │
//! │ ─ ─ ─ ─ ─ ─ ─ ─ ┘─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ┘─ ─ ─ ─ ─ ─ ─          │
//! └──────────────────────────────────────────────────────────────┘
//!
//! 1. Checksum text (32 bytes): the MD5 digest of everything after it,
//!    rendered as 32 lowercase hex characters. Verified before any
//!    record is parsed; an integrity check, not a signature.
//! 2. Cell records: one self-describing record per cell, in insertion
//!    order. Each record starts with its own total size, so a reader
//!    can step over records without understanding them.
//!
//! [`Bundle::encode`] base64-armors the whole envelope for transport
//! through text-only channels; [`Bundle::encode_raw`] skips the armor
//! for trusted local transfer.
//!
//! ## Cell record
//!
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Cell record                                                      │
//! │┌ ─ ─ ─ ─ ─ ─ ─ ┬ ─ ─ ─ ─ ─┌ ─ ─ ─ ─ ─ ┬ ─ ─ ─ ─ ─┌ ─ ─ ─ ─ ─ ─ ┐│
//! │  record size   │ type tag   key len   │   key      scalar/array ││
//! ││     u64       │   i32    │   u64     │  bytes   │     tail      │
//! │ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ┘─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ┘ ─ ─ ─ ─ ─ ─ ─ │
//! └──────────────────────────────────────────────────────────────────┘
//!
//! Scalar cells append `value len (u64) | value bytes`; array cells
//! append `element count (u32) | element len (u64) × count | element
//! bytes back-to-back`, where an unset slot is written as length 0.
//! Every multi-byte field is little-endian at a fixed width, so blobs
//! decode identically on every platform. Key and string payloads carry
//! a trailing NUL on the wire.
//!
//! Decoding validates every embedded length against the bytes that
//! actually remain before using it; corrupt or truncated input yields
//! an error, never a panic or a partially filled bundle.
//!
//! ## Argv transport
//!
//! [`Bundle::export_to_argv`] flattens a bundle into
//! `["", MARKER, key, armored record, …]` for handing to a spawned
//! process; [`Bundle::import_from_argv`] detects the marker and decodes
//! the records, or falls back to treating an ordinary argument vector
//! as plain `(key, value)` string pairs.
//!
//! ```
//! use bundle::Bundle;
//!
//! let mut b = Bundle::new();
//! b.add_str("a", "123")?;
//! let wire = b.encode();
//! let back = Bundle::decode(wire.as_bytes())?;
//! assert_eq!(back.get("a"), Some("123"));
//! # Ok::<(), bundle::BundleError>(())
//! ```

mod argv;
mod bundle;
mod codec;
mod error;
mod utils;
mod value;

pub use argv::ARGV_MARKER;
pub use bundle::Bundle;
pub use error::{BundleError, BundleResult};
pub use value::{BundleValue, ValueType};
