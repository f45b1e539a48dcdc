//! Transport of a whole bundle through a process argument vector.
//!
//! Slot 0 is the conventional program-name slot and stays empty; slot 1
//! carries a marker distinguishing exporter-produced vectors from
//! arbitrary argument lists; the rest are `(key, value)` pairs. In an
//! exported vector each value slot is one base64-armored cell record.

use crate::bundle::Bundle;
use crate::codec;
use crate::error::{BundleError, BundleResult};

/// Sentinel placed in slot 1 by [`Bundle::export_to_argv`]. An
/// arbitrary caller-supplied first argument is vanishingly unlikely to
/// collide with it.
pub const ARGV_MARKER: &str = "`zaybxcwdveuftgsh`";

impl Bundle {
    /// Flatten into `["", MARKER, key, record, key, record, …]` with
    /// one armored record per cell, in insertion order. The vector
    /// length is `2 * len + 2`.
    pub fn export_to_argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(2 * self.len() + 2);
        argv.push(String::new());
        argv.push(ARGV_MARKER.to_owned());
        for (key, value) in self.iter() {
            let mut record = Vec::new();
            codec::encode_record(key, value, &mut record);
            argv.push(key.to_owned());
            argv.push(codec::armor(&record));
        }
        argv
    }

    /// Rebuild a bundle from an argument vector.
    ///
    /// A vector whose slot 1 is not the marker is treated as a plain
    /// argument list: slots from index 1 are paired `(key, value)` and
    /// added as string cells, a trailing unpaired key is dropped, and
    /// pairs the container refuses (duplicate or empty key) are
    /// skipped. With the marker present, slots from index 2 are paired
    /// and each value is decoded as one armored record; any decode
    /// failure is an error for the whole import. The record carries the
    /// authoritative key, and decoded cells are appended without the
    /// duplicate-key check.
    pub fn import_from_argv<S: AsRef<str>>(args: &[S]) -> BundleResult<Bundle> {
        let mut bundle = Bundle::new();
        if args.len() < 2 {
            return Ok(bundle);
        }

        if args[1].as_ref() != ARGV_MARKER {
            for pair in args[1..].chunks_exact(2) {
                let (key, value) = (pair[0].as_ref(), pair[1].as_ref());
                if let Err(err) = bundle.add_str(key, value) {
                    tracing::debug!("skipping argv pair {:?}: {}", key, err);
                }
            }
            return Ok(bundle);
        }

        for pair in args[2..].chunks_exact(2) {
            let raw = codec::unarmor(pair[1].as_ref().as_bytes())?;
            let (key, value, used) = codec::decode_record(&raw)?;
            if used != raw.len() {
                return Err(BundleError::decode("argv record has trailing bytes"));
            }
            bundle.push_cell(key, value);
        }
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn export_shape() {
        let mut b = Bundle::new();
        b.add_str("a", "1").unwrap();
        b.add_str("b", "2").unwrap();
        let argv = b.export_to_argv();
        assert_eq!(argv.len(), 2 * b.len() + 2);
        assert_eq!(argv[0], "");
        assert_eq!(argv[1], ARGV_MARKER);
        assert_eq!(argv[2], "a");
        assert_eq!(argv[4], "b");
        // value slots are armor, not the plain values
        assert_ne!(argv[3], "1");
        assert!(argv[3].is_ascii());
    }

    #[test]
    fn round_trip_all_cell_kinds() {
        let mut b = Bundle::new();
        b.add_str("s", "hello").unwrap();
        b.add_byte("raw", Bytes::from_static(b"\x00\xff")).unwrap();
        b.add_str_array("langs", &["en", "ko"]).unwrap();
        b.add_empty_str_array("holes", 3).unwrap();
        b.set_str_array_element("holes", 1, "mid").unwrap();
        b.add_empty_byte_array("blobs", 2).unwrap();
        b.set_byte_array_element("blobs", 0, Some(b"\xaa\xbb".as_slice()))
            .unwrap();

        let back = Bundle::import_from_argv(&b.export_to_argv()).unwrap();
        assert_eq!(back, b);
        assert_eq!(
            back.get_str_array("holes").unwrap(),
            &[None, Some("mid".to_owned()), None]
        );
    }

    #[test]
    fn empty_bundle_round_trip() {
        let argv = Bundle::new().export_to_argv();
        assert_eq!(argv.len(), 2);
        let back = Bundle::import_from_argv(&argv).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn plain_vector_fallback() {
        let args = ["prog", "k1", "v1", "k2", "v2"];
        let b = Bundle::import_from_argv(&args).unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b.get_str("k1").unwrap(), "v1");
        assert_eq!(b.get_str("k2").unwrap(), "v2");
    }

    #[test]
    fn plain_vector_drops_trailing_key_and_duplicates() {
        let args = ["prog", "k", "first", "k", "second", "tail"];
        let b = Bundle::import_from_argv(&args).unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(b.get_str("k").unwrap(), "first");

        let empty: [&str; 0] = [];
        assert!(Bundle::import_from_argv(&empty).unwrap().is_empty());
        assert!(Bundle::import_from_argv(&["prog"]).unwrap().is_empty());
    }

    #[test]
    fn marker_vector_rejects_corruption() {
        let mut b = Bundle::new();
        b.add_str("a", "1").unwrap();
        let mut argv = b.export_to_argv();

        argv[3] = "???not-base64???".to_owned();
        assert!(Bundle::import_from_argv(&argv).is_err());

        // valid armor around a mangled record
        let mut raw = codec::unarmor(b.export_to_argv()[3].as_bytes()).unwrap();
        raw[8] = 0x7f;
        argv[3] = codec::armor(&raw);
        assert!(Bundle::import_from_argv(&argv).is_err());
    }

    #[test]
    fn marker_vector_trusts_duplicate_keys() {
        let mut b = Bundle::new();
        b.add_str("dup", "one").unwrap();
        let mut argv = b.export_to_argv();
        let (key, record) = (argv[2].clone(), argv[3].clone());
        argv.push(key);
        argv.push(record);

        let back = Bundle::import_from_argv(&argv).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.get_str("dup").unwrap(), "one");
    }
}
