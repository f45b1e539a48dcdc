use bytes::Bytes;

use crate::codec;
use crate::error::{BundleError, BundleResult};
use crate::value::{BundleValue, ValueType};

#[derive(Debug, Clone, PartialEq)]
struct Cell {
    key: String,
    value: BundleValue,
}

/// A string-keyed collection of scalar and array values, iterated in
/// insertion order, with a checksummed wire form for crossing process
/// boundaries.
///
/// Keys are unique, case-sensitive and non-empty. The collection is
/// single-owner: `&mut self` is required for every mutation and there
/// is no internal locking.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    // argv-scale collections; linear scans beat hashing here
    cells: Vec<Cell>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell holding a prebuilt value. The typed `add_*`
    /// variants below are the usual entry points.
    pub fn add(&mut self, key: &str, value: BundleValue) -> BundleResult<()> {
        if key.is_empty() {
            return Err(BundleError::invalid_arg("key must not be empty"));
        }
        if self.find(key).is_some() {
            return Err(BundleError::KeyExists(key.into()));
        }
        self.cells.push(Cell {
            key: key.to_owned(),
            value,
        });
        Ok(())
    }

    pub fn add_str(&mut self, key: &str, value: &str) -> BundleResult<()> {
        self.add(key, BundleValue::Str(value.to_owned()))
    }

    pub fn add_byte(&mut self, key: &str, value: Bytes) -> BundleResult<()> {
        self.add(key, BundleValue::Byte(value))
    }

    /// Append a string array with every slot filled from `values`.
    pub fn add_str_array(&mut self, key: &str, values: &[&str]) -> BundleResult<()> {
        self.add(
            key,
            BundleValue::StrArray(values.iter().map(|s| Some((*s).to_owned())).collect()),
        )
    }

    /// Append a string array of `len` unset slots, to be filled one at
    /// a time with [`Bundle::set_str_array_element`].
    pub fn add_empty_str_array(&mut self, key: &str, len: usize) -> BundleResult<()> {
        self.add(key, BundleValue::StrArray(vec![None; len]))
    }

    /// Append a byte array of `len` unset slots. Byte arrays are only
    /// ever created empty and filled through
    /// [`Bundle::set_byte_array_element`].
    pub fn add_empty_byte_array(&mut self, key: &str, len: usize) -> BundleResult<()> {
        self.add(key, BundleValue::ByteArray(vec![None; len]))
    }

    pub fn get_value(&self, key: &str) -> BundleResult<&BundleValue> {
        self.find(key)
            .map(|cell| &cell.value)
            .ok_or_else(|| BundleError::KeyNotFound(key.into()))
    }

    pub fn get_str(&self, key: &str) -> BundleResult<&str> {
        match self.get_value(key)? {
            BundleValue::Str(s) => Ok(s),
            other => Err(type_mismatch(key, ValueType::Str, other)),
        }
    }

    pub fn get_byte(&self, key: &str) -> BundleResult<&[u8]> {
        match self.get_value(key)? {
            BundleValue::Byte(b) => Ok(b),
            other => Err(type_mismatch(key, ValueType::Byte, other)),
        }
    }

    /// The slots of a string array; unset slots are `None`.
    pub fn get_str_array(&self, key: &str) -> BundleResult<&[Option<String>]> {
        match self.get_value(key)? {
            BundleValue::StrArray(slots) => Ok(slots),
            other => Err(type_mismatch(key, ValueType::StrArray, other)),
        }
    }

    pub fn get_byte_array(&self, key: &str) -> BundleResult<&[Option<Bytes>]> {
        match self.get_value(key)? {
            BundleValue::ByteArray(slots) => Ok(slots),
            other => Err(type_mismatch(key, ValueType::ByteArray, other)),
        }
    }

    /// Value-or-nothing convenience for string cells: `None` when the
    /// key is absent or the cell is not a string. [`Bundle::get_str`]
    /// is the explicit twin that reports why.
    pub fn get(&self, key: &str) -> Option<&str> {
        match &self.find(key)?.value {
            BundleValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_type(&self, key: &str) -> BundleResult<ValueType> {
        self.get_value(key).map(|v| v.value_type())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Drop the cell stored under `key`; the order of the remaining
    /// cells is unchanged.
    pub fn remove(&mut self, key: &str) -> BundleResult<()> {
        if key.is_empty() {
            return Err(BundleError::invalid_arg("key must not be empty"));
        }
        match self.cells.iter().position(|cell| cell.key == key) {
            Some(idx) => {
                self.cells.remove(idx);
                Ok(())
            }
            None => Err(BundleError::KeyNotFound(key.into())),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BundleValue)> {
        self.cells.iter().map(|cell| (cell.key.as_str(), &cell.value))
    }

    /// Visitor form of [`Bundle::iter`]; closure captures take the
    /// place of a user-context pointer.
    pub fn for_each(&self, mut f: impl FnMut(&str, &BundleValue)) {
        for (key, value) in self.iter() {
            f(key, value);
        }
    }

    /// Fill one slot of the string array under `key`. A slot can be
    /// filled only once; there is no clear form on the string surface.
    pub fn set_str_array_element(&mut self, key: &str, idx: usize, value: &str) -> BundleResult<()> {
        let cell = self.find_mut(key)?;
        cell.value.set_str_element(idx, Some(value))
    }

    /// Fill (`Some`) or clear (`None`) one slot of the byte array under
    /// `key`. A slot can be filled only once but cleared at any time.
    pub fn set_byte_array_element(
        &mut self,
        key: &str,
        idx: usize,
        value: Option<&[u8]>,
    ) -> BundleResult<()> {
        let cell = self.find_mut(key)?;
        cell.value.set_byte_element(idx, value)
    }

    /// Encode into the base64-armored wire form:
    /// `base64(checksum text || cell records)`.
    pub fn encode(&self) -> String {
        codec::armor(&codec::encode_envelope(self))
    }

    /// The wire form without the base64 armor, for trusted local
    /// transfer. Double-armoring an already encoded blob is a caller
    /// error and is not guarded against.
    pub fn encode_raw(&self) -> Vec<u8> {
        codec::encode_envelope(self)
    }

    /// Decode the output of [`Bundle::encode`]. The checksum is
    /// verified before any record is parsed; a corrupt or truncated
    /// input yields an error and never a partially filled bundle.
    pub fn decode(data: &[u8]) -> BundleResult<Bundle> {
        codec::decode_envelope(&codec::unarmor(data)?)
    }

    /// Decode the output of [`Bundle::encode_raw`].
    pub fn decode_raw(data: &[u8]) -> BundleResult<Bundle> {
        codec::decode_envelope(data)
    }

    /// Append a decoded cell directly, trusting the decoder's
    /// validation and skipping the duplicate-key check.
    pub(crate) fn push_cell(&mut self, key: String, value: BundleValue) {
        self.cells.push(Cell { key, value });
    }

    fn find(&self, key: &str) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.key == key)
    }

    fn find_mut(&mut self, key: &str) -> BundleResult<&mut Cell> {
        self.cells
            .iter_mut()
            .find(|cell| cell.key == key)
            .ok_or_else(|| BundleError::KeyNotFound(key.into()))
    }
}

/// Same count and, for every key of `self`, a cell in `other` with the
/// same type and byte-identical contents. Insertion order is observable
/// through iteration but is deliberately not part of equality.
impl PartialEq for Bundle {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .cells
                .iter()
                .all(|cell| other.find(&cell.key).map_or(false, |o| o.value == cell.value))
    }
}

fn type_mismatch(key: &str, requested: ValueType, found: &BundleValue) -> BundleError {
    BundleError::invalid_arg(format!(
        "key {key:?} holds a {:?} cell, not {requested:?}",
        found.value_type()
    ))
}
