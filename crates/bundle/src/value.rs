use bytes::Bytes;
use enum_as_inner::EnumAsInner;

use crate::error::{BundleError, BundleResult};

/// Numeric type tag carried in encoded records. The `0x0100` bit marks
/// array cells and is orthogonal to the base type; string tags also
/// carry the `0x0400` bit marking NUL-measured payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ValueType {
    Str = 0x0401,
    StrArray = 0x0501,
    Byte = 0x0002,
    ByteArray = 0x0102,
}

impl ValueType {
    pub const ARRAY_FLAG: i32 = 0x0100;

    pub fn from_i32(tag: i32) -> Option<Self> {
        match tag {
            0x0401 => Some(ValueType::Str),
            0x0501 => Some(ValueType::StrArray),
            0x0002 => Some(ValueType::Byte),
            0x0102 => Some(ValueType::ByteArray),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_array(self) -> bool {
        self.as_i32() & Self::ARRAY_FLAG != 0
    }

    /// The scalar tag with the array bit stripped.
    pub fn base(self) -> ValueType {
        match self {
            ValueType::StrArray => ValueType::Str,
            ValueType::ByteArray => ValueType::Byte,
            other => other,
        }
    }
}

/// The payload of one cell: a scalar string or byte buffer, or a
/// fixed-length array of independently owned optional elements.
///
/// An array slot holding `None` is a hole: reserved at creation, not
/// yet filled (or cleared again). The slot count of an array never
/// changes after the cell is created.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum BundleValue {
    Str(String),
    Byte(Bytes),
    StrArray(Vec<Option<String>>),
    ByteArray(Vec<Option<Bytes>>),
}

impl BundleValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            BundleValue::Str(_) => ValueType::Str,
            BundleValue::Byte(_) => ValueType::Byte,
            BundleValue::StrArray(_) => ValueType::StrArray,
            BundleValue::ByteArray(_) => ValueType::ByteArray,
        }
    }

    pub fn is_array(&self) -> bool {
        self.value_type().is_array()
    }

    /// Slot count for array values, `None` for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            BundleValue::StrArray(slots) => Some(slots.len()),
            BundleValue::ByteArray(slots) => Some(slots.len()),
            _ => None,
        }
    }

    pub(crate) fn set_str_element(&mut self, idx: usize, value: Option<&str>) -> BundleResult<()> {
        match self {
            BundleValue::StrArray(slots) => set_slot(slots, idx, value.map(|s| s.to_owned())),
            _ => Err(BundleError::invalid_arg("value is not a string array")),
        }
    }

    pub(crate) fn set_byte_element(
        &mut self,
        idx: usize,
        value: Option<&[u8]>,
    ) -> BundleResult<()> {
        match self {
            BundleValue::ByteArray(slots) => {
                set_slot(slots, idx, value.map(Bytes::copy_from_slice))
            }
            _ => Err(BundleError::invalid_arg("value is not a byte array")),
        }
    }
}

/// Slot mutation rules shared by both array flavors: a slot is filled
/// exactly once and may be cleared at any time. Filling an occupied
/// slot is an error; clearing an empty one is a no-op.
fn set_slot<T>(slots: &mut [Option<T>], idx: usize, value: Option<T>) -> BundleResult<()> {
    let len = slots.len();
    let slot = slots
        .get_mut(idx)
        .ok_or_else(|| BundleError::invalid_arg(format!("index {idx} out of range (len {len})")))?;
    match (slot.is_some(), value) {
        (true, Some(_)) => Err(BundleError::invalid_arg(format!(
            "array element {idx} is already set"
        ))),
        (true, None) => {
            *slot = None;
            Ok(())
        }
        (false, Some(v)) => {
            *slot = Some(v);
            Ok(())
        }
        (false, None) => Ok(()),
    }
}

impl From<&str> for BundleValue {
    fn from(value: &str) -> Self {
        BundleValue::Str(value.to_owned())
    }
}

impl From<String> for BundleValue {
    fn from(value: String) -> Self {
        BundleValue::Str(value)
    }
}

impl From<Bytes> for BundleValue {
    fn from(value: Bytes) -> Self {
        BundleValue::Byte(value)
    }
}

impl From<Vec<u8>> for BundleValue {
    fn from(value: Vec<u8>) -> Self {
        BundleValue::Byte(value.into())
    }
}

impl From<Vec<String>> for BundleValue {
    fn from(value: Vec<String>) -> Self {
        BundleValue::StrArray(value.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<String>>> for BundleValue {
    fn from(value: Vec<Option<String>>) -> Self {
        BundleValue::StrArray(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        for t in [
            ValueType::Str,
            ValueType::StrArray,
            ValueType::Byte,
            ValueType::ByteArray,
        ] {
            assert_eq!(ValueType::from_i32(t.as_i32()), Some(t));
        }
        assert_eq!(ValueType::from_i32(0), None);
        assert_eq!(ValueType::from_i32(0x0300), None);
    }

    #[test]
    fn array_flag() {
        assert!(ValueType::StrArray.is_array());
        assert!(ValueType::ByteArray.is_array());
        assert!(!ValueType::Str.is_array());
        assert!(!ValueType::Byte.is_array());
        assert_eq!(ValueType::StrArray.base(), ValueType::Str);
        assert_eq!(ValueType::ByteArray.base(), ValueType::Byte);
    }

    #[test]
    fn accessors() {
        let s = BundleValue::Str("v".into());
        assert_eq!(s.as_str().map(String::as_str), Some("v"));
        assert!(!s.is_array());
        assert_eq!(s.array_len(), None);

        let arr = BundleValue::StrArray(vec![Some("a".into()), None]);
        assert!(arr.is_str_array());
        assert!(arr.is_array());
        assert_eq!(arr.array_len(), Some(2));
        assert_eq!(
            BundleValue::ByteArray(vec![None; 3]).array_len(),
            Some(3)
        );
    }

    #[test]
    fn slot_fill_once_clear_anytime() {
        let mut v = BundleValue::StrArray(vec![None, None]);
        v.set_str_element(0, Some("a")).unwrap();
        assert!(v.set_str_element(0, Some("b")).is_err());
        v.set_str_element(0, None).unwrap();
        v.set_str_element(0, Some("b")).unwrap();
        assert_eq!(
            v,
            BundleValue::StrArray(vec![Some("b".to_owned()), None])
        );
        // clearing an unset slot stays a no-op
        v.set_str_element(1, None).unwrap();
        assert!(v.set_str_element(2, Some("c")).is_err());
    }

    #[test]
    fn slot_type_checked() {
        let mut v = BundleValue::ByteArray(vec![None]);
        assert!(v.set_str_element(0, Some("a")).is_err());
        v.set_byte_element(0, Some(b"a".as_slice())).unwrap();
        assert!(BundleValue::Str("x".into()).set_byte_element(0, None).is_err());
    }
}
