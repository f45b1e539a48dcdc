use crate::error::{BundleError, BundleResult};

pub(crate) fn get_u64_le(bytes: &[u8]) -> BundleResult<(u64, &[u8])> {
    if bytes.len() < 8 {
        return Err(BundleError::DecodeError("Invalid bytes".into()));
    }
    let ans = u64::from_le_bytes(bytes[..8].try_into().unwrap());
    Ok((ans, &bytes[8..]))
}

pub(crate) fn get_u32_le(bytes: &[u8]) -> BundleResult<(u32, &[u8])> {
    if bytes.len() < 4 {
        return Err(BundleError::DecodeError("Invalid bytes".into()));
    }
    let ans = u32::from_le_bytes(bytes[..4].try_into().unwrap());
    Ok((ans, &bytes[4..]))
}

pub(crate) fn get_i32_le(bytes: &[u8]) -> BundleResult<(i32, &[u8])> {
    if bytes.len() < 4 {
        return Err(BundleError::DecodeError("Invalid bytes".into()));
    }
    let ans = i32::from_le_bytes(bytes[..4].try_into().unwrap());
    Ok((ans, &bytes[4..]))
}

/// Split `n` bytes off the front, or fail if fewer remain.
pub(crate) fn get_bytes(bytes: &[u8], n: usize) -> BundleResult<(&[u8], &[u8])> {
    if bytes.len() < n {
        return Err(BundleError::DecodeError("Invalid bytes".into()));
    }
    Ok(bytes.split_at(n))
}

/// Narrow a wire length to `usize`, failing on 32-bit overflow instead
/// of truncating.
pub(crate) fn to_usize(n: u64) -> BundleResult<usize> {
    usize::try_from(n).map_err(|_| BundleError::DecodeError("Invalid bytes".into()))
}
