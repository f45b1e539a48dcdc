use thiserror::Error;

pub type BundleResult<T> = Result<T, BundleError>;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Invalid argument ({0})")]
    InvalidArgument(Box<str>),
    #[error("Key {0:?} already exists in the bundle")]
    KeyExists(Box<str>),
    #[error("Key {0:?} is not present in the bundle")]
    KeyNotFound(Box<str>),
    #[error("Decode error ({0})")]
    DecodeError(Box<str>),
    #[error("Checksum mismatch. The data is corrupted.")]
    ChecksumMismatch,
}

impl BundleError {
    pub(crate) fn invalid_arg(msg: impl Into<Box<str>>) -> Self {
        BundleError::InvalidArgument(msg.into())
    }

    pub(crate) fn decode(msg: impl Into<Box<str>>) -> Self {
        BundleError::DecodeError(msg.into())
    }
}
