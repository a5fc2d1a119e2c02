use thiserror::Error;

use crate::constant_pool;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    FmtError(#[from] std::fmt::Error),
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::CpInfo),
    #[error("Invalid cp info tag: {0}")]
    InvalidCpInfoTag(u8),
    #[error("Invalid constant pool index: {0}")]
    InvalidIndex(u16),
    #[error("Constant pool index {0} is the unusable half of a long or double entry")]
    UnusableSlot(u16),
    #[error("Truncated modified UTF-8 sequence at byte {offset}")]
    TruncatedUtf8 { offset: usize },
    #[error("Invalid descriptor: {0:?}")]
    InvalidDescriptor(String),
    #[error("Invalid signature: {0:?}")]
    InvalidSignature(String),
}
