use thiserror::Error;

#[derive(Error, Debug)]
pub enum HfsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    #[error("invalid HFS signature: 0x{0:04X} (expected 0x482B, 0x4858 or 0x4244)")]
    InvalidSignature(u16),

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("invalid B-tree: {0}")]
    InvalidBTree(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("aborted")]
    Aborted,
}

impl HfsError {
    /// True for the recoverable "no such entry" signal, which the public
    /// lookup functions convert to `Ok(None)`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HfsError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, HfsError>;
