use thiserror::Error;

/// An error while encoding or decoding a compressed chunk payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("compression failed: {0}")]
    Compress(&'static str),

    #[error("decompression failed: {0}")]
    Decompress(&'static str),

    #[error("chunk payload too large: {len} bytes exceeds maximum {max}")]
    TooLarge { len: usize, max: usize },
}

/// An error while writing or opening a CSG3 container.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The container bytes are structurally invalid: wrong magic, truncated
    /// directory, inconsistent offsets, or a malformed variant record.
    #[error("corrupt container: {0}")]
    Corrupt(&'static str),

    /// A size field does not fit the format or exceeds a decode limit.
    #[error("container value out of range: {0}")]
    TooLarge(&'static str),

    /// The writer was handed input that contradicts the chunk layout, e.g.
    /// variants out of enumeration order or an empty group.
    #[error("invalid writer input: {0}")]
    InvalidInput(&'static str),

    #[error("allocation of {len} bytes failed")]
    OutOfMemory { len: usize },
}

pub type Result<T> = std::result::Result<T, ContainerError>;
