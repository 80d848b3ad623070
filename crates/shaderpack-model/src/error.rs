use std::path::PathBuf;

use thiserror::Error;

/// An error produced while loading or validating an annotated shader source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The root source or one of its transitive `#include` dependencies could
    /// not be opened.
    #[error("shader source not found: {path}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An `#pragma option` line did not match any of the supported forms, or
    /// matched one with invalid contents (empty enumeration, inverted integer
    /// range).
    #[error("malformed option pragma at {path}:{line}: {message}")]
    MalformedOption {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, SourceError>;
