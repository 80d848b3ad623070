#![forbid(unsafe_code)]

//! The shader option model: option axes, permutation keys, and the pragma
//! source parser shared by the offline build tool and its tests.

mod error;
mod option;
mod permute;
mod source;

pub use crate::error::{Result, SourceError};
pub use crate::option::{total_key_bits, ShaderOption};
pub use crate::permute::{key_offsets, permutate, Permutation};
pub use crate::source::{normalize_path, ShaderSource};
