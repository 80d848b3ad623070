#![forbid(unsafe_code)]

//! CSG3: the chunked, compressed, random-access container for compiled
//! shader groups.
//!
//! A container stores every compiled permutation of one shader, keyed by
//! the permutation's bit-packed option indices. Variants are grouped into
//! chunks along the low bits of the key so a lookup decompresses exactly
//! one chunk, and the reader keeps at most one chunk decompressed at a
//! time.

mod codec;
mod error;
pub mod format;
mod io;
mod layout;
mod reader;
mod variant;
mod writer;

pub use crate::codec::{Codec, Lz4Codec, RawCodec};
pub use crate::error::{CodecError, ContainerError, Result};
pub use crate::layout::ChunkLayout;
pub use crate::reader::ShaderGroupReader;
pub use crate::variant::CompiledVariant;
pub use crate::writer::{write_container, write_container_file, write_debug_sidecar};
