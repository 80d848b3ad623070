//! CSG3 container reader.
//!
//! The directory is read eagerly at open and validated the way untrusted
//! input deserves: every offset and count is bounds-checked before any
//! payload is touched. Variant lookups activate at most one decompressed
//! chunk at a time; activating a different chunk drops the previous one.
//! Decoded variants are cached by key so repeated lookups stay cheap even
//! across evictions.
//!
//! A single instance-level lock covers the file handle, the active chunk,
//! and the cache. Lookups are serialised; callers that need parallel
//! throughput should pool several readers, each owning its own handle.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::codec::{Codec, Lz4Codec};
use crate::error::{ContainerError, Result};
use crate::format::{
    CONTAINER_MAGIC, MAX_CHUNK_COUNT, MAX_COMPRESSED_CHUNK_LEN, VARIANT_HEADER_LEN, VARIANT_MAGIC,
};
use crate::io::ReadLeExt;
use crate::variant::CompiledVariant;

const DIRECTORY_ENTRY_LEN: u64 = 8 + 8 + 4;
const HEADER_LEN: u64 = 4 + 8 + 4;

#[derive(Debug, Clone, Copy)]
struct DirectoryEntry {
    offset: u64,
    compressed_len: u64,
    shader_count: u32,
}

struct ActiveChunk {
    chunk_key: u64,
    data: Vec<u8>,
    /// Variant key -> record offset within `data`.
    index: HashMap<u64, usize>,
}

struct ReaderState {
    file: File,
    active: Option<ActiveChunk>,
    cache: HashMap<u64, Arc<CompiledVariant>>,
}

/// Random-access reader over a compiled shader group container.
pub struct ShaderGroupReader {
    index_mask: u64,
    payload_base: u64,
    directory: HashMap<u64, DirectoryEntry>,
    codec: Box<dyn Codec>,
    state: Mutex<ReaderState>,
}

impl std::fmt::Debug for ShaderGroupReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderGroupReader").finish_non_exhaustive()
    }
}

impl ShaderGroupReader {
    /// Opens a container compressed with the production codec.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_codec(path, Box::new(Lz4Codec))
    }

    /// Opens a container, decompressing chunks with `codec`.
    pub fn from_file_with_codec(path: impl AsRef<Path>, codec: Box<dyn Codec>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        if &reader.read_magic()? != CONTAINER_MAGIC {
            return Err(ContainerError::Corrupt("bad container magic"));
        }
        let index_mask = reader.read_u64_le()?;
        let chunk_count = reader.read_u32_le()?;
        if chunk_count == 0 {
            return Err(ContainerError::Corrupt("container has no chunks"));
        }
        if chunk_count > MAX_CHUNK_COUNT {
            return Err(ContainerError::TooLarge("chunk count exceeds decode limit"));
        }

        let payload_base = HEADER_LEN + DIRECTORY_ENTRY_LEN * u64::from(chunk_count);
        if payload_base > file_len {
            return Err(ContainerError::Corrupt("directory extends past end of file"));
        }
        let payload_len = file_len - payload_base;

        let mut raw_entries = Vec::with_capacity(chunk_count as usize);
        for _ in 0..chunk_count {
            let chunk_key = reader.read_u64_le()?;
            let offset = reader.read_u64_le()?;
            let shader_count = reader.read_u32_le()?;
            raw_entries.push((chunk_key, offset, shader_count));
        }

        let mut directory = HashMap::with_capacity(chunk_count as usize);
        for (i, &(chunk_key, offset, shader_count)) in raw_entries.iter().enumerate() {
            if chunk_key & !index_mask != 0 {
                return Err(ContainerError::Corrupt("chunk key outside the index mask"));
            }
            // Compressed lengths are inferred from neighbouring offsets, so
            // the directory must be in payload order.
            let end = match raw_entries.get(i + 1) {
                Some(&(_, next_offset, _)) => next_offset,
                None => payload_len,
            };
            if offset > end || end > payload_len {
                return Err(ContainerError::Corrupt("directory offsets are inconsistent"));
            }
            let compressed_len = end - offset;
            if compressed_len > MAX_COMPRESSED_CHUNK_LEN {
                return Err(ContainerError::TooLarge(
                    "compressed chunk exceeds decode limit",
                ));
            }
            let entry = DirectoryEntry {
                offset,
                compressed_len,
                shader_count,
            };
            if directory.insert(chunk_key, entry).is_some() {
                return Err(ContainerError::Corrupt("duplicate chunk key in directory"));
            }
        }

        Ok(Self {
            index_mask,
            payload_base,
            directory,
            codec,
            state: Mutex::new(ReaderState {
                file: reader.into_inner(),
                active: None,
                cache: HashMap::new(),
            }),
        })
    }

    /// Looks up a variant by its permutation key.
    ///
    /// Unknown keys return `None`. Runtime failures during chunk activation
    /// (truncated payload, codec error) are downgraded to `None` as well;
    /// the cache stays consistent and later lookups retry.
    pub fn get(&self, key: u64) -> Option<Arc<CompiledVariant>> {
        let mut state = self.lock_state();
        if let Some(variant) = state.cache.get(&key) {
            return Some(Arc::clone(variant));
        }

        let chunk_key = key & self.index_mask;
        let entry = *self.directory.get(&chunk_key)?;

        if state.active.as_ref().map(|a| a.chunk_key) != Some(chunk_key) {
            match self.activate(&mut state.file, chunk_key, entry) {
                Ok(chunk) => state.active = Some(chunk),
                Err(err) => {
                    warn!(key, chunk_key, error = %err, "chunk activation failed");
                    return None;
                }
            }
        }
        let variant = {
            let active = state.active.as_ref()?;
            let record_offset = *active.index.get(&key)?;
            match decode_record(&active.data, record_offset, key) {
                Ok(variant) => Arc::new(variant),
                Err(err) => {
                    warn!(key, chunk_key, error = %err, "variant record decode failed");
                    return None;
                }
            }
        };
        if let Entry::Vacant(slot) = state.cache.entry(key) {
            slot.insert(Arc::clone(&variant));
        }
        Some(variant)
    }

    /// Drops all decoded variants. Subsequent lookups re-decode; correctness
    /// is unaffected.
    pub fn clear_cache(&self) {
        let mut state = self.lock_state();
        state.cache.clear();
        state.active = None;
    }

    /// The chunk key currently held decompressed, if any.
    pub fn active_chunk_key(&self) -> Option<u64> {
        self.lock_state().active.as_ref().map(|a| a.chunk_key)
    }

    /// Number of chunks in the container directory.
    pub fn chunk_count(&self) -> usize {
        self.directory.len()
    }

    /// Total number of variants across all chunks, per the directory.
    pub fn variant_count(&self) -> u64 {
        self.directory
            .values()
            .map(|e| u64::from(e.shader_count))
            .sum()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ReaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn activate(
        &self,
        file: &mut File,
        chunk_key: u64,
        entry: DirectoryEntry,
    ) -> Result<ActiveChunk> {
        file.seek(SeekFrom::Start(self.payload_base + entry.offset))?;
        let compressed = file.read_exact_vec(entry.compressed_len as usize)?;
        let data = self.codec.decompress(&compressed)?;

        let mut index = HashMap::with_capacity(entry.shader_count as usize);
        let mut pos = 0usize;
        for _ in 0..entry.shader_count {
            let (key, size) = decode_record_header(&data, pos)?;
            if index.insert(key, pos).is_some() {
                return Err(ContainerError::Corrupt("duplicate variant key in chunk"));
            }
            pos += VARIANT_HEADER_LEN + size;
        }
        Ok(ActiveChunk {
            chunk_key,
            data,
            index,
        })
    }
}

/// Validates the record frame at `pos` and returns its key and bytecode
/// size. The bytecode itself is skipped, not copied.
fn decode_record_header(data: &[u8], pos: usize) -> Result<(u64, usize)> {
    let header = data
        .get(pos..pos + VARIANT_HEADER_LEN)
        .ok_or(ContainerError::Corrupt("truncated variant record header"))?;
    if &header[..4] != VARIANT_MAGIC {
        return Err(ContainerError::Corrupt("bad variant record magic"));
    }
    let key = u64::from_le_bytes(header[4..12].try_into().expect("fixed-width slice"));
    let size = u32::from_le_bytes(header[12..16].try_into().expect("fixed-width slice")) as usize;
    if data.len() - pos - VARIANT_HEADER_LEN < size {
        return Err(ContainerError::Corrupt("variant bytecode exceeds chunk"));
    }
    Ok((key, size))
}

fn decode_record(data: &[u8], pos: usize, expected_key: u64) -> Result<CompiledVariant> {
    let (key, size) = decode_record_header(data, pos)?;
    if key != expected_key {
        return Err(ContainerError::Corrupt("variant record key mismatch"));
    }
    let start = pos + VARIANT_HEADER_LEN;
    Ok(CompiledVariant::new(key, data[start..start + size].to_vec()))
}
