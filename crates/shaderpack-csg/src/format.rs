//! CSG3 format constants and limits shared by the writer and the reader.
//!
//! The limits are enforced when decoding potentially-corrupt containers to
//! keep memory usage bounded; the writer enforces the same limits so the
//! tool never produces a container it cannot read back.

/// Container file magic.
pub const CONTAINER_MAGIC: &[u8; 4] = b"CSG3";

/// Per-variant record magic inside a decompressed chunk.
pub const VARIANT_MAGIC: &[u8; 4] = b"SH01";

/// Target number of variants per chunk. Groups at or below this size are
/// stored as a single chunk.
pub const MAX_CHUNK_VARIANTS: u64 = 64;

/// Fixed per-variant record overhead: magic + key + size.
pub const VARIANT_HEADER_LEN: usize = 4 + 8 + 4;

/// Maximum number of directory entries accepted at read time.
pub const MAX_CHUNK_COUNT: u32 = 1 << 20;

/// Maximum compressed size of a single chunk.
pub const MAX_COMPRESSED_CHUNK_LEN: u64 = 256 * 1024 * 1024;

/// Maximum decompressed size of a single chunk.
pub const MAX_DECOMPRESSED_CHUNK_LEN: usize = 256 * 1024 * 1024;

/// Directory name of the debug-symbol sidecar, created next to the
/// container.
pub const DEBUG_SIDECAR_DIR: &str = "ShaderPdb";
