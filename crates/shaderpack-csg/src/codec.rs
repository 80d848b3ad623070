//! Chunk compression codecs.
//!
//! Codec output is opaque to the container layout: the directory records
//! only compressed offsets, so any framing a codec needs travels inside its
//! own byte stream. The LZ4 block format is not self-terminating, so
//! [`Lz4Codec`] prepends the decompressed length as a little-endian `u32`.

use crate::error::CodecError;
use crate::format::MAX_DECOMPRESSED_CHUNK_LEN;

/// Pure compress/decompress primitives over whole chunk payloads.
pub trait Codec: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Production codec: length-prefixed LZ4 block compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() > MAX_DECOMPRESSED_CHUNK_LEN {
            return Err(CodecError::TooLarge {
                len: data.len(),
                max: MAX_DECOMPRESSED_CHUNK_LEN,
            });
        }
        let len: u32 = data
            .len()
            .try_into()
            .map_err(|_| CodecError::Compress("chunk length does not fit in u32"))?;

        let mut out = vec![0u8; 4 + lz4_flex::block::get_maximum_output_size(data.len())];
        out[..4].copy_from_slice(&len.to_le_bytes());
        let written = lz4_flex::block::compress_into(data, &mut out[4..])
            .map_err(|_| CodecError::Compress("lz4 compression failed"))?;
        out.truncate(4 + written);
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let Some((prefix, block)) = data.split_at_checked(4) else {
            return Err(CodecError::Decompress("truncated length prefix"));
        };
        let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if len > MAX_DECOMPRESSED_CHUNK_LEN {
            return Err(CodecError::TooLarge {
                len,
                max: MAX_DECOMPRESSED_CHUNK_LEN,
            });
        }

        let mut out = vec![0u8; len];
        let written = lz4_flex::block::decompress_into(block, &mut out)
            .map_err(|_| CodecError::Decompress("lz4 decompression failed"))?;
        if written != len {
            return Err(CodecError::Decompress("lz4 output shorter than declared"));
        }
        Ok(out)
    }
}

/// Byte-for-byte passthrough, for tests and uncompressed containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec for RawCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() > MAX_DECOMPRESSED_CHUNK_LEN {
            return Err(CodecError::TooLarge {
                len: data.len(),
                max: MAX_DECOMPRESSED_CHUNK_LEN,
            });
        }
        Ok(data.to_vec())
    }
}
