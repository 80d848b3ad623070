//! Chunk layout selection.
//!
//! Permutations are enumerated with the last option varying fastest, so a
//! run of consecutive variants holds the leading options constant — and the
//! leading options live in the low bits of the key. Walking the option list
//! in declaration order until the per-chunk variant count drops to the
//! target therefore yields a mask whose covered low bits identify a chunk,
//! and every key resolves to exactly one chunk at read time with a single
//! AND.

use shaderpack_model::ShaderOption;

use crate::format::MAX_CHUNK_VARIANTS;

/// How a group's variants are partitioned into compression chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub chunk_count: u64,
    /// Variants per chunk (the final chunk may be shorter).
    pub chunk_size: u64,
    /// Mask of the key bits that identify a chunk: `key & index_mask`
    /// equals the chunk key.
    pub index_mask: u64,
}

impl ChunkLayout {
    /// Plans the layout for `variant_count` variants of a group declaring
    /// `options`.
    pub fn plan(options: &[ShaderOption], variant_count: u64) -> Self {
        if variant_count <= MAX_CHUNK_VARIANTS {
            return Self {
                chunk_count: 1,
                chunk_size: variant_count,
                index_mask: 0,
            };
        }

        let mut accumulator = 1u64;
        let mut offset = 0u32;
        for option in options {
            accumulator *= option.value_count();
            offset += option.key_length();
            if variant_count / accumulator <= MAX_CHUNK_VARIANTS {
                break;
            }
        }

        Self {
            chunk_count: accumulator,
            chunk_size: variant_count / accumulator,
            index_mask: mask_for_bits(offset),
        }
    }

    /// The chunk key a variant key belongs to.
    pub fn chunk_key(&self, key: u64) -> u64 {
        key & self.index_mask
    }
}

fn mask_for_bits(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boolean(name: &str) -> ShaderOption {
        ShaderOption::Boolean {
            name: name.to_string(),
        }
    }

    fn enumeration(name: &str, count: usize) -> ShaderOption {
        ShaderOption::Enumeration {
            name: name.to_string(),
            values: (0..count).map(|i| format!("v{i}")).collect(),
        }
    }

    #[test]
    fn empty_group_fits_one_chunk_with_zero_mask() {
        let layout = ChunkLayout::plan(&[], 1);
        assert_eq!(
            layout,
            ChunkLayout {
                chunk_count: 1,
                chunk_size: 1,
                index_mask: 0,
            }
        );
    }

    #[test]
    fn small_groups_stay_in_a_single_chunk() {
        let options = vec![enumeration("M", 8), boolean("A")];
        let layout = ChunkLayout::plan(&options, 16);
        assert_eq!(layout.chunk_count, 1);
        assert_eq!(layout.chunk_size, 16);
        assert_eq!(layout.index_mask, 0);
    }

    #[test]
    fn first_option_splits_an_oversized_group() {
        // 4 booleans and a 6-value enum: 96 variants. Consuming the first
        // boolean brings 96 / 2 = 48 under the 64-variant target.
        let options = vec![
            boolean("A"),
            boolean("B"),
            boolean("C"),
            boolean("D"),
            enumeration("M", 6),
        ];
        let layout = ChunkLayout::plan(&options, 96);
        assert_eq!(
            layout,
            ChunkLayout {
                chunk_count: 2,
                chunk_size: 48,
                index_mask: 0x1,
            }
        );
    }

    #[test]
    fn walk_continues_until_chunks_are_small_enough() {
        // 2 booleans and a 33-value enum: 132 variants. One boolean leaves
        // 66 per chunk, still too big; two leave 33.
        let options = vec![boolean("A"), boolean("B"), enumeration("M", 33)];
        let layout = ChunkLayout::plan(&options, 132);
        assert_eq!(layout.chunk_count, 4);
        assert_eq!(layout.chunk_size, 33);
        assert_eq!(layout.index_mask, 0x3);
    }

    #[test]
    fn first_option_alone_can_exceed_the_target() {
        let options = vec![enumeration("Huge", 128)];
        let layout = ChunkLayout::plan(&options, 128);
        assert_eq!(layout.chunk_count, 128);
        assert_eq!(layout.chunk_size, 1);
        assert_eq!(layout.index_mask, 0x7F);
    }

    #[test]
    fn chunk_key_isolates_the_low_bits() {
        let layout = ChunkLayout {
            chunk_count: 2,
            chunk_size: 48,
            index_mask: 0x1,
        };
        assert_eq!(layout.chunk_key(0b10110), 0);
        assert_eq!(layout.chunk_key(0b10111), 1);
    }
}
