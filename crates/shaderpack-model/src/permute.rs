//! Permutation enumeration over an ordered option list.
//!
//! Enumeration is a mixed-radix counter with the LAST option varying
//! fastest. Each option packs its local index into its own key bit-field,
//! first option at the least significant bits; the field offsets are the
//! cumulative widths of the preceding options. Runs of consecutive
//! permutations therefore share their low key bits, which is the property
//! the container's chunk layout is built on.

use crate::option::ShaderOption;

/// One point in the Cartesian product of option values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    /// Bit-packed option indices; unique within the permutation set.
    pub key: u64,
    /// Preprocessor macros for this selection, in option declaration order.
    pub defines: Vec<(String, String)>,
}

/// Bit offsets of each option's key field: cumulative sums of the
/// preceding widths.
pub fn key_offsets(options: &[ShaderOption]) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(options.len());
    let mut offset = 0u32;
    for option in options {
        offsets.push(offset);
        offset += option.key_length();
    }
    offsets
}

/// Enumerates the full Cartesian product of `options` in deterministic
/// order. An empty option list yields exactly one permutation with key 0
/// and no defines.
pub fn permutate(options: &[ShaderOption]) -> Vec<Permutation> {
    let offsets = key_offsets(options);
    let radices: Vec<u64> = options.iter().map(ShaderOption::value_count).collect();

    let total = radices.iter().product::<u64>() as usize;
    let mut results = Vec::with_capacity(total);
    let mut indices = vec![0u64; options.len()];

    loop {
        let mut key = 0u64;
        let mut defines = Vec::new();
        for (i, option) in options.iter().enumerate() {
            option.append_defines(indices[i], &mut defines);
            key |= indices[i] << offsets[i];
        }
        results.push(Permutation { key, defines });

        // Increment from the last position, carrying leftwards.
        let mut position = options.len();
        loop {
            if position == 0 {
                return results;
            }
            position -= 1;
            indices[position] += 1;
            if indices[position] < radices[position] {
                break;
            }
            indices[position] = 0;
        }
    }
}
