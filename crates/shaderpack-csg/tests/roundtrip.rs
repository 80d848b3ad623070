//! End-to-end write/read coverage over real files.

use std::path::PathBuf;

use shaderpack_csg::{
    write_container_file, write_debug_sidecar, ChunkLayout, Codec, CompiledVariant, ContainerError,
    Lz4Codec, RawCodec, ShaderGroupReader,
};
use shaderpack_model::{permutate, ShaderOption};

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

/// Deterministic stand-in bytecode, distinct per key.
fn fake_bytecode(key: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    let mut state = key.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
    for _ in 0..8 {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out
}

/// Builds variants for the full permutation set, in enumeration order.
fn build_variants(options: &[ShaderOption]) -> Vec<CompiledVariant> {
    permutate(options)
        .into_iter()
        .map(|p| CompiledVariant::new(p.key, fake_bytecode(p.key)))
        .collect()
}

fn write_group(
    dir: &tempfile::TempDir,
    options: &[ShaderOption],
    variants: &[CompiledVariant],
    codec: &dyn Codec,
) -> PathBuf {
    let path = dir.path().join("group.csg");
    write_container_file(&path, options, variants, codec, 4).expect("write container");
    path
}

#[test]
fn no_option_group_roundtrips_with_a_single_chunk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let variants = build_variants(&[]);
    assert_eq!(variants.len(), 1);
    let path = write_group(&dir, &[], &variants, &RawCodec);

    let reader =
        ShaderGroupReader::from_file_with_codec(&path, Box::new(RawCodec)).expect("open container");
    assert_eq!(reader.chunk_count(), 1);
    assert_eq!(reader.variant_count(), 1);

    let variant = reader.get(0).expect("key 0 present");
    assert_eq!(variant.bytecode, variants[0].bytecode);
    assert!(reader.get(1).is_none());
}

#[test]
fn every_permutation_roundtrips_under_lz4() {
    let options = vec![boolean("A"), enumeration("Mode", 3), boolean("B")];
    let dir = tempfile::tempdir().expect("tempdir");
    let variants = build_variants(&options);
    let path = write_group(&dir, &options, &variants, &Lz4Codec);

    let reader = ShaderGroupReader::from_file(&path).expect("open container");
    for variant in &variants {
        let loaded = reader.get(variant.key).expect("variant present");
        assert_eq!(loaded.key, variant.key);
        assert_eq!(loaded.bytecode, variant.bytecode);
    }
}

#[test]
fn chunked_group_resolves_keys_across_chunks() {
    // 4 booleans and a 6-value enum: 96 variants in two 48-variant chunks
    // split on the first boolean's bit.
    let options = vec![
        boolean("A"),
        boolean("B"),
        boolean("C"),
        boolean("D"),
        enumeration("M", 6),
    ];
    let variants = build_variants(&options);
    assert_eq!(variants.len(), 96);

    let layout = ChunkLayout::plan(&options, variants.len() as u64);
    assert_eq!(layout.chunk_count, 2);
    assert_eq!(layout.index_mask, 0x1);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_group(&dir, &options, &variants, &Lz4Codec);
    let reader = ShaderGroupReader::from_file(&path).expect("open container");
    assert_eq!(reader.chunk_count(), 2);
    assert_eq!(reader.variant_count(), 96);

    // Directory coherence: every key maps to exactly one chunk.
    for variant in &variants {
        let loaded = reader.get(variant.key).expect("variant present");
        assert_eq!(loaded.bytecode, variant.bytecode);
    }
}

#[test]
fn activating_a_second_chunk_evicts_the_first() {
    let options = vec![
        boolean("A"),
        boolean("B"),
        boolean("C"),
        boolean("D"),
        enumeration("M", 6),
    ];
    let variants = build_variants(&options);
    let even_key = variants.iter().map(|v| v.key).find(|k| k & 1 == 0).unwrap();
    let odd_key = variants.iter().map(|v| v.key).find(|k| k & 1 == 1).unwrap();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_group(&dir, &options, &variants, &Lz4Codec);
    let reader = ShaderGroupReader::from_file(&path).expect("open container");
    assert_eq!(reader.active_chunk_key(), None);

    let first = reader.get(even_key).expect("chunk 0 variant");
    assert_eq!(reader.active_chunk_key(), Some(0));

    let second = reader.get(odd_key).expect("chunk 1 variant");
    assert_eq!(reader.active_chunk_key(), Some(1));

    // Re-activating chunk 0 still returns the original bytes.
    let first_again = reader.get(even_key).expect("chunk 0 variant again");
    assert_eq!(first.bytecode, fake_bytecode(even_key));
    assert_eq!(second.bytecode, fake_bytecode(odd_key));
    assert_eq!(first_again.bytecode, first.bytecode);
}

#[test]
fn cache_survives_eviction_and_clearing_forces_redecode() {
    let options = vec![
        boolean("A"),
        boolean("B"),
        boolean("C"),
        boolean("D"),
        enumeration("M", 6),
    ];
    let variants = build_variants(&options);
    let even_key = variants.iter().map(|v| v.key).find(|k| k & 1 == 0).unwrap();
    let odd_key = variants.iter().map(|v| v.key).find(|k| k & 1 == 1).unwrap();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_group(&dir, &options, &variants, &Lz4Codec);
    let reader = ShaderGroupReader::from_file(&path).expect("open container");

    let first = reader.get(even_key).expect("variant");
    reader.get(odd_key).expect("variant from the other chunk");
    // The decoded cache answers for the evicted chunk without re-activating.
    let cached = reader.get(even_key).expect("cached variant");
    assert_eq!(reader.active_chunk_key(), Some(1));
    assert_eq!(cached.bytecode, first.bytecode);

    reader.clear_cache();
    assert_eq!(reader.active_chunk_key(), None);
    let redecoded = reader.get(even_key).expect("re-decoded variant");
    assert_eq!(redecoded.bytecode, first.bytecode);
}

#[test]
fn corrupt_magic_fails_at_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let variants = build_variants(&[]);
    let path = write_group(&dir, &[], &variants, &RawCodec);

    let mut bytes = std::fs::read(&path).expect("read container");
    bytes[0] ^= 0xFF;
    std::fs::write(&path, bytes).expect("rewrite container");

    let err = ShaderGroupReader::from_file_with_codec(&path, Box::new(RawCodec))
        .expect_err("expected corrupt magic");
    assert!(matches!(err, ContainerError::Corrupt(_)));
}

#[test]
fn truncated_payload_downgrades_lookups_to_none() {
    let options = vec![enumeration("Mode", 4)];
    let variants = build_variants(&options);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_group(&dir, &options, &variants, &RawCodec);

    let bytes = std::fs::read(&path).expect("read container");
    std::fs::write(&path, &bytes[..bytes.len() - 8]).expect("truncate container");

    // The directory itself is intact but the (single-chunk) payload is now
    // short: lengths inferred from the file size no longer cover the chunk.
    let reader =
        ShaderGroupReader::from_file_with_codec(&path, Box::new(RawCodec)).expect("open container");
    assert!(reader.get(0).is_none());
}

#[test]
fn debug_sidecar_holds_one_file_per_symbol_carrier() {
    let dir = tempfile::tempdir().expect("tempdir");
    let container = dir.path().join("out/group.csg");

    let mut with_symbols = CompiledVariant::new(0, fake_bytecode(0));
    with_symbols.pdb_name = Some("group_0.pdb".to_string());
    with_symbols.pdb_bytes = Some(b"pdb-bytes".to_vec());
    let without_symbols = CompiledVariant::new(1, fake_bytecode(1));
    let variants = vec![with_symbols, without_symbols];

    write_container_file(&container, &[boolean("A")], &variants, &RawCodec, 1)
        .expect("write container");
    let written = write_debug_sidecar(&container, &variants).expect("write sidecar");
    assert_eq!(written, 1);

    let sidecar = dir.path().join("out/ShaderPdb/group_0.pdb");
    assert_eq!(std::fs::read(sidecar).expect("read pdb"), b"pdb-bytes");
}

#[test]
fn sidecar_is_skipped_when_nothing_carries_symbols() {
    let dir = tempfile::tempdir().expect("tempdir");
    let container = dir.path().join("group.csg");
    let variants = build_variants(&[boolean("A")]);
    write_container_file(&container, &[boolean("A")], &variants, &RawCodec, 1)
        .expect("write container");

    let written = write_debug_sidecar(&container, &variants).expect("write sidecar");
    assert_eq!(written, 0);
    assert!(!dir.path().join("ShaderPdb").exists());
}
