//! CSG3 container writer.
//!
//! Variants must arrive in permutation-enumeration order: that order is
//! what makes every `chunk_size`-long run agree on the low key bits the
//! layout mask covers. The writer validates the property instead of
//! trusting the caller.

use std::io::Write;
use std::path::Path;

use shaderpack_model::ShaderOption;
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::{ContainerError, Result};
use crate::format::{CONTAINER_MAGIC, DEBUG_SIDECAR_DIR, VARIANT_HEADER_LEN, VARIANT_MAGIC};
use crate::io::WriteLeExt;
use crate::layout::ChunkLayout;
use crate::variant::CompiledVariant;

struct CompressedChunk {
    chunk_key: u64,
    shader_count: u32,
    bytes: Vec<u8>,
}

/// Writes a complete container to `w`.
///
/// `options` must be the option list the variants were enumerated from and
/// `variants` must be in enumeration order. Chunks are compressed in
/// parallel on up to `workers` threads.
pub fn write_container<W: Write>(
    w: &mut W,
    options: &[ShaderOption],
    variants: &[CompiledVariant],
    codec: &dyn Codec,
    workers: usize,
) -> Result<()> {
    if variants.is_empty() {
        return Err(ContainerError::InvalidInput(
            "a container must hold at least one variant",
        ));
    }

    let layout = ChunkLayout::plan(options, variants.len() as u64);
    let chunk_size = (layout.chunk_size as usize).max(1);
    let slices: Vec<&[CompiledVariant]> = variants.chunks(chunk_size).collect();
    debug!(
        variants = variants.len(),
        chunks = slices.len(),
        index_mask = layout.index_mask,
        "planned container layout"
    );

    for slice in &slices {
        let chunk_key = layout.chunk_key(slice[0].key);
        if slice.iter().any(|v| layout.chunk_key(v.key) != chunk_key) {
            return Err(ContainerError::InvalidInput(
                "variants are not in enumeration order: a chunk spans multiple chunk keys",
            ));
        }
    }

    let compressed = shaderpack_pool::map_indexed(&slices, workers, |slice| {
        let payload = encode_chunk_payload(slice)?;
        Ok(CompressedChunk {
            chunk_key: layout.chunk_key(slice[0].key),
            shader_count: slice.len() as u32,
            bytes: codec.compress(&payload)?,
        })
    });
    let compressed: Vec<CompressedChunk> = compressed
        .into_iter()
        .collect::<Result<Vec<CompressedChunk>>>()?;

    let chunk_count: u32 = compressed
        .len()
        .try_into()
        .map_err(|_| ContainerError::TooLarge("chunk count does not fit in u32"))?;

    w.write_bytes(CONTAINER_MAGIC)?;
    w.write_u64_le(layout.index_mask)?;
    w.write_u32_le(chunk_count)?;

    let mut offset = 0u64;
    for chunk in &compressed {
        w.write_u64_le(chunk.chunk_key)?;
        w.write_u64_le(offset)?;
        w.write_u32_le(chunk.shader_count)?;
        offset += chunk.bytes.len() as u64;
    }
    for chunk in &compressed {
        w.write_bytes(&chunk.bytes)?;
    }
    Ok(())
}

/// Writes a container to `path` atomically (temp file + rename), creating
/// parent directories as needed.
pub fn write_container_file(
    path: &Path,
    options: &[ShaderOption],
    variants: &[CompiledVariant],
    codec: &dyn Codec,
    workers: usize,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    {
        let file = std::fs::File::create(&tmp)?;
        let mut writer = std::io::BufWriter::new(file);
        write_container(&mut writer, options, variants, codec, workers)?;
        writer.flush()?;
    }
    match std::fs::rename(&tmp, path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
            std::fs::rename(&tmp, path)?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

/// Writes the debug-symbol sidecar next to `container_path`: one file per
/// variant carrying symbol material, named as the compiler reported.
///
/// Returns the number of files written; the sidecar directory is only
/// created when there is something to put in it.
pub fn write_debug_sidecar(container_path: &Path, variants: &[CompiledVariant]) -> Result<usize> {
    let carriers: Vec<&CompiledVariant> = variants
        .iter()
        .filter(|v| v.has_debug_symbols())
        .collect();
    if carriers.is_empty() {
        return Ok(0);
    }

    let root = container_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEBUG_SIDECAR_DIR);
    std::fs::create_dir_all(&root)?;

    let mut written = 0usize;
    for variant in carriers {
        let (name, bytes) = match (&variant.pdb_name, &variant.pdb_bytes) {
            (Some(name), Some(bytes)) => (name, bytes),
            _ => continue,
        };
        // Names come from the external compiler; drop any path components.
        let Some(file_name) = Path::new(name).file_name() else {
            warn!(key = variant.key, name, "skipping debug symbols with unusable name");
            continue;
        };
        std::fs::write(root.join(file_name), bytes)?;
        written += 1;
    }
    Ok(written)
}

fn encode_chunk_payload(slice: &[CompiledVariant]) -> Result<Vec<u8>> {
    let total: usize = slice
        .iter()
        .map(|v| VARIANT_HEADER_LEN + v.bytecode.len())
        .sum();
    let mut payload = Vec::with_capacity(total);
    for variant in slice {
        let size: u32 = variant
            .bytecode
            .len()
            .try_into()
            .map_err(|_| ContainerError::TooLarge("variant bytecode does not fit in u32"))?;
        payload.write_bytes(VARIANT_MAGIC)?;
        payload.write_u64_le(variant.key)?;
        payload.write_u32_le(size)?;
        payload.write_bytes(&variant.bytecode)?;
    }
    Ok(payload)
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::path::PathBuf::from(tmp)
}
