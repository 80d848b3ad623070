//! Debug-symbol blob operations over `DXBC` shader containers.
//!
//! Compiled HLSL blobs are `DXBC` containers: a fixed header, a table of
//! absolute part offsets, and fourcc-tagged parts. Debug symbols live in
//! the `SPDB` part (`SDBG` in older compilers) and the sidecar file name in
//! the `ILDN` part. Input is treated as untrusted: every offset and size is
//! validated, and blobs that are not well-formed containers are left alone.

use crate::backend::DebugSymbols;

const DXBC_MAGIC: [u8; 4] = *b"DXBC";
// magic + checksum[16] + reserved + total_size + part_count
const DXBC_HEADER_LEN: usize = 4 + 16 + 4 + 4 + 4;
// Far above anything a real compiler emits, but bounds hostile offset
// tables.
const MAX_PART_COUNT: u32 = 4096;

const PART_SPDB: [u8; 4] = *b"SPDB";
const PART_SDBG: [u8; 4] = *b"SDBG";
const PART_ILDN: [u8; 4] = *b"ILDN";

struct Part<'a> {
    fourcc: [u8; 4],
    data: &'a [u8],
}

/// Walks the container's part table, or `None` when `bytes` is not a
/// well-formed `DXBC` container.
fn parse_parts(bytes: &[u8]) -> Option<Vec<Part<'_>>> {
    if bytes.len() < DXBC_HEADER_LEN || bytes[..4] != DXBC_MAGIC {
        return None;
    }
    let total_size = read_u32(bytes, 24)? as usize;
    if total_size < DXBC_HEADER_LEN || total_size > bytes.len() {
        return None;
    }
    let bytes = &bytes[..total_size];

    let part_count = read_u32(bytes, 28)?;
    if part_count > MAX_PART_COUNT {
        return None;
    }

    let mut parts = Vec::with_capacity(part_count as usize);
    for i in 0..part_count as usize {
        let offset = read_u32(bytes, DXBC_HEADER_LEN + i * 4)? as usize;
        let fourcc: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
        let size = read_u32(bytes, offset + 4)? as usize;
        let data = bytes.get(offset + 8..offset.checked_add(8)?.checked_add(size)?)?;
        parts.push(Part { fourcc, data });
    }
    Some(parts)
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(slice))
}

/// Extracts the `SPDB`/`SDBG` debug blob and its `ILDN` name from a `DXBC`
/// container. Containers without a debug part, and non-`DXBC` blobs, yield
/// `None`. When the name part is missing, a stable hash-derived name is
/// synthesised.
pub fn extract_debug_symbols(bytecode: &[u8]) -> Option<DebugSymbols> {
    let parts = parse_parts(bytecode)?;
    let debug = parts
        .iter()
        .find(|p| p.fourcc == PART_SPDB || p.fourcc == PART_SDBG)?;

    let name = parts
        .iter()
        .find(|p| p.fourcc == PART_ILDN)
        .and_then(|p| parse_debug_name(p.data))
        .unwrap_or_else(|| format!("{:016x}.pdb", fnv1a(bytecode)));

    Some(DebugSymbols {
        name,
        bytes: debug.data.to_vec(),
    })
}

/// Rebuilds the container without its debug parts, rewriting the offset
/// table and total size. Returns `None` when `bytecode` is not a container
/// or carries no debug parts (callers pass the blob through unchanged).
///
/// The header checksum is copied verbatim and therefore stale; consumers of
/// stripped blobs do not verify it.
pub fn strip_debug_symbols(bytecode: &[u8]) -> Option<Vec<u8>> {
    let parts = parse_parts(bytecode)?;
    let is_debug = |fourcc: [u8; 4]| {
        fourcc == PART_SPDB || fourcc == PART_SDBG || fourcc == PART_ILDN
    };
    if !parts.iter().any(|p| is_debug(p.fourcc)) {
        return None;
    }
    let kept: Vec<&Part<'_>> = parts.iter().filter(|p| !is_debug(p.fourcc)).collect();

    let header_len = DXBC_HEADER_LEN + kept.len() * 4;
    let total_size = header_len + kept.iter().map(|p| 8 + p.data.len()).sum::<usize>();

    let mut out = Vec::with_capacity(total_size);
    out.extend_from_slice(&DXBC_MAGIC);
    out.extend_from_slice(&bytecode[4..20]); // checksum, stale by design
    out.extend_from_slice(&bytecode[20..24]); // reserved
    out.extend_from_slice(&(total_size as u32).to_le_bytes());
    out.extend_from_slice(&(kept.len() as u32).to_le_bytes());

    let mut offset = header_len;
    for part in &kept {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += 8 + part.data.len();
    }
    for part in &kept {
        out.extend_from_slice(&part.fourcc);
        out.extend_from_slice(&(part.data.len() as u32).to_le_bytes());
        out.extend_from_slice(part.data);
    }
    Some(out)
}

/// `ILDN` layout: u16 flags, u16 name length, then the name bytes
/// (null-terminated, padded to 4 bytes).
fn parse_debug_name(data: &[u8]) -> Option<String> {
    let header = data.get(..4)?;
    let len = u16::from_le_bytes([header[2], header[3]]) as usize;
    let name = data.get(4..4 + len)?;
    let text = std::str::from_utf8(name).ok()?.trim_end_matches('\0');
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xCBF2_9CE4_8422_2325u64;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}
