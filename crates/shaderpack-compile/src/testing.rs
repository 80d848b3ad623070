//! Deterministic test doubles for the compiler collaborator.
//!
//! `HashBackend` "compiles" by hashing the job, so bytecode is stable
//! across runs and distinct across permutations — enough to verify the
//! driver, the container round-trip, and the CLI pipeline without a real
//! shader compiler installed.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::{CompileJob, CompilerOutput, ShaderBackend};

/// Builds a minimal `DXBC` container from `(fourcc, data)` parts, with a
/// valid offset table and total size. The checksum is left zeroed; nothing
/// in this tool verifies it.
pub fn build_dxbc_container(parts: &[([u8; 4], &[u8])]) -> Vec<u8> {
    let header_len = 32 + parts.len() * 4;
    let total_size = header_len + parts.iter().map(|(_, d)| 8 + d.len()).sum::<usize>();

    let mut out = Vec::with_capacity(total_size);
    out.extend_from_slice(b"DXBC");
    out.extend_from_slice(&[0u8; 16]); // checksum
    out.extend_from_slice(&1u32.to_le_bytes()); // reserved
    out.extend_from_slice(&(total_size as u32).to_le_bytes());
    out.extend_from_slice(&(parts.len() as u32).to_le_bytes());

    let mut offset = header_len;
    for (_, data) in parts {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += 8 + data.len();
    }
    for (fourcc, data) in parts {
        out.extend_from_slice(fourcc);
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

/// Encodes an `ILDN` debug-name part: u16 flags, u16 name length, name
/// bytes, null terminator, padding to 4 bytes.
pub fn build_debug_name_part(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + name.len() + 4);
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

/// A compiler fake whose bytecode is a hash of the job.
#[derive(Debug, Default)]
pub struct HashBackend {
    /// Diagnostics text emitted on every compile (joined with newlines).
    pub diagnostics: Vec<String>,
    /// Fails any permutation whose define list mentions this macro name.
    pub fail_on_define: Option<String>,
    /// Wraps bytecode in a `DXBC` container carrying `SPDB`/`ILDN` parts so
    /// debug-symbol extraction and stripping are exercised.
    pub emit_debug_symbols: bool,
    /// Total number of `compile` calls observed.
    pub calls: AtomicUsize,
}

impl HashBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bytecode `compile` returns for `job` (without debug symbols).
    pub fn bytecode_for(job: &CompileJob<'_>) -> Vec<u8> {
        let mut state = 0xCBF2_9CE4_8422_2325u64;
        let mut feed = |bytes: &[u8]| {
            for &b in bytes {
                state ^= u64::from(b);
                state = state.wrapping_mul(0x0000_0100_0000_01B3);
            }
            state ^= 0xFF;
        };
        feed(job.source.display().to_string().as_bytes());
        feed(job.entry.as_bytes());
        feed(job.target.as_bytes());
        for (name, value) in job.defines {
            feed(name.as_bytes());
            feed(value.as_bytes());
        }

        let mut out = Vec::with_capacity(32);
        for _ in 0..4 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            out.extend_from_slice(&state.to_le_bytes());
        }
        out
    }

    fn debug_name_for(bytecode: &[u8]) -> String {
        let mut hash = 0xCBF2_9CE4_8422_2325u64;
        for &b in bytecode {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
        }
        format!("{hash:016x}.pdb")
    }
}

impl ShaderBackend for HashBackend {
    fn compile(&self, job: &CompileJob<'_>) -> CompilerOutput {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if let Some(fail) = &self.fail_on_define {
            if job.defines.iter().any(|(name, _)| name == fail) {
                return CompilerOutput {
                    bytecode: None,
                    diagnostics: format!(
                        "{}: error X1000: forced failure for define {fail}",
                        job.source.display()
                    ),
                };
            }
        }

        let core = Self::bytecode_for(job);
        let bytecode = if self.emit_debug_symbols {
            let name = Self::debug_name_for(&core);
            build_dxbc_container(&[
                (*b"SHDR", core.as_slice()),
                (*b"SPDB", b"fake pdb payload"),
                (*b"ILDN", build_debug_name_part(&name).as_slice()),
            ])
        } else {
            core
        };

        CompilerOutput {
            bytecode: Some(bytecode),
            diagnostics: self.diagnostics.join("\n"),
        }
    }
}
