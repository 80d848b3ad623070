//! The external-compiler interface consumed by the group driver.
//!
//! The compiler itself is a collaborator, not part of this tool: a pure
//! function from (source, entry, target, macros, flags) to bytecode plus
//! diagnostics text, and two blob operations for debug-symbol handling.
//! Production binds to an `fxc`/`dxc`-style executable; tests inject
//! deterministic fakes.

use std::path::Path;

/// Optimization request passed to the external compiler. `Skip` disables
/// optimization outright (the CLI's level −1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptLevel {
    Skip,
    O0,
    O1,
    O2,
    O3,
}

impl OptLevel {
    /// Maps the CLI's numeric level (−1..=3) onto an [`OptLevel`].
    pub fn from_cli_level(level: i8) -> Option<Self> {
        match level {
            -1 => Some(Self::Skip),
            0 => Some(Self::O0),
            1 => Some(Self::O1),
            2 => Some(Self::O2),
            3 => Some(Self::O3),
            _ => None,
        }
    }

    /// The compiler command-line flag for this level.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Skip => "-Od",
            Self::O0 => "-O0",
            Self::O1 => "-O1",
            Self::O2 => "-O2",
            Self::O3 => "-O3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileFlags {
    pub debug: bool,
    pub optimization: OptLevel,
}

/// One permutation's compilation request.
#[derive(Debug, Clone, Copy)]
pub struct CompileJob<'a> {
    pub source: &'a Path,
    pub entry: &'a str,
    pub target: &'a str,
    /// Preprocessor macros for this permutation. Backends append whatever
    /// terminator their ABI requires.
    pub defines: &'a [(String, String)],
    pub flags: CompileFlags,
}

/// What came back from the compiler: bytecode on success, and diagnostics
/// text either way.
#[derive(Debug, Clone, Default)]
pub struct CompilerOutput {
    pub bytecode: Option<Vec<u8>>,
    pub diagnostics: String,
}

/// Debug-symbol material pulled out of a compiled blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSymbols {
    /// File name for the sidecar, as the compiler reports it.
    pub name: String,
    pub bytes: Vec<u8>,
}

pub trait ShaderBackend: Send + Sync {
    fn compile(&self, job: &CompileJob<'_>) -> CompilerOutput;

    /// Pulls the debug-symbol blob (and its compiler-assigned name) out of
    /// `bytecode`, or `None` when it carries no symbols.
    fn extract_debug_symbols(&self, bytecode: &[u8]) -> Option<DebugSymbols> {
        crate::dxbc::extract_debug_symbols(bytecode)
    }

    /// Returns `bytecode` with embedded debug information removed. Blobs
    /// without symbols (or in an unrecognised format) pass through
    /// unchanged.
    fn strip_debug_symbols(&self, bytecode: &[u8]) -> Vec<u8> {
        crate::dxbc::strip_debug_symbols(bytecode).unwrap_or_else(|| bytecode.to_vec())
    }
}

impl<T: ShaderBackend + ?Sized> ShaderBackend for &T {
    fn compile(&self, job: &CompileJob<'_>) -> CompilerOutput {
        (**self).compile(job)
    }

    fn extract_debug_symbols(&self, bytecode: &[u8]) -> Option<DebugSymbols> {
        (**self).extract_debug_symbols(bytecode)
    }

    fn strip_debug_symbols(&self, bytecode: &[u8]) -> Vec<u8> {
        (**self).strip_debug_symbols(bytecode)
    }
}
