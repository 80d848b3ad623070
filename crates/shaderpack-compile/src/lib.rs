#![forbid(unsafe_code)]

//! Parallel shader-group compilation: the external-compiler interface, a
//! process-spawning production backend, debug-blob operations over `DXBC`
//! containers, and the driver that maps the permutation set onto a worker
//! pool with de-duplicated diagnostics.

mod backend;
mod diagnostics;
mod driver;
mod dxbc;
mod process;
pub mod testing;

pub use crate::backend::{
    CompileFlags, CompileJob, CompilerOutput, DebugSymbols, OptLevel, ShaderBackend,
};
pub use crate::diagnostics::DiagnosticSink;
pub use crate::driver::{CompileError, CompileOptions, GroupCompiler};
pub use crate::process::{DxcBackend, COMPILER_ENV};
