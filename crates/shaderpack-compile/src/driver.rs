//! The parallel group compilation driver.
//!
//! One task per permutation, mapped over a fixed worker pool. Results land
//! in enumeration order, which is the order the container writer's chunk
//! partitioning depends on. A failed permutation never aborts its siblings:
//! everything runs to completion so the user sees the full diagnostic
//! picture, and the group then fails as a whole.

use thiserror::Error;
use tracing::info;

use shaderpack_csg::CompiledVariant;
use shaderpack_model::{permutate, ShaderSource};

use crate::backend::{CompileFlags, CompileJob, OptLevel, ShaderBackend};
use crate::diagnostics::DiagnosticSink;

/// Group-level compile settings, mirroring the CLI surface.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub debug: bool,
    /// Strip debug symbols out of the bytecode and carry them on the
    /// variant for the sidecar. Implies debug-information emission.
    pub external_debug_symbols: bool,
    /// −1 disables optimization; 0..=3 select a compiler level.
    pub optimization_level: i8,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            debug: false,
            external_debug_symbols: false,
            optimization_level: 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid optimization level {0}, expected -1..=3")]
    InvalidOptimizationLevel(i8),

    /// One or more permutations failed; diagnostics were already printed.
    #[error("shader group compilation failed: {failed} of {total} variants did not compile")]
    GroupFailed { failed: usize, total: usize },
}

/// Compiles every permutation of a shader group through an injected
/// backend.
pub struct GroupCompiler<B: ShaderBackend> {
    backend: B,
    workers: usize,
}

impl<B: ShaderBackend> GroupCompiler<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            workers: shaderpack_pool::default_parallelism(),
        }
    }

    pub fn with_workers(backend: B, workers: usize) -> Self {
        Self { backend, workers }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compiles the full permutation set of `source`.
    ///
    /// On success the variants come back in enumeration order, one per
    /// permutation. On failure the variant list is withheld entirely; new
    /// diagnostic lines were printed to stderr as they were discovered.
    pub fn compile_group(
        &self,
        source: &ShaderSource,
        options: &CompileOptions,
    ) -> Result<Vec<CompiledVariant>, CompileError> {
        let optimization = OptLevel::from_cli_level(options.optimization_level)
            .ok_or(CompileError::InvalidOptimizationLevel(options.optimization_level))?;
        let flags = CompileFlags {
            // Sidecar extraction needs the compiler to emit debug
            // information even when plain debug builds were not requested.
            debug: options.debug || options.external_debug_symbols,
            optimization,
        };

        let permutations = permutate(&source.options);
        info!(
            source = %source.path.display(),
            variants = permutations.len(),
            workers = self.workers,
            "compiling shader group"
        );

        let sink = DiagnosticSink::new();
        let results: Vec<Option<CompiledVariant>> =
            shaderpack_pool::map_indexed(&permutations, self.workers, |permutation| {
                let job = CompileJob {
                    source: &source.path,
                    entry: &source.entry,
                    target: &source.target,
                    defines: &permutation.defines,
                    flags,
                };
                let output = self.backend.compile(&job);
                for line in sink.filter_new_lines(&output.diagnostics) {
                    eprintln!("{line}");
                }

                let bytecode = output.bytecode?;
                let mut variant = CompiledVariant::new(permutation.key, bytecode);
                if options.external_debug_symbols {
                    if let Some(symbols) = self.backend.extract_debug_symbols(&variant.bytecode) {
                        variant.bytecode = self.backend.strip_debug_symbols(&variant.bytecode);
                        variant.pdb_name = Some(symbols.name);
                        variant.pdb_bytes = Some(symbols.bytes);
                    }
                }
                Some(variant)
            });

        let total = results.len();
        let failed = results.iter().filter(|slot| slot.is_none()).count();
        if failed > 0 {
            return Err(CompileError::GroupFailed { failed, total });
        }
        Ok(results.into_iter().flatten().collect())
    }
}
