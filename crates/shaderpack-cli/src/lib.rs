#![forbid(unsafe_code)]

//! Build pipeline behind the `shaderpack` binary: parse the annotated
//! source, compile the permutation set, write the container and debug
//! sidecar, and emit the client header. Lives in a library so tests can
//! drive it with a fake compiler backend.

mod header;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::debug;

use shaderpack_compile::{CompileOptions, GroupCompiler, ShaderBackend};
use shaderpack_csg::{write_container_file, write_debug_sidecar, Lz4Codec};
use shaderpack_model::ShaderSource;

pub use crate::header::{generate_header, write_if_changed, HeaderStatus};

/// Namespace used when neither the source pragma nor the `-n` argument
/// provides one.
pub const DEFAULT_NAMESPACE: &str = "ShaderPack";

/// One invocation's worth of work, already argument-parsed.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub input: PathBuf,
    /// Directory receiving `<stem>.csg`; without it only the header is
    /// emitted and no compilation runs.
    pub output_dir: Option<PathBuf>,
    /// Directory receiving `<stem>.h`.
    pub header_dir: Option<PathBuf>,
    /// Namespace fallback when the source declares none.
    pub namespace: Option<String>,
    pub compile: CompileOptions,
}

/// What a build actually did, for logging and tests.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub container: Option<PathBuf>,
    pub header: Option<PathBuf>,
    pub header_status: Option<HeaderStatus>,
    pub variants: usize,
    pub sidecar_files: usize,
    /// The container was already newer than every input and was left
    /// untouched.
    pub up_to_date: bool,
}

/// Runs the full pipeline for one shader group.
pub fn run_build<B: ShaderBackend>(request: &BuildRequest, backend: B) -> Result<BuildOutcome> {
    let source = ShaderSource::from_file(&request.input)?;
    let stem = request
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .context("input file name has no usable stem")?;

    let mut outcome = BuildOutcome::default();

    if let Some(output_dir) = &request.output_dir {
        let container_path = output_dir.join(format!("{stem}.csg"));
        if is_up_to_date(&container_path, source.input_timestamp) {
            println!(
                "Shader group {} is up to date.",
                container_path.display()
            );
            outcome.up_to_date = true;
        } else {
            println!("Compiling {}...", source.path.display());
            let compiler = GroupCompiler::new(backend);
            let variants = compiler.compile_group(&source, &request.compile)?;
            println!("Generating {} shader variants.", variants.len());

            write_container_file(
                &container_path,
                &source.options,
                &variants,
                &Lz4Codec,
                shaderpack_pool::default_parallelism(),
            )
            .with_context(|| {
                format!("failed to write container {}", container_path.display())
            })?;
            println!("Output saved to {}.", container_path.display());
            outcome.variants = variants.len();

            if request.compile.external_debug_symbols {
                outcome.sidecar_files = write_debug_sidecar(&container_path, &variants)
                    .context("failed to write debug symbol sidecar")?;
                debug!(files = outcome.sidecar_files, "wrote debug sidecar");
            }
        }
        outcome.container = Some(container_path);
    }

    if let Some(header_dir) = &request.header_dir {
        let header_path = header_dir.join(format!("{stem}.h"));
        let namespace = source
            .namespace
            .clone()
            .or_else(|| request.namespace.clone())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        println!(
            "Generating header for shader group {} at namespace {}...",
            source.path.display(),
            namespace.replace('.', "::")
        );
        let text = generate_header(stem, &namespace, &source.options);
        let status = write_if_changed(&header_path, &text)?;
        match status {
            HeaderStatus::Written => println!("Output saved to {}.", header_path.display()),
            HeaderStatus::Unchanged => {
                println!("Shader header {} is up to date.", header_path.display())
            }
        }
        outcome.header = Some(header_path);
        outcome.header_status = Some(status);
    }

    Ok(outcome)
}

/// Whether `path` exists and is at least as new as `input_timestamp`.
fn is_up_to_date(path: &Path, input_timestamp: SystemTime) -> bool {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified >= input_timestamp,
        Err(_) => false,
    }
}
