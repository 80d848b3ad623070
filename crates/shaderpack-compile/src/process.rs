//! Production compiler backend: spawns an `fxc`/`dxc`-style executable.
//!
//! The compiler writes its object blob to a scratch file which is read back
//! after the process exits; stdout and stderr become the diagnostics text.
//! Launch failures are reported through diagnostics rather than panicking,
//! so one missing tool degrades into ordinary per-permutation failures.

use std::path::PathBuf;
use std::process::Command;

use crate::backend::{CompileJob, CompilerOutput, ShaderBackend};

/// Environment variable naming the compiler executable, overriding the
/// default of `dxc` on PATH.
pub const COMPILER_ENV: &str = "SHADERPACK_DXC";

#[derive(Debug, Clone)]
pub struct DxcBackend {
    executable: PathBuf,
}

impl DxcBackend {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Uses `$SHADERPACK_DXC` when set, `dxc` from PATH otherwise.
    pub fn from_env() -> Self {
        let executable = std::env::var_os(COMPILER_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("dxc"));
        Self::new(executable)
    }

    pub fn executable(&self) -> &std::path::Path {
        &self.executable
    }
}

impl ShaderBackend for DxcBackend {
    fn compile(&self, job: &CompileJob<'_>) -> CompilerOutput {
        let scratch = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(err) => {
                return CompilerOutput {
                    bytecode: None,
                    diagnostics: format!("failed to create compiler scratch directory: {err}"),
                }
            }
        };
        let object_path = scratch.path().join("shader.bin");

        let mut command = Command::new(&self.executable);
        command
            .arg("-T")
            .arg(job.target)
            .arg("-E")
            .arg(job.entry)
            .arg(job.flags.optimization.flag());
        if job.flags.debug {
            command.arg("-Zi").arg("-Qembed_debug");
        }
        for (name, value) in job.defines {
            command.arg("-D").arg(format!("{name}={value}"));
        }
        command.arg("-Fo").arg(&object_path).arg(job.source);

        let output = match command.output() {
            Ok(output) => output,
            Err(err) => {
                return CompilerOutput {
                    bytecode: None,
                    diagnostics: format!(
                        "failed to launch shader compiler `{}`: {err}",
                        self.executable.display()
                    ),
                }
            }
        };

        let mut diagnostics = String::new();
        diagnostics.push_str(&String::from_utf8_lossy(&output.stdout));
        if !diagnostics.is_empty() && !output.stderr.is_empty() {
            diagnostics.push('\n');
        }
        diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));

        let bytecode = if output.status.success() {
            match std::fs::read(&object_path) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    diagnostics.push_str(&format!(
                        "\ncompiler reported success but produced no object file: {err}"
                    ));
                    None
                }
            }
        } else {
            None
        };

        CompilerOutput {
            bytecode,
            diagnostics,
        }
    }
}
