#![forbid(unsafe_code)]

//! `shaderpack`: compile an annotated HLSL-style source into a compressed,
//! random-access container of shader permutations, plus a C++ header
//! enumerating the permutation key bits.
//!
//! The argument surface is the legacy single-dash form (`-i=<path>`), which
//! is why clap's automatic `-h` help flag is disabled: `-h` names the
//! header output directory. Running with no arguments prints usage and
//! exits successfully.

use clap::{ArgAction, CommandFactory, Parser};
use shaderpack_cli::{run_build, BuildRequest};
use shaderpack_compile::{CompileOptions, DxcBackend};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "shaderpack",
    about = "Offline shader permutation compiler and container builder",
    disable_help_flag = true
)]
struct Args {
    /// Annotated shader source to build.
    #[arg(short = 'i', value_name = "path")]
    input: Option<PathBuf>,

    /// Directory receiving the compiled container (<input stem>.csg).
    /// Without it, only the header is emitted.
    #[arg(short = 'o', value_name = "dir")]
    output: Option<PathBuf>,

    /// Directory receiving the generated header (<input stem>.h).
    #[arg(short = 'h', value_name = "dir")]
    header: Option<PathBuf>,

    /// Namespace for the generated header when the source declares none.
    #[arg(short = 'n', value_name = "namespace")]
    namespace: Option<String>,

    /// Optimization level: -1 disables optimization, 0..=3 select a level.
    #[arg(
        short = 'p',
        value_name = "level",
        default_value_t = 2,
        allow_hyphen_values = true
    )]
    optimization: i8,

    /// Emit debug information into the compiled shaders.
    #[arg(short = 'd', action = ArgAction::SetTrue)]
    debug: bool,

    /// Strip debug symbols into a ShaderPdb sidecar next to the container.
    #[arg(short = 'x', action = ArgAction::SetTrue)]
    strip_debug_symbols: bool,

    /// Pause at startup so a debugger can attach.
    #[arg(short = 't', action = ArgAction::SetTrue)]
    wait_for_debugger: bool,
}

fn main() {
    if std::env::args().len() <= 1 {
        let mut command = Args::command();
        // Ignoring a broken pipe here mirrors what clap's own help path
        // does.
        let _ = command.print_help();
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.wait_for_debugger {
        wait_for_debugger();
    }

    if let Err(err) = run(args) {
        eprintln!("Shader group compilation failed: {err:#}");
        std::process::exit(-1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let input = args
        .input
        .ok_or_else(|| anyhow::anyhow!("please specify an input file using -i=<file>"))?;

    let request = BuildRequest {
        input,
        output_dir: args.output,
        header_dir: args.header,
        namespace: args.namespace,
        compile: CompileOptions {
            debug: args.debug,
            external_debug_symbols: args.strip_debug_symbols,
            optimization_level: args.optimization,
        },
    };

    run_build(&request, DxcBackend::from_env())?;
    println!("Shader group compilation succeeded.");
    Ok(())
}

fn wait_for_debugger() {
    eprintln!(
        "Waiting for debugger: attach to pid {} and press Enter to continue.",
        std::process::id()
    );
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
}
