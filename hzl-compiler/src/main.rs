//! hzlc - HZL partial state compiler
//!
//! Compiles harmonic series, scale, and virtual partial state set documents
//! into partial state sets. Virtual set references are resolved against the
//! definition root; results are written under the output root using the same
//! `<namespace>/<name>.yaml` layout, or printed with `--stdout`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hzl_common::config::CompilerConfig;
use hzl_compiler::loader::{read_document, to_yaml_string, write_partial_state_set};
use hzl_compiler::{compile, logging, FileLoader};
use tracing::info;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " [",
    env!("GIT_HASH"),
    "] built ",
    env!("BUILD_TIMESTAMP"),
    " (",
    env!("BUILD_PROFILE"),
    ")"
);

/// Command-line arguments for hzlc
#[derive(Parser, Debug)]
#[command(name = "hzlc")]
#[command(about = "Compile HZL definitions into partial state sets")]
#[command(version = VERSION)]
struct Args {
    /// Config file (default: <config dir>/hzl/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root of <namespace>/<name>.yaml definitions
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// Root that compiled sets are written under
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print compiled YAML instead of writing files
    #[arg(long)]
    stdout: bool,

    /// Definition documents to compile
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Subscriber first so configuration warnings are visible
    let log_level = logging::init();

    let config = CompilerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    log_level
        .apply_configured(&config.logging.level)
        .context("Failed to apply logging level")?;

    info!("Starting hzlc v{}", VERSION);

    let base_dir = config.resolve_base_dir(args.base_dir.as_deref());
    let output_dir = config.resolve_output_dir(args.output_dir.as_deref());
    info!("Definition root: {}", base_dir.display());
    let loader = FileLoader::new(base_dir);

    for input in &args.inputs {
        let document = read_document(input).with_context(|| format!("Failed to read {}", input.display()))?;
        let compiled = compile(&document, &loader).with_context(|| format!("Failed to compile {}", input.display()))?;

        if args.stdout {
            print!("{}", to_yaml_string(&compiled)?);
        } else {
            write_partial_state_set(&compiled, &output_dir)
                .with_context(|| format!("Failed to write {}", compiled.id()))?;
        }
    }

    info!("Compiled {} document(s)", args.inputs.len());
    Ok(())
}
