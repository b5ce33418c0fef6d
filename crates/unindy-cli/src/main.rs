use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use unindy_archive::{rewrite_archive, ArchiveOptions, Compression, DesugarTransform};
use unindy_config::{init_tracing, load_for_invocation, CompressionSetting};

#[derive(Parser)]
#[command(
    name = "unindy",
    about = "Rewrite invokedynamic call sites in a JAR into calls of static helper methods"
)]
struct Cli {
    /// JAR to rewrite (required; an input file name must be given as the first argument)
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Where to write the rewritten JAR
    #[arg(value_name = "OUTPUT", default_value = "out.jar")]
    output: PathBuf,
}

fn compression(setting: CompressionSetting) -> Compression {
    match setting {
        CompressionSetting::Deflated => Compression::Deflated,
        CompressionSetting::Stored => Compression::Stored,
    }
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir().context("failed to determine the working directory")?;
    let (config, config_path) = load_for_invocation(&cwd)?;

    init_tracing(&config.logging);
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "loaded configuration");
    }

    let options = ArchiveOptions {
        compression: compression(config.archive.compression),
    };

    let mut transform = DesugarTransform::default();
    let summary = rewrite_archive(&cli.input, &cli.output, &options, &mut transform)
        .with_context(|| format!("failed to desugar {}", cli.input.display()))?;

    tracing::info!(
        classes = summary.classes,
        resources = summary.resources,
        classes_rewritten = transform.classes_rewritten,
        call_sites = transform.call_sites,
        output = %cli.output.display(),
        "desugared archive"
    );
    Ok(0)
}
