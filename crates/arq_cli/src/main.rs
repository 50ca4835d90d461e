// GLB to USDZ converter
// Run with: cargo run --release --bin arq -- convert chair.glb

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use arq_core::usdz::Alignment;
use arq_core::{output_file_name, ConvertOptions, Converter, UsdzPackage, USDZ_MEDIA_TYPE};

const USAGE: &str = "Usage:
  arq convert <input.glb> [output.usdz] [--config <options.toml>]
  arq inspect <file.usdz>";

#[derive(Debug, PartialEq)]
enum Command {
    Convert {
        input: PathBuf,
        output: Option<PathBuf>,
        config: Option<PathBuf>,
    },
    Inspect {
        path: PathBuf,
    },
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some((command, rest)) = args.split_first() else {
        bail!("missing command\n{USAGE}");
    };

    match command.as_str() {
        "convert" => {
            let mut positional = Vec::new();
            let mut config = None;
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                if arg == "--config" {
                    let path = iter.next().context("--config needs a file")?;
                    config = Some(PathBuf::from(path));
                } else if arg.starts_with("--") {
                    bail!("unknown flag {arg}\n{USAGE}");
                } else {
                    positional.push(PathBuf::from(arg));
                }
            }

            let mut positional = positional.into_iter();
            let input = positional.next().context("missing input file")?;
            let output = positional.next();
            if positional.next().is_some() {
                bail!("too many arguments\n{USAGE}");
            }

            Ok(Command::Convert {
                input,
                output,
                config,
            })
        }
        "inspect" => match rest {
            [path] => Ok(Command::Inspect {
                path: PathBuf::from(path),
            }),
            _ => bail!("inspect takes one file\n{USAGE}"),
        },
        other => bail!("unknown command {other}\n{USAGE}"),
    }
}

fn default_output(input: &Path) -> PathBuf {
    let name = output_file_name(&input.to_string_lossy());
    input.with_file_name(name)
}

fn convert(input: &Path, output: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let options = match config {
        Some(path) => ConvertOptions::load(path)?,
        None => ConvertOptions::default(),
    };

    let glb = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let converter = Converter::with_options(&options);
    log::info!(
        "Converting {} ({} bytes) with strategies {:?}",
        input.display(),
        glb.len(),
        converter.strategy_names()
    );

    let conversion = converter
        .convert(&glb)
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    for diagnostic in &conversion.diagnostics {
        println!("warning: {}", diagnostic);
    }

    let output = output.map_or_else(|| default_output(input), Path::to_path_buf);
    fs::write(&output, &conversion.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} ({}, {} bytes, via {}, {} diagnostics)",
        output.display(),
        USDZ_MEDIA_TYPE,
        conversion.bytes.len(),
        conversion.strategy,
        conversion.diagnostics.len()
    );
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let package = UsdzPackage::read(&bytes)
        .with_context(|| format!("{} is not a USDZ archive", path.display()))?;

    println!("=== {} ===", path.display());
    println!("Alignment: {:?}", package.alignment);
    println!("\n--- Entries ---");
    for entry in &package.entries {
        match entry.data_offset {
            Some(offset) => println!("  {} - {} bytes at offset {}", entry.name, entry.data.len(), offset),
            None => println!("  {} - {} bytes", entry.name, entry.data.len()),
        }
    }

    let layer = package
        .validate(Alignment::Strict)
        .with_context(|| format!("{} is not a valid USDZ package", path.display()))?;

    println!("\n--- Layer ---");
    print!("{}", layer.summary());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match parse_args(&args)? {
        Command::Convert {
            input,
            output,
            config,
        } => convert(&input, output.as_deref(), config.as_deref()),
        Command::Inspect { path } => inspect(&path),
    }
}
