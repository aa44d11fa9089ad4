// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resolves and merges the dependency injection contributions of a program model.
//!
//! # Usage
//!
//! ```bash
//! weld --program program.json
//! ```
//!
//! The program model is a JSON document with the declarations of the current compilation and of
//! the classpath:
//!
//! ```json
//! { "sources": [{ "id": "com.example/AppComponent" }], "classpath": [] }
//! ```
//!
//! Markers of contributions can be shared between separate compilations with `--markers`.
//!
//! The tool prints a JSON report and exits with code 0 on success, or prints the diagnostic and
//! exits with code 1.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use weld::markers::DirectoryMarkerStore;
use weld::{Compilation, CompilationReport, Program, WeldOptions};

#[derive(Parser, Debug)]
#[command(
    name = "weld",
    version,
    about = "Resolves and merges dependency injection contributions of a program model"
)]
struct Cli {
    /// Path to the JSON program model
    #[arg(long, value_name = "PATH")]
    program: PathBuf,

    /// Directory that stores contribution markers shared between compilations
    #[arg(long, value_name = "DIR")]
    markers: Option<PathBuf>,

    /// Path to a JSON options file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Generate factories for inject constructors
    #[arg(long)]
    generate_factories: bool,

    /// Fail on warnings
    #[arg(long)]
    warnings_as_errors: bool,

    /// Maximum number of rounds that may generate subcomponents
    #[arg(long, value_name = "N")]
    max_rounds: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level(cli.verbose))
        .init();

    match run(&cli).and_then(|report| serde_json::to_string_pretty(&report).context("Failed to encode the report")) {
        Ok(report) => println!("{report}"),
        Err(error) => {
            eprintln!("Error: {error:#}");
            std::process::exit(1);
        }
    }
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn run(cli: &Cli) -> Result<CompilationReport> {
    let program: Program = read_json(&cli.program).context("Failed to load the program model")?;
    let options = options(cli)?;

    let mut compilation = Compilation::new(program).with_options(options);
    if let Some(markers) = &cli.markers {
        compilation = compilation.with_markers(Box::new(DirectoryMarkerStore::new(markers)));
    }

    compilation.run().context("Compilation failed")
}

fn options(cli: &Cli) -> Result<WeldOptions> {
    let mut options = match &cli.config {
        Some(path) => read_json(path).context("Failed to load the options")?,
        None => WeldOptions::default(),
    };

    if cli.generate_factories {
        options = options.with_generate_factories(true);
    }
    if cli.warnings_as_errors {
        options = options.with_warnings_as_errors(true);
    }
    if let Some(rounds) = cli.max_rounds {
        options = options.with_max_rounds(rounds);
    }

    Ok(options)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}
