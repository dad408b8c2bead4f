/* src/main.rs */
#![warn(missing_docs)]
//! # Squiggler CLI
//!
//! Command-line front end for the squiggle predictor: reads FASTA / FASTQ
//! records, predicts per-position signal parameters and writes a report.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use squiggler::{
    argmax_matrix,
    config::{LoggingConfig, ModelConfig},
    format_matrix, load_config, max_matrix, min_matrix, predict_files, sequence_to_squiggle,
    AppConfig, FaerGemm, ModelWeights, PredictSettings, ReportFormat, SquiggleModel,
};

const LICENCE_TEXT: &str = "\
squiggler is dual-licensed under the MIT License or the Apache License,
Version 2.0, at your option.

Copyright (c) 2025 ArcMoon Studios

Unless required by applicable law or agreed to in writing, software
distributed under either licence is distributed on an \"AS IS\" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See https://opensource.org/licenses/MIT and
https://www.apache.org/licenses/LICENSE-2.0 for the full texts.
";

// =====================================================================================
// CLI CONFIGURATION & ARGUMENTS
// =====================================================================================

/// Squiggler CLI - predict nanopore squiggles from DNA sequence
#[derive(Parser, Debug)]
#[command(
    name = "squiggler",
    version = env!("CARGO_PKG_VERSION"),
    author = "Lord Xyn <lord.xyn@proton.me>",
    about = "Predicts expected nanopore current, spread and dwell for every base of a sequence"
)]
struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print licensing information
    #[arg(long, visible_alias = "license")]
    licence: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (overrides the configuration file)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict squiggles for every record of one or more FASTA / FASTQ files
    Predict {
        /// Input files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Maximum number of reads to predict (0 is unlimited)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Write to file rather than stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Prefix to append to name of each read
        #[arg(short, long)]
        prefix: Option<String>,

        /// Rescale network output
        #[arg(long, overrides_with = "no_rescale")]
        rescale: bool,

        /// Don't rescale network output
        #[arg(long, overrides_with = "rescale")]
        no_rescale: bool,

        /// Report layout
        #[arg(short, long)]
        format: Option<ReportFormat>,

        /// Weight table (JSON or YAML)
        #[arg(short, long)]
        weights: Option<PathBuf>,
    },

    /// Write the seeded placeholder weight table
    ExportWeights {
        /// Destination; `.yaml`/`.yml` writes YAML, anything else JSON
        #[arg(short, long)]
        output: PathBuf,

        /// Context window width in bases (odd)
        #[arg(long)]
        window: Option<usize>,

        /// Hidden units per layer
        #[arg(long)]
        hidden: Option<usize>,

        /// Seed for the placeholder weights
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Predict one sequence and dump the raw output matrix
    Inspect {
        /// Base sequence
        sequence: String,

        /// Rows to show (0 shows all)
        #[arg(long, default_value = "0")]
        rows: usize,

        /// Columns to show (0 shows all)
        #[arg(long, default_value = "0")]
        cols: usize,

        /// Include padding rows
        #[arg(long)]
        padding: bool,

        /// Don't rescale network output
        #[arg(long)]
        no_rescale: bool,

        /// Weight table (JSON or YAML)
        #[arg(short, long)]
        weights: Option<PathBuf>,
    },
}

/// Log level configuration
#[derive(ValueEnum, Clone, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

// =====================================================================================
// MODEL CONSTRUCTION
// =====================================================================================

/// Loads the configured weight table, or seeds a placeholder one.
fn build_model(model: &ModelConfig) -> Result<SquiggleModel> {
    let weights = match &model.weights {
        Some(path) => ModelWeights::load(path)
            .with_context(|| format!("Failed to load weights: {}", path.display()))?,
        None => {
            info!(seed = model.seed, window = model.window, hidden = model.hidden, "Using seeded placeholder weights");
            ModelWeights::seeded(model.window, model.hidden, model.seed)?
        }
    };
    let gemm = FaerGemm::with_threads(model.gemm_threads);
    info!(threads = gemm.threads(), validation = squiggler::validate::ENABLED, "Matrix multiply backend ready");
    Ok(SquiggleModel::with_gemm(&weights, gemm)?)
}

// =====================================================================================
// PREDICT COMMAND IMPLEMENTATION
// =====================================================================================

/// Execute predict command
fn cmd_predict(model: &SquiggleModel, files: &[PathBuf], output: Option<&Path>, settings: &PredictSettings) -> Result<()> {
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to open \"{}\" for output", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let counts = predict_files(model, files, &mut out, settings).context("Failed to write report")?;
    out.flush().context("Failed to flush report")?;
    info!(started = counts.started, written = counts.written, "Prediction finished");
    Ok(())
}

// =====================================================================================
// EXPORT & INSPECT COMMANDS
// =====================================================================================

/// Execute export-weights command
fn cmd_export_weights(model: &ModelConfig, output: &Path) -> Result<()> {
    let weights = ModelWeights::seeded(model.window, model.hidden, model.seed)?;
    weights
        .save(output)
        .with_context(|| format!("Failed to write weights: {}", output.display()))?;
    info!(path = %output.display(), window = model.window, hidden = model.hidden, "Exported weight table");
    Ok(())
}

/// Execute inspect command
fn cmd_inspect(
    model: &SquiggleModel,
    sequence: &str,
    rescale: bool,
    rows: usize,
    cols: usize,
    padding: bool,
) -> Result<()> {
    let squiggle = sequence_to_squiggle(model, sequence.as_bytes(), rescale)
        .with_context(|| format!("Failed to predict \"{sequence}\""))?;

    let header = format!("squiggle [{} x {}], stride {}", squiggle.nr(), squiggle.nc(), squiggle.stride());
    let mut stdout = io::stdout().lock();
    format_matrix(&mut stdout, Some(&header), &squiggle, rows, cols, padding);
    stdout.flush()?;

    info!(
        max = max_matrix(Some(&squiggle)),
        min = min_matrix(Some(&squiggle)),
        argmax = ?argmax_matrix(Some(&squiggle)),
        "Output extrema"
    );
    Ok(())
}

// =====================================================================================
// MAIN APPLICATION ENTRY POINT
// =====================================================================================

/// Setup logging configuration
///
/// The returned guard must live until exit so the file writer drains.
fn setup_logging(args: &Args, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = match args.log_level.clone() {
        Some(level) => Level::from(level),
        None if args.verbose => Level::DEBUG,
        None => logging.tracing_level()?,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let (file_layer, guard) = if logging.file_logging {
        fs::create_dir_all(&logging.log_directory).with_context(|| {
            format!("Failed to create log directory: {}", logging.log_directory.display())
        })?;
        let appender = tracing_appender::rolling::daily(&logging.log_directory, "squiggler.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Applies a `--weights` override to the model section.
fn with_weights(config: &AppConfig, weights: &Option<PathBuf>) -> ModelConfig {
    let mut model = config.model.clone();
    if let Some(path) = weights {
        model.weights = Some(path.clone());
    }
    model
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    if args.licence {
        print!("{LICENCE_TEXT}");
        return Ok(());
    }

    // Load configuration
    let config = load_config(args.config.as_deref()).with_context(|| "Failed to load configuration")?;

    let Some(command) = &args.command else {
        Args::command()
            .error(ErrorKind::MissingSubcommand, "a subcommand is required unless --licence is given")
            .exit();
    };

    // Setup logging
    let _guard = setup_logging(&args, &config.logging)?;

    // Dispatch subcommands
    match command {
        Commands::Predict { files, limit, output, prefix, rescale, no_rescale, format, weights } => {
            let model = build_model(&with_weights(&config, weights))?;
            let settings = PredictSettings {
                limit: limit.unwrap_or(config.output.limit),
                prefix: prefix.clone().unwrap_or_else(|| config.output.prefix.clone()),
                rescale: if *rescale {
                    true
                } else if *no_rescale {
                    false
                } else {
                    config.output.rescale
                },
                format: format.unwrap_or(config.output.format),
            };
            cmd_predict(&model, files, output.as_deref(), &settings)?;
        }
        Commands::ExportWeights { output, window, hidden, seed } => {
            let mut model = config.model.clone();
            model.window = window.unwrap_or(model.window);
            model.hidden = hidden.unwrap_or(model.hidden);
            model.seed = seed.unwrap_or(model.seed);
            cmd_export_weights(&model, output)?;
        }
        Commands::Inspect { sequence, rows, cols, padding, no_rescale, weights } => {
            let model = build_model(&with_weights(&config, weights))?;
            let rescale = config.output.rescale && !*no_rescale;
            cmd_inspect(&model, sequence, rescale, *rows, *cols, *padding)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_licence_flag_needs_no_subcommand() {
        for flag in ["--licence", "--license"] {
            let args = Args::try_parse_from(["squiggler", flag]).unwrap();
            assert!(args.licence);
            assert!(args.command.is_none());
        }
        assert!(LICENCE_TEXT.contains("Apache License"));
    }

    #[test]
    fn test_rescale_flags_override_each_other() {
        let args = Args::try_parse_from(["squiggler", "predict", "--no-rescale", "--rescale", "in.fa"]).unwrap();
        let Some(Commands::Predict { rescale, no_rescale, .. }) = args.command else {
            panic!("expected predict");
        };
        assert!(rescale);
        assert!(!no_rescale);
    }
}
