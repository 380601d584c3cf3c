//! rose-export - ROSE asset inspection CLI
//!
//! Decodes game asset files and prints summaries or JSON reports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rose_export::{
    BindPoseReport, ExportConfig, HeightReport, SampleReport, load, load_document, summarize,
    to_json,
};
use rose_formats::{AnimationDocument, HeightmapDocument, SkeletonDocument};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rose-export")]
#[command(about = "Inspect and export ROSE Online asset files")]
#[command(version)]
struct Cli {
    /// Config file (default: ./rose-export.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of any supported asset file
    Inspect {
        /// Input file (.zms, .zmd, .zmo, .zon, .zsc, .ifo, .him, .til, .chr)
        input: PathBuf,
    },

    /// Write a parsed document as JSON
    Dump {
        input: PathBuf,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the bind pose of a skeleton
    BindPose {
        /// Input skeleton (.zmd)
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sample every animation channel at a point in time
    Sample {
        /// Input animation (.zmo)
        input: PathBuf,

        /// Time in seconds, wrapped into the animation loop
        #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
        time: f64,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interpolate a heightmap at grid coordinates
    Height {
        /// Input heightmap (.him)
        input: PathBuf,

        #[arg(allow_hyphen_values = true)]
        x: f32,

        #[arg(allow_hyphen_values = true)]
        y: f32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ExportConfig::discover(cli.config.as_deref())?;
    let convention = config.convention.resolve()?;
    let pretty = config.output.pretty;

    match cli.command {
        Commands::Inspect { input } => {
            let document = load_document(&input)?;
            for line in summarize(&document) {
                println!("{line}");
            }
        }
        Commands::Dump { input, output } => {
            let document = load_document(&input)?;
            emit(&to_json(&document, pretty)?, output.as_deref())?;
        }
        Commands::BindPose { input, output } => {
            let skeleton: SkeletonDocument = load(&input)?;
            tracing::info!(
                "Resolving {} nodes from {:?}",
                skeleton.node_count(),
                input
            );
            let report = BindPoseReport::new(&skeleton, convention)?;
            emit(&to_json(&report, pretty)?, output.as_deref())?;
        }
        Commands::Sample {
            input,
            time,
            output,
        } => {
            let animation: AnimationDocument = load(&input)?;
            tracing::info!("Sampling {:?} at {}s", input, time);
            let report = SampleReport::new(&animation, time, &convention);
            emit(&to_json(&report, pretty)?, output.as_deref())?;
        }
        Commands::Height { input, x, y } => {
            let heightmap: HeightmapDocument = load(&input)?;
            let report = HeightReport::new(&heightmap, x, y, &convention);
            emit(&to_json(&report, pretty)?, None)?;
        }
    }

    Ok(())
}

/// Writes `json` to `output`, or stdout when no path is given.
fn emit(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {:?}", path);
        }
        None => println!("{json}"),
    }
    Ok(())
}
