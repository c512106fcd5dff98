// This software is licensed under a dual license model:
//
// GNU Affero General Public License v3 (AGPLv3): You may use, modify, and
// distribute this software under the terms of the AGPLv3.
//
// Elastic License v2 (ELv2): You may also use, modify, and distribute this
// software under the Elastic License v2, which has specific restrictions.
//
// We welcome any commercial collaboration or support. For inquiries
// regarding the licenses, please contact us at:
// vectorchord-inquiry@tensorchord.ai
//
// Copyright (c) 2025 TensorChord Inc.

#![allow(unused_crate_dependencies)]

use anyhow::{Context, Result};
use canopy::{ClusteringOptions, Outcome};
use clap::{ArgAction, Args, Parser, Subcommand};
use k_means::Variant;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(version, about = "Canopy-accelerated iterative k-means")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster a partitioned dataset until the centroids converge
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Seed centroids, one `a,b,...` point per line
    centroid_file: PathBuf,
    num_partitions: usize,
    /// Partition data files, one path per line
    partition_manifest: PathBuf,
    /// TOML file with clustering options
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    max_iterations: Option<u32>,
    /// `flat` or `canopy`
    #[arg(long)]
    variant: Option<Variant>,
    #[arg(long)]
    threads: Option<u16>,
    /// Also write the final centroids to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    match cli.command {
        Commands::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut options = match &args.config {
        Some(path) => ClusteringOptions::load(path)?,
        None => ClusteringOptions::default(),
    };
    if let Some(max_iterations) = args.max_iterations {
        options.max_iterations = Some(max_iterations);
    }
    if let Some(variant) = args.variant {
        options.variant = variant;
    }
    if let Some(threads) = args.threads {
        options.threads = threads;
    }
    let report = canopy::run(
        &args.centroid_file,
        args.num_partitions,
        &args.partition_manifest,
        &options,
    )
    .with_context(|| {
        format!(
            "clustering {} from seeds {}",
            args.partition_manifest.display(),
            args.centroid_file.display()
        )
    })?;
    if report.outcome == Outcome::MaxIterations {
        eprintln!(
            "Stopped after {} rounds without converging (last total error {}).",
            report.rounds,
            report.errors.last().copied().unwrap_or_default()
        );
    }
    tracing::info!(
        rounds = report.rounds,
        elapsed = ?report.elapsed,
        "run finished"
    );
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    point::write_points(&mut stdout, &report.centroids)?;
    stdout.flush()?;
    if let Some(output) = &args.output {
        let mut file = std::fs::File::create(output)
            .with_context(|| format!("creating {}", output.display()))?;
        point::write_points(&mut file, &report.centroids)
            .with_context(|| format!("writing {}", output.display()))?;
    }
    Ok(())
}
