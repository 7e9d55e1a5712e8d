//! Experiment Runner for the Scalability Analysis.
//!
//! This executable orchestrates the scalability experiment. The primary process,
//! the "orchestrator," iterates through a range of problem sizes. For each size it
//! spawns isolated "worker" child processes, one per Krylov variant (`arnoldi`,
//! `arnoldi-iop`, `lanczos`), which build the test operator, run the computation for a
//! fixed subspace dimension and measure wall time and peak memory.
//!
//! Running every measurement in its own process keeps the peak RSS of one variant
//! from being conflated with that of the orchestrator or of the other workers. The
//! orchestrator captures the single-row CSV output of each worker and aggregates all
//! results into a final CSV file.

use anyhow::{Context, Result, anyhow, ensure};
use clap::{Parser, ValueEnum};
use faer::{
    prelude::*,
    sparse::{SparseColMat, Triplet},
};
use krylov_subspace::{
    KrylovOptions, KrylovStatus, KrylovSubspace, arnoldi_into, lanczos_into,
    utils::perf::{get_peak_rss_kb, timed},
};
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    process::{Command, Stdio},
};

/// Environment variable to differentiate between orchestrator and worker processes.
/// If this is set, the process runs in worker mode for the specified variant.
const VARIANT_ENV_VAR: &str = "KRYLOV_SCALABILITY_VARIANT";

/// Defines the Krylov variant to be run in a worker process.
#[derive(ValueEnum, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Copy)]
#[serde(rename_all = "kebab-case")]
enum KrylovVariant {
    Arnoldi,
    ArnoldiIop,
    Lanczos,
}

/// Command-line arguments for the main orchestrator process.
#[derive(Parser, Debug)]
#[clap(
    name = "scalability-runner",
    about = "Runs the scalability analysis for the Arnoldi and Lanczos processes."
)]
struct ScalabilityArgs {
    /// The fixed subspace dimension m to use for all runs.
    #[clap(long, default_value_t = 30)]
    m_fixed: usize,
    /// Orthogonalization window of the `arnoldi-iop` variant.
    #[clap(long, default_value_t = 2)]
    iop: usize,
    /// Grid side of the smallest 2D Laplacian (n = side²).
    #[clap(long)]
    side_start: usize,
    /// Grid side of the largest 2D Laplacian.
    #[clap(long)]
    side_end: usize,
    /// The step size for increasing the grid side.
    #[clap(long)]
    side_step: usize,
    /// Path to the output CSV file for storing aggregated results.
    #[clap(long, value_name = "PATH")]
    output: PathBuf,
}

/// Command-line arguments for the isolated worker processes.
#[derive(Parser, Debug)]
struct WorkerArgs {
    /// Grid side of the 2D Laplacian for this run.
    #[clap(long)]
    side: usize,
    /// The fixed subspace dimension m to use.
    #[clap(long)]
    m_fixed: usize,
    /// Orthogonalization window of the `arnoldi-iop` variant.
    #[clap(long)]
    iop: usize,
}

/// Represents a single row of data in the final output CSV.
/// This struct captures the result from a single worker run.
#[derive(Debug, Serialize, Deserialize)]
struct ScalabilityResult {
    variant: KrylovVariant,
    n: usize,
    m: usize,
    breakdown: bool,
    time_s: f64,
    rss_kb: u64,
}

/// Main entry point.
///
/// The logic dispatches to either the orchestrator or a worker based on the
/// presence of the `KRYLOV_SCALABILITY_VARIANT` environment variable.
fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    if let Ok(variant_str) = std::env::var(VARIANT_ENV_VAR) {
        let variant = KrylovVariant::from_str(&variant_str, true)
            .map_err(|_| anyhow!("Invalid variant string in env var: {}", variant_str))?;
        run_worker(variant)
    } else {
        run_orchestrator()
    }
}

/// Orchestrator logic.
///
/// Results are written to the output CSV file incrementally to ensure data is
/// saved even if a run fails mid-way through the experiment.
fn run_orchestrator() -> Result<()> {
    let args = ScalabilityArgs::parse();
    ensure!(args.m_fixed > 0, "m_fixed must be positive");
    log::info!("Orchestrator starting scalability experiment...");

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("Failed to create CSV writer for {:?}", &args.output))?;

    let variants_to_run = [
        KrylovVariant::Arnoldi,
        KrylovVariant::ArnoldiIop,
        KrylovVariant::Lanczos,
    ];

    for side in (args.side_start..=args.side_end).step_by(args.side_step.max(1)) {
        log::info!("Processing problem size: n = {}", side * side);

        for &variant in &variants_to_run {
            log::info!("Spawning worker for variant: {variant:?}");
            let variant_name = variant
                .to_possible_value()
                .ok_or_else(|| anyhow!("Variant {variant:?} has no command-line name"))?;
            let current_exe = std::env::current_exe()?;
            let child = Command::new(current_exe)
                .arg("--side")
                .arg(side.to_string())
                .arg("--m-fixed")
                .arg(args.m_fixed.to_string())
                .arg("--iop")
                .arg(args.iop.to_string())
                .env(VARIANT_ENV_VAR, variant_name.get_name())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
                .with_context(|| format!("Failed to spawn worker for variant {variant:?}"))?;

            let output = child.wait_with_output()?;
            if !output.status.success() {
                log::error!(
                    "Worker process for variant {:?} at side {} failed with status: {}. Skipping.",
                    variant,
                    side,
                    output.status
                );
                continue;
            }

            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(false)
                .from_reader(output.stdout.as_slice());

            match rdr.deserialize::<ScalabilityResult>().next() {
                Some(Ok(record)) => {
                    log::info!(
                        "Worker finished. Result: n={}, m={}, time={:.3}s, rss={}KB",
                        record.n,
                        record.m,
                        record.time_s,
                        record.rss_kb
                    );
                    writer.serialize(&record)?;
                    writer.flush()?;
                }
                Some(Err(e)) => {
                    log::error!(
                        "Failed to parse worker output as CSV: {}. Skipping record.",
                        e
                    );
                }
                None => {
                    log::warn!(
                        "Worker for {:?} produced no output. Skipping record.",
                        variant
                    );
                }
            }
        }
    }

    log::info!(
        "Scalability experiment complete. Results saved to {:?}.",
        &args.output
    );
    Ok(())
}

/// Five-point 2D Laplacian on a `side × side` grid with Dirichlet boundary.
fn laplacian_2d(side: usize) -> Result<SparseColMat<usize, f64>> {
    let n = side * side;
    let mut triplets = Vec::with_capacity(5 * n);
    for row in 0..side {
        for col in 0..side {
            let i = row * side + col;
            triplets.push(Triplet { row: i, col: i, val: 4.0 });
            let mut couple = |j: usize| {
                triplets.push(Triplet { row: i, col: j, val: -1.0 });
            };
            if row > 0 {
                couple(i - side);
            }
            if row + 1 < side {
                couple(i + side);
            }
            if col > 0 {
                couple(i - 1);
            }
            if col + 1 < side {
                couple(i + 1);
            }
        }
    }
    SparseColMat::try_new_from_triplets(n, n, &triplets)
        .map_err(|e| anyhow!("Failed to construct the 2D Laplacian: {:?}", e))
}

/// Worker logic.
///
/// This function runs in an isolated child process. It builds one operator,
/// runs the specified variant for a fixed `m`, measures performance, and prints a
/// single `ScalabilityResult` to stdout as a CSV row.
fn run_worker(variant: KrylovVariant) -> Result<()> {
    let args = WorkerArgs::parse();
    log::info!("Worker for {variant:?} started.");

    let a = laplacian_2d(args.side)?;
    let n = args.side * args.side;
    let b = Mat::<f64>::from_fn(n, 1, |i, _| 1.0 + (i % 7) as f64);

    let mut ks = KrylovSubspace::<f64, f64>::new(n, args.m_fixed);
    let options = KrylovOptions::default().with_m(args.m_fixed);

    let (status, elapsed) = match variant {
        KrylovVariant::Arnoldi => timed(|| arnoldi_into(&mut ks, &a, b.col(0), &options)),
        KrylovVariant::ArnoldiIop => {
            let options = KrylovOptions::default()
                .with_m(args.m_fixed)
                .with_iop(args.iop);
            timed(|| arnoldi_into(&mut ks, &a, b.col(0), &options))
        }
        KrylovVariant::Lanczos => timed(|| lanczos_into(&mut ks, &a, b.col(0), &options)),
    };
    let status: KrylovStatus = status?;
    let rss_kb = get_peak_rss_kb();

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(std::io::stdout());
    writer.serialize(ScalabilityResult {
        variant,
        n,
        m: status.m(),
        breakdown: status.is_breakdown(),
        time_s: elapsed.as_secs_f64(),
        rss_kb,
    })?;
    writer.flush()?;

    log::info!("Worker for {variant:?} finished.");
    Ok(())
}
