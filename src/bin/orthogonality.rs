//! Experiment Runner for Orthogonality Analysis.
//!
//! This executable measures how well the Krylov bases produced by the three variants
//! keep their orthonormality as the subspace dimension `m` grows:
//!
//! - full Arnoldi (modified Gram-Schmidt against every previous vector),
//! - incomplete Arnoldi with a fixed window `--iop`,
//! - Lanczos (three-term recurrence, no re-orthogonalization), symmetric scenarios only.
//!
//! For every `m` it also records the residual of the Arnoldi relation
//! `‖A V_m - V_{m+1} H‖_F`, which stays at rounding level even when orthogonality is lost.

use anyhow::{Result, ensure};
use clap::{Parser, ValueEnum};
use faer::{
    MatRef,
    prelude::*,
    sparse::{SparseColMat, Triplet},
};
use krylov_subspace::{KrylovOptions, KrylovSubspace, LinearOperator, arnoldi_into, lanczos_into};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::path::PathBuf;

/// Defines the spectral properties of the test operator A.
#[derive(ValueEnum, Clone, Debug, Copy)]
enum ProblemScenario {
    /// Symmetric, eigenvalues evenly spread over [0.1, 100].
    WellConditioned,
    /// Symmetric, two clusters on either side of zero plus a near-zero eigenvalue.
    IllConditioned,
    /// Non-normal upper bidiagonal matrix; Lanczos is skipped.
    NonNormal,
}

impl ProblemScenario {
    fn is_symmetric(self) -> bool {
        !matches!(self, Self::NonNormal)
    }
}

/// Command-line arguments for the orthogonality analysis runner.
#[derive(Parser, Debug)]
#[clap(
    name = "orthogonality-runner",
    about = "Measures the loss of orthogonality of Arnoldi, IOP-Arnoldi and Lanczos bases."
)]
struct OrthoArgs {
    /// The spectral scenario for the test problem.
    #[clap(long, value_enum)]
    scenario: ProblemScenario,
    /// Dimension of the test matrix.
    #[clap(long, default_value_t = 1000)]
    n: usize,
    /// Minimum subspace dimension m to test.
    #[clap(long, default_value_t = 10)]
    m_min: usize,
    /// Maximum subspace dimension m to test.
    #[clap(long, default_value_t = 200)]
    m_max: usize,
    /// Step size for iterating m.
    #[clap(long, default_value_t = 10)]
    m_step: usize,
    /// Orthogonalization window of the incomplete Arnoldi variant.
    #[clap(long, default_value_t = 2)]
    iop: usize,
    /// Happy-breakdown tolerance, relative to the operator infinity norm.
    #[clap(long, default_value_t = 1e-12)]
    tol: f64,
    /// Strength of the super-diagonal coupling in the non-normal scenario.
    #[clap(long, default_value_t = 1.0)]
    coupling: f64,
    /// Path to the output CSV file where results will be written.
    #[clap(long, value_name = "PATH")]
    output: PathBuf,
}

/// A single row of the output CSV file.
#[derive(Debug, Serialize)]
struct OrthogonalityResult {
    /// Requested subspace dimension.
    m: usize,
    /// Dimension reached by full Arnoldi (smaller than `m` after a happy breakdown).
    m_arnoldi: usize,
    /// ||I - V^H V||_F for the full Arnoldi basis.
    ortho_loss_arnoldi: f64,
    /// ||I - V^H V||_F for the incomplete Arnoldi basis.
    ortho_loss_iop: f64,
    /// ||I - V^H V||_F for the Lanczos basis, empty for non-symmetric scenarios.
    ortho_loss_lanczos: Option<f64>,
    /// ||A V_m - V_{m+1} H||_F for full Arnoldi.
    residual_arnoldi: f64,
    /// ||A V_m - V_{m+1} H||_F for Lanczos.
    residual_lanczos: Option<f64>,
}

/// Creates a synthetic sparse test operator for the specified scenario.
fn create_problem(
    n: usize,
    scenario: ProblemScenario,
    coupling: f64,
) -> Result<SparseColMat<usize, f64>> {
    // i-th of `len` evenly spaced points in [lo, hi].
    let step = |lo: f64, hi: f64, len: usize, i: usize| {
        lo + (hi - lo) / (len.saturating_sub(1)).max(1) as f64 * i as f64
    };

    let mut eigs: Vec<f64> = match scenario {
        ProblemScenario::WellConditioned | ProblemScenario::NonNormal => {
            (0..n).map(|i| step(0.1, 100.0, n, i)).collect()
        }
        ProblemScenario::IllConditioned => {
            let mid = n / 2;
            (0..n)
                .map(|i| {
                    if i < mid {
                        step(0.1, 1.0, mid, i)
                    } else {
                        step(-1.0, -0.1, n - mid, i - mid)
                    }
                })
                .collect()
        }
    };
    if matches!(scenario, ProblemScenario::IllConditioned) && n > 0 {
        eigs[n / 2] = 1e-8;
    }

    let mut triplets: Vec<Triplet<usize, usize, f64>> = eigs
        .iter()
        .enumerate()
        .map(|(i, &val)| Triplet { row: i, col: i, val })
        .collect();
    if !scenario.is_symmetric() {
        triplets.extend((0..n.saturating_sub(1)).map(|i| Triplet {
            row: i,
            col: i + 1,
            val: coupling,
        }));
    }
    Ok(SparseColMat::try_new_from_triplets(n, n, &triplets)?)
}

fn orthogonality_loss(v: MatRef<'_, f64>) -> f64 {
    (Mat::<f64>::identity(v.ncols(), v.ncols()) - v.adjoint() * v).norm_l2()
}

/// Residual of `A V[:, 0..m] = V[:, 0..m+1] H`, applying `A` column by column.
fn recurrence_residual(
    operator: &dyn LinearOperator<f64>,
    ks: &KrylovSubspace<f64, f64>,
) -> f64 {
    let m = ks.m();
    let v = ks.basis();
    let mut av = Mat::<f64>::zeros(ks.n(), m);
    for j in 0..m {
        operator.apply(av.col_mut(j), v.col(j));
    }
    (av - v * ks.coefficients()).norm_l2()
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .try_init()?;
    let args = OrthoArgs::parse();
    ensure!(
        args.m_min > 0 && args.m_step > 0 && args.m_max >= args.m_min,
        "m_min and m_step must be positive and m_max >= m_min"
    );
    log::info!(
        "Starting orthogonality analysis for scenario: {:?}, n = {}",
        args.scenario,
        args.n
    );

    let a = create_problem(args.n, args.scenario, args.coupling)?;
    let mut rng = StdRng::seed_from_u64(42); // For reproducible results.
    let b = Mat::<f64>::from_fn(args.n, 1, |_, _| rng.random());

    // One subspace per variant, sized once for the largest run and reused.
    let mut arnoldi_ks = KrylovSubspace::<f64, f64>::new(args.n, args.m_max);
    let mut iop_ks = KrylovSubspace::<f64, f64>::new(args.n, args.m_max);
    let mut lanczos_ks = KrylovSubspace::<f64, f64>::new(args.n, args.m_max);

    let mut writer = csv::Writer::from_path(&args.output)?;
    for m in (args.m_min..=args.m_max).step_by(args.m_step) {
        log::info!("Running for m = {}...", m);
        let options = KrylovOptions::default().with_m(m).with_tol(args.tol);

        let status = arnoldi_into(&mut arnoldi_ks, &a, b.col(0), &options)?;
        let iop_options = KrylovOptions::default()
            .with_m(m)
            .with_tol(args.tol)
            .with_iop(args.iop);
        arnoldi_into(&mut iop_ks, &a, b.col(0), &iop_options)?;

        let (ortho_loss_lanczos, residual_lanczos) = if args.scenario.is_symmetric() {
            lanczos_into(&mut lanczos_ks, &a, b.col(0), &options)?;
            (
                Some(orthogonality_loss(lanczos_ks.basis())),
                Some(recurrence_residual(&a, &lanczos_ks)),
            )
        } else {
            (None, None)
        };

        writer.serialize(OrthogonalityResult {
            m,
            m_arnoldi: status.m(),
            ortho_loss_arnoldi: orthogonality_loss(arnoldi_ks.basis()),
            ortho_loss_iop: orthogonality_loss(iop_ks.basis()),
            ortho_loss_lanczos,
            residual_arnoldi: recurrence_residual(&a, &arnoldi_ks),
            residual_lanczos,
        })?;
    }

    writer.flush()?;
    log::info!(
        "Orthogonality analysis complete. Results saved to {:?}.",
        &args.output
    );
    Ok(())
}
