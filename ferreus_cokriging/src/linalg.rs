/////////////////////////////////////////////////////////////////////////////////////////////
//
// Solves dense co-kriging systems with Cholesky or partial pivoting LU and checks the result.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # linalg
//!
//! Dense direct solves of the co-kriging system.
//!
//! A solve is accepted only when the factorisation is not numerically singular
//! (smallest to largest pivot magnitude at least `singularity_tolerance`) and the
//! normwise backward error `|Cx - b| / (|C| |x| + |b|)` is at most
//! `residual_tolerance`. Norms are Frobenius norms.

use crate::{
    assembler::KrigingSystem,
    config::{Params, Solvers},
    error::{KrigingError, KrigingResult},
};
use faer::{Mat, MatRef, Side, linalg::solvers::Solve};
use tracing::{debug, warn};

/// Factorisation that produced an accepted solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factorisation {
    Cholesky,
    PartialPivLu,
}

/// Solution of a kriging system with its acceptance diagnostics.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub solution: Mat<f64>,
    pub backward_error: f64,
    /// Ratio between the smallest and largest pivot magnitude.
    pub pivot_ratio: f64,
    pub factorisation: Factorisation,
}

/// Solves `matrix * x = rhs`.
///
/// With [`Solvers::Auto`] a Cholesky factorisation is attempted first and partial
/// pivoting LU is used if it fails.
///
/// ### Errors
/// [`KrigingError::Shape`] for non-square or mismatched inputs and
/// [`KrigingError::Numerical`] when the matrix holds non-finite values, is
/// singular to working precision, or the solution fails the residual check.
///
/// ### Example
/// ```
/// use faer::mat;
/// use ferreus_cokriging::{config::Params, solve};
///
/// let a = mat![[4.0, 1.0], [1.0, 3.0f64]];
/// let b = mat![[1.0], [2.0f64]];
/// let x = solve(a.as_ref(), b.as_ref(), &Params::default())?;
///
/// assert!((4.0 * x[(0, 0)] + x[(1, 0)] - 1.0).abs() < 1e-12);
/// # Ok::<(), ferreus_cokriging::KrigingError>(())
/// ```
pub fn solve(matrix: MatRef<f64>, rhs: MatRef<f64>, params: &Params) -> KrigingResult<Mat<f64>> {
    solve_checked(matrix, rhs, params, true).map(|report| report.solution)
}

/// Solves an assembled [`KrigingSystem`].
///
/// Systems with drift are indefinite, so [`Solvers::Auto`] only attempts a
/// Cholesky factorisation when the layout has no drift block.
pub fn solve_system(system: &KrigingSystem, params: &Params) -> KrigingResult<SolveReport> {
    let try_cholesky = system.layout.length_of_u_i == 0;
    solve_checked(system.matrix.as_ref(), system.rhs.as_ref(), params, try_cholesky)
}

fn solve_checked(
    matrix: MatRef<f64>,
    rhs: MatRef<f64>,
    params: &Params,
    try_cholesky: bool,
) -> KrigingResult<SolveReport> {
    let n = matrix.nrows();
    if matrix.ncols() != n {
        return Err(KrigingError::Shape(format!(
            "system matrix must be square, got {:?}",
            matrix.shape()
        )));
    }
    if rhs.nrows() != n {
        return Err(KrigingError::Shape(format!(
            "right hand side has {} rows for a system of size {n}",
            rhs.nrows()
        )));
    }
    if !all_finite(matrix) || !all_finite(rhs) {
        return Err(KrigingError::Numerical(
            "system contains non-finite values".to_string(),
        ));
    }
    if n == 0 {
        return Ok(SolveReport {
            solution: Mat::zeros(0, rhs.ncols()),
            backward_error: 0.0,
            pivot_ratio: 1.0,
            factorisation: Factorisation::PartialPivLu,
        });
    }

    let cholesky = match (params.solver_type, try_cholesky) {
        (Solvers::Auto, true) => match matrix.llt(Side::Lower) {
            Ok(llt) => {
                let pivots: Vec<f64> = llt
                    .L()
                    .diagonal()
                    .column_vector()
                    .iter()
                    .map(|l| l * l)
                    .collect();
                Some((llt.solve(rhs), pivot_ratio(&pivots)))
            }
            Err(_) => {
                debug!(size = n, "cholesky factorisation failed, falling back to LU");
                None
            }
        },
        _ => None,
    };

    let (solution, ratio, factorisation) = match cholesky {
        Some((solution, ratio)) => (solution, ratio, Factorisation::Cholesky),
        None => {
            let lu = matrix.partial_piv_lu();
            let pivots: Vec<f64> = lu.U().diagonal().column_vector().iter().copied().collect();
            (lu.solve(rhs), pivot_ratio(&pivots), Factorisation::PartialPivLu)
        }
    };

    if !(ratio >= params.singularity_tolerance) {
        warn!(pivot_ratio = ratio, "kriging system is singular");
        return Err(KrigingError::Numerical(format!(
            "system is singular to working precision (pivot ratio {ratio:e}); \
             check for duplicated or collinear observations"
        )));
    }

    let backward_error = backward_error(matrix, solution.as_ref(), rhs);
    if !(backward_error <= params.residual_tolerance) {
        warn!(backward_error, "kriging solution failed the residual check");
        return Err(KrigingError::Numerical(format!(
            "backward error {backward_error:e} exceeds tolerance {:e}",
            params.residual_tolerance
        )));
    }

    debug!(
        size = n,
        ?factorisation,
        pivot_ratio = ratio,
        backward_error,
        "solved kriging system"
    );

    Ok(SolveReport {
        solution,
        backward_error,
        pivot_ratio: ratio,
        factorisation,
    })
}

fn all_finite(m: MatRef<f64>) -> bool {
    m.col_iter().all(|c| c.iter().all(|v| v.is_finite()))
}

/// Smallest to largest pivot magnitude, `0` when a pivot is not finite.
fn pivot_ratio(pivots: &[f64]) -> f64 {
    if pivots.iter().any(|p| !p.is_finite()) {
        return 0.0;
    }
    let (min, max) = pivots
        .iter()
        .map(|p| p.abs())
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), p| (lo.min(p), hi.max(p)));
    match max > 0.0 {
        true => min / max,
        false => 0.0,
    }
}

/// Normwise backward error `|Cx - b| / (|C| |x| + |b|)`.
pub(crate) fn backward_error(matrix: MatRef<f64>, x: MatRef<f64>, rhs: MatRef<f64>) -> f64 {
    let residual = matrix * x - rhs;
    let denominator = matrix.norm_l2() * x.norm_l2() + rhs.norm_l2();
    match denominator > 0.0 {
        true => residual.norm_l2() / denominator,
        false => 0.0,
    }
}
