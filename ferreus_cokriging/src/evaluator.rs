/////////////////////////////////////////////////////////////////////////////////////////////
//
// Evaluates a solved potential field and its gradient at query points in parallel chunks.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # evaluator
//!
//! The potential at a query point `x` is
//!
//! ```text
//! Z(x) = sum_(u,j) w_G K'/r(|p_j - x|) (p_j[u] - x[u])
//!      + sum_i     w_I (K(rest_i, x) - K(ref_i, x))
//!      + sum_l     mu_l f_l(x)
//! ```
//!
//! and its gradient is obtained by differentiating each term analytically. Query
//! points are processed in chunks of [`Params::eval_chunk_size`] rows, concurrently
//! when [`Params::parallel_evaluation`] is set. Each point depends only on the
//! model, so results do not depend on the chunking.

use crate::{
    assembler::DualKrigingWeights,
    config::Params,
    error::{KrigingError, KrigingResult},
    grid::GridSet,
    interpolant_config::UniversalityDegree,
    observations::ObservationSet,
    polynomials,
    progress::{ProgressMsg, ProgressSink, fraction},
};
use faer::{Mat, MatRef, unzip, zip};
use ferreus_cokriging_utils::{
    KernelParams, axis_differences, build_distance_matrices,
    kernels::{covariance, unit_first_derivative_over_r, unit_second_derivative},
    tile_dip_positions,
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument};

/// Everything needed to evaluate a solved model, validated once.
struct FieldContext<'a> {
    weights: &'a DualKrigingWeights,
    observations: &'a ObservationSet,
    kernel_params: &'a KernelParams,
    degree: UniversalityDegree,
    tiled_dips: Mat<f64>,
}

impl<'a> FieldContext<'a> {
    fn new(
        weights: &'a DualKrigingWeights,
        observations: &'a ObservationSet,
        grid: &GridSet,
        kernel_params: &'a KernelParams,
        degree: UniversalityDegree,
    ) -> KrigingResult<Self> {
        let n_dims = observations.n_dims();
        if grid.n_dims() != n_dims {
            return Err(KrigingError::Shape(format!(
                "grid is {}D but the observations are {n_dims}D",
                grid.n_dims()
            )));
        }

        let expected = [
            ("gradient", weights.gradient.nrows(), n_dims * observations.n_dips()),
            ("interface", weights.interface.nrows(), observations.n_pairs()),
            ("drift", weights.drift_size(), degree.drift_size(n_dims)),
        ];
        for (name, found, wanted) in expected {
            if found != wanted {
                return Err(KrigingError::Shape(format!(
                    "expected {wanted} {name} weights, got {found}"
                )));
            }
        }

        Ok(Self {
            weights,
            observations,
            kernel_params,
            degree,
            tiled_dips: tile_dip_positions(observations.dips_position()),
        })
    }

    /// Potential at `points` (`q × 1`). `universal` holds the drift monomials of
    /// the points.
    fn field_chunk(&self, points: MatRef<f64>, universal: MatRef<f64>) -> Mat<f64> {
        let a = self.kernel_params.range;
        let sill = self.kernel_params.sill;
        let obs = self.observations;

        // Gradient observations.
        let r = build_distance_matrices(self.tiled_dips.as_ref(), points);
        let mut sigma = axis_differences(obs.dips_position(), points);
        zip!(&mut sigma, &r).for_each(|unzip!(s, r)| {
            *s *= sill * unit_first_derivative_over_r(*r, a);
        });
        let mut values = sigma.transpose() * &self.weights.gradient;

        // Interface observations.
        if obs.n_pairs() > 0 {
            let k_rest = covariance(
                build_distance_matrices(obs.rest_layer_points(), points).as_ref(),
                a,
                sill,
            );
            let k_ref = covariance(
                build_distance_matrices(obs.ref_layer_points(), points).as_ref(),
                a,
                sill,
            );
            values += (k_rest - k_ref).transpose() * &self.weights.interface;
        }

        // Drift.
        if let Some(mu) = &self.weights.drift {
            values += universal.subcols(0, mu.nrows()) * mu;
        }

        values
    }

    /// Gradient of the potential at `points` (`q × n_dims`).
    fn gradient_chunk(&self, points: MatRef<f64>) -> Mat<f64> {
        let a = self.kernel_params.range;
        let sill = self.kernel_params.sill;
        let obs = self.observations;
        let (n_dips, n_dims) = obs.dips_position().shape();
        let n_pairs = obs.n_pairs();

        let dips = obs.dips_position();
        let rest = obs.rest_layer_points();
        let reference = obs.ref_layer_points();
        let w_g = &self.weights.gradient;
        let w_i = &self.weights.interface;

        let r_dips = build_distance_matrices(dips, points);
        let r_rest = build_distance_matrices(rest, points);
        let r_ref = build_distance_matrices(reference, points);
        let drift_gradients = polynomials::drift_gradients(points, self.degree);

        Mat::from_fn(points.nrows(), n_dims, |q, v| {
            let x = points.row(q);
            let mut value = 0.0;

            for j in 0..n_dips {
                let r = r_dips[(j, q)];
                let d1_over_r = unit_first_derivative_over_r(r, a);
                let radial = match r > 0.0 {
                    true => (unit_second_derivative(r, a) - d1_over_r) / (r * r),
                    false => 0.0,
                };
                let h_v = x[v] - dips[(j, v)];
                for u in 0..n_dims {
                    let h_u = x[u] - dips[(j, u)];
                    let mut hessian = h_u * h_v * radial;
                    if u == v {
                        hessian += d1_over_r;
                    }
                    value -= w_g[(u * n_dips + j, 0)] * sill * hessian;
                }
            }

            for i in 0..n_pairs {
                let rest_term =
                    unit_first_derivative_over_r(r_rest[(i, q)], a) * (x[v] - rest[(i, v)]);
                let ref_term =
                    unit_first_derivative_over_r(r_ref[(i, q)], a) * (x[v] - reference[(i, v)]);
                value += w_i[(i, 0)] * sill * (rest_term - ref_term);
            }

            if let Some(mu) = &self.weights.drift {
                for l in 0..mu.nrows() {
                    value += mu[(l, 0)] * drift_gradients[(q, l * n_dims + v)];
                }
            }

            value
        })
    }
}

/// Runs `kernel` over the grid in chunks and stacks the per-chunk results.
fn evaluate_chunks<F>(
    grid: &GridSet,
    ncols: usize,
    params: &Params,
    progress: Option<&dyn ProgressSink>,
    kernel: F,
) -> Mat<f64>
where
    F: Fn(MatRef<f64>, MatRef<f64>) -> Mat<f64> + Sync,
{
    let n = grid.n_points();
    let chunk_size = params.eval_chunk_size.max(1);
    let starts: Vec<usize> = (0..n).step_by(chunk_size).collect();
    let evaluated = AtomicUsize::new(0);

    let run = |start: &usize| {
        let len = chunk_size.min(n - start);
        let (points, universal) = grid.chunk(*start, len);
        let block = kernel(points, universal);

        if let Some(sink) = progress {
            let done = evaluated.fetch_add(len, Ordering::Relaxed) + len;
            sink.emit(ProgressMsg::EvaluationProgress {
                evaluated: done,
                total: n,
                progress: fraction(done, n),
            });
        }
        (*start, block)
    };

    let blocks: Vec<(usize, Mat<f64>)> = match params.parallel_evaluation {
        true => starts.par_iter().map(run).collect(),
        false => starts.iter().map(run).collect(),
    };

    let mut out = Mat::<f64>::zeros(n, ncols);
    for (start, block) in blocks {
        out.subrows_mut(start, block.nrows()).copy_from(&block);
    }
    out
}

pub(crate) fn evaluate_field_with_progress(
    weights: &DualKrigingWeights,
    observations: &ObservationSet,
    grid: &GridSet,
    kernel_params: &KernelParams,
    universality_degree: UniversalityDegree,
    params: &Params,
    progress: Option<&dyn ProgressSink>,
) -> KrigingResult<Mat<f64>> {
    let context = FieldContext::new(weights, observations, grid, kernel_params, universality_degree)?;
    debug!(num_points = grid.n_points(), "evaluating potential field");
    Ok(evaluate_chunks(grid, 1, params, progress, |points, universal| {
        context.field_chunk(points, universal)
    }))
}

pub(crate) fn evaluate_gradient_with_progress(
    weights: &DualKrigingWeights,
    observations: &ObservationSet,
    grid: &GridSet,
    kernel_params: &KernelParams,
    universality_degree: UniversalityDegree,
    params: &Params,
    progress: Option<&dyn ProgressSink>,
) -> KrigingResult<Mat<f64>> {
    let context = FieldContext::new(weights, observations, grid, kernel_params, universality_degree)?;
    debug!(num_points = grid.n_points(), "evaluating potential field gradient");
    Ok(evaluate_chunks(
        grid,
        observations.n_dims(),
        params,
        progress,
        |points, _| context.gradient_chunk(points),
    ))
}

/// Evaluates the potential field at every point of `grid` (`n_points × 1`).
///
/// ### Errors
/// [`KrigingError::Shape`] if the grid dimensionality differs from the
/// observations or the weights do not match the observations and drift degree.
#[instrument(skip_all, fields(num_points = grid.n_points()))]
pub fn evaluate_field(
    weights: &DualKrigingWeights,
    observations: &ObservationSet,
    grid: &GridSet,
    kernel_params: &KernelParams,
    universality_degree: UniversalityDegree,
    params: &Params,
) -> KrigingResult<Mat<f64>> {
    evaluate_field_with_progress(
        weights,
        observations,
        grid,
        kernel_params,
        universality_degree,
        params,
        None,
    )
}

/// Evaluates the gradient of the potential field at every point of `grid`
/// (`n_points × n_dims`).
///
/// At an orientation `j`, `gradient + nugget * w_G[j]` reproduces the observed
/// gradient vector.
///
/// ### Errors
/// Same as [`evaluate_field`].
#[instrument(skip_all, fields(num_points = grid.n_points()))]
pub fn evaluate_gradient(
    weights: &DualKrigingWeights,
    observations: &ObservationSet,
    grid: &GridSet,
    kernel_params: &KernelParams,
    universality_degree: UniversalityDegree,
    params: &Params,
) -> KrigingResult<Mat<f64>> {
    evaluate_gradient_with_progress(
        weights,
        observations,
        grid,
        kernel_params,
        universality_degree,
        params,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assembler::assemble_system, linalg::solve_system};
    use equator::assert;
    use faer::{mat, utils::approx::*};

    fn kernel(range: f64, nugget: f64) -> KernelParams {
        KernelParams::builder()
            .range(range)
            .nugget_effect(nugget)
            .build()
            .unwrap()
    }

    fn fit(
        obs: &ObservationSet,
        params: &KernelParams,
        degree: UniversalityDegree,
    ) -> DualKrigingWeights {
        let system = assemble_system(obs, params, degree).unwrap();
        let report = solve_system(&system, &Params::default()).unwrap();
        DualKrigingWeights::from_solution(report.solution.as_ref(), &system.layout).unwrap()
    }

    fn two_layers_3d() -> ObservationSet {
        let layers = vec![
            mat![
                [0.0, 0.0, 0.0],
                [4.0, 0.0, 0.2],
                [0.0, 4.0, -0.1],
                [4.0, 4.0, 0.1],
                [2.0, 2.0, 0.05f64]
            ],
            mat![
                [0.0, 0.0, 2.0],
                [4.0, 0.0, 2.1],
                [0.0, 4.0, 1.9],
                [4.0, 4.0, 2.0f64]
            ],
        ];
        ObservationSet::from_layers(
            mat![[2.0, 2.0, 0.5], [1.0, 3.0, 1.5], [3.0, 1.0, 1.0f64]],
            vec![5.0, 8.0, 3.0],
            vec![0.0, 90.0, 180.0],
            vec![1.0, 1.0, 1.0],
            &layers,
        )
        .unwrap()
    }

    fn two_layers_2d() -> ObservationSet {
        let layers = vec![
            mat![[0.0, 0.0], [2.0, 0.1], [4.0, -0.1], [6.0, 0.2f64]],
            mat![[0.0, 2.0], [3.0, 2.2], [6.0, 1.9f64]],
        ];
        ObservationSet::from_layers(
            mat![[1.0, 1.0], [5.0, 1.2f64]],
            vec![90.0, 85.0],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            &layers,
        )
        .unwrap()
    }

    fn interface_misfit(
        obs: &ObservationSet,
        weights: &DualKrigingWeights,
        params: &KernelParams,
        degree: UniversalityDegree,
    ) -> f64 {
        let settings = Params::default();
        let rest = GridSet::new(obs.rest_layer_points().to_owned()).unwrap();
        let reference = GridSet::new(obs.ref_layer_points().to_owned()).unwrap();
        let z_rest = evaluate_field(weights, obs, &rest, params, degree, &settings).unwrap();
        let z_ref = evaluate_field(weights, obs, &reference, params, degree, &settings).unwrap();

        (0..obs.n_pairs()).fold(0.0, |acc, i| acc.max((z_rest[(i, 0)] - z_ref[(i, 0)]).abs()))
    }

    #[test]
    fn interface_pairs_share_potential_3d() {
        let obs = two_layers_3d();
        let params = kernel(12.0, 0.01);
        for degree in [
            UniversalityDegree::Zero,
            UniversalityDegree::One,
            UniversalityDegree::Two,
        ] {
            let weights = fit(&obs, &params, degree);
            assert!(interface_misfit(&obs, &weights, &params, degree) < 1e-8);
        }
    }

    #[test]
    fn interface_pairs_share_potential_2d() {
        let obs = two_layers_2d();
        let params = kernel(15.0, 0.01);
        for degree in [
            UniversalityDegree::Zero,
            UniversalityDegree::One,
            UniversalityDegree::Two,
        ] {
            let weights = fit(&obs, &params, degree);
            assert!(interface_misfit(&obs, &weights, &params, degree) < 1e-8);
        }
    }

    #[test]
    fn gradient_at_dips_reproduces_orientations() {
        let obs = two_layers_3d();
        let params = kernel(12.0, 0.05);
        let degree = UniversalityDegree::One;
        let weights = fit(&obs, &params, degree);

        let dips = GridSet::new(obs.dips_position().to_owned()).unwrap();
        let gradient =
            evaluate_gradient(&weights, &obs, &dips, &params, degree, &Params::default()).unwrap();
        let g = obs.gradient_vector();

        let n_dips = obs.n_dips();
        for j in 0..n_dips {
            for u in 0..3 {
                let row = u * n_dips + j;
                let reproduced = gradient[(j, u)] + params.nugget_effect * weights.gradient[(row, 0)];
                assert!((reproduced - g[(row, 0)]).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn gradient_matches_finite_difference_of_field() {
        let obs = two_layers_3d();
        let params = kernel(12.0, 0.01);
        let degree = UniversalityDegree::Two;
        let weights = fit(&obs, &params, degree);
        let settings = Params::default();

        let x = [1.3, 2.1, 0.9];
        let step = 1e-5;
        let probe = GridSet::new(Mat::from_fn(1, 3, |_, j| x[j])).unwrap();
        let gradient = evaluate_gradient(&weights, &obs, &probe, &params, degree, &settings).unwrap();

        for v in 0..3 {
            let shifted = |delta: f64| {
                GridSet::new(Mat::from_fn(1, 3, |_, j| x[j] + if j == v { delta } else { 0.0 }))
                    .unwrap()
            };
            let plus = evaluate_field(&weights, &obs, &shifted(step), &params, degree, &settings).unwrap();
            let minus = evaluate_field(&weights, &obs, &shifted(-step), &params, degree, &settings).unwrap();
            let numeric = (plus[(0, 0)] - minus[(0, 0)]) / (2.0 * step);
            assert!((gradient[(0, v)] - numeric).abs() < 1e-6);
        }
    }

    #[test]
    fn symmetric_pair_around_vertical_dip() {
        let obs = ObservationSet::new(
            mat![[0.0, 0.0, 0.0f64]],
            vec![0.0],
            vec![0.0],
            vec![1.0],
            mat![[1.0, 0.0, 0.0f64]],
            mat![[-1.0, 0.0, 0.0f64]],
        )
        .unwrap();
        let params = kernel(6.0, 0.01);

        for degree in [UniversalityDegree::Zero, UniversalityDegree::One] {
            let weights = fit(&obs, &params, degree);
            // Only the vertical component carries information.
            assert!(weights.gradient[(0, 0)].abs() < 1e-10);
            assert!(weights.gradient[(1, 0)].abs() < 1e-10);
            assert!(weights.interface[(0, 0)].abs() < 1e-10);

            let line = GridSet::new(Mat::from_fn(7, 3, |i, j| match j {
                0 => i as f64 - 3.0,
                _ => 0.0,
            }))
            .unwrap();
            let z = evaluate_field(&weights, &obs, &line, &params, degree, &Params::default())
                .unwrap();
            for i in 0..7 {
                assert!(z[(i, 0)].abs() < 1e-10);
            }

            let above_below = GridSet::new(mat![[0.0, 0.0, 1.0], [0.0, 0.0, -1.0f64]]).unwrap();
            let z = evaluate_field(&weights, &obs, &above_below, &params, degree, &Params::default())
                .unwrap();
            assert!(z[(0, 0)] > 0.0);
            assert!(z[(1, 0)] < 0.0);
        }
    }

    #[test]
    fn potential_increases_towards_upper_layer() {
        let obs = two_layers_3d();
        let params = kernel(12.0, 0.01);
        let degree = UniversalityDegree::One;
        let weights = fit(&obs, &params, degree);

        let points = GridSet::new(mat![
            [2.0, 2.0, 0.05],
            [2.0, 2.0, 0.7],
            [2.0, 2.0, 1.3],
            [2.0, 2.0, 2.0f64]
        ])
        .unwrap();
        let z = evaluate_field(&weights, &obs, &points, &params, degree, &Params::default()).unwrap();
        for i in 1..4 {
            assert!(z[(i, 0)] > z[(i - 1, 0)]);
        }
    }

    #[test]
    fn chunking_and_parallelism_do_not_change_results() {
        let obs = two_layers_3d();
        let params = kernel(12.0, 0.01);
        let degree = UniversalityDegree::Two;
        let weights = fit(&obs, &params, degree);

        let grid = GridSet::regular()
            .extent(&[-1.0, -1.0, -1.0, 5.0, 5.0, 3.0])
            .resolution(&[7, 5, 6])
            .build()
            .unwrap();

        let serial = Params::builder()
            .parallel_evaluation(false)
            .eval_chunk_size(1000)
            .build();
        let chunked = Params::builder().eval_chunk_size(17).build();

        let a = evaluate_field(&weights, &obs, &grid, &params, degree, &serial).unwrap();
        let b = evaluate_field(&weights, &obs, &grid, &params, degree, &chunked).unwrap();
        let again = evaluate_field(&weights, &obs, &grid, &params, degree, &serial).unwrap();

        assert!(a == again);
        let approx_eq = CwiseMat(ApproxEq::eps() * 1.0e4);
        assert!(&a ~ &b);

        let ga = evaluate_gradient(&weights, &obs, &grid, &params, degree, &serial).unwrap();
        let gb = evaluate_gradient(&weights, &obs, &grid, &params, degree, &chunked).unwrap();
        assert!(ga.shape() == (grid.n_points(), 3));
        assert!(&ga ~ &gb);
    }

    #[test]
    fn queries_on_observations_are_finite() {
        let obs = two_layers_3d();
        let params = kernel(12.0, 0.01);
        let degree = UniversalityDegree::One;
        let weights = fit(&obs, &params, degree);

        let mut coincident = Mat::<f64>::zeros(obs.n_dips() + 1, 3);
        coincident
            .subrows_mut(0, obs.n_dips())
            .copy_from(obs.dips_position());
        coincident
            .row_mut(obs.n_dips())
            .copy_from(obs.ref_layer_points().row(0));
        let grid = GridSet::new(coincident).unwrap();

        let z = evaluate_field(&weights, &obs, &grid, &params, degree, &Params::default()).unwrap();
        let g = evaluate_gradient(&weights, &obs, &grid, &params, degree, &Params::default()).unwrap();
        assert!(z.col(0).iter().all(|v| v.is_finite()));
        assert!(g.col_iter().all(|c| c.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn mismatched_inputs_are_shape_errors() {
        let obs = two_layers_3d();
        let params = kernel(12.0, 0.01);
        let weights = fit(&obs, &params, UniversalityDegree::One);

        let flat = GridSet::new(mat![[0.0, 0.0f64]]).unwrap();
        let err = evaluate_field(
            &weights,
            &obs,
            &flat,
            &params,
            UniversalityDegree::One,
            &Params::default(),
        )
        .unwrap_err();
        assert!(matches!(err, KrigingError::Shape(_)));

        let grid = GridSet::new(mat![[0.0, 0.0, 0.0f64]]).unwrap();
        let err = evaluate_field(
            &weights,
            &obs,
            &grid,
            &params,
            UniversalityDegree::Two,
            &Params::default(),
        )
        .unwrap_err();
        assert!(matches!(err, KrigingError::Shape(_)));
    }
}
