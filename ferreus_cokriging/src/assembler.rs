/////////////////////////////////////////////////////////////////////////////////////////////
//
// Assembles the dual co-kriging system from gradient, interface and drift blocks.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # assembler
//!
//! Builds the symmetric co-kriging matrix
//!
//! ```text
//! | -C_G    C_GI^T  U_G |   | w_G |   | G |
//! |  C_GI   C_I     U_I | . | w_I | = | 0 |
//! |  U_G^T  U_I^T   0   |   | mu  |   | 0 |
//! ```
//!
//! where `C_G` holds the covariances between gradient components at the dips with
//! the sign convention of the assembled block (its diagonal is
//! `-(gradient variance + nugget)`), `C_GI` the cross-covariances between gradient
//! components and interface increments, `C_I` the covariances between interface
//! increments, and `U_G`/`U_I` the drift monomials seen through each observation.
//!
//! Rows and columns of the gradient block follow the tiled dip layout: index
//! `u * n_dips + j` is the partial derivative along axis `u` at dip `j`.

use crate::{
    error::{KrigingError, KrigingResult},
    interpolant_config::UniversalityDegree,
    observations::ObservationSet,
    polynomials,
};
use faer::{Mat, MatRef, unzip, zip};
use ferreus_cokriging_utils::{
    KernelParams, axis_differences, build_distance_matrices, dip_axis_differences,
    kernels::{self, covariance, unit_first_derivative_over_r},
    same_axis_mask, tile_dip_positions,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Sizes and offsets of the blocks of an assembled system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemLayout {
    pub n_dims: usize,
    pub n_dips: usize,
    pub n_pairs: usize,
    /// `n_dims * n_dips`
    pub length_of_cg: usize,
    /// `n_pairs`
    pub length_of_cgi: usize,
    /// Number of drift monomials.
    pub length_of_u_i: usize,
    /// Total system size.
    pub length_of_c: usize,
}

impl SystemLayout {
    pub fn new(n_dims: usize, n_dips: usize, n_pairs: usize, degree: UniversalityDegree) -> Self {
        let length_of_cg = n_dims * n_dips;
        let length_of_cgi = n_pairs;
        let length_of_u_i = degree.drift_size(n_dims);
        Self {
            n_dims,
            n_dips,
            n_pairs,
            length_of_cg,
            length_of_cgi,
            length_of_u_i,
            length_of_c: length_of_cg + length_of_cgi + length_of_u_i,
        }
    }

    /// Row where the interface block starts.
    #[inline]
    pub fn interface_offset(&self) -> usize {
        self.length_of_cg
    }

    /// Row where the drift block starts.
    #[inline]
    pub fn drift_offset(&self) -> usize {
        self.length_of_cg + self.length_of_cgi
    }
}

/// Covariance matrix and right hand side of a dual co-kriging system.
#[derive(Debug, Clone)]
pub struct KrigingSystem {
    pub matrix: Mat<f64>,
    pub rhs: Mat<f64>,
    pub layout: SystemLayout,
}

/// Dual kriging weights, split by observation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualKrigingWeights {
    /// One weight per gradient component, tiled (`n_dims * n_dips` × 1).
    pub gradient: Mat<f64>,

    /// One weight per interface pair (`n_pairs` × 1).
    pub interface: Mat<f64>,

    /// Drift coefficients, `None` when the system carries no drift.
    pub drift: Option<Mat<f64>>,
}

impl DualKrigingWeights {
    /// Splits a solution vector of the system described by `layout`.
    ///
    /// ### Errors
    /// [`KrigingError::Shape`] if the solution length does not match the layout.
    pub fn from_solution(solution: MatRef<f64>, layout: &SystemLayout) -> KrigingResult<Self> {
        if solution.nrows() != layout.length_of_c || solution.ncols() != 1 {
            return Err(KrigingError::Shape(format!(
                "solution of shape {:?} does not match a system of size {}",
                solution.shape(),
                layout.length_of_c
            )));
        }

        let gradient = solution.subrows(0, layout.length_of_cg).to_owned();
        let interface = solution
            .subrows(layout.interface_offset(), layout.length_of_cgi)
            .to_owned();
        let drift = match layout.length_of_u_i {
            0 => None,
            n => Some(solution.subrows(layout.drift_offset(), n).to_owned()),
        };

        Ok(Self {
            gradient,
            interface,
            drift,
        })
    }

    /// Number of drift coefficients.
    pub fn drift_size(&self) -> usize {
        self.drift.as_ref().map_or(0, |d| d.nrows())
    }
}

/// Gradient covariance block `C_G` (`n_dims * n_dips` square).
///
/// Entry `[(u, i), (v, j)]` is `-h_u h_v / r^2 (K'' - K'/r) + δ_uv K'/r`, with
/// `h_u = dip_i[u] - dip_j[u]`, `h_v` taken from the transposed layout and
/// `r = |dip_i - dip_j|`. When `r = 0` only the `δ_uv K'/r` term is kept. The
/// diagonal is `-(14 sill / a^2 + nugget)`.
pub fn gradient_block(dips: MatRef<f64>, kernel_params: &KernelParams) -> Mat<f64> {
    let (n_dips, n_dims) = dips.shape();
    let a = kernel_params.range;
    let sill = kernel_params.sill;

    let tiled = tile_dip_positions(dips);
    let r = build_distance_matrices(tiled.as_ref(), tiled.as_ref());
    let h_u = dip_axis_differences(dips);
    let h_v = h_u.transpose();
    let perpendicularity = same_axis_mask(n_dips, n_dims);

    let d1 = kernels::covariance_d1(r.as_ref(), a);
    let d2 = kernels::covariance_d2(r.as_ref(), a);

    let mut c_g = Mat::from_fn(n_dims * n_dips, n_dims * n_dips, |row, col| {
        let r = r[(row, col)];
        let anisotropic = match r > 0.0 {
            true => {
                let hu_hv = h_u[(row, col)] * h_v[(row, col)];
                -hu_hv / (r * r) * (d2[(row, col)] - d1[(row, col)] / r)
            }
            false => 0.0,
        };
        sill * (anisotropic + perpendicularity[(row, col)] * unit_first_derivative_over_r(r, a))
    });

    let diagonal = -(kernel_params.gradient_variance() + kernel_params.nugget_effect);
    for k in 0..c_g.nrows() {
        c_g[(k, k)] = diagonal;
    }

    c_g
}

/// Gradient/interface cross-covariance block `C_GI` (`n_pairs` × `n_dims * n_dips`).
///
/// Entry `[i, (u, j)]` is `K'/r(|dip_j - rest_i|) (dip_j[u] - rest_i[u])` minus the
/// same term against `ref_i`.
pub fn gradient_interface_block(
    dips: MatRef<f64>,
    rest: MatRef<f64>,
    reference: MatRef<f64>,
    kernel_params: &KernelParams,
) -> Mat<f64> {
    let a = kernel_params.range;
    let sill = kernel_params.sill;
    let tiled = tile_dip_positions(dips);

    let r_rest = build_distance_matrices(tiled.as_ref(), rest);
    let r_ref = build_distance_matrices(tiled.as_ref(), reference);
    let h_rest = axis_differences(dips, rest);
    let h_ref = axis_differences(dips, reference);

    let mut c_gi_t = Mat::<f64>::zeros(tiled.nrows(), rest.nrows());
    zip!(&mut c_gi_t, &r_rest, &h_rest).for_each(|unzip!(c, r, h)| {
        *c = sill * unit_first_derivative_over_r(*r, a) * *h;
    });
    zip!(&mut c_gi_t, &r_ref, &h_ref).for_each(|unzip!(c, r, h)| {
        *c -= sill * unit_first_derivative_over_r(*r, a) * *h;
    });

    c_gi_t.transpose().to_owned()
}

/// Interface covariance block `C_I` (`n_pairs` square).
///
/// `C_I = K(rest, rest) - K(ref, rest) - K(rest, ref) + K(ref, ref)`.
pub fn interface_block(
    rest: MatRef<f64>,
    reference: MatRef<f64>,
    kernel_params: &KernelParams,
) -> Mat<f64> {
    let a = kernel_params.range;
    let sill = kernel_params.sill;

    let c_rest_rest = covariance(build_distance_matrices(rest, rest).as_ref(), a, sill);
    let c_ref_rest = covariance(build_distance_matrices(reference, rest).as_ref(), a, sill);
    let c_rest_ref = covariance(build_distance_matrices(rest, reference).as_ref(), a, sill);
    let c_ref_ref = covariance(build_distance_matrices(reference, reference).as_ref(), a, sill);

    c_rest_rest - c_ref_rest - c_rest_ref + c_ref_ref
}

/// Assembles the full co-kriging system for `observations`.
///
/// The right hand side is the observed gradient vector followed by zeros for the
/// interface and drift rows.
///
/// ### Errors
/// [`KrigingError::Shape`] if the kernel range is not positive.
///
/// ### Example
/// ```
/// use faer::mat;
/// use ferreus_cokriging::{KernelParams, ObservationSet, assemble_system};
/// use ferreus_cokriging::interpolant_config::UniversalityDegree;
///
/// let obs = ObservationSet::new(
///     mat![[0.0, 0.0, 0.0f64]],
///     vec![0.0],
///     vec![0.0],
///     vec![1.0],
///     mat![[1.0, 0.0, 0.0f64]],
///     mat![[-1.0, 0.0, 0.0f64]],
/// )?;
/// let params = KernelParams::builder().range(6.0).build()?;
/// let system = assemble_system(&obs, &params, UniversalityDegree::One)?;
///
/// assert_eq!(system.layout.length_of_c, 3 + 1 + 3);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[instrument(skip_all, fields(n_dips = observations.n_dips(), n_pairs = observations.n_pairs()))]
pub fn assemble_system(
    observations: &ObservationSet,
    kernel_params: &KernelParams,
    universality_degree: UniversalityDegree,
) -> KrigingResult<KrigingSystem> {
    if !(kernel_params.range > 0.0) || !kernel_params.range.is_finite() {
        return Err(KrigingError::Shape(format!(
            "kernel range must be positive, got {}",
            kernel_params.range
        )));
    }

    let layout = SystemLayout::new(
        observations.n_dims(),
        observations.n_dips(),
        observations.n_pairs(),
        universality_degree,
    );

    let dips = observations.dips_position();
    let rest = observations.rest_layer_points();
    let reference = observations.ref_layer_points();

    let c_g = gradient_block(dips, kernel_params);
    let c_gi = gradient_interface_block(dips, rest, reference, kernel_params);
    let c_i = interface_block(rest, reference, kernel_params);
    let u_g = polynomials::gradient_drift_block(dips, universality_degree);
    let u_i = polynomials::interface_drift_block(rest, reference, universality_degree);

    let n_g = layout.length_of_cg;
    let n_i = layout.length_of_cgi;
    let n_u = layout.length_of_u_i;
    let (off_i, off_u) = (layout.interface_offset(), layout.drift_offset());

    let mut matrix = Mat::<f64>::zeros(layout.length_of_c, layout.length_of_c);
    matrix.submatrix_mut(0, 0, n_g, n_g).copy_from(-&c_g);
    matrix.submatrix_mut(0, off_i, n_g, n_i).copy_from(c_gi.transpose());
    matrix.submatrix_mut(off_i, 0, n_i, n_g).copy_from(&c_gi);
    matrix.submatrix_mut(off_i, off_i, n_i, n_i).copy_from(&c_i);
    if n_u > 0 {
        matrix.submatrix_mut(0, off_u, n_g, n_u).copy_from(&u_g);
        matrix.submatrix_mut(off_u, 0, n_u, n_g).copy_from(u_g.transpose());
        matrix.submatrix_mut(off_i, off_u, n_i, n_u).copy_from(&u_i);
        matrix.submatrix_mut(off_u, off_i, n_u, n_i).copy_from(u_i.transpose());
    }

    let mut rhs = Mat::<f64>::zeros(layout.length_of_c, 1);
    rhs.subrows_mut(0, n_g).copy_from(&observations.gradient_vector());

    debug!(
        size = layout.length_of_c,
        gradients = n_g,
        interfaces = n_i,
        drift = n_u,
        "assembled co-kriging system"
    );

    Ok(KrigingSystem {
        matrix,
        rhs,
        layout,
    })
}
