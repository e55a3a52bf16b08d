/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the compactly supported cubic covariance and its closed-form radial derivatives.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    KernelFromParams, KernelParams,
    constants::{CUBIC_CONSTANTS, CubicConstants},
};
use faer::{Mat, MatRef, RowRef, unzip, zip};

/// Unit-sill cubic covariance `C(r)`, zero for `r >= a`.
#[inline(always)]
pub fn unit_covariance(r: f64, a: f64) -> f64 {
    if r >= a {
        return 0.0;
    }
    let c: &CubicConstants = &CUBIC_CONSTANTS;
    let h = r / a;
    let h2 = h * h;
    let h3 = h2 * h;
    let h5 = h3 * h2;
    let h7 = h5 * h2;
    1.0 - c.h2 * h2 + c.h3 * h3 - c.h5 * h5 + c.h7 * h7
}

/// Unit-sill first radial derivative `C'(r)`.
#[inline(always)]
pub fn unit_first_derivative(r: f64, a: f64) -> f64 {
    r * unit_first_derivative_over_r(r, a)
}

/// Unit-sill `C'(r) / r`, evaluated in factored form so it stays finite at `r = 0`
/// where it equals `-14 / a^2`.
#[inline(always)]
pub fn unit_first_derivative_over_r(r: f64, a: f64) -> f64 {
    if r >= a {
        return 0.0;
    }
    let a2 = a * a;
    let a7 = a2 * a2 * a2 * a;
    let gap = a - r;
    -7.0 * gap * gap * gap * (8.0 * a2 + 9.0 * a * r + 3.0 * r * r) / (4.0 * a7)
}

/// Unit-sill second radial derivative `C''(r)`.
#[inline(always)]
pub fn unit_second_derivative(r: f64, a: f64) -> f64 {
    if r >= a {
        return 0.0;
    }
    let a2 = a * a;
    let a4 = a2 * a2;
    let a5 = a4 * a;
    let a7 = a5 * a2;
    let r3 = r * r * r;
    let r5 = r3 * r * r;
    -7.0 * (4.0 * a5 - 15.0 * a4 * r + 20.0 * a2 * r3 - 9.0 * r5) / (2.0 * a7)
}

/// Cubic covariance `K(r) = sill * C(r)` with range `a`.
///
/// All radial derivatives are scaled by the sill, so `K'`, `K''` and `K' / r`
/// are the derivatives of the same function `K`.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct CubicCovariance {
    range: f64,
    sill: f64,
}

impl CubicCovariance {
    pub fn new(range: f64, sill: f64) -> Self {
        Self { range, sill }
    }

    #[inline(always)]
    pub fn range(&self) -> f64 {
        self.range
    }

    #[inline(always)]
    pub fn sill(&self) -> f64 {
        self.sill
    }

    #[inline(always)]
    pub fn covariance(&self, r: f64) -> f64 {
        self.sill * unit_covariance(r, self.range)
    }

    #[inline(always)]
    pub fn first_derivative(&self, r: f64) -> f64 {
        self.sill * unit_first_derivative(r, self.range)
    }

    #[inline(always)]
    pub fn first_derivative_over_r(&self, r: f64) -> f64 {
        self.sill * unit_first_derivative_over_r(r, self.range)
    }

    #[inline(always)]
    pub fn second_derivative(&self, r: f64) -> f64 {
        self.sill * unit_second_derivative(r, self.range)
    }

    /// Covariance between two points.
    #[inline(always)]
    pub fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r = crate::get_distance(target, source);
        self.covariance(r)
    }
}

impl KernelFromParams for CubicCovariance {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        CubicCovariance::new(p.range, p.sill)
    }
}

fn map_distances<F>(d: MatRef<f64>, f: F) -> Mat<f64>
where
    F: Fn(f64) -> f64,
{
    let mut out = Mat::<f64>::zeros(d.nrows(), d.ncols());
    zip!(&mut out, &d).for_each(|unzip!(out, d)| {
        *out = f(*d);
    });
    out
}

/// Elementwise cubic covariance over a distance matrix, scaled by `sill`.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use ferreus_cokriging_utils::kernels::covariance;
///
/// let d = mat![[0.0, 6.0], [7.5, 0.0f64]];
/// let c = covariance(d.as_ref(), 6.0, 2.0);
///
/// assert_eq!(c, mat![[2.0, 0.0], [0.0, 2.0f64]]);
/// ```
pub fn covariance(d: MatRef<f64>, a: f64, sill: f64) -> Mat<f64> {
    map_distances(d, |r| sill * unit_covariance(r, a))
}

/// Elementwise unit-sill first radial derivative over a distance matrix.
pub fn covariance_d1(d: MatRef<f64>, a: f64) -> Mat<f64> {
    map_distances(d, |r| unit_first_derivative(r, a))
}

/// Elementwise unit-sill second radial derivative over a distance matrix.
pub fn covariance_d2(d: MatRef<f64>, a: f64) -> Mat<f64> {
    map_distances(d, |r| unit_second_derivative(r, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use faer::{mat, utils::approx::*};

    const A: f64 = 6.0;

    fn central_difference<F: Fn(f64) -> f64>(f: F, r: f64) -> f64 {
        let step = 1e-6;
        (f(r + step) - f(r - step)) / (2.0 * step)
    }

    #[test]
    fn covariance_boundary_values() {
        assert!(unit_covariance(A, A) == 0.0);
        assert!(unit_covariance(A * 1.5, A) == 0.0);
        assert!(CubicCovariance::new(A, 0.7).covariance(0.0) == 0.7);

        // Continuous when approaching the range from below.
        let below = unit_covariance(A * (1.0 - 1e-6), A);
        assert!(below.abs() < 1e-12);
    }

    #[test]
    fn derivatives_vanish_at_and_beyond_range() {
        for r in [A, A + 1.0, 100.0] {
            assert!(unit_first_derivative(r, A) == 0.0);
            assert!(unit_first_derivative_over_r(r, A) == 0.0);
            assert!(unit_second_derivative(r, A) == 0.0);
        }
        assert!(unit_second_derivative(A * (1.0 - 1e-9), A).abs() < 1e-12);
    }

    #[test]
    fn first_derivative_matches_finite_difference() {
        for r in [0.3, 1.0, 2.5, 4.0, 5.7] {
            let numeric = central_difference(|x| unit_covariance(x, A), r);
            assert!((unit_first_derivative(r, A) - numeric).abs() < 1e-7);
        }
    }

    #[test]
    fn second_derivative_matches_finite_difference() {
        for r in [0.3, 1.0, 2.5, 4.0, 5.7] {
            let numeric = central_difference(|x| unit_first_derivative(x, A), r);
            assert!((unit_second_derivative(r, A) - numeric).abs() < 1e-7);
        }
    }

    #[test]
    fn derivative_over_r_limit_at_origin() {
        let limit = -CUBIC_CONSTANTS.gradient_variance_factor / (A * A);
        assert!((unit_first_derivative_over_r(0.0, A) - limit).abs() < 1e-15);
        assert!((unit_second_derivative(0.0, A) - limit).abs() < 1e-15);
        assert!(unit_first_derivative(0.0, A) == 0.0);
    }

    #[test]
    fn matrix_forms_match_scalar_forms() {
        let d = mat![[0.0, 1.0, 2.0], [3.0, 6.0, 9.0f64]];
        let sill = 1.5;

        let c = covariance(d.as_ref(), A, sill);
        let d1 = covariance_d1(d.as_ref(), A);
        let d2 = covariance_d2(d.as_ref(), A);

        let expected_c = Mat::from_fn(2, 3, |i, j| sill * unit_covariance(d[(i, j)], A));
        let expected_d1 = Mat::from_fn(2, 3, |i, j| unit_first_derivative(d[(i, j)], A));
        let expected_d2 = Mat::from_fn(2, 3, |i, j| unit_second_derivative(d[(i, j)], A));

        let approx_eq = CwiseMat(ApproxEq::eps() * 16.0);
        assert!(&c ~ &expected_c);
        assert!(&d1 ~ &expected_d1);
        assert!(&d2 ~ &expected_d2);
    }

    #[test]
    fn kernel_from_params_uses_range_and_sill() {
        let params = KernelParams::builder().range(4.0).sill(2.0).build().unwrap();
        let kernel = CubicCovariance::from_params(&params);
        assert!(kernel.range() == 4.0);
        assert!(kernel.sill() == 2.0);
        assert!((kernel.first_derivative(1.0) - 2.0 * unit_first_derivative(1.0, 4.0)).abs() < 1e-15);
    }
}
