/////////////////////////////////////////////////////////////////////////////////////////////
//
// Evaluates the drift monomials and their derivatives used by universal co-kriging.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::interpolant_config::UniversalityDegree;
use faer::{Mat, MatRef, RowRef, unzip, zip};

/// A single drift monomial in the fixed order used throughout the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Monomial {
    /// `x_u`
    Linear(usize),
    /// `x_u^2`
    Square(usize),
    /// `x_u * x_v` with `u < v`
    Cross(usize, usize),
}

impl Monomial {
    #[inline(always)]
    pub(crate) fn value(&self, point: RowRef<f64>) -> f64 {
        match *self {
            Monomial::Linear(u) => point[u],
            Monomial::Square(u) => point[u] * point[u],
            Monomial::Cross(u, v) => point[u] * point[v],
        }
    }

    /// Partial derivative along `axis` at `point`.
    #[inline(always)]
    pub(crate) fn derivative(&self, point: RowRef<f64>, axis: usize) -> f64 {
        match *self {
            Monomial::Linear(u) => match u == axis {
                true => 1.0,
                false => 0.0,
            },
            Monomial::Square(u) => match u == axis {
                true => 2.0 * point[u],
                false => 0.0,
            },
            Monomial::Cross(u, v) => {
                let mut d = 0.0;
                if u == axis {
                    d += point[v];
                }
                if v == axis {
                    d += point[u];
                }
                d
            }
        }
    }
}

/// Drift monomials of `degree` in `dimensions`: linear terms first, then squares,
/// then cross products. Lower degrees are prefixes of higher ones.
pub(crate) fn drift_basis(dimensions: usize, degree: UniversalityDegree) -> Vec<Monomial> {
    let mut basis = Vec::with_capacity(degree.drift_size(dimensions));
    if degree == UniversalityDegree::Zero {
        return basis;
    }

    basis.extend((0..dimensions).map(Monomial::Linear));

    if degree == UniversalityDegree::Two {
        basis.extend((0..dimensions).map(Monomial::Square));
        for u in 0..dimensions {
            for v in (u + 1)..dimensions {
                basis.push(Monomial::Cross(u, v));
            }
        }
    }

    basis
}

/// Evaluates every degree-2 drift monomial at every point.
///
/// Columns are `x, y, z, x², y², z², xy, xz, yz` in 3D and `x, y, x², y², xy` in 2D.
pub fn universal_matrix(points: MatRef<f64>) -> Mat<f64> {
    let (n, d) = points.shape();
    let mut monomials = Mat::<f64>::zeros(n, UniversalityDegree::Two.drift_size(d));

    // linear columns
    monomials.subcols_mut(0, d).copy_from(&points);

    // square columns
    for u in 0..d {
        let xu = points.col(u);
        let mut dst = monomials.col_mut(d + u);
        zip!(&mut dst, &xu).for_each(|unzip!(dst, xu)| {
            *dst = xu * xu;
        });
    }

    // cross columns
    let mut k = 2 * d;
    for u in 0..d {
        let xu = points.col(u);
        for v in (u + 1)..d {
            let xv = points.col(v);
            let mut dst = monomials.col_mut(k);
            zip!(&mut dst, &xu, &xv).for_each(|unzip!(dst, xu, xv)| {
                *dst = xu * xv;
            });
            k += 1;
        }
    }

    monomials
}

/// Drift block of the gradient observations, `U_G`.
///
/// Row `(u, j)` of the tiled dip layout holds the partial derivatives along axis
/// `u` of every drift monomial at dip `j`.
pub(crate) fn gradient_drift_block(dips: MatRef<f64>, degree: UniversalityDegree) -> Mat<f64> {
    let (n_dips, n_dims) = dips.shape();
    let basis = drift_basis(n_dims, degree);

    Mat::from_fn(n_dims * n_dips, basis.len(), |row, col| {
        let (axis, j) = (row / n_dips, row % n_dips);
        basis[col].derivative(dips.row(j), axis)
    })
}

/// Drift block of the interface observations, `U_I`: every drift monomial at the
/// rest point minus the same monomial at the reference point.
pub(crate) fn interface_drift_block(
    rest: MatRef<f64>,
    reference: MatRef<f64>,
    degree: UniversalityDegree,
) -> Mat<f64> {
    let basis = drift_basis(rest.ncols(), degree);

    Mat::from_fn(rest.nrows(), basis.len(), |i, col| {
        basis[col].value(rest.row(i)) - basis[col].value(reference.row(i))
    })
}

/// Gradients of every drift monomial at `points`, laid out axis-major per monomial:
/// entry `[i, l * n_dims + u]` is `d f_l / d x_u` at point `i`.
pub(crate) fn drift_gradients(points: MatRef<f64>, degree: UniversalityDegree) -> Mat<f64> {
    let n_dims = points.ncols();
    let basis = drift_basis(n_dims, degree);

    Mat::from_fn(points.nrows(), basis.len() * n_dims, |i, col| {
        let (l, axis) = (col / n_dims, col % n_dims);
        basis[l].derivative(points.row(i), axis)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use faer::{mat, utils::approx::*};

    #[test]
    fn universal_matrix_3d() {
        let points = mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        // Basis: [x, y, z, x^2, y^2, z^2, x*y, x*z, y*z]
        let expected = mat![
            [1.0, 2.0, 3.0,  1.0,  4.0,  9.0,  2.0,  3.0,  6.0],
            [4.0, 5.0, 6.0, 16.0, 25.0, 36.0, 20.0, 24.0, 30.0],
        ];

        let approx_eq = CwiseMat(ApproxEq::eps() * 8.0);
        assert!(&universal_matrix(points.as_ref()) ~ &expected);
    }

    #[test]
    fn universal_matrix_2d() {
        let points = mat![[1.0, 2.0], [3.0, 4.0]];
        // Basis: [x, y, x^2, y^2, x*y]
        let expected = mat![[1.0, 2.0, 1.0, 4.0, 2.0], [3.0, 4.0, 9.0, 16.0, 12.0]];

        let approx_eq = CwiseMat(ApproxEq::eps() * 8.0);
        assert!(&universal_matrix(points.as_ref()) ~ &expected);
    }

    #[test]
    fn basis_values_match_universal_matrix_columns() {
        let points = mat![[0.5, -1.5, 2.0], [3.0, 0.25, -4.0]];
        let universal = universal_matrix(points.as_ref());
        let basis = drift_basis(3, UniversalityDegree::Two);

        for i in 0..points.nrows() {
            for (l, m) in basis.iter().enumerate() {
                assert!(m.value(points.row(i)) == universal[(i, l)]);
            }
        }
    }

    #[test]
    fn degree_one_basis_is_prefix_of_degree_two() {
        let one = drift_basis(3, UniversalityDegree::One);
        let two = drift_basis(3, UniversalityDegree::Two);
        assert!(one.len() == 3);
        assert!(two.len() == 9);
        assert!(one[..] == two[..3]);
        assert!(drift_basis(2, UniversalityDegree::Zero).is_empty());
    }

    #[test]
    fn gradient_drift_block_degree_one_is_axis_indicator() {
        let dips = mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let u_g = gradient_drift_block(dips.as_ref(), UniversalityDegree::One);
        let expected = mat![
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
        ];
        assert!(u_g == expected);
    }

    #[test]
    fn gradient_drift_block_degree_two() {
        let dips = mat![[1.0, 2.0, 3.0]];
        let u_g = gradient_drift_block(dips.as_ref(), UniversalityDegree::Two);
        // Columns: x, y, z, x^2, y^2, z^2, xy, xz, yz
        let expected = mat![
            [1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 2.0, 3.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 4.0, 0.0, 1.0, 0.0, 3.0],
            [0.0, 0.0, 1.0, 0.0, 0.0, 6.0, 0.0, 1.0, 2.0],
        ];
        assert!(u_g == expected);
    }

    #[test]
    fn interface_drift_block_is_difference_of_monomials() {
        let rest = mat![[1.0, 2.0], [0.0, 1.0]];
        let reference = mat![[0.0, 0.0], [0.0, 0.0]];
        let u_i = interface_drift_block(rest.as_ref(), reference.as_ref(), UniversalityDegree::Two);
        let expected = mat![[1.0, 2.0, 1.0, 4.0, 2.0], [0.0, 1.0, 0.0, 1.0, 0.0]];
        assert!(u_i == expected);
    }

    #[test]
    fn drift_gradients_match_gradient_block() {
        let dips = mat![[1.0, 2.0, 3.0], [-1.0, 0.5, 2.0]];
        let u_g = gradient_drift_block(dips.as_ref(), UniversalityDegree::Two);
        let grads = drift_gradients(dips.as_ref(), UniversalityDegree::Two);
        let n_dips = 2;

        for j in 0..n_dips {
            for axis in 0..3 {
                for l in 0..9 {
                    assert!(grads[(j, l * 3 + axis)] == u_g[(axis * n_dips + j, l)]);
                }
            }
        }
    }
}
