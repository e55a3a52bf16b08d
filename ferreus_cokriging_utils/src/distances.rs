/////////////////////////////////////////////////////////////////////////////////////////////
//
// Computes pairwise distance matrices and signed per-axis coordinate differences.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Geometry shared by the co-kriging matrix assembler and field evaluator.
//!
//! Orientation (dip) observations contribute one unknown per spatial axis. Matrices
//! that involve dips are therefore laid out over the *tiled* dip block: row
//! `u * n_dips + i` holds dip `i` seen as the partial derivative along axis `u`.

use crate::traits::Coordinate;
use faer::{Mat, MatRef, RowRef};

#[inline(always)]
fn dot(a: RowRef<f64>, b: RowRef<f64>) -> f64 {
    a.iter().zip(b.iter()).fold(0.0, |acc, (x, y)| acc + x * y)
}

fn to_f64_mat<T: Coordinate>(points: MatRef<T>) -> Mat<f64> {
    Mat::from_fn(points.nrows(), points.ncols(), |i, j| {
        (*points.get(i, j)).to_f64()
    })
}

/// Pairwise Euclidean distances between the rows of `points_a` and `points_b`.
///
/// Uses the expansion `|p|^2 + |q|^2 - 2 p.q`, accumulated in `f64` whatever the
/// input scalar, clipped at zero before the square root and cast back to `T`.
/// When both inputs are the same point set the result is exactly symmetric with
/// an exactly zero diagonal.
///
/// # Panics
///
/// If `points_a` and `points_b` have a different number of columns. Callers in
/// `ferreus_cokriging` validate dimensionality first and report a mismatch as a
/// shape error.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use ferreus_cokriging_utils::build_distance_matrices;
///
/// let p = mat![[0.0, 0.0, 0.0], [3.0, 4.0, 0.0f64]];
/// let d = build_distance_matrices(p.as_ref(), p.as_ref());
///
/// assert_eq!(d, mat![[0.0, 5.0], [5.0, 0.0f64]]);
/// ```
pub fn build_distance_matrices<T: Coordinate>(points_a: MatRef<T>, points_b: MatRef<T>) -> Mat<T> {
    assert_eq!(
        points_a.ncols(),
        points_b.ncols(),
        "point sets must share the same dimensionality"
    );

    let a = to_f64_mat(points_a);
    let b = to_f64_mat(points_b);

    let sq_a: Vec<f64> = a.row_iter().map(|row| dot(row, row)).collect();
    let sq_b: Vec<f64> = b.row_iter().map(|row| dot(row, row)).collect();

    Mat::from_fn(a.nrows(), b.nrows(), |i, j| {
        let squared = sq_a[i] + sq_b[j] - 2.0 * dot(a.row(i), b.row(j));
        T::from_f64(squared.max(0.0).sqrt())
    })
}

/// Stacks the dip coordinates `n_dims` times, one block per spatial axis.
pub fn tile_dip_positions(dips: MatRef<f64>) -> Mat<f64> {
    let (n_dips, n_dims) = dips.shape();
    Mat::from_fn(n_dims * n_dips, n_dims, |row, col| *dips.get(row % n_dips, col))
}

/// Signed per-axis differences between the tiled dips and another point set.
///
/// Entry `[(u, i), j]` is `dip_i[u] - point_j[u]`.
pub fn axis_differences(dips: MatRef<f64>, points: MatRef<f64>) -> Mat<f64> {
    let (n_dips, n_dims) = dips.shape();
    Mat::from_fn(n_dims * n_dips, points.nrows(), |row, j| {
        let (axis, i) = (row / n_dips, row % n_dips);
        dips.get(i, axis) - points.get(j, axis)
    })
}

/// Signed per-axis differences of the tiled dips against themselves.
///
/// Entry `[(u, i), (v, j)]` is `dip_i[u] - dip_j[u]`, the axis being taken from
/// the row block. The column-block counterpart is its transpose.
pub fn dip_axis_differences(dips: MatRef<f64>) -> Mat<f64> {
    let (n_dips, n_dims) = dips.shape();
    let size = n_dims * n_dips;
    Mat::from_fn(size, size, |row, col| {
        let (axis, i) = (row / n_dips, row % n_dips);
        let j = col % n_dips;
        dips.get(i, axis) - dips.get(j, axis)
    })
}

/// 0/1 mask over the tiled dip block that is 1 where row and column belong to
/// the same axis.
pub fn same_axis_mask(n_dips: usize, n_dims: usize) -> Mat<f64> {
    let size = n_dims * n_dips;
    Mat::from_fn(size, size, |row, col| match row / n_dips == col / n_dips {
        true => 1.0,
        false => 0.0,
    })
}
