/////////////////////////////////////////////////////////////////////////////////////////////
//
// Supplies small matrix helpers for row selection, extents and point distances.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::{Mat, MatRef, RowRef};

/// Returns an owned `Mat<T>` built from a subset of row indices, in the given order.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use ferreus_cokriging_utils::select_mat_rows;
///
/// let matrix = mat![
///     [0.0, 1.0],
///     [1.0, 1.0],
///     [2.0, 2.0f64],
/// ];
///
/// let sub_matrix = select_mat_rows(matrix.as_ref(), &[2, 0]);
///
/// assert_eq!(sub_matrix, mat![[2.0, 2.0], [0.0, 1.0f64]]);
/// ```
pub fn select_mat_rows<T>(existing_mat: MatRef<T>, row_indices: &[usize]) -> Mat<T>
where
    T: Clone,
{
    Mat::from_fn(row_indices.len(), existing_mat.ncols(), |i, j| {
        existing_mat.get(row_indices[i], j).clone()
    })
}

/// Axis aligned bounding box of a point set as `[min_0, .., min_d, max_0, .., max_d]`.
///
/// Returns `None` for an empty point set.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use ferreus_cokriging_utils::get_pointarray_extents;
///
/// let points = mat![
///     [1.0, 2.0],
///     [3.0, -1.0],
///     [0.5, 4.0f64]
/// ];
/// let extents = get_pointarray_extents(points.as_ref());
/// assert_eq!(extents, Some(vec![0.5, -1.0, 3.0, 4.0]));
/// ```
pub fn get_pointarray_extents(points: MatRef<f64>) -> Option<Vec<f64>> {
    let (nrows, ncols) = points.shape();
    if nrows == 0 {
        return None;
    }

    let mut extents = vec![f64::INFINITY; ncols];
    extents.extend(std::iter::repeat(f64::NEG_INFINITY).take(ncols));

    for row in points.row_iter() {
        for (col, value) in row.iter().enumerate() {
            extents[col] = extents[col].min(*value);
            extents[col + ncols] = extents[col + ncols].max(*value);
        }
    }

    Some(extents)
}

/// Euclidean distance between two points.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use ferreus_cokriging_utils::get_distance;
///
/// let points = mat![
///     [1.0, 2.0],
///     [4.0, 6.0],
/// ];
///
/// assert_eq!(get_distance(points.row(0), points.row(1)), 5.0);
/// ```
#[inline(always)]
pub fn get_distance(target: RowRef<f64>, source: RowRef<f64>) -> f64 {
    let mut dist = 0.0;
    for (t, s) in target.iter().zip(source.iter()) {
        let diff = t - s;
        dist += diff * diff;
    }
    dist.sqrt()
}
