/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides query point sets with their precomputed drift monomials, including regular grids.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    common,
    error::{KrigingError, KrigingResult},
    polynomials,
};
use faer::{Mat, MatRef};
use tracing::debug;

/// Query points at which a potential field is evaluated.
///
/// Holds the points together with their *universal matrix*: every degree-2 drift
/// monomial evaluated at every point (`x, y, z, x², y², z², xy, xz, yz` in 3D and
/// `x, y, x², y², xy` in 2D). Lower drift degrees use its leading columns.
#[derive(Debug, Clone)]
pub struct GridSet {
    points: Mat<f64>,
    universal_matrix: Mat<f64>,
    /// Node counts per axis when the grid is regular.
    resolution: Option<Vec<usize>>,
}

impl GridSet {
    /// Wraps an arbitrary set of query points.
    ///
    /// ### Errors
    /// [`KrigingError::Shape`] if the points are not 2D or 3D.
    pub fn new(points: Mat<f64>) -> KrigingResult<Self> {
        Self::with_resolution(points, None)
    }

    fn with_resolution(points: Mat<f64>, resolution: Option<Vec<usize>>) -> KrigingResult<Self> {
        let n_dims = points.ncols();
        if !(2..=3).contains(&n_dims) {
            return Err(KrigingError::Shape(format!(
                "grid points must be 2D or 3D, got {n_dims} columns"
            )));
        }
        let universal_matrix = polynomials::universal_matrix(points.as_ref());
        Ok(Self {
            points,
            universal_matrix,
            resolution,
        })
    }

    /// Starts building a regular grid. See [`RegularGridBuilder`].
    pub fn regular() -> RegularGridBuilder {
        RegularGridBuilder::default()
    }

    pub fn points(&self) -> MatRef<'_, f64> {
        self.points.as_ref()
    }

    pub fn universal_matrix(&self) -> MatRef<'_, f64> {
        self.universal_matrix.as_ref()
    }

    /// Node counts per axis for regular grids, `None` for scattered query points.
    pub fn resolution(&self) -> Option<&[usize]> {
        self.resolution.as_deref()
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.points.nrows()
    }

    #[inline]
    pub fn n_dims(&self) -> usize {
        self.points.ncols()
    }

    /// Query points of rows `start..start + len`, with their drift monomials.
    pub(crate) fn chunk(&self, start: usize, len: usize) -> (MatRef<'_, f64>, MatRef<'_, f64>) {
        (
            self.points.as_ref().subrows(start, len),
            self.universal_matrix.as_ref().subrows(start, len),
        )
    }
}

/// Builder for regular [`GridSet`]s.
///
/// The extent and either a resolution or a node spacing must be provided before
/// [`build`](Self::build), in any order.
///
/// ### Example
/// ```
/// use ferreus_cokriging::GridSet;
///
/// let grid = GridSet::regular()
///     .extent(&[0.0, 0.0, 0.0, 10.0, 10.0, 5.0])
///     .resolution(&[11, 11, 6])
///     .build()?;
///
/// assert_eq!(grid.n_points(), 11 * 11 * 6);
/// # Ok::<(), ferreus_cokriging::KrigingError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegularGridBuilder {
    extent: Option<Vec<f64>>,
    resolution: Option<Vec<usize>>,
    spacing: Option<f64>,
}

impl RegularGridBuilder {
    /// Sets the extent as `[mins..., maxs...]`.
    pub fn extent(mut self, extent: &[f64]) -> Self {
        self.extent = Some(extent.to_vec());
        self
    }

    /// Sets the number of nodes along each axis. Replaces any spacing set before.
    pub fn resolution(mut self, resolution: &[usize]) -> Self {
        self.resolution = Some(resolution.to_vec());
        self.spacing = None;
        self
    }

    /// Sets the resolution from a node spacing, rounding each axis to the nearest
    /// whole number of intervals of the extent. Replaces any resolution set before.
    pub fn spacing(mut self, spacing: f64) -> Self {
        self.spacing = Some(spacing);
        self.resolution = None;
        self
    }

    /// Validates the configuration and creates the grid.
    ///
    /// ### Errors
    /// [`KrigingError::Configuration`] if the extent or resolution (or spacing) is
    /// missing, their lengths disagree or are not 2D/3D, the spacing is not
    /// positive, a maximum is below its minimum, a bound is not finite, or an axis
    /// has no nodes.
    pub fn build(self) -> KrigingResult<GridSet> {
        let extent = self.extent.ok_or_else(|| {
            KrigingError::Configuration("grid extent was not provided".to_string())
        })?;
        if !matches!(extent.len(), 4 | 6) {
            return Err(KrigingError::Configuration(format!(
                "expected an extent of length 4 (2D) or 6 (3D), got {}",
                extent.len()
            )));
        }
        if extent.iter().any(|v| !v.is_finite()) {
            return Err(KrigingError::Configuration(
                "grid extent must be finite".to_string(),
            ));
        }

        let resolution = match (self.resolution, self.spacing) {
            (Some(resolution), _) => resolution,
            (None, Some(spacing)) if spacing > 0.0 && spacing.is_finite() => {
                common::node_counts(&extent, spacing)
            }
            (None, Some(spacing)) => {
                return Err(KrigingError::Configuration(format!(
                    "grid spacing must be positive, got {spacing}"
                )));
            }
            (None, None) => {
                return Err(KrigingError::Configuration(
                    "grid resolution or spacing was not provided".to_string(),
                ));
            }
        };

        let dims = resolution.len();
        if extent.len() != 2 * dims {
            return Err(KrigingError::Configuration(format!(
                "extent of length {} does not match a resolution of length {dims}",
                extent.len()
            )));
        }
        for d in 0..dims {
            if extent[d + dims] < extent[d] {
                return Err(KrigingError::Configuration(format!(
                    "grid maximum {} is below minimum {} on axis {d}",
                    extent[d + dims],
                    extent[d]
                )));
            }
            if resolution[d] == 0 {
                return Err(KrigingError::Configuration(format!(
                    "grid resolution on axis {d} must be at least one node"
                )));
            }
        }

        let points = common::create_regular_grid(&extent, &resolution)?;
        debug!(
            num_points = points.nrows(),
            ?resolution,
            "created regular evaluation grid"
        );

        GridSet::with_resolution(points, Some(resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    #[test]
    fn missing_extent_or_resolution_is_a_configuration_error() {
        let missing_extent = GridSet::regular().resolution(&[2, 2, 2]).build();
        assert!(matches!(missing_extent, Err(KrigingError::Configuration(_))));

        let missing_resolution = GridSet::regular().extent(&[0.0, 0.0, 1.0, 1.0]).build();
        assert!(matches!(missing_resolution, Err(KrigingError::Configuration(_))));
    }

    #[test]
    fn invalid_regular_grids_are_rejected() {
        let inverted = GridSet::regular()
            .extent(&[0.0, 0.0, -1.0, 1.0])
            .resolution(&[2, 2])
            .build();
        assert!(matches!(inverted, Err(KrigingError::Configuration(_))));

        let empty_axis = GridSet::regular()
            .extent(&[0.0, 0.0, 1.0, 1.0])
            .resolution(&[2, 0])
            .build();
        assert!(matches!(empty_axis, Err(KrigingError::Configuration(_))));

        let mismatched = GridSet::regular()
            .extent(&[0.0, 0.0, 1.0, 1.0])
            .resolution(&[2, 2, 2])
            .build();
        assert!(matches!(mismatched, Err(KrigingError::Configuration(_))));
    }

    #[test]
    fn regular_grid_carries_universal_matrix() {
        let grid = GridSet::regular()
            .extent(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0])
            .resolution(&[2, 3, 4])
            .build()
            .unwrap();

        assert!(grid.n_points() == 24);
        assert!(grid.resolution() == Some(&[2usize, 3, 4][..]));
        assert!(grid.universal_matrix().ncols() == 9);

        // Last node is the maximum corner.
        let last = grid.n_points() - 1;
        let p = grid.points();
        assert!(p[(last, 0)] == 1.0 && p[(last, 1)] == 2.0 && p[(last, 2)] == 3.0);
        let u = grid.universal_matrix();
        assert!(u[(last, 5)] == 9.0);
        assert!(u[(last, 8)] == 6.0);
    }

    #[test]
    fn spacing_sets_node_counts() {
        let grid = GridSet::regular()
            .extent(&[0.0, 0.0, 10.0, 4.0])
            .spacing(2.0)
            .build()
            .unwrap();
        assert!(grid.resolution() == Some(&[6usize, 3][..]));
    }

    #[test]
    fn spacing_may_be_given_before_extent() {
        let grid = GridSet::regular()
            .spacing(0.5)
            .extent(&[0.0, 0.0, 0.0, 1.0, 2.0, 1.5])
            .build()
            .unwrap();
        assert!(grid.resolution() == Some(&[3usize, 5, 4][..]));

        let last_wins = GridSet::regular()
            .resolution(&[2, 2])
            .spacing(0.5)
            .extent(&[0.0, 0.0, 1.0, 1.0])
            .build()
            .unwrap();
        assert!(last_wins.resolution() == Some(&[3usize, 3][..]));
    }

    #[test]
    fn non_positive_spacing_is_a_configuration_error() {
        let err = GridSet::regular()
            .extent(&[0.0, 0.0, 1.0, 1.0])
            .spacing(0.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, KrigingError::Configuration(_)));
    }

    #[test]
    fn scattered_points_must_be_2d_or_3d() {
        let err = GridSet::new(Mat::zeros(4, 1)).unwrap_err();
        assert!(matches!(err, KrigingError::Shape(_)));
    }
}
