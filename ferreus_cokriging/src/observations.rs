/////////////////////////////////////////////////////////////////////////////////////////////
//
// Holds validated interface and orientation observations for one interpolation run.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::error::{KrigingError, KrigingResult};
use faer::{Mat, MatRef};
use ferreus_cokriging_utils::select_mat_rows;
use serde::{Deserialize, Serialize};

/// Which side of a (rest, reference) interface pair a point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceRole {
    Rest,
    Reference,
}

/// Geological samples of one interpolation run.
///
/// * Orientations: `dips_position` (`n_dips × n_dims`) with one dip angle, azimuth
///   (degrees) and polarity (`±1`) per row.
/// * Interfaces: `rest_layer_points` and `ref_layer_points` (`n_pairs × n_dims`).
///   Row `i` of both is a pair of points on the same layer boundary, constrained to
///   share the same potential.
///
/// Two and three dimensional models are supported. All arrays are validated on
/// construction and after every edit, so downstream stages can rely on consistent
/// shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationSet {
    dips_position: Mat<f64>,
    dip_angles: Vec<f64>,
    azimuth: Vec<f64>,
    polarity: Vec<f64>,
    rest_layer_points: Mat<f64>,
    ref_layer_points: Mat<f64>,
}

fn shape_error(message: String) -> KrigingError {
    KrigingError::Shape(message)
}

impl ObservationSet {
    /// Validates and bundles the raw observation arrays.
    ///
    /// ### Errors
    /// [`KrigingError::Shape`] when the dimensionality is not 2 or 3, there are no
    /// orientations, the per-dip vectors do not match `n_dips`, a polarity is not
    /// `±1`, the rest and reference point sets differ in length or dimension, or a
    /// value is not finite.
    pub fn new(
        dips_position: Mat<f64>,
        dip_angles: Vec<f64>,
        azimuth: Vec<f64>,
        polarity: Vec<f64>,
        rest_layer_points: Mat<f64>,
        ref_layer_points: Mat<f64>,
    ) -> KrigingResult<Self> {
        let (n_dips, n_dims) = dips_position.shape();

        if !(2..=3).contains(&n_dims) {
            return Err(shape_error(format!(
                "orientations must be 2D or 3D, got {n_dims} columns"
            )));
        }
        if n_dips == 0 {
            return Err(shape_error("at least one orientation is required".to_string()));
        }

        for (name, values) in [
            ("dip_angles", &dip_angles),
            ("azimuth", &azimuth),
            ("polarity", &polarity),
        ] {
            if values.len() != n_dips {
                return Err(shape_error(format!(
                    "{name} has {} values for {n_dips} orientations",
                    values.len()
                )));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(shape_error(format!("{name} contains non-finite values")));
            }
        }

        if let Some(p) = polarity.iter().find(|p| **p != 1.0 && **p != -1.0) {
            return Err(shape_error(format!("polarity must be +1 or -1, got {p}")));
        }

        // An empty interface set may be given as a 0 x 0 matrix.
        let rest_layer_points = normalise_empty(rest_layer_points, n_dims);
        let ref_layer_points = normalise_empty(ref_layer_points, n_dims);

        if rest_layer_points.nrows() != ref_layer_points.nrows() {
            return Err(shape_error(format!(
                "rest_layer_points has {} rows but ref_layer_points has {}",
                rest_layer_points.nrows(),
                ref_layer_points.nrows()
            )));
        }

        for (name, points) in [
            ("dips_position", &dips_position),
            ("rest_layer_points", &rest_layer_points),
            ("ref_layer_points", &ref_layer_points),
        ] {
            check_points(name, points.as_ref(), n_dims)?;
        }

        Ok(Self {
            dips_position,
            dip_angles,
            azimuth,
            polarity,
            rest_layer_points,
            ref_layer_points,
        })
    }

    /// Builds the rest/reference pairs from interface points grouped per layer.
    ///
    /// The first point of each layer is used as its reference point and every other
    /// point of the layer becomes a rest point paired with it. Layers with a single
    /// point contribute no constraint.
    ///
    /// ### Example
    /// ```
    /// use faer::mat;
    /// use ferreus_cokriging::ObservationSet;
    ///
    /// let layers = vec![
    ///     mat![[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0f64]],
    ///     mat![[0.0, 0.0, 2.0], [1.0, 1.0, 2.0f64]],
    /// ];
    /// let obs = ObservationSet::from_layers(
    ///     mat![[0.5, 0.5, 1.5f64]],
    ///     vec![0.0],
    ///     vec![0.0],
    ///     vec![1.0],
    ///     &layers,
    /// )?;
    ///
    /// assert_eq!(obs.n_pairs(), 3);
    /// # Ok::<(), ferreus_cokriging::KrigingError>(())
    /// ```
    pub fn from_layers(
        dips_position: Mat<f64>,
        dip_angles: Vec<f64>,
        azimuth: Vec<f64>,
        polarity: Vec<f64>,
        layers: &[Mat<f64>],
    ) -> KrigingResult<Self> {
        let n_dims = dips_position.ncols();
        let n_pairs: usize = layers.iter().map(|l| l.nrows().saturating_sub(1)).sum();

        let mut rest = Mat::<f64>::zeros(n_pairs, n_dims);
        let mut reference = Mat::<f64>::zeros(n_pairs, n_dims);

        let mut row = 0;
        for (layer_id, layer) in layers.iter().enumerate() {
            if layer.nrows() > 0 && layer.ncols() != n_dims {
                return Err(shape_error(format!(
                    "layer {layer_id} has {} columns, expected {n_dims}",
                    layer.ncols()
                )));
            }
            if layer.nrows() < 2 {
                continue;
            }
            let rest_indices: Vec<usize> = (1..layer.nrows()).collect();
            let count = rest_indices.len();
            rest.subrows_mut(row, count)
                .copy_from(&select_mat_rows(layer.as_ref(), &rest_indices));
            for r in row..row + count {
                reference.row_mut(r).copy_from(&layer.row(0));
            }
            row += count;
        }

        Self::new(
            dips_position,
            dip_angles,
            azimuth,
            polarity,
            rest,
            reference,
        )
    }

    #[inline]
    pub fn n_dims(&self) -> usize {
        self.dips_position.ncols()
    }

    #[inline]
    pub fn n_dips(&self) -> usize {
        self.dips_position.nrows()
    }

    #[inline]
    pub fn n_pairs(&self) -> usize {
        self.rest_layer_points.nrows()
    }

    pub fn dips_position(&self) -> MatRef<'_, f64> {
        self.dips_position.as_ref()
    }

    pub fn dip_angles(&self) -> &[f64] {
        &self.dip_angles
    }

    pub fn azimuth(&self) -> &[f64] {
        &self.azimuth
    }

    pub fn polarity(&self) -> &[f64] {
        &self.polarity
    }

    pub fn rest_layer_points(&self) -> MatRef<'_, f64> {
        self.rest_layer_points.as_ref()
    }

    pub fn ref_layer_points(&self) -> MatRef<'_, f64> {
        self.ref_layer_points.as_ref()
    }

    /// Observed gradient vector `G`, axis-major (`[Gx; Gy; Gz]`), as a column.
    ///
    /// In 3D each dip gives `(sin(dip) sin(az), sin(dip) cos(az), cos(dip))` times its
    /// polarity. In 2D the dip angle is measured from the x axis and the azimuth is
    /// ignored: `(cos(dip), sin(dip))` times the polarity.
    pub fn gradient_vector(&self) -> Mat<f64> {
        let n_dips = self.n_dips();
        let n_dims = self.n_dims();

        Mat::from_fn(n_dims * n_dips, 1, |row, _| {
            let (axis, i) = (row / n_dips, row % n_dips);
            let dip = self.dip_angles[i].to_radians();
            let azimuth = self.azimuth[i].to_radians();
            let polarity = self.polarity[i];

            let component = match (n_dims, axis) {
                (2, 0) => dip.cos(),
                (2, _) => dip.sin(),
                (_, 0) => dip.sin() * azimuth.sin(),
                (_, 1) => dip.sin() * azimuth.cos(),
                _ => dip.cos(),
            };
            component * polarity
        })
    }

    /// Groups the interface pairs by layer.
    ///
    /// Pairs sharing an identical reference point belong to the same layer. Returns
    /// the layer index of every pair, numbered in order of first appearance.
    pub fn pair_layers(&self) -> Vec<usize> {
        let mut references: Vec<usize> = Vec::new();
        (0..self.n_pairs())
            .map(|i| {
                let row = self.ref_layer_points.row(i);
                match references.iter().position(|&r| {
                    self.ref_layer_points
                        .row(r)
                        .iter()
                        .zip(row.iter())
                        .all(|(a, b)| a == b)
                }) {
                    Some(layer) => layer,
                    None => {
                        references.push(i);
                        references.len() - 1
                    }
                }
            })
            .collect()
    }

    /// Replaces the coordinates of one orientation.
    ///
    /// This is the edit path used by interactive front-ends after a point was
    /// moved. The dip angle, azimuth and polarity are kept.
    pub fn set_dip_position(&mut self, index: usize, coordinates: &[f64]) -> KrigingResult<()> {
        let n_dips = self.n_dips();
        if index >= n_dips {
            return Err(shape_error(format!(
                "orientation index {index} out of range for {n_dips} orientations"
            )));
        }
        self.check_coordinates(coordinates)?;
        for (axis, value) in coordinates.iter().enumerate() {
            self.dips_position[(index, axis)] = *value;
        }
        Ok(())
    }

    /// Replaces the coordinates of the rest or reference point of one interface pair.
    pub fn set_interface_point(
        &mut self,
        index: usize,
        role: InterfaceRole,
        coordinates: &[f64],
    ) -> KrigingResult<()> {
        let n_pairs = self.n_pairs();
        if index >= n_pairs {
            return Err(shape_error(format!(
                "interface pair index {index} out of range for {n_pairs} pairs"
            )));
        }
        self.check_coordinates(coordinates)?;
        let target = match role {
            InterfaceRole::Rest => &mut self.rest_layer_points,
            InterfaceRole::Reference => &mut self.ref_layer_points,
        };
        for (axis, value) in coordinates.iter().enumerate() {
            target[(index, axis)] = *value;
        }
        Ok(())
    }

    fn check_coordinates(&self, coordinates: &[f64]) -> KrigingResult<()> {
        if coordinates.len() != self.n_dims() {
            return Err(shape_error(format!(
                "expected {} coordinates, got {}",
                self.n_dims(),
                coordinates.len()
            )));
        }
        if coordinates.iter().any(|c| !c.is_finite()) {
            return Err(shape_error("coordinates must be finite".to_string()));
        }
        Ok(())
    }
}

fn normalise_empty(points: Mat<f64>, n_dims: usize) -> Mat<f64> {
    match points.nrows() == 0 {
        true => Mat::zeros(0, n_dims),
        false => points,
    }
}

fn check_points(name: &str, points: MatRef<f64>, n_dims: usize) -> KrigingResult<()> {
    if points.ncols() != n_dims {
        return Err(shape_error(format!(
            "{name} has {} columns, expected {n_dims}",
            points.ncols()
        )));
    }
    if points.row_iter().any(|row| row.iter().any(|v| !v.is_finite())) {
        return Err(shape_error(format!("{name} contains non-finite coordinates")));
    }
    Ok(())
}
