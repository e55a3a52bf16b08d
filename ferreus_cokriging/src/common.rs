/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared helpers for random point generation, grid extents, and observation CSV I/O.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    error::{KrigingError, KrigingResult},
    observations::ObservationSet,
};
use csv::{ReaderBuilder, StringRecord, Writer};
use faer::{Mat, MatRef};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::path::Path;

/// Round a value down to the nearest multiple of resolution
pub(crate) fn round_down(value: f64, resolution: f64) -> f64 {
    (value / resolution).floor() * resolution
}

/// Round a value up to the nearest multiple of resolution
pub(crate) fn round_up(value: f64, resolution: f64) -> f64 {
    (value / resolution).ceil() * resolution
}

/// Generate a matrix of random points in the unit hypercube.
///
/// # Parameters
/// - `n`: Number of points to generate (rows in the output matrix).
/// - `d`: Number of spatial dimensions per point (columns in the output matrix).
/// - `seed`: Optional random seed. The same seed gives the same points on every
///   run and platform. `None` seeds from the operating system.
///
/// # Example
/// ```
/// use ferreus_cokriging::generate_random_points;
///
/// let pts = generate_random_points(100, 3, Some(42));
/// assert_eq!(pts.ncols(), 3);
/// ```
pub fn generate_random_points(n: usize, d: usize, seed: Option<u64>) -> Mat<f64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    Mat::from_fn(n, d, |_, _| rng.random_range(0.0..1.0))
}

/// Pads and snaps extents `[mins..., maxs...]` (2D or 3D) outwards to the nearest
/// multiple of `resolution`, then expands the bounds by one resolution unit plus
/// `buffer`.
///
/// ### Errors
/// [`KrigingError::Configuration`] when the extents do not have 4 or 6 entries or
/// the resolution is not positive.
pub fn pad_and_snap_extents(
    initial_extents: &[f64],
    resolution: f64,
    buffer: f64,
) -> KrigingResult<Vec<f64>> {
    let dims = match initial_extents.len() {
        4 => 2,
        6 => 3,
        len => {
            return Err(KrigingError::Configuration(format!(
                "expected extents of length 4 (2D) or 6 (3D), got {len}"
            )));
        }
    };
    if !(resolution > 0.0) {
        return Err(KrigingError::Configuration(format!(
            "resolution must be positive, got {resolution}"
        )));
    }

    let mut extents = initial_extents.to_vec();
    for d in 0..dims {
        extents[d] = round_down(extents[d], resolution) - resolution - buffer;
        extents[d + dims] = round_up(extents[d + dims], resolution) + resolution + buffer;
    }

    Ok(extents)
}

/// Number of grid nodes along each axis of padded extents at a node spacing.
pub(crate) fn node_counts(extents: &[f64], spacing: f64) -> Vec<usize> {
    let dims = extents.len() / 2;
    (0..dims)
        .map(|d| ((extents[d + dims] - extents[d]) / spacing).round() as usize + 1)
        .collect()
}

/// Create a regular grid from extents `[mins..., maxs...]` and node counts per axis.
///
/// Nodes follow `ij` ordering: the first axis varies slowest and the last fastest,
/// so node `(i, j, k)` of a 3D grid is row `(i * ny + j) * nz + k`. An axis with a
/// single node sits at its minimum.
///
/// ### Errors
/// [`KrigingError::Shape`] when `extents` does not hold two bounds per axis of
/// `counts`.
pub fn create_regular_grid(extents: &[f64], counts: &[usize]) -> KrigingResult<Mat<f64>> {
    let dims = counts.len();
    if extents.len() != 2 * dims {
        return Err(KrigingError::Shape(format!(
            "extents of length {} do not match {dims} axes of node counts",
            extents.len()
        )));
    }

    let total_points: usize = counts.iter().product();

    Ok(Mat::from_fn(total_points, dims, |row_idx, col_idx| {
        let nodes = counts[col_idx];
        let (start, end) = (extents[col_idx], extents[col_idx + dims]);
        let step = match nodes > 1 {
            true => (end - start) / (nodes as f64 - 1.0),
            false => 0.0,
        };

        let stride: usize = counts[col_idx + 1..].iter().product();
        let index_in_dim = (row_idx / stride) % nodes;
        start + step * index_in_dim as f64
    }))
}

fn parse_field(record: &StringRecord, idx: usize) -> Result<f64, Box<dyn Error>> {
    let raw = record
        .get(idx)
        .ok_or_else(|| format!("missing column {idx} in record {:?}", record.position()))?;
    Ok(raw.trim().parse::<f64>()?)
}

fn read_records(path: &Path, has_headers: bool) -> Result<Vec<StringRecord>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .from_reader(file);

    let mut records = Vec::new();
    let mut num_cols = 0;
    for result in reader.records() {
        let record = result?;
        if num_cols == 0 {
            num_cols = record.len();
        } else if record.len() != num_cols {
            return Err("Inconsistent number of columns in CSV".into());
        }
        records.push(record);
    }
    Ok(records)
}

/// Load interface points and orientations from two CSV files into an
/// [`ObservationSet`].
///
/// * Interfaces: `X, Y, [Z,] layer`. The layer column is a free label. Points are
///   grouped by label in order of first appearance and paired as described in
///   [`ObservationSet::from_layers`].
/// * Orientations: `X, Y, [Z,] dip, azimuth, polarity`, angles in degrees.
///
/// The number of coordinate columns is inferred from the orientation file.
pub fn csv_to_observations<P: AsRef<Path>>(
    interfaces_path: P,
    orientations_path: P,
    has_headers: bool,
) -> Result<ObservationSet, Box<dyn Error>> {
    let orientation_records = read_records(orientations_path.as_ref(), has_headers)?;
    let num_cols = orientation_records.first().map_or(0, |r| r.len());
    if num_cols < 5 {
        return Err(format!("orientation CSV needs at least 5 columns, got {num_cols}").into());
    }
    let dims = num_cols - 3;

    let mut dips_position = Mat::<f64>::zeros(orientation_records.len(), dims);
    let mut dip_angles = Vec::with_capacity(orientation_records.len());
    let mut azimuth = Vec::with_capacity(orientation_records.len());
    let mut polarity = Vec::with_capacity(orientation_records.len());

    for (i, record) in orientation_records.iter().enumerate() {
        for d in 0..dims {
            dips_position[(i, d)] = parse_field(record, d)?;
        }
        dip_angles.push(parse_field(record, dims)?);
        azimuth.push(parse_field(record, dims + 1)?);
        polarity.push(parse_field(record, dims + 2)?);
    }

    let interface_records = read_records(interfaces_path.as_ref(), has_headers)?;
    let mut layer_order: Vec<String> = Vec::new();
    let mut layer_points: HashMap<String, Vec<Vec<f64>>> = HashMap::new();

    for record in interface_records.iter() {
        let label = record
            .get(dims)
            .ok_or("interface CSV is missing the layer column")?
            .trim()
            .to_string();
        let coords = (0..dims)
            .map(|d| parse_field(record, d))
            .collect::<Result<Vec<f64>, _>>()?;

        if !layer_points.contains_key(&label) {
            layer_order.push(label.clone());
        }
        layer_points.entry(label).or_default().push(coords);
    }

    let layers: Vec<Mat<f64>> = layer_order
        .iter()
        .map(|label| {
            let points = &layer_points[label];
            Mat::from_fn(points.len(), dims, |i, j| points[i][j])
        })
        .collect();

    Ok(ObservationSet::from_layers(
        dips_position,
        dip_angles,
        azimuth,
        polarity,
        &layers,
    )?)
}

/// Write point coordinates and associated values to a CSV file.
///
/// Headers are `X, Y, [Z,] Potential`.
///
/// # Errors
/// Returns an error if the row counts differ or writing to disk fails.
pub fn point_arrays_to_csv<P: AsRef<Path>>(
    points: MatRef<f64>,
    values: MatRef<f64>,
    path: P,
) -> Result<(), Box<dyn Error>> {
    let num_points = points.nrows();
    if num_points != values.nrows() {
        return Err("Points and values must have same length.".into());
    }

    let mut wtr = Writer::from_path(path)?;

    let mut headers: Vec<&str> = ["X", "Y", "Z"].into_iter().take(points.ncols()).collect();
    headers.push("Potential");
    wtr.write_record(&headers)?;

    for i in 0..num_points {
        let mut record: Vec<String> = points.row(i).iter().map(|c| c.to_string()).collect();
        record.push(values.get(i, 0).to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
