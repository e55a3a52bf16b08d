/////////////////////////////////////////////////////////////////////////////////////////////
//
// Example 3D potential field model of two folded layers from random interface points and
// orientations, with grid evaluation, isosurface extraction and model persistence.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::Mat;
use ferreus_cokriging::{
    GridSet, KernelParams, ObservationSet, PotentialFieldInterpolator, generate_random_points,
    interpolant_config::{InterpolantSettings, UniversalityDegree},
    pad_and_snap_extents, point_arrays_to_csv,
    progress::{ProgressMsg, ProgressSink, closure_sink},
    save_isosurfaces_obj,
};
use ferreus_cokriging_utils::get_pointarray_extents;
use std::{env, fs, sync::Arc};
use tracing_subscriber::EnvFilter;

const SIZE: f64 = 20.0;
const AMPLITUDE: f64 = 1.5;
const WAVELENGTH: f64 = 5.0;

/// Elevation of a layer with base elevation `base` at easting `x`.
fn fold(x: f64, base: f64) -> f64 {
    base + AMPLITUDE * (x / WAVELENGTH).sin()
}

/// Generates a callback closure_sink
fn get_callback_sink() -> Arc<dyn ProgressSink> {
    let (sink, _listener) = closure_sink(256, |msg| match msg {
        ProgressMsg::SystemAssembled {
            size,
            num_gradients,
            num_interfaces,
            num_drift,
        } => {
            println!(
                "Assembled system of size {size} ({num_gradients} gradient, \
                 {num_interfaces} interface, {num_drift} drift)"
            );
        }
        ProgressMsg::SystemSolved { backward_error } => {
            println!("Solved with backward error {backward_error:>.3E}");
        }
        ProgressMsg::EvaluationProgress { progress, .. } => {
            println!("Evaluated {:>.1}%", progress * 100.0);
        }
        ProgressMsg::SurfacingProgress { isovalue, progress } => {
            println!("Isovalue: {isovalue:>.5}    {:>.1}%", progress * 100.0);
        }
        ProgressMsg::Message { message } => {
            println!("{message}");
        }
    });

    sink
}

/// Random interface points on two folded layers, 2.5 units apart.
fn layer_points(num_points: usize, base: f64, seed: u64) -> Mat<f64> {
    let xy = generate_random_points(num_points, 2, Some(seed));
    Mat::from_fn(num_points, 3, |i, j| match j {
        2 => fold(SIZE * xy[(i, 0)], base),
        _ => SIZE * xy[(i, j)],
    })
}

/// Orientations of the fold between the layers, with the potential increasing
/// upwards through the stratigraphy.
fn orientations(num_dips: usize, seed: u64) -> (Mat<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
    let xy = generate_random_points(num_dips, 2, Some(seed));
    let positions = Mat::from_fn(num_dips, 3, |i, j| match j {
        2 => fold(SIZE * xy[(i, 0)], 1.25),
        _ => SIZE * xy[(i, j)],
    });

    let mut dips = Vec::with_capacity(num_dips);
    let mut azimuths = Vec::with_capacity(num_dips);
    for i in 0..num_dips {
        let slope = AMPLITUDE / WAVELENGTH * (positions[(i, 0)] / WAVELENGTH).cos();
        dips.push(slope.abs().atan().to_degrees());
        // The normal leans against the slope
        azimuths.push(if slope > 0.0 { 270.0 } else { 90.0 });
    }

    (positions, dips, azimuths, vec![1.0; num_dips])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let outdir = env::current_dir()?.join("demo_output");
    fs::create_dir_all(&outdir)?;

    let layers = vec![layer_points(25, 0.0, 1), layer_points(25, 2.5, 2)];
    let (dips_position, dip_angles, azimuth, polarity) = orientations(12, 3);

    let observations =
        ObservationSet::from_layers(dips_position, dip_angles, azimuth, polarity, &layers)?;

    // Range of the covariance, larger than the fold wavelength
    let kernel_params = KernelParams::builder().range(15.0).build()?;
    let settings = InterpolantSettings::builder(kernel_params)
        .universality_degree(UniversalityDegree::One)
        .build();

    let model = PotentialFieldInterpolator::builder(observations, settings)
        .progress_callback(get_callback_sink())
        .build()?;

    let isovalues = model.layer_potentials()?;
    println!("Layer potentials: {isovalues:?}");

    // Evaluate the field on a coarse grid and dump it for inspection
    let grid = GridSet::regular()
        .extent(&[0.0, 0.0, -3.0, SIZE, SIZE, 5.5])
        .resolution(&[11, 11, 9])
        .build()?;
    let values = model.evaluate(&grid)?;
    point_arrays_to_csv(grid.points(), values.as_ref(), outdir.join("potential_grid.csv"))?;

    // Surface each layer boundary
    let spacing = 0.5;
    let n0 = layers[0].nrows();
    let source_points = Mat::from_fn(n0 + layers[1].nrows(), 3, |i, j| match i < n0 {
        true => layers[0][(i, j)],
        false => layers[1][(i - n0, j)],
    });
    let extents = get_pointarray_extents(source_points.as_ref())
        .ok_or("no interface points to surface")?;
    let extents = pad_and_snap_extents(&extents, spacing, 0.0)?;

    let (points, faces) = model.build_isosurfaces(&extents, spacing, &isovalues)?;
    save_isosurfaces_obj(outdir.join("folded_layers.obj"), &isovalues, &points, &faces)?;

    model.save_model(outdir.join("folded_layers_model.json"))?;

    Ok(())
}
