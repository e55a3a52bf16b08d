/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for implicit geological modelling.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Implicit geological modelling by universal co-kriging.
//!
//! A geological interface (a horizon, a fault plane) is modelled as an isosurface of
//! a scalar *potential field*. The field is interpolated from two kinds of
//! observation:
//!
//! - **Orientations** - positions with a dip, azimuth and polarity, constraining the
//!   gradient of the field.
//! - **Interface points** - points on the same boundary, paired against a reference
//!   point of their layer and constrained to share its potential.
//!
//! The interpolator is a universal co-kriging system built from a compactly
//! supported cubic covariance and its first and second derivatives, augmented with a
//! polynomial drift of degree 0, 1 or 2. The system is assembled densely, solved
//! once with a direct factorisation, and the dual kriging weights are then used to
//! evaluate the field and its gradient at any number of query points.
//!
//! # Features
//! - 2D and 3D models
//! - Drift of degree 0, 1 or 2
//! - Cholesky or partial pivoting LU with singularity and backward error checks
//! - Chunked, parallel evaluation of the field and its gradient over regular grids
//! - Dense Surface Nets isosurface extraction and OBJ output
//! - Versioned JSON persistence of solved models
//! - Built on [`faer`](https://docs.rs/faer/latest/faer/) for linear algebra
//!
//! # Examples
//!
//! ```
//! use faer::mat;
//! use ferreus_cokriging::{
//!     GridSet, KernelParams, ObservationSet, assemble_system, evaluate_field, solve_system,
//!     DualKrigingWeights,
//!     config::Params,
//!     interpolant_config::UniversalityDegree,
//! };
//!
//! // Two horizontal layers and one orientation pointing up.
//! let layers = vec![
//!     mat![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0], [0.0, 5.0, 0.0f64]],
//!     mat![[0.0, 0.0, 2.0], [5.0, 0.0, 2.0], [5.0, 5.0, 2.0f64]],
//! ];
//! let observations = ObservationSet::from_layers(
//!     mat![[2.5, 2.5, 1.0f64]],
//!     vec![0.0],
//!     vec![0.0],
//!     vec![1.0],
//!     &layers,
//! )?;
//!
//! let kernel_params = KernelParams::builder().range(12.0).build()?;
//! let degree = UniversalityDegree::One;
//! let params = Params::default();
//!
//! let system = assemble_system(&observations, &kernel_params, degree)?;
//! let report = solve_system(&system, &params)?;
//! let weights = DualKrigingWeights::from_solution(report.solution.as_ref(), &system.layout)?;
//!
//! // Interface points of a layer share one potential.
//! let grid = GridSet::new(observations.rest_layer_points().to_owned())?;
//! let at_rest = evaluate_field(&weights, &observations, &grid, &kernel_params, degree, &params)?;
//!
//! let grid = GridSet::new(observations.ref_layer_points().to_owned())?;
//! let at_ref = evaluate_field(&weights, &observations, &grid, &kernel_params, degree, &params)?;
//!
//! for i in 0..observations.n_pairs() {
//!     assert!((at_rest[(i, 0)] - at_ref[(i, 0)]).abs() < 1e-8);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! For repeated use, [`PotentialFieldInterpolator`] bundles assembly, solving,
//! evaluation, surfacing and persistence behind one builder. A runnable demo lives
//! in the repository's `examples` directory.
pub mod interpolant_config;

pub mod config;

pub mod progress;

mod error;

mod common;

mod observations;

mod grid;

mod polynomials;

mod assembler;

mod linalg;

mod evaluator;

mod interpolator;

mod surfacing;

pub use {
    assembler::{
        DualKrigingWeights, KrigingSystem, SystemLayout, assemble_system, gradient_block,
        gradient_interface_block, interface_block,
    },
    common::{
        create_regular_grid, csv_to_observations, generate_random_points,
        pad_and_snap_extents, point_arrays_to_csv,
    },
    error::{KrigingError, KrigingResult, ModelIOError, ModelIOResult},
    evaluator::{evaluate_field, evaluate_gradient},
    ferreus_cokriging_utils::{KernelParams, KernelParamsError},
    grid::{GridSet, RegularGridBuilder},
    interpolator::{PotentialFieldInterpolator, PotentialFieldInterpolatorBuilder},
    linalg::{Factorisation, SolveReport, solve, solve_system},
    observations::{InterfaceRole, ObservationSet},
    polynomials::universal_matrix,
    surfacing::{save_isosurfaces_obj, save_obj, surface_nets},
};
