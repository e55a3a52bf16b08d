/////////////////////////////////////////////////////////////////////////////////////////////
//
// Re-exports the distance engine, cubic covariance kernel and kernel parameters.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities for the [`ferreus_cokriging`] crate
//!
//! The leaves of the co-kriging pipeline: pairwise distances and signed axis
//! differences, the compactly supported cubic covariance with its first and second
//! radial derivatives, and the [`KernelParams`] configuration shared by every stage.
//!
//! [`ferreus_cokriging`]: https://docs.rs/ferreus_cokriging
mod constants;
mod cubic_kernel;
mod distances;
mod kernel_helpers;
mod traits;
mod utils;

/// The cubic covariance kernel and its elementwise matrix forms.
pub mod kernels {
    pub use super::cubic_kernel::*;
}

pub use {
    constants::{CUBIC_CONSTANTS, CubicConstants},
    distances::{
        axis_differences, build_distance_matrices, dip_axis_differences, same_axis_mask,
        tile_dip_positions,
    },
    kernel_helpers::{DEFAULT_NUGGET_EFFECT, KernelParams, KernelParamsBuilder, KernelParamsError},
    traits::{Coordinate, KernelFromParams},
    utils::{get_distance, get_pointarray_extents, select_mat_rows},
};
