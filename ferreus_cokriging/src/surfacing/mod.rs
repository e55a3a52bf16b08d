/////////////////////////////////////////////////////////////////////////////////////////////
//
// Isosurface extraction from evaluated potential fields and mesh output.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

pub mod surface_nets;
pub mod surfacing_io;

pub use surface_nets::surface_nets;
pub use surfacing_io::{save_isosurfaces_obj, save_obj};
