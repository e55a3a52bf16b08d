/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the polynomial constants of the cubic covariance model and its derivatives.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

/// Coefficients of the cubic covariance written in the normalised lag `h = r / a`:
///
/// `C(h) = 1 - h2 * h^2 + h3 * h^3 - h5 * h^5 + h7 * h^7`
#[derive(Clone, Debug, Copy)]
pub struct CubicConstants {
    pub h2: f64,
    pub h3: f64,
    pub h5: f64,
    pub h7: f64,

    /// `-lim_{r -> 0} C'(r) / r` multiplied by `a^2`. The variance of a single
    /// directional derivative of the field is `gradient_variance_factor * sill / a^2`.
    pub gradient_variance_factor: f64,
}

/// Constants of the cubic covariance model.
pub const CUBIC_CONSTANTS: CubicConstants = CubicConstants {
    h2: 7.0,
    h3: 35.0 / 4.0,
    h5: 7.0 / 2.0,
    h7: 3.0 / 4.0,
    gradient_variance_factor: 14.0,
};
