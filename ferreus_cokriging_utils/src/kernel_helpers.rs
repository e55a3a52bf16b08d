/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides parameter and builder types for configuring the cubic covariance kernel.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::constants::CUBIC_CONSTANTS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default nugget effect added to the gradient covariance diagonal.
pub const DEFAULT_NUGGET_EFFECT: f64 = 0.01;

/// Reasons a [`KernelParamsBuilder`] can refuse to build.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum KernelParamsError {
    /// No range was given to the builder.
    #[error("kernel range was not provided")]
    MissingRange,

    /// The range was zero, negative or not a number.
    #[error("kernel range must be positive, got {0}")]
    NonPositiveRange(f64),

    /// The sill was zero, negative or not a number.
    #[error("kernel sill must be positive, got {0}")]
    NonPositiveSill(f64),

    /// The nugget effect was negative or not a number.
    #[error("nugget effect must be non-negative, got {0}")]
    NegativeNugget(f64),
}

/// Scalar configuration of the cubic covariance kernel, fixed for one model run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct KernelParams {
    /// Variogram range `a`. Pairs of points further apart than this are uncorrelated.
    ///
    /// A common choice is the length of the longest diagonal of the model extent.
    pub range: f64,

    /// Covariance at zero lag (`c_o`).
    pub sill: f64,

    /// Added to the variance of every gradient observation. Larger values trade an
    /// exact fit of the orientations for a better conditioned system.
    pub nugget_effect: f64,
}

impl KernelParams {
    /// Begins building a [`KernelParams`] instance.
    pub fn builder() -> KernelParamsBuilder {
        KernelParamsBuilder {
            range: None,
            sill: None,
            nugget_effect: DEFAULT_NUGGET_EFFECT,
        }
    }

    /// Variance of one directional derivative of the field, excluding the nugget.
    #[inline(always)]
    pub fn gradient_variance(&self) -> f64 {
        CUBIC_CONSTANTS.gradient_variance_factor * self.sill / (self.range * self.range)
    }

    /// Sill giving every gradient component a variance of one third, so a unit
    /// orientation vector has unit expected squared norm.
    pub fn default_sill(range: f64) -> f64 {
        range * range / CUBIC_CONSTANTS.gradient_variance_factor / 3.0
    }
}

/// Builder for [`KernelParams`].
///
/// The range has no default. The sill defaults to [`KernelParams::default_sill`]
/// and the nugget effect to [`DEFAULT_NUGGET_EFFECT`].
#[derive(Debug, Clone, Copy)]
pub struct KernelParamsBuilder {
    range: Option<f64>,
    sill: Option<f64>,
    nugget_effect: f64,
}

impl KernelParamsBuilder {
    /// Sets the variogram range.
    pub fn range(mut self, v: f64) -> Self {
        self.range = Some(v);
        self
    }

    /// Sets the covariance at zero lag.
    pub fn sill(mut self, v: f64) -> Self {
        self.sill = Some(v);
        self
    }

    /// Sets the nugget effect of the gradient observations.
    pub fn nugget_effect(mut self, v: f64) -> Self {
        self.nugget_effect = v;
        self
    }

    /// Validates the builder and returns a [`KernelParams`] value.
    pub fn build(self) -> Result<KernelParams, KernelParamsError> {
        let range = self.range.ok_or(KernelParamsError::MissingRange)?;
        if !(range > 0.0) || !range.is_finite() {
            return Err(KernelParamsError::NonPositiveRange(range));
        }

        let sill = self.sill.unwrap_or_else(|| KernelParams::default_sill(range));
        if !(sill > 0.0) || !sill.is_finite() {
            return Err(KernelParamsError::NonPositiveSill(sill));
        }

        if !(self.nugget_effect >= 0.0) || !self.nugget_effect.is_finite() {
            return Err(KernelParamsError::NegativeNugget(self.nugget_effect));
        }

        Ok(KernelParams {
            range,
            sill,
            nugget_effect: self.nugget_effect,
        })
    }
}
