/////////////////////////////////////////////////////////////////////////////////////////////
//
// Specifies the kernel parameters and universality degree used to configure a co-kriging model.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Specifies the kernel parameters and universality degree used to configure a co-kriging model.
use ferreus_cokriging_utils::KernelParams;
use serde::{Deserialize, Serialize};

/// Degree of the polynomial drift added to the kriging system.
///
/// The constant monomial is never part of the drift: it is annihilated by the
/// rest-minus-reference differencing of interface observations and has a zero
/// gradient.
///
/// | degree | 2D monomials | 3D monomials |
/// |---|---|---|
/// | `Zero` | none | none |
/// | `One` | x, y | x, y, z |
/// | `Two` | x, y, x², y², xy | x, y, z, x², y², z², xy, xz, yz |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UniversalityDegree {
    Zero,
    #[default]
    One,
    Two,
}

impl UniversalityDegree {
    /// Number of drift rows and columns appended to the system for `dimensions`.
    pub fn drift_size(&self, dimensions: usize) -> usize {
        match self {
            UniversalityDegree::Zero => 0,
            UniversalityDegree::One => dimensions,
            UniversalityDegree::Two => dimensions + dimensions * (dimensions + 1) / 2,
        }
    }
}

/// A convenience builder for constructing an [`InterpolantSettings`] instance.
///
/// The builder should be called via the [`InterpolantSettings::builder`] method.
#[derive(Debug, Clone, Copy)]
pub struct InterpolantSettingsBuilder {
    pub kernel_params: KernelParams,
    pub universality_degree: UniversalityDegree,
}

impl InterpolantSettingsBuilder {
    fn new(kernel_params: KernelParams) -> Self {
        Self {
            kernel_params,
            universality_degree: UniversalityDegree::default(),
        }
    }

    /// Sets the universality degree of the drift.
    pub fn universality_degree(mut self, universality_degree: UniversalityDegree) -> Self {
        self.universality_degree = universality_degree;
        self
    }

    /// Builds and returns an instance of [`InterpolantSettings`].
    pub fn build(self) -> InterpolantSettings {
        InterpolantSettings {
            kernel_params: self.kernel_params,
            universality_degree: self.universality_degree,
        }
    }
}

/// Model settings that are fixed for the lifetime of a solved interpolator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct InterpolantSettings {
    /// Range, sill and nugget effect of the cubic covariance.
    pub kernel_params: KernelParams,

    /// Polynomial drift appended to the system.
    pub universality_degree: UniversalityDegree,
}

impl InterpolantSettings {
    /// Returns a new [`InterpolantSettingsBuilder`] for the given kernel parameters.
    pub fn builder(kernel_params: KernelParams) -> InterpolantSettingsBuilder {
        InterpolantSettingsBuilder::new(kernel_params)
    }
}
