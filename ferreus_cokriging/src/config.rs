/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares solver acceptance thresholds and field evaluation options.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Declares solver acceptance thresholds and field evaluation options.
use serde::{Deserialize, Serialize};

/// Dense factorisations available to the kriging solver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Solvers {
    /// Try a Cholesky factorisation first and fall back to partial pivoting LU when the
    /// system is not numerically positive definite. Only systems without drift are
    /// positive definite, so with drift this goes straight to LU.
    #[default]
    Auto,

    /// Always use partial pivoting LU.
    PartialPivLu,
}

/// Parameters controlling how the kriging system is solved and how the field is
/// evaluated.
///
/// ### Default Values
/// - `solver_type`: [`Solvers::Auto`]
/// - `singularity_tolerance`: `1e-12`
/// - `residual_tolerance`: `1e-10`
/// - `eval_chunk_size`: `4096`
/// - `parallel_evaluation`: `true`
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Params {
    /// Dense factorisation used for the kriging system.
    pub solver_type: Solvers,

    /// Smallest accepted ratio between the smallest and largest pivot magnitude.
    /// Systems below this are reported as singular.
    pub singularity_tolerance: f64,

    /// Largest accepted normwise backward error `|Cx - b| / (|C| |x| + |b|)`.
    pub residual_tolerance: f64,

    /// Number of query points evaluated per chunk.
    pub eval_chunk_size: usize,

    /// Whether chunks are evaluated concurrently.
    pub parallel_evaluation: bool,
}

impl Default for Params {
    fn default() -> Self {
        Params::builder().build()
    }
}

impl Params {
    /// Returns a new [`ParamsBuilder`] populated with defaults.
    pub fn builder() -> ParamsBuilder {
        ParamsBuilder::new()
    }
}

/// A convenience builder for constructing a [`Params`] instance.
///
/// The builder should be called via the [`Params::builder`] method.
///
/// See [`Params`] for details on each field.
#[derive(Debug, Clone)]
pub struct ParamsBuilder {
    pub solver_type: Solvers,
    pub singularity_tolerance: f64,
    pub residual_tolerance: f64,
    pub eval_chunk_size: usize,
    pub parallel_evaluation: bool,
}

impl ParamsBuilder {
    fn new() -> Self {
        Self {
            solver_type: Solvers::Auto,
            singularity_tolerance: 1e-12,
            residual_tolerance: 1e-10,
            eval_chunk_size: 4096,
            parallel_evaluation: true,
        }
    }

    /// Sets the solver type.
    pub fn solver_type(mut self, solver_type: Solvers) -> Self {
        self.solver_type = solver_type;
        self
    }

    /// Sets the pivot ratio below which the system is considered singular.
    pub fn singularity_tolerance(mut self, singularity_tolerance: f64) -> Self {
        self.singularity_tolerance = singularity_tolerance;
        self
    }

    /// Sets the largest accepted backward error of the solution.
    pub fn residual_tolerance(mut self, residual_tolerance: f64) -> Self {
        self.residual_tolerance = residual_tolerance;
        self
    }

    /// Sets the number of query points per evaluation chunk. Zero is treated as one.
    pub fn eval_chunk_size(mut self, eval_chunk_size: usize) -> Self {
        self.eval_chunk_size = eval_chunk_size.max(1);
        self
    }

    /// Enables or disables concurrent chunk evaluation.
    pub fn parallel_evaluation(mut self, parallel_evaluation: bool) -> Self {
        self.parallel_evaluation = parallel_evaluation;
        self
    }

    /// Builds and returns a [`Params`] instance.
    pub fn build(self) -> Params {
        Params {
            solver_type: self.solver_type,
            singularity_tolerance: self.singularity_tolerance,
            residual_tolerance: self.residual_tolerance,
            eval_chunk_size: self.eval_chunk_size,
            parallel_evaluation: self.parallel_evaluation,
        }
    }
}
