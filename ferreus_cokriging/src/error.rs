/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the error types surfaced by model construction, solving, evaluation and model I/O.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use ferreus_cokriging_utils::KernelParamsError;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors raised while building, solving or evaluating a co-kriging model.
///
/// None of these are retried internally. Each is a deterministic consequence of the
/// input geometry or parameters and is expected to be fixed by the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KrigingError {
    /// Missing or invalid configuration, such as a grid without extent or
    /// resolution, or a kernel without a range.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The kriging system is singular or too ill-conditioned to trust.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Inconsistent array shapes or an invalid geometric parameter.
    #[error("shape error: {0}")]
    Shape(String),
}

impl From<KernelParamsError> for KrigingError {
    fn from(value: KernelParamsError) -> Self {
        match value {
            KernelParamsError::NonPositiveRange(_) => KrigingError::Shape(value.to_string()),
            KernelParamsError::MissingRange
            | KernelParamsError::NonPositiveSill(_)
            | KernelParamsError::NegativeNugget(_) => {
                KrigingError::Configuration(value.to_string())
            }
        }
    }
}

/// Convenient alias for results of the co-kriging pipeline.
pub type KrigingResult<T> = Result<T, KrigingError>;

/// Errors that can occur while saving or loading a solved model.
#[derive(Debug, Error)]
pub enum ModelIOError {
    /// Failed to create the output file.
    #[error("creating {}: {source}", path.display())]
    Create { path: PathBuf, source: io::Error },

    /// Failed to open an existing model file for reading.
    #[error("opening {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Failed to flush buffered output when finishing a write.
    #[error("flushing {}: {source}", path.display())]
    Flush { path: PathBuf, source: io::Error },

    /// Error serializing the in-memory model to JSON.
    #[error("serializing JSON to {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Error parsing JSON when reading a model from disk.
    #[error("parsing JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The JSON `format` field does not match the expected model format.
    #[error("unsupported format {found:?} (expected {expected:?}) in {}", path.display())]
    FormatMismatch {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },

    /// The JSON `version` field does not match the supported version.
    #[error("unsupported version {found} (expected {expected}) in {}", path.display())]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

/// Convenient alias for results of model I/O.
pub type ModelIOResult<T> = Result<T, ModelIOError>;

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    #[test]
    fn kernel_parameter_errors_map_to_kriging_kinds() {
        let missing: KrigingError = KernelParamsError::MissingRange.into();
        assert!(matches!(missing, KrigingError::Configuration(_)));

        let zero_range: KrigingError = KernelParamsError::NonPositiveRange(0.0).into();
        assert!(matches!(zero_range, KrigingError::Shape(_)));

        let sill: KrigingError = KernelParamsError::NonPositiveSill(-1.0).into();
        assert!(matches!(sill, KrigingError::Configuration(_)));
    }
}
