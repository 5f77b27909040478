//! Errors

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading a Fourier BSDF table. All of them are fatal to the
/// table: a material must not render with a table that failed to load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The resource could not be opened or read.
    #[error("could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The format tag, version or a header field is not supported.
    #[error("bad header: {0}")]
    BadHeader(String),

    /// The header declares more data than the resource holds.
    #[error("truncated data: header declares {expected} bytes but only {actual} are available")]
    Truncated { expected: usize, actual: usize },

    /// The tabulated grid violates one of the table invariants.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
}

/// Failures of the azimuthal importance sampler.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum SampleFailure {
    /// The root finder hit its iteration cap before the residual dropped
    /// below the tolerance.
    #[error("root finder did not converge within {iterations} iterations")]
    NoConvergence { iterations: usize },

    /// The root was found but the density at the root is not positive.
    #[error("sampled azimuth has zero density")]
    ZeroDensity,
}

/// Failures of `sample_f` on a reflection model.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum ScatterError {
    /// The elevation marginal for the outgoing direction has zero mass.
    #[error("degenerate cell: zero total mass")]
    Degenerate,

    /// The azimuthal sampler failed.
    #[error(transparent)]
    Sample(#[from] SampleFailure),
}
