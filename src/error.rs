//! Fatal reconstruction errors. None of these are recoverable inside the
//! engine: the run is aborted and the caller decides what to do next.

use core::fmt;

use crate::index::Index3_u;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A voxel left the physically valid range after a subset update. The
    /// reconstruction has diverged (bad data, mismatched geometry, or an
    /// inappropriate regularization strength).
    OutOfRangeVoxel {
        index: Index3_u,
        value: f32,
        upper: f32,
        iteration: usize,
        subset: usize,
    },

    /// The regularized denominator `sensitivity + beta * derivative` went
    /// negative, breaking the nonnegativity guarantee of the EM update.
    NonnegativityViolation {
        index: Index3_u,
        denominator: f32,
        subset: usize,
    },

    /// An internal buffer could not be allocated.
    Allocation { what: &'static str, bytes: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OutOfRangeVoxel { index: [r, c, s], value, upper, iteration, subset } => {
                write!(f, "voxel ({r} {c} {s}) = {value} outside [0, {upper}] \
                           after iteration {iteration}, subset {subset}")
            }
            Error::NonnegativityViolation { index: [r, c, s], denominator, subset } => {
                write!(f, "regularized denominator {denominator} < 0 \
                           at voxel ({r} {c} {s}) in subset {subset}")
            }
            Error::Allocation { what, bytes } => {
                write!(f, "failed to allocate {bytes} bytes for {what}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Allocate a zeroed `f32` buffer, reporting failure instead of aborting.
pub fn alloc_buffer(what: &'static str, len: usize) -> Result<Vec<f32>, Error> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::Allocation { what, bytes: len * std::mem::size_of::<f32>() })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}
