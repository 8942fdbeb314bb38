//! Errors reported by [`AssemblySolver`](crate::assembly::AssemblySolver).

use std::io;

use thiserror::Error;

use crate::solver::SolverError;

pub type SolveResult<T> = Result<T, SolveError>;

#[derive(Debug, Error)]
pub enum SolveError {
    /// No ground joint fixes an existing object, so nothing anchors the model.
    #[error("no grounded part in the assembly")]
    NoGroundedParts,

    #[error("solve failed: {0}")]
    SolverFailed(#[from] SolverError),

    #[error("model export failed: {0}")]
    Export(#[from] io::Error),

    /// A part given to `pre_drag` has no body in the solved model.
    #[error("{0} is not part of the solved model")]
    UnknownDragPart(String),
}

impl SolveError {
    /// Integer status code: 0 is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            SolveError::NoGroundedParts => -6,
            SolveError::SolverFailed(_) => -1,
            SolveError::Export(_) => -2,
            SolveError::UnknownDragPart(_) => -3,
        }
    }
}

/// Collapses a solve result into the integer status contract.
pub fn status_code<T>(result: &SolveResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => err.code(),
    }
}
