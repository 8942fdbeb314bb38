pub mod rigid;
pub use rigid::RigidChainSolver;

use thiserror::Error;

use crate::model::mbd::{BodyHandle, MbdModel};

pub type SolverResult<T> = Result<T, SolverError>;

/// Conditions a solver backend can signal.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A constraint cannot be satisfied from the current configuration.
    #[error("constraint {joint} cannot be satisfied")]
    Inconsistent { joint: String },

    #[error("system is singular")]
    Singular,

    /// Backend-specific failure.
    #[error("solver backend failure: {0}")]
    Backend(String),
}

impl SolverError {
    #[must_use]
    pub fn inconsistent(joint: impl Into<String>) -> Self {
        Self::Inconsistent { joint: joint.into() }
    }

    #[must_use]
    pub fn backend(details: impl Into<String>) -> Self {
        Self::Backend(details.into())
    }
}

/// Numerical engine that positions the bodies of an [`MbdModel`] so that its
/// joints are satisfied. Results are left in the model's body placements.
pub trait SolverBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Full solve from the model's current state. Also primes a drag session.
    fn pre_drag(&mut self, model: &mut MbdModel) -> SolverResult<()>;

    /// Incremental solve where `dragged` bodies keep the placements they
    /// were given since the previous step.
    fn drag_step(&mut self, model: &mut MbdModel, dragged: &[BodyHandle]) -> SolverResult<()>;

    /// Ends a drag session.
    fn post_drag(&mut self, _model: &mut MbdModel) -> SolverResult<()> {
        Ok(())
    }
}

/// Backend that accepts every model and leaves all bodies where they are.
#[derive(Debug, Default)]
pub struct NoopSolver;

impl NoopSolver {
    pub fn new() -> Self {
        Self
    }
}

impl SolverBackend for NoopSolver {
    fn name(&self) -> &str {
        "noop"
    }

    fn pre_drag(&mut self, _model: &mut MbdModel) -> SolverResult<()> {
        Ok(())
    }

    fn drag_step(&mut self, _model: &mut MbdModel, _dragged: &[BodyHandle]) -> SolverResult<()> {
        Ok(())
    }
}
