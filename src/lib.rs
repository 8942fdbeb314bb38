//! Assembly MBD – from CAD assemblies to multibody models.
//!
//! This crate turns an assembly of parts connected by geometric joints into
//! a multibody-dynamics model, analyses which parts are anchored to ground,
//! hands the model to a solver backend and writes solved placements back.

pub mod assembly;
pub mod config;
pub mod core;
pub mod error;
pub mod model;
pub mod solver;
pub mod utils;

pub use glam::{DMat3, DQuat, DVec3};

pub use assembly::{AssemblySolver, SolveState};
pub use config::SolveSettings;
pub use core::{
    constraints::{GroundJoint, Joint, JointId, JointKind, JointLimits, JointSide, Side},
    document::{ContainerKind, Document, ObjectId},
    geometry::{CurveKind, Element, Shape, SurfaceKind},
    types::{MassProperties, Placement},
};
pub use error::{status_code, SolveError, SolveResult};
pub use model::{
    classify::DistanceType,
    mbd::{BodyHandle, MbdJointKind, MbdModel},
};
pub use solver::{NoopSolver, RigidChainSolver, SolverBackend, SolverError};
pub use utils::allocator::{Arena, Id};
