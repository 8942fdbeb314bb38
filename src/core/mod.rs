//! Core types describing the assembly document, its joints and placements.

pub mod constraints;
pub mod document;
pub mod geometry;
pub mod types;

pub use constraints::{GroundJoint, GroundJointId, Joint, JointId, JointKind, JointLimits, JointSide, Side};
pub use document::{ContainerKind, DocObject, Document, JointDefect, ObjectId, ObjectKind};
pub use geometry::{CurveKind, Element, ElementClass, ElementKind, Shape, SurfaceKind};
pub use types::{MassProperties, Placement};
