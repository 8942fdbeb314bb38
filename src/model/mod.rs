pub mod builder;
pub mod classify;
pub mod connectivity;
pub mod mbd;

pub use builder::ModelBuilder;
pub use classify::{classify, distance_joint_kind, Classification, DistanceType};
pub use mbd::{BodyHandle, MarkerRef, MbdBody, MbdJoint, MbdJointKind, MbdLimit, MbdMarker, MbdModel};
