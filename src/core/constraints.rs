use serde::{Deserialize, Serialize};

use super::document::ObjectId;
use super::types::Placement;
use crate::utils::allocator::Id;

pub type JointId = Id<Joint>;
pub type GroundJointId = Id<GroundJoint>;

/// Joint kinds an assembly can author, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointKind {
    Fixed,
    Revolute,
    Cylindrical,
    Slider,
    Ball,
    Distance,
    RackPinion,
    Screw,
    Gears,
    Belt,
}

impl JointKind {
    pub const ALL: [JointKind; 10] = [
        JointKind::Fixed,
        JointKind::Revolute,
        JointKind::Cylindrical,
        JointKind::Slider,
        JointKind::Ball,
        JointKind::Distance,
        JointKind::RackPinion,
        JointKind::Screw,
        JointKind::Gears,
        JointKind::Belt,
    ];

    /// Maps a stored enumeration index back to a kind.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the joint rigidly constrains position and therefore counts
    /// for reachability from ground. Ratio joints only couple velocities.
    pub fn is_connecting(self) -> bool {
        !matches!(
            self,
            JointKind::RackPinion | JointKind::Screw | JointKind::Gears | JointKind::Belt
        )
    }
}

/// Which endpoint of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

/// One endpoint: the containing part, the referenced object inside it (by
/// name), the sub-element, and the joint frame relative to that object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointSide {
    pub part: Option<ObjectId>,
    pub object: String,
    pub element: String,
    pub placement: Placement,
}

impl JointSide {
    pub fn new(part: ObjectId, object: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            part: Some(part),
            object: object.into(),
            element: element.into(),
            placement: Placement::IDENTITY,
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

/// Optional travel limits. Lengths in model units, angles in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub enabled: bool,
    pub length_min: Option<f64>,
    pub length_max: Option<f64>,
    pub angle_min: Option<f64>,
    pub angle_max: Option<f64>,
}

impl JointLimits {
    pub fn lengths(min: f64, max: f64) -> Self {
        Self {
            enabled: true,
            length_min: Some(min),
            length_max: Some(max),
            ..Self::default()
        }
    }

    pub fn angles(min: f64, max: f64) -> Self {
        Self {
            enabled: true,
            angle_min: Some(min),
            angle_max: Some(max),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub name: String,
    pub kind: JointKind,
    pub activated: bool,
    pub first: JointSide,
    pub second: JointSide,
    pub distance: f64,
    pub distance2: f64,
    pub limits: JointLimits,
}

impl Joint {
    pub fn new(name: impl Into<String>, kind: JointKind, first: JointSide, second: JointSide) -> Self {
        Self {
            name: name.into(),
            kind,
            activated: true,
            first,
            second,
            distance: 0.0,
            distance2: 0.0,
            limits: JointLimits::default(),
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_distance2(mut self, distance2: f64) -> Self {
        self.distance2 = distance2;
        self
    }

    pub fn with_limits(mut self, limits: JointLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn side(&self, side: Side) -> &JointSide {
        match side {
            Side::First => &self.first,
            Side::Second => &self.second,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut JointSide {
        match side {
            Side::First => &mut self.first,
            Side::Second => &mut self.second,
        }
    }

    pub fn part(&self, side: Side) -> Option<ObjectId> {
        self.side(side).part
    }

    /// Exchanges the two endpoints in place.
    pub fn swap_sides(&mut self) {
        std::mem::swap(&mut self.first, &mut self.second);
    }

    /// Whether `part` is one of the endpoints' containing parts.
    pub fn touches(&self, part: ObjectId) -> bool {
        self.first.part == Some(part) || self.second.part == Some(part)
    }

    /// The containing part on the opposite side of `part`, if `part` is an endpoint.
    pub fn opposite_part(&self, part: ObjectId) -> Option<ObjectId> {
        if self.first.part == Some(part) {
            self.second.part
        } else if self.second.part == Some(part) {
            self.first.part
        } else {
            None
        }
    }
}

/// Fixes one object to the world frame at `placement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundJoint {
    pub name: String,
    pub object: Option<ObjectId>,
    pub placement: Placement,
}

impl GroundJoint {
    pub fn new(name: impl Into<String>, object: ObjectId, placement: Placement) -> Self {
        Self {
            name: name.into(),
            object: Some(object),
            placement,
        }
    }
}
