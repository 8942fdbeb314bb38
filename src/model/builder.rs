//! Translation of document parts and joints into [`MbdModel`] entities.

use std::collections::HashMap;

use glam::{DQuat, DVec3};
use log::{debug, warn};

use super::classify::{classify_joint, distance_joint_kind, side_radius};
use super::mbd::{
    BodyHandle, LimitComparison, LimitKind, MarkerRef, MbdBody, MbdJoint, MbdJointKind, MbdLimit,
    MbdMarker, MbdModel,
};
use crate::config::{DEFAULT_PART_MASS, FIXING_MARKER_NAME, LIMIT_TOLERANCE, PRECISION_CONFUSION};
use crate::core::constraints::{GroundJointId, Joint, JointId, JointKind, Side};
use crate::core::document::{Document, ObjectId};
use crate::core::types::{MassProperties, Placement};

/// Populates one model pass. The part map it extends is owned by the caller
/// and shared by every `build_*` call of the pass, which keeps
/// [`ModelBuilder::build_part`] idempotent.
pub struct ModelBuilder<'a> {
    doc: &'a mut Document,
    model: &'a mut MbdModel,
    parts: &'a mut HashMap<ObjectId, BodyHandle>,
    masses: &'a HashMap<ObjectId, f64>,
    /// Every joint considered when looking for the slider behind a screw or
    /// rack-and-pinion.
    scan_joints: Vec<JointId>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(
        doc: &'a mut Document,
        model: &'a mut MbdModel,
        parts: &'a mut HashMap<ObjectId, BodyHandle>,
        masses: &'a HashMap<ObjectId, f64>,
        scan_joints: Vec<JointId>,
    ) -> Self {
        Self {
            doc,
            model,
            parts,
            masses,
            scan_joints,
        }
    }

    /// Body for `part`, created on first request with the part's own
    /// placement and configured mass.
    pub fn build_part(&mut self, part: ObjectId) -> Option<BodyHandle> {
        if let Some(handle) = self.parts.get(&part) {
            return Some(*handle);
        }
        let name = self.doc.full_name(part)?;
        let placement = self.doc.placement(part)?;
        let mass = self.masses.get(&part).copied().unwrap_or(DEFAULT_PART_MASS);

        let handle = self
            .model
            .add_body(MbdBody::new(name, placement, MassProperties::with_mass(mass)));
        self.parts.insert(part, handle);
        Some(handle)
    }

    /// Pins the ground joint's object to the world: a model-level marker at
    /// the ground placement, a fixing marker on the body, and a fixed joint
    /// between them. Returns the grounded object.
    pub fn fix_grounded_part(&mut self, ground: GroundJointId) -> Option<ObjectId> {
        let joint = self.doc.ground_joint(ground)?;
        let placement = joint.placement;
        let object = joint.object.filter(|object| self.doc.contains(*object))?;
        let name = self.doc.ground_joint_full_name(ground)?;
        let object_name = self.doc.full_name(object)?;

        let world = self
            .model
            .add_marker(MbdMarker::new(format!("marker-{object_name}"), placement));
        let body = self.build_part(object)?;
        let fixing = self
            .model
            .add_body_marker(body, MbdMarker::new(FIXING_MARKER_NAME, Placement::IDENTITY))?;

        self.model.add_joint(MbdJoint {
            name,
            kind: MbdJointKind::Fixed,
            marker_i: world,
            marker_j: fixing,
        });
        Some(object)
    }

    /// Adds the solver joint for `id` plus its limits. Returns how many
    /// model entities were added; 0 when the joint was skipped.
    ///
    /// Classification may reorder the joint's sides; the reordering is
    /// written back to the document.
    pub fn build_joint(&mut self, id: JointId) -> usize {
        let (Some(original), Some(name)) = (self.doc.joint(id).cloned(), self.doc.joint_full_name(id))
        else {
            return 0;
        };

        let mut joint = original.clone();
        let kind = self.joint_kind_for(&mut joint, &name);
        if joint != original {
            if let Some(stored) = self.doc.joint_mut(id) {
                *stored = joint.clone();
            }
        }
        let Some(kind) = kind else {
            return 0;
        };

        let markers = if joint.kind == JointKind::RackPinion {
            self.rack_pinion_frames(&joint).map(|(first, second)| {
                (self.attach_marker(first, &name), self.attach_marker(second, &name))
            })
        } else if self.endpoint_frame(&joint, Side::First).is_some()
            && self.endpoint_frame(&joint, Side::Second).is_some()
        {
            Some((
                self.resolve_endpoint_marker(&joint, Side::First, &name),
                self.resolve_endpoint_marker(&joint, Side::Second, &name),
            ))
        } else {
            None
        };
        let Some((Some(marker_i), Some(marker_j))) = markers else {
            warn!("{name} has an endpoint that cannot be resolved, it is skipped.");
            return 0;
        };

        self.model.add_joint(MbdJoint {
            name: name.clone(),
            kind,
            marker_i,
            marker_j,
        });
        1 + self.add_limits(&joint, &name, marker_i, marker_j)
    }

    /// Marker for one side of `joint`, attached to the side's body.
    pub fn resolve_endpoint_marker(&mut self, joint: &Joint, side: Side, name: &str) -> Option<MarkerRef> {
        let frame = self.endpoint_frame(joint, side)?;
        self.attach_marker(frame, name)
    }

    fn attach_marker(&mut self, (part, placement): (ObjectId, Placement), name: &str) -> Option<MarkerRef> {
        let body = self.build_part(part)?;
        self.model.add_body_marker(body, MbdMarker::new(name, placement))
    }

    /// Containing part of `side` and the joint frame expressed in that part.
    fn endpoint_frame(&self, joint: &Joint, side: Side) -> Option<(ObjectId, Placement)> {
        let end = joint.side(side);
        let Some(part) = end.part.filter(|part| self.doc.contains(*part)) else {
            warn!("{:?} side of joint {} has no part.", side, joint.name);
            return None;
        };
        let Some(object) = self.doc.object_in_part(part, &end.object) else {
            warn!("{} is not found inside the part of joint {}.", end.object, joint.name);
            return None;
        };

        let placement = if object == part {
            end.placement
        } else {
            self.doc.global_placement(part, None).inverse()
                * self.doc.global_placement(object, Some(part))
                * end.placement
        };
        Some((part, placement))
    }

    /// Solver primitive for `joint`. Distance joints are classified, screw
    /// and rack-and-pinion joints get their sliding side moved first; the
    /// reordering happens on `joint`. `None` means no solver joint.
    pub fn joint_kind_for(&self, joint: &mut Joint, name: &str) -> Option<MbdJointKind> {
        let kind = match joint.kind {
            JointKind::Fixed => MbdJointKind::Fixed,
            JointKind::Revolute => MbdJointKind::Revolute,
            JointKind::Cylindrical => MbdJointKind::Cylindrical,
            JointKind::Slider => MbdJointKind::Translational,
            JointKind::Ball => MbdJointKind::Spherical,
            JointKind::Distance => {
                let pair = classify_joint(self.doc, joint);
                let radius1 = side_radius(self.doc, &joint.first);
                let radius2 = side_radius(self.doc, &joint.second);
                debug!("{name} classified as {pair:?}");
                distance_joint_kind(pair, joint.distance, radius1, radius2)
            }
            JointKind::RackPinion | JointKind::Screw => {
                let Some(sliding) = self.sliding_part_index(joint) else {
                    warn!("{name} needs exactly one part on a slider joint, it is skipped.");
                    return None;
                };
                if sliding == Side::Second {
                    joint.swap_sides();
                }
                if joint.kind == JointKind::Screw {
                    MbdJointKind::Screw {
                        pitch: joint.distance,
                    }
                } else {
                    MbdJointKind::RackPinion {
                        pitch_radius: joint.distance,
                    }
                }
            }
            JointKind::Gears => MbdJointKind::Gear {
                radius_i: joint.distance,
                radius_j: joint.distance2,
            },
            JointKind::Belt => MbdJointKind::Gear {
                radius_i: joint.distance,
                radius_j: -joint.distance2,
            },
        };
        Some(kind)
    }

    /// Side of `joint` whose part slides: a slider joint on the same part
    /// whose frame there has the same pitch and roll. `None` when no side
    /// slides, when both do, or when one part slides along differently
    /// oriented sliders.
    pub fn sliding_part_index(&self, joint: &Joint) -> Option<Side> {
        let mut first: Vec<Placement> = Vec::new();
        let mut second: Vec<Placement> = Vec::new();

        for id in &self.scan_joints {
            let Some(slider) = self.doc.joint(*id).filter(|j| j.kind == JointKind::Slider) else {
                continue;
            };
            for slider_side in [Side::First, Side::Second] {
                let Some(part) = slider.part(slider_side) else {
                    continue;
                };
                let side = if Some(part) == joint.first.part {
                    Side::First
                } else if Some(part) == joint.second.part {
                    Side::Second
                } else {
                    continue;
                };

                let slider_frame = slider.side(slider_side).placement;
                let (_, pitch1, roll1) = slider_frame.yaw_pitch_roll();
                let (_, pitch2, roll2) = joint.side(side).placement.yaw_pitch_roll();
                if (pitch1 - pitch2).abs() >= PRECISION_CONFUSION
                    || (roll1 - roll2).abs() >= PRECISION_CONFUSION
                {
                    continue;
                }
                match side {
                    Side::First => first.push(slider_frame),
                    Side::Second => second.push(slider_frame),
                }
            }
        }

        let consistent = |frames: &[Placement]| {
            frames
                .windows(2)
                .all(|pair| pair[0].approx_eq(&pair[1], PRECISION_CONFUSION))
        };
        match (first.is_empty(), second.is_empty()) {
            (false, true) if consistent(&first) => Some(Side::First),
            (true, false) if consistent(&second) => Some(Side::Second),
            _ => None,
        }
    }

    /// Frames for a rack-and-pinion with the rack already on side one. The
    /// rack frame takes the pinion's orientation turned about its own Z so
    /// that X runs along the rack's sliding direction.
    fn rack_pinion_frames(&self, joint: &Joint) -> Option<((ObjectId, Placement), (ObjectId, Placement))> {
        let pinion = self.endpoint_frame(joint, Side::Second)?;

        let rack_part = joint.first.part.filter(|part| self.doc.contains(*part))?;
        let rack_object = self.doc.object_in_part(rack_part, &joint.first.object)?;
        let pinion_part = joint.second.part?;
        let pinion_object = self.doc.object_in_part(pinion_part, &joint.second.object)?;

        let rack_global = self.doc.global_placement(rack_object, Some(rack_part));
        let pinion_global = self.doc.global_placement(pinion_object, Some(pinion_part));
        let pinion_in_rack = rack_global.inverse() * pinion_global * joint.second.placement;

        let rotation = pinion_in_rack.rotation;
        let current_z = rotation * DVec3::Z;
        let current_x = rotation * DVec3::X;
        let target_x = joint.first.placement.rotation * DVec3::Z;

        let mut yaw = current_x.angle_between(target_x);
        if current_z.dot(current_x.cross(target_x)) < 0.0 {
            yaw = -yaw;
        }

        let mut rack = Placement::new(
            joint.first.placement.position,
            (rotation * DQuat::from_rotation_z(yaw)).normalize(),
        );
        if rack_object != rack_part {
            rack = self.doc.global_placement(rack_part, None).inverse() * rack_global * rack;
        }
        Some(((rack_part, rack), pinion))
    }

    fn add_limits(&mut self, joint: &Joint, name: &str, marker_i: MarkerRef, marker_j: MarkerRef) -> usize {
        let limits = joint.limits;
        if !limits.enabled {
            return 0;
        }

        let mut bounds = Vec::new();
        if matches!(joint.kind, JointKind::Slider | JointKind::Cylindrical) {
            bounds.push((LimitKind::Translation, "LimitLenMin", LimitComparison::GreaterOrEqual, limits.length_min));
            bounds.push((LimitKind::Translation, "LimitLenMax", LimitComparison::LessOrEqual, limits.length_max));
        }
        if matches!(joint.kind, JointKind::Revolute | JointKind::Cylindrical) {
            let min = limits.angle_min.map(f64::to_radians);
            let max = limits.angle_max.map(f64::to_radians);
            bounds.push((LimitKind::Rotation, "LimitRotMin", LimitComparison::GreaterOrEqual, min));
            bounds.push((LimitKind::Rotation, "LimitRotMax", LimitComparison::LessOrEqual, max));
        }

        let mut added = 0;
        for (kind, suffix, comparison, value) in bounds {
            let Some(limit) = value else {
                continue;
            };
            self.model.add_limit(MbdLimit {
                name: format!("{name}-{suffix}"),
                kind,
                marker_i,
                marker_j,
                comparison,
                limit,
                tolerance: LIMIT_TOLERANCE,
            });
            added += 1;
        }
        added
    }
}
