//! Reachability of parts from grounded anchors over connecting joints.
//!
//! The adjacency is never stored: neighbours of a part are read from the
//! joint list on every visit, so activation toggles are seen immediately.

use std::collections::HashSet;

use log::warn;

use crate::config::UPSTREAM_SEARCH_LIMIT;
use crate::core::constraints::{Joint, JointId, JointKind, Side};
use crate::core::document::{Document, ObjectId};

/// Parts reachable from `anchors` through connecting joints, anchors included.
pub fn connected_parts(anchors: &[ObjectId], joints: &[&Joint]) -> HashSet<ObjectId> {
    let mut visited: HashSet<ObjectId> = anchors.iter().copied().collect();
    let mut stack: Vec<ObjectId> = anchors.to_vec();

    while let Some(node) = stack.pop() {
        let neighbours = joints
            .iter()
            .filter(|joint| joint.kind.is_connecting())
            .filter_map(|joint| joint.opposite_part(node));
        for next in neighbours {
            if visited.insert(next) {
                stack.push(next);
            }
        }
    }
    visited
}

fn resolve<'a>(doc: &'a Document, ids: &[JointId]) -> Vec<&'a Joint> {
    ids.iter().filter_map(|id| doc.joint(*id)).collect()
}

/// Objects fixed by the assembly's ground joints, in group order.
pub fn grounded_parts(doc: &Document, assembly: ObjectId) -> Vec<ObjectId> {
    let mut parts = Vec::new();
    for id in doc.ground_joint_ids(assembly) {
        let Some(object) = doc.ground_joint(id).and_then(|ground| ground.object) else {
            continue;
        };
        if doc.contains(object) && !parts.contains(&object) {
            parts.push(object);
        }
    }
    parts
}

/// Removes every joint with an endpoint outside the closure of `anchors`.
/// Returns the removed joints.
pub fn prune_unconnected(
    doc: &Document,
    joints: &mut Vec<JointId>,
    anchors: &[ObjectId],
) -> Vec<JointId> {
    let connected = connected_parts(anchors, &resolve(doc, joints));
    let mut removed = Vec::new();

    joints.retain(|id| {
        let keep = doc.joint(*id).is_some_and(|joint| {
            [Side::First, Side::Second]
                .into_iter()
                .all(|side| joint.part(side).is_some_and(|part| connected.contains(&part)))
        });
        if !keep {
            warn!(
                "{} is unconnected to a grounded part so it is ignored.",
                doc.joint_full_name(*id).unwrap_or_default()
            );
            removed.push(*id);
        }
        keep
    });
    removed
}

pub fn is_part_grounded(doc: &Document, assembly: ObjectId, part: ObjectId) -> bool {
    grounded_parts(doc, assembly).contains(&part)
}

/// Parts currently connected to ground through active joints.
pub fn ground_connected_parts(doc: &Document, assembly: ObjectId) -> HashSet<ObjectId> {
    let anchors = grounded_parts(doc, assembly);
    let joints = doc.active_joints(assembly);
    connected_parts(&anchors, &resolve(doc, &joints))
}

pub fn is_part_connected(doc: &Document, assembly: ObjectId, part: ObjectId) -> bool {
    ground_connected_parts(doc, assembly).contains(&part)
}

/// Active joints with `part` on either side.
pub fn joints_of_part(doc: &Document, assembly: ObjectId, part: ObjectId) -> Vec<JointId> {
    doc.active_joints(assembly)
        .into_iter()
        .filter(|id| doc.joint(*id).is_some_and(|joint| joint.touches(part)))
        .collect()
}

/// Whether `joint` is the only thing keeping the part on `side` connected to
/// ground. Every other joint of that part is deactivated while connectivity
/// is recomputed, then restored to its exact prior state.
pub fn is_joint_connecting_part_to_ground(
    doc: &mut Document,
    assembly: ObjectId,
    joint: JointId,
    side: Side,
) -> bool {
    let Some(part) = doc
        .joint(joint)
        .filter(|j| j.kind.is_connecting())
        .and_then(|j| j.part(side))
    else {
        return false;
    };

    if is_part_grounded(doc, assembly, part) || !is_part_connected(doc, assembly, part) {
        return false;
    }

    let siblings: Vec<(JointId, bool)> = joints_of_part(doc, assembly, part)
        .into_iter()
        .filter(|id| *id != joint)
        .map(|id| (id, doc.joint_activated(id)))
        .collect();

    for (id, _) in &siblings {
        doc.set_joint_activated(*id, false);
    }
    let connected = is_part_connected(doc, assembly, part);
    for (id, state) in siblings.iter().rev() {
        doc.set_joint_activated(*id, *state);
    }

    connected
}

/// First joint of `part` that alone connects it to ground, with the side
/// `part` sits on.
pub fn joint_of_part_connecting_to_ground(
    doc: &mut Document,
    assembly: ObjectId,
    part: ObjectId,
) -> Option<(JointId, Side)> {
    for joint in joints_of_part(doc, assembly, part) {
        for side in [Side::First, Side::Second] {
            let on_side = doc.joint(joint).and_then(|j| j.part(side)) == Some(part);
            if on_side && is_joint_connecting_part_to_ground(doc, assembly, joint, side) {
                return Some((joint, side));
            }
        }
    }
    None
}

/// Chain of parts from a grounded part down to `part`, following each
/// part's connection to ground. Empty when no such chain exists.
pub fn upstream_parts(doc: &mut Document, assembly: ObjectId, part: ObjectId) -> Vec<ObjectId> {
    let mut chain = Vec::new();
    let mut current = part;
    for _ in 0..UPSTREAM_SEARCH_LIMIT {
        chain.push(current);
        if is_part_grounded(doc, assembly, current) {
            chain.reverse();
            return chain;
        }
        let Some(next) = upstream_neighbour(doc, assembly, current) else {
            return Vec::new();
        };
        current = next;
    }
    Vec::new()
}

/// Closest part at or above `part` that is not rigidly fixed to its upstream
/// neighbour. `None` for grounded parts.
pub fn upstream_moving_part(
    doc: &mut Document,
    assembly: ObjectId,
    part: ObjectId,
) -> Option<ObjectId> {
    let mut current = part;
    for _ in 0..UPSTREAM_SEARCH_LIMIT {
        if is_part_grounded(doc, assembly, current) {
            return None;
        }
        let (joint, side) = joint_of_part_connecting_to_ground(doc, assembly, current)?;
        let joint = doc.joint(joint)?;
        if joint.kind != JointKind::Fixed {
            return Some(current);
        }
        current = joint.part(side.other())?;
    }
    None
}

fn upstream_neighbour(doc: &mut Document, assembly: ObjectId, part: ObjectId) -> Option<ObjectId> {
    let (joint, side) = joint_of_part_connecting_to_ground(doc, assembly, part)?;
    doc.joint(joint)?.part(side.other())
}

/// Parts that lose their connection to ground when `joint` is deactivated
/// and that hang off `part` through the remaining joints.
pub fn downstream_parts(
    doc: &mut Document,
    assembly: ObjectId,
    part: ObjectId,
    joint: JointId,
) -> Vec<ObjectId> {
    let state = doc.joint_activated(joint);
    doc.set_joint_activated(joint, false);

    let joints = doc.active_joints(assembly);
    let reachable = connected_parts(&[part], &resolve(doc, &joints));
    let grounded = ground_connected_parts(doc, assembly);

    doc.set_joint_activated(joint, state);

    let mut parts: Vec<ObjectId> = reachable
        .into_iter()
        .filter(|candidate| *candidate != part && !grounded.contains(candidate))
        .collect();
    parts.sort();
    parts
}
