//! In-memory document: the object tree, link targets, shapes, and the joint
//! groups owned by each assembly.

use std::collections::{HashMap, HashSet};

use log::warn;
use serde::{Deserialize, Serialize};

use super::constraints::{GroundJoint, GroundJointId, Joint, JointId, Side};
use super::geometry::{Element, Shape};
use super::types::Placement;
use crate::utils::allocator::{Arena, Id};

pub type ObjectId = Id<DocObject>;

/// Link chains and nested containers deeper than this are treated as cycles.
const MAX_HIERARCHY_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Part,
    Assembly,
    Body,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Organisational folder; contributes no placement.
    Group { children: Vec<ObjectId> },
    /// Placed container whose placement applies to its children.
    Container {
        kind: ContainerKind,
        children: Vec<ObjectId>,
    },
    /// Placed reference to another object, possibly in another subtree.
    Link { target: ObjectId },
    /// Leaf carrying geometry.
    Feature { shape: Shape },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocObject {
    pub name: String,
    pub placement: Placement,
    pub kind: ObjectKind,
}

impl DocObject {
    pub fn children(&self) -> &[ObjectId] {
        match &self.kind {
            ObjectKind::Group { children } | ObjectKind::Container { children, .. } => children,
            _ => &[],
        }
    }

    pub fn is_assembly(&self) -> bool {
        matches!(
            self.kind,
            ObjectKind::Container {
                kind: ContainerKind::Assembly,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Default)]
struct JointGroup {
    joints: Vec<JointId>,
    grounds: Vec<GroundJointId>,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    name: String,
    objects: Arena<DocObject>,
    roots: Vec<ObjectId>,
    parents: HashMap<ObjectId, ObjectId>,
    joints: Arena<Joint>,
    grounds: Arena<GroundJoint>,
    groups: HashMap<ObjectId, JointGroup>,
    joint_revisions: HashMap<JointId, u64>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ---- object tree -------------------------------------------------------

    /// Inserts an object under `parent` (or as a root object). A parent that
    /// cannot hold children leaves the object at the root.
    pub fn add_object(
        &mut self,
        name: impl Into<String>,
        placement: Placement,
        kind: ObjectKind,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        let id = self.objects.insert(DocObject {
            name: name.into(),
            placement,
            kind,
        });

        let attached = parent.and_then(|parent_id| {
            match self.objects.get_mut(parent_id).map(|parent| &mut parent.kind) {
                Some(ObjectKind::Group { children }) | Some(ObjectKind::Container { children, .. }) => {
                    children.push(id);
                    Some(parent_id)
                }
                _ => None,
            }
        });

        match attached {
            Some(parent_id) => {
                self.parents.insert(id, parent_id);
            }
            None => {
                if parent.is_some() {
                    warn!("object {} added at document root: parent cannot hold children", id.index());
                }
                self.roots.push(id);
            }
        }
        id
    }

    pub fn add_group(&mut self, name: impl Into<String>, parent: Option<ObjectId>) -> ObjectId {
        self.add_object(
            name,
            Placement::IDENTITY,
            ObjectKind::Group {
                children: Vec::new(),
            },
            parent,
        )
    }

    pub fn add_container(
        &mut self,
        name: impl Into<String>,
        kind: ContainerKind,
        placement: Placement,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        self.add_object(
            name,
            placement,
            ObjectKind::Container {
                kind,
                children: Vec::new(),
            },
            parent,
        )
    }

    pub fn add_assembly(
        &mut self,
        name: impl Into<String>,
        placement: Placement,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        self.add_container(name, ContainerKind::Assembly, placement, parent)
    }

    pub fn add_part(
        &mut self,
        name: impl Into<String>,
        placement: Placement,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        self.add_container(name, ContainerKind::Part, placement, parent)
    }

    pub fn add_feature(
        &mut self,
        name: impl Into<String>,
        placement: Placement,
        shape: Shape,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        self.add_object(name, placement, ObjectKind::Feature { shape }, parent)
    }

    pub fn add_link(
        &mut self,
        name: impl Into<String>,
        target: ObjectId,
        placement: Placement,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        self.add_object(name, placement, ObjectKind::Link { target }, parent)
    }

    /// Detaches and removes one object. Children stay in the arena but are
    /// no longer reachable from the roots.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<DocObject> {
        let removed = self.objects.remove(id)?;
        match self.parents.remove(&id) {
            Some(parent) => {
                if let Some(ObjectKind::Group { children } | ObjectKind::Container { children, .. }) =
                    self.objects.get_mut(parent).map(|parent| &mut parent.kind)
                {
                    children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }
        Some(removed)
    }

    pub fn object(&self, id: ObjectId) -> Option<&DocObject> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut DocObject> {
        self.objects.get_mut(id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains(id)
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.parents.get(&id).copied()
    }

    pub fn placement(&self, id: ObjectId) -> Option<Placement> {
        self.objects.get(id).map(|object| object.placement)
    }

    pub fn set_placement(&mut self, id: ObjectId, placement: Placement) -> bool {
        match self.objects.get_mut(id) {
            Some(object) => {
                object.placement = placement;
                true
            }
            None => false,
        }
    }

    /// `"<document>#<object>"`.
    pub fn full_name(&self, id: ObjectId) -> Option<String> {
        self.objects
            .get(id)
            .map(|object| format!("{}#{}", self.name, object.name))
    }

    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    /// Direct dependencies: children of groups/containers, or a link's target.
    pub fn out_list(&self, id: ObjectId) -> Vec<ObjectId> {
        match self.objects.get(id).map(|object| &object.kind) {
            Some(ObjectKind::Group { children }) | Some(ObjectKind::Container { children, .. }) => {
                children.clone()
            }
            Some(ObjectKind::Link { target }) => vec![*target],
            _ => Vec::new(),
        }
    }

    /// Every object reachable through [`Document::out_list`], each once.
    pub fn out_list_recursive(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut visited = HashSet::from([id]);
        let mut result = Vec::new();
        let mut stack: Vec<ObjectId> = self.out_list(id).into_iter().rev().collect();

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            result.push(node);
            stack.extend(self.out_list(node).into_iter().rev());
        }
        result
    }

    /// Finds the object called `name` inside `part` (or `part` itself).
    pub fn object_in_part(&self, part: ObjectId, name: &str) -> Option<ObjectId> {
        let container = self.objects.get(part)?;
        if container.name == name {
            return Some(part);
        }
        self.out_list_recursive(part)
            .into_iter()
            .find(|id| self.objects.get(*id).is_some_and(|object| object.name == name))
    }

    /// Follows link chains to the final linked object.
    pub fn linked_object(&self, id: ObjectId) -> ObjectId {
        let mut current = id;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match self.objects.get(current).map(|object| &object.kind) {
                Some(ObjectKind::Link { target }) => current = *target,
                _ => return current,
            }
        }
        warn!("link chain starting at object {} does not terminate", id.index());
        current
    }

    /// Looks up a named sub-element on the geometry behind `id`.
    pub fn element(&self, id: ObjectId, element: &str) -> Option<&Element> {
        match &self.objects.get(self.linked_object(id))?.kind {
            ObjectKind::Feature { shape } => shape.element(element),
            _ => None,
        }
    }

    /// Direct child assemblies of `assembly`.
    pub fn sub_assemblies(&self, assembly: ObjectId) -> Vec<ObjectId> {
        self.objects
            .get(assembly)
            .map(|object| {
                object
                    .children()
                    .iter()
                    .copied()
                    .filter(|child| self.objects.get(*child).is_some_and(DocObject::is_assembly))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ---- placement resolution ----------------------------------------------

    /// Placement of `target` in the document-root frame.
    ///
    /// With a `container`, only a path to `target` that passes through the
    /// container counts, which disambiguates objects reachable through
    /// several links. Falls back to identity when no root reaches `target`.
    pub fn global_placement(&self, target: ObjectId, container: Option<ObjectId>) -> Placement {
        let in_container_branch = container.is_none();
        for root in &self.roots {
            if let Some(found) =
                self.placement_relative_to(target, *root, container, in_container_branch, false, 0)
            {
                return found;
            }
        }
        Placement::IDENTITY
    }

    fn placement_relative_to(
        &self,
        target: ObjectId,
        node: ObjectId,
        container: Option<ObjectId>,
        in_container_branch: bool,
        ignore_placement: bool,
        depth: usize,
    ) -> Option<Placement> {
        if depth > MAX_HIERARCHY_DEPTH {
            return None;
        }
        let object = self.objects.get(node)?;
        let in_container_branch =
            in_container_branch || (!ignore_placement && Some(node) == container);

        if target == node && in_container_branch && !ignore_placement {
            return Some(object.placement);
        }

        match &object.kind {
            ObjectKind::Group { children } => children.iter().find_map(|child| {
                self.placement_relative_to(
                    target,
                    *child,
                    container,
                    in_container_branch,
                    ignore_placement,
                    depth + 1,
                )
            }),
            ObjectKind::Container { children, .. } => {
                let found = children.iter().find_map(|child| {
                    self.placement_relative_to(
                        target,
                        *child,
                        container,
                        in_container_branch,
                        false,
                        depth + 1,
                    )
                })?;
                Some(if ignore_placement {
                    found
                } else {
                    object.placement * found
                })
            }
            ObjectKind::Link { target: linked } => {
                // The outermost link's placement stands in for every link
                // and container it points through.
                let linked = self.linked_object(*linked);
                if let Some(ObjectKind::Container {
                    kind: ContainerKind::Part | ContainerKind::Assembly,
                    children,
                }) = self.objects.get(linked).map(|object| &object.kind)
                {
                    let found = children.iter().find_map(|child| {
                        self.placement_relative_to(
                            target,
                            *child,
                            container,
                            in_container_branch,
                            false,
                            depth + 1,
                        )
                    });
                    if let Some(found) = found {
                        return Some(object.placement * found);
                    }
                }

                let found = self.placement_relative_to(
                    target,
                    linked,
                    container,
                    in_container_branch,
                    true,
                    depth + 1,
                )?;
                Some(if ignore_placement {
                    found
                } else {
                    object.placement * found
                })
            }
            ObjectKind::Feature { .. } => None,
        }
    }

    // ---- joint groups ------------------------------------------------------

    pub fn add_joint(&mut self, assembly: ObjectId, joint: Joint) -> JointId {
        let id = self.joints.insert(joint);
        self.groups.entry(assembly).or_default().joints.push(id);
        self.joint_revisions.insert(id, 0);
        id
    }

    pub fn add_ground_joint(&mut self, assembly: ObjectId, joint: GroundJoint) -> GroundJointId {
        let id = self.grounds.insert(joint);
        self.groups.entry(assembly).or_default().grounds.push(id);
        id
    }

    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id)
    }

    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut Joint> {
        self.joints.get_mut(id)
    }

    pub fn ground_joint(&self, id: GroundJointId) -> Option<&GroundJoint> {
        self.grounds.get(id)
    }

    pub fn ground_joint_mut(&mut self, id: GroundJointId) -> Option<&mut GroundJoint> {
        self.grounds.get_mut(id)
    }

    pub fn remove_joint(&mut self, id: JointId) -> Option<Joint> {
        let removed = self.joints.remove(id)?;
        for group in self.groups.values_mut() {
            group.joints.retain(|joint| *joint != id);
        }
        self.joint_revisions.remove(&id);
        Some(removed)
    }

    /// Every joint of the assembly's own group, activated or not.
    pub fn joint_ids(&self, assembly: ObjectId) -> Vec<JointId> {
        self.groups
            .get(&assembly)
            .map(|group| group.joints.clone())
            .unwrap_or_default()
    }

    pub fn ground_joint_ids(&self, assembly: ObjectId) -> Vec<GroundJointId> {
        self.groups
            .get(&assembly)
            .map(|group| group.grounds.clone())
            .unwrap_or_default()
    }

    /// `"<document>#<joint>"`.
    pub fn joint_full_name(&self, id: JointId) -> Option<String> {
        self.joints
            .get(id)
            .map(|joint| format!("{}#{}", self.name, joint.name))
    }

    pub fn ground_joint_full_name(&self, id: GroundJointId) -> Option<String> {
        self.grounds
            .get(id)
            .map(|joint| format!("{}#{}", self.name, joint.name))
    }

    pub fn joint_activated(&self, id: JointId) -> bool {
        self.joints.get(id).is_some_and(|joint| joint.activated)
    }

    pub fn set_joint_activated(&mut self, id: JointId, activated: bool) {
        if let Some(joint) = self.joints.get_mut(id) {
            joint.activated = activated;
        }
    }

    /// Marks a joint's placements as changed so dependents recompute.
    pub fn touch_joint(&mut self, id: JointId) {
        if let Some(revision) = self.joint_revisions.get_mut(&id) {
            *revision += 1;
        }
    }

    pub fn joint_revision(&self, id: JointId) -> u64 {
        self.joint_revisions.get(&id).copied().unwrap_or(0)
    }

    /// Why a joint cannot take part in a solve, if it cannot.
    pub fn joint_defect(&self, id: JointId) -> Option<JointDefect> {
        let joint = self.joints.get(id)?;
        let part1 = joint.first.part.filter(|part| self.contains(*part));
        let part2 = joint.second.part.filter(|part| self.contains(*part));
        match (part1, part2) {
            (Some(a), Some(b)) if a == b => Some(JointDefect::SelfReferencing),
            (Some(_), Some(_)) => None,
            _ => Some(JointDefect::Incomplete),
        }
    }

    /// Activated, complete, non-self-referencing joints of `assembly`
    /// followed by those of its direct sub-assemblies.
    pub fn active_joints(&self, assembly: ObjectId) -> Vec<JointId> {
        let mut result: Vec<JointId> = self
            .joint_ids(assembly)
            .into_iter()
            .filter(|id| self.joint_activated(*id) && self.joint_defect(*id).is_none())
            .collect();

        for sub in self.sub_assemblies(assembly) {
            result.extend(self.active_joints(sub));
        }
        result
    }

    /// Removes every incomplete or self-referencing joint of `assembly`.
    pub fn remove_bad_joints(&mut self, assembly: ObjectId) -> Vec<Joint> {
        let bad: Vec<JointId> = self
            .joint_ids(assembly)
            .into_iter()
            .filter(|id| self.joint_defect(*id).is_some())
            .collect();
        bad.into_iter()
            .filter_map(|id| {
                warn!("removing invalid joint {}", self.joint_full_name(id).unwrap_or_default());
                self.remove_joint(id)
            })
            .collect()
    }

    /// Resets each side's frame from the element it references, when the
    /// geometry exposes one.
    pub fn refresh_joint_frames(&mut self, id: JointId) {
        let Some(joint) = self.joints.get(id) else {
            return;
        };
        let frames: Vec<(Side, Placement)> = [Side::First, Side::Second]
            .into_iter()
            .filter_map(|side| {
                let end = joint.side(side);
                let object = self.object_in_part(end.part?, &end.object)?;
                let frame = self.element(object, &end.element)?.frame?;
                Some((side, frame))
            })
            .collect();

        if let Some(joint) = self.joints.get_mut(id) {
            for (side, frame) in frames {
                joint.side_mut(side).placement = frame;
            }
        }
    }
}

/// Reason a joint is excluded before connectivity analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointDefect {
    /// One side's part is unset or no longer in the document.
    Incomplete,
    /// Both sides resolve to the same part.
    SelfReferencing,
}
