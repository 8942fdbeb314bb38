//! Solve orchestration for one assembly of a shared [`Document`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::config::{SolveSettings, MODEL_NAME};
use crate::core::constraints::{JointId, Side};
use crate::core::document::{Document, ObjectId};
use crate::core::types::Placement;
use crate::error::{SolveError, SolveResult};
use crate::model::builder::ModelBuilder;
use crate::model::connectivity;
use crate::model::mbd::{BodyHandle, MbdModel};
use crate::solver::{RigidChainSolver, SolverBackend};
use crate::utils::profiling::{ScopedTimer, SolveProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveState {
    Idle,
    Building,
    Solved,
    Failed,
}

/// Owns the solver-side state of one assembly: the model of the last pass,
/// the part-to-body map, the undo snapshot and the drag session.
///
/// Every operation takes the document lock for its whole duration.
pub struct AssemblySolver {
    document: Arc<Mutex<Document>>,
    assembly: ObjectId,
    settings: SolveSettings,
    backend: Box<dyn SolverBackend>,
    model: MbdModel,
    parts: HashMap<ObjectId, BodyHandle>,
    masses: HashMap<ObjectId, f64>,
    undo: Vec<(ObjectId, Placement)>,
    drag_bodies: Vec<BodyHandle>,
    state: SolveState,
    profile: SolveProfile,
}

impl AssemblySolver {
    pub fn new(document: Arc<Mutex<Document>>, assembly: ObjectId) -> Self {
        Self {
            document,
            assembly,
            settings: SolveSettings::default(),
            backend: Box::new(RigidChainSolver::new()),
            model: MbdModel::new(MODEL_NAME),
            parts: HashMap::new(),
            masses: HashMap::new(),
            undo: Vec::new(),
            drag_bodies: Vec::new(),
            state: SolveState::Idle,
            profile: SolveProfile::default(),
        }
    }

    pub fn with_settings(mut self, settings: SolveSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn set_backend<B>(&mut self, backend: B)
    where
        B: SolverBackend + 'static,
    {
        self.backend = Box::new(backend);
    }

    pub fn settings(&self) -> &SolveSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SolveSettings {
        &mut self.settings
    }

    pub fn document(&self) -> &Arc<Mutex<Document>> {
        &self.document
    }

    pub fn assembly(&self) -> ObjectId {
        self.assembly
    }

    pub fn state(&self) -> SolveState {
        self.state
    }

    /// Model of the last build pass.
    pub fn model(&self) -> &MbdModel {
        &self.model
    }

    pub fn body_of(&self, part: ObjectId) -> Option<BodyHandle> {
        self.parts.get(&part).copied()
    }

    pub fn profile(&self) -> &SolveProfile {
        &self.profile
    }

    pub fn has_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Masses used for the bodies of the next passes. Objects not listed
    /// keep the default mass.
    pub fn set_object_masses<I>(&mut self, masses: I)
    where
        I: IntoIterator<Item = (ObjectId, f64)>,
    {
        self.masses = masses.into_iter().collect();
    }

    pub fn object_mass(&self, object: ObjectId) -> Option<f64> {
        self.masses.get(&object).copied()
    }

    // ---- solving -----------------------------------------------------------

    /// Rebuilds the model, solves it and writes the solved placements back
    /// to the document. On failure the document placements are untouched.
    pub fn solve(&mut self, enable_undo: bool, update_joint_frames: bool) -> SolveResult<()> {
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();

        self.profile.reset();
        self.state = SolveState::Building;
        self.reset_model();

        let grounded = self.fix_grounded_parts(&mut doc);
        if grounded.is_empty() {
            warn!("{} has no grounded part, it cannot be solved.", MODEL_NAME);
            self.state = SolveState::Failed;
            return Err(SolveError::NoGroundedParts);
        }

        let mut joints = self.collect_joints(&mut doc, update_joint_frames);
        {
            let _timer = ScopedTimer::new("prune", &mut self.profile.prune_time);
            let removed = connectivity::prune_unconnected(&doc, &mut joints, &grounded);
            self.profile.pruned_joint_count = removed.len();
        }
        self.build_joints(&mut doc, &joints);

        if enable_undo {
            self.save_placements_for_undo(&doc);
        }

        let solved = {
            let _timer = ScopedTimer::new("solver", &mut self.profile.solver_time);
            self.backend.pre_drag(&mut self.model)
        };
        if let Err(err) = solved {
            error!("Solve failed ({} backend): {err}", self.backend.name());
            self.state = SolveState::Failed;
            return Err(err.into());
        }

        {
            let _timer = ScopedTimer::new("write-back", &mut self.profile.write_back_time);
            write_back_placements(&self.parts, &self.model, &mut doc);
            redraw_joint_placements(&mut doc, &joints);
        }

        self.record_counts();
        self.profile.report();
        self.state = SolveState::Solved;
        Ok(())
    }

    /// Solves with the configured settings when solve-on-recompute is on.
    pub fn recompute(&mut self) -> SolveResult<()> {
        if !self.settings.solve_on_recompute {
            return Ok(());
        }
        let SolveSettings {
            enable_undo,
            update_joint_frames,
            ..
        } = self.settings;
        self.solve(enable_undo, update_joint_frames)
    }

    // ---- dragging ----------------------------------------------------------

    /// Baseline solve, then primes the backend for dragging `parts`.
    pub fn pre_drag(&mut self, parts: &[ObjectId]) -> SolveResult<()> {
        self.solve(false, true)?;

        let mut bodies = Vec::with_capacity(parts.len());
        for part in parts {
            let Some(handle) = self.parts.get(part) else {
                let name = self.document.lock().full_name(*part).unwrap_or_default();
                return Err(SolveError::UnknownDragPart(name));
            };
            bodies.push(*handle);
        }
        self.drag_bodies = bodies;

        self.backend.pre_drag(&mut self.model)?;
        Ok(())
    }

    /// One incremental step from the current document placements of the
    /// dragged parts. A failing step leaves the document as it was.
    pub fn drag_step(&mut self) {
        if let Err(err) = self.try_drag_step() {
            debug!("drag step ignored: {err}");
        }
    }

    fn try_drag_step(&mut self) -> SolveResult<()> {
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();

        for handle in &self.drag_bodies {
            let Some(part) = self
                .parts
                .iter()
                .find_map(|(part, body)| (body == handle).then_some(*part))
            else {
                continue;
            };
            let (Some(placement), Some(body)) = (doc.placement(part), self.model.body_mut(*handle))
            else {
                continue;
            };
            body.set_placement(placement);
        }

        self.backend.drag_step(&mut self.model, &self.drag_bodies)?;

        write_back_placements(&self.parts, &self.model, &mut doc);
        let joints = doc.active_joints(self.assembly);
        redraw_joint_placements(&mut doc, &joints);
        Ok(())
    }

    pub fn post_drag(&mut self) -> SolveResult<()> {
        self.drag_bodies.clear();
        self.backend.post_drag(&mut self.model)?;
        Ok(())
    }

    // ---- undo --------------------------------------------------------------

    /// Restores the placements captured by the last snapshot and forgets it.
    /// Does nothing without a snapshot.
    pub fn undo_solve(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        let mut doc = self.document.lock();
        for (object, placement) in self.undo.drain(..) {
            doc.set_placement(object, placement);
        }
        for joint in doc.active_joints(self.assembly) {
            doc.refresh_joint_frames(joint);
        }
    }

    pub fn clear_undo(&mut self) {
        self.undo.clear();
    }

    fn save_placements_for_undo(&mut self, doc: &Document) {
        let mut snapshot: Vec<(ObjectId, Placement)> = self
            .parts
            .keys()
            .filter_map(|part| doc.placement(*part).map(|placement| (*part, placement)))
            .collect();
        snapshot.sort_by_key(|(part, _)| *part);
        self.undo = snapshot;
    }

    // ---- export ------------------------------------------------------------

    /// Builds the model without pruning or solving and writes it as text.
    pub fn export_model(&mut self, path: impl AsRef<Path>) -> SolveResult<()> {
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();

        self.reset_model();
        self.fix_grounded_parts(&mut doc);
        let joints = self.collect_joints(&mut doc, true);
        self.build_joints(&mut doc, &joints);

        self.model.export(path.as_ref())?;
        info!("exported {} to {}", self.model.name, path.as_ref().display());
        Ok(())
    }

    // ---- ground bookkeeping ------------------------------------------------

    /// Copies each grounded object's current placement into its ground joint.
    pub fn update_grounded_joints_placements(&mut self) {
        let mut doc = self.document.lock();
        for id in doc.ground_joint_ids(self.assembly) {
            let Some(placement) = doc
                .ground_joint(id)
                .and_then(|ground| ground.object)
                .and_then(|object| doc.placement(object))
            else {
                continue;
            };
            if let Some(ground) = doc.ground_joint_mut(id) {
                ground.placement = placement;
            }
        }
    }

    // ---- connectivity queries ----------------------------------------------

    pub fn grounded_parts(&self) -> Vec<ObjectId> {
        connectivity::grounded_parts(&self.document.lock(), self.assembly)
    }

    pub fn is_part_grounded(&self, part: ObjectId) -> bool {
        connectivity::is_part_grounded(&self.document.lock(), self.assembly, part)
    }

    pub fn is_part_connected(&self, part: ObjectId) -> bool {
        connectivity::is_part_connected(&self.document.lock(), self.assembly, part)
    }

    pub fn joints_of_part(&self, part: ObjectId) -> Vec<JointId> {
        connectivity::joints_of_part(&self.document.lock(), self.assembly, part)
    }

    pub fn is_joint_connecting_part_to_ground(&self, joint: JointId, side: Side) -> bool {
        connectivity::is_joint_connecting_part_to_ground(&mut self.document.lock(), self.assembly, joint, side)
    }

    pub fn joint_of_part_connecting_to_ground(&self, part: ObjectId) -> Option<(JointId, Side)> {
        connectivity::joint_of_part_connecting_to_ground(&mut self.document.lock(), self.assembly, part)
    }

    pub fn upstream_parts(&self, part: ObjectId) -> Vec<ObjectId> {
        connectivity::upstream_parts(&mut self.document.lock(), self.assembly, part)
    }

    pub fn upstream_moving_part(&self, part: ObjectId) -> Option<ObjectId> {
        connectivity::upstream_moving_part(&mut self.document.lock(), self.assembly, part)
    }

    pub fn downstream_parts(&self, part: ObjectId, joint: JointId) -> Vec<ObjectId> {
        connectivity::downstream_parts(&mut self.document.lock(), self.assembly, part, joint)
    }

    // ---- passes ------------------------------------------------------------

    fn reset_model(&mut self) {
        self.model = MbdModel::new(MODEL_NAME);
        self.parts.clear();
    }

    fn fix_grounded_parts(&mut self, doc: &mut Document) -> Vec<ObjectId> {
        let _timer = ScopedTimer::new("ground", &mut self.profile.build_time);
        let grounds = doc.ground_joint_ids(self.assembly);
        let mut builder = ModelBuilder::new(doc, &mut self.model, &mut self.parts, &self.masses, Vec::new());

        let mut grounded = Vec::new();
        for ground in grounds {
            if let Some(object) = builder.fix_grounded_part(ground) {
                grounded.push(object);
            }
        }
        grounded
    }

    /// Joints taking part in this pass, optionally with frames refreshed
    /// from their geometry.
    fn collect_joints(&mut self, doc: &mut Document, update_joint_frames: bool) -> Vec<JointId> {
        if self.settings.delete_bad_joints {
            doc.remove_bad_joints(self.assembly);
        }
        let joints = doc.active_joints(self.assembly);
        if update_joint_frames {
            for joint in &joints {
                doc.refresh_joint_frames(*joint);
            }
        }
        joints
    }

    fn build_joints(&mut self, doc: &mut Document, joints: &[JointId]) {
        let _timer = ScopedTimer::new("joints", &mut self.profile.build_time);
        let scan = doc.active_joints(self.assembly);
        let mut builder = ModelBuilder::new(doc, &mut self.model, &mut self.parts, &self.masses, scan);
        let added: usize = joints.iter().map(|joint| builder.build_joint(*joint)).sum();
        debug!("{added} joints and limits built from {} document joints", joints.len());
    }

    fn record_counts(&mut self) {
        self.profile.body_count = self.model.bodies.len();
        self.profile.joint_count = self.model.joints.len();
        self.profile.limit_count = self.model.limits.len();
    }
}

/// Copies solved body placements onto their parts.
fn write_back_placements(parts: &HashMap<ObjectId, BodyHandle>, model: &MbdModel, doc: &mut Document) {
    for (part, handle) in parts {
        if let Some(body) = model.body(*handle) {
            doc.set_placement(*part, body.placement());
        }
    }
}

/// Bumps each joint's revision so its displayed frames follow the parts.
fn redraw_joint_placements(doc: &mut Document, joints: &[JointId]) {
    for joint in joints {
        doc.touch_joint(*joint);
    }
}
