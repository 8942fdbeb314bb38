use std::sync::Arc;

use approx::assert_relative_eq;
use assembly_mbd::{
    status_code, AssemblySolver, Document, GroundJoint, Joint, JointKind, JointSide, MbdJointKind,
    MbdModel, NoopSolver, ObjectId, Placement, SolveError, SolveSettings, SolveState,
    SolverBackend, SolverError, DVec3,
};
use assembly_mbd::model::BodyHandle;
use assembly_mbd::solver::SolverResult;
use parking_lot::Mutex;

fn at(x: f64, y: f64, z: f64) -> Placement {
    Placement::from_translation(DVec3::new(x, y, z))
}

struct Rig {
    doc: Arc<Mutex<Document>>,
    assembly: ObjectId,
}

impl Rig {
    fn new() -> Self {
        let mut doc = Document::new("Doc");
        let assembly = doc.add_assembly("Assembly", Placement::IDENTITY, None);
        Self {
            doc: Arc::new(Mutex::new(doc)),
            assembly,
        }
    }

    fn part(&self, name: &str, placement: Placement) -> ObjectId {
        self.doc.lock().add_part(name, placement, Some(self.assembly))
    }

    fn ground(&self, part: ObjectId, placement: Placement) {
        let name = format!("Ground{}", part.index());
        self.doc
            .lock()
            .add_ground_joint(self.assembly, GroundJoint::new(name, part, placement));
    }

    fn joint(&self, name: &str, kind: JointKind, a: (ObjectId, &str), b: (ObjectId, &str)) -> assembly_mbd::JointId {
        self.doc.lock().add_joint(
            self.assembly,
            Joint::new(name, kind, JointSide::new(a.0, a.1, "Face1"), JointSide::new(b.0, b.1, "Face1")),
        )
    }

    fn solver(&self) -> AssemblySolver {
        AssemblySolver::new(Arc::clone(&self.doc), self.assembly)
    }

    fn placement(&self, part: ObjectId) -> Placement {
        self.doc.lock().placement(part).unwrap()
    }
}

struct FailingSolver;

impl SolverBackend for FailingSolver {
    fn name(&self) -> &str {
        "failing"
    }

    fn pre_drag(&mut self, model: &mut MbdModel) -> SolverResult<()> {
        // Scribble on the model first: the document must still stay untouched.
        for body in &mut model.bodies {
            body.position += DVec3::splat(100.0);
        }
        Err(SolverError::Singular)
    }

    fn drag_step(&mut self, _model: &mut MbdModel, _dragged: &[BodyHandle]) -> SolverResult<()> {
        Err(SolverError::Singular)
    }
}

#[test]
fn test_missing_part_joint_is_dropped() {
    let rig = Rig::new();
    let a = rig.part("A", Placement::IDENTITY);
    let b = rig.part("B", at(1.0, 0.0, 0.0));
    let c = rig.part("C", at(2.0, 0.0, 0.0));
    let d = rig.part("D", at(3.0, 0.0, 0.0));
    rig.ground(a, Placement::IDENTITY);
    rig.joint("AB", JointKind::Revolute, (a, "A"), (b, "B"));
    rig.joint("BC", JointKind::Slider, (b, "B"), (c, "C"));
    rig.joint("CD", JointKind::Fixed, (c, "C"), (d, "D"));
    rig.doc.lock().remove_object(d);

    let mut solver = rig.solver();
    solver.solve(false, true).unwrap();

    let model = solver.model();
    assert_eq!(model.bodies.len(), 3);
    assert_eq!(model.joints.len(), 3);
    let kinds: Vec<_> = model.joints.iter().map(|joint| joint.kind).collect();
    assert_eq!(
        kinds,
        vec![MbdJointKind::Fixed, MbdJointKind::Revolute, MbdJointKind::Translational]
    );
    assert!(model.find_joint("Doc#CD").is_none());
    assert_eq!(solver.state(), SolveState::Solved);
}

#[test]
fn test_single_grounded_part() {
    let rig = Rig::new();
    let a = rig.part("A", Placement::IDENTITY);
    rig.ground(a, Placement::IDENTITY);

    let mut solver = rig.solver();
    assert_eq!(status_code(&solver.solve(false, false)), 0);
    let model = solver.model();
    assert_eq!(model.bodies.len(), 1);
    assert_eq!(model.joints.len(), 1);
    assert!(model.limits.is_empty());
    assert_eq!(model.markers.len(), 1);
}

#[test]
fn test_no_grounded_part_fails_before_building() {
    let rig = Rig::new();
    let a = rig.part("A", Placement::IDENTITY);
    let b = rig.part("B", Placement::IDENTITY);
    rig.joint("AB", JointKind::Fixed, (a, "A"), (b, "B"));

    let mut solver = rig.solver();
    let result = solver.solve(false, true);
    assert!(matches!(result, Err(SolveError::NoGroundedParts)));
    assert_eq!(status_code(&result), -6);
    assert!(solver.model().bodies.is_empty());
    assert_eq!(solver.state(), SolveState::Failed);
}

#[test]
fn test_unconnected_joints_are_pruned() {
    let rig = Rig::new();
    let a = rig.part("A", Placement::IDENTITY);
    let b = rig.part("B", Placement::IDENTITY);
    let e = rig.part("E", Placement::IDENTITY);
    let f = rig.part("F", Placement::IDENTITY);
    rig.ground(a, Placement::IDENTITY);
    rig.joint("AB", JointKind::Ball, (a, "A"), (b, "B"));
    rig.joint("EF", JointKind::Fixed, (e, "E"), (f, "F"));
    rig.joint("BE", JointKind::Gears, (b, "B"), (e, "E"));

    let mut solver = rig.solver();
    solver.solve(false, true).unwrap();
    assert_eq!(solver.profile().pruned_joint_count, 2);
    assert_eq!(solver.profile().body_count, 2);
    assert!(solver.body_of(e).is_none());
}

#[test]
fn test_solver_failure_leaves_placements() {
    let rig = Rig::new();
    let a = rig.part("A", at(0.0, 0.0, 1.0));
    let b = rig.part("B", at(4.0, 0.0, 0.0));
    rig.ground(a, Placement::IDENTITY);
    rig.joint("AB", JointKind::Revolute, (a, "A"), (b, "B"));

    let mut solver = rig.solver();
    solver.set_backend(FailingSolver);
    let result = solver.solve(true, true);

    assert!(matches!(result, Err(SolveError::SolverFailed(SolverError::Singular))));
    assert_eq!(status_code(&result), -1);
    assert_eq!(rig.placement(a), at(0.0, 0.0, 1.0));
    assert_eq!(rig.placement(b), at(4.0, 0.0, 0.0));
    assert_eq!(solver.state(), SolveState::Failed);
}

#[test]
fn test_fixed_chain_is_written_back() {
    let rig = Rig::new();
    let a = rig.part("A", Placement::IDENTITY);
    let b = rig.part("B", at(7.0, 7.0, 7.0));
    rig.ground(a, at(0.0, 0.0, 5.0));
    let ab = rig.doc.lock().add_joint(
        rig.assembly,
        Joint::new(
            "AB",
            JointKind::Fixed,
            JointSide::new(a, "A", "Face1").with_placement(at(1.0, 0.0, 0.0)),
            JointSide::new(b, "B", "Face1"),
        ),
    );

    let mut solver = rig.solver();
    let revision = rig.doc.lock().joint_revision(ab);
    solver.solve(false, true).unwrap();

    let pa = rig.placement(a);
    let pb = rig.placement(b);
    assert_relative_eq!(pa.position.z, 5.0, epsilon = 1e-12);
    assert_relative_eq!(pb.position.x, 1.0, epsilon = 1e-12);
    assert_relative_eq!(pb.position.z, 5.0, epsilon = 1e-12);
    assert_eq!(rig.doc.lock().joint_revision(ab), revision + 1);
}

#[test]
fn test_undo_round_trip() {
    let rig = Rig::new();
    let a = rig.part("A", at(0.5, 0.25, 0.0));
    rig.ground(a, at(0.0, 0.0, 3.0));

    let mut solver = rig.solver();
    solver.solve(true, true).unwrap();
    assert!(solver.has_undo());
    assert_relative_eq!(rig.placement(a).position.z, 3.0, epsilon = 1e-12);

    solver.undo_solve();
    assert_eq!(rig.placement(a), at(0.5, 0.25, 0.0));
    assert!(!solver.has_undo());

    rig.doc.lock().set_placement(a, at(9.0, 0.0, 0.0));
    solver.undo_solve();
    assert_eq!(rig.placement(a), at(9.0, 0.0, 0.0));
}

#[test]
fn test_clear_undo_drops_snapshot() {
    let rig = Rig::new();
    let a = rig.part("A", Placement::IDENTITY);
    rig.ground(a, at(1.0, 0.0, 0.0));

    let mut solver = rig.solver();
    solver.solve(true, false).unwrap();
    solver.clear_undo();
    solver.undo_solve();
    assert_relative_eq!(rig.placement(a).position.x, 1.0, epsilon = 1e-12);
}

#[test]
fn test_recompute_respects_settings() {
    let rig = Rig::new();
    let a = rig.part("A", Placement::IDENTITY);
    rig.ground(a, at(2.0, 0.0, 0.0));

    let settings = SolveSettings {
        solve_on_recompute: false,
        ..SolveSettings::default()
    };
    let mut solver = rig.solver().with_settings(settings);
    solver.recompute().unwrap();
    assert_eq!(solver.state(), SolveState::Idle);
    assert_eq!(rig.placement(a), Placement::IDENTITY);

    solver.settings_mut().solve_on_recompute = true;
    solver.settings_mut().enable_undo = true;
    solver.recompute().unwrap();
    assert_eq!(solver.state(), SolveState::Solved);
    assert!(solver.has_undo());
}

#[test]
fn test_bad_joints_deleted_only_when_configured() {
    let rig = Rig::new();
    let a = rig.part("A", Placement::IDENTITY);
    rig.ground(a, Placement::IDENTITY);
    let selfish = rig.joint("AA", JointKind::Fixed, (a, "A"), (a, "A"));

    let mut solver = rig.solver();
    solver.solve(false, true).unwrap();
    assert!(rig.doc.lock().joint(selfish).is_some());

    solver.settings_mut().delete_bad_joints = true;
    solver.solve(false, true).unwrap();
    assert!(rig.doc.lock().joint(selfish).is_none());
}

#[test]
fn test_masses_reach_the_model() {
    let rig = Rig::new();
    let a = rig.part("A", Placement::IDENTITY);
    let b = rig.part("B", Placement::IDENTITY);
    rig.ground(a, Placement::IDENTITY);
    rig.joint("AB", JointKind::Cylindrical, (a, "A"), (b, "B"));

    let mut solver = rig.solver();
    solver.set_backend(NoopSolver::new());
    solver.set_object_masses([(b, 12.5)]);
    solver.solve(false, true).unwrap();

    let model = solver.model();
    let body_a = model.body(solver.body_of(a).unwrap()).unwrap();
    let body_b = model.body(solver.body_of(b).unwrap()).unwrap();
    assert_relative_eq!(body_a.mass.mass, 1.0);
    assert_relative_eq!(body_b.mass.mass, 12.5);
    assert_relative_eq!(body_b.mass.density, 1.0);
}

#[test]
fn test_grounded_joint_placements_follow_parts() {
    let rig = Rig::new();
    let a = rig.part("A", at(3.0, 2.0, 1.0));
    rig.ground(a, Placement::IDENTITY);

    let mut solver = rig.solver();
    solver.update_grounded_joints_placements();

    let doc = rig.doc.lock();
    let ground = doc.ground_joint_ids(rig.assembly)[0];
    assert_eq!(doc.ground_joint(ground).unwrap().placement, at(3.0, 2.0, 1.0));
}
