use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use approx::assert_relative_eq;
use assembly_mbd::{
    AssemblySolver, ContainerKind, Document, GroundJoint, Joint, JointKind, JointSide, NoopSolver,
    Placement, Shape, DQuat, DVec3,
};
use parking_lot::Mutex;

fn at(x: f64, y: f64, z: f64) -> Placement {
    Placement::from_translation(DVec3::new(x, y, z))
}

#[test]
fn test_linked_part_marker_is_relative_to_the_link() {
    let mut doc = Document::new("Doc");
    let library = doc.add_part("Library", at(100.0, 0.0, 0.0), None);
    doc.add_feature("Bolt", at(0.0, 1.0, 0.0), Shape::new(), Some(library));

    let assembly = doc.add_assembly("Assembly", at(0.0, 0.0, 2.0), None);
    let base = doc.add_part("Base", Placement::IDENTITY, Some(assembly));
    let link = doc.add_link(
        "BoltLink",
        library,
        Placement::new(DVec3::new(5.0, 0.0, 0.0), DQuat::from_rotation_z(FRAC_PI_2)),
        Some(assembly),
    );
    doc.add_ground_joint(assembly, GroundJoint::new("Ground", base, Placement::IDENTITY));
    doc.add_joint(
        assembly,
        Joint::new(
            "Seat",
            JointKind::Fixed,
            JointSide::new(base, "Base", "Face1"),
            JointSide::new(link, "Bolt", "Face3").with_placement(at(0.0, 0.0, 0.5)),
        ),
    );

    let mut solver = AssemblySolver::new(Arc::new(Mutex::new(doc)), assembly);
    solver.set_backend(NoopSolver::new());
    solver.solve(false, false).unwrap();

    let model = solver.model();
    let seat = model.find_joint("Doc#Seat").unwrap();
    let marker = model.marker(seat.marker_j).unwrap();
    assert_relative_eq!(marker.position.x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(marker.position.y, 1.0, epsilon = 1e-12);
    assert_relative_eq!(marker.position.z, 0.5, epsilon = 1e-12);

    let body = model.body(solver.body_of(link).unwrap()).unwrap();
    assert_eq!(body.name, "Doc#BoltLink");
    assert_relative_eq!(body.position.x, 5.0, epsilon = 1e-12);
}

#[test]
fn test_sub_assembly_joints_are_included() {
    let mut doc = Document::new("Doc");
    let assembly = doc.add_assembly("Assembly", Placement::IDENTITY, None);
    let base = doc.add_part("Base", Placement::IDENTITY, Some(assembly));
    let sub = doc.add_assembly("Sub", at(0.0, 3.0, 0.0), Some(assembly));
    let inner = doc.add_part("Inner", Placement::IDENTITY, Some(sub));
    let body = doc.add_container("Body", ContainerKind::Body, at(1.0, 0.0, 0.0), Some(inner));
    doc.add_feature("Pad", Placement::IDENTITY, Shape::new(), Some(body));

    doc.add_ground_joint(assembly, GroundJoint::new("Ground", base, Placement::IDENTITY));
    doc.add_joint(
        assembly,
        Joint::new(
            "Outer",
            JointKind::Ball,
            JointSide::new(base, "Base", "Vertex1"),
            JointSide::new(inner, "Pad", "Vertex1"),
        ),
    );
    let other = doc.add_part("Other", Placement::IDENTITY, Some(sub));
    doc.add_joint(
        sub,
        Joint::new(
            "InnerJoint",
            JointKind::Revolute,
            JointSide::new(inner, "Inner", "Face1"),
            JointSide::new(other, "Other", "Face1"),
        ),
    );

    let mut solver = AssemblySolver::new(Arc::new(Mutex::new(doc)), assembly);
    solver.set_backend(NoopSolver::new());
    solver.solve(false, false).unwrap();

    let model = solver.model();
    assert!(model.find_joint("Doc#InnerJoint").is_some());
    assert_eq!(model.bodies.len(), 3);

    let outer = model.find_joint("Doc#Outer").unwrap();
    let pad_marker = model.marker(outer.marker_j).unwrap();
    assert_relative_eq!(pad_marker.position.x, 1.0, epsilon = 1e-12);
    assert_relative_eq!(pad_marker.position.y, 0.0, epsilon = 1e-12);
}

#[test]
fn test_link_to_link_uses_the_outer_placement_only() {
    let mut doc = Document::new("Doc");
    let library = doc.add_part("Library", at(100.0, 0.0, 0.0), None);
    doc.add_feature("Bolt", at(0.0, 1.0, 0.0), Shape::new(), Some(library));
    let alias = doc.add_link("Alias", library, at(50.0, 0.0, 0.0), None);

    let assembly = doc.add_assembly("Assembly", at(0.0, 0.0, 2.0), None);
    let base = doc.add_part("Base", Placement::IDENTITY, Some(assembly));
    let link = doc.add_link(
        "BoltLink",
        alias,
        Placement::new(DVec3::new(5.0, 0.0, 0.0), DQuat::from_rotation_z(FRAC_PI_2)),
        Some(assembly),
    );
    doc.add_ground_joint(assembly, GroundJoint::new("Ground", base, Placement::IDENTITY));
    doc.add_joint(
        assembly,
        Joint::new(
            "Seat",
            JointKind::Fixed,
            JointSide::new(base, "Base", "Face1"),
            JointSide::new(link, "Bolt", "Face3").with_placement(at(0.0, 0.0, 0.5)),
        ),
    );

    let global = doc.global_placement(doc.find_by_name("Bolt").unwrap(), Some(link));
    assert_relative_eq!(global.position.x, 4.0, epsilon = 1e-12);
    assert_relative_eq!(global.position.y, 0.0, epsilon = 1e-12);
    assert_relative_eq!(global.position.z, 2.0, epsilon = 1e-12);

    let mut solver = AssemblySolver::new(Arc::new(Mutex::new(doc)), assembly);
    solver.set_backend(NoopSolver::new());
    solver.solve(false, false).unwrap();

    let model = solver.model();
    let seat = model.find_joint("Doc#Seat").unwrap();
    let marker = model.marker(seat.marker_j).unwrap();
    assert_relative_eq!(marker.position.x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(marker.position.y, 1.0, epsilon = 1e-12);
    assert_relative_eq!(marker.position.z, 0.5, epsilon = 1e-12);
}
