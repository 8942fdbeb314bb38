//! Classification of distance joints by the geometry they reference, and the
//! mapping from each pair type to a solver joint primitive.

use serde::{Deserialize, Serialize};

use super::mbd::MbdJointKind;
use crate::config::PRECISION_CONFUSION;
use crate::core::constraints::{Joint, JointSide};
use crate::core::document::Document;
use crate::core::geometry::{CurveKind, Element, ElementClass, ElementKind, SurfaceKind};

/// Canonical pair of primitive kinds joined by a distance joint. The first
/// named primitive is always on side 1 after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceType {
    PointPoint,

    LineLine,
    LineCircle,
    CircleCircle,

    PlanePlane,
    PlaneCylinder,
    PlaneSphere,
    PlaneCone,
    PlaneTorus,
    CylinderCylinder,
    CylinderSphere,
    CylinderCone,
    CylinderTorus,
    ConeCone,
    ConeTorus,
    ConeSphere,
    TorusTorus,
    TorusSphere,
    SphereSphere,

    PointPlane,
    PointCylinder,
    PointSphere,
    PointCone,
    PointTorus,

    LinePlane,
    LineCylinder,
    LineSphere,
    LineCone,
    LineTorus,

    CurvePlane,
    CurveCylinder,
    CurveSphere,
    CurveCone,
    CurveTorus,

    PointLine,
    PointCurve,

    Other,
}

/// Result of [`classify`]: the pair type and whether the two sides must be
/// exchanged to put the primitives in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub pair: DistanceType,
    pub swapped: bool,
}

impl Classification {
    fn kept(pair: DistanceType) -> Self {
        Self { pair, swapped: false }
    }

    fn new(pair: DistanceType, swapped: bool) -> Self {
        Self { pair, swapped }
    }
}

/// Face priority: the first kind present on either side goes to side 1.
const SURFACE_PRIORITY: [SurfaceKind; 5] = [
    SurfaceKind::Plane,
    SurfaceKind::Cylinder,
    SurfaceKind::Cone,
    SurfaceKind::Torus,
    SurfaceKind::Sphere,
];

/// Classifies two referenced elements.
///
/// The coarse class comes from the element names; the primitive kind from
/// the geometry. A kind the geometry cannot supply behaves like a primitive
/// with no rule.
pub fn classify(
    class1: Option<ElementClass>,
    class2: Option<ElementClass>,
    kind1: Option<ElementKind>,
    kind2: Option<ElementKind>,
) -> Classification {
    use ElementClass::{Edge, Face, Vertex};

    let curve1 = kind1.and_then(|kind| kind.curve());
    let curve2 = kind2.and_then(|kind| kind.curve());
    let surface1 = kind1.and_then(|kind| kind.surface());
    let surface2 = kind2.and_then(|kind| kind.surface());

    match (class1, class2) {
        (Some(Vertex), Some(Vertex)) => Classification::kept(DistanceType::PointPoint),
        (Some(Edge), Some(Edge)) => classify_edges(curve1, curve2),
        (Some(Face), Some(Face)) => classify_faces(surface1, surface2),
        (Some(Vertex), Some(Face)) => Classification::new(point_face(surface2), true),
        (Some(Face), Some(Vertex)) => Classification::new(point_face(surface1), false),
        (Some(Edge), Some(Face)) => Classification::new(edge_face(curve1, surface2), true),
        (Some(Face), Some(Edge)) => Classification::new(edge_face(curve2, surface1), false),
        (Some(Vertex), Some(Edge)) => Classification::new(point_edge(curve2), true),
        (Some(Edge), Some(Vertex)) => Classification::new(point_edge(curve1), false),
        _ => Classification::kept(DistanceType::Other),
    }
}

fn classify_edges(curve1: Option<CurveKind>, curve2: Option<CurveKind>) -> Classification {
    for leading in [CurveKind::Line, CurveKind::Circle] {
        if curve1 != Some(leading) && curve2 != Some(leading) {
            continue;
        }
        let swapped = curve1 != Some(leading);
        let other = if swapped { curve1 } else { curve2 };
        let pair = match (leading, other) {
            (CurveKind::Line, Some(CurveKind::Line)) => DistanceType::LineLine,
            (CurveKind::Line, Some(CurveKind::Circle)) => DistanceType::LineCircle,
            (CurveKind::Circle, Some(CurveKind::Circle)) => DistanceType::CircleCircle,
            _ => DistanceType::Other,
        };
        return Classification::new(pair, swapped);
    }
    Classification::kept(DistanceType::Other)
}

fn classify_faces(surface1: Option<SurfaceKind>, surface2: Option<SurfaceKind>) -> Classification {
    use SurfaceKind::{Cone, Cylinder, Plane, Sphere, Torus};

    for leading in SURFACE_PRIORITY {
        if surface1 != Some(leading) && surface2 != Some(leading) {
            continue;
        }
        let swapped = surface1 != Some(leading);
        let other = if swapped { surface1 } else { surface2 };
        let pair = match (leading, other) {
            (Plane, Some(Plane)) => DistanceType::PlanePlane,
            (Plane, Some(Cylinder)) => DistanceType::PlaneCylinder,
            (Plane, Some(Sphere)) => DistanceType::PlaneSphere,
            (Plane, Some(Cone)) => DistanceType::PlaneCone,
            (Plane, Some(Torus)) => DistanceType::PlaneTorus,
            (Cylinder, Some(Cylinder)) => DistanceType::CylinderCylinder,
            (Cylinder, Some(Sphere)) => DistanceType::CylinderSphere,
            (Cylinder, Some(Cone)) => DistanceType::CylinderCone,
            (Cylinder, Some(Torus)) => DistanceType::CylinderTorus,
            (Cone, Some(Cone)) => DistanceType::ConeCone,
            (Cone, Some(Torus)) => DistanceType::ConeTorus,
            (Cone, Some(Sphere)) => DistanceType::ConeSphere,
            (Torus, Some(Torus)) => DistanceType::TorusTorus,
            (Torus, Some(Sphere)) => DistanceType::TorusSphere,
            (Sphere, Some(Sphere)) => DistanceType::SphereSphere,
            _ => DistanceType::Other,
        };
        return Classification::new(pair, swapped);
    }
    Classification::kept(DistanceType::Other)
}

fn point_face(surface: Option<SurfaceKind>) -> DistanceType {
    match surface {
        Some(SurfaceKind::Plane) => DistanceType::PointPlane,
        Some(SurfaceKind::Cylinder) => DistanceType::PointCylinder,
        Some(SurfaceKind::Sphere) => DistanceType::PointSphere,
        Some(SurfaceKind::Cone) => DistanceType::PointCone,
        Some(SurfaceKind::Torus) => DistanceType::PointTorus,
        _ => DistanceType::Other,
    }
}

fn edge_face(curve: Option<CurveKind>, surface: Option<SurfaceKind>) -> DistanceType {
    let line = curve == Some(CurveKind::Line);
    match (line, surface) {
        (true, Some(SurfaceKind::Plane)) => DistanceType::LinePlane,
        (true, Some(SurfaceKind::Cylinder)) => DistanceType::LineCylinder,
        (true, Some(SurfaceKind::Sphere)) => DistanceType::LineSphere,
        (true, Some(SurfaceKind::Cone)) => DistanceType::LineCone,
        (true, Some(SurfaceKind::Torus)) => DistanceType::LineTorus,
        (false, Some(SurfaceKind::Plane)) => DistanceType::CurvePlane,
        (false, Some(SurfaceKind::Cylinder)) => DistanceType::CurveCylinder,
        (false, Some(SurfaceKind::Sphere)) => DistanceType::CurveSphere,
        (false, Some(SurfaceKind::Cone)) => DistanceType::CurveCone,
        (false, Some(SurfaceKind::Torus)) => DistanceType::CurveTorus,
        _ => DistanceType::Other,
    }
}

fn point_edge(curve: Option<CurveKind>) -> DistanceType {
    if curve == Some(CurveKind::Line) {
        DistanceType::PointLine
    } else {
        DistanceType::PointCurve
    }
}

/// Element referenced by one side of a joint, looked up on the linked geometry.
pub fn side_element<'a>(doc: &'a Document, side: &JointSide) -> Option<&'a Element> {
    let object = doc.object_in_part(side.part?, &side.object)?;
    doc.element(object, &side.element)
}

/// Contact radius of the element referenced by `side`; 0 when it is not a
/// circle, cylinder or sphere, or cannot be resolved.
pub fn side_radius(doc: &Document, side: &JointSide) -> f64 {
    side_element(doc, side).map_or(0.0, Element::contact_radius)
}

/// Classifies a distance joint, swapping its sides in place when the
/// referenced primitives are not in canonical order.
pub fn classify_joint(doc: &Document, joint: &mut Joint) -> DistanceType {
    let kind1 = side_element(doc, &joint.first).map(|element| element.kind);
    let kind2 = side_element(doc, &joint.second).map(|element| element.kind);
    let result = classify(
        ElementClass::from_element_name(&joint.first.element),
        ElementClass::from_element_name(&joint.second.element),
        kind1,
        kind2,
    );
    if result.swapped {
        joint.swap_sides();
    }
    result.pair
}

/// Solver primitive for a classified distance joint.
///
/// `radius1`/`radius2` are the contact radii of the canonical sides. Pairs
/// without a dedicated rule fall back to a planar joint at the base distance.
pub fn distance_joint_kind(
    pair: DistanceType,
    distance: f64,
    radius1: f64,
    radius2: f64,
) -> MbdJointKind {
    use DistanceType as D;

    match pair {
        D::PointPoint if distance < PRECISION_CONFUSION => MbdJointKind::Spherical,
        D::PointPoint => MbdJointKind::SphSph { distance },

        D::LineLine => MbdJointKind::RevCyl { distance },
        D::LineCircle => MbdJointKind::RevCyl {
            distance: distance + radius2,
        },
        D::CircleCircle | D::CylinderCylinder | D::CylinderTorus => MbdJointKind::RevCyl {
            distance: distance + radius1 + radius2,
        },

        D::PlanePlane | D::PlaneTorus | D::TorusTorus => MbdJointKind::Planar { offset: distance },
        D::PlaneCylinder => MbdJointKind::LineInPlane {
            offset: distance + radius2,
        },
        D::PlaneSphere => MbdJointKind::PointInPlane {
            offset: distance + radius2,
        },
        D::CylinderSphere | D::TorusSphere => MbdJointKind::CylSph {
            distance: distance + radius1 + radius2,
        },
        D::SphereSphere => MbdJointKind::SphSph {
            distance: distance + radius1 + radius2,
        },

        D::PointPlane | D::PointCurve => MbdJointKind::PointInPlane { offset: distance },
        D::PointCylinder => MbdJointKind::CylSph {
            distance: distance + radius1,
        },
        D::PointSphere => MbdJointKind::SphSph {
            distance: distance + radius1,
        },

        D::LinePlane => MbdJointKind::LineInPlane { offset: distance },
        D::PointLine => MbdJointKind::CylSph { distance },

        // Cones, tori against points/lines, and free curves on faces have no
        // dedicated primitive yet.
        _ => MbdJointKind::Planar { offset: distance },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constraints::{JointKind, JointSide};
    use crate::core::geometry::Shape;
    use crate::core::types::Placement;
    use ElementClass::{Edge, Face, Vertex};

    fn face(kind: SurfaceKind) -> Option<ElementKind> {
        Some(ElementKind::Face(kind))
    }

    fn edge(kind: CurveKind) -> Option<ElementKind> {
        Some(ElementKind::Edge(kind))
    }

    #[test]
    fn plane_is_always_side_one() {
        let forward = classify(Some(Face), Some(Face), face(SurfaceKind::Plane), face(SurfaceKind::Cylinder));
        let backward = classify(Some(Face), Some(Face), face(SurfaceKind::Cylinder), face(SurfaceKind::Plane));
        assert_eq!(forward, Classification { pair: DistanceType::PlaneCylinder, swapped: false });
        assert_eq!(backward, Classification { pair: DistanceType::PlaneCylinder, swapped: true });
    }

    #[test]
    fn face_priority_orders_every_pair() {
        use SurfaceKind::*;
        let cases = [
            (Sphere, Cylinder, DistanceType::CylinderSphere, true),
            (Torus, Cone, DistanceType::ConeTorus, true),
            (Sphere, Torus, DistanceType::TorusSphere, true),
            (Cone, Sphere, DistanceType::ConeSphere, false),
            (Sphere, Sphere, DistanceType::SphereSphere, false),
            (Torus, Cylinder, DistanceType::CylinderTorus, true),
        ];
        for (a, b, pair, swapped) in cases {
            assert_eq!(
                classify(Some(Face), Some(Face), face(a), face(b)),
                Classification { pair, swapped },
                "{a:?} / {b:?}"
            );
        }
    }

    #[test]
    fn free_form_faces_fall_through_to_other() {
        let result = classify(Some(Face), Some(Face), face(SurfaceKind::Other), face(SurfaceKind::Plane));
        assert_eq!(result, Classification { pair: DistanceType::Other, swapped: true });
        let result = classify(Some(Face), Some(Face), face(SurfaceKind::Other), face(SurfaceKind::Other));
        assert_eq!(result.pair, DistanceType::Other);
        assert!(!result.swapped);
    }

    #[test]
    fn line_leads_circle_on_edges() {
        let result = classify(Some(Edge), Some(Edge), edge(CurveKind::Circle), edge(CurveKind::Line));
        assert_eq!(result, Classification { pair: DistanceType::LineCircle, swapped: true });
        let result = classify(Some(Edge), Some(Edge), edge(CurveKind::Other), edge(CurveKind::Circle));
        assert_eq!(result, Classification { pair: DistanceType::Other, swapped: true });
        let result = classify(Some(Edge), Some(Edge), edge(CurveKind::Line), edge(CurveKind::Other));
        assert_eq!(result, Classification { pair: DistanceType::Other, swapped: false });
    }

    #[test]
    fn mixed_classes_put_higher_dimension_first() {
        let result = classify(Some(Vertex), Some(Face), Some(ElementKind::Vertex), face(SurfaceKind::Cylinder));
        assert_eq!(result, Classification { pair: DistanceType::PointCylinder, swapped: true });

        let result = classify(Some(Edge), Some(Face), edge(CurveKind::Circle), face(SurfaceKind::Plane));
        assert_eq!(result, Classification { pair: DistanceType::CurvePlane, swapped: true });

        let result = classify(Some(Face), Some(Edge), face(SurfaceKind::Plane), edge(CurveKind::Line));
        assert_eq!(result, Classification { pair: DistanceType::LinePlane, swapped: false });

        let result = classify(Some(Vertex), Some(Edge), Some(ElementKind::Vertex), edge(CurveKind::Circle));
        assert_eq!(result, Classification { pair: DistanceType::PointCurve, swapped: true });
    }

    #[test]
    fn point_point_degrades_to_ball_at_zero_distance() {
        assert_eq!(
            distance_joint_kind(DistanceType::PointPoint, 1.0e-10, 0.0, 0.0),
            MbdJointKind::Spherical
        );
        assert_eq!(
            distance_joint_kind(DistanceType::PointPoint, 1.0, 0.0, 0.0),
            MbdJointKind::SphSph { distance: 1.0 }
        );
    }

    #[test]
    fn radii_offset_the_base_distance() {
        assert_eq!(
            distance_joint_kind(DistanceType::PlaneCylinder, 2.0, 0.0, 3.0),
            MbdJointKind::LineInPlane { offset: 5.0 }
        );
        assert_eq!(
            distance_joint_kind(DistanceType::CircleCircle, 1.0, 2.0, 3.0),
            MbdJointKind::RevCyl { distance: 6.0 }
        );
        assert_eq!(
            distance_joint_kind(DistanceType::PointSphere, 0.5, 1.5, 9.0),
            MbdJointKind::SphSph { distance: 2.0 }
        );
    }

    #[test]
    fn unruled_pairs_use_planar_fallback() {
        for pair in [DistanceType::PlaneCone, DistanceType::LineTorus, DistanceType::CurveSphere, DistanceType::Other] {
            assert_eq!(
                distance_joint_kind(pair, 0.25, 4.0, 4.0),
                MbdJointKind::Planar { offset: 0.25 }
            );
        }
    }

    #[test]
    fn classify_joint_swaps_descriptor_in_place() {
        let mut doc = Document::new("Doc");
        let cylinder = Shape::new().with_element(
            "Face1",
            Element::face(SurfaceKind::Cylinder).with_radius(3.0),
        );
        let plane = Shape::new().with_element("Face2", Element::face(SurfaceKind::Plane));
        let a = doc.add_part("A", Placement::IDENTITY, None);
        doc.add_feature("Shaft", Placement::IDENTITY, cylinder, Some(a));
        let b = doc.add_part("B", Placement::IDENTITY, None);
        doc.add_feature("Table", Placement::IDENTITY, plane, Some(b));

        let mut joint = Joint::new(
            "J",
            JointKind::Distance,
            JointSide::new(a, "Shaft", "Face1"),
            JointSide::new(b, "Table", "Face2"),
        )
        .with_distance(2.0);

        assert_eq!(classify_joint(&doc, &mut joint), DistanceType::PlaneCylinder);
        assert_eq!(joint.first.part, Some(b));
        assert_eq!(side_radius(&doc, &joint.second), 3.0);
        assert_eq!(side_radius(&doc, &joint.first), 0.0);
    }
}
