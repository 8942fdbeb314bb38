//! Geometry facts consumed from the modelling kernel: the primitive kind of a
//! named sub-element, its radius, and (optionally) its natural frame.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::Placement;

/// Coarse element class, derived from the alphabetic prefix of an element
/// name (`"Face7"`, `"Edge14"`, `"Vertex2"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementClass {
    Vertex,
    Edge,
    Face,
}

impl ElementClass {
    pub fn from_element_name(name: &str) -> Option<Self> {
        let prefix: String = name.chars().filter(|ch| ch.is_ascii_alphabetic()).collect();
        match prefix.as_str() {
            "Vertex" => Some(ElementClass::Vertex),
            "Edge" => Some(ElementClass::Edge),
            "Face" => Some(ElementClass::Face),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveKind {
    Line,
    Circle,
    /// Ellipses, conics, splines.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    Plane,
    Cylinder,
    Cone,
    Sphere,
    Torus,
    /// Revolved, extruded and free-form surfaces.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Vertex,
    Edge(CurveKind),
    Face(SurfaceKind),
}

impl ElementKind {
    pub fn class(&self) -> ElementClass {
        match self {
            ElementKind::Vertex => ElementClass::Vertex,
            ElementKind::Edge(_) => ElementClass::Edge,
            ElementKind::Face(_) => ElementClass::Face,
        }
    }

    pub fn curve(&self) -> Option<CurveKind> {
        match self {
            ElementKind::Edge(curve) => Some(*curve),
            _ => None,
        }
    }

    pub fn surface(&self) -> Option<SurfaceKind> {
        match self {
            ElementKind::Face(surface) => Some(*surface),
            _ => None,
        }
    }
}

/// One topological sub-element of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    /// Primitive radius (circle, cylinder, sphere, torus major radius); 0 otherwise.
    pub radius: f64,
    /// Frame a joint attached to this element would use, in the owning feature's frame.
    pub frame: Option<Placement>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            radius: 0.0,
            frame: None,
        }
    }

    pub fn vertex() -> Self {
        Self::new(ElementKind::Vertex)
    }

    pub fn edge(curve: CurveKind) -> Self {
        Self::new(ElementKind::Edge(curve))
    }

    pub fn face(surface: SurfaceKind) -> Self {
        Self::new(ElementKind::Face(surface))
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_frame(mut self, frame: Placement) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Radius that offsets a distance joint: only circles, cylinders and
    /// spheres contribute.
    pub fn contact_radius(&self) -> f64 {
        match self.kind {
            ElementKind::Edge(CurveKind::Circle)
            | ElementKind::Face(SurfaceKind::Cylinder)
            | ElementKind::Face(SurfaceKind::Sphere) => self.radius,
            _ => 0.0,
        }
    }
}

/// Named sub-elements of a feature's shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    elements: HashMap<String, Element>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, name: impl Into<String>, element: Element) -> Self {
        self.insert(name, element);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, element: Element) {
        self.elements.insert(name.into(), element);
    }

    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_class_uses_alphabetic_prefix() {
        assert_eq!(ElementClass::from_element_name("Face7"), Some(ElementClass::Face));
        assert_eq!(ElementClass::from_element_name("Edge14"), Some(ElementClass::Edge));
        assert_eq!(ElementClass::from_element_name("Vertex2"), Some(ElementClass::Vertex));
        assert_eq!(ElementClass::from_element_name(""), None);
        assert_eq!(ElementClass::from_element_name("Wire3"), None);
    }

    #[test]
    fn only_round_primitives_contribute_radius() {
        assert_eq!(Element::edge(CurveKind::Circle).with_radius(2.0).contact_radius(), 2.0);
        assert_eq!(Element::face(SurfaceKind::Cylinder).with_radius(3.0).contact_radius(), 3.0);
        assert_eq!(Element::face(SurfaceKind::Sphere).with_radius(4.0).contact_radius(), 4.0);
        assert_eq!(Element::face(SurfaceKind::Torus).with_radius(5.0).contact_radius(), 0.0);
        assert_eq!(Element::edge(CurveKind::Line).with_radius(1.0).contact_radius(), 0.0);
    }
}
