//! Solver-facing multibody model: bodies, markers, joints and limits, plus
//! the plain-text export of the assembled model.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::core::types::{MassProperties, Placement};

/// Index of a body inside its [`MbdModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub usize);

/// Location of a marker: on the model itself or on one of its bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerRef {
    Assembly(usize),
    Body { body: BodyHandle, index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbdMarker {
    pub name: String,
    pub position: DVec3,
    pub rotation: DMat3,
}

impl MbdMarker {
    pub fn new(name: impl Into<String>, placement: Placement) -> Self {
        Self {
            name: name.into(),
            position: placement.position,
            rotation: placement.rotation_matrix(),
        }
    }

    pub fn placement(&self) -> Placement {
        Placement::from_rotation_matrix(self.position, self.rotation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbdBody {
    pub name: String,
    pub position: DVec3,
    pub rotation: DMat3,
    pub mass: MassProperties,
    pub markers: Vec<MbdMarker>,
}

impl MbdBody {
    pub fn new(name: impl Into<String>, placement: Placement, mass: MassProperties) -> Self {
        Self {
            name: name.into(),
            position: placement.position,
            rotation: placement.rotation_matrix(),
            mass,
            markers: Vec::new(),
        }
    }

    pub fn placement(&self) -> Placement {
        Placement::from_rotation_matrix(self.position, self.rotation)
    }

    pub fn set_placement(&mut self, placement: Placement) {
        self.position = placement.position;
        self.rotation = placement.rotation_matrix();
    }
}

/// Joint primitives understood by the solver, with their numeric parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MbdJointKind {
    Fixed,
    Revolute,
    Cylindrical,
    Translational,
    Spherical,
    PointInPlane { offset: f64 },
    LineInPlane { offset: f64 },
    Planar { offset: f64 },
    RevCyl { distance: f64 },
    CylSph { distance: f64 },
    SphSph { distance: f64 },
    RackPinion { pitch_radius: f64 },
    Screw { pitch: f64 },
    Gear { radius_i: f64, radius_j: f64 },
}

impl MbdJointKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            MbdJointKind::Fixed => "FixedJoint",
            MbdJointKind::Revolute => "RevoluteJoint",
            MbdJointKind::Cylindrical => "CylindricalJoint",
            MbdJointKind::Translational => "TranslationalJoint",
            MbdJointKind::Spherical => "SphericalJoint",
            MbdJointKind::PointInPlane { .. } => "PointInPlaneJoint",
            MbdJointKind::LineInPlane { .. } => "LineInPlaneJoint",
            MbdJointKind::Planar { .. } => "PlanarJoint",
            MbdJointKind::RevCyl { .. } => "RevCylJoint",
            MbdJointKind::CylSph { .. } => "CylSphJoint",
            MbdJointKind::SphSph { .. } => "SphSphJoint",
            MbdJointKind::RackPinion { .. } => "RackPinionJoint",
            MbdJointKind::Screw { .. } => "ScrewJoint",
            MbdJointKind::Gear { .. } => "GearJoint",
        }
    }

    /// Named scalar parameters in export order.
    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        match *self {
            MbdJointKind::PointInPlane { offset }
            | MbdJointKind::LineInPlane { offset }
            | MbdJointKind::Planar { offset } => vec![("offset", offset)],
            MbdJointKind::RevCyl { distance }
            | MbdJointKind::CylSph { distance }
            | MbdJointKind::SphSph { distance } => vec![("distanceIJ", distance)],
            MbdJointKind::RackPinion { pitch_radius } => vec![("pitchRadius", pitch_radius)],
            MbdJointKind::Screw { pitch } => vec![("pitch", pitch)],
            MbdJointKind::Gear { radius_i, radius_j } => {
                vec![("radiusI", radius_i), ("radiusJ", radius_j)]
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbdJoint {
    pub name: String,
    pub kind: MbdJointKind,
    pub marker_i: MarkerRef,
    pub marker_j: MarkerRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitKind {
    Translation,
    Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitComparison {
    GreaterOrEqual,
    LessOrEqual,
}

impl LimitComparison {
    pub fn symbol(self) -> &'static str {
        match self {
            LimitComparison::GreaterOrEqual => "=>",
            LimitComparison::LessOrEqual => "=<",
        }
    }
}

/// One-sided bound on the relative motion between two markers.
/// Rotation limits are stored in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbdLimit {
    pub name: String,
    pub kind: LimitKind,
    pub marker_i: MarkerRef,
    pub marker_j: MarkerRef,
    pub comparison: LimitComparison,
    pub limit: f64,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MbdModel {
    pub name: String,
    pub bodies: Vec<MbdBody>,
    pub markers: Vec<MbdMarker>,
    pub joints: Vec<MbdJoint>,
    pub limits: Vec<MbdLimit>,
}

impl MbdModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_body(&mut self, body: MbdBody) -> BodyHandle {
        self.bodies.push(body);
        BodyHandle(self.bodies.len() - 1)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&MbdBody> {
        self.bodies.get(handle.0)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut MbdBody> {
        self.bodies.get_mut(handle.0)
    }

    pub fn add_marker(&mut self, marker: MbdMarker) -> MarkerRef {
        self.markers.push(marker);
        MarkerRef::Assembly(self.markers.len() - 1)
    }

    pub fn add_body_marker(&mut self, body: BodyHandle, marker: MbdMarker) -> Option<MarkerRef> {
        let target = self.bodies.get_mut(body.0)?;
        target.markers.push(marker);
        Some(MarkerRef::Body {
            body,
            index: target.markers.len() - 1,
        })
    }

    pub fn add_joint(&mut self, joint: MbdJoint) {
        self.joints.push(joint);
    }

    pub fn add_limit(&mut self, limit: MbdLimit) {
        self.limits.push(limit);
    }

    pub fn marker(&self, marker: MarkerRef) -> Option<&MbdMarker> {
        match marker {
            MarkerRef::Assembly(index) => self.markers.get(index),
            MarkerRef::Body { body, index } => self.body(body)?.markers.get(index),
        }
    }

    /// `/<model>/<marker>` or `/<model>/<body>/<marker>`.
    pub fn marker_path(&self, marker: MarkerRef) -> Option<String> {
        let name = &self.marker(marker)?.name;
        Some(match marker {
            MarkerRef::Assembly(_) => format!("/{}/{}", self.name, name),
            MarkerRef::Body { body, .. } => {
                format!("/{}/{}/{}", self.name, self.body(body)?.name, name)
            }
        })
    }

    /// The body a marker moves with, `None` for model-level markers.
    pub fn marker_body(&self, marker: MarkerRef) -> Option<BodyHandle> {
        match marker {
            MarkerRef::Assembly(_) => None,
            MarkerRef::Body { body, .. } => Some(body),
        }
    }

    /// Marker frame in the model (world) frame.
    pub fn marker_frame(&self, marker: MarkerRef) -> Option<Placement> {
        let local = self.marker(marker)?.placement();
        match marker {
            MarkerRef::Assembly(_) => Some(local),
            MarkerRef::Body { body, .. } => Some(self.body(body)?.placement() * local),
        }
    }

    pub fn find_joint(&self, name: &str) -> Option<&MbdJoint> {
        self.joints.iter().find(|joint| joint.name == name)
    }

    /// Writes the model as an indented plain-text description.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut w = TextWriter { out };
        w.line(0, "MbdModel")?;
        w.field(1, "Name", &self.name)?;

        w.line(1, "Markers")?;
        for marker in &self.markers {
            w.marker(2, marker)?;
        }

        w.line(1, "Parts")?;
        for body in &self.bodies {
            w.line(2, "Part")?;
            w.field(3, "Name", &body.name)?;
            w.vector(3, "Position3D", body.position)?;
            w.matrix(3, "RotationMatrix", body.rotation)?;
            w.line(3, "PrincipalMassMarker")?;
            w.field(4, "Mass", &body.mass.mass.to_string())?;
            w.vector(4, "MomentOfInertias", body.mass.moments_of_inertia)?;
            w.field(4, "Density", &body.mass.density.to_string())?;
            w.line(3, "Markers")?;
            for marker in &body.markers {
                w.marker(4, marker)?;
            }
        }

        w.line(1, "Joints")?;
        for joint in &self.joints {
            w.line(2, joint.kind.type_name())?;
            w.field(3, "Name", &joint.name)?;
            w.field(3, "MarkerI", &self.marker_path(joint.marker_i).unwrap_or_default())?;
            w.field(3, "MarkerJ", &self.marker_path(joint.marker_j).unwrap_or_default())?;
            for (name, value) in joint.kind.parameters() {
                w.field(3, name, &value.to_string())?;
            }
        }

        w.line(1, "Limits")?;
        for limit in &self.limits {
            let type_name = match limit.kind {
                LimitKind::Translation => "TranslationLimit",
                LimitKind::Rotation => "RotationLimit",
            };
            w.line(2, type_name)?;
            w.field(3, "Name", &limit.name)?;
            w.field(3, "MarkerI", &self.marker_path(limit.marker_i).unwrap_or_default())?;
            w.field(3, "MarkerJ", &self.marker_path(limit.marker_j).unwrap_or_default())?;
            w.field(3, "limit", &limit.limit.to_string())?;
            w.field(3, "type", limit.comparison.symbol())?;
            w.field(3, "tol", &format!("{:e}", limit.tolerance))?;
        }
        Ok(())
    }

    pub fn export(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_text(&mut out)?;
        out.flush()
    }
}

struct TextWriter<'a, W: Write> {
    out: &'a mut W,
}

impl<W: Write> TextWriter<'_, W> {
    fn line(&mut self, depth: usize, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}{}", "\t".repeat(depth), text)
    }

    fn field(&mut self, depth: usize, key: &str, value: &str) -> io::Result<()> {
        self.line(depth, key)?;
        self.line(depth + 1, value)
    }

    fn vector(&mut self, depth: usize, key: &str, value: DVec3) -> io::Result<()> {
        self.field(depth, key, &format!("{} {} {}", value.x, value.y, value.z))
    }

    fn matrix(&mut self, depth: usize, key: &str, value: DMat3) -> io::Result<()> {
        self.line(depth, key)?;
        for row in 0..3 {
            let r = value.row(row);
            self.line(depth + 1, &format!("{} {} {}", r.x, r.y, r.z))?;
        }
        Ok(())
    }

    fn marker(&mut self, depth: usize, marker: &MbdMarker) -> io::Result<()> {
        self.line(depth, "Marker")?;
        self.field(depth + 1, "Name", &marker.name)?;
        self.vector(depth + 1, "Position3D", marker.position)?;
        self.matrix(depth + 1, "RotationMatrix", marker.rotation)
    }
}
