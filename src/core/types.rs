use glam::{DMat3, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};
use std::ops::Mul;

use crate::config::{DEFAULT_MOMENTS_OF_INERTIA, DEFAULT_PART_DENSITY, DEFAULT_PART_MASS};

/// Rigid transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Placement {
    pub const IDENTITY: Placement = Placement {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    pub fn from_translation(position: DVec3) -> Self {
        Self {
            position,
            rotation: DQuat::IDENTITY,
        }
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            position: DVec3::ZERO,
            rotation,
        }
    }

    /// Builds a placement from a position and a (column-major) rotation matrix.
    pub fn from_rotation_matrix(position: DVec3, matrix: DMat3) -> Self {
        Self {
            position,
            rotation: DQuat::from_mat3(&matrix).normalize(),
        }
    }

    pub fn rotation_matrix(&self) -> DMat3 {
        DMat3::from_quat(self.rotation)
    }

    /// `self * other`: `other` expressed in the frame of `self`, brought to the parent frame.
    pub fn combine(&self, other: &Placement) -> Placement {
        Placement {
            position: self.position + self.rotation * other.position,
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    pub fn inverse(&self) -> Placement {
        let inv = self.rotation.inverse();
        Placement {
            position: -(inv * self.position),
            rotation: inv,
        }
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.position + self.rotation * point
    }

    pub fn transform_vector(&self, vector: DVec3) -> DVec3 {
        self.rotation * vector
    }

    pub fn x_axis(&self) -> DVec3 {
        self.rotation * DVec3::X
    }

    pub fn z_axis(&self) -> DVec3 {
        self.rotation * DVec3::Z
    }

    /// Yaw (about Z), pitch (about Y) and roll (about X) in degrees.
    pub fn yaw_pitch_roll(&self) -> (f64, f64, f64) {
        let (yaw, pitch, roll) = self.rotation.to_euler(EulerRot::ZYX);
        (yaw.to_degrees(), pitch.to_degrees(), roll.to_degrees())
    }

    /// True when positions are within `tolerance` and the quaternions are
    /// within `tolerance` of each other (sign-insensitive).
    pub fn approx_eq(&self, other: &Placement, tolerance: f64) -> bool {
        if self.position.distance(other.position) > tolerance {
            return false;
        }
        // q and -q are the same rotation.
        1.0 - self.rotation.dot(other.rotation).abs() <= tolerance
    }
}

impl Mul for Placement {
    type Output = Placement;

    fn mul(self, rhs: Placement) -> Placement {
        self.combine(&rhs)
    }
}

impl Mul<&Placement> for &Placement {
    type Output = Placement;

    fn mul(self, rhs: &Placement) -> Placement {
        self.combine(rhs)
    }
}

/// Mass, density, and principal moments handed to the solver for a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f64,
    pub density: f64,
    pub moments_of_inertia: DVec3,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: DEFAULT_PART_MASS,
            density: DEFAULT_PART_DENSITY,
            moments_of_inertia: DVec3::from_array(DEFAULT_MOMENTS_OF_INERTIA),
        }
    }
}

impl MassProperties {
    pub fn with_mass(mass: f64) -> Self {
        Self {
            mass,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn sample() -> Placement {
        Placement::new(
            DVec3::new(1.0, -2.0, 3.5),
            DQuat::from_euler(EulerRot::ZYX, 0.3, -0.7, 1.1),
        )
    }

    #[test]
    fn inverse_cancels_composition() {
        let plc = sample();
        let identity = plc * plc.inverse();
        assert!(identity.approx_eq(&Placement::IDENTITY, 1e-9));
        let identity = plc.inverse() * plc;
        assert!(identity.approx_eq(&Placement::IDENTITY, 1e-9));
    }

    #[test]
    fn composition_applies_right_side_first() {
        let parent = Placement::new(DVec3::new(10.0, 0.0, 0.0), DQuat::from_rotation_z(FRAC_PI_2));
        let child = Placement::from_translation(DVec3::new(1.0, 0.0, 0.0));
        let global = parent * child;
        assert_relative_eq!(global.position.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(global.position.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(global.transform_point(DVec3::ZERO).y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rotation_matrix_round_trip_preserves_rotation() {
        let plc = sample();
        let rebuilt = Placement::from_rotation_matrix(plc.position, plc.rotation_matrix());
        assert!(rebuilt.approx_eq(&plc, 1e-9));
    }

    #[test]
    fn yaw_pitch_roll_reports_degrees() {
        let plc = Placement::from_rotation(DQuat::from_rotation_z(FRAC_PI_2));
        let (yaw, pitch, roll) = plc.yaw_pitch_roll();
        assert_relative_eq!(yaw, 90.0, epsilon = 1e-9);
        assert_relative_eq!(pitch, 0.0, epsilon = 1e-9);
        assert_relative_eq!(roll, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn mass_defaults_are_unit_values() {
        let mass = MassProperties::default();
        assert_eq!(mass.mass, 1.0);
        assert_eq!(mass.density, 1.0);
        assert_eq!(mass.moments_of_inertia, DVec3::ONE);
        assert_eq!(MassProperties::with_mass(4.0).mass, 4.0);
    }
}
