//! Global configuration constants and per-assembly solve settings.

use serde::{Deserialize, Serialize};

/// Name of the top-level MBD model; prefixes every marker path.
pub const MODEL_NAME: &str = "OndselAssembly";

/// Linear tolerance under which two lengths are considered equal.
pub const PRECISION_CONFUSION: f64 = 1.0e-7;

/// Tolerance attached to every emitted translation/rotation limit.
pub const LIMIT_TOLERANCE: f64 = 1.0e-9;

/// Depth guard for upstream-part walks.
pub const UPSTREAM_SEARCH_LIMIT: usize = 1000;

/// Mass assigned to a body when none was provided for its part.
pub const DEFAULT_PART_MASS: f64 = 1.0;

/// Density assigned to every body.
pub const DEFAULT_PART_DENSITY: f64 = 1.0;

/// Principal moments of inertia assigned to every body.
pub const DEFAULT_MOMENTS_OF_INERTIA: [f64; 3] = [1.0, 1.0, 1.0];

/// Name of the identity marker a ground joint attaches to on its body.
pub const FIXING_MARKER_NAME: &str = "FixingMarker";

/// Behaviour switches for an [`AssemblySolver`](crate::assembly::AssemblySolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveSettings {
    /// Solve whenever the assembly is recomputed.
    pub solve_on_recompute: bool,
    /// Reset joint frames from their referenced geometry before solving.
    pub update_joint_frames: bool,
    /// Remove incomplete and self-referencing joints from the document
    /// instead of only skipping them.
    pub delete_bad_joints: bool,
    /// Snapshot placements before a recompute-triggered solve.
    pub enable_undo: bool,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            solve_on_recompute: true,
            update_joint_frames: true,
            delete_bad_joints: false,
            enable_undo: false,
        }
    }
}
