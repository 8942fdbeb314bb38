use std::collections::HashSet;

use log::{debug, trace};

use super::{SolverBackend, SolverError, SolverResult};
use crate::core::types::Placement;
use crate::model::mbd::{BodyHandle, MarkerRef, MbdJointKind, MbdModel};

/// Tolerance on position and rotation mismatch across a fixed joint.
const FIXED_TOLERANCE: f64 = 1.0e-6;

/// Positions bodies that are rigidly chained to the world.
///
/// Starting from the model-level markers (and, while dragging, from the
/// dragged bodies), each fixed joint with one placed side places the body on
/// its other side. A fixed joint whose two sides are already placed must
/// agree. Other joint kinds are left to a full solver and do not move bodies.
#[derive(Debug, Default)]
pub struct RigidChainSolver {
    passes: usize,
}

impl RigidChainSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Propagation passes used by the last solve.
    pub fn passes(&self) -> usize {
        self.passes
    }

    fn propagate(&mut self, model: &mut MbdModel, seeds: &[BodyHandle]) -> SolverResult<()> {
        let mut placed: HashSet<BodyHandle> = seeds.iter().copied().collect();
        let fixed: Vec<usize> = model
            .joints
            .iter()
            .enumerate()
            .filter(|(_, joint)| joint.kind == MbdJointKind::Fixed)
            .map(|(index, _)| index)
            .collect();

        let mut settled = vec![false; fixed.len()];
        self.passes = 0;

        loop {
            self.passes += 1;
            let mut progressed = false;

            for (slot, &index) in fixed.iter().enumerate() {
                if settled[slot] {
                    continue;
                }
                let joint = &model.joints[index];
                let (marker_i, marker_j) = (joint.marker_i, joint.marker_j);
                let known_i = is_known(marker_i, &placed);
                let known_j = is_known(marker_j, &placed);

                match (known_i, known_j) {
                    (true, true) => {
                        let (Some(frame_i), Some(frame_j)) =
                            (model.marker_frame(marker_i), model.marker_frame(marker_j))
                        else {
                            return Err(SolverError::backend(format!(
                                "joint {} references a missing marker",
                                joint.name
                            )));
                        };
                        if !frame_i.approx_eq(&frame_j, FIXED_TOLERANCE) {
                            return Err(SolverError::inconsistent(joint.name.clone()));
                        }
                        settled[slot] = true;
                    }
                    (true, false) => {
                        place_across(model, marker_i, marker_j, &mut placed)?;
                        settled[slot] = true;
                        progressed = true;
                    }
                    (false, true) => {
                        place_across(model, marker_j, marker_i, &mut placed)?;
                        settled[slot] = true;
                        progressed = true;
                    }
                    (false, false) => {}
                }
            }

            if !progressed {
                break;
            }
        }

        trace!(
            "rigid chain: {} bodies placed in {} passes",
            placed.len(),
            self.passes
        );
        Ok(())
    }
}

fn is_known(marker: MarkerRef, placed: &HashSet<BodyHandle>) -> bool {
    match marker {
        MarkerRef::Assembly(_) => true,
        MarkerRef::Body { body, .. } => placed.contains(&body),
    }
}

/// Moves the body carrying `free` so that its marker coincides with `anchor`.
fn place_across(
    model: &mut MbdModel,
    anchor: MarkerRef,
    free: MarkerRef,
    placed: &mut HashSet<BodyHandle>,
) -> SolverResult<()> {
    let missing = || SolverError::backend("fixed joint references a missing marker");
    let target = model.marker_frame(anchor).ok_or_else(missing)?;
    let local = model.marker(free).ok_or_else(missing)?.placement();
    let body = model.marker_body(free).ok_or_else(missing)?;

    let placement: Placement = target * local.inverse();
    model.body_mut(body).ok_or_else(missing)?.set_placement(placement);
    placed.insert(body);
    Ok(())
}

impl SolverBackend for RigidChainSolver {
    fn name(&self) -> &str {
        "rigid-chain"
    }

    fn pre_drag(&mut self, model: &mut MbdModel) -> SolverResult<()> {
        debug!("rigid chain solve of {} bodies", model.bodies.len());
        self.propagate(model, &[])
    }

    fn drag_step(&mut self, model: &mut MbdModel, dragged: &[BodyHandle]) -> SolverResult<()> {
        self.propagate(model, dragged)
    }
}
