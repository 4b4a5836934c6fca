//! Per-frame tracking output.

use serde::{Deserialize, Serialize};

use super::pose::Pose3D;

/// Converged pose estimate for one processed scene frame.
///
/// `model_to_scene` maps template-local coordinates into this frame's
/// coordinate frame. Immutable once produced; the tracker hands out copies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePose {
    /// Index of the frame in the capture sequence
    pub frame_index: usize,
    /// Transform placing the template onto the object in this frame
    pub model_to_scene: Pose3D,
    /// Mean correspondence distance of the final refinement iteration (lower is better)
    pub fitness: f32,
    /// Whether the refiner met its convergence criteria.
    ///
    /// `false` means the iteration budget ran out. The pose is still usable,
    /// just less converged; callers decide how much to trust it.
    pub converged: bool,
}
