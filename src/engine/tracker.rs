//! Template pose tracking over a frame sequence.

use std::ops::ControlFlow;

use rand::Rng;

use crate::config::Params;
use crate::core::types::{FramePose, PointCloud3D, Pose3D};
use crate::features::{compute_fpfh, estimate_normals};
use crate::filters::VoxelGridFilter;
use crate::registration::{
    IcpConfig, PointToPointIcp, RegistrationError, SacIa, SacIaConfig,
};
use crate::spatial::SpatialIndex;

/// Tracking failure.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// The template cloud has no points
    #[error("template cloud is empty")]
    EmptyTemplate,

    /// A scene frame has no points
    #[error("frame {index} is empty")]
    EmptyFrame {
        /// Sequence index of the offending frame
        index: usize,
    },

    /// `process_frame` was called before the chain had a seed
    #[error("tracker has no pose seed; run global alignment or seed() first")]
    NotInitialized,

    /// Global alignment on the first frame failed
    #[error("global alignment failed: {0}")]
    Init(RegistrationError),

    /// Per-frame refinement failed hard
    #[error("registration failed on frame {index}: {source}")]
    Frame {
        /// Sequence index of the offending frame
        index: usize,
        /// Underlying degeneracy
        source: RegistrationError,
    },
}

/// Outcome of the one-time global alignment on the first frame.
#[derive(Debug, Clone)]
pub struct Initialization {
    /// The voxel-downsampled first frame the alignment ran against
    pub reduced_scene: PointCloud3D,
    /// Coarse transform placing the template onto the object in the first frame
    pub model_to_scene: Pose3D,
    /// Truncated mean squared error of the alignment (lower is better)
    pub fitness: f32,
}

/// Tracks a rigid template through a sequence of scene captures.
///
/// Owns the fixed template cloud and its spatial index (built once, shared by
/// every refinement), plus the evolving chain state: the previous frame's
/// converged transform, which seeds the next frame's ICP.
///
/// Every transform crossing this API maps **template-local coordinates into
/// the scene frame**. Internally the chain carries the opposite direction
/// (ICP refines scene→template, since the template is the fixed target); the
/// inversion happens exactly once, at the `FramePose` boundary.
///
/// The per-frame API is pull-based: callers decide when to advance, whether
/// gated on user input or driven in a batch loop, and may stop between frames
/// at any time.
pub struct TemplateTracker {
    template: PointCloud3D,
    template_index: SpatialIndex,
    icp: PointToPointIcp,
    params: Params,
    /// Warm-start seed: scene→template transform of the last processed frame
    chain: Option<Pose3D>,
    next_frame: usize,
}

impl TemplateTracker {
    /// Create a tracker for a template cloud.
    ///
    /// `params` must already be validated. Fails on an empty template: every
    /// downstream stage assumes a non-empty target.
    pub fn new(template: PointCloud3D, params: Params) -> Result<Self, TrackError> {
        if template.is_empty() {
            return Err(TrackError::EmptyTemplate);
        }
        let template_index = SpatialIndex::build(&template);
        let icp = PointToPointIcp::new(IcpConfig {
            max_iterations: params.icp_max_iterations,
            max_correspondence_distance: params.icp_max_correspondence_distance,
            ..IcpConfig::default()
        });
        Ok(Self {
            template,
            template_index,
            icp,
            params,
            chain: None,
            next_frame: 0,
        })
    }

    /// The fixed template cloud.
    pub fn template(&self) -> &PointCloud3D {
        &self.template
    }

    /// Whether the chain has a seed (global alignment or `seed()` happened).
    pub fn is_initialized(&self) -> bool {
        self.chain.is_some()
    }

    /// Index the next `process_frame` call will be assigned.
    pub fn next_frame_index(&self) -> usize {
        self.next_frame
    }

    /// Current template pose in the latest processed frame, if any.
    pub fn current_pose(&self) -> Option<Pose3D> {
        self.chain.map(|c| c.inverse())
    }

    /// Seed the chain with a known template pose instead of running global
    /// alignment (e.g. to resume a previous run).
    pub fn seed(&mut self, model_to_scene: &Pose3D) {
        self.chain = Some(model_to_scene.inverse());
    }

    /// One-time global alignment against the first scene frame.
    ///
    /// Downsamples the frame to the configured voxel size, computes normals
    /// and FPFH descriptors for both the template and the reduced frame, and
    /// runs SAC-IA with no pose prior. On success the chain is seeded for
    /// `process_frame`. Subsequent frames never re-run global alignment.
    ///
    /// The random source drives SAC-IA sampling; pass a seeded generator for
    /// reproducible runs.
    pub fn initialize(
        &mut self,
        first_frame: &PointCloud3D,
        rng: &mut impl Rng,
    ) -> Result<Initialization, TrackError> {
        if first_frame.is_empty() {
            return Err(TrackError::EmptyFrame { index: 0 });
        }

        let reduced = VoxelGridFilter::new(self.params.voxel_size).filter(first_frame);
        log::info!(
            "downsampled first frame from {} to {} points (voxel {})",
            first_frame.len(),
            reduced.len(),
            self.params.voxel_size
        );

        let template_normals =
            estimate_normals(&self.template, &self.template_index, self.params.normal_radius);
        let template_features = compute_fpfh(
            &self.template,
            &template_normals,
            &self.template_index,
            self.params.feature_radius,
        );

        let scene_index = SpatialIndex::build(&reduced);
        let scene_normals = estimate_normals(&reduced, &scene_index, self.params.normal_radius);
        let scene_features = compute_fpfh(
            &reduced,
            &scene_normals,
            &scene_index,
            self.params.feature_radius,
        );

        let sac = SacIa::new(SacIaConfig {
            min_sample_distance: self.params.min_sample_distance,
            max_correspondence_distance: self.params.sac_max_correspondence_distance,
            max_iterations: self.params.sac_max_iterations,
            ..SacIaConfig::default()
        });
        let result = sac
            .align(
                &self.template,
                &template_features,
                &reduced,
                &scene_features,
                rng,
            )
            .map_err(TrackError::Init)?;

        // SAC-IA aligned template→scene; the chain refines the opposite way.
        self.chain = Some(result.transform.inverse());
        self.next_frame = 0;

        Ok(Initialization {
            reduced_scene: reduced,
            model_to_scene: result.transform,
            fitness: result.fitness,
        })
    }

    /// Refine the pose against the next scene frame.
    ///
    /// Source = the full-resolution frame, target = the template, initial
    /// guess = the previous frame's converged transform. On success the
    /// result becomes the seed for the following frame.
    ///
    /// A hard failure (insufficient or degenerate correspondences) leaves the
    /// chain seed untouched, so the caller may skip the frame and retry with
    /// the next one, or abort.
    pub fn process_frame(&mut self, frame: &PointCloud3D) -> Result<FramePose, TrackError> {
        let seed = self.chain.ok_or(TrackError::NotInitialized)?;
        let index = self.next_frame;
        if frame.is_empty() {
            return Err(TrackError::EmptyFrame { index });
        }

        let result = self
            .icp
            .align(frame, &self.template, &self.template_index, &seed)
            .map_err(|source| TrackError::Frame { index, source })?;

        self.chain = Some(result.transform);
        self.next_frame = index + 1;

        Ok(FramePose {
            frame_index: index,
            model_to_scene: result.transform.inverse(),
            fitness: result.fitness,
            converged: result.converged,
        })
    }

    /// Fold the whole sequence through `process_frame`.
    ///
    /// The callback sees each pose as it is produced and can stop the chain
    /// between frames with `ControlFlow::Break` (the current frame is always
    /// finished first). Returns the poses produced so far; a hard per-frame
    /// failure aborts with the error.
    pub fn track<F>(
        &mut self,
        frames: &[PointCloud3D],
        mut on_frame: F,
    ) -> Result<Vec<FramePose>, TrackError>
    where
        F: FnMut(&FramePose) -> ControlFlow<()>,
    {
        let mut poses = Vec::with_capacity(frames.len());
        for frame in frames {
            let pose = self.process_frame(frame)?;
            let flow = on_frame(&pose);
            poses.push(pose);
            if flow.is_break() {
                break;
            }
        }
        Ok(poses)
    }
}
