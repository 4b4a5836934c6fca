//! lakshya-track — rigid 3D template registration and tracking.
//!
//! Aligns a rigid object template (a mesh's vertex cloud) to a time-ordered
//! sequence of scene point-cloud captures: one descriptor-based global
//! alignment on the first frame, then per-frame ICP refinement warm-started
//! from the previous frame's pose. Output is a per-frame rigid transform
//! placing the template onto the tracked object.
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     main                            │  ← CLI driver
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← File formats
//! │           (obj, pcd, ply, manifest)                 │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │            (template pose tracking)                 │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │         registration/  features/  filters/         │  ← Core algorithms
//! │          (SAC-IA, ICP, normals, FPFH, voxel)        │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                spatial/     core/                   │  ← Foundation
//! │              (k-d tree, data types)                 │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Pipeline
//!
//! 1. **Downsample** the first scene frame on a voxel grid, bounding the
//!    cost of descriptor computation.
//! 2. **Normals + FPFH** for the template and the reduced frame.
//! 3. **SAC-IA** global alignment — a coarse template pose with no prior.
//! 4. **ICP per frame** against the full-resolution captures, each frame
//!    warm-started from the previous frame's converged transform.
//!
//! Every transform crossing a public API maps template-local coordinates
//! into the scene frame.

// Layer 1: Foundation (no internal deps)
pub mod core;
pub mod spatial;

// Layer 2: Core algorithms (depend on foundation)
pub mod features;
pub mod filters;
pub mod registration;

// Layer 3: Orchestration (depends on algorithms)
pub mod engine;

// Layer 4: I/O and configuration (depend on everything below)
pub mod config;
pub mod error;
pub mod io;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

pub use crate::config::{ConfigError, Params, PartialParams};
pub use crate::core::types::{FramePose, Point3D, PointCloud3D, Pose3D};
pub use crate::engine::{Initialization, TemplateTracker, TrackError};
pub use crate::error::{Error, Result};
pub use crate::features::{compute_fpfh, estimate_normals, FpfhDescriptor, FPFH_BINS};
pub use crate::filters::VoxelGridFilter;
pub use crate::registration::{
    Correspondence, IcpConfig, IcpResult, PointToPointIcp, RegistrationError, SacIa, SacIaConfig,
    SacIaResult,
};
pub use crate::spatial::{Neighbor, SpatialIndex};
