//! Orchestration layer: drives registration over a frame sequence.

mod tracker;

pub use tracker::{Initialization, TemplateTracker, TrackError};
