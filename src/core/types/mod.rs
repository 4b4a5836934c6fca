//! Core data types shared by every pipeline stage.

mod cloud;
mod frame;
mod pose;

pub use cloud::PointCloud3D;
pub use frame::FramePose;
pub use pose::{Point3D, Pose3D};
