//! Camera trajectories for endoscopy scans.
//!
//! A [`TrajectoryCurve`] is a polyline in curve-local space with an arclength
//! table, so a normalized offset maps to a fixed distance along the path.
//! [`place_camera_on_trajectory`] evaluates the path-follow constraint;
//! [`TrajectoryId`] is the closed catalog of scan paths with their physical
//! lengths, from which [`frame_budget`] derives a constant-speed frame count.

mod builders;
mod catalog;
mod curve;
mod error;
mod sampler;

pub use builders::{sine_on_sphere, spiral_on_sphere, SphereShell, DEFAULT_CURVE_SAMPLES};
pub use catalog::{frame_budget, TrajectoryFamily, TrajectoryId, FRAMES_PER_LENGTH_UNIT};
pub use curve::TrajectoryCurve;
pub use error::TrajectoryError;
pub use sampler::{
    normalize_offset, place_camera_on_trajectory, CameraPlacement,
};
