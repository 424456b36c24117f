//! High-level facade for the `evs-*` workspace.
//!
//! This crate provides:
//! - re-exports of the geometry, trajectory, scan and scene crates
//! - [`synthetic::run_synthetic_scan`], which runs a full scan against the
//!   built-in synthetic endoscopy scene
//! - [`inspect::summarize`], a quick sanity report for a ground-truth file
//!
//! ## Quickstart
//!
//! ```no_run
//! use evs::scan::ScanConfig;
//! use evs::core::CameraModel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = ScanConfig::new("out/scan_01");
//! config.frame_num = Some(40);
//! let report = evs::synthetic::run_synthetic_scan(config, CameraModel::default())?;
//! println!("rendered {} frames", report.frame_num);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `evs::core`: camera model, `K`, CV pose conversion, the `SceneHandle` trait.
//! - `evs::trajectory`: trajectory curves, arclength sampling, frame budgets.
//! - `evs::scan`: scan loop, deformation schedule, ground-truth and templates.
//! - `evs::scene`: deterministic synthetic scene and ray-cast renderer.

pub use evs_core as core;
pub use evs_scan as scan;
pub use evs_scene as scene;
pub use evs_trajectory as trajectory;

pub use evs_core::{compute_k, world_to_cv_pose, CameraModel, CvPose, IntrinsicMatrix, PoseTq};
pub use evs_scan::{run_scan, ScanConfig, ScanError, ScanReport};
pub use evs_trajectory::{frame_budget, TrajectoryId};

pub mod inspect;
pub mod synthetic;
