//! Scan orchestration for endoscopy video synthesis.
//!
//! A scan drives the camera along a trajectory through a [`SceneHandle`],
//! cycles the organ deformation, renders one still per frame and records the
//! ground-truth camera pose of each frame. After the last frame it writes the
//! pose file and optionally patches the downstream config templates and hands
//! the frames to a video encoder.
//!
//! ```no_run
//! use evs_scan::{run_scan, ScanConfig};
//! # fn demo<S: evs_core::SceneHandle>(scene: &mut S) -> Result<(), evs_scan::ScanError> {
//! let mut config = ScanConfig::new("/data/scan_01");
//! config.frame_num = Some(40);
//! let report = run_scan(scene, config)?;
//! println!("{} poses", report.records.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`SceneHandle`]: evs_core::SceneHandle

mod config;
mod deformation;
mod ground_truth;
mod scan;
mod templates;
mod video;

pub use config::{PoseConvention, ScanConfig, ScanConfigError};
pub use deformation::{
    deformation_weight, segment_len, DeformationError, DeformationParams, DeformationSchedule,
};
pub use ground_truth::{
    read_ground_truth, write_ground_truth, FrameRecord, GroundTruthError, GROUND_TRUTH_FILE,
};
pub use scan::{
    read_pose, run_scan, FrameFailure, ScanError, ScanLoop, ScanReport, ScanStage, ScanState,
};
pub use templates::{
    configure_base_data_folder, write_sorted_json, TemplateError, CAMERA_PARAMS_FILE,
    DATA_CONFIG_FILE, FRAME_RANGES_FILE,
};
pub use video::{assemble_video, encoder_args, VideoError, VideoParams};
