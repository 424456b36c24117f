//! JSON scan configuration.

use std::fs;
use std::path::{Path, PathBuf};

use evs_core::{ObjectId, RenderMode};
use evs_trajectory::{frame_budget, TrajectoryError, TrajectoryId};
use serde::{Deserialize, Serialize};

use crate::deformation::DeformationParams;
use crate::ground_truth::GROUND_TRUTH_FILE;
use crate::video::VideoParams;

#[derive(thiserror::Error, Debug)]
pub enum ScanConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
}

/// Which transform the ground-truth file records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseConvention {
    /// CV world→camera pose (x right, y down, z forward).
    #[default]
    WorldToCv,
    /// Host camera object world matrix, decomposed (camera→world).
    CameraToWorld,
}

fn default_frame_folder() -> String {
    "raw_cysto".to_string()
}

fn default_camera() -> ObjectId {
    ObjectId::from("endo_cam")
}

fn default_model() -> ObjectId {
    ObjectId::from("bladder_sphere")
}

fn default_light() -> ObjectId {
    ObjectId::from("Point")
}

fn default_trajectory() -> TrajectoryId {
    TrajectoryId::SineSphereTurn10
}

fn default_scale() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_prefix() -> String {
    "cysto".to_string()
}

fn default_ext() -> String {
    "jpg".to_string()
}

/// Everything one scan needs. Fixed for the duration of the scan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Output root: frames go to `<data_folder>/<frame_folder>`, ground truth
    /// and video next to it.
    pub data_folder: PathBuf,
    #[serde(default = "default_frame_folder")]
    pub frame_folder: String,
    /// Explicit frame count; the trajectory's frame budget when absent.
    #[serde(default)]
    pub frame_num: Option<usize>,
    #[serde(default = "default_camera")]
    pub camera: ObjectId,
    #[serde(default = "default_model")]
    pub model: ObjectId,
    #[serde(default = "default_light")]
    pub light: ObjectId,
    #[serde(default = "default_trajectory")]
    pub trajectory: TrajectoryId,
    #[serde(default = "default_scale")]
    pub trajectory_scale: f64,
    #[serde(default)]
    pub render_mode: RenderMode,
    #[serde(default)]
    pub lens_distortion: f64,
    #[serde(default)]
    pub deformation: DeformationParams,
    #[serde(default = "default_true")]
    pub save_render: bool,
    #[serde(default = "default_true")]
    pub save_trajectory: bool,
    #[serde(default)]
    pub save_video: bool,
    /// Folder holding the downstream JSON templates; no templating when unset.
    #[serde(default)]
    pub template_folder: Option<PathBuf>,
    #[serde(default)]
    pub video: VideoParams,
    #[serde(default = "default_prefix")]
    pub frame_prefix: String,
    #[serde(default = "default_ext")]
    pub frame_ext: String,
    #[serde(default)]
    pub pose_convention: PoseConvention,
}

impl ScanConfig {
    /// Defaults of the cystoscopy rig, writing into `data_folder`.
    pub fn new(data_folder: impl Into<PathBuf>) -> Self {
        Self {
            data_folder: data_folder.into(),
            frame_folder: default_frame_folder(),
            frame_num: None,
            camera: default_camera(),
            model: default_model(),
            light: default_light(),
            trajectory: default_trajectory(),
            trajectory_scale: default_scale(),
            render_mode: RenderMode::default(),
            lens_distortion: 0.0,
            deformation: DeformationParams::default(),
            save_render: true,
            save_trajectory: true,
            save_video: false,
            template_folder: None,
            video: VideoParams::default(),
            frame_prefix: default_prefix(),
            frame_ext: default_ext(),
            pose_convention: PoseConvention::default(),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ScanConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ScanConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Check values serde cannot express.
    pub fn validate(&self) -> Result<(), ScanConfigError> {
        let invalid = |field: &'static str, reason: &str| {
            Err(ScanConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        if self.frame_num == Some(0) {
            return invalid("frame_num", "must be at least 1");
        }
        if !self.trajectory_scale.is_finite() || self.trajectory_scale <= 0.0 {
            return invalid("trajectory_scale", "must be finite and positive");
        }
        if !self.lens_distortion.is_finite() {
            return invalid("lens_distortion", "must be finite");
        }
        if !self.deformation.max_amplitude.is_finite() {
            return invalid("deformation.max_amplitude", "must be finite");
        }
        if self.frame_prefix.is_empty() || self.frame_prefix.contains(['/', '\\']) {
            return invalid("frame_prefix", "must be a non-empty file name part");
        }
        if self.frame_ext.is_empty() || self.frame_ext.contains(['/', '\\', '.']) {
            return invalid("frame_ext", "must be a bare extension such as `jpg`");
        }
        if self.save_video && self.video.fps == 0 {
            return invalid("video.fps", "must be positive");
        }
        Ok(())
    }

    /// Explicit frame count, or the constant-speed budget of the trajectory.
    pub fn resolve_frame_num(&self) -> Result<usize, ScanConfigError> {
        match self.frame_num {
            Some(n) => Ok(n),
            None => Ok(frame_budget(self.trajectory, self.trajectory_scale)?),
        }
    }

    pub fn frame_dir(&self) -> PathBuf {
        self.data_folder.join(&self.frame_folder)
    }

    /// `<prefix>_<index:06>.<ext>`.
    pub fn frame_file_name(&self, index: usize) -> String {
        format!("{}_{index:06}.{}", self.frame_prefix, self.frame_ext)
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.frame_dir().join(self.frame_file_name(index))
    }

    /// Encoder input pattern matching [`Self::frame_file_name`].
    pub fn frame_pattern(&self) -> String {
        format!("{}_%06d.{}", self.frame_prefix, self.frame_ext)
    }

    pub fn ground_truth_path(&self) -> PathBuf {
        self.data_folder.join(GROUND_TRUTH_FILE)
    }

    pub fn video_path(&self) -> PathBuf {
        self.data_folder.join(&self.video.file_name)
    }
}
