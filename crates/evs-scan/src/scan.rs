//! The scan state machine.
//!
//! `INIT → RENDERING(0) → … → RENDERING(n-1) → FINALIZE → DONE`, forward
//! only. Any failure aborts the scan; rerunning from frame 0 is idempotent
//! because every output is named by its frame index.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use evs_core::{
    compute_k, decompose_world_matrix, read_cv_pose, require_kind, IntrinsicMatrix,
    IntrinsicsError, ObjectId, ObjectKind, PoseError, PoseTq, SceneError, SceneHandle,
};
use log::{debug, info};
use nalgebra::{Isometry3, Translation3, UnitQuaternion};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::{PoseConvention, ScanConfig, ScanConfigError};
use crate::deformation::{DeformationError, DeformationSchedule};
use crate::ground_truth::{write_ground_truth, FrameRecord, GroundTruthError};
use crate::templates::{configure_base_data_folder, TemplateError};
use crate::video::{assemble_video, VideoError};

/// Per-frame step that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanStage {
    Placement,
    Deformation,
    Render,
    Pose,
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanStage::Placement => "placement",
            ScanStage::Deformation => "deformation",
            ScanStage::Render => "render",
            ScanStage::Pose => "pose",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Init,
    Rendering(usize),
    Finalize,
    Done,
}

/// Cause of a per-frame failure.
#[derive(thiserror::Error, Debug)]
pub enum FrameFailure {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Pose(#[from] PoseError),
}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ScanConfigError),
    #[error("scene setup failed: {0}")]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Intrinsics(#[from] IntrinsicsError),
    #[error(transparent)]
    Deformation(#[from] DeformationError),
    #[error("frame {frame}: {stage} failed: {source}")]
    Frame {
        frame: usize,
        stage: ScanStage,
        #[source]
        source: FrameFailure,
    },
    #[error("{action} `{}` failed: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    GroundTruth(#[from] GroundTruthError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Video(#[from] VideoError),
}

impl ScanError {
    /// Frame index and stage of a per-frame failure.
    pub fn frame(&self) -> Option<(usize, ScanStage)> {
        match self {
            ScanError::Frame { frame, stage, .. } => Some((*frame, *stage)),
            _ => None,
        }
    }
}

/// Outcome of a completed scan.
#[derive(Clone, Debug)]
pub struct ScanReport {
    pub frame_num: usize,
    pub frame_dir: PathBuf,
    pub k: IntrinsicMatrix,
    pub records: Vec<FrameRecord>,
    pub ground_truth: Option<PathBuf>,
    pub templates_written: bool,
    pub video: Option<PathBuf>,
}

/// Scan state resolved during INIT.
#[derive(Debug)]
struct Prepared {
    frame_num: usize,
    k: IntrinsicMatrix,
    schedule: DeformationSchedule,
}

/// Drives one scan over a scene it borrows exclusively.
pub struct ScanLoop<'a, S: SceneHandle + ?Sized> {
    scene: &'a mut S,
    config: ScanConfig,
    state: ScanState,
    prepared: Option<Prepared>,
    records: Vec<FrameRecord>,
    report: Option<ScanReport>,
}

impl<'a, S: SceneHandle + ?Sized> ScanLoop<'a, S> {
    pub fn new(scene: &'a mut S, config: ScanConfig) -> Self {
        Self {
            scene,
            config,
            state: ScanState::Init,
            prepared: None,
            records: Vec::new(),
            report: None,
        }
    }

    #[inline]
    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Frame count, known once INIT has run.
    pub fn frame_num(&self) -> Option<usize> {
        self.prepared.as_ref().map(|p| p.frame_num)
    }

    /// Run one state transition and return the new state.
    pub fn step(&mut self) -> Result<ScanState, ScanError> {
        self.state = match self.state {
            ScanState::Init => {
                let prepared = self.init()?;
                let next = if prepared.frame_num > 0 {
                    ScanState::Rendering(0)
                } else {
                    ScanState::Finalize
                };
                self.prepared = Some(prepared);
                next
            }
            ScanState::Rendering(i) => {
                self.render_frame(i)?;
                match self.frame_num() {
                    Some(n) if i + 1 < n => ScanState::Rendering(i + 1),
                    _ => ScanState::Finalize,
                }
            }
            ScanState::Finalize => {
                self.report = Some(self.finalize()?);
                ScanState::Done
            }
            ScanState::Done => ScanState::Done,
        };
        Ok(self.state)
    }

    /// Run to completion.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(trajectory = %self.config.trajectory))
    )]
    pub fn run(mut self) -> Result<ScanReport, ScanError> {
        while self.step()? != ScanState::Done {}
        self.report.take().ok_or(ScanError::Config(ScanConfigError::Invalid {
            field: "state",
            reason: "scan finished without a report".to_string(),
        }))
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    fn init(&mut self) -> Result<Prepared, ScanError> {
        let cfg = &self.config;
        cfg.validate()?;
        let frame_num = cfg.resolve_frame_num()?;
        let curve = ObjectId::from(cfg.trajectory.name());

        let scene = &mut *self.scene;
        require_kind(&*scene, &cfg.camera, ObjectKind::Camera)?;
        require_kind(&*scene, &cfg.model, ObjectKind::Mesh)?;
        require_kind(&*scene, &cfg.light, ObjectKind::Light)?;
        require_kind(&*scene, &curve, ObjectKind::Curve)?;

        scene.hide_all();
        for id in [&cfg.camera, &cfg.light, &cfg.model, &curve] {
            scene.set_visible(id, true)?;
        }
        scene.bind_trajectory(&cfg.camera, &curve, cfg.trajectory_scale)?;
        scene.set_track_target(&cfg.camera, &cfg.model)?;
        scene.set_lens_distortion(cfg.lens_distortion)?;

        let k = compute_k(&scene.camera_model(&cfg.camera)?)?;
        let schedule = DeformationSchedule::new(&cfg.deformation, frame_num)?;

        let frame_dir = cfg.frame_dir();
        fs::create_dir_all(&frame_dir).map_err(|source| ScanError::Io {
            action: "create",
            path: frame_dir.clone(),
            source,
        })?;

        info!(
            "scan {} x{} into {}: {frame_num} frames, deformation {}",
            cfg.trajectory,
            cfg.trajectory_scale,
            cfg.data_folder.display(),
            if schedule.is_active() { "on" } else { "off" }
        );
        Ok(Prepared {
            frame_num,
            k,
            schedule,
        })
    }

    fn render_frame(&mut self, i: usize) -> Result<(), ScanError> {
        let Some(prepared) = self.prepared.as_ref() else {
            return Err(ScanError::Config(ScanConfigError::Invalid {
                field: "state",
                reason: "rendering before init".to_string(),
            }));
        };
        let cfg = &self.config;
        let scene = &mut *self.scene;
        let fail = |stage: ScanStage| move |e: SceneError| ScanError::Frame {
            frame: i,
            stage,
            source: FrameFailure::Scene(e),
        };

        let offset = i as f64 / prepared.frame_num as f64;
        scene
            .set_path_offset(&cfg.camera, offset)
            .map_err(fail(ScanStage::Placement))?;

        let blend = prepared.schedule.blend(i);
        scene
            .set_shape_blend(&cfg.model, blend)
            .map_err(fail(ScanStage::Deformation))?;

        let path = cfg.frame_path(i);
        scene
            .render_frame(&cfg.camera, &path, cfg.render_mode, cfg.save_render)
            .map_err(fail(ScanStage::Render))?;

        if cfg.save_trajectory {
            // Pose reads are only valid after pending constraints resolve.
            scene.flush_transform().map_err(fail(ScanStage::Pose))?;
            let tq = read_pose(&*scene, &cfg.camera, cfg.pose_convention).map_err(|e| {
                ScanError::Frame {
                    frame: i,
                    stage: ScanStage::Pose,
                    source: FrameFailure::Pose(e),
                }
            })?;
            self.records.push(FrameRecord::new(i, &tq));
        }
        debug!(
            "frame {i}/{}: offset {offset:.5}, blend {:.4}",
            prepared.frame_num,
            blend.weight()
        );
        Ok(())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    fn finalize(&mut self) -> Result<ScanReport, ScanError> {
        let Some(prepared) = self.prepared.as_ref() else {
            return Err(ScanError::Config(ScanConfigError::Invalid {
                field: "state",
                reason: "finalize before init".to_string(),
            }));
        };
        let cfg = &self.config;

        let ground_truth = if cfg.save_trajectory {
            let path = cfg.ground_truth_path();
            write_ground_truth(&path, &self.records)?;
            info!("wrote {} poses to {}", self.records.len(), path.display());
            Some(path)
        } else {
            None
        };

        let templates_written = match &cfg.template_folder {
            Some(dir) => {
                configure_base_data_folder(dir, &cfg.data_folder, [0, prepared.frame_num])?;
                true
            }
            None => false,
        };

        let video = if cfg.save_video {
            let out = cfg.video_path();
            assemble_video(&cfg.frame_dir(), &cfg.frame_pattern(), &out, &cfg.video)?;
            Some(out)
        } else {
            None
        };

        Ok(ScanReport {
            frame_num: prepared.frame_num,
            frame_dir: cfg.frame_dir(),
            k: prepared.k,
            records: std::mem::take(&mut self.records),
            ground_truth,
            templates_written,
            video,
        })
    }
}

/// Read the settled camera pose in the requested convention.
pub fn read_pose<S: SceneHandle + ?Sized>(
    scene: &S,
    camera: &ObjectId,
    convention: PoseConvention,
) -> Result<PoseTq, PoseError> {
    match convention {
        PoseConvention::WorldToCv => Ok(read_cv_pose(scene, camera)?.to_tq()),
        PoseConvention::CameraToWorld => {
            let (location, rotation) =
                decompose_world_matrix(&scene.camera_world_transform(camera)?)?;
            Ok(PoseTq::from_isometry(&Isometry3::from_parts(
                Translation3::from(location),
                UnitQuaternion::from_rotation_matrix(&rotation),
            )))
        }
    }
}

/// Run a complete scan with `config` against `scene`.
pub fn run_scan<S: SceneHandle + ?Sized>(
    scene: &mut S,
    config: ScanConfig,
) -> Result<ScanReport, ScanError> {
    ScanLoop::new(scene, config).run()
}
