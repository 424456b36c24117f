//! Camera geometry for endoscopy video synthesis.
//!
//! This crate converts a host scene camera rig into computer-vision
//! conventions: the pinhole matrix `K`, the world→camera `[R | t]` pose and
//! its translation + quaternion encoding. It also defines the `SceneHandle`
//! capability through which the scan pipeline talks to a renderer, without
//! depending on any concrete engine.

mod camera;
mod intrinsics;
mod logger;
mod pose;
mod projection;
mod scene;

pub use camera::{CameraModel, Projection, SensorFit};
pub use intrinsics::{compute_k, compute_k_with, AspectCorrection, IntrinsicMatrix, IntrinsicsError};
pub use pose::{
    bcam_to_cv, decompose_world_matrix, read_cv_pose, world_to_cv_pose, CvPose, PoseError, PoseTq,
};
pub use projection::{project_point, projection_matrix};
pub use scene::{
    require_kind, ObjectId, ObjectKind, RenderMode, SceneError, SceneHandle, ShapeBlend,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, level_from_verbosity, LOG_ENV_VAR};
