//! Capability interface to the host scene.
//!
//! The scan loop never reaches into a global registry: every component gets a
//! `SceneHandle` and addresses objects through typed [`ObjectId`]s. Placement
//! changes are lazy; [`SceneHandle::flush_transform`] is the single point at
//! which pending constraints are resolved, and pose reads before it fail with
//! [`SceneError::StaleTransform`].

use std::fmt;
use std::path::{Path, PathBuf};

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::camera::CameraModel;

/// Name of an object in the host scene.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Camera,
    Curve,
    Mesh,
    Light,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Camera => "camera",
            ObjectKind::Curve => "curve",
            ObjectKind::Mesh => "mesh",
            ObjectKind::Light => "light",
        };
        f.write_str(s)
    }
}

/// Renderer invocation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderMode {
    /// Full shaded render.
    #[default]
    Render,
    /// Fast viewport capture: overlays off, flat material shading.
    Snapshot,
}

/// Shape-key selection for a deformable mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeBlend {
    /// Undeformed basis shape.
    Basis,
    /// Deformed key active with the given blend weight.
    Deformed(f64),
}

impl ShapeBlend {
    pub fn weight(&self) -> f64 {
        match self {
            ShapeBlend::Basis => 0.0,
            ShapeBlend::Deformed(w) => *w,
        }
    }
}

/// Errors reported by a scene implementation.
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    #[error("scene has no object `{0}`")]
    MissingObject(ObjectId),
    #[error("object `{id}` is a {actual}, expected a {expected}")]
    WrongKind {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },
    #[error("camera `{0}` has unresolved placement changes, flush_transform must run first")]
    StaleTransform(ObjectId),
    #[error("placement of `{object}` failed: {reason}")]
    Placement { object: ObjectId, reason: String },
    #[error("render to `{}` failed: {reason}", .path.display())]
    Render { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Host scene capability used by the scan pipeline.
pub trait SceneHandle {
    /// Kind of the named object, or `None` if it does not exist.
    fn object_kind(&self, id: &ObjectId) -> Option<ObjectKind>;

    /// Current lens/sensor/resolution settings of a camera object.
    fn camera_model(&self, camera: &ObjectId) -> Result<CameraModel, SceneError>;

    /// Exclude every object from rendering.
    fn hide_all(&mut self);

    fn set_visible(&mut self, id: &ObjectId, visible: bool) -> Result<(), SceneError>;

    /// Attach the camera's path-follow constraint to `curve`, scaled by `scale`.
    fn bind_trajectory(
        &mut self,
        camera: &ObjectId,
        curve: &ObjectId,
        scale: f64,
    ) -> Result<(), SceneError>;

    /// Move the camera along its bound trajectory. Takes effect on flush.
    fn set_path_offset(&mut self, camera: &ObjectId, offset_factor: f64)
        -> Result<(), SceneError>;

    /// Aim the camera at `target` after path placement. Takes effect on flush.
    fn set_track_target(&mut self, camera: &ObjectId, target: &ObjectId)
        -> Result<(), SceneError>;

    fn set_shape_blend(&mut self, model: &ObjectId, blend: ShapeBlend) -> Result<(), SceneError>;

    /// Radial lens distortion applied at composite time.
    fn set_lens_distortion(&mut self, amount: f64) -> Result<(), SceneError>;

    /// Resolve every pending placement change.
    fn flush_transform(&mut self) -> Result<(), SceneError>;

    /// Effective (post-constraint) world matrix of a camera.
    fn camera_world_transform(&self, camera: &ObjectId) -> Result<Matrix4<f64>, SceneError>;

    /// Render one still through `camera`, writing it to `path` when
    /// `write_still` is set. Blocks until the frame is materialized.
    fn render_frame(
        &mut self,
        camera: &ObjectId,
        path: &Path,
        mode: RenderMode,
        write_still: bool,
    ) -> Result<(), SceneError>;
}

/// Check that `id` exists and has the expected kind.
pub fn require_kind<S: SceneHandle + ?Sized>(
    scene: &S,
    id: &ObjectId,
    expected: ObjectKind,
) -> Result<(), SceneError> {
    match scene.object_kind(id) {
        None => Err(SceneError::MissingObject(id.clone())),
        Some(actual) if actual != expected => Err(SceneError::WrongKind {
            id: id.clone(),
            expected,
            actual,
        }),
        Some(_) => Ok(()),
    }
}
