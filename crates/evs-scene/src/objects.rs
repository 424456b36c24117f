//! Typed scene objects.

use evs_core::{CameraModel, ObjectId, ObjectKind, ShapeBlend};
use evs_trajectory::TrajectoryCurve;
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Which camera axis the track-to constraint points at its target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackAxis {
    /// Local +Z towards the target; the camera looks away from it.
    #[default]
    PositiveZ,
    /// Local −Z towards the target; the camera looks at it.
    NegativeZ,
}

/// Path-follow binding of a camera.
#[derive(Clone, Debug, PartialEq)]
pub struct FollowPath {
    pub curve: ObjectId,
    /// Uniform delta scale on top of the curve's base scale.
    pub scale: f64,
    pub offset: f64,
}

#[derive(Clone, Debug)]
pub struct CameraObject {
    pub model: CameraModel,
    /// Rest transform, used when no path constraint is bound.
    pub rest: Matrix4<f64>,
    pub follow: Option<FollowPath>,
    pub track: Option<ObjectId>,
    pub track_axis: TrackAxis,
    /// Last evaluated world matrix.
    pub world: Matrix4<f64>,
    /// Set by every placement change, cleared by flush.
    pub dirty: bool,
}

impl CameraObject {
    pub fn new(model: CameraModel) -> Self {
        Self {
            model,
            rest: Matrix4::identity(),
            follow: None,
            track: None,
            track_axis: TrackAxis::default(),
            world: Matrix4::identity(),
            dirty: false,
        }
    }
}

/// Axis-aligned ellipsoid with a basis and a deformed shape key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    pub center: Point3<f64>,
    pub basis: Vector3<f64>,
    pub deformed: Vector3<f64>,
}

impl Ellipsoid {
    pub fn sphere(center: Point3<f64>, radius: f64) -> Self {
        let r = Vector3::new(radius, radius, radius);
        Self {
            center,
            basis: r,
            deformed: r,
        }
    }

    pub fn with_deformed(mut self, deformed: Vector3<f64>) -> Self {
        self.deformed = deformed;
        self
    }

    /// Radii for a shape-key blend.
    pub fn radii(&self, blend: ShapeBlend) -> Vector3<f64> {
        self.basis + (self.deformed - self.basis) * blend.weight()
    }
}

/// Procedural surface material.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshTexture {
    /// Pink mucosa with a darker vessel pattern.
    #[default]
    Mucosa,
    /// Latitude/longitude grid, for checking geometry.
    Grid,
}

#[derive(Clone, Debug)]
pub struct MeshObject {
    pub shape: Ellipsoid,
    pub texture: MeshTexture,
    pub blend: ShapeBlend,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightPlacement {
    Fixed(Point3<f64>),
    /// Rides with the rendering camera (endoscope tip light).
    AtCamera,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightObject {
    pub placement: LightPlacement,
    pub intensity: f64,
}

#[derive(Clone, Debug)]
pub enum SceneObject {
    Camera(CameraObject),
    Curve(TrajectoryCurve),
    Mesh(MeshObject),
    Light(LightObject),
}

impl SceneObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            SceneObject::Camera(_) => ObjectKind::Camera,
            SceneObject::Curve(_) => ObjectKind::Curve,
            SceneObject::Mesh(_) => ObjectKind::Mesh,
            SceneObject::Light(_) => ObjectKind::Light,
        }
    }
}
