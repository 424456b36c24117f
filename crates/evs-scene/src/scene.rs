use std::collections::BTreeMap;
use std::path::Path;

use evs_core::{
    compute_k, world_to_cv_pose, CameraModel, ObjectId, ObjectKind, RenderMode, SceneError,
    SceneHandle, ShapeBlend,
};
use evs_trajectory::{normalize_offset, CameraPlacement, TrajectoryCurve, TrajectoryId};
use image::RgbImage;
use log::{debug, trace};
use nalgebra::{Matrix4, Point3, Vector3};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::constraints::{apply_track_to, evaluate_follow_path};
use crate::objects::{
    CameraObject, Ellipsoid, FollowPath, LightObject, LightPlacement, MeshObject, MeshTexture,
    SceneObject, TrackAxis,
};
use crate::render::{render_image, RenderJob, RenderSurface};

pub const DEFAULT_CAMERA: &str = "endo_cam";
pub const DEFAULT_LIGHTS: [&str; 2] = ["Point", "endo_light"];
pub const DEFAULT_MODELS: [&str; 3] = ["bladder_sphere", "grid_sphere", "bladder_inner"];

#[derive(Clone, Debug)]
struct Entry {
    object: SceneObject,
    visible: bool,
}

/// In-memory scene with a typed object registry and a ray-cast renderer.
///
/// Placement changes mark the camera dirty; [`SceneHandle::flush_transform`]
/// evaluates follow-path then track-to for every dirty camera. Rendering
/// evaluates pending constraints first, like a host renderer that updates
/// its dependency graph before drawing.
#[derive(Clone, Debug, Default)]
pub struct SyntheticScene {
    objects: BTreeMap<ObjectId, Entry>,
    lens_distortion: f64,
    last_frame: Option<RgbImage>,
}

impl SyntheticScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endoscopy rig: one camera, two lights, three organ models and one
    /// curve per catalog trajectory, all centred on the origin.
    pub fn endoscopy(camera: CameraModel) -> Result<Self, evs_trajectory::TrajectoryError> {
        let mut scene = Self::new();
        scene.insert_camera(DEFAULT_CAMERA, camera);
        scene.insert_light(
            "Point",
            LightObject {
                placement: LightPlacement::Fixed(Point3::origin()),
                intensity: 1.5,
            },
        );
        scene.insert_light(
            "endo_light",
            LightObject {
                placement: LightPlacement::AtCamera,
                intensity: 1.0,
            },
        );
        scene.insert_mesh(
            "bladder_sphere",
            Ellipsoid::sphere(Point3::origin(), 1.0).with_deformed(Vector3::new(1.1, 1.1, 0.75)),
            MeshTexture::Mucosa,
        );
        scene.insert_mesh(
            "grid_sphere",
            Ellipsoid::sphere(Point3::origin(), 1.0).with_deformed(Vector3::new(1.1, 1.1, 0.75)),
            MeshTexture::Grid,
        );
        scene.insert_mesh(
            "bladder_inner",
            Ellipsoid::sphere(Point3::origin(), 0.7).with_deformed(Vector3::new(0.8, 0.75, 0.5)),
            MeshTexture::Mucosa,
        );
        for id in TrajectoryId::ALL {
            scene.insert_curve(id.name(), id.build_curve()?);
        }
        Ok(scene)
    }

    fn insert(&mut self, id: impl Into<ObjectId>, object: SceneObject) {
        self.objects.insert(
            id.into(),
            Entry {
                object,
                visible: true,
            },
        );
    }

    pub fn insert_camera(&mut self, id: impl Into<ObjectId>, model: CameraModel) {
        self.insert(id, SceneObject::Camera(CameraObject::new(model)));
    }

    pub fn insert_curve(&mut self, id: impl Into<ObjectId>, curve: TrajectoryCurve) {
        self.insert(id, SceneObject::Curve(curve));
    }

    pub fn insert_mesh(&mut self, id: impl Into<ObjectId>, shape: Ellipsoid, texture: MeshTexture) {
        self.insert(
            id,
            SceneObject::Mesh(MeshObject {
                shape,
                texture,
                blend: ShapeBlend::Basis,
            }),
        );
    }

    pub fn insert_light(&mut self, id: impl Into<ObjectId>, light: LightObject) {
        self.insert(id, SceneObject::Light(light));
    }

    /// Replace the lens/sensor settings of a camera.
    pub fn set_camera_model(
        &mut self,
        id: &ObjectId,
        model: CameraModel,
    ) -> Result<(), SceneError> {
        self.camera_mut(id)?.model = model;
        Ok(())
    }

    pub fn set_track_axis(&mut self, id: &ObjectId, axis: TrackAxis) -> Result<(), SceneError> {
        let cam = self.camera_mut(id)?;
        cam.track_axis = axis;
        cam.dirty = true;
        Ok(())
    }

    pub fn is_visible(&self, id: &ObjectId) -> Option<bool> {
        self.objects.get(id).map(|e| e.visible)
    }

    pub fn shape_blend(&self, id: &ObjectId) -> Option<ShapeBlend> {
        match self.objects.get(id).map(|e| &e.object) {
            Some(SceneObject::Mesh(m)) => Some(m.blend),
            _ => None,
        }
    }

    pub fn lens_distortion(&self) -> f64 {
        self.lens_distortion
    }

    /// Image produced by the most recent `render_frame`.
    pub fn last_frame(&self) -> Option<&RgbImage> {
        self.last_frame.as_ref()
    }

    pub fn object_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.objects.keys()
    }

    fn entry(&self, id: &ObjectId, expected: ObjectKind) -> Result<&Entry, SceneError> {
        let entry = self
            .objects
            .get(id)
            .ok_or_else(|| SceneError::MissingObject(id.clone()))?;
        let actual = entry.object.kind();
        if actual != expected {
            return Err(SceneError::WrongKind {
                id: id.clone(),
                expected,
                actual,
            });
        }
        Ok(entry)
    }

    fn object_mut(
        &mut self,
        id: &ObjectId,
        expected: ObjectKind,
    ) -> Result<&mut SceneObject, SceneError> {
        self.entry(id, expected)?;
        self.objects
            .get_mut(id)
            .map(|e| &mut e.object)
            .ok_or_else(|| SceneError::MissingObject(id.clone()))
    }

    fn camera(&self, id: &ObjectId) -> Result<&CameraObject, SceneError> {
        match &self.entry(id, ObjectKind::Camera)?.object {
            SceneObject::Camera(c) => Ok(c),
            _ => Err(SceneError::MissingObject(id.clone())),
        }
    }

    fn camera_mut(&mut self, id: &ObjectId) -> Result<&mut CameraObject, SceneError> {
        match self.object_mut(id, ObjectKind::Camera)? {
            SceneObject::Camera(c) => Ok(c),
            _ => Err(SceneError::MissingObject(id.clone())),
        }
    }

    fn curve(&self, id: &ObjectId) -> Result<&TrajectoryCurve, SceneError> {
        match &self.entry(id, ObjectKind::Curve)?.object {
            SceneObject::Curve(c) => Ok(c),
            _ => Err(SceneError::MissingObject(id.clone())),
        }
    }

    /// World origin of any object, used as a track-to target.
    fn object_origin(&self, id: &ObjectId) -> Result<Point3<f64>, SceneError> {
        let entry = self
            .objects
            .get(id)
            .ok_or_else(|| SceneError::MissingObject(id.clone()))?;
        Ok(match &entry.object {
            SceneObject::Mesh(m) => m.shape.center,
            SceneObject::Light(l) => match l.placement {
                LightPlacement::Fixed(p) => p,
                LightPlacement::AtCamera => Point3::origin(),
            },
            SceneObject::Curve(c) => Point3::from(c.placement.translation.vector),
            SceneObject::Camera(c) => translation_of(&c.world),
        })
    }

    fn evaluate_camera(&self, id: &ObjectId) -> Result<Matrix4<f64>, SceneError> {
        let cam = self.camera(id)?;
        let Some(follow) = &cam.follow else {
            return Ok(cam.rest);
        };
        let curve = self.curve(&follow.curve)?;
        let mut placement: CameraPlacement =
            evaluate_follow_path(curve, follow.offset, follow.scale).map_err(|e| {
                SceneError::Placement {
                    object: id.clone(),
                    reason: e.to_string(),
                }
            })?;
        if let Some(target) = &cam.track {
            placement = apply_track_to(placement, &self.object_origin(target)?, cam.track_axis);
        }
        Ok(placement.to_homogeneous())
    }

    fn visible_scene(
        &self,
        camera_world: &Matrix4<f64>,
    ) -> (Vec<RenderSurface>, Vec<(Point3<f64>, f64)>) {
        let camera_position = translation_of(camera_world);
        let mut surfaces = Vec::new();
        let mut lights = Vec::new();
        for entry in self.objects.values().filter(|e| e.visible) {
            match &entry.object {
                SceneObject::Mesh(m) => surfaces.push(RenderSurface::new(
                    &m.shape,
                    m.shape.radii(m.blend),
                    m.texture,
                )),
                SceneObject::Light(l) => {
                    let position = match l.placement {
                        LightPlacement::Fixed(p) => p,
                        LightPlacement::AtCamera => camera_position,
                    };
                    lights.push((position, l.intensity));
                }
                SceneObject::Camera(_) | SceneObject::Curve(_) => {}
            }
        }
        (surfaces, lights)
    }
}

impl SceneHandle for SyntheticScene {
    fn object_kind(&self, id: &ObjectId) -> Option<ObjectKind> {
        self.objects.get(id).map(|e| e.object.kind())
    }

    fn camera_model(&self, camera: &ObjectId) -> Result<CameraModel, SceneError> {
        Ok(self.camera(camera)?.model)
    }

    fn hide_all(&mut self) {
        for entry in self.objects.values_mut() {
            entry.visible = false;
        }
    }

    fn set_visible(&mut self, id: &ObjectId, visible: bool) -> Result<(), SceneError> {
        let entry = self
            .objects
            .get_mut(id)
            .ok_or_else(|| SceneError::MissingObject(id.clone()))?;
        entry.visible = visible;
        Ok(())
    }

    fn bind_trajectory(
        &mut self,
        camera: &ObjectId,
        curve: &ObjectId,
        scale: f64,
    ) -> Result<(), SceneError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(SceneError::Placement {
                object: curve.clone(),
                reason: format!("trajectory scale must be positive, got {scale}"),
            });
        }
        self.camera(camera)?;
        match self.object_mut(curve, ObjectKind::Curve)? {
            SceneObject::Curve(c) => c.set_uniform_delta_scale(scale),
            _ => return Err(SceneError::MissingObject(curve.clone())),
        }
        let cam = self.camera_mut(camera)?;
        cam.follow = Some(FollowPath {
            curve: curve.clone(),
            scale,
            offset: 0.0,
        });
        cam.dirty = true;
        debug!("bound {camera} to {curve} at scale {scale}");
        Ok(())
    }

    fn set_path_offset(&mut self, camera: &ObjectId, offset_factor: f64) -> Result<(), SceneError> {
        let curve_id = self
            .camera(camera)?
            .follow
            .as_ref()
            .map(|f| f.curve.clone())
            .ok_or_else(|| SceneError::Placement {
                object: camera.clone(),
                reason: "no trajectory bound".to_string(),
            })?;
        normalize_offset(self.curve(&curve_id)?, offset_factor).map_err(|e| {
            SceneError::Placement {
                object: camera.clone(),
                reason: e.to_string(),
            }
        })?;
        let cam = self.camera_mut(camera)?;
        if let Some(follow) = cam.follow.as_mut() {
            follow.offset = offset_factor;
        }
        cam.dirty = true;
        Ok(())
    }

    fn set_track_target(&mut self, camera: &ObjectId, target: &ObjectId) -> Result<(), SceneError> {
        if !self.objects.contains_key(target) {
            return Err(SceneError::MissingObject(target.clone()));
        }
        let cam = self.camera_mut(camera)?;
        cam.track = Some(target.clone());
        cam.dirty = true;
        Ok(())
    }

    fn set_shape_blend(&mut self, model: &ObjectId, blend: ShapeBlend) -> Result<(), SceneError> {
        if !blend.weight().is_finite() {
            return Err(SceneError::Placement {
                object: model.clone(),
                reason: format!("shape blend weight {} is not finite", blend.weight()),
            });
        }
        match self.object_mut(model, ObjectKind::Mesh)? {
            SceneObject::Mesh(m) => m.blend = blend,
            _ => return Err(SceneError::MissingObject(model.clone())),
        }
        Ok(())
    }

    fn set_lens_distortion(&mut self, amount: f64) -> Result<(), SceneError> {
        if !amount.is_finite() {
            return Err(SceneError::Placement {
                object: ObjectId::from("lens_distortion"),
                reason: format!("distortion amount {amount} is not finite"),
            });
        }
        self.lens_distortion = amount;
        Ok(())
    }

    fn flush_transform(&mut self) -> Result<(), SceneError> {
        let dirty: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, e)| matches!(&e.object, SceneObject::Camera(c) if c.dirty))
            .map(|(id, _)| id.clone())
            .collect();
        for id in dirty {
            let world = self.evaluate_camera(&id)?;
            let cam = self.camera_mut(&id)?;
            cam.world = world;
            cam.dirty = false;
            trace!("flushed {id}");
        }
        Ok(())
    }

    fn camera_world_transform(&self, camera: &ObjectId) -> Result<Matrix4<f64>, SceneError> {
        let cam = self.camera(camera)?;
        if cam.dirty {
            return Err(SceneError::StaleTransform(camera.clone()));
        }
        Ok(cam.world)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(camera = %camera, mode = ?mode))
    )]
    fn render_frame(
        &mut self,
        camera: &ObjectId,
        path: &Path,
        mode: RenderMode,
        write_still: bool,
    ) -> Result<(), SceneError> {
        self.flush_transform()?;
        let render_err = |reason: String| SceneError::Render {
            path: path.to_path_buf(),
            reason,
        };

        let cam = self.camera(camera)?;
        let k = compute_k(&cam.model).map_err(|e| render_err(e.to_string()))?;
        let pose = world_to_cv_pose(&cam.world).map_err(|e| render_err(e.to_string()))?;
        let size = cam.model.image_size();
        if size.0 == 0 || size.1 == 0 {
            return Err(render_err(format!("empty image size {size:?}")));
        }
        let (surfaces, lights) = self.visible_scene(&cam.world);

        let image = render_image(&RenderJob {
            k: &k,
            pose: &pose,
            size,
            mode,
            lens_distortion: self.lens_distortion,
            surfaces: &surfaces,
            lights: &lights,
        });
        if write_still {
            image.save(path).map_err(|e| render_err(e.to_string()))?;
            debug!("wrote {}", path.display());
        }
        self.last_frame = Some(image);
        Ok(())
    }
}

fn translation_of(m: &Matrix4<f64>) -> Point3<f64> {
    Point3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}
