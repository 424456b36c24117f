//! Host camera transforms to computer-vision extrinsics.
//!
//! Three frames are involved:
//! - world: right-handed scene frame,
//! - host camera (`bcam`): x right, y up, looking down −z,
//! - CV camera: x right, y down, looking down +z.

use nalgebra::{
    Isometry3, Matrix3, Matrix3x4, Matrix4, Point3, Quaternion, Rotation3, Translation3,
    UnitQuaternion, Vector3,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::scene::{ObjectId, SceneError, SceneHandle};

/// Errors raised while converting camera transforms.
#[derive(thiserror::Error, Debug)]
pub enum PoseError {
    #[error("camera world transform is degenerate (zero scale or non-finite entries)")]
    DegenerateTransform,
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// World → CV camera rigid transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CvPose {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

/// Translation + unit quaternion encoding used for ground-truth files.
///
/// `q` is stored as `[x, y, z, w]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseTq {
    pub t: [f64; 3],
    pub q: [f64; 4],
}

impl PoseTq {
    /// Build from an isometry, canonicalizing the quaternion to `w >= 0`.
    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        let mut q = *iso.rotation.quaternion();
        if q.w < 0.0 {
            q = -q;
        }
        let t = iso.translation.vector;
        Self {
            t: [t.x, t.y, t.z],
            q: [q.i, q.j, q.k, q.w],
        }
    }

    pub fn quaternion_norm(&self) -> f64 {
        self.q.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Rebuild the rotation encoded by `q`.
    pub fn rotation(&self) -> Rotation3<f64> {
        let [x, y, z, w] = self.q;
        UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)).to_rotation_matrix()
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        let [x, y, z, w] = self.q;
        Isometry3::from_parts(
            Translation3::new(self.t[0], self.t[1], self.t[2]),
            UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
        )
    }
}

/// Fixed basis change from host camera axes to CV camera axes.
pub fn bcam_to_cv() -> Rotation3<f64> {
    Rotation3::from_matrix_unchecked(Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0)))
}

impl CvPose {
    /// 3×4 `[R | t]`.
    pub fn rt_3x4(&self) -> Matrix3x4<f64> {
        let mut rt = Matrix3x4::zeros();
        rt.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(self.rotation.matrix());
        rt.set_column(3, &self.translation);
        rt
    }

    /// 4×4 homogeneous `[R | t; 0 0 0 1]`.
    pub fn rt_4x4(&self) -> Matrix4<f64> {
        self.isometry().to_homogeneous()
    }

    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.translation),
            UnitQuaternion::from_rotation_matrix(&self.rotation),
        )
    }

    /// Translation + quaternion form of the same transform.
    pub fn to_tq(&self) -> PoseTq {
        PoseTq::from_isometry(&self.isometry())
    }

    /// Camera centre in world coordinates (`-Rᵀ t`).
    pub fn camera_center(&self) -> Point3<f64> {
        Point3::from(-(self.rotation.transpose() * self.translation))
    }

    /// Map a world point into CV camera coordinates.
    #[inline]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * p.coords + self.translation)
    }
}

/// Split a world matrix into location and pure rotation.
///
/// Column scale is removed; a negative determinant (mirrored object) flips
/// the x axis so the rotation stays proper.
pub fn decompose_world_matrix(
    world: &Matrix4<f64>,
) -> Result<(Vector3<f64>, Rotation3<f64>), PoseError> {
    if world.iter().any(|v| !v.is_finite()) {
        return Err(PoseError::DegenerateTransform);
    }
    let location = Vector3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)]);
    let mut basis = Matrix3::from_fn(|r, c| world[(r, c)]);
    for c in 0..3 {
        let norm = basis.column(c).norm();
        if norm < 1e-12 {
            return Err(PoseError::DegenerateTransform);
        }
        basis.column_mut(c).unscale_mut(norm);
    }
    if basis.determinant() < 0.0 {
        basis.column_mut(0).neg_mut();
    }
    if (basis * basis.transpose() - Matrix3::identity()).norm() < 1e-9 {
        return Ok((location, Rotation3::from_matrix_unchecked(basis)));
    }
    // Polar factor removes residual shear.
    let svd = basis.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::DegenerateTransform);
    };
    Ok((location, Rotation3::from_matrix_unchecked(u * v_t)))
}

/// Convert an effective host camera world matrix into a CV world→camera pose.
pub fn world_to_cv_pose(camera_world: &Matrix4<f64>) -> Result<CvPose, PoseError> {
    let (location, rotation) = decompose_world_matrix(camera_world)?;

    let r_world2bcam = rotation.transpose();
    let t_world2bcam = -(r_world2bcam * location);

    let r_bcam2cv = bcam_to_cv();
    let r_world2cv = r_bcam2cv * r_world2bcam;
    let t_world2cv = r_bcam2cv * t_world2bcam;

    Ok(CvPose {
        rotation: r_world2cv,
        translation: t_world2cv,
    })
}

/// Read the settled camera transform from a scene and convert it.
///
/// Fails with [`SceneError::StaleTransform`] when placement changes are still
/// pending; callers must run `flush_transform` first.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "trace", skip(scene), fields(camera = %camera))
)]
pub fn read_cv_pose<S: SceneHandle + ?Sized>(
    scene: &S,
    camera: &ObjectId,
) -> Result<CvPose, PoseError> {
    let world = scene.camera_world_transform(camera)?;
    world_to_cv_pose(&world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera_world(axis: Vector3<f64>, angle: f64, location: Vector3<f64>) -> Matrix4<f64> {
        let rot = Rotation3::from_axis_angle(&nalgebra::Unit::new_normalize(axis), angle);
        Isometry3::from_parts(
            Translation3::from(location),
            UnitQuaternion::from_rotation_matrix(&rot),
        )
        .to_homogeneous()
    }

    #[test]
    fn identity_camera_flips_y_and_z() {
        let pose = world_to_cv_pose(&Matrix4::identity()).expect("pose");
        assert_relative_eq!(
            *pose.rotation.matrix(),
            Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0))
        );
        assert_relative_eq!(pose.translation, Vector3::zeros());
        // A point in front of the host camera (−z) lands at +z in CV axes.
        let p = pose.transform_point(&Point3::new(0.0, 0.0, -2.0));
        assert_relative_eq!(p, Point3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn translation_matches_camera_center() {
        let world = camera_world(Vector3::new(0.3, -1.0, 0.4), 0.8, Vector3::new(1.0, 2.0, 3.0));
        let pose = world_to_cv_pose(&world).expect("pose");
        assert_relative_eq!(
            pose.camera_center(),
            Point3::new(1.0, 2.0, 3.0),
            epsilon = 1e-12
        );
        let r = pose.rotation.matrix();
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn quaternion_round_trips_rotation() {
        for (axis, angle) in [
            (Vector3::new(1.0, 0.0, 0.0), 0.3),
            (Vector3::new(0.2, 0.9, -0.4), 2.9),
            (Vector3::new(-0.5, 0.1, 1.0), -1.7),
            (Vector3::new(0.0, 0.0, 1.0), std::f64::consts::PI),
        ] {
            let world = camera_world(axis, angle, Vector3::new(-0.4, 0.2, 0.9));
            let pose = world_to_cv_pose(&world).expect("pose");
            let tq = pose.to_tq();
            assert_relative_eq!(tq.quaternion_norm(), 1.0, epsilon = 1e-12);
            assert!(tq.q[3] >= 0.0);
            assert_relative_eq!(
                *tq.rotation().matrix(),
                *pose.rotation.matrix(),
                epsilon = 1e-5
            );
            assert_relative_eq!(tq.t[0], pose.translation.x, epsilon = 1e-12);
        }
    }

    #[test]
    fn rt_matrices_share_blocks() {
        let world = camera_world(Vector3::new(0.0, 1.0, 1.0), 1.1, Vector3::new(0.5, 0.0, -1.0));
        let pose = world_to_cv_pose(&world).expect("pose");
        let rt = pose.rt_3x4();
        let rt4 = pose.rt_4x4();
        for r in 0..3 {
            for c in 0..4 {
                assert_relative_eq!(rt[(r, c)], rt4[(r, c)], epsilon = 1e-12);
            }
        }
        assert_eq!(rt4.row(3).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn scaled_world_matrix_is_normalized() {
        let mut world = camera_world(Vector3::new(0.0, 0.0, 1.0), 0.5, Vector3::new(1.0, 0.0, 0.0));
        for c in 0..3 {
            world.column_mut(c).scale_mut(3.0);
        }
        let unscaled = camera_world(Vector3::new(0.0, 0.0, 1.0), 0.5, Vector3::new(1.0, 0.0, 0.0));
        let a = world_to_cv_pose(&world).expect("scaled");
        let b = world_to_cv_pose(&unscaled).expect("unscaled");
        assert_relative_eq!(*a.rotation.matrix(), *b.rotation.matrix(), epsilon = 1e-9);
        assert_relative_eq!(a.translation, b.translation, epsilon = 1e-9);
    }

    #[test]
    fn zero_scale_is_degenerate() {
        let mut world = Matrix4::identity();
        world[(0, 0)] = 0.0;
        assert!(matches!(
            world_to_cv_pose(&world),
            Err(PoseError::DegenerateTransform)
        ));
    }
}
