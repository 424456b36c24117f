//! Path-follow placement of a camera on a trajectory curve.
//!
//! The follow frame binds camera forward to local +Y and camera up to local
//! +Z. Forward tracks the curve tangent; up is the curve object's +Z axis
//! made orthogonal to the tangent. The frame never uses curvature, so it is
//! defined through inflection points and straight runs alike.

use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::{TrajectoryCurve, TrajectoryError};

/// Fraction of the curve length used for the central-difference tangent.
const TANGENT_WINDOW: f64 = 1e-3;

/// World placement produced by the path-follow constraint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPlacement {
    pub position: Point3<f64>,
    /// Columns are the camera's local x, y (forward) and z (up) in world axes.
    pub rotation: Rotation3<f64>,
}

impl CameraPlacement {
    #[inline]
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation.matrix().column(1).into_owned()
    }

    #[inline]
    pub fn up(&self) -> Vector3<f64> {
        self.rotation.matrix().column(2).into_owned()
    }

    /// Object world matrix (unit scale).
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        nalgebra::Isometry3::from_parts(
            Translation3::from(self.position.coords),
            UnitQuaternion::from_rotation_matrix(&self.rotation),
        )
        .to_homogeneous()
    }
}

/// Validate an offset factor against the curve topology.
///
/// Closed curves wrap modulo 1; open curves accept `[0, 1]` only.
pub fn normalize_offset(
    curve: &TrajectoryCurve,
    offset_factor: f64,
) -> Result<f64, TrajectoryError> {
    let invalid = || TrajectoryError::InvalidOffset {
        curve: curve.name().to_string(),
        offset: offset_factor,
    };
    if !offset_factor.is_finite() {
        return Err(invalid());
    }
    if curve.is_closed() {
        Ok(offset_factor.rem_euclid(1.0))
    } else if (0.0..=1.0).contains(&offset_factor) {
        Ok(offset_factor)
    } else {
        Err(invalid())
    }
}

/// Place a camera on `curve` at `offset_factor`, with the curve resized by a
/// uniform delta `scale`.
///
/// Sampling is by arclength, so equal offset steps give equal distances.
pub fn place_camera_on_trajectory(
    curve: &TrajectoryCurve,
    offset_factor: f64,
    scale: f64,
) -> Result<CameraPlacement, TrajectoryError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(TrajectoryError::InvalidScale(scale));
    }
    let scale = curve
        .base_scale
        .component_mul(&Vector3::new(scale, scale, scale));
    sample_with_scale(curve, offset_factor, &scale)
}

fn sample_with_scale(
    curve: &TrajectoryCurve,
    offset_factor: f64,
    scale: &Vector3<f64>,
) -> Result<CameraPlacement, TrajectoryError> {
    let offset = normalize_offset(curve, offset_factor)?;
    let length = curve.local_length();
    let s = offset * length;

    let h = length * TANGENT_WINDOW;
    let (s0, s1) = if curve.is_closed() {
        (s - h, s + h)
    } else {
        ((s - h).max(0.0), (s + h).min(length))
    };

    let linear = curve.linear_map(scale);
    let local = curve.local_point_at(s);
    let position = curve.placement.translation * Point3::from(linear * local.coords);

    let tangent = linear * (curve.local_point_at(s1) - curve.local_point_at(s0));
    let forward = tangent
        .try_normalize(1e-12)
        .ok_or_else(|| TrajectoryError::DegenerateCurve(curve.name().to_string()))?;

    let axes = curve.placement.rotation.to_rotation_matrix();
    let up = orthogonal_up(&forward, &axes.matrix().column(2).into_owned())
        .or_else(|| orthogonal_up(&forward, &axes.matrix().column(0).into_owned()))
        .ok_or_else(|| TrajectoryError::DegenerateCurve(curve.name().to_string()))?;
    let right = forward.cross(&up);

    let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[right, forward, up]));
    Ok(CameraPlacement { position, rotation })
}

fn orthogonal_up(forward: &Vector3<f64>, reference: &Vector3<f64>) -> Option<Vector3<f64>> {
    (reference - forward * forward.dot(reference)).try_normalize(1e-6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, UnitQuaternion};

    fn zigzag() -> TrajectoryCurve {
        TrajectoryCurve::new(
            "zigzag",
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(3.0, 1.0, 0.5),
            ],
            false,
        )
        .expect("curve")
    }

    fn ring() -> TrajectoryCurve {
        let points = (0..64)
            .map(|i| {
                let a = i as f64 / 64.0 * std::f64::consts::TAU;
                Point3::new(a.cos(), a.sin(), 0.0)
            })
            .collect();
        TrajectoryCurve::new("ring", points, true).expect("ring")
    }

    #[test]
    fn open_curve_endpoints_at_zero_and_one() {
        let c = zigzag();
        let start = place_camera_on_trajectory(&c, 0.0, 1.0).expect("start");
        let end = place_camera_on_trajectory(&c, 1.0, 1.0).expect("end");
        assert_relative_eq!(start.position, Point3::new(0.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(end.position, Point3::new(3.0, 1.0, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn open_curve_rejects_out_of_range_offsets() {
        let c = zigzag();
        for offset in [-0.01, 1.01, f64::NAN] {
            assert!(matches!(
                place_camera_on_trajectory(&c, offset, 1.0),
                Err(TrajectoryError::InvalidOffset { .. })
            ));
        }
    }

    #[test]
    fn closed_curve_wraps_offsets() {
        let c = ring();
        let a = place_camera_on_trajectory(&c, 0.25, 1.0).expect("a");
        let b = place_camera_on_trajectory(&c, 1.25, 1.0).expect("b");
        let n = place_camera_on_trajectory(&c, -0.75, 1.0).expect("n");
        assert_relative_eq!(a.position, b.position, epsilon = 1e-12);
        assert_relative_eq!(a.position, n.position, epsilon = 1e-12);
    }

    #[test]
    fn scale_two_doubles_sample_spacing() {
        let c = zigzag();
        let offsets = [0.1, 0.45, 0.8];
        for w in offsets.windows(2) {
            let d1 = (place_camera_on_trajectory(&c, w[1], 1.0).expect("p").position
                - place_camera_on_trajectory(&c, w[0], 1.0).expect("p").position)
                .norm();
            let d2 = (place_camera_on_trajectory(&c, w[1], 2.0).expect("p").position
                - place_camera_on_trajectory(&c, w[0], 2.0).expect("p").position)
                .norm();
            assert_relative_eq!(d2, 2.0 * d1, epsilon = 1e-9);
        }
    }

    #[test]
    fn equal_offset_steps_give_equal_arclength() {
        let c = ring();
        let step = 1.0 / 16.0;
        let chords: Vec<f64> = (0..16)
            .map(|i| {
                let a = place_camera_on_trajectory(&c, i as f64 * step, 1.0).expect("a");
                let b = place_camera_on_trajectory(&c, (i + 1) as f64 * step, 1.0).expect("b");
                (b.position - a.position).norm()
            })
            .collect();
        for chord in &chords {
            assert_relative_eq!(*chord, chords[0], epsilon = 1e-9);
        }
    }

    #[test]
    fn follow_frame_is_orthonormal_and_tangent_aligned() {
        let c = ring();
        for i in 0..20 {
            let p = place_camera_on_trajectory(&c, i as f64 / 20.0, 1.5).expect("p");
            let r = p.rotation.matrix();
            assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-9);
            assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-9);
            // The ring lies in the xy plane: up stays +Z, forward stays tangent.
            assert_relative_eq!(p.up(), Vector3::z(), epsilon = 1e-9);
            let radial = p.position.coords.normalize();
            assert!(p.forward().dot(&radial).abs() < 0.06);
        }
    }

    #[test]
    fn vertical_tangent_falls_back_to_object_x() {
        let c = TrajectoryCurve::new(
            "shaft",
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 2.0)],
            false,
        )
        .expect("curve");
        let p = place_camera_on_trajectory(&c, 0.5, 1.0).expect("p");
        assert_relative_eq!(p.forward(), Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(p.up(), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn placement_moves_samples_rigidly() {
        let base = zigzag();
        let iso = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );
        let moved = zigzag().with_placement(iso);
        let a = place_camera_on_trajectory(&base, 0.3, 1.0).expect("a");
        let b = place_camera_on_trajectory(&moved, 0.3, 1.0).expect("b");
        assert_relative_eq!(b.position, iso * a.position, epsilon = 1e-12);
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        assert!(matches!(
            place_camera_on_trajectory(&zigzag(), 0.5, 0.0),
            Err(TrajectoryError::InvalidScale(_))
        ));
    }
}
