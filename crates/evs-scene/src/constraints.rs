//! Follow-path and track-to evaluation.
//!
//! Constraints are applied in stack order: the path constraint places the
//! camera on its curve, then track-to re-aims it at the target while keeping
//! the path position.

use evs_trajectory::{
    place_camera_on_trajectory, CameraPlacement, TrajectoryCurve, TrajectoryError,
};
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

use crate::objects::TrackAxis;

/// Place the camera on `curve` at `offset`, resized by the bound `scale`.
pub fn evaluate_follow_path(
    curve: &TrajectoryCurve,
    offset: f64,
    scale: f64,
) -> Result<CameraPlacement, TrajectoryError> {
    place_camera_on_trajectory(curve, offset, scale)
}

/// Re-aim `placement` so `axis` points at `target`, with local +Y kept as
/// close to world +Z as possible.
///
/// A camera sitting on its target keeps the incoming orientation.
pub fn apply_track_to(
    placement: CameraPlacement,
    target: &Point3<f64>,
    axis: TrackAxis,
) -> CameraPlacement {
    let Some(to_target) = (target - placement.position).try_normalize(1e-12) else {
        return placement;
    };
    let z = match axis {
        TrackAxis::PositiveZ => to_target,
        TrackAxis::NegativeZ => -to_target,
    };
    let project = |v: Vector3<f64>| (v - z * z.dot(&v)).try_normalize(1e-6);
    let Some(y) = project(Vector3::z())
        .or_else(|| project(placement.up()))
        .or_else(|| project(Vector3::y()))
    else {
        return placement;
    };
    let x = y.cross(&z);
    CameraPlacement {
        position: placement.position,
        rotation: Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x, y, z])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use evs_trajectory::TrajectoryId;

    fn at(position: Point3<f64>) -> CameraPlacement {
        CameraPlacement {
            position,
            rotation: Rotation3::identity(),
        }
    }

    #[test]
    fn follow_path_scales_about_the_curve_origin() {
        let curve = TrajectoryId::SineSphereTurn6.build_curve().expect("curve");
        let unit = evaluate_follow_path(&curve, 0.3, 1.0).expect("unit");
        let doubled = evaluate_follow_path(&curve, 0.3, 2.0).expect("doubled");
        assert_relative_eq!(
            doubled.position.coords,
            unit.position.coords * 2.0,
            epsilon = 1e-12
        );
        // Chords sit just inside the 0.5 shell.
        assert_relative_eq!(unit.position.coords.norm(), 0.5, epsilon = 1e-3);
        assert!(matches!(
            evaluate_follow_path(&curve, 0.3, 0.0),
            Err(TrajectoryError::InvalidScale(_))
        ));
    }

    #[test]
    fn positive_z_points_at_target_with_world_up() {
        let p = apply_track_to(
            at(Point3::new(0.5, 0.0, 0.0)),
            &Point3::origin(),
            TrackAxis::PositiveZ,
        );
        let r = p.rotation.matrix();
        assert_relative_eq!(r.column(2).into_owned(), -Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(r.column(1).into_owned(), Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.position, Point3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn negative_z_flips_the_view() {
        let p = apply_track_to(
            at(Point3::new(0.0, 0.3, 0.1)),
            &Point3::origin(),
            TrackAxis::NegativeZ,
        );
        let z = p.rotation.matrix().column(2).into_owned();
        assert_relative_eq!(z, Vector3::new(0.0, 0.3, 0.1).normalize(), epsilon = 1e-12);
    }

    #[test]
    fn target_straight_above_uses_path_up() {
        let base = CameraPlacement {
            position: Point3::new(0.0, 0.0, -1.0),
            rotation: Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[
                Vector3::y(),
                Vector3::z(),
                Vector3::x(),
            ])),
        };
        let p = apply_track_to(base, &Point3::origin(), TrackAxis::PositiveZ);
        let r = p.rotation.matrix();
        assert_relative_eq!(r.column(2).into_owned(), Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(r.column(1).into_owned(), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn coincident_target_is_a_no_op() {
        let base = at(Point3::origin());
        assert_eq!(apply_track_to(base, &Point3::origin(), TrackAxis::PositiveZ), base);
    }
}
