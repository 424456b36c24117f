use nalgebra::{Matrix3x4, Point2, Point3};

use crate::intrinsics::IntrinsicMatrix;
use crate::pose::CvPose;

/// `P = K [R | t]`.
pub fn projection_matrix(k: &IntrinsicMatrix, pose: &CvPose) -> Matrix3x4<f64> {
    k.matrix() * pose.rt_3x4()
}

/// Project a world point to pixel coordinates.
///
/// Returns `None` for points on or behind the image plane.
pub fn project_point(
    k: &IntrinsicMatrix,
    pose: &CvPose,
    world: &Point3<f64>,
) -> Option<Point2<f64>> {
    let cam = pose.transform_point(world);
    if cam.z <= 1e-12 {
        return None;
    }
    Some(Point2::new(
        k.fx() * cam.x / cam.z + k.skew() * cam.y / cam.z + k.cx(),
        k.fy() * cam.y / cam.z + k.cy(),
    ))
}
