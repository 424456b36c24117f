//! Pinhole calibration matrix from a host camera rig.

use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::camera::{CameraModel, Projection, SensorFit};

/// Errors raised while deriving intrinsics.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IntrinsicsError {
    #[error("unsupported camera projection {0:?}, only perspective cameras have a pinhole K")]
    UnsupportedProjection(Projection),
    #[error("invalid camera parameter: {0}")]
    InvalidCamera(&'static str),
}

/// How the vertical focal length accounts for non-square pixels.
///
/// `Divide` computes `s_v = s_u / pixel_aspect_ratio`. Both variants agree
/// for square pixels; anamorphic rigs should be checked against a measured
/// calibration before trusting either.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AspectCorrection {
    #[default]
    Divide,
    Multiply,
}

/// Upper-triangular pinhole matrix `K` with zero skew.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicMatrix {
    k: Matrix3<f64>,
}

impl IntrinsicMatrix {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            k: Matrix3::new(
                fx, 0.0, cx, //
                0.0, fy, cy, //
                0.0, 0.0, 1.0,
            ),
        }
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.k
    }

    #[inline]
    pub fn fx(&self) -> f64 {
        self.k[(0, 0)]
    }

    #[inline]
    pub fn fy(&self) -> f64 {
        self.k[(1, 1)]
    }

    #[inline]
    pub fn cx(&self) -> f64 {
        self.k[(0, 2)]
    }

    #[inline]
    pub fn cy(&self) -> f64 {
        self.k[(1, 2)]
    }

    #[inline]
    pub fn skew(&self) -> f64 {
        self.k[(0, 1)]
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.k[(0, 0)], self.k[(0, 1)], self.k[(0, 2)]],
            [self.k[(1, 0)], self.k[(1, 1)], self.k[(1, 2)]],
            [self.k[(2, 0)], self.k[(2, 1)], self.k[(2, 2)]],
        ]
    }

    /// Closed-form inverse (K is always invertible for positive focal lengths).
    pub fn inverse(&self) -> Matrix3<f64> {
        let (fx, fy, cx, cy) = (self.fx(), self.fy(), self.cx(), self.cy());
        Matrix3::new(
            1.0 / fx,
            0.0,
            -cx / fx, //
            0.0,
            1.0 / fy,
            -cy / fy, //
            0.0,
            0.0,
            1.0,
        )
    }

    /// Unnormalized camera-space ray (z = 1) through pixel coordinates `uv`.
    #[inline]
    pub fn back_project(&self, uv: Point2<f64>) -> Vector3<f64> {
        Vector3::new(
            (uv.x - self.cx()) / self.fx(),
            (uv.y - self.cy()) / self.fy(),
            1.0,
        )
    }
}

/// Compute `K` with the default aspect handling.
pub fn compute_k(camera: &CameraModel) -> Result<IntrinsicMatrix, IntrinsicsError> {
    compute_k_with(camera, AspectCorrection::default())
}

/// Compute `K` for a perspective camera.
///
/// Resolution is scaled by `resolution_percentage` before use and the host's
/// inverted `shift_x` sign is undone.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(camera),
        fields(width = camera.resolution_x, height = camera.resolution_y)
    )
)]
pub fn compute_k_with(
    camera: &CameraModel,
    aspect: AspectCorrection,
) -> Result<IntrinsicMatrix, IntrinsicsError> {
    if camera.projection != Projection::Perspective {
        return Err(IntrinsicsError::UnsupportedProjection(camera.projection));
    }
    validate(camera)?;

    let (res_x, res_y) = camera.scaled_resolution();
    let fit = camera.sensor_fit.resolve(
        camera.pixel_aspect_x * res_x,
        camera.pixel_aspect_y * res_y,
    );
    let sensor_size_mm = match fit {
        SensorFit::Vertical => camera.sensor_height_mm,
        _ => camera.sensor_width_mm,
    };

    let pixel_aspect_ratio = camera.pixel_aspect_y / camera.pixel_aspect_x;
    let view_factor_px = match fit {
        SensorFit::Vertical => pixel_aspect_ratio * res_y,
        _ => res_x,
    };

    let pixel_size_mm = sensor_size_mm / view_factor_px;
    let s_u = camera.focal_length_mm / pixel_size_mm;
    let s_v = match aspect {
        AspectCorrection::Divide => s_u / pixel_aspect_ratio,
        AspectCorrection::Multiply => s_u * pixel_aspect_ratio,
    };

    let u_0 = res_x / 2.0 - camera.shift_x * view_factor_px;
    let v_0 = res_y / 2.0 + camera.shift_y * view_factor_px / pixel_aspect_ratio;

    Ok(IntrinsicMatrix::new(s_u, s_v, u_0, v_0))
}

fn validate(camera: &CameraModel) -> Result<(), IntrinsicsError> {
    fn positive(v: f64) -> bool {
        v.is_finite() && v > 0.0
    }
    if !positive(camera.focal_length_mm) {
        return Err(IntrinsicsError::InvalidCamera("focal_length_mm must be > 0"));
    }
    if !positive(camera.sensor_width_mm) || !positive(camera.sensor_height_mm) {
        return Err(IntrinsicsError::InvalidCamera("sensor size must be > 0"));
    }
    if camera.resolution_x == 0 || camera.resolution_y == 0 || camera.resolution_percentage == 0 {
        return Err(IntrinsicsError::InvalidCamera("resolution must be > 0"));
    }
    if !positive(camera.pixel_aspect_x) || !positive(camera.pixel_aspect_y) {
        return Err(IntrinsicsError::InvalidCamera("pixel aspect must be > 0"));
    }
    if !camera.shift_x.is_finite() || !camera.shift_y.is_finite() {
        return Err(IntrinsicsError::InvalidCamera("shift must be finite"));
    }
    Ok(())
}
