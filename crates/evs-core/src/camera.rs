//! Host camera description: lens, sensor and render resolution.

use serde::{Deserialize, Serialize};

/// Projection type of a host camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
    Panoramic,
}

/// Which sensor dimension the focal length refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SensorFit {
    /// Pick from the aspect of the rendered image.
    #[default]
    Auto,
    Horizontal,
    Vertical,
}

impl SensorFit {
    /// Resolve `Auto` against the pixel-aspect-corrected image size.
    ///
    /// Ties resolve to `Horizontal`.
    pub fn resolve(self, size_x: f64, size_y: f64) -> SensorFit {
        match self {
            SensorFit::Auto if size_x >= size_y => SensorFit::Horizontal,
            SensorFit::Auto => SensorFit::Vertical,
            fit => fit,
        }
    }
}

/// Snapshot of the camera rig as the host scene exposes it.
///
/// Lengths are in millimetres, shifts are fractions of the larger sensor
/// dimension, resolution is in pixels before `resolution_percentage` scaling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    #[serde(default)]
    pub projection: Projection,
    pub focal_length_mm: f64,
    pub sensor_width_mm: f64,
    pub sensor_height_mm: f64,
    #[serde(default)]
    pub sensor_fit: SensorFit,
    #[serde(default)]
    pub shift_x: f64,
    #[serde(default)]
    pub shift_y: f64,
    pub resolution_x: u32,
    pub resolution_y: u32,
    #[serde(default = "default_resolution_percentage")]
    pub resolution_percentage: u32,
    #[serde(default = "default_pixel_aspect")]
    pub pixel_aspect_x: f64,
    #[serde(default = "default_pixel_aspect")]
    pub pixel_aspect_y: f64,
}

fn default_resolution_percentage() -> u32 {
    100
}

fn default_pixel_aspect() -> f64 {
    1.0
}

impl Default for CameraModel {
    /// Endoscope rig: 120° horizontal FOV on an 18 mm sensor, 1080×1080 px.
    fn default() -> Self {
        Self::from_horizontal_fov(120.0, 18.0, 1080, 1080)
    }
}

impl CameraModel {
    /// Build a perspective camera from a horizontal field of view.
    ///
    /// The focal length is derived as `w / 2 / tan(fov / 2)` with the sensor
    /// fitted horizontally; the sensor height follows the image aspect.
    pub fn from_horizontal_fov(
        fov_deg: f64,
        sensor_width_mm: f64,
        resolution_x: u32,
        resolution_y: u32,
    ) -> Self {
        let half = (fov_deg.to_radians() * 0.5).tan();
        let sensor_height_mm = if resolution_x > 0 {
            sensor_width_mm * resolution_y as f64 / resolution_x as f64
        } else {
            sensor_width_mm
        };
        Self {
            projection: Projection::Perspective,
            focal_length_mm: sensor_width_mm * 0.5 / half,
            sensor_width_mm,
            sensor_height_mm,
            sensor_fit: SensorFit::Horizontal,
            shift_x: 0.0,
            shift_y: 0.0,
            resolution_x,
            resolution_y,
            resolution_percentage: 100,
            pixel_aspect_x: 1.0,
            pixel_aspect_y: 1.0,
        }
    }

    /// Same rig rendered at a different resolution.
    pub fn with_resolution(mut self, resolution_x: u32, resolution_y: u32) -> Self {
        self.resolution_x = resolution_x;
        self.resolution_y = resolution_y;
        self
    }

    /// Effective render size in pixels after percentage scaling.
    pub fn scaled_resolution(&self) -> (f64, f64) {
        let scale = self.resolution_percentage as f64 / 100.0;
        (
            scale * self.resolution_x as f64,
            scale * self.resolution_y as f64,
        )
    }

    /// Integer image size used for rendering (`floor` of the scaled size).
    pub fn image_size(&self) -> (u32, u32) {
        let (w, h) = self.scaled_resolution();
        (w as u32, h as u32)
    }

    /// Horizontal field of view in degrees, for a horizontally fitted sensor.
    pub fn horizontal_fov_deg(&self) -> f64 {
        (2.0 * (self.sensor_width_mm * 0.5 / self.focal_length_mm).atan()).to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn auto_fit_prefers_horizontal_on_ties() {
        assert_eq!(SensorFit::Auto.resolve(640.0, 640.0), SensorFit::Horizontal);
        assert_eq!(SensorFit::Auto.resolve(480.0, 640.0), SensorFit::Vertical);
        assert_eq!(
            SensorFit::Vertical.resolve(800.0, 10.0),
            SensorFit::Vertical
        );
    }

    #[test]
    fn fov_constructor_round_trips() {
        let cam = CameraModel::from_horizontal_fov(90.0, 36.0, 640, 480);
        assert_relative_eq!(cam.focal_length_mm, 18.0, epsilon = 1e-9);
        assert_relative_eq!(cam.horizontal_fov_deg(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(cam.sensor_height_mm, 27.0, epsilon = 1e-9);
    }

    #[test]
    fn percentage_scales_image_size() {
        let mut cam = CameraModel::default();
        cam.resolution_percentage = 50;
        assert_eq!(cam.image_size(), (540, 540));
    }

    #[test]
    fn config_fields_default_when_missing() {
        let json = r#"{
            "focal_length_mm": 35.0,
            "sensor_width_mm": 36.0,
            "sensor_height_mm": 24.0,
            "resolution_x": 1920,
            "resolution_y": 1080
        }"#;
        let cam: CameraModel = serde_json::from_str(json).expect("parse");
        assert_eq!(cam.projection, Projection::Perspective);
        assert_eq!(cam.sensor_fit, SensorFit::Auto);
        assert_eq!(cam.resolution_percentage, 100);
        assert_eq!(cam.pixel_aspect_y, 1.0);
    }
}
