//! CPU ray caster for the synthetic organ scene.
//!
//! One primary ray per pixel centre, cast through `K⁻¹` with a radial lens
//! distortion term, intersected with every visible ellipsoid. `RENDER` mode
//! shades with the scene lights and distance falloff; `SNAPSHOT` mode shows
//! the flat material colour.

use std::f64::consts::{PI, TAU};

use evs_core::{CvPose, IntrinsicMatrix, RenderMode};
use image::{Rgb, RgbImage};
use nalgebra::{Point2, Point3, Vector3};

use crate::objects::{Ellipsoid, MeshTexture};

const AMBIENT: f64 = 0.08;
const HIT_EPS: f64 = 1e-9;

/// Visible surface as seen by the renderer.
#[derive(Clone, Copy, Debug)]
pub struct RenderSurface {
    pub center: Point3<f64>,
    pub radii: Vector3<f64>,
    pub texture: MeshTexture,
}

impl RenderSurface {
    pub fn new(shape: &Ellipsoid, radii: Vector3<f64>, texture: MeshTexture) -> Self {
        Self {
            center: shape.center,
            radii,
            texture,
        }
    }

    /// Nearest positive ray parameter, if the ray hits.
    fn intersect(&self, origin: &Point3<f64>, dir: &Vector3<f64>) -> Option<f64> {
        let o = (origin - self.center).component_div(&self.radii);
        let d = dir.component_div(&self.radii);
        let a = d.norm_squared();
        let b = 2.0 * o.dot(&d);
        let c = o.norm_squared() - 1.0;
        let disc = b * b - 4.0 * a * c;
        if a <= 0.0 || disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let t0 = (-b - sq) / (2.0 * a);
        let t1 = (-b + sq) / (2.0 * a);
        [t0, t1].into_iter().find(|t| *t > HIT_EPS)
    }

    fn normal_at(&self, p: &Point3<f64>) -> Vector3<f64> {
        let local = p - self.center;
        let r2 = self.radii.component_mul(&self.radii);
        local.component_div(&r2).normalize()
    }

    fn albedo(&self, p: &Point3<f64>) -> [f64; 3] {
        let local = (p - self.center).component_div(&self.radii);
        let polar = local.z.clamp(-1.0, 1.0).acos();
        let azimuth = local.y.atan2(local.x).rem_euclid(TAU);
        match self.texture {
            MeshTexture::Mucosa => {
                let vessel = (9.0 * azimuth + 3.0 * (5.0 * polar).sin()).sin()
                    * (7.0 * polar + 2.0 * (4.0 * azimuth).cos()).sin();
                let v = vessel.abs().powf(8.0);
                [0.85 - 0.35 * v, 0.45 - 0.3 * v, 0.42 - 0.25 * v]
            }
            MeshTexture::Grid => {
                let line = |x: f64| {
                    let f = x.fract();
                    f < 0.04 || f > 0.96
                };
                if line(azimuth / TAU * 24.0) || line(polar / PI * 12.0) {
                    [0.1, 0.1, 0.1]
                } else {
                    [0.9, 0.9, 0.85]
                }
            }
        }
    }
}

/// Per-frame render inputs.
#[derive(Clone, Debug)]
pub struct RenderJob<'a> {
    pub k: &'a IntrinsicMatrix,
    pub pose: &'a CvPose,
    pub size: (u32, u32),
    pub mode: RenderMode,
    pub lens_distortion: f64,
    pub surfaces: &'a [RenderSurface],
    /// World positions and intensities of the visible lights.
    pub lights: &'a [(Point3<f64>, f64)],
}

/// Apply radial distortion to normalized image coordinates.
#[inline]
pub fn distort(xn: f64, yn: f64, amount: f64) -> (f64, f64) {
    let f = 1.0 + amount * (xn * xn + yn * yn);
    (xn * f, yn * f)
}

/// Ray-cast one image.
pub fn render_image(job: &RenderJob<'_>) -> RgbImage {
    let (w, h) = job.size;
    let origin = job.pose.camera_center();
    let to_world = job.pose.rotation.inverse();

    RgbImage::from_fn(w, h, |u, v| {
        let ray = job.k.back_project(Point2::new(u as f64 + 0.5, v as f64 + 0.5));
        let (xd, yd) = distort(ray.x, ray.y, job.lens_distortion);
        let dir = (to_world * Vector3::new(xd, yd, 1.0)).normalize();
        shade(job, &origin, &dir)
    })
}

fn shade(job: &RenderJob<'_>, origin: &Point3<f64>, dir: &Vector3<f64>) -> Rgb<u8> {
    let hit = job
        .surfaces
        .iter()
        .filter_map(|s| s.intersect(origin, dir).map(|t| (t, s)))
        .min_by(|a, b| a.0.total_cmp(&b.0));
    let Some((t, surface)) = hit else {
        return Rgb([0, 0, 0]);
    };

    let p = origin + dir * t;
    let albedo = surface.albedo(&p);
    let gain = match job.mode {
        RenderMode::Snapshot => 1.0,
        RenderMode::Render => {
            let mut n = surface.normal_at(&p);
            if n.dot(dir) > 0.0 {
                n = -n;
            }
            let diffuse: f64 = job
                .lights
                .iter()
                .map(|(pos, intensity)| {
                    let to_light = pos - p;
                    let d2 = to_light.norm_squared();
                    let lambert = n.dot(&to_light.normalize()).max(0.0);
                    intensity * lambert / (1.0 + 4.0 * d2)
                })
                .sum();
            AMBIENT + diffuse
        }
    };
    Rgb(albedo.map(|c| (c * gain * 255.0).clamp(0.0, 255.0).round() as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use evs_core::{compute_k, world_to_cv_pose, CameraModel};
    use nalgebra::Matrix4;

    fn job_parts() -> (IntrinsicMatrix, CvPose, Vec<RenderSurface>) {
        let k = compute_k(&CameraModel::default().with_resolution(32, 32)).expect("K");
        let pose = world_to_cv_pose(&Matrix4::identity()).expect("pose");
        let shape = Ellipsoid::sphere(Point3::origin(), 1.0);
        let surfaces = vec![RenderSurface::new(&shape, shape.basis, MeshTexture::Grid)];
        (k, pose, surfaces)
    }

    #[test]
    fn camera_inside_the_organ_sees_the_wall_everywhere() {
        let (k, pose, surfaces) = job_parts();
        let img = render_image(&RenderJob {
            k: &k,
            pose: &pose,
            size: (32, 32),
            mode: RenderMode::Snapshot,
            lens_distortion: 0.0,
            surfaces: &surfaces,
            lights: &[],
        });
        assert_eq!(img.dimensions(), (32, 32));
        assert!(img.pixels().all(|p| p.0 != [0, 0, 0]));
    }

    #[test]
    fn render_mode_without_lights_is_darker_than_snapshot() {
        let (k, pose, surfaces) = job_parts();
        let mut job = RenderJob {
            k: &k,
            pose: &pose,
            size: (8, 8),
            mode: RenderMode::Snapshot,
            lens_distortion: 0.0,
            surfaces: &surfaces,
            lights: &[],
        };
        let flat = render_image(&job);
        job.mode = RenderMode::Render;
        let lit = render_image(&job);
        let sum = |img: &RgbImage| img.pixels().map(|p| p.0[0] as u32).sum::<u32>();
        assert!(sum(&lit) < sum(&flat));
    }

    #[test]
    fn empty_scene_renders_black() {
        let (k, pose, _) = job_parts();
        let img = render_image(&RenderJob {
            k: &k,
            pose: &pose,
            size: (4, 4),
            mode: RenderMode::Render,
            lens_distortion: 0.0,
            surfaces: &[],
            lights: &[],
        });
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn distortion_is_identity_on_axis() {
        assert_eq!(distort(0.0, 0.0, 0.3), (0.0, 0.0));
        let (x, y) = distort(0.5, 0.0, 0.2);
        assert!((x - 0.525).abs() < 1e-12 && y == 0.0);
    }

    #[test]
    fn outside_ray_hits_the_near_side() {
        let s = RenderSurface {
            center: Point3::origin(),
            radii: Vector3::new(1.0, 2.0, 1.0),
            texture: MeshTexture::Mucosa,
        };
        let t = s
            .intersect(&Point3::new(0.0, -5.0, 0.0), &Vector3::y())
            .expect("hit");
        assert!((t - 3.0).abs() < 1e-12);
        assert!(s.intersect(&Point3::new(3.0, -5.0, 0.0), &Vector3::y()).is_none());
    }
}
