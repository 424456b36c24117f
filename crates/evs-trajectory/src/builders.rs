//! Procedural scan paths on spherical shells.

use std::f64::consts::{PI, TAU};

use nalgebra::Point3;

use crate::{TrajectoryCurve, TrajectoryError};

/// Polyline resolution used by the trajectory catalog.
pub const DEFAULT_CURVE_SAMPLES: usize = 1024;

/// Polar band swept by spirals, as fractions of π.
const SPIRAL_POLAR_RANGE: (f64, f64) = (0.15, 0.85);
/// Latitude amplitude of sine paths, in radians.
const SINE_AMPLITUDE: f64 = 0.35;

/// Ellipsoidal shell a path is drawn on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereShell {
    pub radius: f64,
    /// Scale of the polar (z) axis relative to `radius`.
    pub z_scale: f64,
}

impl SphereShell {
    /// Shell inside the spherical organ models.
    pub const SPHERE: SphereShell = SphereShell {
        radius: 0.5,
        z_scale: 1.0,
    };
    /// Tighter, flattened shell for the inner bladder model.
    pub const INNER: SphereShell = SphereShell {
        radius: 0.35,
        z_scale: 0.8,
    };

    fn point(&self, polar: f64, azimuth: f64) -> Point3<f64> {
        Point3::new(
            self.radius * polar.sin() * azimuth.cos(),
            self.radius * polar.sin() * azimuth.sin(),
            self.radius * self.z_scale * polar.cos(),
        )
    }
}

/// Open spiral from near the top pole to near the bottom pole.
pub fn spiral_on_sphere(
    name: &str,
    shell: SphereShell,
    turns: u32,
    samples: usize,
) -> Result<TrajectoryCurve, TrajectoryError> {
    if turns == 0 || samples < 2 {
        return Err(TrajectoryError::DegenerateCurve(name.to_string()));
    }
    let (p0, p1) = SPIRAL_POLAR_RANGE;
    let last = (samples - 1) as f64;
    let points = (0..samples)
        .map(|i| {
            let u = i as f64 / last;
            let polar = PI * (p0 + (p1 - p0) * u);
            shell.point(polar, TAU * turns as f64 * u)
        })
        .collect();
    TrajectoryCurve::new(name, points, false)
}

/// Closed loop around the equator whose latitude oscillates `turns` times.
pub fn sine_on_sphere(
    name: &str,
    shell: SphereShell,
    turns: u32,
    samples: usize,
) -> Result<TrajectoryCurve, TrajectoryError> {
    if turns == 0 || samples < 3 {
        return Err(TrajectoryError::DegenerateCurve(name.to_string()));
    }
    let points = (0..samples)
        .map(|i| {
            let u = i as f64 / samples as f64;
            let polar = PI / 2.0 + SINE_AMPLITUDE * (TAU * turns as f64 * u).sin();
            shell.point(polar, TAU * u)
        })
        .collect();
    TrajectoryCurve::new(name, points, true)
}
