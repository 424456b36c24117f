//! Polyline trajectory curves with an arclength table.

use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Vector3};

use crate::TrajectoryError;

/// Named camera path.
///
/// Points live in the curve object's local space. The object transform is
/// `placement * diag(base_scale ⊙ delta_scale)`; `delta_scale` is the knob the
/// scan uses to resize a path without touching its parametrization.
#[derive(Clone, Debug)]
pub struct TrajectoryCurve {
    name: String,
    points: Vec<Point3<f64>>,
    closed: bool,
    /// Cumulative local arclength at each vertex; one extra entry closes the
    /// loop for closed curves.
    cumulative: Vec<f64>,
    pub placement: Isometry3<f64>,
    pub base_scale: Vector3<f64>,
    pub delta_scale: Vector3<f64>,
}

impl TrajectoryCurve {
    /// Build a curve from local-space vertices.
    ///
    /// Closed curves must not repeat the first vertex at the end.
    pub fn new(
        name: impl Into<String>,
        points: Vec<Point3<f64>>,
        closed: bool,
    ) -> Result<Self, TrajectoryError> {
        let name = name.into();
        if points.len() < 2 || points.iter().any(|p| !p.coords.iter().all(|v| v.is_finite())) {
            return Err(TrajectoryError::DegenerateCurve(name));
        }

        let mut cumulative = Vec::with_capacity(points.len() + 1);
        cumulative.push(0.0);
        let mut acc = 0.0;
        for w in points.windows(2) {
            acc += (w[1] - w[0]).norm();
            cumulative.push(acc);
        }
        if closed {
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                acc += (first - last).norm();
            }
            cumulative.push(acc);
        }
        if acc <= 1e-12 {
            return Err(TrajectoryError::DegenerateCurve(name));
        }

        Ok(Self {
            name,
            points,
            closed,
            cumulative,
            placement: Isometry3::identity(),
            base_scale: Vector3::new(1.0, 1.0, 1.0),
            delta_scale: Vector3::new(1.0, 1.0, 1.0),
        })
    }

    pub fn with_placement(mut self, placement: Isometry3<f64>) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_base_scale(mut self, base_scale: Vector3<f64>) -> Self {
        self.base_scale = base_scale;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Arclength in curve-local units.
    #[inline]
    pub fn local_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Per-axis scale applied on top of the placement.
    pub fn effective_scale(&self) -> Vector3<f64> {
        self.base_scale.component_mul(&self.delta_scale)
    }

    /// Uniform delta scale, the way the scan resizes a trajectory.
    pub fn set_uniform_delta_scale(&mut self, scale: f64) {
        self.delta_scale = Vector3::new(scale, scale, scale);
    }

    /// Linear part of the object transform for a given scale.
    pub(crate) fn linear_map(&self, scale: &Vector3<f64>) -> Matrix3<f64> {
        self.placement.rotation.to_rotation_matrix().into_inner() * Matrix3::from_diagonal(scale)
    }

    /// Local → world matrix with the current delta scale.
    pub fn object_matrix(&self) -> Matrix4<f64> {
        self.placement.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.effective_scale())
    }

    /// Arclength of the world-space polyline with the current scale.
    pub fn world_length(&self) -> f64 {
        let m = self.linear_map(&self.effective_scale());
        let mut total: f64 = self
            .points
            .windows(2)
            .map(|w| (m * (w[1] - w[0])).norm())
            .sum();
        if self.closed {
            if let (Some(first), Some(last)) = (self.points.first(), self.points.last()) {
                total += (m * (first - last)).norm();
            }
        }
        total
    }

    /// Local-space point at arclength `s`, clamped (open) or wrapped (closed).
    pub fn local_point_at(&self, s: f64) -> Point3<f64> {
        let length = self.local_length();
        let s = if self.closed {
            s.rem_euclid(length)
        } else {
            s.clamp(0.0, length)
        };

        let segments = self.cumulative.len() - 1;
        let upper = self.cumulative.partition_point(|&c| c <= s);
        let seg = upper.saturating_sub(1).min(segments - 1);

        let a = self.points[seg];
        let b = self.points[(seg + 1) % self.points.len()];
        let seg_len = self.cumulative[seg + 1] - self.cumulative[seg];
        if seg_len <= 1e-15 {
            return a;
        }
        let t = ((s - self.cumulative[seg]) / seg_len).clamp(0.0, 1.0);
        a + (b - a) * t
    }
}
