//! Closed catalog of scan trajectories and the constant-speed frame budget.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::builders::{sine_on_sphere, spiral_on_sphere, SphereShell, DEFAULT_CURVE_SAMPLES};
use crate::{TrajectoryCurve, TrajectoryError};

/// Frames rendered per unit of trajectory length at scale 1.
pub const FRAMES_PER_LENGTH_UNIT: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrajectoryFamily {
    /// Closed latitude band modulated by a sine wave.
    Sine,
    /// Open pole-to-pole spiral.
    Spiral,
}

/// Named scan trajectory.
///
/// Serialized with the scene object name (`"Sine_sphere_turn10"`), which is
/// also the curve id in the host scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TrajectoryId {
    SineSphereTurn6,
    SineSphereTurn8,
    SineSphereTurn10,
    SineInnerTurn10,
    SineSphereTurn12,
    SineSphereTurn14,
    SpiralSphereTurn6,
    SpiralSphereTurn8,
    SpiralSphereTurn10,
    SpiralInnerTurn10,
    SpiralSphereTurn12,
    SpiralSphereTurn14,
}

impl TrajectoryId {
    pub const ALL: [TrajectoryId; 12] = [
        TrajectoryId::SineSphereTurn6,
        TrajectoryId::SineSphereTurn8,
        TrajectoryId::SineSphereTurn10,
        TrajectoryId::SineInnerTurn10,
        TrajectoryId::SineSphereTurn12,
        TrajectoryId::SineSphereTurn14,
        TrajectoryId::SpiralSphereTurn6,
        TrajectoryId::SpiralSphereTurn8,
        TrajectoryId::SpiralSphereTurn10,
        TrajectoryId::SpiralInnerTurn10,
        TrajectoryId::SpiralSphereTurn12,
        TrajectoryId::SpiralSphereTurn14,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TrajectoryId::SineSphereTurn6 => "Sine_sphere_turn6",
            TrajectoryId::SineSphereTurn8 => "Sine_sphere_turn8",
            TrajectoryId::SineSphereTurn10 => "Sine_sphere_turn10",
            TrajectoryId::SineInnerTurn10 => "Sine_inner_turn10",
            TrajectoryId::SineSphereTurn12 => "Sine_sphere_turn12",
            TrajectoryId::SineSphereTurn14 => "Sine_sphere_turn14",
            TrajectoryId::SpiralSphereTurn6 => "Spiral_sphere_turn6",
            TrajectoryId::SpiralSphereTurn8 => "Spiral_sphere_turn8",
            TrajectoryId::SpiralSphereTurn10 => "Spiral_sphere_turn10",
            TrajectoryId::SpiralInnerTurn10 => "Spiral_inner_turn10",
            TrajectoryId::SpiralSphereTurn12 => "Spiral_sphere_turn12",
            TrajectoryId::SpiralSphereTurn14 => "Spiral_sphere_turn14",
        }
    }

    /// Physical arc length of the rig's curve at scale 1.
    pub fn arc_length(&self) -> f64 {
        match self {
            TrajectoryId::SineSphereTurn6 => 12.0,
            TrajectoryId::SineSphereTurn8 => 16.0,
            TrajectoryId::SineSphereTurn10 | TrajectoryId::SineInnerTurn10 => 20.0,
            TrajectoryId::SineSphereTurn12 => 24.0,
            TrajectoryId::SineSphereTurn14 => 28.0,
            TrajectoryId::SpiralSphereTurn6 => 24.0,
            TrajectoryId::SpiralSphereTurn8 => 32.0,
            TrajectoryId::SpiralSphereTurn10 | TrajectoryId::SpiralInnerTurn10 => 40.0,
            TrajectoryId::SpiralSphereTurn12 => 48.0,
            TrajectoryId::SpiralSphereTurn14 => 56.0,
        }
    }

    pub fn family(&self) -> TrajectoryFamily {
        match self {
            TrajectoryId::SineSphereTurn6
            | TrajectoryId::SineSphereTurn8
            | TrajectoryId::SineSphereTurn10
            | TrajectoryId::SineInnerTurn10
            | TrajectoryId::SineSphereTurn12
            | TrajectoryId::SineSphereTurn14 => TrajectoryFamily::Sine,
            _ => TrajectoryFamily::Spiral,
        }
    }

    pub fn shell(&self) -> SphereShell {
        match self {
            TrajectoryId::SineInnerTurn10 | TrajectoryId::SpiralInnerTurn10 => SphereShell::INNER,
            _ => SphereShell::SPHERE,
        }
    }

    pub fn turns(&self) -> u32 {
        match self {
            TrajectoryId::SineSphereTurn6 | TrajectoryId::SpiralSphereTurn6 => 6,
            TrajectoryId::SineSphereTurn8 | TrajectoryId::SpiralSphereTurn8 => 8,
            TrajectoryId::SineSphereTurn10
            | TrajectoryId::SineInnerTurn10
            | TrajectoryId::SpiralSphereTurn10
            | TrajectoryId::SpiralInnerTurn10 => 10,
            TrajectoryId::SineSphereTurn12 | TrajectoryId::SpiralSphereTurn12 => 12,
            TrajectoryId::SineSphereTurn14 | TrajectoryId::SpiralSphereTurn14 => 14,
        }
    }

    /// Procedural curve for this trajectory, in curve-local space.
    pub fn build_curve(&self) -> Result<TrajectoryCurve, TrajectoryError> {
        let shell = self.shell();
        match self.family() {
            TrajectoryFamily::Sine => {
                sine_on_sphere(self.name(), shell, self.turns(), DEFAULT_CURVE_SAMPLES)
            }
            TrajectoryFamily::Spiral => {
                spiral_on_sphere(self.name(), shell, self.turns(), DEFAULT_CURVE_SAMPLES)
            }
        }
    }
}

impl fmt::Display for TrajectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrajectoryId {
    type Err = TrajectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrajectoryId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| TrajectoryError::UnknownTrajectory(s.to_string()))
    }
}

impl TryFrom<String> for TrajectoryId {
    type Error = TrajectoryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TrajectoryId> for String {
    fn from(id: TrajectoryId) -> Self {
        id.name().to_string()
    }
}

/// Frame count that scans `id` at a constant speed: `round(scale · length · 10)`.
pub fn frame_budget(id: TrajectoryId, scale: f64) -> Result<usize, TrajectoryError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(TrajectoryError::InvalidScale(scale));
    }
    let frames = (scale * id.arc_length() * FRAMES_PER_LENGTH_UNIT).round();
    if frames < 1.0 {
        return Err(TrajectoryError::InvalidScale(scale));
    }
    log::debug!("frame budget for {id} at scale {scale}: {frames}");
    Ok(frames as usize)
}
