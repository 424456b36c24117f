//! Periodic shape-key schedule for organ deformation.
//!
//! The weight is a sawtooth: it ramps from 0 towards `max_amplitude` over
//! `floor(total / cycles)` frames and restarts, `cycles` times per scan.

use evs_core::ShapeBlend;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DeformationError {
    #[error("cannot split {total_frames} frames into {cycles} deformation cycles")]
    DegenerateCycle { total_frames: usize, cycles: u32 },
}

fn default_max_amplitude() -> f64 {
    1.0
}

fn default_cycles() -> u32 {
    3
}

/// User-facing deformation settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeformationParams {
    /// When off, the model is held at its basis shape.
    #[serde(default)]
    pub apply: bool,
    #[serde(default = "default_max_amplitude")]
    pub max_amplitude: f64,
    #[serde(default = "default_cycles")]
    pub cycles: u32,
}

impl Default for DeformationParams {
    fn default() -> Self {
        Self {
            apply: false,
            max_amplitude: default_max_amplitude(),
            cycles: default_cycles(),
        }
    }
}

/// Sawtooth segment length, `floor(total / cycles)`, which must be at least 1.
pub fn segment_len(total_frames: usize, cycles: u32) -> Result<usize, DeformationError> {
    let degenerate = DeformationError::DegenerateCycle {
        total_frames,
        cycles,
    };
    if cycles == 0 {
        return Err(degenerate);
    }
    match total_frames / cycles as usize {
        0 => Err(degenerate),
        n => Ok(n),
    }
}

/// Blend weight for frame `frame_index` of a `total_frames` scan.
pub fn deformation_weight(
    frame_index: usize,
    total_frames: usize,
    cycles: u32,
    max_amplitude: f64,
) -> Result<f64, DeformationError> {
    let seg = segment_len(total_frames, cycles)?;
    let phase = frame_index % seg;
    Ok(phase as f64 / seg as f64 * max_amplitude)
}

/// Validated schedule for one scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeformationSchedule {
    active: bool,
    segment_len: usize,
    max_amplitude: f64,
}

impl DeformationSchedule {
    /// Validate `params` against the scan length.
    ///
    /// Inactive schedules are never degenerate.
    pub fn new(params: &DeformationParams, total_frames: usize) -> Result<Self, DeformationError> {
        let segment_len = if params.apply {
            segment_len(total_frames, params.cycles)?
        } else {
            1
        };
        Ok(Self {
            active: params.apply,
            segment_len,
            max_amplitude: params.max_amplitude,
        })
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    pub fn weight(&self, frame_index: usize) -> f64 {
        if !self.active {
            return 0.0;
        }
        (frame_index % self.segment_len) as f64 / self.segment_len as f64 * self.max_amplitude
    }

    /// Shape-key state for a frame; the basis shape when inactive.
    pub fn blend(&self, frame_index: usize) -> ShapeBlend {
        if self.active {
            ShapeBlend::Deformed(self.weight(frame_index))
        } else {
            ShapeBlend::Basis
        }
    }
}
