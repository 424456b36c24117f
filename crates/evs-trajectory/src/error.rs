/// Failures while building or sampling trajectories.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    #[error("offset {offset} is outside [0, 1] on open curve `{curve}`")]
    InvalidOffset { curve: String, offset: f64 },
    #[error("curve `{0}` is degenerate (needs at least two distinct finite points)")]
    DegenerateCurve(String),
    #[error("unknown trajectory `{0}`")]
    UnknownTrajectory(String),
    #[error("trajectory scale must be finite and positive, got {0}")]
    InvalidScale(f64),
}
