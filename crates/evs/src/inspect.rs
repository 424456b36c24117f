//! Sanity summary of a ground-truth trajectory file.

use std::path::Path;

use evs_scan::{read_ground_truth, FrameRecord, GroundTruthError};
use serde::Serialize;

/// Aggregate statistics over the rows of a ground-truth file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrajectorySummary {
    pub rows: usize,
    pub first_index: Option<usize>,
    pub last_index: Option<usize>,
    /// Indices run `0, 1, 2, …` without gaps or repeats.
    pub contiguous: bool,
    /// Largest `| |q| - 1 |` over all rows.
    pub max_quaternion_error: f64,
    /// Sum of distances between consecutive translations.
    pub translation_path_length: f64,
}

impl TrajectorySummary {
    pub fn from_records(records: &[FrameRecord]) -> Self {
        let contiguous = records
            .iter()
            .enumerate()
            .all(|(i, r)| r.frame_index == i);
        let max_quaternion_error = records
            .iter()
            .map(|r| (r.quaternion_norm() - 1.0).abs())
            .fold(0.0, f64::max);
        let translation_path_length = records
            .windows(2)
            .map(|w| {
                let [a, b] = [w[0].t, w[1].t];
                ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2) + (b[2] - a[2]).powi(2)).sqrt()
            })
            .sum();
        Self {
            rows: records.len(),
            first_index: records.first().map(|r| r.frame_index),
            last_index: records.last().map(|r| r.frame_index),
            contiguous,
            max_quaternion_error,
            translation_path_length,
        }
    }
}

/// Parse `path` and summarize it.
pub fn summarize(path: &Path) -> Result<TrajectorySummary, GroundTruthError> {
    let records = read_ground_truth(path)?;
    Ok(TrajectorySummary::from_records(&records))
}
