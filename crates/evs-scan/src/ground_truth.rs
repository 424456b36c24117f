//! Plain-text ground-truth trajectory file.
//!
//! One row per frame, eight single-space separated `%.5f` fields:
//! `index t_x t_y t_z q_x q_y q_z q_w`. No header.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use evs_core::PoseTq;

/// File name inside the data folder.
pub const GROUND_TRUTH_FILE: &str = "cam_wmat_tq_gt.txt";

const COLUMNS: usize = 8;

#[derive(thiserror::Error, Debug)]
pub enum GroundTruthError {
    #[error("{action} `{}` failed: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// Ground-truth pose of one rendered frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub t: [f64; 3],
    /// Unit quaternion `[x, y, z, w]`.
    pub q: [f64; 4],
}

impl FrameRecord {
    pub fn new(frame_index: usize, pose: &PoseTq) -> Self {
        Self {
            frame_index,
            t: pose.t,
            q: pose.q,
        }
    }

    pub fn row(&self) -> [f64; COLUMNS] {
        let [tx, ty, tz] = self.t;
        let [qx, qy, qz, qw] = self.q;
        [self.frame_index as f64, tx, ty, tz, qx, qy, qz, qw]
    }

    pub fn format_row(&self) -> String {
        self.row()
            .iter()
            .map(|v| format!("{v:.5}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn quaternion_norm(&self) -> f64 {
        self.q.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// Write all records, overwriting `path`.
pub fn write_ground_truth(path: &Path, records: &[FrameRecord]) -> Result<(), GroundTruthError> {
    let io_err = |action: &'static str| {
        move |source: std::io::Error| GroundTruthError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    };
    let mut out = BufWriter::new(File::create(path).map_err(io_err("create"))?);
    for record in records {
        writeln!(out, "{}", record.format_row()).map_err(io_err("write"))?;
    }
    out.flush().map_err(io_err("write"))?;
    Ok(())
}

/// Parse a ground-truth file. Blank lines are skipped.
pub fn read_ground_truth(path: &Path) -> Result<Vec<FrameRecord>, GroundTruthError> {
    let io_err = |source: std::io::Error| GroundTruthError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        records.push(parse_row(trimmed).map_err(|reason| GroundTruthError::Parse {
            line: idx + 1,
            reason,
        })?);
    }
    Ok(records)
}

fn parse_row(line: &str) -> Result<FrameRecord, String> {
    let values = line
        .split_whitespace()
        .map(|tok| tok.parse::<f64>().map_err(|e| format!("`{tok}`: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != COLUMNS {
        return Err(format!("expected {COLUMNS} columns, found {}", values.len()));
    }
    let index = values[0];
    if index < 0.0 || index.fract() != 0.0 {
        return Err(format!("frame index {index} is not a non-negative integer"));
    }
    Ok(FrameRecord {
        frame_index: index as usize,
        t: [values[1], values[2], values[3]],
        q: [values[4], values[5], values[6], values[7]],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_use_five_decimals_and_single_spaces() {
        let r = FrameRecord {
            frame_index: 3,
            t: [0.123456, -1.0, 0.0],
            q: [0.0, 0.0, -0.000001, 1.0],
        };
        assert_eq!(
            r.format_row(),
            "3.00000 0.12346 -1.00000 0.00000 0.00000 0.00000 -0.00000 1.00000"
        );
    }

    #[test]
    fn written_file_parses_back() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join(GROUND_TRUTH_FILE);
        let records: Vec<FrameRecord> = (0..5)
            .map(|i| FrameRecord {
                frame_index: i,
                t: [i as f64 * 0.5, 0.25, -0.125],
                q: [0.0, 0.0, 0.6, 0.8],
            })
            .collect();
        write_ground_truth(&path, &records).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        assert_eq!(text.lines().count(), 5);
        assert!(text.ends_with('\n'));
        assert_eq!(read_ground_truth(&path).expect("parse"), records);
    }

    #[test]
    fn io_failures_name_the_file() {
        let dir = tempfile::tempdir().expect("tmp");
        let missing = dir.path().join("no_such_dir").join(GROUND_TRUTH_FILE);
        match write_ground_truth(&missing, &[]) {
            Err(GroundTruthError::Io { action, path, .. }) => {
                assert_eq!(action, "create");
                assert_eq!(path, missing);
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = read_ground_truth(&missing).unwrap_err();
        assert!(matches!(err, GroundTruthError::Io { action: "read", .. }));
        assert!(err.to_string().contains("no_such_dir"));
    }

    #[test]
    fn malformed_rows_report_their_line() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "0 0 0 0 0 0 0 1\n\n1 0 0 0 0 0 1\n").expect("write");
        match read_ground_truth(&path) {
            Err(GroundTruthError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {other:?}"),
        }
    }
}
