//! Hand-off of a rendered frame sequence to an external encoder.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

/// Stderr lines kept in [`VideoError::Encoder`].
const STDERR_TAIL_LINES: usize = 20;

#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status} while writing {}: {stderr}", .output.display())]
    Encoder {
        program: String,
        status: std::process::ExitStatus,
        output: PathBuf,
        /// Last lines the encoder wrote to stderr.
        stderr: String,
    },
    #[error("frame rate must be positive")]
    InvalidFrameRate,
}

fn default_program() -> String {
    "ffmpeg".to_string()
}

fn default_fps() -> u32 {
    10
}

fn default_file_name() -> String {
    "video_cysto.avi".to_string()
}

/// Encoder invocation settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoParams {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Output file name, relative to the data folder.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Extra encoder arguments placed between the input and the output.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            program: default_program(),
            fps: default_fps(),
            file_name: default_file_name(),
            extra_args: Vec::new(),
        }
    }
}

/// Argument list passed to the encoder.
pub fn encoder_args(input_pattern: &Path, output: &Path, params: &VideoParams) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-framerate".to_string(),
        params.fps.to_string(),
        "-i".to_string(),
        input_pattern.display().to_string(),
    ];
    args.extend(params.extra_args.iter().cloned());
    args.push(output.display().to_string());
    args
}

/// Encode `frame_dir/<pattern>` into `output`, blocking until the encoder
/// exits.
///
/// `pattern` uses the encoder's printf syntax, e.g. `cysto_%06d.jpg`.
pub fn assemble_video(
    frame_dir: &Path,
    pattern: &str,
    output: &Path,
    params: &VideoParams,
) -> Result<(), VideoError> {
    if params.fps == 0 {
        return Err(VideoError::InvalidFrameRate);
    }
    let args = encoder_args(&frame_dir.join(pattern), output, params);
    log::info!("encoding {} with {}", output.display(), params.program);
    log::debug!("{} {}", params.program, args.join(" "));

    let result = Command::new(&params.program)
        .args(&args)
        .output()
        .map_err(|source| VideoError::Spawn {
            program: params.program.clone(),
            source,
        })?;
    if !result.status.success() {
        return Err(VideoError::Encoder {
            program: params.program.clone(),
            status: result.status,
            output: output.to_path_buf(),
            stderr: stderr_tail(&result.stderr),
        });
    }
    Ok(())
}

fn stderr_tail(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
