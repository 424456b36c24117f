//! Downstream configuration templates written next to a scan.
//!
//! Three fixed-name JSON files are read from a template folder. The camera
//! parameters are copied verbatim; the data config and the frame-range file
//! each get one field patched. Patched files are written with sorted keys and
//! four-space indentation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

pub const CAMERA_PARAMS_FILE: &str = "camera_params.json";
pub const DATA_CONFIG_FILE: &str = "data_config.json";
pub const FRAME_RANGES_FILE: &str = "frame_ranges_and_selection.json";

#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("{action} `{}` failed: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template `{}` is not valid JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("template `{}` must hold a JSON object", .path.display())]
    NotAnObject { path: PathBuf },
    #[error("data folder `{}` has no parent directory", .0.display())]
    NoParent(PathBuf),
}

/// Write `value` as sorted-key JSON with four-space indentation.
pub fn write_sorted_json(path: &Path, value: &Value) -> Result<(), TemplateError> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    // `Value` objects are key-ordered maps, so nested keys come out sorted too.
    value.serialize(&mut ser).map_err(|source| TemplateError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, buf).map_err(|source| TemplateError::Io {
        action: "write",
        path: path.to_path_buf(),
        source,
    })
}

fn read_object(path: &Path) -> Result<serde_json::Map<String, Value>, TemplateError> {
    let raw = fs::read_to_string(path).map_err(|source| TemplateError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })?;
    match serde_json::from_str(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TemplateError::NotAnObject {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(TemplateError::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Copy and patch the templates from `template_dir` into `data_folder`.
///
/// `base_path` becomes the parent of `data_folder`; `cysto_frame_range`
/// becomes `frame_range`.
pub fn configure_base_data_folder(
    template_dir: &Path,
    data_folder: &Path,
    frame_range: [usize; 2],
) -> Result<(), TemplateError> {
    let base_path = data_folder
        .parent()
        .ok_or_else(|| TemplateError::NoParent(data_folder.to_path_buf()))?;

    let src = template_dir.join(CAMERA_PARAMS_FILE);
    fs::copy(&src, data_folder.join(CAMERA_PARAMS_FILE)).map_err(|source| TemplateError::Io {
        action: "copy",
        path: src,
        source,
    })?;

    let mut data_config = read_object(&template_dir.join(DATA_CONFIG_FILE))?;
    data_config.insert(
        "base_path".to_string(),
        Value::String(base_path.display().to_string()),
    );
    write_sorted_json(&data_folder.join(DATA_CONFIG_FILE), &Value::Object(data_config))?;

    let mut ranges = read_object(&template_dir.join(FRAME_RANGES_FILE))?;
    ranges.insert(
        "cysto_frame_range".to_string(),
        Value::from(frame_range.to_vec()),
    );
    write_sorted_json(&data_folder.join(FRAME_RANGES_FILE), &Value::Object(ranges))?;

    log::info!(
        "wrote config templates to {} (frames {}..{})",
        data_folder.display(),
        frame_range[0],
        frame_range[1]
    );
    Ok(())
}
