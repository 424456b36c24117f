//! Scans against the built-in synthetic scene.

use evs_core::CameraModel;
use evs_scan::{run_scan, ScanConfig, ScanError, ScanReport};
use evs_scene::{SyntheticScene, DEFAULT_CAMERA};
use evs_trajectory::TrajectoryError;

#[derive(thiserror::Error, Debug)]
pub enum SyntheticScanError {
    #[error("failed to build the synthetic scene: {0}")]
    Scene(#[from] TrajectoryError),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Build the endoscopy scene and run a complete scan with `config`.
///
/// `camera` is installed under `config.camera`; a name other than the rig's
/// default camera adds a second camera object.
pub fn run_synthetic_scan(
    config: ScanConfig,
    camera: CameraModel,
) -> Result<ScanReport, SyntheticScanError> {
    let mut scene = if config.camera.as_str() == DEFAULT_CAMERA {
        SyntheticScene::endoscopy(camera)?
    } else {
        let mut scene = SyntheticScene::endoscopy(CameraModel::default())?;
        scene.insert_camera(config.camera.clone(), camera);
        scene
    };
    Ok(run_scan(&mut scene, config)?)
}
