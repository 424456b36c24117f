//! Self-contained reference scene for endoscopy scans.
//!
//! [`SyntheticScene`] implements [`evs_core::SceneHandle`] without a host 3D
//! engine: objects live in a typed registry, the camera follows a trajectory
//! curve and tracks the organ model, and frames are produced by a small CPU
//! ray caster over ellipsoidal organ shells. It is deterministic, which makes
//! it the backend of choice for tests and for the `evs` CLI.

mod constraints;
mod objects;
mod render;
mod scene;

pub use constraints::{apply_track_to, evaluate_follow_path};
pub use objects::{
    CameraObject, Ellipsoid, FollowPath, LightObject, LightPlacement, MeshObject, MeshTexture,
    SceneObject, TrackAxis,
};
pub use render::{distort, render_image, RenderJob, RenderSurface};
pub use scene::{SyntheticScene, DEFAULT_CAMERA, DEFAULT_LIGHTS, DEFAULT_MODELS};
