use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use evs_core::{read_cv_pose, CameraModel, ObjectId, SceneError, SceneHandle, ShapeBlend};
use evs_scan::{
    read_ground_truth, run_scan, DeformationError, DeformationParams, PoseConvention, ScanConfig,
    ScanError, ScanLoop, ScanStage, ScanState, VideoError, GROUND_TRUTH_FILE,
};
use evs_scene::SyntheticScene;
use evs_trajectory::TrajectoryId;

fn scene() -> SyntheticScene {
    SyntheticScene::endoscopy(CameraModel::default().with_resolution(16, 16)).expect("scene")
}

fn config(data: &Path, frames: usize) -> ScanConfig {
    let mut cfg = ScanConfig::new(data);
    cfg.frame_num = Some(frames);
    cfg
}

fn frame_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read_dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn forty_frame_scan_records_forty_unit_quaternions() {
    let tmp = tempfile::tempdir().expect("tmp");
    let data = tmp.path().join("scan");
    let mut scene = scene();

    let report = run_scan(&mut scene, config(&data, 40)).expect("scan");
    assert_eq!(report.frame_num, 40);
    assert_eq!(report.ground_truth.as_deref(), Some(data.join(GROUND_TRUTH_FILE).as_path()));

    let rows = read_ground_truth(&data.join(GROUND_TRUTH_FILE)).expect("gt");
    assert_eq!(rows.len(), 40);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.frame_index, i);
        assert!((row.quaternion_norm() - 1.0).abs() < 1e-4, "row {i}");
    }

    let names = frame_names(&data.join("raw_cysto"));
    assert_eq!(names.len(), 40);
    assert_eq!(names[0], "cysto_000000.jpg");
    assert_eq!(names[39], "cysto_000039.jpg");
}

#[test]
fn identical_configs_produce_identical_outputs() {
    let tmp = tempfile::tempdir().expect("tmp");
    let runs: Vec<_> = ["a", "b"]
        .iter()
        .map(|name| {
            let data = tmp.path().join(name);
            let mut cfg = config(&data, 12);
            cfg.trajectory = TrajectoryId::SpiralSphereTurn8;
            cfg.deformation = DeformationParams {
                apply: true,
                ..DeformationParams::default()
            };
            run_scan(&mut scene(), cfg).expect("scan");
            (
                frame_names(&data.join("raw_cysto")),
                fs::read(data.join(GROUND_TRUTH_FILE)).expect("gt"),
            )
        })
        .collect();
    assert_eq!(runs[0], runs[1]);
}

#[test]
fn missing_objects_fail_before_any_output() {
    let tmp = tempfile::tempdir().expect("tmp");
    let data = tmp.path().join("scan");
    let mut cfg = config(&data, 5);
    cfg.model = ObjectId::from("kidney");

    let err = run_scan(&mut scene(), cfg).unwrap_err();
    assert!(matches!(
        err,
        ScanError::Scene(SceneError::MissingObject(ref id)) if id.as_str() == "kidney"
    ));
    assert!(!data.exists());
}

#[test]
fn more_cycles_than_frames_is_rejected_at_init() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut cfg = config(tmp.path(), 2);
    cfg.deformation = DeformationParams {
        apply: true,
        cycles: 3,
        max_amplitude: 1.0,
    };
    assert!(matches!(
        run_scan(&mut scene(), cfg),
        Err(ScanError::Deformation(DeformationError::DegenerateCycle { .. }))
    ));
}

#[test]
fn render_failure_names_the_frame_and_skips_ground_truth() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut cfg = config(tmp.path(), 3);
    cfg.frame_ext = "unknownformat".to_string();

    let err = run_scan(&mut scene(), cfg).unwrap_err();
    assert_eq!(err.frame(), Some((0, ScanStage::Render)));
    assert!(err.to_string().starts_with("frame 0: render failed"));
    assert!(!tmp.path().join(GROUND_TRUTH_FILE).exists());
}

#[test]
fn output_toggles_are_independent() {
    let tmp = tempfile::tempdir().expect("tmp");

    let no_frames = tmp.path().join("no_frames");
    let mut cfg = config(&no_frames, 6);
    cfg.save_render = false;
    let report = run_scan(&mut scene(), cfg).expect("scan");
    assert!(frame_names(&no_frames.join("raw_cysto")).is_empty());
    assert_eq!(report.records.len(), 6);
    assert!(no_frames.join(GROUND_TRUTH_FILE).exists());

    let no_poses = tmp.path().join("no_poses");
    let mut cfg = config(&no_poses, 6);
    cfg.save_trajectory = false;
    let report = run_scan(&mut scene(), cfg).expect("scan");
    assert!(report.records.is_empty());
    assert!(report.ground_truth.is_none());
    assert!(!no_poses.join(GROUND_TRUTH_FILE).exists());
    assert_eq!(frame_names(&no_poses.join("raw_cysto")).len(), 6);
}

#[test]
fn finalize_writes_templates_then_hands_off_video() {
    let tmp = tempfile::tempdir().expect("tmp");
    let templates = tmp.path().join("templates");
    fs::create_dir_all(&templates).expect("mkdir");
    fs::write(templates.join("camera_params.json"), "{}").expect("w");
    fs::write(templates.join("data_config.json"), r#"{"base_path": ""}"#).expect("w");
    fs::write(
        templates.join("frame_ranges_and_selection.json"),
        r#"{"cysto_frame_range": []}"#,
    )
    .expect("w");

    let data = tmp.path().join("scan");
    let mut cfg = config(&data, 4);
    cfg.template_folder = Some(templates);
    cfg.save_video = true;
    cfg.video.program = "evs-missing-encoder".to_string();

    let err = run_scan(&mut scene(), cfg).unwrap_err();
    assert!(matches!(err, ScanError::Video(VideoError::Spawn { .. })));
    // Earlier finalize steps already ran.
    assert_eq!(read_ground_truth(&data.join(GROUND_TRUTH_FILE)).expect("gt").len(), 4);
    let ranges = fs::read_to_string(data.join("frame_ranges_and_selection.json")).expect("read");
    assert_eq!(ranges, "{\n    \"cysto_frame_range\": [\n        0,\n        4\n    ]\n}");
}

#[test]
fn state_machine_moves_forward_only() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut scene = scene();
    let mut scan = ScanLoop::new(&mut scene, config(tmp.path(), 3));
    assert_eq!(scan.state(), ScanState::Init);

    let mut states = Vec::new();
    loop {
        let state = scan.step().expect("step");
        states.push(state);
        if state == ScanState::Done {
            break;
        }
    }
    assert_eq!(
        states,
        [
            ScanState::Rendering(0),
            ScanState::Rendering(1),
            ScanState::Rendering(2),
            ScanState::Finalize,
            ScanState::Done,
        ]
    );
    assert_eq!(scan.step().expect("idle"), ScanState::Done);
}

#[test]
fn deformation_follows_the_schedule() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut scene = scene();
    let mut cfg = config(tmp.path(), 11);
    cfg.deformation = DeformationParams {
        apply: true,
        cycles: 3,
        max_amplitude: 0.6,
    };
    run_scan(&mut scene, cfg).expect("scan");
    // Last frame: segment 3, phase 10 % 3 = 1.
    match scene.shape_blend(&ObjectId::from("bladder_sphere")) {
        Some(ShapeBlend::Deformed(w)) => assert!((w - 0.2).abs() < 1e-12),
        other => panic!("unexpected blend {other:?}"),
    }
}

#[test]
fn camera_to_world_convention_records_camera_position() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut cfg = config(tmp.path(), 8);
    cfg.save_render = false;
    cfg.trajectory_scale = 1.5;
    cfg.pose_convention = PoseConvention::CameraToWorld;

    let report = run_scan(&mut scene(), cfg).expect("scan");
    // Sine paths run on a 0.5 radius shell.
    let t = report.records[0].t;
    let radius = (t[0] * t[0] + t[1] * t[1] + t[2] * t[2]).sqrt();
    assert!((radius - 0.75).abs() < 1e-9);
}

#[test]
fn each_row_holds_the_pose_at_its_own_offset() {
    let tmp = tempfile::tempdir().expect("tmp");
    let frames = 10;
    let mut cfg = config(tmp.path(), frames);
    cfg.save_render = false;
    let report = run_scan(&mut scene(), cfg.clone()).expect("scan");
    assert_eq!(report.records.len(), frames);

    let mut reference = scene();
    let curve = ObjectId::from(cfg.trajectory.name());
    reference
        .bind_trajectory(&cfg.camera, &curve, cfg.trajectory_scale)
        .expect("bind");
    reference
        .set_track_target(&cfg.camera, &cfg.model)
        .expect("track");
    for (i, record) in report.records.iter().enumerate() {
        reference
            .set_path_offset(&cfg.camera, i as f64 / frames as f64)
            .expect("offset");
        reference.flush_transform().expect("flush");
        let expected = read_cv_pose(&reference, &cfg.camera).expect("pose").to_tq();
        assert_eq!(record.frame_index, i);
        for k in 0..3 {
            assert_relative_eq!(record.t[k], expected.t[k], epsilon = 1e-12);
        }
        for k in 0..4 {
            assert_relative_eq!(record.q[k], expected.q[k], epsilon = 1e-12);
        }
    }
    // Consecutive frames sit at different poses.
    assert!(report.records[0].t != report.records[1].t);
}

#[test]
fn rerunning_into_the_same_folder_overwrites_in_place() {
    let tmp = tempfile::tempdir().expect("tmp");
    let data = tmp.path().join("scan");
    let gt = data.join(GROUND_TRUTH_FILE);

    run_scan(&mut scene(), config(&data, 4)).expect("first run");
    let first = fs::read(&gt).expect("gt");
    run_scan(&mut scene(), config(&data, 4)).expect("second run");

    assert_eq!(fs::read(&gt).expect("gt"), first);
    let rows = read_ground_truth(&gt).expect("rows");
    assert_eq!(
        rows.iter().map(|r| r.frame_index).collect::<Vec<_>>(),
        [0, 1, 2, 3]
    );
    assert_eq!(
        frame_names(&data.join("raw_cysto")),
        [
            "cysto_000000.jpg",
            "cysto_000001.jpg",
            "cysto_000002.jpg",
            "cysto_000003.jpg"
        ]
    );
}
