use rigcal_param::{AlgorithmParam, Dialect, ParamBase, ParamError, SlaveDet};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tuned() -> AlgorithmParam {
    let mut param = AlgorithmParam::default();
    param.feat_det.request_feat_num = 120;
    param.feat_det.pyra_level = 3;
    param.feat_det.feature_track_dropout_rate = 0.15;
    param.feat_det.max_feature_distance_over_baseline_ratio = 2500.0;
    param.tracking.imaging_fps = 30;
    param.tracking.orb_match_thresh_test_ratio = 0.8;
    param.tracking.use_of_id = false;
    param.tracking.use_april_tag = true;
    param.tracking.slave_det = SlaveDet::Descriptor;
    param.tracking.undistort_before_vio = false;
    param
}

#[test]
fn test_round_trip_native() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("algorithm.yaml");

    tuned().write_to_yaml(&path).unwrap();
    let mut loaded = AlgorithmParam::default();
    loaded.load_from_yaml(&path).unwrap();
    assert_eq!(loaded, tuned());

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("imaging_FPS: 30"));
    assert!(text.contains("slave_det: DESC"));
}

#[test]
fn test_round_trip_legacy() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("algorithm_cv.yaml");

    tuned().write_to_cv_yaml(&path).unwrap();
    let mut loaded = AlgorithmParam::default();
    loaded.load_from_cv_yaml(&path).unwrap();
    assert_eq!(loaded, tuned());

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("%YAML:1.0"));
    assert!(text.contains("Tracking.use_april_tag: 1"));
}

#[test]
fn test_failed_load_keeps_previous_values() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "Tracking:\n  imaging_gain: [1, 2]\n").unwrap();

    let mut param = tuned();
    let err = param.load(&path, Dialect::Native).unwrap_err();
    assert!(matches!(err, ParamError::MalformedDocument(_)));
    assert_eq!(param, tuned());

    let err = param
        .load(dir.path().join("absent.yaml"), Dialect::Native)
        .unwrap_err();
    assert!(matches!(err, ParamError::MissingFile(_)));
    assert_eq!(param, tuned());
}

#[test]
fn test_unknown_slave_det_fails_legacy() {
    let text = "%YAML:1.0\n---\nTracking.slave_det: \"sparse\"\n";
    assert!(matches!(
        AlgorithmParam::from_document(text, Dialect::LegacyCv),
        Err(ParamError::MalformedDocument(_))
    ));
}
