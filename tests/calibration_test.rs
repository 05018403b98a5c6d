//! Calibration sequence tests


use head_pointer::{
    calibration::{CalibrationConfig, CalibrationEngine, CalibrationStep, Corner},
    config::Config,
    features::FeatureSample,
    mapping::ScreenPoint,
    pipeline::Pipeline,
    profile::CalibrationProfile,
    Error,
};
use test_helpers::{face_frame, CLOSED_EAR, DT, OPEN_EAR};

const CAPTURE: usize = 10;
const SETTLE: usize = 2;
const BLINK_CAPTURE: usize = 30;

fn quick_config() -> CalibrationConfig {
    CalibrationConfig {
        capture_frames: CAPTURE,
        settle_frames: SETTLE,
        blink_capture_frames: BLINK_CAPTURE,
        ..CalibrationConfig::default()
    }
}

fn sample(x: f64, y: f64, ear: f64) -> FeatureSample {
    FeatureSample {
        nose_x: x,
        nose_y: y,
        ear_left: ear,
        ear_right: ear,
    }
}

/// Feed one capture step; returns whatever the last frame produced
fn feed_step(engine: &mut CalibrationEngine, x: f64, y: f64) -> Option<CalibrationProfile> {
    let mut result = None;
    for _ in 0..SETTLE + CAPTURE {
        result = engine.feed(Some(&sample(x, y, OPEN_EAR))).unwrap();
    }
    result
}

fn blink_ears() -> Vec<f64> {
    // Three blinks of two frames each within the capture window
    (0..SETTLE + BLINK_CAPTURE)
        .map(|i| if matches!(i % 10, 4 | 5) { CLOSED_EAR } else { OPEN_EAR })
        .collect()
}

#[test]
fn test_unit_corners_give_unit_bounds() {
    let mut engine = CalibrationEngine::new(quick_config());
    engine.start(CalibrationProfile::default());

    assert!(feed_step(&mut engine, 0.5, 0.5).is_none());
    assert_eq!(engine.step(), CalibrationStep::CornerCapture(Corner::TopLeft));
    assert!(feed_step(&mut engine, 0.0, 0.0).is_none());
    assert!(feed_step(&mut engine, 1.0, 0.0).is_none());
    assert!(feed_step(&mut engine, 0.0, 1.0).is_none());
    assert!(feed_step(&mut engine, 1.0, 1.0).is_none());
    assert_eq!(engine.step(), CalibrationStep::BlinkThresholdCapture);

    let mut profile = None;
    for ear in blink_ears() {
        profile = engine.feed(Some(&sample(0.5, 0.5, ear))).unwrap();
    }
    let profile = profile.expect("calibration should complete");

    assert_eq!((profile.min_x, profile.max_x), (0.0, 1.0));
    assert_eq!((profile.min_y, profile.max_y), (0.0, 1.0));
    assert_eq!((profile.center_x, profile.center_y), (0.5, 0.5));
    assert!((profile.ear_threshold - (OPEN_EAR + CLOSED_EAR) / 2.0).abs() < 1e-9);
    assert_eq!(engine.step(), CalibrationStep::Complete);
}

#[test]
fn test_trimmed_mean_rejects_glances() {
    let mut engine = CalibrationEngine::new(quick_config());
    engine.start(CalibrationProfile::default());

    for _ in 0..SETTLE {
        engine.feed(Some(&sample(0.9, 0.9, OPEN_EAR))).unwrap();
    }
    // One stray sample in ten is trimmed away
    for i in 0..CAPTURE {
        let x = if i == 3 { 0.95 } else { 0.45 };
        engine.feed(Some(&sample(x, 0.55, OPEN_EAR))).unwrap();
    }
    for (x, y) in [(0.3, 0.3), (0.7, 0.3), (0.3, 0.7), (0.7, 0.7)] {
        feed_step(&mut engine, x, y);
    }
    let mut profile = None;
    for ear in blink_ears() {
        profile = engine.feed(Some(&sample(0.5, 0.5, ear))).unwrap();
    }
    let profile = profile.unwrap();
    assert!((profile.center_x - 0.45).abs() < 1e-9);
    assert!((profile.center_y - 0.55).abs() < 1e-9);
    assert!((profile.min_x - 0.3).abs() < 1e-9);
    assert!((profile.max_y - 0.7).abs() < 1e-9);
}

#[test]
fn test_no_blink_keeps_previous_threshold() {
    let mut engine = CalibrationEngine::new(quick_config());
    let base = CalibrationProfile {
        ear_threshold: 0.18,
        sensitivity_x: 1.5,
        deadzone_px: 4.0,
        ..CalibrationProfile::default()
    };
    engine.start(base);
    for (x, y) in [(0.5, 0.5), (0.3, 0.3), (0.7, 0.3), (0.3, 0.7), (0.7, 0.7)] {
        feed_step(&mut engine, x, y);
    }
    let profile = feed_step_blink_free(&mut engine).unwrap();

    assert_eq!(profile.ear_threshold, 0.18);
    // Fields calibration does not measure come from the base profile
    assert_eq!(profile.sensitivity_x, 1.5);
    assert_eq!(profile.deadzone_px, 4.0);
}

fn feed_step_blink_free(engine: &mut CalibrationEngine) -> Option<CalibrationProfile> {
    let mut result = None;
    for _ in 0..SETTLE + BLINK_CAPTURE {
        result = engine.feed(Some(&sample(0.5, 0.5, OPEN_EAR))).unwrap();
    }
    result
}

#[test]
fn test_identical_corners_fail_validation() {
    let mut engine = CalibrationEngine::new(quick_config());
    engine.start(CalibrationProfile::default());
    for _ in 0..5 {
        feed_step(&mut engine, 0.5, 0.5);
    }

    let mut outcome = Ok(None);
    for ear in blink_ears() {
        outcome = engine.feed(Some(&sample(0.5, 0.5, ear)));
        if outcome.is_err() {
            break;
        }
    }
    assert!(matches!(outcome, Err(Error::Configuration(_))));
    assert_eq!(engine.step(), CalibrationStep::Idle);
}

#[test]
fn test_abort_mid_corner() {
    let mut engine = CalibrationEngine::new(quick_config());
    engine.start(CalibrationProfile::default());
    feed_step(&mut engine, 0.5, 0.5);
    feed_step(&mut engine, 0.3, 0.3);

    let err = engine.abort().unwrap_err();
    assert!(matches!(
        err,
        Error::CalibrationAborted {
            step: CalibrationStep::CornerCapture(Corner::TopRight)
        }
    ));
    assert_eq!(err.to_string(), "Calibration aborted during top-right corner capture");

    // A restart begins from scratch
    engine.start(CalibrationProfile::default());
    assert_eq!(engine.step(), CalibrationStep::CenterCapture);
    assert_eq!(engine.progress().collected, 0);
}

#[test]
fn test_progress_reports_instruction() {
    let mut engine = CalibrationEngine::new(quick_config());
    assert_eq!(engine.instruction(), "Calibration not running");
    engine.start(CalibrationProfile::default());
    let progress = engine.progress();
    assert_eq!(progress.instruction, "Look at center of screen");
    assert_eq!(progress.needed, CAPTURE);
}

fn pipeline_with_quick_calibration() -> Pipeline {
    let config = Config {
        calibration: quick_config(),
        ..Config::default()
    };
    Pipeline::new(&config).unwrap()
}

#[test]
fn test_pipeline_calibration_replaces_profile() {
    let mut pipeline = pipeline_with_quick_calibration();
    pipeline.start_calibration();
    assert!(pipeline.is_calibrating());

    let mut t = 0.0;
    for (x, y) in [(0.5, 0.5), (0.35, 0.4), (0.65, 0.4), (0.35, 0.6), (0.65, 0.6)] {
        let frame = face_frame(x, y, OPEN_EAR);
        for _ in 0..SETTLE + CAPTURE {
            assert!(pipeline.process_frame(Some(&frame), t).is_none());
            t += DT;
        }
    }
    for ear in blink_ears() {
        let frame = face_frame(0.5, 0.5, ear);
        assert!(pipeline.process_frame(Some(&frame), t).is_none());
        t += DT;
    }

    assert!(!pipeline.is_calibrating());
    let profile = *pipeline.profile();
    assert!((profile.min_x - 0.35).abs() < 1e-9);
    assert!((profile.max_x - 0.65).abs() < 1e-9);
    assert!((profile.min_y - 0.4).abs() < 1e-9);
    assert!((profile.max_y - 0.6).abs() < 1e-9);
    assert!((profile.ear_threshold - (OPEN_EAR + CLOSED_EAR) / 2.0).abs() < 1e-6);

    // Output resumes with the new mapping
    let output = pipeline.process_frame(Some(&face_frame(0.5, 0.5, OPEN_EAR)), t).unwrap();
    assert_eq!(output.position, ScreenPoint::new(960, 540));
}

#[test]
fn test_pipeline_abort_keeps_profile() {
    let mut pipeline = pipeline_with_quick_calibration();
    let before = *pipeline.profile();
    pipeline.start_calibration();

    let frame = face_frame(0.2, 0.2, OPEN_EAR);
    for i in 0..20 {
        assert!(pipeline.process_frame(Some(&frame), f64::from(i) * DT).is_none());
    }
    assert!(matches!(
        pipeline.abort_calibration(),
        Err(Error::CalibrationAborted { .. })
    ));
    assert_eq!(*pipeline.profile(), before);
    assert!(pipeline.abort_calibration().is_ok());
    assert!(pipeline.process_frame(Some(&frame), 1.0).is_some());
}

#[test]
fn test_pipeline_ignores_missing_face_during_calibration() {
    let mut pipeline = pipeline_with_quick_calibration();
    pipeline.start_calibration();
    for i in 0..10 {
        pipeline.process_frame(None, f64::from(i) * DT);
    }
    let progress = pipeline.calibration_progress();
    assert_eq!(progress.step, CalibrationStep::CenterCapture);
    assert_eq!(progress.collected, 0);
}
