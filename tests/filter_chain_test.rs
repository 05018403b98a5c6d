//! Cursor filter chain behavior tests


use head_pointer::{
    filters::{CursorFilterChain, FilterConfig},
    mapping::{map_to_screen, ScreenPoint, ScreenRect},
    profile::CalibrationProfile,
};
use proptest::prelude::*;
use test_helpers::DT;

fn chain_with(profile: CalibrationProfile) -> CursorFilterChain {
    CursorFilterChain::new(profile, FilterConfig::default(), ScreenRect::new(0, 0, 1920, 1080)).unwrap()
}

#[test]
fn test_converges_and_settles_on_constant_input() {
    let chain = chain_with(CalibrationProfile::default());
    let mut state = chain.new_state();
    let mut t = 0.0;

    // Ramp from 0.3 to 0.6 horizontally, then hold still
    for i in 0..=30 {
        chain.process(&mut state, 0.3 + 0.01 * f64::from(i), 0.5, t);
        t += DT;
    }
    let mut outputs = Vec::new();
    for _ in 0..150 {
        outputs.push(chain.process(&mut state, 0.6, 0.5, t));
        t += DT;
    }

    let target = map_to_screen(chain.profile(), &chain.screen(), 0.6, 0.5);
    let last = *outputs.last().unwrap();
    assert!(
        last.distance_to(&target) <= chain.profile().deadzone_px,
        "settled at {last}, target {target}"
    );

    // Once settled the cursor does not move any more
    let tail = &outputs[outputs.len() - 30..];
    assert!(tail.iter().all(|p| *p == last));
}

#[test]
fn test_single_outlier_does_not_reach_output() {
    let chain = chain_with(CalibrationProfile::default());
    let mut state = chain.new_state();
    let center = ScreenPoint::new(960, 540);
    let mut t = 0.0;

    let jitter = |i: u32| 0.001 * (f64::from(i) * 1.7).sin();
    let mut outputs = Vec::new();
    for i in 0..30 {
        outputs.push(chain.process(&mut state, 0.5 + jitter(i), 0.5 - jitter(i), t));
        t += DT;
    }
    let before = *outputs.last().unwrap();
    let spike = chain.process(&mut state, 0.95, 0.05, t);
    t += DT;
    assert_eq!(spike, before);

    for i in 30..60 {
        outputs.push(chain.process(&mut state, 0.5 + jitter(i), 0.5 - jitter(i), t));
        t += DT;
    }

    for point in &outputs {
        assert!(point.distance_to(&center) < 12.0, "output {point} strayed from {center}");
    }
    assert_eq!(state.rejected_frames(), 1);
}

#[test]
fn test_sustained_jump_is_reacquired() {
    let chain = chain_with(CalibrationProfile::default());
    let mut state = chain.new_state();
    let mut t = 0.0;
    for _ in 0..20 {
        chain.process(&mut state, 0.2, 0.5, t);
        t += DT;
    }

    let mut last = ScreenPoint::new(0, 0);
    for _ in 0..120 {
        last = chain.process(&mut state, 0.8, 0.5, t);
        t += DT;
    }
    let target = map_to_screen(chain.profile(), &chain.screen(), 0.8, 0.5);
    assert!(last.distance_to(&target) <= chain.profile().deadzone_px);
}

#[test]
fn test_deliberate_move_responds_quickly() {
    let chain = chain_with(CalibrationProfile::default());
    let mut state = chain.new_state();
    let mut t = 0.0;
    let mut still = ScreenPoint::new(0, 0);
    for _ in 0..30 {
        still = chain.process(&mut state, 0.5, 0.5, t);
        t += DT;
    }

    // Fast sweep: 0.04 of the frame per frame
    let onset = t;
    let mut moved_at = None;
    for i in 1..=10 {
        let point = chain.process(&mut state, 0.5 + 0.04 * f64::from(i), 0.5, t);
        if moved_at.is_none() && point != still {
            moved_at = Some(t - onset);
        }
        t += DT;
    }

    let moved_at = moved_at.expect("cursor never followed the sweep");
    assert!(moved_at < 0.15, "cursor responded after {moved_at:.3}s");
    assert_eq!(state.rejected_frames(), 1);
}

#[test]
fn test_deadzone_holds_small_motion() {
    let profile = CalibrationProfile {
        deadzone_px: 20.0,
        ..CalibrationProfile::default()
    };
    let chain = chain_with(profile);
    let mut state = chain.new_state();
    let first = chain.process(&mut state, 0.5, 0.5, 0.0);

    // 0.005 of 1920 px is under 10 px
    let mut t = DT;
    for _ in 0..60 {
        assert_eq!(chain.process(&mut state, 0.505, 0.5, t), first);
        t += DT;
    }
}

#[test]
fn test_set_screen_keeps_filter_state() {
    let mut chain = chain_with(CalibrationProfile::default());
    let mut state = chain.new_state();
    let mut t = 0.0;
    for _ in 0..30 {
        chain.process(&mut state, 0.25, 0.25, t);
        t += DT;
    }
    let estimate = state.kalman_estimate();

    let second = ScreenRect::new(1920, 0, 1280, 1024);
    chain.set_screen(second, &mut state).unwrap();
    assert_eq!(state.kalman_estimate(), estimate);

    let point = chain.process(&mut state, 0.25, 0.25, t);
    assert!(second.contains(point));
    assert_eq!(point, ScreenPoint::new(1920 + 320, 256));
}

#[test]
fn test_invalid_screen_rejected() {
    let mut chain = chain_with(CalibrationProfile::default());
    let mut state = chain.new_state();
    assert!(chain.set_screen(ScreenRect::new(0, 0, 0, 0), &mut state).is_err());
    assert_eq!(chain.screen(), ScreenRect::new(0, 0, 1920, 1080));
}

#[test]
fn test_irregular_timestamps() {
    let chain = chain_with(CalibrationProfile::default());
    let mut state = chain.new_state();
    let screen = chain.screen();

    // Repeated, backwards and huge gaps between frames
    for &t in &[0.0, 0.0, 0.01, 0.005, 100.0, 100.0, f64::NAN, 100.03] {
        let point = chain.process(&mut state, 0.4, 0.6, t);
        assert!(screen.contains(point));
    }
}

proptest! {
    #[test]
    fn prop_mapping_stays_on_screen(
        min_x in 0.0f64..0.8,
        span_x in 0.01f64..0.5,
        min_y in 0.0f64..0.8,
        span_y in 0.01f64..0.5,
        center_x in 0.0f64..1.0,
        center_y in 0.0f64..1.0,
        sensitivity_x in 0.1f64..5.0,
        sensitivity_y in 0.1f64..5.0,
        origin_x in -4000i32..4000,
        origin_y in -4000i32..4000,
        width in 1u32..8000,
        height in 1u32..8000,
        x in 0.0f64..=1.0,
        y in 0.0f64..=1.0,
    ) {
        let profile = CalibrationProfile {
            min_x,
            max_x: min_x + span_x,
            min_y,
            max_y: min_y + span_y,
            center_x,
            center_y,
            sensitivity_x,
            sensitivity_y,
            ..CalibrationProfile::default()
        };
        let screen = ScreenRect::new(origin_x, origin_y, width, height);
        prop_assert!(profile.validate().is_ok());

        let point = map_to_screen(&profile, &screen, x, y);
        prop_assert!(screen.contains(point), "{} outside {:?}", point, screen);
    }

    #[test]
    fn prop_chain_output_stays_on_screen(
        samples in prop::collection::vec((-0.5f64..1.5, -0.5f64..1.5), 1..60),
    ) {
        let chain = chain_with(CalibrationProfile::default());
        let mut state = chain.new_state();
        let screen = chain.screen();
        for (i, (x, y)) in samples.into_iter().enumerate() {
            let point = chain.process(&mut state, x, y, i as f64 * DT);
            prop_assert!(screen.contains(point));
        }
    }
}
