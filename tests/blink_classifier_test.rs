//! Blink classification timing tests


use head_pointer::{
    blink::{BlinkClassifier, ClickEvent, ClickKind},
    profile::{ClickAction, ClickMapping},
};
use test_helpers::{repeat, CLOSED_EAR, DT, OPEN_EAR};

/// Feed one EAR per frame starting at frame `start`; returns the events with their frame index
fn run(blink: &mut BlinkClassifier, start: usize, ears: &[f64]) -> Vec<(usize, ClickEvent)> {
    ears.iter()
        .enumerate()
        .filter_map(|(i, &ear)| {
            let frame = start + i;
            blink.update(Some(ear), frame as f64 * DT).map(|e| (frame, e))
        })
        .collect()
}

fn sequence(parts: &[(f64, usize)]) -> Vec<f64> {
    parts.iter().flat_map(|&(ear, n)| repeat(ear, n)).collect()
}

fn default_classifier() -> BlinkClassifier {
    BlinkClassifier::new(0.21, 2, ClickMapping::default())
}

#[test]
fn test_short_blink_gives_one_left_after_window() {
    let mut blink = default_classifier();
    let ears = sequence(&[(OPEN_EAR, 3), (CLOSED_EAR, 2), (OPEN_EAR, 40)]);
    let events = run(&mut blink, 0, &ears);

    assert_eq!(events.len(), 1);
    let (_, event) = events[0];
    assert_eq!(event.kind, ClickKind::Left);

    // Eyes reopened on frame 5
    let reopen = 5.0 * DT;
    let waited = event.timestamp_s - reopen;
    assert!(waited >= 0.5 - 1e-9, "Left fired early, after {waited}s");
    assert!(waited < 0.5 + DT + 1e-9, "Left fired late, after {waited}s");
}

#[test]
fn test_two_short_blinks_give_double_only() {
    let mut blink = default_classifier();
    let ears = sequence(&[
        (OPEN_EAR, 3),
        (CLOSED_EAR, 2),
        (OPEN_EAR, 3),
        (CLOSED_EAR, 2),
        (OPEN_EAR, 40),
    ]);
    let events = run(&mut blink, 0, &ears);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1.kind, ClickKind::Double);
    // Emitted on the second reopen, frame 10
    assert_eq!(events[0].0, 10);
}

#[test]
fn test_second_blink_ending_after_window_is_double() {
    let mut blink = default_classifier();
    // First dip reopens at frame 6 (0.2s), the second starts at frame 15
    // (0.5s) and reopens at frame 22, past the end of the window
    let ears = sequence(&[
        (OPEN_EAR, 3),
        (CLOSED_EAR, 3),
        (OPEN_EAR, 9),
        (CLOSED_EAR, 7),
        (OPEN_EAR, 40),
    ]);
    let events = run(&mut blink, 0, &ears);

    assert_eq!(events.len(), 1, "got {events:?}");
    assert_eq!(events[0].0, 22);
    assert_eq!(events[0].1.kind, ClickKind::Double);
}

#[test]
fn test_long_blink_gives_one_right() {
    let mut blink = default_classifier();
    let ears = sequence(&[
        (OPEN_EAR, 3),
        (CLOSED_EAR, 12),
        (OPEN_EAR, 2),
        (CLOSED_EAR, 2),
        (OPEN_EAR, 40),
    ]);
    let events = run(&mut blink, 0, &ears);

    let rights: Vec<_> = events.iter().filter(|(_, e)| e.kind == ClickKind::Right).collect();
    assert_eq!(rights.len(), 1);
    // Emitted right on reopen, without waiting for the double window
    assert_eq!(rights[0].0, 15);
    assert!(events.iter().all(|(_, e)| e.kind != ClickKind::Double));
}

#[test]
fn test_cooldown_suppresses_second_click() {
    let mut blink = default_classifier();
    let ears = sequence(&[
        (OPEN_EAR, 3),
        (CLOSED_EAR, 10),
        (OPEN_EAR, 1),
        (CLOSED_EAR, 10),
        (OPEN_EAR, 40),
    ]);
    let events = run(&mut blink, 0, &ears);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1.kind, ClickKind::Right);
}

#[test]
fn test_clicks_after_cooldown_are_emitted() {
    let mut blink = default_classifier();
    let ears = sequence(&[
        (OPEN_EAR, 3),
        (CLOSED_EAR, 10),
        (OPEN_EAR, 30),
        (CLOSED_EAR, 10),
        (OPEN_EAR, 10),
    ]);
    let events = run(&mut blink, 0, &ears);

    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|(_, e)| e.kind == ClickKind::Right));
}

#[test]
fn test_single_frame_dip_is_ignored() {
    let mut blink = default_classifier();
    let ears = sequence(&[(OPEN_EAR, 3), (CLOSED_EAR, 1), (OPEN_EAR, 40)]);
    assert!(run(&mut blink, 0, &ears).is_empty());
}

#[test]
fn test_pending_left_fires_without_face() {
    let mut blink = default_classifier();
    let ears = sequence(&[(OPEN_EAR, 3), (CLOSED_EAR, 2), (OPEN_EAR, 1)]);
    assert!(run(&mut blink, 0, &ears).is_empty());

    let fired: Vec<_> = (6..40)
        .filter_map(|frame| blink.update(None, frame as f64 * DT))
        .collect();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].kind, ClickKind::Left);
}

#[test]
fn test_reset_drops_pending_blink() {
    let mut blink = default_classifier();
    let ears = sequence(&[(OPEN_EAR, 3), (CLOSED_EAR, 2), (OPEN_EAR, 1)]);
    run(&mut blink, 0, &ears);
    blink.reset();

    let ears = repeat(OPEN_EAR, 40);
    assert!(run(&mut blink, 6, &ears).is_empty());
}

#[test]
fn test_custom_mapping() {
    let mapping = ClickMapping {
        single_blink_action: ClickAction::RightClick,
        long_blink_action: ClickAction::LeftClick,
        ..ClickMapping::default()
    };
    let mut blink = BlinkClassifier::new(0.21, 2, mapping);

    let ears = sequence(&[(OPEN_EAR, 3), (CLOSED_EAR, 2), (OPEN_EAR, 40)]);
    let events = run(&mut blink, 0, &ears);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1.kind, ClickKind::Right);

    let ears = sequence(&[(CLOSED_EAR, 12), (OPEN_EAR, 5)]);
    let events = run(&mut blink, 100, &ears);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1.kind, ClickKind::Left);
}

#[test]
fn test_disabled_double_blink() {
    let mapping = ClickMapping {
        double_blink_action: ClickAction::None,
        ..ClickMapping::default()
    };
    let mut blink = BlinkClassifier::new(0.21, 2, mapping);
    let ears = sequence(&[
        (OPEN_EAR, 3),
        (CLOSED_EAR, 2),
        (OPEN_EAR, 3),
        (CLOSED_EAR, 2),
        (OPEN_EAR, 40),
    ]);
    assert!(run(&mut blink, 0, &ears).is_empty());
}

#[test]
fn test_longer_debounce() {
    let mut blink = BlinkClassifier::new(0.21, 4, ClickMapping::default());
    let ears = sequence(&[(OPEN_EAR, 3), (CLOSED_EAR, 3), (OPEN_EAR, 40)]);
    assert!(run(&mut blink, 0, &ears).is_empty());

    let ears = sequence(&[(CLOSED_EAR, 4), (OPEN_EAR, 40)]);
    let events = run(&mut blink, 100, &ears);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1.kind, ClickKind::Left);
}
