//! Loop and end-of-track tests driven through `tick()`

use approx::assert_relative_eq;
use tandem::prelude::*;

use crate::helpers::tolerances::TIME_EPSILON;
use crate::helpers::*;

fn count_loops(outcomes: &[TickOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|outcome| matches!(outcome, TickOutcome::Looped { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_ab_loop_fires_once_per_crossing() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 20.0));
    rig.controller.set_loop_mode(LoopMode::AbRange);
    rig.controller.set_marker_a(Some(2.0));
    rig.controller.set_marker_b(Some(10.0));
    rig.controller.play().await.unwrap();

    let mut outcomes = Vec::new();
    rig.set_logical_time(9.8);
    outcomes.push(rig.controller.tick());
    let before = rig.controller.generation();
    rig.set_logical_time(10.05);
    outcomes.push(rig.controller.tick());
    let after = rig.controller.generation();
    rig.set_logical_time(10.3);
    outcomes.push(rig.controller.tick());

    assert!(matches!(outcomes[0], TickOutcome::Advanced { .. }));
    assert_eq!(outcomes[1], TickOutcome::Looped { target: 2.0 });
    assert!(matches!(outcomes[2], TickOutcome::Advanced { .. }));
    assert_eq!(count_loops(&outcomes), 1);
    assert!(after > before);

    // Exactly one restart, at marker A
    let chain = rig.engine.chain("drums").unwrap();
    assert_eq!(chain.starts.len(), 2);
    assert_relative_eq!(
        chain.last_start().unwrap().offset,
        2.0 + rig.chain_latency(),
        epsilon = TIME_EPSILON
    );
    let TickOutcome::Advanced { time, .. } = outcomes[2] else {
        unreachable!();
    };
    assert_relative_eq!(time, 2.23, epsilon = TIME_EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_repeat_wraps_to_zero() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 10.0));
    rig.controller.set_loop_mode(LoopMode::Repeat);
    rig.controller.play().await.unwrap();

    rig.set_logical_time(9.9);
    assert!(matches!(rig.controller.tick(), TickOutcome::Advanced { .. }));
    rig.set_logical_time(10.1);
    assert_eq!(rig.controller.tick(), TickOutcome::Looped { target: 0.0 });

    assert!(rig.controller.is_playing());
    let start = rig.engine.chain("drums").unwrap().last_start().unwrap();
    assert_relative_eq!(start.offset, rig.chain_latency(), epsilon = TIME_EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_repeat_wraps_after_seeking_to_the_end() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 10.0));
    rig.controller.set_loop_mode(LoopMode::Repeat);
    rig.controller.play().await.unwrap();
    rig.set_logical_time(4.0);

    rig.controller.seek(10.0);
    assert!(rig.controller.is_playing());

    assert_eq!(rig.controller.tick(), TickOutcome::Looped { target: 0.0 });
    assert!(rig.controller.is_playing());
    let chain = rig.engine.chain("drums").unwrap();
    assert!(chain.started);
    assert_relative_eq!(
        chain.last_start().unwrap().offset,
        rig.chain_latency(),
        epsilon = TIME_EPSILON
    );
}

#[tokio::test(start_paused = true)]
async fn test_repeat_wraps_when_longest_track_is_muted_past_the_new_end() {
    let rig = rig();
    rig.repository.insert(silent_track("pad", 60.0));
    rig.repository.insert(silent_track("drums", 10.0));
    rig.controller.set_loop_mode(LoopMode::Repeat);
    rig.controller.play().await.unwrap();
    rig.set_logical_time(15.0);
    assert!(matches!(rig.controller.tick(), TickOutcome::Advanced { .. }));

    rig.set_logical_time(20.0);
    rig.controller.on_mute_changed("pad", true);

    assert_eq!(rig.controller.tick(), TickOutcome::Looped { target: 0.0 });
    assert_relative_eq!(rig.controller.effective_duration(), 10.0);
    let start = rig.engine.chain("drums").unwrap().last_start().unwrap();
    assert_relative_eq!(start.offset, rig.chain_latency(), epsilon = TIME_EPSILON);

    // The wrap happens once; the next tick just advances
    assert!(matches!(rig.controller.tick(), TickOutcome::Advanced { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_end_of_track_clamps_and_pauses() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 30.0));
    let visual = record_visual(&rig.controller);
    rig.controller.play().await.unwrap();

    rig.set_logical_time(30.4);
    let outcome = rig.controller.tick();

    assert_eq!(outcome, TickOutcome::Ended { duration: 30.0 });
    assert_eq!(visual.borrow().last().copied(), Some(30.0));
    assert!(visual.borrow().iter().all(|&time| time <= 30.0));
    assert!(!rig.controller.is_playing());
    assert_eq!(rig.controller.current_time(), 30.0);
    assert!(!rig.engine.chain("drums").unwrap().started);

    // Nothing more happens until play
    assert_eq!(rig.controller.tick(), TickOutcome::Idle);

    // Playing again starts over
    rig.controller.play().await.unwrap();
    assert_eq!(rig.controller.current_time(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_ab_without_marker_b_plays_to_end() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 10.0));
    rig.controller.set_loop_mode(LoopMode::AbRange);
    rig.controller.set_marker_a(Some(2.0));
    rig.controller.play().await.unwrap();

    rig.set_logical_time(10.2);
    assert_eq!(rig.controller.tick(), TickOutcome::Ended { duration: 10.0 });
}

#[tokio::test(start_paused = true)]
async fn test_empty_content_never_ends() {
    let rig = rig();
    rig.controller.play().await.unwrap();

    rig.set_logical_time(100.0);
    assert!(matches!(rig.controller.tick(), TickOutcome::Advanced { .. }));
    assert!(rig.controller.is_playing());
}

#[test]
fn test_loop_mode_change_keeps_markers() {
    let rig = rig();
    rig.controller.set_marker_a(Some(1.0));
    rig.controller.set_marker_b(Some(4.0));

    rig.controller.set_loop_mode(LoopMode::AbRange);

    let config = rig.controller.loop_config();
    assert_eq!(config.mode, LoopMode::AbRange);
    assert_eq!(config.marker_a, Some(1.0));
    assert_eq!(config.marker_b, Some(4.0));
}

#[test]
fn test_effective_duration_follows_mute_and_visibility() {
    let rig = rig_with(TandemConfig::default(), metronome_notes(20.0));
    rig.repository.insert(silent_track("long", 40.0));
    rig.repository.insert(silent_track("short", 25.0));
    assert_relative_eq!(rig.controller.effective_duration(), 40.0);

    rig.controller.set_track_mute("long", true);
    assert_relative_eq!(rig.controller.effective_duration(), 25.0);

    rig.controller.on_visibility_changed("short", false);
    assert_relative_eq!(rig.controller.effective_duration(), 19.5);

    rig.controller.set_track_mute("long", false);
    assert_relative_eq!(rig.controller.effective_duration(), 40.0);
}

#[tokio::test(start_paused = true)]
async fn test_end_uses_recomputed_duration() {
    let rig = rig();
    rig.repository.insert(silent_track("long", 40.0));
    rig.repository.insert(silent_track("short", 25.0));
    rig.controller.play().await.unwrap();

    rig.set_logical_time(26.0);
    assert!(matches!(rig.controller.tick(), TickOutcome::Advanced { .. }));

    rig.controller.set_track_mute("long", true);
    assert_eq!(rig.controller.tick(), TickOutcome::Ended { duration: 25.0 });
}
