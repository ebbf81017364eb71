//! Tempo tests: pitch preservation and re-anchoring

use approx::assert_relative_eq;
use tandem::prelude::*;

use crate::helpers::tolerances::{SEMITONE_EPSILON, TIME_EPSILON};
use crate::helpers::*;

#[test]
fn test_tempo_change_preserves_pitch() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 10.0));

    rig.controller.set_tempo(240.0);
    rig.controller.effective_duration();
    let stretch = rig.engine.chain("drums").unwrap().stretch;
    assert_relative_eq!(stretch.rate, 2.0);
    assert_relative_eq!(stretch.pitch_semitones, -12.0, epsilon = SEMITONE_EPSILON);

    rig.controller.set_tempo(60.0);
    let stretch = rig.engine.chain("drums").unwrap().stretch;
    assert_relative_eq!(stretch.rate, 0.5);
    assert_relative_eq!(stretch.pitch_semitones, 12.0, epsilon = SEMITONE_EPSILON);
    assert_relative_eq!(stretch.perceived_pitch_ratio(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_tempo_clamped_and_non_finite_ignored() {
    let rig = rig();

    rig.controller.set_tempo(5_000.0);
    assert_eq!(rig.controller.tempo_bpm(), tandem::core::MAX_TEMPO_BPM);

    rig.controller.set_tempo(f64::NAN);
    assert_eq!(rig.controller.tempo_bpm(), tandem::core::MAX_TEMPO_BPM);
}

#[test]
fn test_tempo_change_while_paused_keeps_generation() {
    let rig = rig();
    rig.controller.seek(3.0);
    let generation = rig.controller.generation();

    rig.controller.set_tempo(90.0);

    assert_eq!(rig.controller.generation(), generation);
    assert_eq!(rig.controller.tempo_bpm(), 90.0);
    assert_eq!(rig.controller.current_time(), 3.0);
}

#[tokio::test(start_paused = true)]
async fn test_tempo_change_while_playing_reanchors() {
    let rig = rig_with(TandemConfig::default(), metronome_notes(20.0));
    rig.repository.insert(silent_track("drums", 20.0));
    rig.controller.play().await.unwrap();
    rig.set_logical_time(4.0);
    let before = rig.controller.generation();

    rig.controller.set_tempo(240.0);

    assert!(rig.controller.generation() > before);
    assert_relative_eq!(rig.controller.current_time(), 4.0, epsilon = TIME_EPSILON);

    let start = rig.engine.chain("drums").unwrap().last_start().unwrap();
    assert_relative_eq!(start.at, 4.07, epsilon = TIME_EPSILON);
    assert_relative_eq!(
        start.offset,
        4.0 + rig.chain_latency() * 2.0,
        epsilon = TIME_EPSILON
    );

    // Note offsets are halved after the restart
    let notes = rig.engine.notes("notes").unwrap();
    let ons: Vec<f64> = notes.note_ons().map(|event| event.at).take(2).collect();
    assert_relative_eq!(ons[0], 4.07, epsilon = TIME_EPSILON);
    assert_relative_eq!(ons[1], 4.57, epsilon = TIME_EPSILON);

    // Logical time runs at double speed
    rig.engine.set_time(5.07);
    assert_relative_eq!(rig.controller.current_time(), 6.0, epsilon = TIME_EPSILON);
}
