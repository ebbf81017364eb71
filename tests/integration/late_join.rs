//! Late-join tests: tracks entering playback mid-stream

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use tandem::prelude::*;

use crate::helpers::tolerances::TIME_EPSILON;
use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_unmuted_track_joins_at_current_time() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 60.0));
    let events = record_events(&rig.controller);
    rig.controller.play().await.unwrap();

    rig.set_logical_time(15.0);
    rig.repository
        .insert(silent_track("vox", 60.0).muted(true));
    rig.controller.on_mute_changed("vox", false);

    let expected = 15.0 + rig.join_lookahead() + rig.chain_latency();
    let start = rig.engine.chain("vox").unwrap().last_start().unwrap();
    assert_relative_eq!(start.offset, expected, epsilon = TIME_EPSILON);
    assert_relative_eq!(start.at, 15.05 + rig.join_lookahead(), epsilon = TIME_EPSILON);

    let joined = events
        .borrow()
        .iter()
        .find_map(|event| match event {
            TrackEvent::Joined { id, offset } if id.as_str() == "vox" => Some(*offset),
            _ => None,
        })
        .unwrap();
    assert_relative_eq!(joined, expected, epsilon = TIME_EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_track_decoded_mid_playback_starts_where_playback_is() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 60.0));
    rig.repository
        .insert(TrackDescriptor::path("vox", "stems/vox.wav"));

    // Readiness wait times out; drums start alone
    rig.controller.play().await.unwrap();
    assert!(rig.engine.chain("vox").is_none());

    rig.set_logical_time(15.0);
    rig.loader.complete(&"vox".into(), silent_buffer(60.0));
    rig.controller.tick();

    let start = rig.engine.chain("vox").unwrap().last_start().unwrap();
    assert_relative_eq!(
        start.offset,
        15.0 + rig.join_lookahead() + rig.chain_latency(),
        epsilon = TIME_EPSILON
    );
    assert_eq!(rig.engine.chain("vox").unwrap().starts.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_decode_finishing_after_pause_does_not_start() {
    let rig = rig();
    rig.repository
        .insert(TrackDescriptor::path("vox", "stems/vox.wav"));
    rig.controller.play().await.unwrap();
    rig.controller.pause();

    rig.loader.complete(&"vox".into(), silent_buffer(60.0));
    rig.controller.effective_duration();

    assert!(rig.controller.track("vox").unwrap().ready);
    assert!(!rig.engine.chain("vox").unwrap().started);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_track_stops_and_rejoins() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 60.0));
    rig.repository.insert(silent_track("bass", 60.0));
    let events = record_events(&rig.controller);
    rig.controller.play().await.unwrap();

    rig.set_logical_time(5.0);
    rig.controller.on_visibility_changed("bass", false);
    assert!(!rig.engine.chain("bass").unwrap().started);
    assert!(rig.engine.chain("drums").unwrap().started);
    assert!(events
        .borrow()
        .iter()
        .any(|event| matches!(event, TrackEvent::Stopped { id } if id.as_str() == "bass")));

    rig.set_logical_time(7.0);
    rig.controller.on_visibility_changed("bass", true);
    let start = rig.engine.chain("bass").unwrap().last_start().unwrap();
    assert_relative_eq!(
        start.offset,
        7.0 + rig.join_lookahead() + rig.chain_latency(),
        epsilon = TIME_EPSILON
    );
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_is_throttled_until_next_tick() {
    let rig = rig();
    rig.repository.insert(silent_track("bass", 60.0));
    rig.controller.play().await.unwrap();

    rig.set_logical_time(7.0);
    rig.controller.on_visibility_changed("bass", false);
    rig.controller.on_visibility_changed("bass", true);
    assert_eq!(rig.engine.chain("bass").unwrap().starts.len(), 2);

    rig.set_logical_time(7.1);
    rig.controller.on_visibility_changed("bass", false);
    rig.set_logical_time(7.2);
    rig.controller.on_visibility_changed("bass", true);
    assert!(!rig.engine.chain("bass").unwrap().started);

    rig.set_logical_time(7.4);
    assert!(matches!(
        rig.controller.tick(),
        TickOutcome::Advanced { joined: 1, .. }
    ));
    assert!(rig.engine.chain("bass").unwrap().started);
}

#[tokio::test(start_paused = true)]
async fn test_registry_visibility_applied_on_tick() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 60.0));
    rig.repository.insert(silent_track("keys", 60.0));
    rig.controller.play().await.unwrap();

    rig.set_logical_time(3.0);
    rig.repository.set_visible(&"keys".into(), false);
    rig.controller.tick();
    assert!(!rig.engine.chain("keys").unwrap().started);

    rig.set_logical_time(4.0);
    rig.repository.set_visible(&"keys".into(), true);
    assert!(matches!(
        rig.controller.tick(),
        TickOutcome::Advanced { joined: 1, .. }
    ));
    assert!(rig.engine.chain("keys").unwrap().started);
}

#[tokio::test(start_paused = true)]
async fn test_new_registry_entry_joins_on_tick() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 60.0));
    rig.controller.play().await.unwrap();

    rig.set_logical_time(12.0);
    rig.repository.insert(silent_track("pad", 60.0));
    assert!(matches!(
        rig.controller.tick(),
        TickOutcome::Advanced { joined: 1, .. }
    ));
    let start = rig.engine.chain("pad").unwrap().last_start().unwrap();
    assert_relative_eq!(
        start.offset,
        12.0 + rig.join_lookahead() + rig.chain_latency(),
        epsilon = TIME_EPSILON
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_join_past_track_end() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 60.0));
    rig.controller.play().await.unwrap();

    rig.set_logical_time(12.0);
    rig.repository.insert(silent_track("hit", 4.0));
    assert!(matches!(
        rig.controller.tick(),
        TickOutcome::Advanced { joined: 0, .. }
    ));
    assert!(!rig.engine.chain("hit").unwrap().started);
}

#[tokio::test(start_paused = true)]
async fn test_no_join_while_paused() {
    let rig = rig();
    rig.repository.insert(silent_track("bass", 60.0));
    rig.controller.play().await.unwrap();
    rig.controller.on_visibility_changed("bass", false);
    rig.controller.pause();

    rig.controller.on_visibility_changed("bass", true);

    assert_eq!(rig.engine.started_chain_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_track_observers_may_call_back_into_the_controller() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 60.0));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let controller = Rc::downgrade(&rig.controller);
    let sink = seen.clone();
    rig.controller.subscribe_tracks(move |event| {
        let Some(controller) = controller.upgrade() else {
            return;
        };
        let time = controller.current_time();
        let id = match event {
            TrackEvent::Started { id, .. }
            | TrackEvent::Joined { id, .. }
            | TrackEvent::Stopped { id }
            | TrackEvent::Failed { id, .. } => id.clone(),
        };
        let started = controller.track(id).is_some_and(|info| info.started);
        sink.borrow_mut().push((event.clone(), time, started));
        if matches!(event, TrackEvent::Joined { .. }) {
            controller.pause();
        }
    });

    rig.controller.play().await.unwrap();
    rig.set_logical_time(15.0);
    rig.repository
        .insert(silent_track("vox", 60.0).muted(true));
    rig.controller.on_mute_changed("vox", false);

    let seen = seen.borrow();
    assert!(matches!(
        &seen[0],
        (TrackEvent::Started { id, .. }, time, true) if id.as_str() == "drums" && *time == 0.0
    ));
    assert!(seen
        .iter()
        .any(|entry| matches!(entry, (TrackEvent::Joined { id, .. }, _, true) if id.as_str() == "vox")));
    // The pause issued from inside the observer reaches the same observer
    let stopped = seen
        .iter()
        .filter(|(event, _, started)| matches!(event, TrackEvent::Stopped { .. }) && !started)
        .count();
    assert_eq!(stopped, 2);
    assert!(!rig.controller.is_playing());
    assert_relative_eq!(rig.controller.current_time(), 15.0, epsilon = TIME_EPSILON);
}
