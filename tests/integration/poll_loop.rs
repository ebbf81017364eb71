//! Polling loop tests on a `LocalSet` with paused time

use std::time::Duration;

use tokio::task::LocalSet;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_poll_loop_drives_visual_updates() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 30.0));
    let visual = record_visual(&rig.controller);

    LocalSet::new()
        .run_until(async {
            let _handle = rig.controller.spawn_poll_loop();
            rig.controller.play().await.unwrap();
            rig.set_logical_time(1.0);

            tokio::time::sleep(Duration::from_millis(100)).await;

            let at_one = visual
                .borrow()
                .iter()
                .filter(|&&time| (time - 1.0).abs() < 1e-9)
                .count();
            assert!(at_one >= 3, "expected repeated updates, got {at_one}");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_poll_loop_pauses_at_end() {
    let rig = rig();
    rig.repository.insert(silent_track("drums", 30.0));
    let visual = record_visual(&rig.controller);

    LocalSet::new()
        .run_until(async {
            let _handle = rig.controller.spawn_poll_loop();
            rig.controller.play().await.unwrap();
            rig.set_logical_time(31.0);

            tokio::time::sleep(Duration::from_millis(100)).await;

            assert!(!rig.controller.is_playing());
            assert_eq!(rig.controller.current_time(), 30.0);
            assert_eq!(visual.borrow().last().copied(), Some(30.0));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_poll_loop_exits_when_controller_dropped() {
    let Rig { controller, .. } = rig();

    LocalSet::new()
        .run_until(async move {
            let handle = controller.spawn_poll_loop();
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(controller);
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("poll loop did not exit")
                .unwrap();
        })
        .await;
}
