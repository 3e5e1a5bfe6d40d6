//! Poll loop scheduling tests.

use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use crate::poll_loop::{LAN_DISCOVERY_INTERVAL, PollLoop};

use super::support::{EngineEvent, EngineLog, FakeBroadcaster, FakeDiscovery, FakeRelay};

type TestLoop = PollLoop<FakeDiscovery, FakeRelay, FakeBroadcaster>;

#[fixture]
fn log() -> EngineLog {
    EngineLog::default()
}

fn full_loop(log: &EngineLog) -> TestLoop {
    PollLoop::new(
        FakeDiscovery::new(log.clone()),
        Some(FakeRelay::new(log.clone())),
        Some(FakeBroadcaster::new(log.clone())),
    )
}

fn broadcasts(log: &EngineLog) -> usize {
    log.events()
        .iter()
        .filter(|event| **event == EngineEvent::Broadcast)
        .count()
}

#[rstest]
fn tick_runs_steps_in_fixed_order(log: EngineLog) {
    let mut poll_loop = full_loop(&log);
    poll_loop.tick(Instant::now());

    assert_eq!(
        log.events(),
        vec![
            EngineEvent::Advance,
            EngineEvent::Broadcast,
            EngineEvent::RelayAdvance,
            EngineEvent::Poll,
        ]
    );
}

#[rstest]
fn broadcasts_wait_for_the_interval(log: EngineLog) {
    let mut poll_loop = full_loop(&log);
    let start = Instant::now();

    poll_loop.tick(start);
    poll_loop.tick(start + Duration::from_millis(30));
    poll_loop.tick(start + LAN_DISCOVERY_INTERVAL - Duration::from_millis(1));
    assert_eq!(broadcasts(&log), 1);

    poll_loop.tick(start + LAN_DISCOVERY_INTERVAL);
    assert_eq!(broadcasts(&log), 2);
}

#[rstest]
fn failed_broadcast_still_resets_the_interval(log: EngineLog) {
    let mut poll_loop: TestLoop = PollLoop::new(
        FakeDiscovery::new(log.clone()),
        None,
        Some(FakeBroadcaster::new(log.clone()).failing()),
    );
    let start = Instant::now();

    poll_loop.tick(start);
    poll_loop.tick(start + Duration::from_secs(1));
    assert_eq!(broadcasts(&log), 1);
}

#[rstest]
fn disabled_features_are_skipped(log: EngineLog) {
    let mut poll_loop: TestLoop = PollLoop::new(FakeDiscovery::new(log.clone()), None, None);
    assert!(!poll_loop.has_relay());
    assert!(!poll_loop.has_broadcaster());

    poll_loop.tick(Instant::now());
    assert_eq!(log.events(), vec![EngineEvent::Advance, EngineEvent::Poll]);
}

#[rstest]
fn first_connection_clears_the_waiting_flag(log: EngineLog) {
    let mut poll_loop: TestLoop =
        PollLoop::new(FakeDiscovery::new(log.clone()).connected_after(2), None, None);
    let start = Instant::now();

    poll_loop.tick(start);
    assert!(poll_loop.is_waiting_for_peer());

    poll_loop.tick(start + Duration::from_millis(30));
    assert!(!poll_loop.is_waiting_for_peer());

    log.clear();
    poll_loop.tick(start + Duration::from_millis(60));
    assert!(!poll_loop.is_waiting_for_peer());
    assert_eq!(log.events(), vec![EngineEvent::Advance, EngineEvent::Poll]);
}
