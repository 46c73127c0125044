#[allow(dead_code)]
mod common;

use bottleneck::window::{AckOutcome, SendWindowConfig, WINDOW_SIZE_MAX};
use common::{Scenario, ScenarioConfig};

#[test]
fn no_loss_window_grows_per_forward_ack() {
    let mut scenario = Scenario::new(ScenarioConfig {
        window: SendWindowConfig {
            window_size: 4,
            aimd: true,
            initial_timeout_ms: 100.0,
            ..Default::default()
        },
        ..Default::default()
    });

    assert!(scenario.run_until(1000, |s| s.sender.base_id() >= 10));

    assert_eq!(scenario.receiver.expected(), 10);
    assert_eq!(scenario.sender.base_id(), 10);
    assert_eq!(scenario.sender.next_id(), 10);

    // Departures are spaced wider than a round trip, so every acknowledgment covers everything
    assert_eq!(scenario.outcomes.len(), 10);
    assert!(scenario.outcomes.iter().all(|&o| o == AckOutcome::Advanced));
    assert_eq!(scenario.sender.size(), (4 + 10).min(WINDOW_SIZE_MAX));

    assert_eq!(scenario.router.drop_count(0), 0);
    assert_eq!(scenario.sender.retransmit_count(), 0);
}

#[test]
fn no_loss_fixed_window() {
    let mut scenario = Scenario::new(ScenarioConfig {
        window: SendWindowConfig {
            window_size: 4,
            aimd: false,
            initial_timeout_ms: 100.0,
            ..Default::default()
        },
        ..Default::default()
    });

    assert!(scenario.run_until(1000, |s| s.sender.base_id() >= 10));

    assert_eq!(scenario.receiver.expected(), 10);
    assert_eq!(scenario.sender.size(), 4);
    assert_eq!(scenario.min_size_seen, 4);
    assert_eq!(scenario.max_size_seen, 4);
}

#[test]
fn burst_overflows_router_and_window_halves() {
    let mut scenario = Scenario::new(ScenarioConfig {
        window: SendWindowConfig {
            window_size: 5,
            aimd: true,
            initial_timeout_ms: 100.0,
            ..Default::default()
        },
        queue_capacity: 2,
        departure_gap_ms: 0,
        ..Default::default()
    });

    // The whole window departs at t=0, before the first service tick
    scenario.step();

    assert_eq!(scenario.sender.next_id(), 5);
    assert_eq!(scenario.router.len(0), 2);
    assert_eq!(scenario.router.drop_count(0), 3);

    assert!(scenario.run_until(20_000, |s| s.receiver.expected() >= 20));

    assert!(scenario.min_size_seen < 5);
    assert!(scenario.outcomes.iter().any(|&o| o != AckOutcome::Advanced));
    assert!(scenario.sender.retransmit_count() > 0);
}

#[test]
fn recovers_after_blackout() {
    let mut scenario = Scenario::new(ScenarioConfig {
        window: SendWindowConfig {
            window_size: 4,
            aimd: false,
            initial_timeout_ms: 100.0,
            ..Default::default()
        },
        blackout_until_ms: 300,
        ..Default::default()
    });

    assert!(scenario.run_until(10_000, |s| s.receiver.expected() >= 10));

    assert!(scenario.timeouts > 0);
    assert!(scenario.sender.retransmit_count() > 0);
    assert!(scenario.outcomes.contains(&AckOutcome::GoBack));
}

#[test]
fn fixed_window_recovers_from_overflow() {
    let mut scenario = Scenario::new(ScenarioConfig {
        window: SendWindowConfig {
            window_size: 16,
            aimd: false,
            initial_timeout_ms: 50.0,
            ..Default::default()
        },
        queue_capacity: 2,
        departure_gap_ms: 3,
        departure_jitter_ms: 5,
        seed: 7,
        ..Default::default()
    });

    assert!(scenario.run_until(5000, |s| s.receiver.expected() >= 100));

    assert!(scenario.router.drop_count(0) > 0);
    assert!(scenario.outcomes.contains(&AckOutcome::GoBack));
    assert_eq!(scenario.sender.size(), 16);
}

#[test]
fn window_invariants_hold_under_loss() {
    for aimd in [true, false] {
        for capacity in [1, 2, 3, 8] {
            for gap_ms in [0, 3, 20] {
                let mut scenario = Scenario::new(ScenarioConfig {
                    window: SendWindowConfig {
                        window_size: 16,
                        aimd,
                        initial_timeout_ms: 50.0,
                        ..Default::default()
                    },
                    queue_capacity: capacity,
                    departure_gap_ms: gap_ms,
                    departure_jitter_ms: 5,
                    seed: capacity as u64 * 100 + gap_ms,
                    ..Default::default()
                });

                let mut last_base = 0;

                for _ in 0..5000 {
                    scenario.step();

                    let tx = &scenario.sender;

                    assert!(tx.base_id() >= last_base);
                    assert!(tx.base_id() <= tx.next_id());
                    assert!(tx.next_id() <= tx.base_id() + tx.size());
                    assert!(scenario.router.len(0) <= capacity);
                    assert!(tx.base_id() <= scenario.receiver.expected());

                    last_base = tx.base_id();
                }

                // Service alone caps delivery at 500 units over this run
                assert!(
                    scenario.receiver.expected() >= 100,
                    "stalled at {} with aimd {aimd}, capacity {capacity}, gap {gap_ms}",
                    scenario.receiver.expected()
                );
            }
        }
    }
}
