//! Property tests for the reauthentication trust window

use std::sync::Arc;
use std::time::Duration;

use connkeep_core::ConnectionId;
use connkeep_core::secret::{ManualClock, ReauthGate};
use proptest::prelude::*;

fn gate() -> (Arc<ManualClock>, ReauthGate) {
    let clock = Arc::new(ManualClock::new());
    let gate = ReauthGate::with_clock(clock.clone());
    (clock, gate)
}

proptest! {
    #[test]
    fn prop_trusted_strictly_inside_window(timeout_ms in 1u64..10_000_000, elapsed_ms in 0u64..20_000_000) {
        let id = ConnectionId::from("G1");
        let (clock, mut gate) = gate();
        prop_assert!(gate.should_prompt(&id, true, false, timeout_ms));

        gate.record_verified(&id, timeout_ms);
        clock.advance(Duration::from_millis(elapsed_ms));
        prop_assert_eq!(gate.should_prompt(&id, true, false, timeout_ms), elapsed_ms >= timeout_ms);
    }

    #[test]
    fn prop_zero_timeout_always_prompts(elapsed_ms in 0u64..1_000_000) {
        let id = ConnectionId::from("G1");
        let (clock, mut gate) = gate();
        gate.record_verified(&id, 0);
        clock.advance(Duration::from_millis(elapsed_ms));
        prop_assert!(gate.should_prompt(&id, true, false, 0));
        prop_assert!(gate.last_verified(&id).is_none());
    }

    #[test]
    fn prop_bypass_or_not_required_never_prompts(timeout_ms in 0u64..1_000_000, bypass in any::<bool>()) {
        let id = ConnectionId::from("G1");
        let (_clock, gate) = gate();
        prop_assert!(!gate.should_prompt(&id, false, bypass, timeout_ms));
        prop_assert!(!gate.should_prompt(&id, true, true, timeout_ms));
    }
}

#[test]
fn verification_is_per_connection() {
    let (_clock, mut gate) = gate();
    let a = ConnectionId::from("A");
    let b = ConnectionId::from("B");
    gate.record_verified(&a, 60_000);
    assert!(!gate.should_prompt(&a, true, false, 60_000));
    assert!(gate.should_prompt(&b, true, false, 60_000));

    gate.forget(&a);
    assert!(gate.should_prompt(&a, true, false, 60_000));
}
