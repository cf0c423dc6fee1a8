//! # Replay Attacks
//!
//! The attacker records genuine signed traffic and sends it again later.
//! Signatures stay valid, so only freshness and sequence tracking stand in
//! the way.
//!
//! ## Attacks Simulated:
//!
//! - Immediate replay of a captured stream
//! - Delayed replay after the validator restarts with empty device state
//! - Rolling a device back to an earlier sequence
//! - Pre-dating a capture into the future

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use guard_runtime::container::{GuardConfig, GuardContainer};
    use shared_crypto::{sign_message, SharedSecret};
    use shared_types::{DeviceSequencer, FailedStage, TelemetryMessage, ValidationEvent};
    use tg_01_message_validation::{ManualClock, MessageValidationApi, TimeSource};

    const SECRET: &str = "grandmarina-hydroficient-2024-secret-key";
    const DEVICE: &str = "HYDROLOGIC-Device-001";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn secret() -> SharedSecret {
        SharedSecret::new(SECRET.as_bytes().to_vec()).unwrap()
    }

    struct Target {
        container: GuardContainer<Arc<ManualClock>>,
        clock: Arc<ManualClock>,
    }

    impl Target {
        fn boot(at: DateTime<Utc>) -> Self {
            let clock = Arc::new(ManualClock::new(at));
            let mut config = GuardConfig::default();
            config.security.shared_secret = Some(SECRET.into());
            let container = GuardContainer::with_clock(config, clock.clone()).unwrap();
            Self { container, clock }
        }

        fn send(&self, msg: &TelemetryMessage) -> ValidationEvent {
            let payload = serde_json::to_vec(msg).unwrap();
            self.container.ingest.ingest(&payload).unwrap().event
        }

        fn last(&self) -> Option<u64> {
            self.container.pipeline.last_accepted_sequence(DEVICE)
        }
    }

    /// Genuine device traffic: one signed message per second.
    fn capture(
        target: &Target,
        device: &mut DeviceSequencer,
        count: usize,
    ) -> Vec<TelemetryMessage> {
        (0..count)
            .map(|_| {
                target.clock.advance(chrono::Duration::seconds(1));
                let mut msg = device
                    .next_message()
                    .timestamp_at(target.clock.now())
                    .reading("pressure_upstream", 60.0)
                    .reading("flow_rate", 50.0)
                    .reading("gate_a_position", 45.0)
                    .build();
                sign_message(&mut msg, &secret()).unwrap();
                msg
            })
            .collect()
    }

    fn assert_blocked_at(event: &ValidationEvent, stage: FailedStage) {
        assert!(!event.verdict.accepted);
        assert_eq!(event.verdict.failed_stage, stage, "{}", event.verdict.reason);
    }

    #[test]
    fn test_immediate_replay_of_captured_stream() {
        let target = Target::boot(t0());
        let mut device = DeviceSequencer::new(DEVICE);
        let recorded = capture(&target, &mut device, 5);
        for msg in &recorded {
            assert!(target.send(msg).verdict.accepted);
        }

        for msg in &recorded {
            assert_blocked_at(&target.send(msg), FailedStage::Sequence);
        }

        assert_eq!(target.last(), Some(5));
        let stats = target.container.distributor.stats();
        assert_eq!((stats.accepted, stats.sequence_failures), (5, 5));
    }

    #[test]
    fn test_replay_out_of_order_within_window() {
        let target = Target::boot(t0());
        let mut device = DeviceSequencer::new(DEVICE);
        let recorded = capture(&target, &mut device, 3);
        for msg in &recorded {
            target.send(msg);
        }

        // Newest first: even the most recent message is already spent.
        for msg in recorded.iter().rev() {
            assert_blocked_at(&target.send(msg), FailedStage::Sequence);
        }

        // The device itself carries on.
        let next = capture(&target, &mut device, 1);
        assert!(target.send(&next[0]).verdict.accepted);
        assert_eq!(target.last(), Some(4));
    }

    #[test]
    fn test_delayed_replay_after_restart_is_stale() {
        let before = Target::boot(t0());
        let mut device = DeviceSequencer::new(DEVICE);
        let recorded = capture(&before, &mut device, 3);
        for msg in &recorded {
            before.send(msg);
        }
        drop(before);

        // Fresh process, no device state, one minute later.
        let after = Target::boot(t0() + chrono::Duration::seconds(63));
        for msg in &recorded {
            assert_blocked_at(&after.send(msg), FailedStage::Freshness);
        }
        assert!(after.last().is_none());
    }

    #[test]
    fn test_replay_after_restart_inside_window_is_first_contact() {
        // Device state is in memory only: a restart inside the freshness window
        // forgets the device, and the first message it sees sets the baseline.
        let before = Target::boot(t0());
        let mut device = DeviceSequencer::new(DEVICE);
        let recorded = capture(&before, &mut device, 3);
        drop(before);

        let after = Target::boot(t0() + chrono::Duration::seconds(10));
        assert!(after.send(&recorded[1]).verdict.accepted);
        assert_blocked_at(&after.send(&recorded[0]), FailedStage::Sequence);
        assert_blocked_at(&after.send(&recorded[1]), FailedStage::Sequence);
        assert!(after.send(&recorded[2]).verdict.accepted);
        assert_eq!(after.last(), Some(3));
    }

    #[test]
    fn test_sequence_rollback_rejected() {
        let target = Target::boot(t0());
        let mut device = DeviceSequencer::resume(DEVICE, 99);
        for msg in capture(&target, &mut device, 2) {
            assert!(target.send(&msg).verdict.accepted);
        }
        assert_eq!(target.last(), Some(101));

        // Correctly signed and fresh, but from a device "rebooted" to zero.
        let mut rebooted = DeviceSequencer::new(DEVICE);
        let rolled_back = capture(&target, &mut rebooted, 1);
        let event = target.send(&rolled_back[0]);
        assert_blocked_at(&event, FailedStage::Sequence);
        assert!(event.verdict.reason.contains("1 <= 101"), "{}", event.verdict.reason);
    }

    #[test]
    fn test_forward_jump_is_accepted_and_burns_the_gap() {
        let target = Target::boot(t0());
        let mut device = DeviceSequencer::new(DEVICE);
        let recorded = capture(&target, &mut device, 3);

        assert!(target.send(&recorded[0]).verdict.accepted);
        assert!(target.send(&recorded[2]).verdict.accepted);
        // Delivered late but still fresh: the skipped message can no longer land.
        assert_blocked_at(&target.send(&recorded[1]), FailedStage::Sequence);
    }

    #[test]
    fn test_future_dated_message_does_not_advance_sequence() {
        let target = Target::boot(t0());
        let mut device = DeviceSequencer::new(DEVICE);
        assert!(target.send(&capture(&target, &mut device, 1)[0]).verdict.accepted);

        let mut ahead = device
            .next_message()
            .timestamp_at(target.clock.now() + chrono::Duration::seconds(120))
            .reading("flow_rate", 50.0)
            .build();
        sign_message(&mut ahead, &secret()).unwrap();

        let event = target.send(&ahead);
        assert_blocked_at(&event, FailedStage::Freshness);
        assert!(event.verdict.reason.starts_with("future-dated"));
        assert_eq!(target.last(), Some(1));

        // Waiting for the timestamp to come due lets it through once.
        target.clock.advance(chrono::Duration::seconds(120));
        assert!(target.send(&ahead).verdict.accepted);
        assert_blocked_at(&target.send(&ahead), FailedStage::Sequence);
    }

    #[test]
    fn test_replay_across_devices_breaks_signature() {
        let target = Target::boot(t0());
        let mut device = DeviceSequencer::new(DEVICE);
        let mut stolen = capture(&target, &mut device, 1).remove(0);
        stolen.device_id = "HYDROLOGIC-Device-002".into();

        assert_blocked_at(&target.send(&stolen), FailedStage::Integrity);
        assert_eq!(target.container.pipeline.device_count(), 0);
    }
}
