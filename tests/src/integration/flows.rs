//! # Integration Test Flows
//!
//! Payload bytes through `IngestAdapter`, `ValidationPipeline`, the scorer and
//! the `EventDistributor`, wired exactly as the runtime wires them but on a
//! manual clock.
//!
//! ## Flows Tested:
//!
//! 1. **In-order stream**: every message accepted, device state advances
//! 2. **Replay**: a resent message is blocked at SEQUENCE
//! 3. **Tampering**: an altered reading is blocked at INTEGRITY
//! 4. **Delay**: a late message is blocked at FRESHNESS before its sequence is looked at
//! 5. **Scoring**: accepted readings are annotated; rejected ones never are

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    use chrono::{DateTime, TimeZone, Utc};
    use guard_runtime::container::{GuardConfig, GuardContainer};
    use guard_runtime::dashboard::{project, DashboardMessage};
    use shared_bus::{EventFilter, Subscription};
    use shared_crypto::{sign_message, SharedSecret};
    use shared_types::{DeviceSequencer, FailedStage, TelemetryMessage};
    use tg_01_message_validation::{ManualClock, MessageValidationApi, TimeSource};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const SECRET: &str = "grandmarina-hydroficient-2024-secret-key";

    struct Harness {
        container: GuardContainer<Arc<ManualClock>>,
        clock: Arc<ManualClock>,
        secret: SharedSecret,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(t0()));
            let mut config = GuardConfig::default();
            config.security.shared_secret = Some(SECRET.into());
            let container = GuardContainer::with_clock(config, clock.clone()).unwrap();
            Self {
                container,
                clock,
                secret: SharedSecret::new(SECRET.as_bytes().to_vec()).unwrap(),
            }
        }

        /// Signed D1 reading at the current clock time, within normal bands.
        fn reading(&self, device: &mut DeviceSequencer) -> TelemetryMessage {
            let mut msg = device
                .next_message()
                .timestamp_at(self.clock.now())
                .reading("pressure_upstream", 60.1)
                .reading("flow_rate", 50.3)
                .reading("gate_a_position", 45.0)
                .field("status", "operational")
                .build();
            sign_message(&mut msg, &self.secret).unwrap();
            msg
        }

        fn send(&self, msg: &TelemetryMessage) -> shared_types::ValidationEvent {
            let payload = serde_json::to_vec(msg).unwrap();
            self.container.ingest.ingest(&payload).unwrap().event
        }

        fn subscribe(&self, filter: EventFilter) -> Subscription {
            self.container
                .distributor
                .subscribe_with("flow-test", filter, 64)
        }

        fn tick(&self, secs: i64) {
            self.clock.advance(chrono::Duration::seconds(secs));
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    async fn next(sub: &mut Subscription) -> shared_bus::Delivery {
        timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("delivery timed out")
            .expect("subscription closed")
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    /// Device sends 1, 2, 3: all accepted, last accepted is 3.
    #[tokio::test]
    async fn test_in_order_stream_accepted() {
        let h = Harness::new();
        let mut sub = h.subscribe(EventFilter::All);
        let mut d1 = DeviceSequencer::new("D1");

        for _ in 0..3 {
            h.tick(1);
            let event = h.send(&h.reading(&mut d1));
            assert!(event.verdict.accepted, "{}", event.verdict.reason);
        }

        assert_eq!(h.container.pipeline.last_accepted_sequence("D1"), Some(3));
        for expected in 1..=3u64 {
            let delivery = next(&mut sub).await;
            assert_eq!(delivery.seq_no, expected);
            assert_eq!(delivery.event.verdict.message.sequence, expected);
            assert_eq!(delivery.stats.accepted, expected);
        }
    }

    /// The sequence-2 message resent unchanged 10 seconds later.
    #[tokio::test]
    async fn test_resent_message_blocked_at_sequence() {
        let h = Harness::new();
        let mut d1 = DeviceSequencer::new("D1");
        let mut captured = None;
        for _ in 0..3 {
            let msg = h.reading(&mut d1);
            if msg.sequence == 2 {
                captured = Some(msg.clone());
            }
            assert!(h.send(&msg).verdict.accepted);
        }

        let mut attacks = h.subscribe(EventFilter::Rejected);
        h.tick(10);
        let event = h.send(&captured.unwrap());

        assert!(!event.verdict.accepted);
        assert_eq!(event.verdict.failed_stage, FailedStage::Sequence);
        assert!(event.verdict.reason.contains("2 <= 3"), "{}", event.verdict.reason);
        assert_eq!(h.container.pipeline.last_accepted_sequence("D1"), Some(3));

        let delivery = next(&mut attacks).await;
        let DashboardMessage::Attack(report) = project(&delivery.event, t0()) else {
            panic!("replay should project as an attack");
        };
        assert_eq!(report.attack_type, "Replay Attack");
        assert_eq!(delivery.stats.sequence_failures, 1);
    }

    /// One reading changed after signing.
    #[tokio::test]
    async fn test_altered_reading_blocked_at_integrity() {
        let h = Harness::new();
        let mut d1 = DeviceSequencer::new("D1");
        let mut msg = h.reading(&mut d1);
        msg.readings.insert("flow_rate".into(), 99.9);

        let event = h.send(&msg);
        assert_eq!(event.verdict.failed_stage, FailedStage::Integrity);
        assert!(event.anomaly.is_none());
        assert!(h.container.pipeline.last_accepted_sequence("D1").is_none());
    }

    /// Held back 45 seconds against a 30 second window.
    #[tokio::test]
    async fn test_delayed_message_blocked_at_freshness() {
        let h = Harness::new();
        let mut d1 = DeviceSequencer::new("D1");
        assert!(h.send(&h.reading(&mut d1)).verdict.accepted);

        // Sequence 2 would be acceptable.
        let late = h.reading(&mut d1);
        h.tick(45);
        let event = h.send(&late);

        assert_eq!(event.verdict.failed_stage, FailedStage::Freshness);
        assert!(event.verdict.reason.contains("45.0s"), "{}", event.verdict.reason);
        assert_eq!(h.container.pipeline.last_accepted_sequence("D1"), Some(1));

        // A fresh message with the same sequence still gets through.
        let mut d1_again = DeviceSequencer::resume("D1", 1);
        assert!(h.send(&h.reading(&mut d1_again)).verdict.accepted);
    }

    /// Accepted out-of-band readings carry an anomaly annotation.
    #[tokio::test]
    async fn test_scoring_annotates_accepted_only() {
        let h = Harness::new();
        let mut flagged = h.subscribe(EventFilter::Flagged);
        let mut d1 = DeviceSequencer::new("D1");

        let mut spike = d1
            .next_message()
            .timestamp_at(h.clock.now())
            .reading("pressure_upstream", 75.0)
            .reading("flow_rate", 50.0)
            .build();
        sign_message(&mut spike, &h.secret).unwrap();
        let event = h.send(&spike);
        assert!(event.verdict.accepted);
        assert!(event.is_flagged());
        let annotation = event.anomaly.clone().unwrap();
        assert!(annotation.score < 0.0);
        assert!(annotation.explanation.contains("high pressure"), "{}", annotation.explanation);

        // Replay of the spike: rejected, never scored, never delivered as flagged.
        let replay = h.send(&spike);
        assert_eq!(replay.verdict.failed_stage, FailedStage::Sequence);
        assert!(replay.anomaly.is_none());

        let delivery = next(&mut flagged).await;
        assert_eq!(delivery.seq_no, 1);
        assert!(flagged.try_recv().unwrap().is_none());
        assert_eq!(h.container.distributor.stats().anomalies, 1);
    }

    /// Unknown fields are signed and pass through to consumers untouched.
    #[tokio::test]
    async fn test_extra_fields_survive_to_consumers() {
        let h = Harness::new();
        let mut sub = h.subscribe(EventFilter::All);
        let mut d1 = DeviceSequencer::new("D1");
        let msg = h.reading(&mut d1);
        h.send(&msg);

        let delivery = next(&mut sub).await;
        assert_eq!(
            delivery.event.verdict.message.extra.get("status"),
            Some(&serde_json::Value::from("operational"))
        );
        assert_eq!(delivery.event.verdict.message, msg);
    }
}
