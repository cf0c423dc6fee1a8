//! # Tampering Attacks
//!
//! The attacker can read and rewrite traffic but does not hold the shared
//! secret.
//!
//! ## Attacks Simulated:
//!
//! - Random single-bit corruption of a captured payload
//! - Forging with a guessed key
//! - Stripping, truncating or swapping the signature
//! - Injecting, removing or renaming fields after signing

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use guard_runtime::container::{GuardConfig, GuardContainer};
    use rand::Rng;
    use shared_crypto::{sign_message, SharedSecret};
    use shared_types::{DeviceSequencer, FailedStage, TelemetryMessage, ValidationEvent};
    use tg_01_message_validation::{IngestError, ManualClock, MessageValidationApi, TimeSource};

    const SECRET: &str = "grandmarina-hydroficient-2024-secret-key";

    struct Target {
        container: GuardContainer<Arc<ManualClock>>,
        clock: Arc<ManualClock>,
    }

    impl Target {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            ));
            let mut config = GuardConfig::default();
            config.security.shared_secret = Some(SECRET.into());
            let container = GuardContainer::with_clock(config, clock.clone()).unwrap();
            Self { container, clock }
        }

        fn genuine(&self, sequence: u64) -> TelemetryMessage {
            let mut msg = DeviceSequencer::resume("HYDROLOGIC-Device-001", sequence - 1)
                .next_message()
                .timestamp_at(self.clock.now())
                .reading("pressure_upstream", 60.3)
                .reading("flow_rate", 50.12)
                .reading("gate_a_position", 45.0)
                .field("status", "operational")
                .build();
            sign_message(&mut msg, &SharedSecret::new(SECRET.as_bytes().to_vec()).unwrap())
                .unwrap();
            msg
        }

        fn send_bytes(&self, payload: &[u8]) -> Result<ValidationEvent, IngestError> {
            self.container.ingest.ingest(payload).map(|p| p.event)
        }

        fn send(&self, msg: &TelemetryMessage) -> ValidationEvent {
            self.send_bytes(&serde_json::to_vec(msg).unwrap()).unwrap()
        }

        fn last(&self) -> Option<u64> {
            self.container
                .pipeline
                .last_accepted_sequence("HYDROLOGIC-Device-001")
        }
    }

    fn assert_integrity(event: &ValidationEvent) {
        assert!(!event.verdict.accepted);
        assert_eq!(
            event.verdict.failed_stage,
            FailedStage::Integrity,
            "{}",
            event.verdict.reason
        );
    }

    #[test]
    fn test_random_bit_flips_never_accepted() {
        let target = Target::new();
        let payload = serde_json::to_vec(&target.genuine(1)).unwrap();
        // Only the signed fields; hex is case-insensitive, so the tag itself
        // has equivalent spellings.
        let signed_end = payload
            .windows(12)
            .position(|w| w == b",\"signature\"")
            .unwrap();

        let mut rng = rand::thread_rng();
        let mut rejected = 0;
        let mut malformed = 0;
        for _ in 0..1_000 {
            let mut mutated = payload.clone();
            let index = rng.gen_range(0..signed_end);
            mutated[index] ^= 1u8 << rng.gen_range(0..8u32);

            match target.send_bytes(&mutated) {
                Ok(event) => {
                    assert_integrity(&event);
                    rejected += 1;
                }
                Err(_) => malformed += 1,
            }
        }

        assert_eq!(rejected + malformed, 1_000);
        assert!(rejected > 0);
        assert!(target.last().is_none());
        assert!(target.send(&target.genuine(1)).verdict.accepted);
    }

    #[test]
    fn test_forged_with_guessed_key() {
        let target = Target::new();
        for guess in ["password", "grandmarina", "secret", "hydroficient-2024"] {
            let mut forged = target.genuine(1);
            sign_message(&mut forged, &SharedSecret::new(guess.as_bytes().to_vec()).unwrap())
                .unwrap();
            assert_integrity(&target.send(&forged));
        }
        assert!(target.last().is_none());
    }

    #[test]
    fn test_signature_stripped_truncated_or_garbage() {
        let target = Target::new();
        let genuine = target.genuine(1);
        let tag = genuine.signature.clone().unwrap();

        let mut stripped = genuine.clone();
        stripped.signature = None;
        let event = target.send(&stripped);
        assert_integrity(&event);
        assert!(event.verdict.reason.contains("no signature"));

        let mut truncated = genuine.clone();
        truncated.signature = Some(tag[..32].to_string());
        assert_integrity(&target.send(&truncated));

        let mut garbage = genuine.clone();
        garbage.signature = Some("zz".repeat(32));
        assert_integrity(&target.send(&garbage));

        let mut empty = genuine;
        empty.signature = Some(String::new());
        assert_integrity(&target.send(&empty));
    }

    #[test]
    fn test_signature_from_other_message() {
        let target = Target::new();
        let first = target.genuine(1);
        let mut second = target.genuine(2);
        second.signature = first.signature.clone();
        assert_integrity(&target.send(&second));
        assert!(target.send(&first).verdict.accepted);
    }

    #[test]
    fn test_fields_added_removed_or_renamed_after_signing() {
        let target = Target::new();

        let mut injected = target.genuine(1);
        injected
            .extra
            .insert("valve_override".into(), serde_json::Value::Bool(true));
        assert_integrity(&target.send(&injected));

        let mut removed = target.genuine(1);
        removed.readings.remove("gate_a_position");
        assert_integrity(&target.send(&removed));

        let mut status = target.genuine(1);
        status.extra.remove("status");
        assert_integrity(&target.send(&status));

        let mut renamed = serde_json::to_value(target.genuine(1)).unwrap();
        let readings = renamed["readings"].as_object_mut().unwrap();
        let flow = readings.remove("flow_rate").unwrap();
        readings.insert("flow_rate_lpm".into(), flow);
        let event = target
            .send_bytes(renamed.to_string().as_bytes())
            .unwrap();
        assert_integrity(&event);

        assert!(target.last().is_none());
    }

    #[test]
    fn test_device_impersonation() {
        let target = Target::new();
        let mut msg = target.genuine(1);
        msg.device_id = "HYDROLOGIC-Device-002".into();
        assert_integrity(&target.send(&msg));
        assert!(target
            .container
            .pipeline
            .last_accepted_sequence("HYDROLOGIC-Device-002")
            .is_none());
    }

    #[test]
    fn test_tampering_does_not_block_the_device() {
        let target = Target::new();
        for _ in 0..10 {
            let mut msg = target.genuine(1);
            msg.readings.insert("flow_rate".into(), 0.0);
            assert_integrity(&target.send(&msg));
        }
        assert!(target.send(&target.genuine(1)).verdict.accepted);
        assert_eq!(target.container.distributor.stats().integrity_failures, 10);
    }
}
