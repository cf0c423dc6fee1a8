//! # Fan-out Under Concurrency
//!
//! Several ingestion threads, several consumers, one distributor.
//!
//! ## Properties Tested:
//!
//! 1. Every consumer sees one global order (strictly increasing `seq_no`)
//! 2. Per-device sequence order survives the fan-out
//! 3. A stalled consumer loses only its own oldest events and never slows ingestion
//! 4. A message raced by many threads is accepted exactly once

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;
    use tokio::time::timeout;

    use chrono::{TimeZone, Utc};
    use guard_runtime::container::{GuardConfig, GuardContainer};
    use guard_runtime::ingestion::spawn_ingestion;
    use shared_bus::{EventFilter, Subscription};
    use shared_crypto::{sign_message, SharedSecret};
    use shared_types::{DeviceSequencer, TelemetryMessage};
    use tg_01_message_validation::{ManualClock, TimeSource};

    const SECRET: &str = "fanout-secret";

    fn container(capacity: usize) -> (Arc<GuardContainer<Arc<ManualClock>>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let mut config = GuardConfig::default();
        config.security.shared_secret = Some(SECRET.into());
        config.distributor.consumer_capacity = capacity;
        config.scoring.enabled = false;
        let container = GuardContainer::with_clock(config, clock.clone()).unwrap();
        (Arc::new(container), clock)
    }

    fn signed_stream(device: &str, count: u64, clock: &ManualClock) -> Vec<TelemetryMessage> {
        let secret = SharedSecret::new(SECRET.as_bytes().to_vec()).unwrap();
        let mut sequencer = DeviceSequencer::new(device);
        (0..count)
            .map(|_| {
                let mut msg = sequencer
                    .next_message()
                    .timestamp_at(clock.now())
                    .reading("flow_rate", 50.0)
                    .build();
                sign_message(&mut msg, &secret).unwrap();
                msg
            })
            .collect()
    }

    fn drain(sub: &mut Subscription) -> Vec<shared_bus::Delivery> {
        let mut out = Vec::new();
        while let Ok(Some(delivery)) = sub.try_recv() {
            out.push(delivery);
        }
        out
    }

    #[test]
    fn test_parallel_devices_keep_order_per_consumer() {
        const DEVICES: usize = 4;
        const PER_DEVICE: u64 = 500;
        let (container, clock) = container(10_000);
        let mut consumers: Vec<Subscription> =
            (0..3).map(|_| container.distributor.subscribe()).collect();

        let barrier = Arc::new(Barrier::new(DEVICES));
        let handles: Vec<_> = (0..DEVICES)
            .map(|i| {
                let ingest = container.ingest.clone();
                let stream = signed_stream(&format!("D{i}"), PER_DEVICE, &clock);
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for msg in stream {
                        let payload = serde_json::to_vec(&msg).unwrap();
                        assert!(ingest.ingest(&payload).unwrap().event.verdict.accepted);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let total = DEVICES as u64 * PER_DEVICE;
        assert_eq!(container.distributor.stats().accepted, total);
        for sub in &mut consumers {
            let deliveries = drain(sub);
            assert_eq!(deliveries.len() as u64, total);

            let seq_nos: Vec<u64> = deliveries.iter().map(|d| d.seq_no).collect();
            assert!(seq_nos.windows(2).all(|w| w[0] < w[1]));

            let mut last_by_device: HashMap<String, u64> = HashMap::new();
            for d in &deliveries {
                let msg = &d.event.verdict.message;
                let last = last_by_device.entry(msg.device_id.clone()).or_default();
                assert!(msg.sequence > *last, "{} went backwards", msg.device_id);
                *last = msg.sequence;
            }
            assert!(last_by_device.values().all(|&last| last == PER_DEVICE));
        }
    }

    #[test]
    fn test_stalled_consumer_loses_only_oldest() {
        let (container, clock) = container(10_000);
        let stalled = container
            .distributor
            .subscribe_with("stalled", EventFilter::All, 8);
        let mut healthy = container.distributor.subscribe();

        for msg in signed_stream("D1", 2_000, &clock) {
            let payload = serde_json::to_vec(&msg).unwrap();
            container.ingest.ingest(&payload).unwrap();
        }

        assert_eq!(drain(&mut healthy).len(), 2_000);
        assert_eq!(stalled.pending(), 8);
        assert_eq!(stalled.dropped(), 1_992);

        let mut stalled = stalled;
        let kept: Vec<u64> = drain(&mut stalled).iter().map(|d| d.seq_no).collect();
        assert_eq!(kept, (1_993..=2_000).collect::<Vec<_>>());
        assert_eq!(container.distributor.dropped_total(), 1_992);
    }

    #[test]
    fn test_raced_message_accepted_once() {
        let (container, clock) = container(1_000);
        let msg = signed_stream("D1", 1, &clock).remove(0);
        let payload = Arc::new(serde_json::to_vec(&msg).unwrap());

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ingest = container.ingest.clone();
                let payload = payload.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    ingest.ingest(&payload).unwrap().event.verdict.accepted
                })
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 1);
        let stats = container.distributor.stats();
        assert_eq!((stats.accepted, stats.sequence_failures), (1, 7));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_consumers_behind_ingestion_thread() {
        let (container, clock) = container(10_000);
        let mut input = Vec::new();
        for msg in signed_stream("D1", 1_000, &clock) {
            input.extend(serde_json::to_vec(&msg).unwrap());
            input.push(b'\n');
        }

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let mut sub = container.distributor.subscribe();
                tokio::spawn(async move {
                    let mut expected = 1;
                    while expected <= 1_000 {
                        let delivery = sub.recv().await.unwrap();
                        assert_eq!(delivery.seq_no, expected);
                        expected += 1;
                    }
                    expected - 1
                })
            })
            .collect();

        let done =
            spawn_ingestion(std::io::Cursor::new(input), container.ingest.clone()).unwrap();
        let summary = done.await.unwrap().unwrap();
        assert_eq!(summary.accepted, 1_000);

        for consumer in consumers {
            let seen = timeout(Duration::from_secs(10), consumer)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(seen, 1_000);
        }
    }
}
