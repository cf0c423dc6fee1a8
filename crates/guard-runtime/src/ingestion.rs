//! # Ingestion
//!
//! Reads newline-delimited JSON payloads and pushes each one through the
//! ingest adapter. Runs on its own OS thread: validation and publishing never
//! wait on a consumer, so the only thing that can slow this loop down is the
//! reader itself.
//!
//! Every payload is counted in the Prometheus registry here, since consumers
//! may drop events under load.

use crate::container::GuardIngest;
use guard_telemetry::{
    metric_inc, time_histogram, ANOMALIES_FLAGGED, MALFORMED_PAYLOADS, MESSAGES_VALIDATED,
    SCORER_FAILURES, VALIDATION_DURATION,
};
use std::io::{self, BufRead, Read};
use std::thread;
use tg_01_message_validation::{Processed, TimeSource};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Longest accepted payload line, newline excluded.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Counts for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Non-blank lines read.
    pub payloads: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Payloads that could not be parsed into a message.
    pub malformed: u64,
    /// Accepted messages the scorer flagged.
    pub anomalies: u64,
    /// Accepted messages the scorer could not judge.
    pub scorer_failures: u64,
}

impl IngestSummary {
    fn record(&mut self, processed: &Processed) {
        let verdict = &processed.event.verdict;
        let result = if verdict.accepted {
            self.accepted += 1;
            "accepted"
        } else {
            self.rejected += 1;
            "rejected"
        };
        metric_inc!(MESSAGES_VALIDATED, &[result, verdict.failed_stage.as_str()]);

        if processed.event.is_flagged() {
            self.anomalies += 1;
            metric_inc!(ANOMALIES_FLAGGED);
        }
        if processed.scorer_error.is_some() {
            self.scorer_failures += 1;
            metric_inc!(SCORER_FAILURES);
        }
    }
}

/// Ingest every line from `reader` until EOF.
///
/// Blank lines are skipped. Lines need not be valid UTF-8; a bad line is a
/// malformed payload, not a reader error. A line longer than
/// [`MAX_PAYLOAD_BYTES`] is discarded without being buffered whole and
/// counted as malformed.
pub fn ingest_lines<R, C>(mut reader: R, ingest: &GuardIngest<C>) -> io::Result<IngestSummary>
where
    R: BufRead,
    C: TimeSource,
{
    let mut summary = IngestSummary::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        let limit = MAX_PAYLOAD_BYTES as u64 + 1;
        if reader.by_ref().take(limit).read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.len() > MAX_PAYLOAD_BYTES && line.last() != Some(&b'\n') {
            let skipped = discard_line(&mut reader)?;
            warn!(bytes = line.len() + skipped, "Oversized payload dropped");
            summary.payloads += 1;
            summary.malformed += 1;
            metric_inc!(MALFORMED_PAYLOADS, &["oversized"]);
            continue;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        summary.payloads += 1;

        let _timer = time_histogram!(VALIDATION_DURATION);
        match ingest.ingest(&line) {
            Ok(processed) => summary.record(&processed),
            Err(err) => {
                summary.malformed += 1;
                metric_inc!(MALFORMED_PAYLOADS, &[err.kind()]);
            }
        }
    }

    debug!(?summary, "Reader exhausted");
    Ok(summary)
}

/// Consume the rest of the current line, returning how many bytes it held.
fn discard_line<R: BufRead>(reader: &mut R) -> io::Result<usize> {
    let mut skipped = 0;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(skipped);
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(skipped + pos + 1);
            }
            None => {
                let len = buf.len();
                reader.consume(len);
                skipped += len;
            }
        }
    }
}

/// Run [`ingest_lines`] on a dedicated thread.
///
/// The receiver resolves when the reader hits EOF (or fails).
pub fn spawn_ingestion<R, C>(
    reader: R,
    ingest: GuardIngest<C>,
) -> io::Result<oneshot::Receiver<io::Result<IngestSummary>>>
where
    R: BufRead + Send + 'static,
    C: TimeSource + 'static,
{
    let (done_tx, done_rx) = oneshot::channel();
    thread::Builder::new()
        .name("ingest".into())
        .spawn(move || {
            info!("Ingestion started");
            let outcome = ingest_lines(reader, &ingest);
            match &outcome {
                Ok(summary) => info!(
                    payloads = summary.payloads,
                    accepted = summary.accepted,
                    rejected = summary.rejected,
                    malformed = summary.malformed,
                    "Ingestion finished"
                ),
                Err(err) => error!(error = %err, "Ingestion aborted"),
            }
            let _ = done_tx.send(outcome);
        })?;
    Ok(done_rx)
}
