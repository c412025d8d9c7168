//! Stage 3: check every record against policy docs.
//!
//! Each record gets its own task. Lookup failures stay inside that task and
//! only mark the record unverifiable.

use crate::policy_source::{PolicyAnswer, PolicySource};
use dictcheck_common::{DictionaryRecord, Discrepancy, Verdict};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};

/// Verdicts folded together
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerificationTally {
    pub matched: usize,
    pub unverifiable: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl VerificationTally {
    pub fn absorb(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Match => self.matched += 1,
            Verdict::Mismatch(discrepancy) => self.discrepancies.push(discrepancy),
            Verdict::Unverifiable(_) => self.unverifiable += 1,
        }
    }

    fn absorb_joined(&mut self, joined: Result<Verdict, JoinError>) {
        match joined {
            Ok(verdict) => self.absorb(verdict),
            Err(e) => {
                error!("Verification task failed: {}", e);
                self.unverifiable += 1;
            }
        }
    }

    /// Records that got any verdict at all
    pub fn total(&self) -> usize {
        self.matched + self.unverifiable + self.discrepancies.len()
    }
}

/// Look a record's hostname up in policy docs and compare site IDs
pub async fn verify_record(policy: &dyn PolicySource, record: &DictionaryRecord) -> Verdict {
    match policy.lookup(record.hostname()).await {
        Err(e) => {
            warn!(
                "Unable to fetch policy doc for service {} hostname {}: {}",
                record.service_name(),
                record.hostname(),
                e
            );
            Verdict::Unverifiable(e.to_string())
        }
        Ok(PolicyAnswer::NotFound) => {
            warn!(
                "Policy doc not found for service {} hostname {}",
                record.service_name(),
                record.hostname()
            );
            Verdict::Unverifiable("policy doc not found".to_string())
        }
        Ok(PolicyAnswer::Found(expected)) => {
            let verdict = Verdict::compare(record, &expected);
            if matches!(verdict, Verdict::Mismatch(_)) {
                debug!(
                    "Mismatch for {} on {}: {} != {}",
                    record.hostname(),
                    record.service_name(),
                    record.site_id(),
                    expected
                );
            }
            verdict
        }
    }
}

/// Spawn one verification per received record and wait for all of them.
///
/// Returns once the record channel is closed and drained and every spawned
/// verification has finished. Finished tasks are reaped while records are
/// still arriving so the join set only holds what is in flight.
pub async fn dispatch_verifications(
    policy: Arc<dyn PolicySource>,
    mut records: mpsc::UnboundedReceiver<DictionaryRecord>,
) -> VerificationTally {
    let mut in_flight = JoinSet::new();
    let mut tally = VerificationTally::default();

    loop {
        tokio::select! {
            received = records.recv() => match received {
                Some(record) => {
                    let policy = Arc::clone(&policy);
                    in_flight.spawn(async move { verify_record(policy.as_ref(), &record).await });
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                tally.absorb_joined(joined);
            }
        }
    }

    debug!(
        "Record channel closed, waiting on {} verifications",
        in_flight.len()
    );
    while let Some(joined) = in_flight.join_next().await {
        tally.absorb_joined(joined);
    }

    tally
}
