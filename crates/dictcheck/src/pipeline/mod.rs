//! Reconciliation pipeline
//!
//! ```text
//! targets -> fetcher -> [services] -> extractor -> [records] -> verifier (task per record)
//! ```
//!
//! The coordinator owns both channels and waits on two separate barriers:
//! the extractor finishing, then every dispatched verification finishing.
//! The record channel is closed between the two, never while the extractor
//! can still write to it.

pub mod extractor;
pub mod fetcher;
pub mod verifier;

use crate::policy_source::PolicySource;
use crate::service_source::ServiceSource;
use dictcheck_common::{ActiveVersionError, Discrepancy, ServiceTarget, SourceError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use extractor::ExtractStats;
pub use verifier::VerificationTally;

/// Errors that make the whole run untrustworthy
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unable to fetch service {service_id}: {source}")]
    ServiceFetch {
        service_id: String,
        #[source]
        source: SourceError,
    },

    #[error("Unable to determine active version for {service}: {source}")]
    ActiveVersion {
        service: String,
        #[source]
        source: ActiveVersionError,
    },

    #[error("Unable to get dictionary for {service}: {source}")]
    DictionaryFetch {
        service: String,
        #[source]
        source: SourceError,
    },

    #[error("Unable to list dictionary items for {service}: {source}")]
    DictionaryList {
        service: String,
        #[source]
        source: SourceError,
    },

    #[error("Record channel closed while extraction was still running")]
    RecordChannelClosed,

    #[error("{stage} task failed: {reason}")]
    TaskFailed { stage: &'static str, reason: String },
}

/// Outcome of a complete run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub services: usize,
    pub records: usize,
    pub matched: usize,
    pub unverifiable: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl RunSummary {
    fn new(stats: ExtractStats, tally: VerificationTally) -> Self {
        Self {
            services: stats.services,
            records: stats.records,
            matched: tally.matched,
            unverifiable: tally.unverifiable,
            discrepancies: tally.discrepancies,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Wires the stages together and runs them to completion
pub struct Coordinator {
    services: Arc<dyn ServiceSource>,
    policy: Arc<dyn PolicySource>,
    targets: Vec<ServiceTarget>,
    dictionary_name: String,
}

impl Coordinator {
    pub fn new(
        services: Arc<dyn ServiceSource>,
        policy: Arc<dyn PolicySource>,
        targets: Vec<ServiceTarget>,
        dictionary_name: impl Into<String>,
    ) -> Self {
        Self {
            services,
            policy,
            targets,
            dictionary_name: dictionary_name.into(),
        }
    }

    /// Run the pipeline until every record has been verified.
    ///
    /// On the first fatal error every stage task is aborted, including
    /// in-flight verifications, and no summary is produced.
    pub async fn run(self) -> Result<RunSummary, PipelineError> {
        let (service_tx, service_rx) = mpsc::unbounded_channel();
        let (record_tx, record_rx) = mpsc::unbounded_channel();

        info!(
            "Reconciling {} services against dictionary {}",
            self.targets.len(),
            self.dictionary_name
        );

        let mut fetcher = tokio::spawn(fetcher::fetch_services(
            Arc::clone(&self.services),
            self.targets,
            service_tx,
        ));
        let mut extractor = tokio::spawn(extractor::extract_records(
            Arc::clone(&self.services),
            self.dictionary_name,
            service_rx,
            record_tx.clone(),
        ));
        let verifier = tokio::spawn(verifier::dispatch_verifications(self.policy, record_rx));

        let extracted = tokio::try_join!(
            join_stage("fetcher", &mut fetcher),
            join_stage("extractor", &mut extractor)
        );
        let stats = match extracted {
            Ok((_, stats)) => stats,
            Err(e) => {
                debug!("Aborting stage tasks: {}", e);
                fetcher.abort();
                extractor.abort();
                verifier.abort();
                return Err(e);
            }
        };

        // Extractor is done and its sender is gone; ours is the last one
        drop(record_tx);

        let tally = verifier.await.map_err(|e| PipelineError::TaskFailed {
            stage: "verifier",
            reason: e.to_string(),
        })?;

        let summary = RunSummary::new(stats, tally);
        info!(
            "Checked {} records from {} services: {} matched, {} mismatched, {} unverifiable",
            summary.records,
            summary.services,
            summary.matched,
            summary.discrepancies.len(),
            summary.unverifiable
        );
        Ok(summary)
    }
}

async fn join_stage<T>(
    stage: &'static str,
    handle: &mut JoinHandle<Result<T, PipelineError>>,
) -> Result<T, PipelineError> {
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(PipelineError::TaskFailed {
            stage,
            reason: e.to_string(),
        }),
    }
}
