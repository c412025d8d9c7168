//! Stage 2: turn each service's dictionary into records.

use crate::pipeline::PipelineError;
use crate::service_source::ServiceSource;
use dictcheck_common::{DictionaryRecord, Service};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Counts from a finished extraction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    pub services: usize,
    pub records: usize,
}

/// Consume services until the channel closes, emitting one record per
/// dictionary entry.
///
/// Services are handled one at a time. Any failure is fatal to the run.
/// The record channel is left open; closing it is the coordinator's call.
pub async fn extract_records(
    source: Arc<dyn ServiceSource>,
    dictionary_name: String,
    mut services: mpsc::UnboundedReceiver<Arc<Service>>,
    records: mpsc::UnboundedSender<DictionaryRecord>,
) -> Result<ExtractStats, PipelineError> {
    let mut stats = ExtractStats::default();

    while let Some(service) = services.recv().await {
        info!("Received service: {}", service.name);
        let emitted = extract_service(source.as_ref(), &dictionary_name, &service, &records).await?;
        stats.services += 1;
        stats.records += emitted;
    }

    info!(
        "Done receiving services ({} services, {} records)",
        stats.services, stats.records
    );
    Ok(stats)
}

async fn extract_service(
    source: &dyn ServiceSource,
    dictionary_name: &str,
    service: &Arc<Service>,
    records: &mpsc::UnboundedSender<DictionaryRecord>,
) -> Result<usize, PipelineError> {
    let version = service
        .active_version()
        .map_err(|source| PipelineError::ActiveVersion {
            service: service.name.clone(),
            source,
        })?;

    let dictionary = source
        .get_dictionary(&service.id, version, dictionary_name)
        .await
        .map_err(|source| PipelineError::DictionaryFetch {
            service: service.name.clone(),
            source,
        })?;

    let items = source
        .list_dictionary_items(&service.id, &dictionary.id)
        .await
        .map_err(|source| PipelineError::DictionaryList {
            service: service.name.clone(),
            source,
        })?;

    let count = items.len();
    info!(
        "Service {} version {}: {} entries in {}",
        service.name, version, count, dictionary.name
    );

    for item in items {
        records
            .send(DictionaryRecord::from_item(item, Arc::clone(service)))
            .map_err(|_| PipelineError::RecordChannelClosed)?;
    }

    Ok(count)
}
