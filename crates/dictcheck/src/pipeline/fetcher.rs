//! Stage 1: resolve service identifiers into services.

use crate::pipeline::PipelineError;
use crate::service_source::ServiceSource;
use dictcheck_common::{Service, ServiceTarget};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Fetch every target in order, handing each service downstream as soon as
/// it resolves.
///
/// The first failure ends the stage. Returning drops `services`, which is
/// what tells the extractor no more services are coming.
pub async fn fetch_services(
    source: Arc<dyn ServiceSource>,
    targets: Vec<ServiceTarget>,
    services: mpsc::UnboundedSender<Arc<Service>>,
) -> Result<usize, PipelineError> {
    let mut sent = 0;

    for target in &targets {
        let service = source
            .get_service(&target.id)
            .await
            .map_err(|source| PipelineError::ServiceFetch {
                service_id: target.id.clone(),
                source,
            })?;

        info!("Fetched service {} ({})", service.name, target.display_name());

        // Receiver gone means the extractor already failed and owns the error
        if services.send(Arc::new(service)).is_err() {
            debug!("Service channel closed, stopping after {} services", sent);
            return Ok(sent);
        }
        sent += 1;
    }

    info!("Closing service channel after {} services", sent);
    Ok(sent)
}
