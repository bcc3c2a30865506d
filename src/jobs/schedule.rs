use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use crate::board::SnapshotSource;
use crate::enrich::EnrichmentCollaborator;
use crate::entities::RunStamp;
use crate::error::AppResult;
use crate::jobs::run_board_snapshot;
use crate::store::PersistentStore;

/// Run the full cycle every `every`.
///
/// A failed cycle leaves the store unchanged and is retried on the next tick.
/// With `once` a single cycle runs and its error is returned to the caller.
pub async fn run_scheduled<S, P>(
    source: &S,
    enricher: Option<&dyn EnrichmentCollaborator>,
    store: &P,
    every: Duration,
    once: bool,
) -> AppResult<()>
where
    S: SnapshotSource + ?Sized,
    P: PersistentStore + ?Sized,
{
    let mut ticker = interval(every);
    loop {
        ticker.tick().await;
        info!("Running board snapshot...");

        match run_board_snapshot(source, enricher, store, RunStamp::now()).await {
            Ok(report) => info!("Board snapshot finished: {}", report),
            Err(e) if once => return Err(e),
            Err(e) => error!(?e, "board snapshot failed"),
        }

        if once {
            return Ok(());
        }
    }
}
