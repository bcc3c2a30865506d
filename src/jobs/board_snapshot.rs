use std::fmt;

use tracing::{error, info, warn};

use crate::board::SnapshotSource;
use crate::enrich::{run_enrichment_pass, EnrichmentCollaborator};
use crate::entities::RunStamp;
use crate::error::AppResult;
use crate::reconcile::reconcile;
use crate::store::PersistentStore;
use crate::summary::{ChangeSummary, EnrichmentSummary};

/// What one run did, for the log and the exit summary.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub summary: ChangeSummary,
    pub enrichment: Option<EnrichmentSummary>,
    pub records: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} records; {}", self.records, self.summary)?;
        if let Some(enrichment) = &self.enrichment {
            write!(f, "; enrichment {}", enrichment)?;
        }
        Ok(())
    }
}

/// Observe the board, fold the snapshot into the store and optionally enrich.
///
/// Nothing is written unless the snapshot was complete and reconciliation
/// succeeded; enrichment checkpoints after every record.
pub async fn run_board_snapshot<S, P>(
    source: &S,
    enricher: Option<&dyn EnrichmentCollaborator>,
    store: &P,
    run: RunStamp,
) -> AppResult<RunReport>
where
    S: SnapshotSource + ?Sized,
    P: PersistentStore + ?Sized,
{
    let prior = store.load()?;
    info!("Loaded {} known listings", prior.len());

    let snapshot = source.observe().await.map_err(|e| {
        error!("Snapshot failed, store left untouched: {}", e);
        e
    })?;

    let mut reconciliation = reconcile(&prior, &snapshot.listings, run).map_err(|e| {
        error!("Reconciliation aborted, store left untouched: {}", e);
        e
    })?;
    for warning in snapshot.warnings {
        reconciliation.summary.warn(warning);
    }

    store.save(&reconciliation.next)?;
    info!("Reconciled snapshot for {}. {}", run.date, reconciliation.summary);
    for warning in &reconciliation.summary.warnings {
        warn!("{}", warning);
    }

    let mut next = reconciliation.next;
    let enrichment = match enricher {
        Some(enricher) => Some(run_enrichment_pass(&mut next, enricher, store).await?),
        None => None,
    };

    Ok(RunReport {
        summary: reconciliation.summary,
        enrichment,
        records: next.len(),
    })
}

/// Resume enrichment against the persisted store without a new snapshot.
pub async fn run_enrichment_only<C, P>(enricher: &C, store: &P) -> AppResult<RunReport>
where
    C: EnrichmentCollaborator + ?Sized,
    P: PersistentStore + ?Sized,
{
    let mut records = store.load()?;
    let enrichment = run_enrichment_pass(&mut records, enricher, store).await?;
    Ok(RunReport {
        summary: ChangeSummary::default(),
        enrichment: Some(enrichment),
        records: records.len(),
    })
}
