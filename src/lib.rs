//! Lifecycle history for the postings on one careers board.
//!
//! Each run observes the board, reconciles the snapshot against the stored
//! history (new, deleted and reposted listings) and optionally fills in
//! detail-page fields for listings that still lack them.

pub mod board;
pub mod config;
pub mod dates;
pub mod enrich;
pub mod entities;
pub mod error;
pub mod fetch;
pub mod html;
pub mod jobs;
pub mod reconcile;
pub mod store;
pub mod summary;

pub use board::{HtmlBoardSource, Snapshot, SnapshotSource};
pub use config::Config;
pub use enrich::{DetailPageEnricher, EnrichmentCollaborator, EnrichmentResult};
pub use entities::{LifecycleState, ListingRecord, ObservedListing, RunStamp};
pub use error::{AppError, AppResult};
pub use reconcile::{reconcile, Reconciliation};
pub use store::{CsvStore, PersistentStore};
pub use summary::{ChangeSummary, EnrichmentSummary, ListingChange};

/// Install the INFO-level fmt subscriber used by both binaries.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
