use std::fmt;

use serde::Serialize;

/// What happened to one id during a reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ListingChange {
    Created { id: String },
    Deleted { id: String },
    Reposted { id: String },
    Refreshed { id: String },
}

impl ListingChange {
    pub fn id(&self) -> &str {
        match self {
            ListingChange::Created { id }
            | ListingChange::Deleted { id }
            | ListingChange::Reposted { id }
            | ListingChange::Refreshed { id } => id,
        }
    }
}

/// Counts for one run. Reporting only; nothing branches on it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub created: usize,
    pub deleted: usize,
    pub reposted: usize,
    /// Kept records with no lifecycle transition and no attribute change.
    pub unchanged: usize,
    /// Kept records whose descriptive attributes changed upstream.
    pub refreshed: usize,
    /// Deleted records that are still absent.
    pub still_missing: usize,
    pub duplicate_ids: Vec<String>,
    pub warnings: Vec<String>,
    /// Ascending by id.
    pub changes: Vec<ListingChange>,
}

impl ChangeSummary {
    pub fn transitions(&self) -> usize {
        self.created + self.deleted + self.reposted
    }

    pub fn is_noop(&self) -> bool {
        self.transitions() == 0 && self.refreshed == 0
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub(crate) fn record(&mut self, change: ListingChange) {
        match &change {
            ListingChange::Created { .. } => self.created += 1,
            ListingChange::Deleted { .. } => self.deleted += 1,
            ListingChange::Reposted { .. } => self.reposted += 1,
            ListingChange::Refreshed { .. } => self.refreshed += 1,
        }
        self.changes.push(change);
    }

    /// Restore ascending id order after the per-partition passes.
    pub(crate) fn finish(&mut self) {
        self.changes.sort_by(|a, b| a.id().cmp(b.id()));
        self.duplicate_ids.sort();
        self.duplicate_ids.dedup();
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created: {}, deleted: {}, reposted: {}, unchanged: {}, refreshed: {}, still missing: {}",
            self.created, self.deleted, self.reposted, self.unchanged, self.refreshed, self.still_missing
        )?;
        if !self.duplicate_ids.is_empty() {
            write!(f, ", duplicate ids: {}", self.duplicate_ids.join(", "))?;
        }
        if !self.warnings.is_empty() {
            write!(f, ", warnings: {}", self.warnings.len())?;
        }
        Ok(())
    }
}

/// Outcome of one enrichment pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentSummary {
    pub attempted: usize,
    pub enriched: usize,
    pub empty: usize,
    pub failed: usize,
    pub skipped: usize,
    pub checkpoints: usize,
}

impl fmt::Display for EnrichmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted: {}, enriched: {}, nothing new: {}, failed: {}, skipped: {}",
            self.attempted, self.enriched, self.empty, self.failed, self.skipped
        )
    }
}
