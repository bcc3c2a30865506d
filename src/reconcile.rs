//! Snapshot reconciliation: folds one observed board snapshot into the
//! store's listing history.
//!
//! The engine is a pure function of `(prior, observed, run)`. It never drops a
//! record, never creates a second record for an id, and assigns at most one
//! lifecycle transition per id per call:
//!
//! - observed but unknown: a new ACTIVE record
//! - known and observed: attributes refreshed, and a DELETED record gets `reposted_at`
//! - known but not observed: an ACTIVE record gets `deleted_at`; a DELETED one is left alone

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::entities::{LifecycleState, ListingRecord, ObservedListing, RunStamp};
use crate::error::{AppError, AppResult};
use crate::summary::{ChangeSummary, ListingChange};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub next: Vec<ListingRecord>,
    pub summary: ChangeSummary,
}

/// Id sets for one call. Each id belongs to exactly one of the three.
#[derive(Debug, Default)]
struct Partition<'a> {
    new_ids: BTreeSet<&'a str>,
    missing_ids: BTreeSet<&'a str>,
    kept_ids: BTreeSet<&'a str>,
}

impl<'a> Partition<'a> {
    fn split(prior: &BTreeSet<&'a str>, observed: &BTreeSet<&'a str>) -> Self {
        Self {
            new_ids: observed.difference(prior).copied().collect(),
            missing_ids: prior.difference(observed).copied().collect(),
            kept_ids: prior.intersection(observed).copied().collect(),
        }
    }

    fn check_disjoint(&self, prior_len: usize, observed_len: usize) -> AppResult<()> {
        let overlap = self
            .new_ids
            .intersection(&self.kept_ids)
            .chain(self.new_ids.intersection(&self.missing_ids))
            .chain(self.kept_ids.intersection(&self.missing_ids))
            .next();
        if let Some(id) = overlap {
            return Err(AppError::InvariantViolation(format!(
                "id {} falls into more than one partition",
                id
            )));
        }
        if self.kept_ids.len() + self.missing_ids.len() != prior_len
            || self.kept_ids.len() + self.new_ids.len() != observed_len
        {
            return Err(AppError::InvariantViolation(
                "partition does not cover every id exactly once".to_string(),
            ));
        }
        Ok(())
    }
}

fn index_prior(prior: &[ListingRecord]) -> AppResult<BTreeMap<&str, usize>> {
    let mut index = BTreeMap::new();
    for (pos, record) in prior.iter().enumerate() {
        if index.insert(record.id.as_str(), pos).is_some() {
            return Err(AppError::InvariantViolation(format!(
                "store holds more than one record for id {}",
                record.id
            )));
        }
    }
    Ok(index)
}

/// First occurrence wins; later copies of an id are reported, not fatal.
fn dedupe_observed<'a>(
    observed: &'a [ObservedListing],
    summary: &mut ChangeSummary,
) -> BTreeMap<&'a str, &'a ObservedListing> {
    let mut unique = BTreeMap::new();
    for listing in observed {
        if listing.id.trim().is_empty() {
            warn!(title = %listing.title, "Dropping observed listing without an id");
            summary.warn(format!("observed listing '{}' has no id", listing.title));
            continue;
        }
        if unique.contains_key(listing.id.as_str()) {
            warn!(id = %listing.id, "Snapshot contains a duplicate id; keeping the first occurrence");
            summary.duplicate_ids.push(listing.id.clone());
            summary.warn(format!("duplicate id {} in snapshot", listing.id));
            continue;
        }
        unique.insert(listing.id.as_str(), listing);
    }
    unique
}

fn latest_event(record: &ListingRecord) -> Option<NaiveDate> {
    record.deleted_at.max(record.reposted_at)
}

/// Compute the next store state from the prior one and a fresh snapshot.
pub fn reconcile(
    prior: &[ListingRecord],
    observed: &[ObservedListing],
    run: RunStamp,
) -> AppResult<Reconciliation> {
    let mut summary = ChangeSummary::default();

    let prior_index = index_prior(prior)?;
    if let Some(record) = prior
        .iter()
        .find(|record| latest_event(record).is_some_and(|event| event > run.date))
    {
        return Err(AppError::InvariantViolation(format!(
            "run date {} precedes a recorded event for id {}",
            run.date, record.id
        )));
    }

    let observed_by_id = dedupe_observed(observed, &mut summary);

    let prior_ids: BTreeSet<&str> = prior_index.keys().copied().collect();
    let observed_ids: BTreeSet<&str> = observed_by_id.keys().copied().collect();
    let partition = Partition::split(&prior_ids, &observed_ids);
    partition.check_disjoint(prior_ids.len(), observed_ids.len())?;

    let mut next = prior.to_vec();

    for id in &partition.kept_ids {
        let record = &mut next[prior_index[id]];
        let listing = observed_by_id[id];
        let refreshed = record.refresh_from(listing);

        if record.state() == LifecycleState::Deleted {
            debug!(id = %id, deleted_at = ?record.deleted_at, "Listing reappeared");
            record.reposted_at = Some(run.date);
            summary.record(ListingChange::Reposted { id: id.to_string() });
        } else if refreshed {
            debug!(id = %id, "Listing attributes changed upstream");
            summary.record(ListingChange::Refreshed { id: id.to_string() });
        } else {
            summary.unchanged += 1;
        }
    }

    for id in &partition.missing_ids {
        let record = &mut next[prior_index[id]];
        match record.state() {
            LifecycleState::Active if record.reposted_at == Some(run.date) => {
                // Reposted and gone again within one day: a deletion dated today
                // would tie with the repost and read as ACTIVE, so the next
                // day's run records it.
                debug!(id = %id, "Listing vanished on the day it was reposted");
                summary.still_missing += 1;
            }
            LifecycleState::Active => {
                debug!(id = %id, "Listing disappeared from the board");
                record.deleted_at = Some(run.date);
                summary.record(ListingChange::Deleted { id: id.to_string() });
            }
            LifecycleState::Deleted => summary.still_missing += 1,
        }
    }

    for id in &partition.new_ids {
        let listing = observed_by_id[id];
        debug!(id = %id, title = %listing.title, "New listing");
        next.push(ListingRecord::from_observation(listing, run));
        summary.record(ListingChange::Created { id: id.to_string() });
    }

    if next.len() != prior.len() + partition.new_ids.len() {
        return Err(AppError::InvariantViolation(format!(
            "store would hold {} records, expected {}",
            next.len(),
            prior.len() + partition.new_ids.len()
        )));
    }

    summary.finish();
    Ok(Reconciliation { next, summary })
}
