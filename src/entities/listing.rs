use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::{serde_date, serde_opt_date, serde_opt_text, serde_time};

/// Placeholder written when a board entry omits an optional attribute.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Derived lifecycle state; never persisted as its own column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Deleted,
}

/// The logical timestamp assigned to every transition in one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunStamp {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl RunStamp {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    pub fn now() -> Self {
        let now = Utc::now().naive_utc();
        Self {
            date: now.date(),
            // minute precision, matching the stored column
            time: NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or_default(),
        }
    }

    pub fn on(date: NaiveDate) -> Self {
        Self { date, time: NaiveTime::MIN }
    }
}

/// One posting as seen on the board during a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservedListing {
    pub id: String,
    pub title: String,
    pub workplace_type: String,
    pub location: String,
    pub department: String,
    pub job_type: String,
    pub apply_link: String,
}

impl ObservedListing {
    /// Minimal observation with every optional attribute set to the placeholder.
    pub fn new(id: impl Into<String>, title: impl Into<String>, apply_link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            workplace_type: NOT_SPECIFIED.to_string(),
            location: NOT_SPECIFIED.to_string(),
            department: NOT_SPECIFIED.to_string(),
            job_type: NOT_SPECIFIED.to_string(),
            apply_link: apply_link.into(),
        }
    }
}

/// Persisted state of one posting. Field order is the store's column order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(rename = "Scraping Date", with = "serde_date")]
    pub first_seen_date: NaiveDate,
    #[serde(rename = "Scraping Time", with = "serde_time")]
    pub first_seen_time: NaiveTime,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Posted at", with = "serde_opt_date", default)]
    pub posted_at: Option<NaiveDate>,
    #[serde(rename = "Deleted at", with = "serde_opt_date", default)]
    pub deleted_at: Option<NaiveDate>,
    #[serde(rename = "Reposted at", with = "serde_opt_date", default)]
    pub reposted_at: Option<NaiveDate>,
    #[serde(rename = "Job Title")]
    pub title: String,
    #[serde(rename = "Workplace Type", default)]
    pub workplace_type: String,
    #[serde(rename = "Location", default)]
    pub location: String,
    #[serde(rename = "Department", default)]
    pub department: String,
    #[serde(rename = "Job Type", default)]
    pub job_type: String,
    #[serde(rename = "Apply Link", default)]
    pub apply_link: String,
    #[serde(rename = "Description", with = "serde_opt_text", default)]
    pub description: Option<String>,
    #[serde(rename = "Requirements", with = "serde_opt_text", default)]
    pub requirements: Option<String>,
    #[serde(rename = "Benefits", with = "serde_opt_text", default)]
    pub benefits: Option<String>,
}

impl ListingRecord {
    pub fn from_observation(observed: &ObservedListing, run: RunStamp) -> Self {
        Self {
            first_seen_date: run.date,
            first_seen_time: run.time,
            id: observed.id.clone(),
            posted_at: None,
            deleted_at: None,
            reposted_at: None,
            title: observed.title.clone(),
            workplace_type: observed.workplace_type.clone(),
            location: observed.location.clone(),
            department: observed.department.clone(),
            job_type: observed.job_type.clone(),
            apply_link: observed.apply_link.clone(),
            description: None,
            requirements: None,
            benefits: None,
        }
    }

    /// A repost on the same day as the deletion it answers counts as the later event.
    pub fn state(&self) -> LifecycleState {
        match (self.deleted_at, self.reposted_at) {
            (None, _) => LifecycleState::Active,
            (Some(deleted), Some(reposted)) if reposted >= deleted => LifecycleState::Active,
            (Some(_), _) => LifecycleState::Deleted,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// Active because of a repost rather than never having been deleted.
    pub fn is_reposted(&self) -> bool {
        self.reposted_at.is_some() && self.is_active()
    }

    /// Overwrite the descriptive attributes; returns whether anything changed.
    pub fn refresh_from(&mut self, observed: &ObservedListing) -> bool {
        let mut changed = false;
        for (field, value) in [
            (&mut self.title, &observed.title),
            (&mut self.workplace_type, &observed.workplace_type),
            (&mut self.location, &observed.location),
            (&mut self.department, &observed.department),
            (&mut self.job_type, &observed.job_type),
            (&mut self.apply_link, &observed.apply_link),
        ] {
            if *field != *value {
                field.clone_from(value);
                changed = true;
            }
        }
        changed
    }

    /// At least one long-text field is still waiting for enrichment.
    pub fn needs_enrichment(&self) -> bool {
        [&self.description, &self.requirements, &self.benefits]
            .into_iter()
            .any(|field| is_blank(field))
    }
}

pub fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, |text| text.trim().is_empty())
}
