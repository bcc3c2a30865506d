//! Detail-page enrichment.
//!
//! The long-text fields and `posted_at` are write-once: a field that already
//! holds text is never overwritten, and only records with at least one empty
//! text field are visited. The pass checkpoints the store after every record,
//! so an interrupted pass resumes from the persisted state alone.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use select::document::Document;
use select::node::Node;
use select::predicate::{Attr, Name, Predicate};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dates::parse_posted_date;
use crate::entities::{is_blank, ListingRecord};
use crate::error::{AppError, AppResult};
use crate::fetch::{build_client, fetch_page};
use crate::html::{node_text, text_lines};
use crate::store::PersistentStore;
use crate::summary::EnrichmentSummary;

/// Fields a detail page can contribute. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub posted_at: Option<NaiveDate>,
}

impl EnrichmentResult {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.description)
            && is_blank(&self.requirements)
            && is_blank(&self.benefits)
            && self.posted_at.is_none()
    }
}

#[async_trait]
pub trait EnrichmentCollaborator: Send + Sync {
    /// `Ok(None)` when the page carries nothing usable.
    async fn fetch(&self, apply_link: &str) -> AppResult<Option<EnrichmentResult>>;
}

fn fill_text(slot: &mut Option<String>, value: &Option<String>) -> bool {
    if is_blank(slot) && !is_blank(value) {
        *slot = value.clone();
        return true;
    }
    false
}

/// Copy only into empty fields. Returns whether the record changed.
pub fn apply_enrichment(record: &mut ListingRecord, result: &EnrichmentResult) -> bool {
    let mut changed = fill_text(&mut record.description, &result.description);
    changed |= fill_text(&mut record.requirements, &result.requirements);
    changed |= fill_text(&mut record.benefits, &result.benefits);
    if record.posted_at.is_none() {
        if let Some(posted_at) = result.posted_at {
            record.posted_at = Some(posted_at);
            changed = true;
        }
    }
    changed
}

/// Ids still missing at least one text field, ascending.
#[derive(Clone, Debug, Default)]
pub struct EnrichmentCursor {
    pending: VecDeque<String>,
}

impl EnrichmentCursor {
    pub fn from_records(records: &[ListingRecord]) -> Self {
        let mut ids: Vec<String> = records
            .iter()
            .filter(|r| r.needs_enrichment())
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        Self { pending: ids.into() }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Iterator for EnrichmentCursor {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.pending.pop_front()
    }
}

/// Visit every record that still needs enrichment, saving after each attempt.
///
/// Collaborator errors are logged and counted; only a failed checkpoint ends
/// the pass early.
pub async fn run_enrichment_pass<C, S>(
    records: &mut [ListingRecord],
    collaborator: &C,
    store: &S,
) -> AppResult<EnrichmentSummary>
where
    C: EnrichmentCollaborator + ?Sized,
    S: PersistentStore + ?Sized,
{
    let mut summary = EnrichmentSummary::default();
    let cursor = EnrichmentCursor::from_records(records);
    if cursor.is_empty() {
        info!("No listings need enrichment");
        return Ok(summary);
    }

    let total = cursor.remaining();
    info!("Found {} listings with missing details", total);

    let positions: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(pos, r)| (r.id.clone(), pos))
        .collect();

    for (n, id) in cursor.enumerate() {
        let Some(&pos) = positions.get(&id) else { continue };
        let link = records[pos].apply_link.trim().to_string();
        if link.is_empty() {
            warn!(id = %id, "Listing has no apply link; skipping enrichment");
            summary.skipped += 1;
            continue;
        }

        debug!("Enriching {} ({}/{})", id, n + 1, total);
        summary.attempted += 1;
        match collaborator.fetch(&link).await {
            Ok(Some(result)) => {
                if apply_enrichment(&mut records[pos], &result) {
                    summary.enriched += 1;
                } else {
                    summary.empty += 1;
                }
            }
            Ok(None) => summary.empty += 1,
            Err(e) => {
                warn!(id = %id, "Enrichment failed: {}", e);
                summary.failed += 1;
            }
        }

        store.save(records)?;
        summary.checkpoints += 1;
    }

    info!("Enrichment pass finished. {}", summary);
    Ok(summary)
}

const SECTION_NAMES: [&str; 3] = ["Description", "Requirements", "Benefits"];

fn section_heading<'a>(document: &'a Document, section: &Node<'a>) -> Option<Node<'a>> {
    if let Some(label) = section.attr("aria-labelledby") {
        if let Some(heading) = document
            .find(Name("h2").and(Attr("id", label)))
            .next()
        {
            return Some(heading);
        }
    }
    section.find(Name("h2")).next()
}

fn section_body(section: &Node, heading: &str) -> String {
    let mut lines = text_lines(section);
    if let Some(pos) = lines.iter().position(|line| line == heading) {
        lines.remove(pos);
    }
    lines.join("\n")
}

fn structured_date_posted(document: &Document) -> AppResult<Option<NaiveDate>> {
    let Some(script) = document
        .find(Name("script").and(Attr("type", "application/ld+json")))
        .next()
    else {
        return Ok(None);
    };

    let data: Value = serde_json::from_str(script.text().trim())
        .map_err(|e| AppError::EnrichmentFailure(format!("unreadable structured data: {}", e)))?;

    let raw = match &data {
        Value::Array(items) => items.iter().find_map(|item| item.get("datePosted")),
        other => other.get("datePosted"),
    };

    match raw.and_then(Value::as_str) {
        None => Ok(None),
        Some(raw) => parse_posted_date(raw)
            .map(Some)
            .ok_or_else(|| AppError::EnrichmentFailure(format!("malformed datePosted '{}'", raw))),
    }
}

/// Read the named sections and the structured posting date from a detail page.
pub fn parse_detail_page(html: &str) -> AppResult<Option<EnrichmentResult>> {
    let document = Document::from(html);
    let main = document
        .find(Name("main").and(Attr("role", "main")))
        .next()
        .ok_or_else(|| AppError::EnrichmentFailure("detail page has no main section".to_string()))?;

    let mut result = EnrichmentResult::default();
    let mut found = false;
    for section in main.find(Name("section")) {
        let Some(heading) = section_heading(&document, &section) else { continue };
        let name = node_text(&heading);
        if !SECTION_NAMES.contains(&name.as_str()) {
            continue;
        }
        let body = section_body(&section, &name);
        if body.is_empty() {
            continue;
        }
        let slot = match name.as_str() {
            "Description" => &mut result.description,
            "Requirements" => &mut result.requirements,
            _ => &mut result.benefits,
        };
        if slot.is_none() {
            *slot = Some(body);
            found = true;
        }
    }

    // The posting date is only trusted on pages that rendered their sections.
    if !found {
        return Ok(None);
    }
    result.posted_at = structured_date_posted(&document)?;
    Ok(Some(result))
}

pub struct DetailPageEnricher {
    client: Client,
    retry_window: std::time::Duration,
}

impl DetailPageEnricher {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            retry_window: config.retry_window,
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self::new(build_client(config)?, config))
    }

    /// `None` when enrichment is switched off (`ENRICH=false`).
    pub fn when_enabled(config: &Config) -> AppResult<Option<Self>> {
        if !config.enrich {
            return Ok(None);
        }
        Self::from_config(config).map(Some)
    }
}

#[async_trait]
impl EnrichmentCollaborator for DetailPageEnricher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, apply_link: &str) -> AppResult<Option<EnrichmentResult>> {
        let html = fetch_page(&self.client, apply_link, self.retry_window)
            .await
            .map_err(|e| AppError::EnrichmentFailure(format!("{}: {}", apply_link, e)))?;
        parse_detail_page(&html)
    }
}
