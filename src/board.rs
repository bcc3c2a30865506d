//! Careers board snapshot source.
//!
//! The board lists one `li[data-ui="job"]` per live posting. Long boards are
//! split across pages linked with `rel="next"`; a snapshot is only complete
//! once every page has been read, because a missing page would read as mass
//! deletion downstream.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use select::document::Document;
use select::node::Node;
use select::predicate::{Attr, Name, Predicate};
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::entities::{ObservedListing, NOT_SPECIFIED};
use crate::error::{AppError, AppResult};
use crate::fetch::{build_client, fetch_page};
use crate::html::node_text;

/// Listings observed in one run, plus the entries dropped as malformed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub listings: Vec<ObservedListing>,
    pub warnings: Vec<String>,
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// The full set of live listings. Fails with `SourceUnavailable` rather
    /// than returning a partial board.
    async fn observe(&self) -> AppResult<Snapshot>;
}

/// One parsed board page.
#[derive(Clone, Debug, Default)]
pub struct BoardPage {
    pub listings: Vec<ObservedListing>,
    pub warnings: Vec<String>,
    pub next_page: Option<Url>,
}

fn optional_field(entry: &Node, data_ui: &str) -> String {
    entry
        .find(Attr("data-ui", data_ui))
        .next()
        .map(|n| node_text(&n))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

fn parse_entry(entry: &Node, page_url: &Url) -> AppResult<ObservedListing> {
    let id = entry
        .attr("data-id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::MalformedObservation("listing without a data-id".to_string()))?;

    let title = entry
        .find(Attr("data-ui", "job-title"))
        .next()
        .map(|n| node_text(&n))
        .filter(|title| !title.is_empty())
        .ok_or_else(|| AppError::MalformedObservation(format!("listing {} has no title", id)))?;

    let href = entry
        .find(Name("a").and(Attr("href", ())))
        .next()
        .and_then(|a| a.attr("href"))
        .ok_or_else(|| AppError::MalformedObservation(format!("listing {} has no link", id)))?;
    let apply_link = page_url
        .join(href.trim())
        .map_err(|e| {
            AppError::MalformedObservation(format!("listing {} has an unusable link '{}': {}", id, href, e))
        })?;

    Ok(ObservedListing {
        id: id.to_string(),
        title,
        workplace_type: optional_field(entry, "job-workplace"),
        location: optional_field(entry, "job-location-tooltip"),
        department: optional_field(entry, "job-department"),
        job_type: optional_field(entry, "job-type"),
        apply_link: apply_link.to_string(),
    })
}

/// Extract listings and the next-page link from one rendered board page.
pub fn parse_board_page(html: &str, page_url: &Url) -> BoardPage {
    let document = Document::from(html);
    let mut page = BoardPage::default();

    for entry in document.find(Name("li").and(Attr("data-ui", "job"))) {
        match parse_entry(&entry, page_url) {
            Ok(listing) => page.listings.push(listing),
            Err(e) => {
                warn!("Dropping entry on {}: {}", page_url, e);
                page.warnings.push(e.to_string());
            }
        }
    }

    page.next_page = document
        .find(Attr("rel", "next"))
        .filter_map(|n| n.attr("href"))
        .find_map(|href| page_url.join(href.trim()).ok());

    page
}

pub struct HtmlBoardSource {
    client: Client,
    board_url: Url,
    max_pages: usize,
    retry_window: std::time::Duration,
}

impl HtmlBoardSource {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            board_url: config.board_url.clone(),
            max_pages: config.max_pages,
            retry_window: config.retry_window,
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self::new(build_client(config)?, config))
    }
}

#[async_trait]
impl SnapshotSource for HtmlBoardSource {
    #[tracing::instrument(skip(self), fields(board = %self.board_url))]
    async fn observe(&self) -> AppResult<Snapshot> {
        let mut snapshot = Snapshot::default();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut visited: HashSet<Url> = HashSet::new();
        let mut next = Some(self.board_url.clone());
        let mut pages = 0;

        while let Some(page_url) = next.take() {
            if !visited.insert(page_url.clone()) {
                break;
            }
            if pages == self.max_pages {
                return Err(AppError::SourceUnavailable(format!(
                    "board still has pages after the limit of {}",
                    self.max_pages
                )));
            }
            pages += 1;

            let html = fetch_page(&self.client, page_url.as_str(), self.retry_window)
                .await
                .map_err(|e| AppError::SourceUnavailable(format!("{}: {}", page_url, e)))?;
            let page = parse_board_page(&html, &page_url);

            let total = page.listings.len();
            let mut page_ids: HashSet<String> = HashSet::new();
            for listing in page.listings {
                // Overlap with earlier pages is normal; repeats within a page are left for reconcile to report.
                if seen_ids.contains(&listing.id) {
                    continue;
                }
                page_ids.insert(listing.id.clone());
                snapshot.listings.push(listing);
            }
            let added = page_ids.len();
            seen_ids.extend(page_ids);
            info!("Board page {} yielded {} listings ({} new)", pages, total, added);

            snapshot.warnings.extend(page.warnings);

            // "Show more" exhausted: a page with nothing new ends the walk.
            if added == 0 && pages > 1 {
                break;
            }
            next = page.next_page;
        }

        if snapshot.listings.is_empty() {
            warn!("Board returned no listings");
        }
        info!("Observed {} listings across {} pages", snapshot.listings.len(), pages);
        Ok(snapshot)
    }
}
