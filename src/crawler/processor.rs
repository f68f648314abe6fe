//! Per-paper processing
//!
//! One job per paper page:
//! 1. Fetch the paper page (retried on transient failure)
//! 2. Extract title, authors and the optional PDF link
//! 3. Download the PDF into the year directory (retried on transient failure)
//! 4. Hand the resulting record to the ledger
//!
//! Whether a paper whose page or PDF could not be fetched still gets a ledger
//! row is decided by the `[output]` recording switches.

use crate::crawler::download::{download_binary, DownloadError};
use crate::crawler::fetcher::{fetch_page, FetchError};
use crate::crawler::parser::{parse_item_page, SiteSelectors};
use crate::crawler::retry::{RetryError, RetryPolicy};
use crate::ledger::LedgerHandle;
use crate::model::{
    sanitize_filename, truncate_filename, ItemRef, PaperRecord, MAX_BASE_NAME_BYTES,
};
use crate::output::HarvestStats;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Base file name used when neither the title nor the URL yields one
const FALLBACK_BASE_NAME: &str = "untitled";

/// Errors raised while processing one paper
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Paper page {url} could not be fetched: {source}")]
    PageFetch {
        url: String,
        source: RetryError<FetchError>,
    },

    /// The page was read but its PDF could not be downloaded
    #[error("PDF {url} could not be downloaded: {source}")]
    Download {
        url: String,
        record: PaperRecord,
        source: RetryError<DownloadError>,
    },
}

/// What happened to a paper's PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryStatus {
    /// Written to this path
    Downloaded(PathBuf),
    /// The page has no PDF link
    NoLink,
    /// Download failed after retries
    Failed(String),
    /// The page itself was never read
    NotAttempted,
}

/// A paper whose page was read successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedItem {
    pub record: PaperRecord,
    pub binary: BinaryStatus,
}

/// Final state of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A row was appended to the ledger
    Recorded {
        record: PaperRecord,
        binary: BinaryStatus,
    },
    /// No row was written
    Dropped { url: String, reason: String },
}

/// Ledger recording switches taken from `[output]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPolicy {
    /// Record papers whose PDF download failed
    pub failed_downloads: bool,
    /// Record a placeholder for papers whose page could not be fetched
    pub exhausted_items: bool,
}

impl Default for RecordPolicy {
    fn default() -> Self {
        Self {
            failed_downloads: true,
            exhausted_items: false,
        }
    }
}

/// Processes paper pages; shared by every worker
pub struct ItemProcessor {
    client: Client,
    selectors: Arc<SiteSelectors>,
    retry: RetryPolicy,
    output_root: PathBuf,
    ledger: LedgerHandle,
    stats: Arc<HarvestStats>,
    policy: RecordPolicy,
}

impl ItemProcessor {
    pub fn new(
        client: Client,
        selectors: Arc<SiteSelectors>,
        retry: RetryPolicy,
        output_root: PathBuf,
        ledger: LedgerHandle,
        stats: Arc<HarvestStats>,
        policy: RecordPolicy,
    ) -> Self {
        Self {
            client,
            selectors,
            retry,
            output_root,
            ledger,
            stats,
            policy,
        }
    }

    /// Directory that receives the PDFs of `year`
    pub fn year_dir(&self, year: &str) -> PathBuf {
        self.output_root.join(year)
    }

    /// Fetches, parses and downloads one paper without touching the ledger
    ///
    /// # Errors
    ///
    /// - [`ProcessError::PageFetch`] when the page fails every attempt or
    ///   fails permanently
    /// - [`ProcessError::Download`] when the PDF download fails; the error
    ///   carries the record built from the page
    pub async fn process(&self, item: &ItemRef) -> Result<ProcessedItem, ProcessError> {
        let label = item.item_url.as_str();

        let html = self
            .retry
            .run(label, |_| fetch_page(&self.client, &item.item_url))
            .await
            .map_err(|source| ProcessError::PageFetch {
                url: item.item_url.to_string(),
                source,
            })?;

        let page = parse_item_page(&html, &item.item_url, &self.selectors);
        let title = sanitize_filename(&page.title);

        let record = PaperRecord {
            year: item.year.clone(),
            title: title.clone(),
            authors: page.authors,
            item_url: item.item_url.to_string(),
        };

        let Some(binary_url) = page.binary_url else {
            tracing::debug!(year = %item.year, url = %item.item_url, "no PDF link on page");
            return Ok(ProcessedItem {
                record,
                binary: BinaryStatus::NoLink,
            });
        };

        let base_name = if title.is_empty() {
            fallback_base_name(&item.item_url)
        } else {
            truncate_filename(&title, MAX_BASE_NAME_BYTES).to_string()
        };
        let dir = self.year_dir(&item.year);

        match self
            .retry
            .run(binary_url.as_str(), |_| {
                download_binary(&self.client, &binary_url, &dir, &base_name)
            })
            .await
        {
            Ok(path) => Ok(ProcessedItem {
                record,
                binary: BinaryStatus::Downloaded(path),
            }),
            Err(source) => Err(ProcessError::Download {
                url: binary_url.to_string(),
                record,
                source,
            }),
        }
    }

    /// Runs one job to completion: process, apply the recording policy,
    /// append to the ledger and update the run statistics
    pub async fn run_job(&self, item: ItemRef) -> ItemOutcome {
        let (record, binary) = match self.process(&item).await {
            Ok(processed) => (processed.record, processed.binary),
            Err(ProcessError::Download {
                url,
                record,
                source,
            }) => {
                self.stats.increment_binaries_failed();
                tracing::warn!(
                    year = %item.year,
                    url = %url,
                    attempts = source.attempts(),
                    error = %source.last_error(),
                    "PDF download failed"
                );
                if !self.policy.failed_downloads {
                    return self.drop_item(&item, format!("PDF download failed: {}", source));
                }
                (record, BinaryStatus::Failed(source.to_string()))
            }
            Err(ProcessError::PageFetch { url, source }) => {
                tracing::warn!(
                    year = %item.year,
                    url = %url,
                    attempts = source.attempts(),
                    error = %source.last_error(),
                    "giving up on paper"
                );
                if !self.policy.exhausted_items {
                    return self.drop_item(&item, source.to_string());
                }
                (PaperRecord::placeholder(&item), BinaryStatus::NotAttempted)
            }
        };

        match &binary {
            BinaryStatus::Downloaded(_) => self.stats.increment_binaries_downloaded(),
            BinaryStatus::NoLink => self.stats.increment_binaries_missing(),
            BinaryStatus::Failed(_) | BinaryStatus::NotAttempted => {}
        }

        if let Err(e) = self.ledger.append(record.clone()).await {
            tracing::error!(url = %item.item_url, error = %e, "failed to record paper");
            return self.drop_item(&item, e.to_string());
        }

        self.stats.increment_items_recorded();
        tracing::debug!(year = %record.year, title = %record.title, "paper recorded");
        ItemOutcome::Recorded { record, binary }
    }

    fn drop_item(&self, item: &ItemRef, reason: String) -> ItemOutcome {
        self.stats.increment_items_dropped();
        ItemOutcome::Dropped {
            url: item.item_url.to_string(),
            reason,
        }
    }
}

/// Derives a file name from the last path segment of a paper URL
fn fallback_base_name(url: &Url) -> String {
    let stem = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .and_then(|segment| Path::new(segment).file_stem())
        .map(|stem| {
            let stem = sanitize_filename(&stem.to_string_lossy());
            truncate_filename(&stem, MAX_BASE_NAME_BYTES).to_string()
        })
        .unwrap_or_default();

    if stem.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        stem
    }
}
