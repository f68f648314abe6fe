//! Crawler module for discovery, fetching and processing
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with failure classification
//! - Bounded retry of transient failures
//! - HTML extraction of year, paper and PDF links
//! - Streaming PDF downloads
//! - The worker pool and the per-paper job
//! - Overall run coordination

mod coordinator;
mod download;
mod fetcher;
mod parser;
mod pool;
mod processor;
mod retry;

pub use coordinator::{harvest, Harvester};
pub use download::{binary_path, download_binary, DownloadError, DOWNLOAD_BUFFER_SIZE};
pub use fetcher::{build_http_client, fetch_page, fetch_response, FetchError};
pub use parser::{extract_item_links, extract_year_links, parse_item_page, ItemPage, SiteSelectors};
pub use pool::{PoolError, PoolStats, WorkerPool};
pub use processor::{
    BinaryStatus, ItemOutcome, ItemProcessor, ProcessError, ProcessedItem, RecordPolicy,
};
pub use retry::{RetryError, RetryPolicy, Transient};
