//! Harvest coordinator - discovery and dispatch
//!
//! This module drives a whole run:
//! - Fetching the root index and extracting the year indexes
//! - Preparing one output directory per year
//! - Fetching every year index and submitting one job per paper
//! - Draining the worker pool and closing the ledger

use crate::config::{validate, Config};
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::parser::{extract_item_links, extract_year_links, SiteSelectors};
use crate::crawler::pool::WorkerPool;
use crate::crawler::processor::{ItemProcessor, RecordPolicy};
use crate::crawler::retry::RetryPolicy;
use crate::ledger::Ledger;
use crate::model::{ItemRef, YearRef};
use crate::output::{HarvestStats, HarvestSummary};
use crate::HarvestError;
use chrono::Utc;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Main harvest coordinator structure
pub struct Harvester {
    config: Arc<Config>,
    client: Client,
    selectors: Arc<SiteSelectors>,
    retry: RetryPolicy,
    stats: Arc<HarvestStats>,
}

impl Harvester {
    /// Creates a new harvester from a configuration
    ///
    /// The configuration is validated again here so that programmatically
    /// built configurations get the same checks as loaded ones.
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        validate(&config)?;

        let selectors = SiteSelectors::from_config(&config.site)?;
        let client = build_http_client(&config.crawler)?;
        let retry = RetryPolicy::new(config.crawler.max_attempts);

        Ok(Self {
            config: Arc::new(config),
            client,
            selectors: Arc::new(selectors),
            retry,
            stats: Arc::new(HarvestStats::new()),
        })
    }

    /// Runs the harvest to completion
    ///
    /// Only a root index that cannot be fetched, or a ledger that cannot be
    /// opened or closed, fails the run. Year and paper failures are logged,
    /// counted and skipped.
    pub async fn run(&self) -> Result<HarvestSummary, HarvestError> {
        let started_at = Utc::now();
        let base_url = Url::parse(&self.config.site.base_url)?;

        tracing::info!("Fetching root index {}", base_url);
        let root_html = self
            .retry
            .run(base_url.as_str(), |_| fetch_page(&self.client, &base_url))
            .await
            .map_err(|source| HarvestError::RootIndex {
                url: base_url.to_string(),
                source,
            })?;

        let years = extract_year_links(&root_html, &base_url, &self.selectors);
        tracing::info!("Found {} year indexes", years.len());

        let ledger = Ledger::create(Path::new(&self.config.output.ledger_path)).await?;

        let processor = Arc::new(ItemProcessor::new(
            self.client.clone(),
            Arc::clone(&self.selectors),
            self.retry,
            self.output_root(),
            ledger.handle(),
            Arc::clone(&self.stats),
            RecordPolicy {
                failed_downloads: self.config.output.record_failed_downloads,
                exhausted_items: self.config.output.record_exhausted_items,
            },
        ));

        let mut pool = WorkerPool::new(
            self.config.crawler.workers,
            self.config.crawler.queue_capacity,
            move |item: ItemRef| {
                let processor = Arc::clone(&processor);
                async move {
                    processor.run_job(item).await;
                }
            },
        );

        for year in years {
            self.stats.increment_years_discovered();

            if !self.wants_year(&year.year) {
                tracing::debug!("Skipping year {} (not selected)", year.year);
                continue;
            }

            self.dispatch_year(&year, &mut pool).await?;
        }

        tracing::info!(
            "All {} papers submitted, waiting for workers",
            pool.submitted()
        );
        let pool_stats = pool.drain().await;

        // The pool held the last ledger handles, so closing cannot hang now
        let ledger_rows = ledger.close().await?;

        let summary = self.stats.summarize(
            started_at,
            Utc::now(),
            ledger_rows,
            pool_stats.panicked,
        );
        tracing::info!(
            "Harvest completed: {} papers recorded, {} dropped, {} PDFs downloaded in {}s",
            summary.items_recorded,
            summary.items_dropped,
            summary.binaries_downloaded,
            summary.duration_seconds()
        );

        Ok(summary)
    }

    /// Prepares one year and submits its papers
    ///
    /// Failing to create the year directory or fetch the year index skips the
    /// year. Only a closed pool is returned as an error.
    async fn dispatch_year(
        &self,
        year: &YearRef,
        pool: &mut WorkerPool<ItemRef>,
    ) -> Result<(), HarvestError> {
        let year_dir = self.output_root().join(&year.year);
        if let Err(e) = tokio::fs::create_dir_all(&year_dir).await {
            tracing::error!(
                year = %year.year,
                error = %e,
                "Failed to create {}, skipping year",
                year_dir.display()
            );
            self.stats.increment_years_skipped();
            return Ok(());
        }

        let html = match self
            .retry
            .run(year.index_url.as_str(), |_| {
                fetch_page(&self.client, &year.index_url)
            })
            .await
        {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(
                    year = %year.year,
                    error = %e,
                    "Failed to process year index {}, skipping year",
                    year.index_url
                );
                self.stats.increment_years_skipped();
                return Ok(());
            }
        };

        let items = extract_item_links(&html, year, &self.selectors);
        tracing::info!("Year {}: {} papers found", year.year, items.len());

        for item in items {
            pool.submit(item).await?;
            self.stats.increment_items_submitted();
        }

        Ok(())
    }

    /// Returns true if the configured year filter lets `year` through
    fn wants_year(&self, year: &str) -> bool {
        self.config.site.years.is_empty() || self.config.site.years.iter().any(|y| y == year)
    }

    fn output_root(&self) -> PathBuf {
        PathBuf::from(&self.config.output.root_dir)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Runs a complete harvest with the given configuration
///
/// # Example
///
/// ```no_run
/// use paper_harvest::config::load_config;
/// use paper_harvest::crawler::harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = harvest(config).await?;
/// println!("{} papers recorded", summary.items_recorded);
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: Config) -> Result<HarvestSummary, HarvestError> {
    Harvester::new(config)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config(years: Vec<String>) -> Config {
        let mut config = Config::default();
        config.site.years = years;
        config
    }

    #[test]
    fn test_harvester_creation() {
        let harvester = Harvester::new(Config::default()).unwrap();
        assert_eq!(harvester.config().crawler.workers, 50);
    }

    #[test]
    fn test_harvester_rejects_invalid_config() {
        let mut config = Config::default();
        config.crawler.max_attempts = 0;
        assert!(matches!(
            Harvester::new(config),
            Err(HarvestError::Config(_))
        ));
    }

    #[test]
    fn test_year_filter() {
        let all = Harvester::new(create_test_config(vec![])).unwrap();
        assert!(all.wants_year("1987"));

        let some = Harvester::new(create_test_config(vec!["2022".to_string()])).unwrap();
        assert!(some.wants_year("2022"));
        assert!(!some.wants_year("2021"));
    }
}
