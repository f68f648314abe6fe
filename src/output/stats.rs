//! Run statistics
//!
//! `HarvestStats` is shared by the dispatcher and every worker and only
//! holds atomic counters. `HarvestSummary` is the plain snapshot taken once
//! the run is over.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated while a run is in progress
#[derive(Debug, Default)]
pub struct HarvestStats {
    years_discovered: AtomicU64,
    years_skipped: AtomicU64,
    items_submitted: AtomicU64,
    items_recorded: AtomicU64,
    items_dropped: AtomicU64,
    binaries_downloaded: AtomicU64,
    binaries_missing: AtomicU64,
    binaries_failed: AtomicU64,
}

macro_rules! counter {
    ($incr:ident, $get:ident, $field:ident) => {
        pub fn $incr(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        pub fn $get(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl HarvestStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(increment_years_discovered, years_discovered, years_discovered);
    counter!(increment_years_skipped, years_skipped, years_skipped);
    counter!(increment_items_submitted, items_submitted, items_submitted);
    counter!(increment_items_recorded, items_recorded, items_recorded);
    counter!(increment_items_dropped, items_dropped, items_dropped);
    counter!(increment_binaries_downloaded, binaries_downloaded, binaries_downloaded);
    counter!(increment_binaries_missing, binaries_missing, binaries_missing);
    counter!(increment_binaries_failed, binaries_failed, binaries_failed);

    /// Takes a snapshot of the counters
    pub fn summarize(
        &self,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        ledger_rows: u64,
        jobs_panicked: u64,
    ) -> HarvestSummary {
        HarvestSummary {
            started_at,
            finished_at,
            years_discovered: self.years_discovered(),
            years_skipped: self.years_skipped(),
            items_submitted: self.items_submitted(),
            items_recorded: self.items_recorded(),
            items_dropped: self.items_dropped(),
            binaries_downloaded: self.binaries_downloaded(),
            binaries_missing: self.binaries_missing(),
            binaries_failed: self.binaries_failed(),
            ledger_rows,
            jobs_panicked,
        }
    }
}

/// Final report of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    // Discovery
    pub years_discovered: u64,
    pub years_skipped: u64,
    pub items_submitted: u64,

    // Paper outcomes
    pub items_recorded: u64,
    pub items_dropped: u64,

    // PDF outcomes
    pub binaries_downloaded: u64,
    pub binaries_missing: u64,
    pub binaries_failed: u64,

    pub ledger_rows: u64,
    pub jobs_panicked: u64,
}

impl HarvestSummary {
    /// Wall-clock duration of the run in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Percentage of submitted papers that produced a ledger row
    pub fn success_rate(&self) -> f64 {
        if self.items_submitted == 0 {
            0.0
        } else {
            (self.items_recorded as f64 / self.items_submitted as f64) * 100.0
        }
    }
}

/// Prints a run summary to stdout in a formatted manner
pub fn print_summary(summary: &HarvestSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Run:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {}s", summary.duration_seconds());
    println!();

    println!("Discovery:");
    println!("  Years found: {}", summary.years_discovered);
    println!("  Years skipped: {}", summary.years_skipped);
    println!("  Papers submitted: {}", summary.items_submitted);
    println!();

    println!("Papers:");
    println!("  Recorded: {}", summary.items_recorded);
    println!("  Dropped: {}", summary.items_dropped);
    if summary.jobs_panicked > 0 {
        println!("  Crashed jobs: {}", summary.jobs_panicked);
    }
    println!();

    println!("PDFs:");
    println!("  Downloaded: {}", summary.binaries_downloaded);
    println!("  No PDF link: {}", summary.binaries_missing);
    println!("  Failed: {}", summary.binaries_failed);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} papers recorded, {} ledger rows)",
        summary.success_rate(),
        summary.items_recorded,
        summary.items_submitted,
        summary.ledger_rows
    );
}
