//! Output module for run statistics and the end-of-run report
//!
//! This module handles:
//! - Counting what happened to every year and paper during a run
//! - Turning those counters into a summary with timing information
//! - Printing the summary to stdout

pub mod stats;

pub use stats::{print_summary, HarvestStats, HarvestSummary};
