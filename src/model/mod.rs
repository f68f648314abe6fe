//! Data model for the harvest pipeline
//!
//! - `YearRef`: one year index discovered on the root page
//! - `ItemRef`: one paper page discovered on a year index
//! - `PaperRecord`: the metadata handed to the ledger for one paper

mod sanitize;

pub use sanitize::{
    extract_year, sanitize_filename, truncate_filename, FORBIDDEN_FILENAME_CHARS,
    MAX_BASE_NAME_BYTES,
};

use url::Url;

/// A year index page discovered on the root index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearRef {
    /// Digits taken from the last path segment of the index URL
    pub year: String,

    /// Absolute URL of the year index page
    pub index_url: Url,
}

impl YearRef {
    /// Builds a `YearRef` from an absolute index URL
    ///
    /// Returns `None` when the URL carries no year digits.
    pub fn from_url(index_url: Url) -> Option<Self> {
        let year = extract_year(&index_url)?;
        Some(Self { year, index_url })
    }
}

/// A paper page discovered on a year index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    /// Absolute URL of the paper page
    pub item_url: Url,

    /// Year the paper was listed under
    pub year: String,
}

/// Metadata for one processed paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRecord {
    pub year: String,

    /// Sanitized page title (safe to use as a file name)
    pub title: String,

    /// Author names joined with ", "
    pub authors: String,

    /// URL of the paper page
    pub item_url: String,
}

impl PaperRecord {
    /// Record written for an item whose page could never be fetched
    pub fn placeholder(item: &ItemRef) -> Self {
        Self {
            year: item.year.clone(),
            title: String::new(),
            authors: String::new(),
            item_url: item.item_url.to_string(),
        }
    }
}
