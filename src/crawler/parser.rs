//! HTML extraction for the three page kinds of the site
//!
//! - Root index: year index links
//! - Year index: paper page links
//! - Paper page: title, authors and the optional PDF link
//!
//! Selectors come from the `[site]` configuration and are compiled once.

use crate::config::SiteConfig;
use crate::model::{ItemRef, YearRef};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Compiled selectors for every link and field the harvester looks for
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    year_link: Selector,
    item_link: Selector,
    binary_link: Selector,
    author: Selector,
    title: Selector,
}

impl SiteSelectors {
    /// Compiles the selectors of a site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            year_link: compile(&config.year_link_selector)?,
            item_link: compile(&config.item_link_selector)?,
            binary_link: compile(&config.binary_link_selector)?,
            author: compile(&config.author_selector)?,
            title: compile(&config.title_selector)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Fields extracted from a paper page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPage {
    /// Title text with whitespace collapsed; empty if the page has none
    pub title: String,

    /// Every author word joined with ", "
    pub authors: String,

    /// Absolute URL of the PDF, when the page links one
    pub binary_url: Option<Url>,
}

/// Extracts the year index links from the root index page
///
/// Links without year digits are skipped and repeated links are collapsed,
/// keeping the order of first appearance.
pub fn extract_year_links(html: &str, base_url: &Url, selectors: &SiteSelectors) -> Vec<YearRef> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&selectors.year_link)
        .filter_map(|element| element_link(element, base_url))
        .filter(|url| seen.insert(url.clone()))
        .filter_map(|url| {
            let year = YearRef::from_url(url.clone());
            if year.is_none() {
                tracing::debug!("Skipping year link without digits: {}", url);
            }
            year
        })
        .collect()
}

/// Extracts the paper page links from one year index page
pub fn extract_item_links(html: &str, year: &YearRef, selectors: &SiteSelectors) -> Vec<ItemRef> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&selectors.item_link)
        .filter_map(|element| element_link(element, &year.index_url))
        .filter(|url| seen.insert(url.clone()))
        .map(|item_url| ItemRef {
            item_url,
            year: year.year.clone(),
        })
        .collect()
}

/// Extracts title, authors and PDF link from a paper page
///
/// # Example
///
/// ```
/// use paper_harvest::config::SiteConfig;
/// use paper_harvest::crawler::{parse_item_page, SiteSelectors};
/// use url::Url;
///
/// let html = r#"<html><head><title>Deep Nets</title></head>
///     <body><i class="author">Ada Lovelace</i>
///     <a href="/file/abc-Paper-Conference.pdf">Paper</a></body></html>"#;
/// let selectors = SiteSelectors::from_config(&SiteConfig::default()).unwrap();
/// let page_url = Url::parse("https://papers.nips.cc/paper/abc-Abstract-Conference.html").unwrap();
/// let page = parse_item_page(html, &page_url, &selectors);
///
/// assert_eq!(page.title, "Deep Nets");
/// assert_eq!(page.authors, "Ada, Lovelace");
/// assert_eq!(
///     page.binary_url.unwrap().as_str(),
///     "https://papers.nips.cc/file/abc-Paper-Conference.pdf"
/// );
/// ```
pub fn parse_item_page(html: &str, page_url: &Url, selectors: &SiteSelectors) -> ItemPage {
    let document = Html::parse_document(html);

    let title = document
        .select(&selectors.title)
        .next()
        .map(|element| collapse_whitespace(element, " "))
        .unwrap_or_default();

    let authors = document
        .select(&selectors.author)
        .map(|element| collapse_whitespace(element, ", "))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let binary_url = document
        .select(&selectors.binary_link)
        .find_map(|element| element_link(element, page_url));

    ItemPage {
        title,
        authors,
        binary_url,
    }
}

/// Joins the whitespace-separated words of an element's text
fn collapse_whitespace(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Resolves an element's `href` against the page it was found on
fn element_link(element: ElementRef<'_>, base_url: &Url) -> Option<Url> {
    resolve_link(element.value().attr("href")?, base_url)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}
