use serde::Deserialize;

/// Main configuration structure for Paper-Harvest
///
/// Every section is optional; a missing section or key takes the default
/// documented on its field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Site topology: where to start and how to recognise each kind of link
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root index listing every year (default `https://papers.nips.cc`)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Selector for year index links on the root page
    #[serde(rename = "year-link-selector")]
    pub year_link_selector: String,

    /// Selector for paper page links on a year index
    #[serde(rename = "item-link-selector")]
    pub item_link_selector: String,

    /// Selector for the PDF link on a paper page
    #[serde(rename = "binary-link-selector")]
    pub binary_link_selector: String,

    /// Selector for author elements on a paper page
    #[serde(rename = "author-selector")]
    pub author_selector: String,

    /// Selector for the paper title on a paper page
    #[serde(rename = "title-selector")]
    pub title_selector: String,

    /// Years to harvest; empty means every year found on the root page
    pub years: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://papers.nips.cc".to_string(),
            year_link_selector: "a[href^='/paper_files/paper/']".to_string(),
            item_link_selector: "ul.paper-list li a[href$='Abstract-Conference.html']"
                .to_string(),
            binary_link_selector: "a[href$='Paper-Conference.pdf']".to_string(),
            author_selector: ".author".to_string(),
            title_selector: "title".to_string(),
            years: Vec::new(),
        }
    }
}

/// Worker pool, retry and HTTP transport settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers (default 50)
    pub workers: usize,

    /// Jobs that may wait in the queue before submission blocks (default 256)
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,

    /// Attempts per fetch, including the first one (default 3)
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Whole-request timeout in milliseconds (default 60000)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Connect timeout in milliseconds (default 10000)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            queue_capacity: 256,
            max_attempts: 3,
            request_timeout_ms: 60_000,
            connect_timeout_ms: 10_000,
            user_agent: format!("paper-harvest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Output locations and ledger policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one subdirectory per year (default `scraped_data`)
    #[serde(rename = "root-dir")]
    pub root_dir: String,

    /// Path of the CSV ledger (default `output.csv`)
    #[serde(rename = "ledger-path")]
    pub ledger_path: String,

    /// Write a ledger row when the PDF download fails (default true)
    #[serde(rename = "record-failed-downloads")]
    pub record_failed_downloads: bool,

    /// Write a placeholder row when the paper page cannot be fetched (default false)
    #[serde(rename = "record-exhausted-items")]
    pub record_exhausted_items: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root_dir: "scraped_data".to_string(),
            ledger_path: "output.csv".to_string(),
            record_failed_downloads: true,
            record_exhausted_items: false,
        }
    }
}
