//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made by the harvester:
//! - Building the shared HTTP client from the crawler configuration
//! - GET requests for index and paper pages
//! - Classifying failures as transient (worth retrying) or permanent

use crate::config::CrawlerConfig;
use crate::crawler::retry::Transient;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while fetching a URL
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or its body could not be read
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
}

impl FetchError {
    fn request(url: &Url, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            source,
        }
    }
}

impl Transient for FetchError {
    /// | Condition | Transient |
    /// |-----------|-----------|
    /// | Timeout, connect, body read | yes |
    /// | HTTP 408, 429, 5xx | yes |
    /// | Other HTTP status | no |
    /// | Invalid request / redirect loop | no |
    fn is_transient(&self) -> bool {
        match self {
            Self::Request { source, .. } => !(source.is_builder() || source.is_redirect()),
            Self::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The client is cheap to clone and shares one connection pool, so a single
/// instance serves the dispatcher and every worker.
///
/// # Example
///
/// ```no_run
/// use paper_harvest::config::CrawlerConfig;
/// use paper_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends a GET request and rejects non-success responses
///
/// The returned response has not been read yet, so callers may stream it.
pub async fn fetch_response(client: &Client, url: &Url) -> Result<Response, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| FetchError::request(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(response)
}

/// Fetches a page and returns its body as text
pub async fn fetch_page(client: &Client, url: &Url) -> Result<String, FetchError> {
    let response = fetch_response(client, url).await?;
    response.text().await.map_err(|e| FetchError::request(url, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn status_error(code: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.com/".to_string(),
            status: StatusCode::from_u16(code).unwrap(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&CrawlerConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_status_classification() {
        assert!(status_error(500).is_transient());
        assert!(status_error(503).is_transient());
        assert!(status_error(429).is_transient());
        assert!(status_error(408).is_transient());
        assert!(!status_error(404).is_transient());
        assert!(!status_error(403).is_transient());
        assert!(!status_error(400).is_transient());
    }

    #[tokio::test]
    async fn test_fetch_page_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let client = build_http_client(&CrawlerConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/index", server.uri())).unwrap();
        let body = fetch_page(&client, &url).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_page_not_found_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = build_http_client(&CrawlerConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetch_page(&client, &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::NOT_FOUND));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        // Bind then drop a listener so the port is very likely closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = build_http_client(&CrawlerConfig::default()).unwrap();
        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
        let err = fetch_page(&client, &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
        assert!(err.is_transient());
    }
}
