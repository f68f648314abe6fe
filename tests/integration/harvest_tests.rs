//! End-to-end harvest runs against a mock proceedings site

use paper_harvest::config::Config;
use paper_harvest::crawler::Harvester;
use paper_harvest::{harvest, HarvestError};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.crawler.workers = 4;
    config.crawler.queue_capacity = 4;
    config.crawler.request_timeout_ms = 5_000;
    config.crawler.connect_timeout_ms = 1_000;
    config.output.root_dir = temp.path().join("papers").to_string_lossy().into_owned();
    config.output.ledger_path = temp.path().join("output.csv").to_string_lossy().into_owned();
    config
}

fn root_html(years: &[&str]) -> String {
    let links: String = years
        .iter()
        .map(|y| format!(r#"<li><a href="/paper_files/paper/{y}">NeurIPS {y}</a></li>"#))
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", links)
}

fn year_html(year: &str, hashes: &[&str]) -> String {
    let links: String = hashes
        .iter()
        .map(|h| {
            format!(
                r#"<li><a href="/paper_files/paper/{year}/hash/{h}-Abstract-Conference.html">{h}</a></li>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><ul class="paper-list">{}</ul></body></html>"#,
        links
    )
}

fn paper_html(year: &str, hash: &str, title: &str, with_pdf: bool) -> String {
    let pdf = if with_pdf {
        format!(r#"<a href="/paper_files/paper/{year}/file/{hash}-Paper-Conference.pdf">Paper</a>"#)
    } else {
        String::new()
    };
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <p class="author">Barbara Liskov</p><p class="author">Edsger Dijkstra</p>
        {pdf}</body></html>"#
    )
}

async fn mount_html(server: &MockServer, page: String, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_pdf(server: &MockServer, year: &str, hash: &str) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/paper_files/paper/{year}/file/{hash}-Paper-Conference.pdf"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.5 test".to_vec()))
        .mount(server)
        .await;
}

fn item_path(year: &str, hash: &str) -> String {
    format!("/paper_files/paper/{year}/hash/{hash}-Abstract-Conference.html")
}

fn ledger_rows(path: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(path).expect("Failed to read ledger");
    let mut lines = content.lines().map(str::to_string);
    assert_eq!(lines.next().as_deref(), Some("Year,Title,Authors,Paper Link"));
    lines.collect()
}

fn pdf_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().map_or(false, |ext| ext == "pdf"))
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn test_year_with_two_papers_one_pdf() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    mount_html(&server, "/".to_string(), root_html(&["2023"])).await;
    mount_html(
        &server,
        "/paper_files/paper/2023".to_string(),
        year_html("2023", &["aaa", "bbb"]),
    )
    .await;
    mount_html(
        &server,
        item_path("2023", "aaa"),
        paper_html("2023", "aaa", "Paper With PDF", true),
    )
    .await;
    mount_html(
        &server,
        item_path("2023", "bbb"),
        paper_html("2023", "bbb", "Paper Without PDF", false),
    )
    .await;
    mount_pdf(&server, "2023", "aaa").await;

    let config = create_test_config(&server.uri(), &temp);
    let summary = harvest(config).await.expect("Harvest failed");

    let year_dir = temp.path().join("papers").join("2023");
    assert_eq!(pdf_count(&year_dir), 1);
    assert_eq!(
        std::fs::read(year_dir.join("Paper With PDF.pdf")).unwrap(),
        b"%PDF-1.5 test"
    );

    let rows = ledger_rows(&temp.path().join("output.csv"));
    assert_eq!(rows.len(), 2);
    let with_pdf = format!(
        "2023,Paper With PDF,\"Barbara, Liskov, Edsger, Dijkstra\",{}{}",
        server.uri(),
        item_path("2023", "aaa")
    );
    assert!(rows.contains(&with_pdf), "missing row {:?} in {:?}", with_pdf, rows);

    assert_eq!(summary.years_discovered, 1);
    assert_eq!(summary.items_submitted, 2);
    assert_eq!(summary.items_recorded, 2);
    assert_eq!(summary.binaries_downloaded, 1);
    assert_eq!(summary.binaries_missing, 1);
    assert_eq!(summary.ledger_rows, 2);
}

#[tokio::test]
async fn test_always_failing_paper_under_both_policies() {
    for (record_exhausted, expected_rows) in [(false, 0usize), (true, 1usize)] {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        mount_html(&server, "/".to_string(), root_html(&["2022"])).await;
        mount_html(
            &server,
            "/paper_files/paper/2022".to_string(),
            year_html("2022", &["dead"]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(item_path("2022", "dead")))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let mut config = create_test_config(&server.uri(), &temp);
        config.output.record_exhausted_items = record_exhausted;

        let summary = harvest(config).await.expect("Harvest failed");

        let rows = ledger_rows(&temp.path().join("output.csv"));
        assert_eq!(rows.len(), expected_rows);
        assert_eq!(summary.ledger_rows, expected_rows as u64);
        assert_eq!(pdf_count(&temp.path().join("papers").join("2022")), 0);

        if record_exhausted {
            assert_eq!(
                rows[0],
                format!("2022,,,{}{}", server.uri(), item_path("2022", "dead"))
            );
        } else {
            assert_eq!(summary.items_dropped, 1);
        }

        server.verify().await;
    }
}

#[tokio::test]
async fn test_root_index_failure_is_fatal() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), &temp);
    let result = Harvester::new(config).unwrap().run().await;

    assert!(matches!(result, Err(HarvestError::RootIndex { .. })));
    assert!(!temp.path().join("output.csv").exists());
    server.verify().await;
}

#[tokio::test]
async fn test_failing_year_is_skipped() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    mount_html(&server, "/".to_string(), root_html(&["2021", "2020"])).await;
    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2021"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/paper_files/paper/2020".to_string(),
        year_html("2020", &["ccc"]),
    )
    .await;
    mount_html(
        &server,
        item_path("2020", "ccc"),
        paper_html("2020", "ccc", "Survivor", true),
    )
    .await;
    mount_pdf(&server, "2020", "ccc").await;

    let config = create_test_config(&server.uri(), &temp);
    let summary = harvest(config).await.expect("Harvest failed");

    assert_eq!(summary.years_discovered, 2);
    assert_eq!(summary.years_skipped, 1);
    assert_eq!(summary.items_recorded, 1);
    assert!(temp.path().join("papers").join("2020").join("Survivor.pdf").exists());
    assert_eq!(ledger_rows(&temp.path().join("output.csv")).len(), 1);
}

#[tokio::test]
async fn test_year_filter_limits_harvest() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    mount_html(&server, "/".to_string(), root_html(&["2019", "2018"])).await;
    mount_html(
        &server,
        "/paper_files/paper/2019".to_string(),
        year_html("2019", &["ddd"]),
    )
    .await;
    mount_html(
        &server,
        item_path("2019", "ddd"),
        paper_html("2019", "ddd", "Selected", false),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2018"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), &temp);
    config.site.years = vec!["2019".to_string()];
    let summary = harvest(config).await.expect("Harvest failed");

    assert_eq!(summary.items_recorded, 1);
    assert!(!temp.path().join("papers").join("2018").exists());
    server.verify().await;
}

#[tokio::test]
async fn test_many_papers_produce_one_row_each() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    let hashes: Vec<String> = (0..40).map(|i| format!("p{:02}", i)).collect();
    let hash_refs: Vec<&str> = hashes.iter().map(String::as_str).collect();

    mount_html(&server, "/".to_string(), root_html(&["2024"])).await;
    mount_html(
        &server,
        "/paper_files/paper/2024".to_string(),
        year_html("2024", &hash_refs),
    )
    .await;
    for hash in &hashes {
        mount_html(
            &server,
            item_path("2024", hash),
            paper_html("2024", hash, &format!("Title {}", hash), true),
        )
        .await;
        mount_pdf(&server, "2024", hash).await;
    }

    let mut config = create_test_config(&server.uri(), &temp);
    config.crawler.workers = 8;
    config.crawler.queue_capacity = 2;
    let summary = harvest(config).await.expect("Harvest failed");

    let rows = ledger_rows(&temp.path().join("output.csv"));
    assert_eq!(rows.len(), 40);
    for hash in &hashes {
        let expected = format!(
            "2024,Title {},\"Barbara, Liskov, Edsger, Dijkstra\",{}{}",
            hash,
            server.uri(),
            item_path("2024", hash)
        );
        assert_eq!(
            rows.iter().filter(|row| **row == expected).count(),
            1,
            "expected exactly one row for {}",
            hash
        );
    }

    assert_eq!(pdf_count(&temp.path().join("papers").join("2024")), 40);
    assert_eq!(summary.items_submitted, 40);
    assert_eq!(summary.jobs_panicked, 0);
}
