//! Integration tests for the stage-1 crawler
//!
//! These tests use wiremock to serve a category index and paginated listings
//! and check the URL list the crawl leaves behind.

use harvest::config::Config;
use harvest::crawler::run_crawl;
use std::collections::HashSet;
use std::path::Path;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a crawl configuration pointing at the mock server
fn create_test_config(base_url: &str, url_list: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.workers = 4;
    config.crawler.politeness_delay_ms = 10;
    config.crawler.request_timeout_secs = 5;
    config.crawler.max_scroll_attempts = 6;
    config.seed.categories_url = format!("{}/tags", base_url);
    config.writer.url_list_path = url_list.to_path_buf();
    config.writer.batch_size = 2;
    config.writer.flush_interval_ms = 50;
    config
}

fn listing(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .enumerate()
        .map(|(i, href)| format!(r#"<a aria-labelledby="article-{}" href="{}">Post</a>"#, i, href))
        .collect();
    format!(
        r#"<html><body><a href="/about">About</a>{}</body></html>"#,
        anchors
    )
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("URL list was not written")
        .lines()
        .map(String::from)
        .collect()
}

async fn mount_tags(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r##"<html><body>
                <a href="/t/rust">#rust</a>
                <a href="/t/go#top">#go</a>
                <a href="/about">About</a>
            </body></html>"##,
        ))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_writes_discovered_urls() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_tags(&mock_server).await;

    // Page 2 of the rust listing adds one article; later pages add nothing
    Mock::given(method("GET"))
        .and(path("/t/rust"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing(&["/ana/third-3"])),
        )
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/t/rust"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[
            "/ana/first-1",
            "/bo/second-2#comments",
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/t/go"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(&[format!("{}/cy/gophers-4", base_url).as_str()])),
        )
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let url_list = dir.path().join("urls.txt");
    let config = create_test_config(&base_url, &url_list);

    let stats = run_crawl(config).await.expect("Crawl failed");

    let lines = read_lines(&url_list);
    let found: HashSet<&str> = lines.iter().map(String::as_str).collect();
    let expected: HashSet<String> = [
        "/ana/first-1",
        "/bo/second-2",
        "/ana/third-3",
        "/cy/gophers-4",
    ]
    .iter()
    .map(|p| format!("{}{}", base_url, p))
    .collect();

    let expected: HashSet<&str> = expected.iter().map(String::as_str).collect();
    assert_eq!(found, expected);
    assert_eq!(lines.len(), 4, "each listing link is written once");
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.links, 4);
}

#[tokio::test]
async fn test_failed_listing_does_not_stop_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_tags(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/t/rust"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/t/go"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["/cy/only-1"])))
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let url_list = dir.path().join("urls.txt");
    let stats = run_crawl(create_test_config(&base_url, &url_list))
        .await
        .expect("Crawl failed");

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pages, 1);
    assert_eq!(read_lines(&url_list), vec![format!("{}/cy/only-1", base_url)]);
}

#[tokio::test]
async fn test_crawl_appends_to_existing_list() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/t/solo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["/new/post-1"])))
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let url_list = dir.path().join("urls.txt");
    std::fs::write(&url_list, "https://dev.to/old/post\n").unwrap();

    let mut config = create_test_config(&base_url, &url_list);
    config.seed.categories_url = String::new();
    config.seed.urls = vec![format!("{}/t/solo", base_url)];

    run_crawl(config).await.expect("Crawl failed");

    assert_eq!(
        read_lines(&url_list),
        vec![
            "https://dev.to/old/post".to_string(),
            format!("{}/new/post-1", base_url)
        ]
    );
}

#[tokio::test]
async fn test_unreachable_index_is_fatal_without_seeds() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let url_list = dir.path().join("urls.txt");
    let result = run_crawl(create_test_config(&base_url, &url_list)).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_unwritable_url_list_is_fatal() {
    let mock_server = MockServer::start().await;
    let dir = tempdir().unwrap();

    // A directory cannot be opened for appending
    let result = run_crawl(create_test_config(&mock_server.uri(), dir.path())).await;

    assert!(result.is_err());
    assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_listing_pages_are_spaced_by_politeness_delay() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/t/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["/ana/post-1"])))
        .expect(4)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let url_list = dir.path().join("urls.txt");
    let mut config = create_test_config(&base_url, &url_list);
    config.crawler.workers = 1;
    config.crawler.politeness_delay_ms = 150;
    config.crawler.max_scroll_attempts = 3;
    config.crawler.stable_scroll_rounds = 3;
    config.seed.categories_url = String::new();
    config.seed.urls = vec![format!("{}/t/slow", base_url)];

    let start = std::time::Instant::now();
    run_crawl(config).await.expect("Crawl failed");

    // One listing request plus three further pages, each after the delay
    assert!(start.elapsed() >= std::time::Duration::from_millis(3 * 150 * 8 / 10));
    assert_eq!(read_lines(&url_list), vec![format!("{}/ana/post-1", base_url)]);
}
