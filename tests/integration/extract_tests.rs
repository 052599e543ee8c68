//! Integration tests for the stage-2 fetch pipeline
//!
//! Articles are served by wiremock; slow responses stand in for timeouts.

use harvest::config::FetchConfig;
use harvest::fetch::{read_url_list, run_pipeline};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn article(title: &str, body: &str) -> String {
    format!(
        r#"<html><body>
        <div class="crayons-article__header__meta">
            <a class="crayons-link" href="/ana">Ana</a>
            <time datetime="2024-02-01T09:00:00Z">Feb 1</time>
            <h1>{}</h1>
            <a class="crayons-tag" href="/t/rust">#rust</a>
            <a class="crayons-tag" href="/t/testing">#testing</a>
        </div>
        <div class="crayons-article__main"><p>{}</p></div>
        </body></html>"#,
        title, body
    )
}

/// Creates a fetch configuration writing into `dir`
fn create_test_config(dir: &Path) -> FetchConfig {
    FetchConfig {
        workers: 3,
        timeout_secs: 1,
        retries: 3,
        rate_interval_ms: 5,
        backoff_base_ms: 10,
        file_writers: 2,
        content_dir: dir.join("posts"),
        ..FetchConfig::default()
    }
}

/// Parses the results table into header and rows (no quoted fields expected)
fn read_table(path: &Path) -> (String, Vec<Vec<String>>) {
    let content = std::fs::read_to_string(path).expect("results table missing");
    let mut lines = content.lines();
    let header = lines.next().unwrap_or_default().to_string();
    let rows = lines
        .map(|line| line.split(',').map(String::from).collect())
        .collect();
    (header, rows)
}

#[tokio::test]
async fn test_pipeline_writes_rows_and_files() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/ana/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article("Hello", "First body")))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Same slug on another path, so the second file needs a suffix
    Mock::given(method("GET"))
        .and(path("/bo/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article("Hello again", "Second body")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone/post"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let input = dir.path().join("urls.txt");
    std::fs::write(
        &input,
        format!(
            "{0}/ana/hello\n\n{0}/bo/hello\n{0}/gone/post\n",
            base_url
        ),
    )
    .unwrap();
    let output = dir.path().join("out.csv");
    let config = create_test_config(dir.path());

    let urls = read_url_list(&input).await.unwrap();
    let stats = run_pipeline(&config, urls, &output).await.expect("pipeline failed");

    assert_eq!(stats.total, 3);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.rows, 2);
    assert_eq!(stats.files.written, 2);

    let (header, rows) = read_table(&output);
    assert_eq!(header, "url,title,author,published_at,content_path,tags");
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.len(), 6);
        assert!(row[0].starts_with(&base_url));
        assert_eq!(row[2], "Ana");
        assert_eq!(row[3], "2024-02-01T09:00:00Z");
        assert_eq!(row[5], "#rust/#testing");
    }

    // Both articles survive under distinct names
    let posts = config.content_dir;
    let first = std::fs::read_to_string(posts.join("hello.txt")).unwrap();
    let second = std::fs::read_to_string(posts.join("hello_1.txt")).unwrap();
    let mut bodies = vec![first, second];
    bodies.sort();
    assert_eq!(bodies, vec!["First body\n", "Second body\n"]);

    let mut paths: Vec<&str> = rows.iter().map(|r| r[4].as_str()).collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            posts.join("hello.txt").to_str().unwrap(),
            posts.join("hello_1.txt").to_str().unwrap(),
        ]
    );
}

#[tokio::test]
async fn test_timeouts_are_retried_until_success() {
    let mock_server = MockServer::start().await;

    // The first two requests outlast the 1s client timeout
    Mock::given(method("GET"))
        .and(path("/flaky/post"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(article("Late", "too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky/post"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article("Finally", "Made it")))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let config = create_test_config(dir.path());

    let stats = run_pipeline(
        &config,
        vec![format!("{}/flaky/post", mock_server.uri())],
        &output,
    )
    .await
    .expect("pipeline failed");

    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);

    let (_, rows) = read_table(&output);
    assert_eq!(rows.len(), 1, "the URL is recorded exactly once");
    assert_eq!(rows[0][1], "Finally");
    assert_eq!(
        std::fs::read_to_string(config.content_dir.join("post.txt")).unwrap(),
        "Made it\n"
    );
}

#[tokio::test]
async fn test_exhausted_retries_skip_only_that_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/stuck/post"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fine/post"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article("Fine", "All good")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let mut config = create_test_config(dir.path());
    // One worker, so the good URL is only reached after the stuck one gives up
    config.workers = 1;

    let stats = run_pipeline(
        &config,
        vec![
            format!("{}/stuck/post", base_url),
            format!("{}/fine/post", base_url),
        ],
        &output,
    )
    .await
    .expect("pipeline failed");

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.succeeded, 1);

    let (_, rows) = read_table(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], format!("{}/fine/post", base_url));
    assert!(!rows.iter().any(|r| r[0].contains("/stuck/")));
}

#[tokio::test]
async fn test_server_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let stats = run_pipeline(
        &create_test_config(dir.path()),
        vec![format!("{}/broken/post", mock_server.uri())],
        &output,
    )
    .await
    .expect("pipeline failed");

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.rows, 0);
}
