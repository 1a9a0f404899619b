//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the real
//! reqwest fetcher through the full crawl cycle end-to-end.

use sitemap_ripple::config::{Config, OutputFormat};
use sitemap_ripple::crawler::Controller;
use sitemap_ripple::output::write_output;
use sitemap_ripple::state::{CrawlPhase, FetchErrorKind, PageStatus, StopReason};
use sitemap_ripple::SitemapError;
use std::collections::BTreeSet;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a recursive test configuration crawling the given seeds
fn create_test_config(seeds: Vec<String>) -> Config {
    let mut config = Config::default();
    config.seeds = seeds;
    config.crawler.recursive = true;
    config.crawler.concurrency = 4;
    config.crawler.request_timeout_ms = 2_000;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

fn html(links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Test</title></head><body>{}</body></html>", anchors),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, page: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(links))
        .expect(1)
        .mount(server)
        .await;
}

fn urls(keys: BTreeSet<&str>) -> Vec<String> {
    keys.into_iter().map(str::to_string).collect()
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &["/page1", "/page2", "https://other.example.org/external"],
    )
    .await;
    mount_page(&server, "/page1", &["/", "/page2", "/page1#top"]).await;
    mount_page(&server, "/page2", &["/page3"]).await;
    mount_page(&server, "/page3", &[]).await;

    let mut controller = Controller::new(create_test_config(vec![format!("{}/", base)])).unwrap();
    let result = controller.run().await.unwrap();

    assert_eq!(result.phase(), CrawlPhase::Completed);
    assert_eq!(
        urls(result.urls()),
        vec![
            format!("{}/", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
            format!("{}/page3", base),
        ]
    );

    let root = result.page(&format!("{}/", base)).unwrap();
    assert_eq!(root.status(), PageStatus::Ok);
    assert_eq!(root.http_status(), Some(200));
    assert_eq!(
        root.links(),
        vec![format!("{}/page1", base), format!("{}/page2", base)]
    );
    assert_eq!(result.page(&format!("{}/page3", base)).unwrap().depth(), 2);
    assert_eq!(result.errors(), 0);
}

#[tokio::test]
async fn test_directory_seed_resolves_relative_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/docs/", &["intro", "guide/", "/docsearch"]).await;
    mount_page(&server, "/docs/intro", &["../docs/"]).await;
    mount_page(&server, "/docs/guide/", &["../intro"]).await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(html(&[]))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docsearch"))
        .respond_with(html(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![format!("{}/docs/", base)]);
    config.scope.restrict_to_seed_paths = true;

    let mut controller = Controller::new(config).unwrap();
    let result = controller.run().await.unwrap();

    assert_eq!(
        urls(result.urls()),
        vec![
            format!("{}/docs", base),
            format!("{}/docs/guide", base),
            format!("{}/docs/intro", base),
        ]
    );
    assert!(result.pages().iter().all(|page| page.status() == PageStatus::Ok));
}

#[tokio::test]
async fn test_error_and_non_html_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", &["/missing", "/broken", "/report.pdf"]).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"%PDF-1.4 <a href="/hidden">"#, "application/pdf"),
        )
        .mount(&server)
        .await;

    let mut controller = Controller::new(create_test_config(vec![format!("{}/", base)])).unwrap();
    let result = controller.run().await.unwrap();

    assert_eq!(result.phase(), CrawlPhase::Completed);
    assert_eq!(result.pages().len(), 4);
    assert_eq!(
        result.page(&format!("{}/missing", base)).unwrap().status(),
        PageStatus::HttpError(404)
    );
    assert_eq!(
        result.page(&format!("{}/broken", base)).unwrap().status(),
        PageStatus::HttpError(503)
    );

    let pdf = result.page(&format!("{}/report.pdf", base)).unwrap();
    assert_eq!(pdf.status(), PageStatus::NotHtml);
    assert!(pdf.links().is_empty());
    assert!(result.page(&format!("{}/hidden", base)).is_none());
    assert_eq!(result.errors(), 2);
}

#[tokio::test]
async fn test_connection_refused_is_recorded() {
    // Nothing listens on port 1
    let mut config = create_test_config(vec!["http://127.0.0.1:1/".to_string()]);
    config.crawler.request_timeout_ms = 5_000;

    let mut controller = Controller::new(config).unwrap();
    let result = controller.run().await.unwrap();

    assert_eq!(result.phase(), CrawlPhase::Completed);
    assert_eq!(result.pages().len(), 1);
    assert_eq!(
        result.pages()[0].status(),
        PageStatus::FetchError(FetchErrorKind::Connection)
    );
    assert_eq!(result.pages()[0].status().to_string(), "fetch error:connection");
    assert!(result.pages()[0].links().is_empty());
}

#[tokio::test]
async fn test_slow_page_times_out() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", &["/slow"]).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html(&[]).set_delay(std::time::Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", base)]);
    config.crawler.request_timeout_ms = 300;

    let mut controller = Controller::new(config).unwrap();
    let result = controller.run().await.unwrap();

    assert_eq!(
        result.page(&format!("{}/slow", base)).unwrap().status(),
        PageStatus::FetchError(FetchErrorKind::Timeout)
    );
    assert_eq!(result.page(&format!("{}/", base)).unwrap().status(), PageStatus::Ok);
}

#[tokio::test]
async fn test_page_limit_truncates_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&["/a", "/b", "/c", "/d", "/e"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html(&[]))
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", base)]);
    config.crawler.max_pages = Some(3);

    let mut controller = Controller::new(config).unwrap();
    let result = controller.run().await.unwrap();

    assert_eq!(result.phase(), CrawlPhase::Truncated);
    assert_eq!(result.stop_reason(), Some(StopReason::PageLimit { limit: 3 }));
    assert_eq!(result.pages().len(), 3);
    assert!(result.page(&format!("{}/", base)).is_some());
}

#[tokio::test]
async fn test_root_only_mode_fetches_seed_only() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", &["/a", "/b"]).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", base)]);
    config.crawler.recursive = false;

    let mut controller = Controller::new(config).unwrap();
    let result = controller.run().await.unwrap();

    assert_eq!(result.pages().len(), 1);
    assert_eq!(result.pages()[0].links().len(), 2);
}

#[tokio::test]
async fn test_robots_txt_is_respected() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "User-agent: *\nDisallow: /private\n",
            "text/plain",
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", &["/private/secret", "/public"]).await;
    mount_page(&server, "/public", &["/private/other"]).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", base)]);
    config.crawler.respect_robots = true;

    let mut controller = Controller::new(config).unwrap();
    let result = controller.run().await.unwrap();

    assert_eq!(
        urls(result.urls()),
        vec![format!("{}/", base), format!("{}/public", base)]
    );
}

#[tokio::test]
async fn test_invalid_seeds_rejected() {
    let config = create_test_config(vec![
        "not a url".to_string(),
        "ftp://example.com/file".to_string(),
    ]);
    let mut controller = Controller::new(config).unwrap();

    let err = controller.run().await.unwrap_err();
    assert!(matches!(err, SitemapError::NoValidSeeds { attempted: 2 }));
    assert_eq!(controller.phase(), CrawlPhase::Idle);
}

#[tokio::test]
async fn test_sitemap_written_after_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", &["/about?x=1&y=2"]).await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(&[]))
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", base)]);
    config.output.priority_urls = vec![format!("{}/", base)];
    let output_config = config.clone();

    let mut controller = Controller::new(config).unwrap();
    let result = controller.run().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let xml_path = dir.path().join("sitemap.xml");
    write_output(result, &output_config, &xml_path).unwrap();

    let xml = std::fs::read_to_string(&xml_path).unwrap();
    assert!(xml.contains(&format!("<loc>{}/</loc>", base)));
    assert!(xml.contains(&format!("<loc>{}/about?x=1&amp;y=2</loc>", base)));
    assert!(xml.contains("<priority>1.00</priority>"));
    assert!(xml.contains("<!-- crawl completed: 2 pages, 0 errors -->"));

    let mut text_config = output_config.clone();
    text_config.output.format = OutputFormat::Text;
    let text_path = dir.path().join("sitemap.txt");
    write_output(result, &text_config, &text_path).unwrap();

    let text = std::fs::read_to_string(&text_path).unwrap();
    assert_eq!(
        text.lines().next(),
        Some(format!("ok\t0\t{}/", base).as_str())
    );
    assert!(text.ends_with("# outcome: completed (2 pages, 0 errors)\n"));
}
