//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against a temporary database.

use button_trawler::config::{parse_config, Config};
use button_trawler::crawler::{Coordinator, SiteOutcome};
use button_trawler::output::load_statistics;
use button_trawler::state::PageState;
use button_trawler::storage::{with_storage, SqliteStorage, Storage};
use button_trawler::{content_key, parse_root, site_key};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to `db_path`
fn create_test_config(db_path: &Path, max_pages: u32, services: &str) -> Config {
    parse_config(&format!(
        r#"
        [crawler]
        max-pages-per-site = {}
        request-delay = 0

        [user-agent]
        crawler-name = "TestTrawler"
        crawler-version = "1.0"
        contact-url = "https://trawler.dev/about"
        contact-email = "admin@trawler.dev"

        [output]
        database-path = "{}"

        {}
        "#,
        max_pages,
        db_path.display(),
        services
    ))
    .expect("valid test config")
}

fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

async fn mount_html(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Paths requested from `server`, robots.txt excluded
async fn requested_pages(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .filter(|p| p != "/robots.txt")
        .collect()
}

fn page_state(storage: &dyn Storage, url: &str) -> Option<PageState> {
    let url = Url::parse(url).expect("valid url");
    storage
        .get_page(&content_key(&url))
        .expect("page query")
        .map(|page| page.state)
}

fn hostname(server: &MockServer) -> String {
    site_key(&parse_root(&server.uri()).expect("valid root")).expect("host")
}

#[tokio::test]
async fn test_priority_links_are_crawled_first() {
    let site = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&site, "User-agent: *\nAllow: /").await;
    mount_html(
        &site,
        "/",
        r#"<a href="/b">b</a><a href="/buttons">my buttons</a>"#.to_string(),
    )
    .await;
    mount_html(&site, "/b", "<p>b</p>".to_string()).await;
    mount_html(&site, "/buttons", "<p>buttons</p>".to_string()).await;

    let config = create_test_config(&dir.path().join("crawl.db"), 10, "");
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator.run_single(&site.uri()).await.unwrap();

    assert_eq!(report.outcome, SiteOutcome::Crawled);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(requested_pages(&site).await, vec!["/", "/buttons", "/b"]);
}

#[tokio::test]
async fn test_wrapped_button_links_to_other_site() {
    let site = MockServer::start().await;
    let other = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let button = png(88, 31, [255, 0, 0]);

    mount_html(
        &site,
        "/",
        format!(
            r#"<a href="{}/x"><img src="/red.png" alt="red"></a>
               <img src="/copy.png">
               <img src="/banner.png">"#,
            other.uri()
        ),
    )
    .await;
    for image in ["/red.png", "/copy.png"] {
        Mock::given(method("GET"))
            .and(path(image))
            .respond_with(ResponseTemplate::new(200).set_body_raw(button.clone(), "image/png"))
            .mount(&site)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/banner.png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(png(468, 60, [0, 0, 255]), "image/png"),
        )
        .mount(&site)
        .await;

    let config = create_test_config(&dir.path().join("crawl.db"), 10, "");
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator.run_single(&site.uri()).await.unwrap();

    assert_eq!(report.buttons_found, 2);
    assert_eq!(report.buttons_new, 1);
    assert_eq!(report.websites_discovered, 1);

    let storage = coordinator.storage();
    let counts = with_storage(storage, |s| s.counts()).unwrap();
    assert_eq!(counts.buttons, 1);

    let hash = button_trawler::crawler::content_hash(&button);
    let stored = with_storage(storage, |s| s.get_button(&hash))
        .unwrap()
        .expect("button stored");
    assert_eq!(stored.links_to, Some(format!("{}/x", other.uri())));
    assert_eq!(stored.color_tags, vec!["red".to_string()]);
    assert_eq!(stored.average_color, "#ff0000");

    let queued = with_storage(storage, |s| s.get_website(&hostname(&other)))
        .unwrap()
        .expect("other site queued");
    assert!(!queued.is_scraped);
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let site = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(&site, "/", r#"<a href="/private">p</a>"#.to_string()).await;
    mount_html(&site, "/private", "<p>hello</p>".to_string()).await;

    let config = create_test_config(&dir.path().join("crawl.db"), 10, "");
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator.run_single(&site.uri()).await.unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_disallowed, 0);
    let storage = coordinator.storage();
    let state = with_storage(storage, |s| {
        Ok(page_state(s, &format!("{}/private", site.uri())))
    })
    .unwrap();
    assert_eq!(state, Some(PageState::Processed));
}

#[tokio::test]
async fn test_disallowed_root_uses_alternate_root() {
    let site = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&site, "User-agent: *\nDisallow: /\nAllow: /index.html").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>root</p>", "text/html"))
        .expect(0)
        .mount(&site)
        .await;
    mount_html(&site, "/index.html", r#"<a href="/about">about</a>"#.to_string()).await;

    let config = create_test_config(&dir.path().join("crawl.db"), 10, "");
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator.run_single(&site.uri()).await.unwrap();

    assert_eq!(report.outcome, SiteOutcome::Crawled);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.pages_disallowed, 1);

    let storage = coordinator.storage();
    let (index, about) = with_storage(storage, |s| {
        Ok((
            page_state(s, &format!("{}/index.html", site.uri())),
            page_state(s, &format!("{}/about", site.uri())),
        ))
    })
    .unwrap();
    assert_eq!(index, Some(PageState::Processed));
    assert_eq!(about, Some(PageState::Disallowed));
}

#[tokio::test]
async fn test_page_cap_stops_the_site() {
    let site = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(&site, "/", r#"<a href="/p0">0</a>"#.to_string()).await;
    for i in 0..10 {
        mount_html(
            &site,
            &format!("/p{}", i),
            format!(r#"<a href="/p{}">next</a><a href="/">home</a>"#, i + 1),
        )
        .await;
    }

    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&db_path, 4, "");
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator.run_single(&site.uri()).await.unwrap();

    assert_eq!(report.pages_fetched, 4);
    assert_eq!(requested_pages(&site).await, vec!["/", "/p0", "/p1", "/p2"]);

    let website = with_storage(coordinator.storage(), |s| s.get_website(&hostname(&site)))
        .unwrap()
        .unwrap();
    assert!(website.is_scraped);

    // Recorded pages are never fetched again, so a rerun ends at the root
    let again = coordinator.run_single(&site.uri()).await.unwrap();
    assert_eq!(again.pages_fetched, 0);
    assert_eq!(requested_pages(&site).await.len(), 4);

    let stats = load_statistics(&SqliteStorage::new(&db_path).unwrap()).unwrap();
    assert_eq!(stats.total_pages, 4);
    assert_eq!(stats.pages_by_state.get(&PageState::Processed), Some(&4));
    assert_eq!(stats.scraped_websites, 1);
}

#[tokio::test]
async fn test_render_worker_with_markup_fallback() {
    let site = MockServer::start().await;
    let worker = MockServer::start().await;
    let embedder = MockServer::start().await;
    let other = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/render"))
        .and(query_param("url", format!("{}/", site.uri())))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title": "Worker page",
            "description": "Buttons galore",
            "rawText": "a rendered collection of buttons",
            "buttons": [{"src": "/w.png", "links_to": format!("{}/", other.uri())}],
            "links": [{"href": "/fallback", "text": "more"}, {"href": "/secret"}]
        })))
        .mount(&worker)
        .await;
    Mock::given(method("GET"))
        .and(path("/render"))
        .and(query_param("url", format!("{}/fallback", site.uri())))
        .respond_with(ResponseTemplate::new(503))
        .mount(&worker)
        .await;
    Mock::given(method("GET"))
        .and(path("/render"))
        .and(query_param("url", format!("{}/secret", site.uri())))
        .respond_with(ResponseTemplate::new(500))
        .mount(&worker)
        .await;

    mount_html(&site, "/fallback", "<p>plain markup</p>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/w.png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(png(88, 31, [0, 128, 0]), "image/png"),
        )
        .mount(&site)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectorize"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"vectors": [[0.5, 0.25]]})),
        )
        .mount(&embedder)
        .await;

    let services = format!(
        "[services]\nrender-worker = \"{}/render?url=\"\nembedding = \"{}/vectorize\"\n",
        worker.uri(),
        embedder.uri()
    );
    let config = create_test_config(&dir.path().join("crawl.db"), 10, &services);
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator.run_single(&site.uri()).await.unwrap();

    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.buttons_new, 1);
    assert_eq!(report.websites_discovered, 1);
    assert_eq!(requested_pages(&site).await, vec!["/w.png", "/fallback"]);

    let storage = coordinator.storage();
    let (root, fallback, secret) = with_storage(storage, |s| {
        Ok((
            page_state(s, &format!("{}/", site.uri())),
            page_state(s, &format!("{}/fallback", site.uri())),
            page_state(s, &format!("{}/secret", site.uri())),
        ))
    })
    .unwrap();
    assert_eq!(root, Some(PageState::Processed));
    assert_eq!(fallback, Some(PageState::Processed));
    assert_eq!(secret, Some(PageState::Forbidden));

    // Root: body, title and description; fallback page: body only
    let embedded = embedder.received_requests().await.unwrap_or_default();
    assert_eq!(embedded.len(), 4);

    let frequency = with_storage(storage, |s| {
        s.keyword_frequency("button", &format!("{}/", site.uri()))
    })
    .unwrap();
    assert!(frequency.is_some());
}
