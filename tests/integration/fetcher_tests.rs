//! HttpFetcher against a mock server

use partselect_ingest::config::UserAgentConfig;
use partselect_ingest::crawler::{
    default_strategies, fetch_best, FetchProfile, HttpFetcher, PageFetcher,
};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&user_agent(), Duration::from_secs(5)).unwrap()
}

const MODEL_HTML: &str = r#"<html>
<head><title>Whirlpool Dishwasher WDT780SAEM1</title></head>
<body>
  <nav><a href="/Brands/">Brands</a></nav>
  <article>
    <h1>Parts for the WDT780SAEM1</h1>
    <p><a href="/PS3406971-Whirlpool-W10195416-Lower-Rack.htm">Lower Dishrack Wheel Assembly</a></p>
    <p><a href="https://www.facebook.com/partselect">Follow us</a></p>
  </article>
</body>
</html>"#;

#[tokio::test]
async fn test_fetch_renders_markdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Models/WDT780SAEM1/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(MODEL_HTML)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/Models/WDT780SAEM1/", server.uri());
    let page = fetcher()
        .fetch(&url, &FetchProfile::baseline())
        .await
        .unwrap();

    assert!(page.success);
    assert_eq!(page.title(), "Whirlpool Dishwasher WDT780SAEM1");
    assert_eq!(page.metadata.get("status_code").map(String::as_str), Some("200"));
    assert!(page.markdown.contains("Parts for the WDT780SAEM1"));
    assert!(page.markdown.contains(&format!(
        "[Lower Dishrack Wheel Assembly]({}/PS3406971-Whirlpool-W10195416-Lower-Rack.htm)",
        server.uri()
    )));
    assert!(!page.markdown.contains("facebook.com"));
}

#[tokio::test]
async fn test_non_success_status_is_failed_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = format!("{}/Models/GONE/", server.uri());
    let page = fetcher()
        .fetch(&url, &FetchProfile::baseline())
        .await
        .unwrap();

    assert!(!page.success);
    assert_eq!(page.error.as_deref(), Some("HTTP 503"));
    assert_eq!(page.metadata.get("status_code").map(String::as_str), Some("503"));
}

#[tokio::test]
async fn test_best_strategy_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Models/WDT780SAEM1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MODEL_HTML))
        .mount(&server)
        .await;

    let url = format!("{}/Models/WDT780SAEM1/", server.uri());
    let best = fetch_best(&fetcher(), &url, &default_strategies(), Duration::from_secs(5)).await;

    // The whole page outweighs the article-only render
    assert!(best.success);
    assert_eq!(best.strategy, "baseline");
    assert!(best.content.contains("Brands"));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(MODEL_HTML)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let url = format!("{}/Models/WDT780SAEM1/", server.uri());
    let best = fetch_best(
        &fetcher(),
        &url,
        &default_strategies(),
        Duration::from_millis(50),
    )
    .await;

    assert!(!best.success);
    assert_eq!(best.strategy, "baseline");
}
