//! End-to-end runs of [`Scraper::run`] against the scripted browser.

mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use mapscout_core::{ExtractionDepth, SearchRequest};
use mapscout_scraper::{
    BrowserContext, DiscoveryConfig, PauseBand, PoolConfig, Scraper, ScraperConfig,
};
use support::{place_link, FakeBrowser, PageScript, SearchScript};

fn scraper() -> Scraper {
    Scraper::new(ScraperConfig {
        discovery: DiscoveryConfig {
            navigation_timeout: Duration::from_secs(5),
            consent_timeout: Duration::from_millis(10),
            feed_timeout: Duration::from_millis(10),
            scroll_pause: PauseBand::none(),
            stagnation_limit: 2,
            max_iterations: 20,
        },
        pool: PoolConfig {
            concurrency: 3,
            navigation_timeout: Duration::from_secs(5),
            navigation_retries: 0,
            retry_backoff_base_ms: 1,
            debug_dump_dir: None,
        },
        run_deadline: Duration::from_secs(60),
        ..ScraperConfig::default()
    })
}

fn request(max_places: u32, depth: ExtractionDepth) -> SearchRequest {
    SearchRequest::new("cafes in lisbon", max_places, "en", true, depth).expect("valid request")
}

fn titled(name: &str, body: &str) -> String {
    format!("<html><head><title>{name} - Google Maps</title></head><body>{body}</body></html>")
}

#[tokio::test]
async fn title_and_tel_page_yields_only_name_phone_and_link() {
    let cafe = place_link("example-cafe");
    let nameless = place_link("nameless");
    let browser = FakeBrowser::new(SearchScript::feed(vec![vec![cafe.clone(), nameless.clone()]]))
        .with_markup(
            &cafe,
            r#"<html><head><title>Example Cafe - Google Maps</title></head>
               <body><a href="tel:+14155550123">Call</a></body></html>"#,
        )
        .with_markup(&nameless, "<html><body><div>Closed</div></body></html>");
    let context: Arc<dyn BrowserContext> = Arc::new(browser.clone());

    let response = scraper().run(context, &request(10, ExtractionDepth::Full)).await;

    assert!(response.success);
    assert_eq!(response.query, "cafes in lisbon");
    assert_eq!(response.total_results, 1);
    assert_eq!(
        serde_json::to_value(&response.results[0]).unwrap(),
        json!({
            "name": "Example Cafe",
            "phone": "14155550123",
            "link": cafe,
        })
    );
    assert_eq!(browser.open(), 0, "search and detail sessions must all be closed");
}

#[tokio::test]
async fn summary_depth_leaves_out_contact_fields() {
    let cafe = place_link("example-cafe");
    let browser = FakeBrowser::new(SearchScript::feed(vec![vec![cafe.clone()]])).with_markup(
        &cafe,
        &titled("Example Cafe", r#"<a href="tel:+14155550123">Call</a>"#),
    );
    let context: Arc<dyn BrowserContext> = Arc::new(browser);

    let response = scraper().run(context, &request(10, ExtractionDepth::Summary)).await;

    assert_eq!(response.total_results, 1);
    assert_eq!(response.results[0].name, "Example Cafe");
    assert_eq!(response.results[0].phone, None);
}

#[tokio::test]
async fn same_place_under_two_links_is_reported_once() {
    let first = place_link("cafe-a");
    let second = place_link("cafe-a-again");
    let shared_id = "ChIJN1t_tDeuEmsRUsoyG83frY4";
    let browser = FakeBrowser::new(SearchScript::feed(vec![vec![first.clone(), second.clone()]]))
        .with_page(
            &first,
            PageScript::Slow {
                delay: Duration::from_millis(5),
                markup: titled("Cafe A", shared_id),
            },
        )
        .with_page(
            &second,
            PageScript::Slow {
                delay: Duration::from_millis(50),
                markup: titled("Cafe A", shared_id),
            },
        );
    let context: Arc<dyn BrowserContext> = Arc::new(browser);

    let response = scraper().run(context, &request(10, ExtractionDepth::Summary)).await;

    assert_eq!(response.total_results, 1);
    assert_eq!(response.results[0].place_id.as_deref(), Some(shared_id));
}

#[tokio::test]
async fn results_never_exceed_max_places() {
    let links: Vec<String> = (0..6).map(|i| place_link(&format!("p{i}"))).collect();
    let mut browser = FakeBrowser::new(SearchScript::feed(vec![links.clone()]));
    for (i, link) in links.iter().enumerate() {
        browser = browser.with_markup(link, &titled(&format!("Place {i}"), ""));
    }
    let context: Arc<dyn BrowserContext> = Arc::new(browser.clone());

    let response = scraper().run(context, &request(2, ExtractionDepth::Summary)).await;

    assert_eq!(response.total_results, 2);
    // One search session plus one per kept candidate.
    assert_eq!(browser.opened(), 3);
}

#[tokio::test]
async fn detail_failures_still_return_partial_results() {
    let good = place_link("good");
    let broken = place_link("broken");
    let browser = FakeBrowser::new(SearchScript::feed(vec![vec![good.clone(), broken.clone()]]))
        .with_markup(&good, &titled("Good Place", ""))
        .with_page(&broken, PageScript::Broken);
    let context: Arc<dyn BrowserContext> = Arc::new(browser);

    let response = scraper().run(context, &request(10, ExtractionDepth::Summary)).await;

    assert!(response.success);
    assert_eq!(response.total_results, 1);
    assert_eq!(response.results[0].name, "Good Place");
}

#[tokio::test]
async fn unavailable_discovery_is_an_unsuccessful_empty_response() {
    let browser = FakeBrowser::new(SearchScript::default());
    let context: Arc<dyn BrowserContext> = Arc::new(browser.clone());

    let response = scraper().run(context, &request(10, ExtractionDepth::Summary)).await;

    assert!(!response.success);
    assert_eq!(response.total_results, 0);
    assert!(response.results.is_empty());
    assert_eq!(browser.open(), 0);
}

#[tokio::test]
async fn single_place_redirect_is_extracted() {
    let place = place_link("Only+Cafe");
    let browser = FakeBrowser::new(SearchScript {
        redirect: Some(place.clone()),
        ..SearchScript::default()
    })
    .with_markup(&place, &titled("Only Cafe", ""));
    let context: Arc<dyn BrowserContext> = Arc::new(browser);

    let response = scraper().run(context, &request(5, ExtractionDepth::Summary)).await;

    assert!(response.success);
    assert_eq!(response.total_results, 1);
    assert_eq!(response.results[0].name, "Only Cafe");
    assert_eq!(response.results[0].link, place);
}

#[tokio::test]
async fn search_view_timeout_is_a_successful_empty_run() {
    let browser = FakeBrowser::new(SearchScript {
        unreachable: true,
        ..SearchScript::feed(vec![vec![place_link("never-seen")]])
    });
    let context: Arc<dyn BrowserContext> = Arc::new(browser.clone());

    let response = scraper().run(context, &request(5, ExtractionDepth::Full)).await;

    assert!(response.success);
    assert_eq!(response.total_results, 0);
    assert!(response.results.is_empty());
    assert_eq!(browser.open(), 0);
}

#[tokio::test]
async fn unbounded_run_budget_does_not_panic() {
    let cafe = place_link("example-cafe");
    let browser = FakeBrowser::new(SearchScript::feed(vec![vec![cafe.clone()]]))
        .with_markup(&cafe, &titled("Example Cafe", ""));
    let context: Arc<dyn BrowserContext> = Arc::new(browser);
    let scraper = Scraper::new(ScraperConfig {
        run_deadline: Duration::from_secs(u64::MAX),
        ..scraper().config().clone()
    });

    let response = scraper.run(context, &request(1, ExtractionDepth::Summary)).await;

    assert!(response.success);
    assert_eq!(response.total_results, 1);
}
