//! Error handling scenarios
//!
//! A failing worker never aborts the run: its partial tallies are merged and
//! the summary is flagged partial. Only invalid settings fail a run.

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{expected_top, test_settings, Dataset, ENDPOINT};
use lifestats::config::Settings;
use lifestats::crawler;
use lifestats::error::{ConfigError, Error, ErrorCategory, LifestatsErrorTrait};

#[tokio::test]
async fn test_failed_segment_keeps_other_tallies() {
    let server = MockServer::start().await;
    Dataset::new(1000).failing_from(50).mount(&server).await;

    let settings = test_settings(&server, 0, 100, 2);
    let (top_foods, top_categories) = expected_top(0, 50, &settings);

    let summary = crawler::run(settings, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.reports_received, 2);
    assert_eq!(summary.failed_workers, 1);
    assert!(summary.partial);
    assert!(!summary.cancelled);
    assert_eq!(summary.top_primary, top_foods);
    assert_eq!(summary.top_secondary, top_categories);
}

/// A failure mid-segment keeps the pages fetched before it
#[tokio::test]
async fn test_failure_mid_segment_keeps_earlier_pages() {
    let server = MockServer::start().await;
    Dataset::new(1000).failing_from(40).mount(&server).await;

    let settings = test_settings(&server, 0, 100, 1);
    let (top_foods, _) = expected_top(0, 40, &settings);

    let summary = crawler::run(settings, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.failed_workers, 1);
    assert_eq!(summary.top_primary, top_foods);
}

#[tokio::test]
async fn test_malformed_pages_fail_soft() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let settings = test_settings(&server, 0, 100, 3);
    let summary = crawler::run(settings, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.failed_workers, 3);
    assert!(summary.partial);
    assert!(summary.top_primary.is_empty());
    assert!(summary.top_secondary.is_empty());
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_soft() {
    let settings = Settings {
        url: "http://127.0.0.1:1/foodstats".to_string(),
        first_id: 0,
        last_id: 100,
        pool_size: 2,
        rate_limit: 1000.0,
        log_span: 0,
        request_timeout_secs: 2,
        ..Settings::default()
    };

    let summary = crawler::run(settings, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.reports_received, 2);
    assert_eq!(summary.failed_workers, 2);
    assert!(summary.partial);
}

#[tokio::test]
async fn test_invalid_settings_fail_before_any_request() {
    let server = MockServer::start().await;
    Dataset::new(1000).mount(&server).await;

    let cases = [
        Settings {
            pool_size: 0,
            ..test_settings(&server, 0, 100, 2)
        },
        test_settings(&server, 100, 100, 2),
        Settings {
            rate_limit: -1.0,
            ..test_settings(&server, 0, 100, 2)
        },
        Settings {
            results_per_page: 0,
            ..test_settings(&server, 0, 100, 2)
        },
    ];

    for settings in cases {
        let err = crawler::run(settings, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_invalid_range_is_reported() {
    let server = MockServer::start().await;
    let err = crawler::run(test_settings(&server, 10, 5, 2), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidRange {
            first_id: 10,
            last_id: 5
        })
    ));
}
