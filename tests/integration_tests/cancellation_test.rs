//! Cancellation tests
//!
//! A cancelled run still returns a summary built from the reports that made
//! it back, and never waits on slow requests.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

use crate::common::{test_settings, Dataset};
use lifestats::config::Settings;
use lifestats::crawler;

#[tokio::test]
async fn test_cancel_before_start_makes_no_requests() {
    let server = MockServer::start().await;
    Dataset::new(1000).mount(&server).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = crawler::run(test_settings(&server, 0, 100, 3), cancel)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert!(summary.partial);
    assert_eq!(summary.workers, 3);
    assert_eq!(summary.reports_received + summary.lost_workers, 3);
    assert!(summary.top_primary.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_cancel_interrupts_slow_requests() {
    let server = MockServer::start().await;
    Dataset::new(1000)
        .delayed(Duration::from_secs(30))
        .mount(&server)
        .await;

    let settings = Settings {
        request_timeout_secs: 60,
        ..test_settings(&server, 0, 100, 2)
    };
    let cancel = CancellationToken::new();
    let run = tokio::spawn(crawler::run(settings, cancel.clone()));

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("cancelled run should finish promptly")
        .unwrap()
        .unwrap();

    assert!(summary.cancelled);
    assert!(summary.partial);
    assert!(summary.top_primary.is_empty());
}

/// With a grace period the cancelled workers get to hand in their reports
#[tokio::test]
async fn test_grace_period_collects_cancelled_reports() {
    let server = MockServer::start().await;
    Dataset::new(1000)
        .delayed(Duration::from_secs(30))
        .mount(&server)
        .await;

    let settings = Settings {
        request_timeout_secs: 60,
        shutdown_grace_ms: 2000,
        ..test_settings(&server, 0, 100, 2)
    };
    let cancel = CancellationToken::new();
    let run = tokio::spawn(crawler::run(settings, cancel.clone()));

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("cancelled run should finish promptly")
        .unwrap()
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.cancelled_workers, 2);
    assert_eq!(summary.reports_received, 2);
    assert_eq!(summary.lost_workers, 0);
}
