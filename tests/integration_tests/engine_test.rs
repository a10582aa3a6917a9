//! End-to-end mining runs
//!
//! Runs the full engine over HTTP and checks the summary against tallies
//! computed directly from the dataset.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

use crate::common::{expected_report, expected_top, test_settings, Dataset};
use lifestats::crawler::{self, Coordinator, HttpPageFetcher};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_matches_dataset_tallies() {
    let server = MockServer::start().await;
    Dataset::new(1000).mount(&server).await;

    let settings = test_settings(&server, 0, 100, 4);
    let (top_foods, top_categories) = expected_top(0, 100, &settings);

    let summary = crawler::run(settings, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.top_primary, top_foods);
    assert_eq!(summary.top_secondary, top_categories);
    assert_eq!(summary.workers, 4);
    assert_eq!(summary.reports_received, 4);
    assert!(!summary.partial);
    assert!(!summary.cancelled);
    assert!(summary.end_time >= summary.start_time);
}

/// Pages overlap the next segment; each record must still count exactly once
#[tokio::test]
async fn test_overlapping_pages_are_counted_once() {
    let server = MockServer::start().await;
    Dataset::new(1000).mount(&server).await;

    let settings = test_settings(&server, 0, 20, 2);
    let (top_foods, top_categories) = expected_top(0, 20, &settings);

    let summary = crawler::run(settings, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.top_primary, top_foods);
    assert_eq!(summary.top_secondary, top_categories);

    let foods: u64 = summary.top_primary.iter().map(|f| f.count).sum();
    let categories: u64 = summary.top_secondary.iter().map(|f| f.count).sum();
    assert_eq!(foods, 20);
    assert_eq!(categories, 20);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_offset_range_and_uneven_split() {
    let server = MockServer::start().await;
    Dataset::new(1000).mount(&server).await;

    let settings = test_settings(&server, 30, 107, 3);
    let (top_foods, top_categories) = expected_top(30, 107, &settings);

    let summary = crawler::run(settings, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.top_primary, top_foods);
    assert_eq!(summary.top_secondary, top_categories);
}

/// The range may run past the end of the data; the empty tail page ends the walk
#[tokio::test]
async fn test_range_past_end_of_data() {
    let server = MockServer::start().await;
    Dataset::new(50).mount(&server).await;

    let settings = test_settings(&server, 0, 200, 2);
    let summary = crawler::run(settings.clone(), CancellationToken::new())
        .await
        .unwrap();

    let (top_foods, _) = expected_top(0, 50, &settings);
    assert_eq!(summary.top_primary, top_foods);
    assert!(!summary.partial);
}

#[tokio::test]
async fn test_top_lists_are_truncated() {
    let server = MockServer::start().await;
    Dataset::new(1000).mount(&server).await;

    let settings = lifestats::config::Settings {
        top_n_primary: 3,
        top_n_secondary: 2,
        ..test_settings(&server, 0, 60, 2)
    };
    let summary = crawler::run(settings, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.top_primary.len(), 3);
    assert_eq!(summary.top_secondary.len(), 2);
    assert!(summary
        .top_primary
        .windows(2)
        .all(|w| w[0].count >= w[1].count));
}

#[tokio::test]
async fn test_coordinator_over_http_fetcher() {
    let server = MockServer::start().await;
    Dataset::new(1000).mount(&server).await;

    let settings = test_settings(&server, 0, 40, 2);
    let fetcher = HttpPageFetcher::from_settings(&settings).unwrap();
    let coordinator = Coordinator::new(settings, Arc::new(fetcher));

    let summary = coordinator.run().await.unwrap();

    let expected = expected_report(0, 40);
    let counted: u64 = summary.top_primary.iter().map(|f| f.count).sum();
    assert_eq!(counted, expected.total());
}
