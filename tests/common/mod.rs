//! Common test utilities
//!
//! A synthetic `/foodstats` dataset served through wiremock. Every id maps
//! to a fixed food and category, so expected tallies can be computed
//! without the server.

#![allow(dead_code)]

use lifestats::config::Settings;
use lifestats::models::{most_common, FoodRecord, FrequencyReport};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ENDPOINT: &str = "/foodstats";

/// Food served for item `id`
pub fn food_of(id: u64) -> u64 {
    (id * 7) % 13
}

/// Category served for item `id`
pub fn category_of(id: u64) -> u64 {
    id % 4
}

pub fn record_of(id: u64) -> FoodRecord {
    FoodRecord {
        id,
        food_id: food_of(id),
        category_id: category_of(id),
    }
}

/// Response body for one page, in the endpoint's wire format
pub fn page_json(ids: std::ops::Range<u64>, next_offset: Option<u64>) -> Value {
    let records: Vec<Value> = ids
        .map(|id| {
            json!({
                "id": id,
                "food_id": food_of(id),
                "food__category_id": category_of(id),
            })
        })
        .collect();

    json!({
        "meta": { "next_offset": next_offset },
        "response": records,
    })
}

/// Tallies a correct run over `[first_id, last_id)` must produce
pub fn expected_report(first_id: u64, last_id: u64) -> FrequencyReport {
    let mut report = FrequencyReport::new();
    for id in first_id..last_id {
        report.record(&record_of(id));
    }
    report
}

/// Paged view of ids `0..total`, answering any `offset`/`limit` pair
#[derive(Debug, Clone)]
pub struct Dataset {
    pub total: u64,
    /// Offsets at or past this answer 500
    pub fail_from: Option<u64>,
    pub delay: Option<Duration>,
}

impl Dataset {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            fail_from: None,
            delay: None,
        }
    }

    pub fn failing_from(mut self, offset: u64) -> Self {
        self.fail_from = Some(offset);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn mount(self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(self)
            .mount(server)
            .await;
    }
}

impl Respond for Dataset {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let param = |name: &str| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == name)
                .and_then(|(_, value)| value.parse::<u64>().ok())
        };

        let (Some(offset), Some(limit)) = (param("offset"), param("limit")) else {
            return ResponseTemplate::new(400);
        };

        if self.fail_from.is_some_and(|from| offset >= from) {
            return ResponseTemplate::new(500);
        }

        let end = (offset + limit).min(self.total);
        let next = (end < self.total).then_some(end);
        let body = if offset >= self.total {
            json!({})
        } else {
            page_json(offset..end, next)
        };

        let template = ResponseTemplate::new(200).set_body_json(body);
        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}

/// Settings pointed at `server`, fast enough for tests
pub fn test_settings(server: &MockServer, first_id: u64, last_id: u64, pool_size: usize) -> Settings {
    Settings {
        url: format!("{}{ENDPOINT}", server.uri()),
        first_id,
        last_id,
        pool_size,
        rate_limit: 1000.0,
        results_per_page: 20,
        log_span: 0,
        top_n_primary: 100,
        top_n_secondary: 10,
        request_timeout_secs: 5,
        ..Settings::default()
    }
}

/// Ranked lists expected for `[first_id, last_id)`
pub fn expected_top(
    first_id: u64,
    last_id: u64,
    settings: &Settings,
) -> (Vec<lifestats::Frequency>, Vec<lifestats::Frequency>) {
    let report = expected_report(first_id, last_id);
    (
        most_common(&report.primary, settings.top_n_primary),
        most_common(&report.secondary, settings.top_n_secondary),
    )
}
