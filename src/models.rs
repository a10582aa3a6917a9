// Core data structures for the lifestats miner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Identifier used for items, foods and categories
pub type ItemId = u64;

/// One food stat entry as returned by the page endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub id: ItemId,
    pub food_id: ItemId,
    #[serde(rename = "food__category_id")]
    pub category_id: ItemId,
}

/// One page of records plus the server-supplied cursor to the next page
///
/// Decodes from `{"meta": {"next_offset": ..}, "response": [..]}`. Missing
/// parts decode as empty, so `{}` is an empty last page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "PageBody")]
pub struct Page {
    pub records: Vec<FoodRecord>,
    pub next_offset: Option<ItemId>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PageBody {
    meta: PageMeta,
    response: Vec<FoodRecord>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PageMeta {
    next_offset: Option<ItemId>,
}

impl From<PageBody> for Page {
    fn from(body: PageBody) -> Self {
        Self {
            records: body.response,
            next_offset: body.meta.next_offset,
        }
    }
}

/// Half-open id range `[begin, end)` owned by exactly one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub begin: ItemId,
    pub end: ItemId,
}

impl Segment {
    pub fn new(begin: ItemId, end: ItemId) -> Self {
        Self { begin, end }
    }

    /// Number of ids covered
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pages of `page_size` needed to walk the segment (at least 1)
    pub fn page_count(&self, page_size: u32) -> u64 {
        self.len().div_ceil(u64::from(page_size.max(1))).max(1)
    }
}

/// Frequency tallies of foods (primary) and categories (secondary)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyReport {
    pub primary: HashMap<ItemId, u64>,
    pub secondary: HashMap<ItemId, u64>,
}

impl FrequencyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record
    pub fn record(&mut self, record: &FoodRecord) {
        *self.primary.entry(record.food_id).or_insert(0) += 1;
        *self.secondary.entry(record.category_id).or_insert(0) += 1;
    }

    /// Add every count of `other` into this report
    pub fn merge(&mut self, other: &FrequencyReport) {
        merge_counts(&mut self.primary, &other.primary);
        merge_counts(&mut self.secondary, &other.secondary);
    }

    /// Number of records tallied
    pub fn total(&self) -> u64 {
        self.primary.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }
}

fn merge_counts(into: &mut HashMap<ItemId, u64>, from: &HashMap<ItemId, u64>) {
    for (key, count) in from {
        *into.entry(*key).or_insert(0) += count;
    }
}

/// A key and how often it was seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    pub key: ItemId,
    pub count: u64,
}

/// The `n` most frequent keys, count descending, ties by key ascending
pub fn most_common(counts: &HashMap<ItemId, u64>, n: usize) -> Vec<Frequency> {
    let mut ranked: Vec<Frequency> = counts
        .iter()
        .map(|(key, count)| Frequency {
            key: *key,
            count: *count,
        })
        .collect();
    ranked.sort_unstable_by(|a, b| b.count.cmp(&a.count).then(a.key.cmp(&b.key)));
    ranked.truncate(n);
    ranked
}

/// Running totals merged from every report received so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    totals: FrequencyReport,
    reports: usize,
}

impl AggregateResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one worker's tallies (order-independent)
    pub fn merge(&mut self, report: &FrequencyReport) {
        self.totals.merge(report);
        self.reports += 1;
    }

    /// Number of reports merged
    pub fn reports(&self) -> usize {
        self.reports
    }

    pub fn totals(&self) -> &FrequencyReport {
        &self.totals
    }

    pub fn top_primary(&self, n: usize) -> Vec<Frequency> {
        most_common(&self.totals.primary, n)
    }

    pub fn top_secondary(&self, n: usize) -> Vec<Frequency> {
        most_common(&self.totals.secondary, n)
    }
}

/// Wall-clock bounds of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl RunStats {
    /// Start timing now
    pub fn start() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Record the end of the run; later calls keep the first end time
    pub fn finish(&mut self) -> DateTime<Utc> {
        *self.end_time.get_or_insert_with(Utc::now)
    }
}

/// How a worker's pagination loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerOutcome {
    /// Walked the whole segment or ran out of pages
    Completed,
    /// A fetch failed; tallies cover the pages before the failure
    Failed,
    /// Cancellation was observed before the segment was done
    Cancelled,
}

impl WorkerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// The single message a worker sends to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub segment: Segment,
    pub outcome: WorkerOutcome,
    pub pages_fetched: u64,
    pub frequencies: FrequencyReport,
}

/// Final output of a run, handed to a presenter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub top_primary: Vec<Frequency>,
    pub top_secondary: Vec<Frequency>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// Workers spawned
    pub workers: usize,

    /// Reports merged into the totals
    pub reports_received: usize,

    /// Reports whose worker stopped on a fetch failure
    pub failed_workers: usize,

    /// Reports whose worker stopped on cancellation
    pub cancelled_workers: usize,

    /// Workers terminated before they could report
    pub lost_workers: usize,

    /// Whether the run was cancelled
    pub cancelled: bool,

    /// Whether the totals may miss part of the id range
    pub partial: bool,
}

impl Summary {
    /// Run duration (zero if the clock went backwards)
    pub fn elapsed(&self) -> Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
