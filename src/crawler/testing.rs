//! Scripted page source for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::fetcher::PageFetcher;
use crate::models::{FoodRecord, ItemId, Page};
use crate::utils::error::FetchError;

/// Answers from a fixed offset → page table; unknown offsets fail with 404
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<ItemId, Page>,
    failing: HashMap<ItemId, u16>,
    delay: Option<Duration>,
    calls: Mutex<Vec<ItemId>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, offset: ItemId, page: Page) -> Self {
        self.pages.insert(offset, page);
        self
    }

    pub fn fail(mut self, offset: ItemId, status: u16) -> Self {
        self.failing.insert(offset, status);
        self
    }

    /// Delay every answer, to keep workers busy
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ItemId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, offset: ItemId, _limit: u32) -> Result<Page, FetchError> {
        self.calls.lock().unwrap().push(offset);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.failing.get(&offset) {
            return Err(FetchError::ServerError {
                offset,
                status: *status,
            });
        }
        self.pages
            .get(&offset)
            .cloned()
            .ok_or(FetchError::ServerError {
                offset,
                status: 404,
            })
    }
}

/// Page of records `ids`, each with food `id % foods` and category `id % 3`
pub fn page_of(ids: std::ops::Range<ItemId>, foods: ItemId, next: Option<ItemId>) -> Page {
    Page {
        records: ids
            .map(|id| FoodRecord {
                id,
                food_id: id % foods,
                category_id: id % 3,
            })
            .collect(),
        next_offset: next,
    }
}
