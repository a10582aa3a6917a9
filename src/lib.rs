//! lifestats - concurrent food statistics miner
//!
//! Splits an id range across a pool of workers, each paging through its
//! slice of a `/foodstats`-style endpoint at a shared request rate, and
//! merges their tallies into top-K food and category frequencies.
//!
//! # Architecture
//!
//! - [`config`] - Settings, per-environment files and env overrides
//! - [`crawler`] - Segmenter, rate limiter, workers and the coordinator
//! - [`models`] - Records, pages, frequency reports and the run summary
//! - [`display`] - Presenters that render a summary
//! - [`utils`] - Errors, retry and small helpers
//!
//! # Example
//!
//! ```no_run
//! use lifestats::config::{Environment, Settings};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load(None, Environment::from_env()?)?;
//!     let summary = lifestats::crawler::run(settings, CancellationToken::new()).await?;
//!     println!("{} foods ranked", summary.top_primary.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod display;
pub mod error;
pub mod models;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Environment, Settings};
    pub use crate::crawler::{Coordinator, HttpPageFetcher, PageFetcher};
    pub use crate::display::{HumanPresenter, JsonPresenter, OutputFormat, Presenter};
    pub use crate::error::{Error, ErrorCategory, LifestatsErrorTrait, Result};
    pub use crate::models::{Frequency, Segment, Summary, WorkerOutcome};
}

pub use models::{Frequency, Summary};
