//! Summary presentation
//!
//! The engine only produces a [`Summary`]; how it is shown is chosen by the
//! caller through a [`Presenter`].

use chrono::Local;
use std::io::Write;
use std::str::FromStr;

use crate::config::Environment;
use crate::models::{Frequency, Summary};
use crate::utils::format_elapsed;

const RULE: &str = "=================================";

/// Renders a summary to a writer
pub trait Presenter {
    fn present(&self, summary: &Summary, out: &mut dyn Write) -> std::io::Result<()>;
}

/// Output style selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Default style for an environment: JSON under test, text otherwise
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Test => Self::Json,
            Environment::Development | Environment::Production => Self::Text,
        }
    }

    pub fn presenter(&self) -> Box<dyn Presenter> {
        match self {
            Self::Text => Box::new(HumanPresenter),
            Self::Json => Box::new(JsonPresenter),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "human" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Ranked tables plus start and finish times
#[derive(Debug, Default, Clone, Copy)]
pub struct HumanPresenter;

impl HumanPresenter {
    fn table(out: &mut dyn Write, name: &str, rows: &[Frequency]) -> std::io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{:<8}{:<16}Frequency", "Item", name)?;
        writeln!(out, "{RULE}")?;
        for (rank, row) in rows.iter().enumerate() {
            writeln!(out, "{:<8}{:<16}{}", rank + 1, row.key, row.count)?;
        }
        Ok(())
    }
}

impl Presenter for HumanPresenter {
    fn present(&self, summary: &Summary, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "\tRESULTS")?;
        writeln!(out, "{RULE}")?;

        Self::table(out, "Food id", &summary.top_primary)?;
        Self::table(out, "Categories", &summary.top_secondary)?;

        writeln!(out)?;
        writeln!(
            out,
            "Started at {}",
            summary.start_time.with_timezone(&Local).format("%H:%M:%S")
        )?;
        writeln!(
            out,
            "Finished at {}",
            summary.end_time.with_timezone(&Local).format("%H:%M:%S")
        )?;
        writeln!(out, "Elapsed {}", format_elapsed(summary.elapsed()))?;

        if summary.partial {
            writeln!(out)?;
            writeln!(
                out,
                "Partial result: {}/{} workers reported ({} failed, {} cancelled, {} lost)",
                summary.reports_received,
                summary.workers,
                summary.failed_workers,
                summary.cancelled_workers,
                summary.lost_workers
            )?;
        }

        Ok(())
    }
}

/// The summary as pretty-printed JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPresenter;

impl Presenter for JsonPresenter {
    fn present(&self, summary: &Summary, out: &mut dyn Write) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, summary)?;
        writeln!(out)
    }
}
