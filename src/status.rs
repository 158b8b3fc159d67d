//! Status reporting.

use crate::traits::{StatusSink, StatusSummary};
use log::info;

/// Status sink that writes each update to the log.
///
/// Useful on backends without a status bar; a bar integration would
/// implement [`StatusSink`] itself and render the summary instead.
#[derive(Debug, Default)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn update(&self, summary: &StatusSummary) {
        match &summary.window {
            Some(title) => info!(
                "status: tag {} {} | {}",
                summary.tag, summary.layout, title
            ),
            None => info!("status: tag {} {}", summary.tag, summary.layout),
        }
    }
}

/// Sink that drops every update.
#[derive(Debug, Default)]
pub struct NullStatus;

impl StatusSink for NullStatus {
    fn update(&self, _summary: &StatusSummary) {}
}
