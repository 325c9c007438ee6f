//! Load coordinator
//!
//! Drives one batch into a [`StagingSink`] with full-replace semantics:
//! clear, insert each record independently, commit once. A rejected row is
//! counted and skipped; a failed clear or commit ends the run.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::SinkError;
use crate::normalize::{normalize, Normalized};
use crate::record::RawRecord;
use crate::sink::StagingSink;

const PROGRESS_INTERVAL: usize = 50;

/// Outcome of one [`load`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub inserted: usize,
    pub skipped: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.skipped
    }
}

/// Replace the staged rows with `records`
///
/// An empty batch returns immediately without touching the sink. On success
/// `inserted + skipped == records.len()`. Records are processed strictly in
/// order.
#[instrument(skip_all, fields(records = records.len()))]
pub async fn load<S>(sink: &mut S, records: &[RawRecord]) -> Result<LoadSummary, SinkError>
where
    S: StagingSink + ?Sized,
{
    let mut summary = LoadSummary::default();

    if records.is_empty() {
        info!("No events to load");
        return Ok(summary);
    }

    sink.clear().await?;

    for record in records {
        let Normalized { row, warnings } = normalize(record);

        for warning in &warnings {
            warn!(event_id = %row.event_id, %warning, "Normalization warning");
        }

        match sink.insert(&row).await {
            Ok(()) => summary.inserted += 1,
            Err(e) if e.is_record_level() => {
                warn!(event_id = %row.event_id, error = %e, "Skipping event");
                summary.skipped += 1;
            },
            Err(e) => return Err(e),
        }

        if summary.total() % PROGRESS_INTERVAL == 0 {
            debug!(
                inserted = summary.inserted,
                skipped = summary.skipped,
                "Load progress"
            );
        }
    }

    sink.commit().await?;

    info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        total = summary.total(),
        "Load committed"
    );

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_total() {
        let summary = LoadSummary {
            inserted: 498,
            skipped: 2,
        };
        assert_eq!(summary.total(), 500);
        assert_eq!(LoadSummary::default().total(), 0);
    }
}
