//! End-to-end load run: fetch, stage, verify

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::fetcher::RecordFetcher;
use crate::loader::{load, LoadSummary};
use crate::record::RawRecord;
use crate::sink::{PgStagingSink, StagingCounts};

/// What one run did, as reported to the operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub fetched: usize,
    pub summary: LoadSummary,
    /// Staging table contents after commit; `None` when nothing was loaded
    /// or the verification query failed
    pub staged: Option<StagingCounts>,
}

/// Fetch the current batch and load it
pub async fn run_load(config: &Config) -> Result<RunReport> {
    let fetcher = RecordFetcher::new(&config.fetch)?;
    let records = fetcher.fetch().await;
    load_batch(config, &records).await
}

/// Load an already-fetched batch into the configured staging table
///
/// An empty batch never opens a database connection. Otherwise the
/// connection is closed before returning on every path.
pub async fn load_batch(config: &Config, records: &[RawRecord]) -> Result<RunReport> {
    if records.is_empty() {
        info!("No data to load");
        let report = RunReport::default();
        log_completion(&report);
        return Ok(report);
    }

    let mut sink = PgStagingSink::connect(&config.database, &config.staging_table).await?;
    let outcome = stage(&mut sink, records).await;
    sink.close().await;

    let (summary, staged) = outcome?;
    let report = RunReport {
        fetched: records.len(),
        summary,
        staged,
    };

    log_completion(&report);
    Ok(report)
}

fn log_completion(report: &RunReport) {
    info!(
        inserted = report.summary.inserted,
        skipped = report.summary.skipped,
        total = report.summary.total(),
        staged_total = report.staged.map(|c| c.total),
        staged_with_coordinates = report.staged.map(|c| c.with_coordinates),
        "Data load complete"
    );
}

async fn stage(
    sink: &mut PgStagingSink,
    records: &[RawRecord],
) -> Result<(LoadSummary, Option<StagingCounts>)> {
    sink.ensure_table().await?;
    let summary = load(sink, records).await?;

    let staged = match sink.verify().await {
        Ok(counts) => Some(counts),
        Err(e) => {
            warn!(error = %e, "Verification query failed");
            None
        },
    };

    Ok((summary, staged))
}
