//! Blotter Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads the public incident feed into a warehouse staging table.
//!
//! # Pipeline
//!
//! - **Fetch** ([`fetcher`]): one bounded GET; failure means an empty batch
//! - **Normalize** ([`normalize`]): pure mapping onto the staging schema
//! - **Load** ([`loader`]): full replace, per-record skip, single commit
//!
//! [`pipeline::run_load`] wires the three together against PostgreSQL;
//! [`report`] reads the transformed fact table back out.
//!
//! # Example
//!
//! ```no_run
//! use blotter_ingest::{config::Config, pipeline};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load();
//!     config.validate()?;
//!     let report = pipeline::run_load(&config).await?;
//!     println!("{} inserted, {} skipped", report.summary.inserted, report.summary.skipped);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod sink;

pub use error::{FetchError, IngestError, Result, SinkError};
pub use loader::{load, LoadSummary};
pub use normalize::{normalize, FieldWarning, Normalized, NormalizedRow};
pub use record::{LocationField, RawRecord};
pub use sink::{PgStagingSink, StagingCounts, StagingSink};
