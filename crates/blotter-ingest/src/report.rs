//! Batch analytics over the transformed fact table
//!
//! Read-only. Six analyses, ending with overall totals. Each runs on its
//! own; one failing query is logged and left out of the report instead of
//! aborting the rest.

use comfy_table::{presets::UTF8_FULL, Table};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{validate_table_identifier, Config};
use crate::error::Result;

/// Rows shown for ranked analyses (types, locations)
pub const TOP_N: i64 = 10;

/// One rendered analysis
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

/// Share of events that carry coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage {
    pub total: i64,
    pub with_coordinates: i64,
    pub coverage_percent: f64,
}

impl Coverage {
    pub fn new(total: i64, with_coordinates: i64) -> Self {
        let coverage_percent = if total > 0 {
            (10_000.0 * with_coordinates as f64 / total as f64).round() / 100.0
        } else {
            0.0
        };

        Self {
            total,
            with_coordinates,
            coverage_percent,
        }
    }
}

/// Overall size of the fact table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryStats {
    pub total_events: i64,
    pub unique_types: i64,
}

impl SummaryStats {
    fn section(&self) -> Section {
        Section {
            title: "Summary Statistics",
            headers: vec!["total_events", "unique_types"],
            rows: vec![vec![
                group_thousands(self.total_events),
                self.unique_types.to_string(),
            ]],
        }
    }
}

/// `1234567` as `1,234,567`
fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Day name for the warehouse's 1-based, Sunday-first weekday numbering
pub fn day_name(day_of_week: i32) -> &'static str {
    match day_of_week {
        1 => "Sunday",
        2 => "Monday",
        3 => "Tuesday",
        4 => "Wednesday",
        5 => "Thursday",
        6 => "Friday",
        7 => "Saturday",
        _ => "Unknown",
    }
}

/// Read-only queries against one fact table
pub struct ReportQueries<'a> {
    pool: &'a PgPool,
    table: &'a str,
}

impl<'a> ReportQueries<'a> {
    /// `table` must be a valid `[schema.]table` identifier
    pub fn new(pool: &'a PgPool, table: &'a str) -> Result<Self> {
        validate_table_identifier(table)?;
        Ok(Self { pool, table })
    }

    pub async fn events_by_type(&self) -> sqlx::Result<Vec<(String, i64)>> {
        let sql = format!(
            r#"
            SELECT type::TEXT AS type, COUNT(*) AS event_count
            FROM {}
            GROUP BY type
            ORDER BY event_count DESC, type
            LIMIT $1
            "#,
            self.table
        );
        sqlx::query_as(&sql).bind(TOP_N).fetch_all(self.pool).await
    }

    pub async fn events_by_hour(&self) -> sqlx::Result<Vec<(i32, i64)>> {
        let sql = format!(
            r#"
            SELECT event_hour::INT4 AS event_hour, COUNT(*) AS event_count
            FROM {}
            WHERE event_hour IS NOT NULL
            GROUP BY 1
            ORDER BY 1
            "#,
            self.table
        );
        sqlx::query_as(&sql).fetch_all(self.pool).await
    }

    pub async fn events_by_day_of_week(&self) -> sqlx::Result<Vec<(i32, i64)>> {
        let sql = format!(
            r#"
            SELECT day_of_week::INT4 AS day_of_week, COUNT(*) AS event_count
            FROM {}
            WHERE day_of_week IS NOT NULL
            GROUP BY 1
            ORDER BY 1
            "#,
            self.table
        );
        sqlx::query_as(&sql).fetch_all(self.pool).await
    }

    pub async fn top_locations(&self) -> sqlx::Result<Vec<(String, i64)>> {
        let sql = format!(
            r#"
            SELECT location::TEXT AS location, COUNT(*) AS event_count
            FROM {}
            WHERE location IS NOT NULL AND location <> ''
            GROUP BY location
            ORDER BY event_count DESC, location
            LIMIT $1
            "#,
            self.table
        );
        sqlx::query_as(&sql).bind(TOP_N).fetch_all(self.pool).await
    }

    pub async fn coordinate_coverage(&self) -> sqlx::Result<Coverage> {
        let sql = format!(
            r#"
            SELECT
                COUNT(*) AS total_events,
                COUNT(*) FILTER (WHERE latitude IS NOT NULL AND longitude IS NOT NULL)
                    AS events_with_coordinates
            FROM {}
            "#,
            self.table
        );
        let (total, with_coordinates): (i64, i64) =
            sqlx::query_as(&sql).fetch_one(self.pool).await?;
        Ok(Coverage::new(total, with_coordinates))
    }

    pub async fn summary_statistics(&self) -> sqlx::Result<SummaryStats> {
        let sql = format!(
            "SELECT COUNT(*) AS total_events, COUNT(DISTINCT type) AS unique_types FROM {}",
            self.table
        );
        let (total_events, unique_types): (i64, i64) =
            sqlx::query_as(&sql).fetch_one(self.pool).await?;
        Ok(SummaryStats {
            total_events,
            unique_types,
        })
    }

    /// Run every analysis, keeping the ones that succeeded
    pub async fn sections(&self) -> Vec<Section> {
        let mut sections = Vec::new();

        match self.events_by_type().await {
            Ok(rows) => sections.push(Section {
                title: "Events by Type",
                headers: vec!["type", "event_count"],
                rows: rows
                    .into_iter()
                    .map(|(t, n)| vec![t, n.to_string()])
                    .collect(),
            }),
            Err(e) => warn!(error = %e, "Events by type query failed"),
        }

        match self.events_by_hour().await {
            Ok(rows) => sections.push(Section {
                title: "Events by Hour of Day",
                headers: vec!["event_hour", "event_count"],
                rows: rows
                    .into_iter()
                    .map(|(h, n)| vec![h.to_string(), n.to_string()])
                    .collect(),
            }),
            Err(e) => warn!(error = %e, "Events by hour query failed"),
        }

        match self.events_by_day_of_week().await {
            Ok(rows) => sections.push(Section {
                title: "Events by Day of Week",
                headers: vec!["day_of_week", "day_name", "event_count"],
                rows: rows
                    .into_iter()
                    .map(|(d, n)| vec![d.to_string(), day_name(d).to_string(), n.to_string()])
                    .collect(),
            }),
            Err(e) => warn!(error = %e, "Events by day of week query failed"),
        }

        match self.top_locations().await {
            Ok(rows) => sections.push(Section {
                title: "Top 10 Locations",
                headers: vec!["location", "event_count"],
                rows: rows
                    .into_iter()
                    .map(|(l, n)| vec![l, n.to_string()])
                    .collect(),
            }),
            Err(e) => warn!(error = %e, "Top locations query failed"),
        }

        match self.coordinate_coverage().await {
            Ok(coverage) => sections.push(Section {
                title: "GPS Coverage Statistics",
                headers: vec!["total_events", "events_with_coordinates", "coverage_percent"],
                rows: vec![vec![
                    coverage.total.to_string(),
                    coverage.with_coordinates.to_string(),
                    format!("{:.2}", coverage.coverage_percent),
                ]],
            }),
            Err(e) => warn!(error = %e, "Coverage query failed"),
        }

        match self.summary_statistics().await {
            Ok(stats) => sections.push(stats.section()),
            Err(e) => warn!(error = %e, "Summary statistics query failed"),
        }

        sections
    }
}

/// Render sections as titled text tables
pub fn render_report(sections: &[Section]) -> String {
    let mut out = String::new();

    for section in sections {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(section.headers.clone());
        for row in &section.rows {
            table.add_row(row.clone());
        }

        out.push_str(section.title);
        out.push('\n');
        out.push_str(&table.to_string());
        out.push_str("\n\n");
    }

    out
}

/// Connect to the warehouse and build the full report text
pub async fn run_report(config: &Config) -> Result<String> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;

    let sections = ReportQueries::new(&pool, &config.report_table)?.sections().await;
    pool.close().await;

    info!(sections = sections.len(), table = %config.report_table, "Report generated");
    Ok(render_report(&sections))
}
