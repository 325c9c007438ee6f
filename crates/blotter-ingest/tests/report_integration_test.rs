//! Report queries against a real fact table
//!
//! Run with `cargo test -- --ignored` when Docker is available.

mod common;

use blotter_ingest::report::{render_report, ReportQueries};
use common::TestPostgres;

async fn seed_fact_table(pg: &TestPostgres) {
    sqlx::query(
        r#"
        CREATE TABLE fct_police_events (
            type TEXT,
            event_hour INT,
            day_of_week INT,
            location TEXT,
            latitude DOUBLE PRECISION,
            longitude DOUBLE PRECISION
        )
        "#,
    )
    .execute(pg.pool())
    .await
    .expect("create fact table");

    sqlx::query(
        r#"
        INSERT INTO fct_police_events VALUES
            ('Rån', 21, 2, 'Stockholm', 59.33, 18.06),
            ('Rån', 22, 2, 'Stockholm', 59.33, 18.06),
            ('Trafikolycka', 8, 6, 'Malmö', NULL, NULL)
        "#,
    )
    .execute(pg.pool())
    .await
    .expect("seed fact table");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_all_sections_render_from_fact_table() {
    let pg = TestPostgres::start().await.expect("postgres container");
    seed_fact_table(&pg).await;

    let queries = ReportQueries::new(pg.pool(), "fct_police_events").expect("valid table");
    let sections = queries.sections().await;

    let titles: Vec<&str> = sections.iter().map(|s| s.title).collect();
    assert_eq!(
        titles,
        vec![
            "Events by Type",
            "Events by Hour of Day",
            "Events by Day of Week",
            "Top 10 Locations",
            "GPS Coverage Statistics",
            "Summary Statistics",
        ]
    );

    let summary = &sections[5];
    assert_eq!(summary.rows, vec![vec!["3".to_string(), "2".to_string()]]);

    let coverage = &sections[4];
    assert_eq!(coverage.rows[0][2], "66.67");

    let text = render_report(&sections);
    assert!(text.contains("Monday"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_missing_fact_table_yields_empty_report() {
    let pg = TestPostgres::start().await.expect("postgres container");

    let queries = ReportQueries::new(pg.pool(), "mart.fct_police_events").expect("valid table");

    assert!(queries.sections().await.is_empty());
}
