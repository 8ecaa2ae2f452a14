//! History of rollover runs.

use chrono::{NaiveDate, NaiveDateTime};

use tally_core::{DateRange, Issue, RunReport};

use crate::db::DbPool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: NaiveDateTime,
    pub today: NaiveDate,
    pub periods_created: Vec<DateRange>,
    pub issues: Vec<Issue>,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

fn from_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(text).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub async fn record_run(
    pool: &DbPool,
    started_at: NaiveDateTime,
    today: NaiveDate,
    report: &RunReport,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO runs (started_at, today, periods_created, issues_json) VALUES (?, ?, ?, ?)",
    )
    .bind(started_at)
    .bind(today)
    .bind(to_json(&report.periods_created)?)
    .bind(to_json(&report.issues)?)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent first.
pub async fn recent_runs(pool: &DbPool, limit: u32) -> Result<Vec<RunRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, NaiveDateTime, NaiveDate, String, String)>(
        "SELECT id, started_at, today, periods_created, issues_json FROM runs ORDER BY id DESC LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, started_at, today, periods, issues)| {
            Ok(RunRecord {
                id,
                started_at,
                today,
                periods_created: from_json(&periods)?,
                issues: from_json(&issues)?,
            })
        })
        .collect()
}
