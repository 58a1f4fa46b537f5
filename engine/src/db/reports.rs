/// Report ledger
///
/// Freeform work reports and the scores supervisors attach to them. Range
/// checks on scores happen at the conversation boundary; the ledger stores
/// whatever [`Score`] it is handed.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sdk::Score;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Maximum number of reports returned by a listing
pub const REPORT_PAGE_SIZE: i64 = 20;

/// Report record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    /// Kept for schema compatibility; no flow links a report to a task
    pub task_id: Option<i64>,
    pub author_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub score: Option<Score>,
}

/// Report joined with its author's display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub author_name: String,
}

const REPORT_COLUMNS: &str = "r.id, r.task_id, r.user_id, r.content, r.timestamp, r.score";

fn report_from_row(row: &SqliteRow) -> std::result::Result<Report, sqlx::Error> {
    let score: Option<i64> = row.try_get("score")?;
    let score = score
        .map(|s| {
            u8::try_from(s)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))
                .and_then(|s| Score::new(s).map_err(|e| sqlx::Error::Decode(Box::new(e))))
        })
        .transpose()?;

    Ok(Report {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        author_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
        score,
    })
}

fn view_from_row(row: &SqliteRow) -> std::result::Result<ReportView, sqlx::Error> {
    Ok(ReportView {
        report: report_from_row(row)?,
        author_name: row.try_get("author_name")?,
    })
}

/// Report repository for database operations
#[derive(Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Create a new report repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a report and return its id
    pub async fn submit(
        &self,
        task_id: Option<i64>,
        author_id: i64,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO reports (task_id, user_id, content, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(author_id)
        .bind(content)
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .context("Failed to create report")?;

        Ok(result.last_insert_rowid())
    }

    /// Attach a score, replacing any earlier one; returns whether the report exists
    pub async fn rate(&self, report_id: i64, score: Score) -> Result<bool> {
        let result = sqlx::query("UPDATE reports SET score = ? WHERE id = ?")
            .bind(i64::from(score.value()))
            .bind(report_id)
            .execute(&self.pool)
            .await
            .context("Failed to rate report")?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a report by id
    pub async fn get(&self, report_id: i64) -> Result<Option<Report>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reports r WHERE r.id = ?",
            REPORT_COLUMNS
        ))
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch report")?;

        row.as_ref()
            .map(report_from_row)
            .transpose()
            .context("Failed to decode report")
    }

    /// Reports visible to a supervisor, newest first
    ///
    /// With `include_all_below_admin` every report by a manager or member is
    /// returned; otherwise only reports by members directly supervised by
    /// `supervisor_id`.
    pub async fn for_supervisor(
        &self,
        supervisor_id: i64,
        include_all_below_admin: bool,
    ) -> Result<Vec<ReportView>> {
        let result = if include_all_below_admin {
            sqlx::query(&format!(
                "SELECT {}, u.name AS author_name FROM reports r JOIN users u ON r.user_id = u.id \
                 WHERE u.role IN ('manager', 'member') \
                 ORDER BY r.timestamp DESC, r.id DESC LIMIT ?",
                REPORT_COLUMNS
            ))
            .bind(REPORT_PAGE_SIZE)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(&format!(
                "SELECT {}, u.name AS author_name FROM reports r JOIN users u ON r.user_id = u.id \
                 WHERE u.supervisor_id = ? AND u.role = 'member' \
                 ORDER BY r.timestamp DESC, r.id DESC LIMIT ?",
                REPORT_COLUMNS
            ))
            .bind(supervisor_id)
            .bind(REPORT_PAGE_SIZE)
            .fetch_all(&self.pool)
            .await
        };
        let rows = result.context("Failed to fetch reports for supervisor")?;

        rows.iter()
            .map(view_from_row)
            .collect::<std::result::Result<_, _>>()
            .context("Failed to decode reports")
    }

    /// Reports written by one author, newest first
    pub async fn for_author(&self, author_id: i64) -> Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM reports r WHERE r.user_id = ? \
             ORDER BY r.timestamp DESC, r.id DESC LIMIT ?",
            REPORT_COLUMNS
        ))
        .bind(author_id)
        .bind(REPORT_PAGE_SIZE)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch reports for author")?;

        rows.iter()
            .map(report_from_row)
            .collect::<std::result::Result<_, _>>()
            .context("Failed to decode reports")
    }
}
