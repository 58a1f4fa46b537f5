/// Task registry
///
/// Task definitions and their assignment. The registry does not check that
/// the assignee is reachable from the creator; the conversation layer only
/// ever offers valid candidates.
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sdk::ReminderPolicy;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub assigned_by: i64,
    pub assigned_to: i64,
    pub deadline: NaiveDate,
    pub reminder: ReminderPolicy,
    pub is_done: bool,
    /// Carried in the schema; no flow sets it
    pub is_urgent: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields collected by the task-creation flow
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub creator_id: i64,
    pub assignee_id: i64,
    pub deadline: NaiveDate,
    pub reminder: ReminderPolicy,
    pub created_at: DateTime<Utc>,
}

/// Open task together with the person it is assigned to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveTask {
    #[serde(flatten)]
    pub task: Task,
    pub assignee_name: String,
    pub assignee_telegram_id: Option<i64>,
}

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.assigned_by, t.assigned_to, \
     t.deadline, t.reminder_type, t.reminder_value, t.is_done, t.is_urgent, t.created_at";

fn task_from_row(row: &SqliteRow) -> std::result::Result<Task, sqlx::Error> {
    let reminder_type: String = row.try_get("reminder_type")?;
    let reminder_value: Option<i64> = row.try_get("reminder_value")?;

    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        assigned_by: row.try_get("assigned_by")?,
        assigned_to: row.try_get("assigned_to")?,
        deadline: row.try_get("deadline")?,
        reminder: ReminderPolicy::from_columns(&reminder_type, reminder_value),
        is_done: row.try_get("is_done")?,
        is_urgent: row.try_get("is_urgent")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Task repository for database operations
#[derive(Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    /// Create a new task repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new task and return its id
    pub async fn create_task(&self, task: &NewTask) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO tasks (title, description, assigned_by, assigned_to, deadline, \
             reminder_type, reminder_value, is_urgent, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.creator_id)
        .bind(task.assignee_id)
        .bind(task.deadline)
        .bind(task.reminder.kind().as_str())
        .bind(task.reminder.magnitude().map(i64::from))
        .bind(task.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create task")?;

        Ok(result.last_insert_rowid())
    }

    /// Get a task by id
    pub async fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks t WHERE t.id = ?", TASK_COLUMNS))
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch task")?;

        row.as_ref()
            .map(task_from_row)
            .transpose()
            .context("Failed to decode task")
    }

    /// Open tasks assigned to the user with this Telegram id
    pub async fn active_tasks_for(&self, telegram_id: i64) -> Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks t JOIN users u ON u.id = t.assigned_to \
             WHERE u.telegram_id = ? AND t.is_done = 0 ORDER BY t.id",
            TASK_COLUMNS
        ))
        .bind(telegram_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active tasks")?;

        rows.iter()
            .map(task_from_row)
            .collect::<std::result::Result<_, _>>()
            .context("Failed to decode tasks")
    }

    /// Every open task with its assignee
    pub async fn all_active(&self) -> Result<Vec<ActiveTask>> {
        let rows = sqlx::query(&format!(
            "SELECT {}, u.name AS assignee_name, u.telegram_id AS assignee_telegram_id \
             FROM tasks t JOIN users u ON u.id = t.assigned_to \
             WHERE t.is_done = 0 ORDER BY t.deadline, t.id",
            TASK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch open tasks")?;

        rows.iter()
            .map(|r| {
                Ok(ActiveTask {
                    task: task_from_row(r)?,
                    assignee_name: r.try_get("assignee_name")?,
                    assignee_telegram_id: r.try_get("assignee_telegram_id")?,
                })
            })
            .collect::<std::result::Result<_, sqlx::Error>>()
            .context("Failed to decode tasks")
    }

    /// Mark a task as done; returns whether the task exists
    ///
    /// Idempotent: marking a finished task again changes nothing.
    pub async fn mark_done(&self, task_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE tasks SET is_done = 1 WHERE id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .context("Failed to mark task as done")?;

        Ok(result.rows_affected() > 0)
    }
}
