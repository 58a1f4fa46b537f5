//! Conversation sessions
//!
//! A session is the position of one user inside a multi-step flow together
//! with the input collected so far. Each variant carries exactly the data
//! its next step needs, so a half-finished form cannot be in an impossible
//! state. Sessions are keyed by the sender's numeric Telegram id.

use async_trait::async_trait;
use chrono::NaiveDate;
use sdk::{ReminderPolicy, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::db::Handle;

/// Position inside the add-manager / add-user flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum EnrollStage {
    AwaitingHandle,
    AwaitingName { handle: Handle },
    AwaitingPosition { handle: Handle, name: String },
}

/// Task fields collected before the reminder step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub deadline: NaiveDate,
}

/// Position inside the task-creation flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum TaskStage {
    AwaitingTitle,
    AwaitingDescription {
        title: String,
    },
    AwaitingDeadline {
        title: String,
        description: String,
    },
    AwaitingReminder {
        draft: TaskDraft,
    },
    AwaitingAssignee {
        draft: TaskDraft,
        reminder: ReminderPolicy,
    },
}

/// Audience of a submitted report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Member reporting to their manager
    Team,
    /// Manager reporting to the admin; content carries a marker prefix
    Manager,
}

/// One user's in-progress flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum Session {
    /// Add a manager (`role = Manager`) or a team member (`role = Member`)
    Enroll { role: Role, stage: EnrollStage },
    CreateTask { stage: TaskStage },
    Report { kind: ReportKind },
    Score { report_id: i64 },
}

impl Session {
    pub fn add_manager() -> Self {
        Session::Enroll {
            role: Role::Manager,
            stage: EnrollStage::AwaitingHandle,
        }
    }

    pub fn add_member() -> Self {
        Session::Enroll {
            role: Role::Member,
            stage: EnrollStage::AwaitingHandle,
        }
    }

    pub fn create_task() -> Self {
        Session::CreateTask {
            stage: TaskStage::AwaitingTitle,
        }
    }

    /// Flow name used in logs
    pub fn flow(&self) -> &'static str {
        match self {
            Session::Enroll {
                role: Role::Manager,
                ..
            } => "add_manager",
            Session::Enroll { .. } => "add_user",
            Session::CreateTask { .. } => "create_task",
            Session::Report {
                kind: ReportKind::Team,
            } => "report",
            Session::Report {
                kind: ReportKind::Manager,
            } => "manager_report",
            Session::Score { .. } => "score",
        }
    }
}

/// Storage for per-user sessions
///
/// Starting a flow overwrites whatever session the user had.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user: i64) -> Option<Session>;
    async fn set(&self, user: i64, session: Session);
    async fn clear(&self, user: i64);
}

/// Process-local session store; sessions do not survive a restart
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<i64, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users currently inside a flow
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user: i64) -> Option<Session> {
        self.sessions.lock().await.get(&user).cloned()
    }

    async fn set(&self, user: i64, session: Session) {
        self.sessions.lock().await.insert(user, session);
    }

    async fn clear(&self, user: i64) {
        self.sessions.lock().await.remove(&user);
    }
}
