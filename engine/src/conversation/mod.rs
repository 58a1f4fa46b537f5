//! Conversation Engine
//!
//! Drives the multi-step forms: add manager, add user, create task, submit
//! report and score report. Each flow is a linear chain of steps stored in a
//! [`SessionStore`]; the last step commits to the Directory, the Task Registry
//! or the Report Ledger.
//!
//! The engine never writes a session until the persistence call of that step
//! has succeeded, so a failed commit leaves the user on the same step.
//! Callers are expected to have checked the capability table already.

pub mod calendar;
pub mod parse;
pub mod session;

use anyhow::Result;
use chrono::Utc;
use sdk::{InlineButton, Keyboard, Reply, Role};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{
    Database, Handle, NewTask, Registration, ReportRepository, TaskRepository, User,
    UserRepository,
};
use crate::router::capability::{cancel_menu, menu};
use crate::router::Response;
use crate::texts;

pub use parse::ParseError;
pub use session::{
    EnrollStage, InMemorySessionStore, ReportKind, Session, SessionStore, TaskDraft, TaskStage,
};

/// Prompt with the cancel keyboard, step unchanged
fn reprompt(text: &str) -> Response {
    Response::reply(Reply::with_keyboard(text, cancel_menu()))
}

/// Prompt that opens the step `session` points at
fn prompt(session: &Session, caller_role: Role) -> &'static str {
    match session {
        Session::Enroll { role, stage } => {
            let manager = *role == Role::Manager;
            match (stage, manager) {
                (EnrollStage::AwaitingHandle, true) => texts::ASK_MANAGER_HANDLE,
                (EnrollStage::AwaitingHandle, false) => texts::ASK_MEMBER_HANDLE,
                (EnrollStage::AwaitingName { .. }, true) => texts::ASK_MANAGER_NAME,
                (EnrollStage::AwaitingName { .. }, false) => texts::ASK_MEMBER_NAME,
                (EnrollStage::AwaitingPosition { .. }, true) => texts::ASK_MANAGER_POSITION,
                (EnrollStage::AwaitingPosition { .. }, false) => texts::ASK_MEMBER_POSITION,
            }
        }
        Session::CreateTask { stage } => match stage {
            TaskStage::AwaitingTitle => texts::ASK_TASK_TITLE,
            TaskStage::AwaitingDescription { .. } => texts::ASK_TASK_DESCRIPTION,
            TaskStage::AwaitingDeadline { .. } => texts::ASK_DEADLINE,
            TaskStage::AwaitingReminder { .. } => texts::ASK_REMINDER,
            TaskStage::AwaitingAssignee { .. } if caller_role == Role::Admin => {
                texts::ASK_ASSIGNEE_MANAGER
            }
            TaskStage::AwaitingAssignee { .. } => texts::ASK_ASSIGNEE_MEMBER,
        },
        Session::Report {
            kind: ReportKind::Team,
        } => texts::ASK_REPORT,
        Session::Report {
            kind: ReportKind::Manager,
        } => texts::ASK_MANAGER_REPORT,
        Session::Score { .. } => texts::ASK_SCORE,
    }
}

/// Message with one button per assignee candidate
fn assignee_prompt(caller_role: Role, session: &Session, candidates: &[User]) -> Reply {
    let buttons = candidates.iter().filter_map(|candidate| {
        parse::assignee_token(caller_role, candidate.id)
            .map(|token| InlineButton::new(candidate.name.clone(), token))
    });
    Reply::with_keyboard(
        prompt(session, caller_role),
        Keyboard::inline_column(buttons),
    )
}

/// Per-user state machine over the three stores
#[derive(Clone)]
pub struct ConversationEngine {
    users: UserRepository,
    tasks: TaskRepository,
    reports: ReportRepository,
    sessions: Arc<dyn SessionStore>,
}

impl ConversationEngine {
    pub fn new(db: &Database, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            users: db.users(),
            tasks: db.tasks(),
            reports: db.reports(),
            sessions,
        }
    }

    /// Current session of a sender, if any
    pub async fn session(&self, sender: i64) -> Option<Session> {
        self.sessions.get(sender).await
    }

    /// Start a flow, discarding whatever flow the sender was in
    pub async fn begin(&self, sender: i64, caller_role: Role, session: Session) -> Response {
        if let Some(previous) = self.sessions.get(sender).await {
            debug!(
                "User {} abandons {} to start {}",
                sender,
                previous.flow(),
                session.flow()
            );
        }
        info!("User {} started {}", sender, session.flow());
        self.step(sender, caller_role, session).await
    }

    /// Drop the sender's session
    pub async fn cancel(&self, sender: i64) {
        if let Some(session) = self.sessions.get(sender).await {
            info!("User {} cancelled {}", sender, session.flow());
        }
        self.sessions.clear(sender).await;
    }

    /// Feed a text message into the sender's current step
    pub async fn advance_text(
        &self,
        sender: i64,
        caller: &User,
        session: Session,
        text: &str,
    ) -> Result<Response> {
        match session {
            Session::Enroll { role, stage } => {
                self.advance_enroll(sender, caller, role, stage, text).await
            }
            Session::CreateTask { stage } => self.advance_task(sender, caller, stage, text).await,
            Session::Report { kind } => self.commit_report(sender, caller, kind, text).await,
            Session::Score { report_id } => {
                self.commit_score(sender, caller, report_id, text).await
            }
        }
    }

    /// Handle an inline button press
    ///
    /// Only assignee buttons exist. A token that does not match the caller's
    /// role or the current candidates is answered with a notice and leaves
    /// the session untouched.
    pub async fn advance_callback(
        &self,
        sender: i64,
        caller: &User,
        data: &str,
    ) -> Result<Response> {
        let Some(Session::CreateTask {
            stage: TaskStage::AwaitingAssignee { draft, reminder },
        }) = self.sessions.get(sender).await
        else {
            debug!("User {} pressed a button outside assignee selection", sender);
            return Ok(Response::notice(texts::STALE_BUTTON));
        };

        let Some(assignee_id) = parse::parse_assignee_token(caller.role, data) else {
            warn!("User {} sent assignee token '{}' not valid for role {}", sender, data, caller.role);
            return Ok(Response::notice(texts::BAD_ASSIGNEE));
        };

        let candidates = self.candidates(caller).await?;
        if !candidates.iter().any(|c| c.id == assignee_id) {
            warn!("User {} picked {} who is not an assignee candidate", sender, assignee_id);
            return Ok(Response::notice(texts::BAD_ASSIGNEE));
        }

        let task_id = self
            .tasks
            .create_task(&NewTask {
                title: draft.title,
                description: draft.description,
                creator_id: caller.id,
                assignee_id,
                deadline: draft.deadline,
                reminder,
                created_at: Utc::now(),
            })
            .await?;

        info!("User {} created task {} for user {}", sender, task_id, assignee_id);
        Ok(self.finish(sender, caller.role, texts::TASK_CREATED).await)
    }

    async fn advance_enroll(
        &self,
        sender: i64,
        caller: &User,
        role: Role,
        stage: EnrollStage,
        text: &str,
    ) -> Result<Response> {
        match stage {
            EnrollStage::AwaitingHandle => {
                let handle = match parse::parse_handle(text) {
                    Ok(handle) => handle,
                    Err(e) => {
                        debug!("User {}: {}", sender, e);
                        return Ok(reprompt(texts::BAD_HANDLE));
                    }
                };
                if !self.may_enroll(caller, &handle).await? {
                    warn!("User {} tried to enroll protected handle {:?}", sender, handle);
                    return Ok(reprompt(texts::HANDLE_NOT_ALLOWED));
                }
                let next = Session::Enroll {
                    role,
                    stage: EnrollStage::AwaitingName { handle },
                };
                Ok(self.step(sender, caller.role, next).await)
            }
            EnrollStage::AwaitingName { handle } => {
                let name = text.trim();
                if name.is_empty() {
                    let current = Session::Enroll {
                        role,
                        stage: EnrollStage::AwaitingName { handle },
                    };
                    return Ok(reprompt(prompt(&current, caller.role)));
                }
                let next = Session::Enroll {
                    role,
                    stage: EnrollStage::AwaitingPosition {
                        handle,
                        name: name.to_string(),
                    },
                };
                Ok(self.step(sender, caller.role, next).await)
            }
            EnrollStage::AwaitingPosition { handle, name } => {
                let position = text.trim();
                if position.is_empty() {
                    let current = Session::Enroll {
                        role,
                        stage: EnrollStage::AwaitingPosition { handle, name },
                    };
                    return Ok(reprompt(prompt(&current, caller.role)));
                }
                let full_name = format!("{} ({})", name, position);
                let user = self
                    .users
                    .register(Registration::provisioned(&handle, &full_name, role, caller.id))
                    .await?;

                info!(
                    "User {} enrolled user {} as {} under {}",
                    sender, user.id, user.role, caller.id
                );
                let done = match role {
                    Role::Manager => texts::MANAGER_ADDED,
                    _ => texts::MEMBER_ADDED,
                };
                Ok(self.finish(sender, caller.role, done).await)
            }
        }
    }

    async fn advance_task(
        &self,
        sender: i64,
        caller: &User,
        stage: TaskStage,
        text: &str,
    ) -> Result<Response> {
        let next = match stage {
            TaskStage::AwaitingTitle => {
                let title = text.trim();
                if title.is_empty() {
                    return Ok(reprompt(texts::ASK_TASK_TITLE));
                }
                TaskStage::AwaitingDescription {
                    title: title.to_string(),
                }
            }
            TaskStage::AwaitingDescription { title } => TaskStage::AwaitingDeadline {
                title,
                description: parse::parse_description(text),
            },
            TaskStage::AwaitingDeadline { title, description } => {
                match parse::parse_deadline(text) {
                    Ok(deadline) => TaskStage::AwaitingReminder {
                        draft: TaskDraft {
                            title,
                            description,
                            deadline,
                        },
                    },
                    Err(e) => {
                        debug!("User {}: {}", sender, e);
                        return Ok(reprompt(texts::BAD_DEADLINE));
                    }
                }
            }
            TaskStage::AwaitingReminder { draft } => {
                let reminder = match parse::parse_reminder(text) {
                    Ok(reminder) => reminder,
                    Err(e) => {
                        debug!("User {}: {}", sender, e);
                        let message = match e {
                            ParseError::ReminderHours => texts::BAD_REMINDER_HOURS,
                            _ => texts::BAD_REMINDER_DAYS,
                        };
                        return Ok(reprompt(message));
                    }
                };
                let next = Session::CreateTask {
                    stage: TaskStage::AwaitingAssignee { draft, reminder },
                };
                return self.offer_assignees(sender, caller, next).await;
            }
            stage @ TaskStage::AwaitingAssignee { .. } => {
                debug!("User {} typed text while choosing an assignee", sender);
                return self
                    .offer_assignees(sender, caller, Session::CreateTask { stage })
                    .await;
            }
        };

        Ok(self
            .step(sender, caller.role, Session::CreateTask { stage: next })
            .await)
    }

    /// Show the assignee buttons, or end the flow when nobody can be picked
    async fn offer_assignees(
        &self,
        sender: i64,
        caller: &User,
        session: Session,
    ) -> Result<Response> {
        let candidates = self.candidates(caller).await?;
        if candidates.is_empty() {
            info!("User {} has nobody to assign a task to", sender);
            let message = match caller.role {
                Role::Admin => texts::NO_MANAGERS,
                _ => texts::NO_TEAM_FOR_TASK,
            };
            return Ok(self.finish(sender, caller.role, message).await);
        }

        let reply = assignee_prompt(caller.role, &session, &candidates);
        self.sessions.set(sender, session).await;
        Ok(Response::reply(reply))
    }

    async fn commit_report(
        &self,
        sender: i64,
        caller: &User,
        kind: ReportKind,
        text: &str,
    ) -> Result<Response> {
        if text.trim().is_empty() {
            return Ok(reprompt(prompt(&Session::Report { kind }, caller.role)));
        }

        let content = match kind {
            ReportKind::Team => text.to_string(),
            ReportKind::Manager => format!("{}{}", texts::MANAGER_REPORT_MARKER, text),
        };
        let report_id = self
            .reports
            .submit(None, caller.id, &content, Utc::now())
            .await?;

        info!("User {} submitted report {}", sender, report_id);
        let done = match kind {
            ReportKind::Team => texts::REPORT_SAVED,
            ReportKind::Manager => texts::MANAGER_REPORT_SAVED,
        };
        Ok(self.finish(sender, caller.role, done).await)
    }

    async fn commit_score(
        &self,
        sender: i64,
        caller: &User,
        report_id: i64,
        text: &str,
    ) -> Result<Response> {
        let score = match parse::parse_score(text) {
            Ok(score) => score,
            Err(e) => {
                debug!("User {}: {}", sender, e);
                return Ok(reprompt(texts::BAD_SCORE));
            }
        };

        if !self.reports.rate(report_id, score).await? {
            warn!("Report {} disappeared before it was scored", report_id);
            return Ok(self.finish(sender, caller.role, texts::REPORT_NOT_FOUND).await);
        }

        info!("User {} scored report {} with {}", sender, report_id, score);
        Ok(self.finish(sender, caller.role, texts::SCORE_SAVED).await)
    }

    /// People the caller may assign a task to
    async fn candidates(&self, caller: &User) -> Result<Vec<User>> {
        match caller.role {
            Role::Admin => self.users.list_by_role(Role::Manager).await,
            Role::Manager => self.users.team_of(caller.id).await,
            Role::Member => Ok(Vec::new()),
        }
    }

    /// Whether re-adding the person behind `handle` keeps the hierarchy intact
    ///
    /// New handles are always fine. An existing record may not be the caller,
    /// the admin, or (for a manager caller) another manager.
    async fn may_enroll(&self, caller: &User, handle: &Handle) -> Result<bool> {
        let existing = match handle {
            Handle::Numeric(id) => self.users.identify(*id).await?,
            Handle::Display(username) => self.users.identify_by_name(username).await?,
        };

        Ok(match existing {
            None => true,
            Some(user) => {
                user.id != caller.id
                    && user.role != Role::Admin
                    && !(caller.role == Role::Manager && user.role == Role::Manager)
            }
        })
    }

    /// Store `session` and prompt for its step
    async fn step(&self, sender: i64, caller_role: Role, session: Session) -> Response {
        let text = prompt(&session, caller_role);
        self.sessions.set(sender, session).await;
        Response::reply(Reply::with_keyboard(text, cancel_menu()))
    }

    /// End the flow and return to the caller's menu
    async fn finish(&self, sender: i64, caller_role: Role, text: &str) -> Response {
        self.sessions.clear(sender).await;
        Response::reply(Reply::with_keyboard(text, menu(caller_role)))
    }
}
