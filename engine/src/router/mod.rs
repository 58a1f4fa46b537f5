//! Menu/Command Router
//!
//! Resolves the sender, then routes one inbound event:
//! 1. the cancel trigger clears any flow;
//! 2. `/start` registers (bootstrap or reconcile) and shows the role menu;
//! 3. `/score <id>` opens the scoring flow, abandoning any other flow;
//! 4. a pending flow step takes the text as its input, even when it reads
//!    like a menu label;
//! 5. a menu label runs its action once the capability table allows it;
//! 6. anything else gets a hint and the menu.
//!
//! Errors never reach the transport: they are logged and answered with a
//! failure message, leaving the session as it was.

pub mod capability;
pub mod views;

use anyhow::Result;
use sdk::{Reply, Role};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::bot::{Inbound, Sender};
use crate::conversation::parse::parse_report_id;
use crate::conversation::{ConversationEngine, ReportKind, Session, SessionStore};
use crate::db::users::normalize_username;
use crate::db::{Database, Registration, ReportRepository, TaskRepository, User, UserRepository};
use crate::texts;

use capability::{menu, Action};

/// Everything to send back for one inbound event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub replies: Vec<Reply>,
    /// Acknowledgement text for a button press
    pub notice: Option<String>,
}

impl Response {
    pub fn reply(reply: Reply) -> Self {
        Self {
            replies: vec![reply],
            notice: None,
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            replies: Vec::new(),
            notice: Some(text.into()),
        }
    }
}

/// Bot command with its arguments, `/cmd@botname` accepted
fn command(text: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or(head);
    Some((name, parts.collect()))
}

fn welcome(role: Role) -> &'static str {
    match role {
        Role::Admin => texts::WELCOME_ADMIN,
        Role::Manager => texts::WELCOME_MANAGER,
        Role::Member => texts::WELCOME_MEMBER,
    }
}

fn with_menu(text: &str, role: Role) -> Response {
    Response::reply(Reply::with_keyboard(text, menu(role)))
}

fn plain(text: &str) -> Response {
    Response::reply(Reply::text(text))
}

/// Entry point for every inbound event
#[derive(Clone)]
pub struct Router {
    users: UserRepository,
    tasks: TaskRepository,
    reports: ReportRepository,
    engine: ConversationEngine,
}

impl Router {
    pub fn new(db: &Database, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            users: db.users(),
            tasks: db.tasks(),
            reports: db.reports(),
            engine: ConversationEngine::new(db, sessions),
        }
    }

    pub fn engine(&self) -> &ConversationEngine {
        &self.engine
    }

    /// Route one event; never fails
    pub async fn dispatch(&self, inbound: &Inbound) -> Response {
        let sender = inbound.sender();
        let result = match inbound {
            Inbound::Text { text, .. } => {
                info!("Text from {}", sender.id);
                self.on_text(sender, text).await
            }
            Inbound::Callback { data, .. } => {
                info!("Callback from {}", sender.id);
                self.on_callback(sender, data).await
            }
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to handle event from {}: {:#}", sender.id, e);
                let mut response = plain(texts::FAILURE);
                if matches!(inbound, Inbound::Callback { .. }) {
                    response.notice = Some(texts::FAILURE.to_string());
                }
                response
            }
        }
    }

    async fn on_text(&self, sender: &Sender, text: &str) -> Result<Response> {
        let text = text.trim();

        if text == texts::BTN_CANCEL || matches!(command(text), Some(("cancel", _))) {
            return self.cancel(sender).await;
        }

        match command(text) {
            Some(("start", _)) => return self.start(sender).await,
            Some(("score", args)) => return self.score(sender, &args).await,
            _ => {}
        }

        let Some(user) = self.users.identify(sender.id).await? else {
            if let Some(session) = self.engine.session(sender.id).await {
                warn!("User {} has a {} session but no record", sender.id, session.flow());
                self.engine.cancel(sender.id).await;
            }
            return Ok(plain(texts::NOT_REGISTERED));
        };

        if let Some(session) = self.engine.session(sender.id).await {
            return self.engine.advance_text(sender.id, &user, session, text).await;
        }

        match Action::from_label(text) {
            Some(action) => self.run(sender, &user, action).await,
            None => Ok(with_menu(texts::UNKNOWN_INPUT, user.role)),
        }
    }

    async fn on_callback(&self, sender: &Sender, data: &str) -> Result<Response> {
        let Some(user) = self.users.identify(sender.id).await? else {
            self.engine.cancel(sender.id).await;
            let mut response = plain(texts::NOT_REGISTERED);
            response.notice = Some(texts::NOT_REGISTERED.to_string());
            return Ok(response);
        };
        self.engine.advance_callback(sender.id, &user, data).await
    }

    async fn cancel(&self, sender: &Sender) -> Result<Response> {
        self.engine.cancel(sender.id).await;
        Ok(match self.users.identify(sender.id).await? {
            Some(user) => with_menu(texts::CANCELLED, user.role),
            None => plain(texts::CANCELLED),
        })
    }

    /// Register or reconcile the sender and greet with the role menu
    ///
    /// A known sender is left as is. An unknown sender whose username
    /// matches an unclaimed placeholder takes over that record, keeping the
    /// name, role and supervisor it was given.
    async fn start(&self, sender: &Sender) -> Result<Response> {
        self.engine.cancel(sender.id).await;

        let user = match self.users.identify(sender.id).await? {
            Some(user) => user,
            None => self.register(sender).await?,
        };

        info!("User {} started as {}", sender.id, user.role);
        Ok(with_menu(welcome(user.role), user.role))
    }

    async fn register(&self, sender: &Sender) -> Result<User> {
        let username = normalize_username(sender.username.as_deref());
        let placeholder = match username.as_deref() {
            Some(username) => self
                .users
                .identify_by_name(username)
                .await?
                .filter(User::is_placeholder),
            None => None,
        };

        let registration = match placeholder {
            Some(placeholder) => {
                info!("Reconciling placeholder {} with {}", placeholder.id, sender.id);
                Registration {
                    telegram_id: Some(sender.id),
                    username,
                    name: placeholder.name,
                    role: placeholder.role,
                    supervisor_id: placeholder.supervisor_id,
                }
            }
            None => Registration::first_contact(
                sender.id,
                username.as_deref(),
                &sender.full_name,
            ),
        };

        self.users.register(registration).await
    }

    async fn score(&self, sender: &Sender, args: &[&str]) -> Result<Response> {
        let Some(user) = self.users.identify(sender.id).await? else {
            return Ok(plain(texts::NOT_REGISTERED));
        };
        if !Action::Score.permits(user.role) {
            warn!("User {} ({}) denied {:?}", sender.id, user.role, Action::Score);
            return Ok(with_menu(Action::Score.rejection(), user.role));
        }

        let report_id = match args {
            [arg] => parse_report_id(arg).ok(),
            _ => None,
        };
        let Some(report_id) = report_id else {
            return Ok(plain(texts::SCORE_USAGE));
        };

        let Some(report) = self.reports.get(report_id).await? else {
            return Ok(plain(texts::REPORT_NOT_FOUND));
        };
        let Some(author) = self.users.get(report.author_id).await? else {
            return Ok(plain(texts::REPORT_NOT_FOUND));
        };

        let allowed = match user.role {
            Role::Admin => author.role != Role::Admin,
            _ => author.supervisor_id == Some(user.id),
        };
        if !allowed {
            warn!("User {} may not score report {}", sender.id, report_id);
            return Ok(with_menu(texts::SCORE_NOT_ALLOWED, user.role));
        }

        Ok(self
            .engine
            .begin(sender.id, user.role, Session::Score { report_id })
            .await)
    }

    /// Run a menu action after the capability check
    async fn run(&self, sender: &Sender, user: &User, action: Action) -> Result<Response> {
        if !action.permits(user.role) {
            warn!("User {} ({}) denied {:?}", sender.id, user.role, action);
            return Ok(with_menu(action.rejection(), user.role));
        }

        let response = match action {
            Action::AddManager => {
                self.engine
                    .begin(sender.id, user.role, Session::add_manager())
                    .await
            }
            Action::AddUser => {
                self.engine
                    .begin(sender.id, user.role, Session::add_member())
                    .await
            }
            Action::CreateTask => {
                self.engine
                    .begin(sender.id, user.role, Session::create_task())
                    .await
            }
            Action::SubmitReport => {
                self.engine
                    .begin(
                        sender.id,
                        user.role,
                        Session::Report {
                            kind: ReportKind::Team,
                        },
                    )
                    .await
            }
            Action::SubmitManagerReport => {
                self.engine
                    .begin(
                        sender.id,
                        user.role,
                        Session::Report {
                            kind: ReportKind::Manager,
                        },
                    )
                    .await
            }
            Action::ViewActiveTasks => {
                let tasks = self.tasks.active_tasks_for(sender.id).await?;
                plain(&views::active_tasks(&tasks))
            }
            Action::ViewReports => {
                let reports = self
                    .reports
                    .for_supervisor(user.id, user.role == Role::Admin)
                    .await?;
                plain(&views::supervisor_reports(&reports))
            }
            Action::MyReports => {
                let reports = self.reports.for_author(user.id).await?;
                plain(&views::own_reports(&reports))
            }
            Action::ListUsers => {
                let mut teams = Vec::new();
                for manager in self.users.list_by_role(Role::Manager).await? {
                    let members = self.users.team_of(manager.id).await?;
                    teams.push((manager, members));
                }
                plain(&views::user_tree(&teams))
            }
            Action::ListTeam => {
                let members = self.users.team_of(user.id).await?;
                plain(&views::team(&members))
            }
            Action::Score => plain(texts::SCORE_USAGE),
        };
        Ok(response)
    }
}
