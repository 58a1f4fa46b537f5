/// Integration tests for the conversation flows
///
/// Drives the router with the same events Telegram would deliver and checks
/// both the replies and what ends up in the database:
/// - admin bootstrap and placeholder reconciliation
/// - add manager / add user, including the hierarchy guard
/// - task creation with re-prompts and assignee buttons
/// - reports, manager reports and scoring
/// - cancel, flow replacement and role rejections
/// - pending steps taking precedence over menu labels
use chrono::NaiveDate;
use dozio_engine::bot::{Inbound, Sender};
use dozio_engine::conversation::{EnrollStage, InMemorySessionStore, Session, TaskStage};
use dozio_engine::db::{Database, User};
use dozio_engine::router::capability::{cancel_menu, menu};
use dozio_engine::router::{Response, Router};
use dozio_engine::texts;
use sdk::{InlineButton, Keyboard, ReminderPolicy, Role};
use std::sync::Arc;
use tempfile::TempDir;

const ADMIN: i64 = 1;
const MANAGER: i64 = 20;
const OTHER_MANAGER: i64 = 21;
const MEMBER: i64 = 300;

struct Harness {
    _dir: TempDir,
    db: Database,
    router: Router,
}

fn sender(id: i64, username: Option<&str>) -> Sender {
    Sender {
        id,
        username: username.map(str::to_string),
        full_name: format!("User {}", id),
    }
}

fn text_of(response: &Response) -> &str {
    response
        .replies
        .first()
        .map(|r| r.text.as_str())
        .unwrap_or_default()
}

fn keyboard_of(response: &Response) -> Option<&Keyboard> {
    response.replies.first().and_then(|r| r.keyboard.as_ref())
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("dozio.db")).await.unwrap();
        let router = Router::new(&db, Arc::new(InMemorySessionStore::new()));
        Self {
            _dir: dir,
            db,
            router,
        }
    }

    async fn say_as(&self, id: i64, username: Option<&str>, text: &str) -> Response {
        self.router
            .dispatch(&Inbound::Text {
                chat_id: id,
                sender: sender(id, username),
                text: text.to_string(),
            })
            .await
    }

    async fn say(&self, id: i64, text: &str) -> Response {
        self.say_as(id, None, text).await
    }

    async fn press(&self, id: i64, data: &str) -> Response {
        self.router
            .dispatch(&Inbound::Callback {
                chat_id: id,
                sender: sender(id, None),
                callback_id: format!("cb-{}", id),
                data: data.to_string(),
            })
            .await
    }

    async fn session(&self, id: i64) -> Option<Session> {
        self.router.engine().session(id).await
    }

    async fn user(&self, telegram_id: i64) -> User {
        self.db
            .users()
            .identify(telegram_id)
            .await
            .unwrap()
            .expect("user should be registered")
    }

    /// Walk the three enroll steps and return the final reply
    async fn enroll(&self, caller: i64, label: &str, handle: &str, name: &str, position: &str) -> Response {
        self.say(caller, label).await;
        self.say(caller, handle).await;
        self.say(caller, name).await;
        self.say(caller, position).await
    }

    /// Admin, one manager (registered), one member (registered)
    async fn with_team() -> Self {
        let h = Self::new().await;
        h.say(ADMIN, "/start").await;
        let added = h
            .enroll(ADMIN, texts::BTN_ADD_MANAGER, &MANAGER.to_string(), "Sara", "Sales")
            .await;
        assert_eq!(text_of(&added), texts::MANAGER_ADDED);
        h.say(MANAGER, "/start").await;

        let added = h
            .enroll(MANAGER, texts::BTN_ADD_USER, &MEMBER.to_string(), "Ali", "Support")
            .await;
        assert_eq!(text_of(&added), texts::MEMBER_ADDED);
        h.say(MEMBER, "/start").await;
        h
    }
}

#[tokio::test]
async fn test_first_start_bootstraps_admin() {
    let h = Harness::new().await;

    let response = h.say_as(ADMIN, Some("boss"), "/start").await;
    assert_eq!(text_of(&response), texts::WELCOME_ADMIN);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Admin)));

    let response = h.say(2, "/start").await;
    assert_eq!(text_of(&response), texts::WELCOME_MEMBER);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Member)));

    assert_eq!(h.user(ADMIN).await.role, Role::Admin);
    let second = h.user(2).await;
    assert_eq!(second.role, Role::Member);
    assert_eq!(second.supervisor_id, None);

    // A repeated /start changes nothing
    let response = h.say(ADMIN, "/start").await;
    assert_eq!(text_of(&response), texts::WELCOME_ADMIN);
    assert_eq!(h.db.users().list_by_role(Role::Admin).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_manager_added_by_username_is_reconciled_on_start() {
    let h = Harness::new().await;
    h.say(ADMIN, "/start").await;
    let admin = h.user(ADMIN).await;

    let response = h.say(ADMIN, texts::BTN_ADD_MANAGER).await;
    assert_eq!(text_of(&response), texts::ASK_MANAGER_HANDLE);
    assert_eq!(keyboard_of(&response), Some(&cancel_menu()));

    let response = h.say(ADMIN, "sara").await;
    assert_eq!(text_of(&response), texts::BAD_HANDLE);

    assert_eq!(text_of(&h.say(ADMIN, "@sara").await), texts::ASK_MANAGER_NAME);
    assert_eq!(text_of(&h.say(ADMIN, "Sara Ahmadi").await), texts::ASK_MANAGER_POSITION);

    let response = h.say(ADMIN, "Sales").await;
    assert_eq!(text_of(&response), texts::MANAGER_ADDED);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Admin)));
    assert!(h.session(ADMIN).await.is_none());

    let placeholder = h
        .db
        .users()
        .identify_by_name("sara")
        .await
        .unwrap()
        .unwrap();
    assert!(placeholder.is_placeholder());
    assert_eq!(placeholder.role, Role::Manager);
    assert_eq!(placeholder.supervisor_id, Some(admin.id));
    assert_eq!(placeholder.name, "Sara Ahmadi (Sales)");

    let response = h.say_as(MANAGER, Some("sara"), "/start").await;
    assert_eq!(text_of(&response), texts::WELCOME_MANAGER);

    let reconciled = h.user(MANAGER).await;
    assert_eq!(reconciled.id, placeholder.id);
    assert_eq!(reconciled.name, "Sara Ahmadi (Sales)");
    assert_eq!(reconciled.supervisor_id, Some(admin.id));
    assert!(!reconciled.is_placeholder());
}

#[tokio::test]
async fn test_create_task_end_to_end() {
    let h = Harness::new().await;
    h.say(ADMIN, "/start").await;
    h.enroll(ADMIN, texts::BTN_ADD_MANAGER, "20", "Sara", "Sales").await;
    let admin = h.user(ADMIN).await;
    let manager = h.user(MANAGER).await;

    assert_eq!(text_of(&h.say(ADMIN, texts::BTN_CREATE_TASK).await), texts::ASK_TASK_TITLE);
    assert_eq!(text_of(&h.say(ADMIN, "Q3 plan").await), texts::ASK_TASK_DESCRIPTION);
    assert_eq!(text_of(&h.say(ADMIN, "ندارد").await), texts::ASK_DEADLINE);

    // Khordad has 31 days
    assert_eq!(text_of(&h.say(ADMIN, "32 خرداد 1404").await), texts::BAD_DEADLINE);
    assert_eq!(text_of(&h.say(ADMIN, "۲۶ خرداد ۱۴۰۴").await), texts::ASK_REMINDER);

    assert_eq!(text_of(&h.say(ADMIN, "49 ساعت").await), texts::BAD_REMINDER_HOURS);
    assert_eq!(text_of(&h.say(ADMIN, "31 روز").await), texts::BAD_REMINDER_DAYS);

    let response = h.say(ADMIN, "3 روز").await;
    assert_eq!(text_of(&response), texts::ASK_ASSIGNEE_MANAGER);
    let token = format!("assign_mgr_{}", manager.id);
    assert_eq!(
        keyboard_of(&response),
        Some(&Keyboard::Inline(vec![vec![InlineButton::new(
            "Sara (Sales)",
            token.clone()
        )]]))
    );

    // Typed text re-offers the buttons
    let response = h.say(ADMIN, "Sara").await;
    assert_eq!(text_of(&response), texts::ASK_ASSIGNEE_MANAGER);
    assert!(matches!(
        h.session(ADMIN).await,
        Some(Session::CreateTask {
            stage: TaskStage::AwaitingAssignee { .. }
        })
    ));

    let response = h.press(ADMIN, &format!("assign_mem_{}", manager.id)).await;
    assert_eq!(response.notice.as_deref(), Some(texts::BAD_ASSIGNEE));
    assert!(response.replies.is_empty());

    let response = h.press(ADMIN, "assign_mgr_99999").await;
    assert_eq!(response.notice.as_deref(), Some(texts::BAD_ASSIGNEE));

    let response = h.press(ADMIN, &token).await;
    assert_eq!(text_of(&response), texts::TASK_CREATED);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Admin)));
    assert!(h.session(ADMIN).await.is_none());

    let tasks = h.db.tasks().active_tasks_for(MANAGER).await.unwrap();
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.title, "Q3 plan");
    assert_eq!(task.description, "");
    assert_eq!(task.deadline, NaiveDate::from_ymd_opt(2025, 6, 16).unwrap());
    assert_eq!(task.reminder, ReminderPolicy::Daily(3));
    assert_eq!(task.assigned_by, admin.id);
    assert!(!task.is_done);
    assert!(!task.is_urgent);

    // A second press of the same button finds no flow
    let response = h.press(ADMIN, &token).await;
    assert_eq!(response.notice.as_deref(), Some(texts::STALE_BUTTON));

    h.say(MANAGER, "/start").await;
    let response = h.say(MANAGER, texts::BTN_ACTIVE_TASKS).await;
    assert!(text_of(&response).contains("Q3 plan"));
    assert!(text_of(&response).contains("2025-06-16"));
}

#[tokio::test]
async fn test_task_flow_ends_when_nobody_can_be_assigned() {
    let h = Harness::new().await;
    h.say(ADMIN, "/start").await;

    h.say(ADMIN, texts::BTN_CREATE_TASK).await;
    h.say(ADMIN, "Budget").await;
    h.say(ADMIN, "Draft the budget").await;
    h.say(ADMIN, "1 فروردین 1403").await;
    let response = h.say(ADMIN, "فقط روز ددلاین").await;

    assert_eq!(text_of(&response), texts::NO_MANAGERS);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Admin)));
    assert!(h.session(ADMIN).await.is_none());
    assert!(h.db.tasks().all_active().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_manager_assigns_task_to_team_member() {
    let h = Harness::with_team().await;
    let member = h.user(MEMBER).await;

    h.say(MANAGER, texts::BTN_CREATE_TASK).await;
    h.say(MANAGER, "Fix login").await;
    h.say(MANAGER, "Users cannot log in").await;
    h.say(MANAGER, "10 مهر 1404").await;
    let response = h.say(MANAGER, "6 ساعت").await;
    assert_eq!(text_of(&response), texts::ASK_ASSIGNEE_MEMBER);

    // An admin-style token is refused for a manager
    let response = h.press(MANAGER, &format!("assign_mgr_{}", member.id)).await;
    assert_eq!(response.notice.as_deref(), Some(texts::BAD_ASSIGNEE));

    let response = h.press(MANAGER, &format!("assign_mem_{}", member.id)).await;
    assert_eq!(text_of(&response), texts::TASK_CREATED);

    let response = h.say(MEMBER, texts::BTN_ACTIVE_TASKS).await;
    assert!(text_of(&response).contains("Fix login"));

    let tasks = h.db.tasks().active_tasks_for(MEMBER).await.unwrap();
    assert_eq!(tasks[0].reminder, ReminderPolicy::Hourly(6));
}

#[tokio::test]
async fn test_member_report_is_scored_by_supervisor() {
    let h = Harness::with_team().await;
    let member = h.user(MEMBER).await;

    assert_eq!(text_of(&h.say(MEMBER, texts::BTN_SEND_REPORT).await), texts::ASK_REPORT);
    let response = h.say(MEMBER, "Finished the migration").await;
    assert_eq!(text_of(&response), texts::REPORT_SAVED);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Member)));

    let reports = h.db.reports().for_author(member.id).await.unwrap();
    assert_eq!(reports.len(), 1);
    let report_id = reports[0].id;
    assert_eq!(reports[0].score, None);

    let response = h.say(MANAGER, texts::BTN_VIEW_REPORTS).await;
    assert!(text_of(&response).contains("Finished the migration"));

    let score_cmd = format!("/score {}", report_id);
    assert_eq!(text_of(&h.say(MANAGER, &score_cmd).await), texts::ASK_SCORE);
    assert_eq!(text_of(&h.say(MANAGER, "۴").await), texts::BAD_SCORE);
    assert_eq!(text_of(&h.say(MANAGER, "6").await), texts::BAD_SCORE);
    assert_eq!(text_of(&h.say(MANAGER, "4").await), texts::SCORE_SAVED);

    let stored = h.db.reports().get(report_id).await.unwrap().unwrap();
    assert_eq!(stored.score.map(|s| s.value()), Some(4));

    // Scoring again overwrites
    h.say(MANAGER, &score_cmd).await;
    h.say(MANAGER, "2").await;
    let stored = h.db.reports().get(report_id).await.unwrap().unwrap();
    assert_eq!(stored.score.map(|s| s.value()), Some(2));

    let response = h.say(MEMBER, texts::BTN_MY_REPORTS).await;
    assert!(text_of(&response).contains("Finished the migration"));
    assert!(text_of(&response).contains("⭐ امتیاز: 2"));
}

#[tokio::test]
async fn test_score_authorization() {
    let h = Harness::with_team().await;
    let member = h.user(MEMBER).await;

    h.say(MEMBER, texts::BTN_SEND_REPORT).await;
    h.say(MEMBER, "Daily notes").await;
    let report_id = h.db.reports().for_author(member.id).await.unwrap()[0].id;
    let score_cmd = format!("/score {}", report_id);

    h.enroll(ADMIN, texts::BTN_ADD_MANAGER, &OTHER_MANAGER.to_string(), "Reza", "Ops")
        .await;
    h.say(OTHER_MANAGER, "/start").await;

    let response = h.say(OTHER_MANAGER, &score_cmd).await;
    assert_eq!(text_of(&response), texts::SCORE_NOT_ALLOWED);
    assert!(h.session(OTHER_MANAGER).await.is_none());

    // The admin may score anyone below them
    assert_eq!(text_of(&h.say(ADMIN, &score_cmd).await), texts::ASK_SCORE);
    h.say(ADMIN, texts::BTN_CANCEL).await;

    assert_eq!(text_of(&h.say(MANAGER, "/score").await), texts::SCORE_USAGE);
    assert_eq!(text_of(&h.say(MANAGER, "/score abc").await), texts::SCORE_USAGE);
    assert_eq!(text_of(&h.say(MANAGER, "/score 9999").await), texts::REPORT_NOT_FOUND);

    assert_eq!(text_of(&h.say(MEMBER, &score_cmd).await), texts::ONLY_MANAGERS);
}

#[tokio::test]
async fn test_manager_report_reaches_admin() {
    let h = Harness::with_team().await;
    let manager = h.user(MANAGER).await;

    assert_eq!(
        text_of(&h.say(MANAGER, texts::BTN_MANAGER_REPORT).await),
        texts::ASK_MANAGER_REPORT
    );
    let response = h.say(MANAGER, "Weekly summary").await;
    assert_eq!(text_of(&response), texts::MANAGER_REPORT_SAVED);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Manager)));

    let reports = h.db.reports().for_author(manager.id).await.unwrap();
    assert!(reports[0].content.starts_with(texts::MANAGER_REPORT_MARKER));
    assert!(reports[0].content.ends_with("Weekly summary"));

    let response = h.say(ADMIN, texts::BTN_VIEW_REPORTS).await;
    assert!(text_of(&response).contains("Weekly summary"));
}

#[tokio::test]
async fn test_wrong_role_is_rejected() {
    let h = Harness::with_team().await;

    let response = h.say(MEMBER, texts::BTN_ADD_MANAGER).await;
    assert_eq!(text_of(&response), texts::ONLY_ADMIN);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Member)));

    assert_eq!(text_of(&h.say(MEMBER, texts::BTN_CREATE_TASK).await), texts::ONLY_MANAGERS);
    assert_eq!(text_of(&h.say(MANAGER, texts::BTN_SEND_REPORT).await), texts::ONLY_MEMBERS);
    assert_eq!(text_of(&h.say(ADMIN, texts::BTN_LIST_TEAM).await), texts::ONLY_MANAGER);
    assert_eq!(text_of(&h.say(MANAGER, texts::BTN_LIST_USERS).await), texts::ONLY_ADMIN);

    assert!(h.session(MEMBER).await.is_none());
    assert!(h.session(MANAGER).await.is_none());
    assert!(h.session(ADMIN).await.is_none());
}

#[tokio::test]
async fn test_pending_step_takes_menu_label_as_input() {
    let h = Harness::with_team().await;

    h.say(ADMIN, texts::BTN_ADD_MANAGER).await;
    h.say(ADMIN, "@ghost").await;

    // The label is the name answer, not a new flow
    let response = h.say(ADMIN, texts::BTN_CREATE_TASK).await;
    assert_eq!(text_of(&response), texts::ASK_MANAGER_POSITION);
    assert!(matches!(
        h.session(ADMIN).await,
        Some(Session::Enroll {
            role: Role::Manager,
            stage: EnrollStage::AwaitingPosition { .. }
        })
    ));
}

#[tokio::test]
async fn test_new_flow_discards_previous_and_cancel_returns_to_menu() {
    let h = Harness::with_team().await;
    let member = h.user(MEMBER).await;

    h.say(MEMBER, texts::BTN_SEND_REPORT).await;
    h.say(MEMBER, "Done for today").await;
    let report_id = h.db.reports().for_author(member.id).await.unwrap()[0].id;

    h.say(ADMIN, texts::BTN_ADD_MANAGER).await;
    h.say(ADMIN, "@ghost").await;
    h.say(ADMIN, "Ghost").await;
    assert!(matches!(h.session(ADMIN).await, Some(Session::Enroll { .. })));

    let response = h.say(ADMIN, &format!("/score {}", report_id)).await;
    assert_eq!(text_of(&response), texts::ASK_SCORE);
    assert_eq!(h.session(ADMIN).await, Some(Session::Score { report_id }));

    let response = h.say(ADMIN, texts::BTN_CANCEL).await;
    assert_eq!(text_of(&response), texts::CANCELLED);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Admin)));
    assert!(h.session(ADMIN).await.is_none());

    // Nothing from the abandoned flows was stored
    assert!(h.db.users().identify_by_name("ghost").await.unwrap().is_none());
    let report = h.db.reports().get(report_id).await.unwrap().unwrap();
    assert_eq!(report.score, None);
}

#[tokio::test]
async fn test_start_mid_flow_clears_session() {
    let h = Harness::with_team().await;

    h.say(MEMBER, texts::BTN_SEND_REPORT).await;
    assert!(h.session(MEMBER).await.is_some());

    let response = h.say(MEMBER, "/start").await;
    assert_eq!(text_of(&response), texts::WELCOME_MEMBER);
    assert!(h.session(MEMBER).await.is_none());

    let response = h.say(MEMBER, "/cancel").await;
    assert_eq!(text_of(&response), texts::CANCELLED);
}

#[tokio::test]
async fn test_hierarchy_guard_on_enroll() {
    let h = Harness::with_team().await;

    h.say(MANAGER, texts::BTN_ADD_USER).await;
    assert_eq!(text_of(&h.say(MANAGER, &ADMIN.to_string()).await), texts::HANDLE_NOT_ALLOWED);
    assert_eq!(text_of(&h.say(MANAGER, &MANAGER.to_string()).await), texts::HANDLE_NOT_ALLOWED);
    h.say(MANAGER, texts::BTN_CANCEL).await;

    h.enroll(ADMIN, texts::BTN_ADD_MANAGER, &OTHER_MANAGER.to_string(), "Reza", "Ops")
        .await;
    h.say(OTHER_MANAGER, "/start").await;

    h.say(OTHER_MANAGER, texts::BTN_ADD_USER).await;
    let response = h.say(OTHER_MANAGER, &MANAGER.to_string()).await;
    assert_eq!(text_of(&response), texts::HANDLE_NOT_ALLOWED);
    h.say(OTHER_MANAGER, texts::BTN_CANCEL).await;

    // Re-adding an existing member moves them to the new team
    let response = h
        .enroll(OTHER_MANAGER, texts::BTN_ADD_USER, &MEMBER.to_string(), "Ali", "Ops")
        .await;
    assert_eq!(text_of(&response), texts::MEMBER_ADDED);

    let other = h.user(OTHER_MANAGER).await;
    let member = h.user(MEMBER).await;
    assert_eq!(member.supervisor_id, Some(other.id));
    assert_eq!(member.name, "Ali (Ops)");

    let manager = h.user(MANAGER).await;
    assert!(h.db.users().team_of(manager.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_views_for_each_role() {
    let h = Harness::with_team().await;

    let response = h.say(ADMIN, texts::BTN_LIST_USERS).await;
    assert!(text_of(&response).contains("Sara (Sales)"));
    assert!(text_of(&response).contains("Ali (Support)"));

    let response = h.say(MANAGER, texts::BTN_LIST_TEAM).await;
    assert!(text_of(&response).contains("Ali (Support)"));

    assert_eq!(text_of(&h.say(MEMBER, texts::BTN_ACTIVE_TASKS).await), texts::NO_ACTIVE_TASKS);
    assert_eq!(text_of(&h.say(MEMBER, texts::BTN_MY_REPORTS).await), texts::NO_OWN_REPORTS);
    assert_eq!(text_of(&h.say(MANAGER, texts::BTN_VIEW_REPORTS).await), texts::NO_REPORTS);
}

#[tokio::test]
async fn test_user_list_without_managers_says_so() {
    let h = Harness::new().await;
    h.say(ADMIN, "/start").await;

    let response = h.say(ADMIN, texts::BTN_LIST_USERS).await;
    assert_eq!(text_of(&response), texts::NO_USERS);
    assert!(!text_of(&response).contains(texts::USERS_HEADER.trim()));
}

#[tokio::test]
async fn test_unregistered_and_unknown_input() {
    let h = Harness::new().await;

    assert_eq!(text_of(&h.say(5, "hello").await), texts::NOT_REGISTERED);
    assert_eq!(text_of(&h.say(5, texts::BTN_ADD_MANAGER).await), texts::NOT_REGISTERED);

    let response = h.press(5, "assign_mgr_1").await;
    assert_eq!(response.notice.as_deref(), Some(texts::NOT_REGISTERED));

    let response = h.say(5, texts::BTN_CANCEL).await;
    assert_eq!(text_of(&response), texts::CANCELLED);
    assert_eq!(keyboard_of(&response), None);

    h.say(ADMIN, "/start").await;
    let response = h.say(ADMIN, "hello").await;
    assert_eq!(text_of(&response), texts::UNKNOWN_INPUT);
    assert_eq!(keyboard_of(&response), Some(&menu(Role::Admin)));
}

#[tokio::test]
async fn test_storage_failure_is_answered_and_keeps_step() {
    let h = Harness::with_team().await;

    h.say(MEMBER, texts::BTN_SEND_REPORT).await;
    let before = h.session(MEMBER).await;
    assert!(before.is_some());

    h.db.pool().close().await;

    let response = h.say(MEMBER, "This will not be stored").await;
    assert_eq!(text_of(&response), texts::FAILURE);
    assert_eq!(h.session(MEMBER).await, before);
}
