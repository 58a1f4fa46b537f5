//! Capability table
//!
//! Which role may do what, and the menu each role sees. The router consults
//! this once before dispatch; flows assume they are already authorized.

use sdk::{Keyboard, Role};

use crate::texts;

/// Everything a user can ask the bot to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    AddManager,
    AddUser,
    CreateTask,
    ViewReports,
    ViewActiveTasks,
    ListUsers,
    ListTeam,
    SubmitReport,
    SubmitManagerReport,
    MyReports,
    Score,
}

impl Action {
    pub const ALL: [Action; 11] = [
        Action::AddManager,
        Action::AddUser,
        Action::CreateTask,
        Action::ViewReports,
        Action::ViewActiveTasks,
        Action::ListUsers,
        Action::ListTeam,
        Action::SubmitReport,
        Action::SubmitManagerReport,
        Action::MyReports,
        Action::Score,
    ];

    /// Roles holding this capability
    pub fn roles(&self) -> &'static [Role] {
        match self {
            Action::AddManager | Action::ListUsers => &[Role::Admin],
            Action::AddUser | Action::ListTeam | Action::SubmitManagerReport => &[Role::Manager],
            Action::CreateTask | Action::ViewReports | Action::Score => {
                &[Role::Admin, Role::Manager]
            }
            Action::SubmitReport | Action::MyReports => &[Role::Member],
            Action::ViewActiveTasks => &[Role::Admin, Role::Manager, Role::Member],
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.roles().contains(&role)
    }

    /// Menu label that triggers this action; scoring is command-only
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Action::AddManager => Some(texts::BTN_ADD_MANAGER),
            Action::AddUser => Some(texts::BTN_ADD_USER),
            Action::CreateTask => Some(texts::BTN_CREATE_TASK),
            Action::ViewReports => Some(texts::BTN_VIEW_REPORTS),
            Action::ViewActiveTasks => Some(texts::BTN_ACTIVE_TASKS),
            Action::ListUsers => Some(texts::BTN_LIST_USERS),
            Action::ListTeam => Some(texts::BTN_LIST_TEAM),
            Action::SubmitReport => Some(texts::BTN_SEND_REPORT),
            Action::SubmitManagerReport => Some(texts::BTN_MANAGER_REPORT),
            Action::MyReports => Some(texts::BTN_MY_REPORTS),
            Action::Score => None,
        }
    }

    /// Exact-match lookup of a menu label
    pub fn from_label(text: &str) -> Option<Action> {
        Self::ALL
            .into_iter()
            .find(|action| action.label() == Some(text))
    }

    /// Message shown to a role lacking this capability
    pub fn rejection(&self) -> &'static str {
        match self.roles() {
            [Role::Admin] => texts::ONLY_ADMIN,
            [Role::Manager] => texts::ONLY_MANAGER,
            [Role::Member] => texts::ONLY_MEMBERS,
            _ => texts::ONLY_MANAGERS,
        }
    }
}

fn menu_rows(role: Role) -> Vec<Vec<Action>> {
    match role {
        Role::Admin => vec![
            vec![Action::AddManager, Action::CreateTask],
            vec![Action::ViewReports, Action::ViewActiveTasks],
            vec![Action::ListUsers],
        ],
        Role::Manager => vec![
            vec![Action::AddUser, Action::CreateTask],
            vec![Action::SubmitManagerReport, Action::ViewReports],
            vec![Action::ViewActiveTasks, Action::ListTeam],
        ],
        Role::Member => vec![
            vec![Action::ViewActiveTasks, Action::SubmitReport],
            vec![Action::MyReports],
        ],
    }
}

/// Idle keyboard for a role
pub fn menu(role: Role) -> Keyboard {
    Keyboard::reply(
        menu_rows(role)
            .into_iter()
            .map(|row| row.into_iter().filter_map(|action| action.label())),
    )
}

/// Keyboard shown during every flow step
pub fn cancel_menu() -> Keyboard {
    Keyboard::reply([[texts::BTN_CANCEL]])
}
