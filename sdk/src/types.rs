//! Domain value types shared by the engine and its collaborators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// Position of a user in the single flat hierarchy
///
/// admin → manager → member. The admin is the root, a manager reports to the
/// admin, a member reports to a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }

    /// The role a supervisor of this role must hold, if any
    pub fn supervisor_role(&self) -> Option<Role> {
        match self {
            Role::Admin => None,
            Role::Manager => Some(Role::Admin),
            Role::Member => Some(Role::Manager),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "member" => Ok(Role::Member),
            other => Err(EngineError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

/// Unit of a reminder cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    None,
    Hour,
    Day,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::None => "none",
            ReminderKind::Hour => "hour",
            ReminderKind::Day => "day",
        }
    }
}

/// Reminder cadence attached to a task
///
/// Stored as data only; nothing in this workspace fires reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "every", rename_all = "lowercase")]
pub enum ReminderPolicy {
    /// Remind on the deadline day only
    None,
    /// Every N hours, N in 1..=48
    Hourly(u8),
    /// Every N days, N in 1..=30
    Daily(u8),
}

impl ReminderPolicy {
    pub const MAX_HOURS: u8 = 48;
    pub const MAX_DAYS: u8 = 30;

    /// Build an hourly policy, rejecting magnitudes outside 1..=48
    pub fn hourly(hours: u8) -> Result<Self, EngineError> {
        if (1..=Self::MAX_HOURS).contains(&hours) {
            Ok(Self::Hourly(hours))
        } else {
            Err(EngineError::Validation(format!(
                "hourly reminder must be between 1 and {}",
                Self::MAX_HOURS
            )))
        }
    }

    /// Build a daily policy, rejecting magnitudes outside 1..=30
    pub fn daily(days: u8) -> Result<Self, EngineError> {
        if (1..=Self::MAX_DAYS).contains(&days) {
            Ok(Self::Daily(days))
        } else {
            Err(EngineError::Validation(format!(
                "daily reminder must be between 1 and {}",
                Self::MAX_DAYS
            )))
        }
    }

    pub fn kind(&self) -> ReminderKind {
        match self {
            ReminderPolicy::None => ReminderKind::None,
            ReminderPolicy::Hourly(_) => ReminderKind::Hour,
            ReminderPolicy::Daily(_) => ReminderKind::Day,
        }
    }

    pub fn magnitude(&self) -> Option<u8> {
        match self {
            ReminderPolicy::None => None,
            ReminderPolicy::Hourly(n) | ReminderPolicy::Daily(n) => Some(*n),
        }
    }

    /// Rebuild a policy from its stored column pair
    ///
    /// Rows with an unknown kind or a missing/out-of-range magnitude read back
    /// as `None`, matching the parse-time fallback.
    pub fn from_columns(kind: &str, magnitude: Option<i64>) -> Self {
        let magnitude = magnitude.and_then(|m| u8::try_from(m).ok());
        match (kind, magnitude) {
            ("hour", Some(n)) => Self::hourly(n).unwrap_or(Self::None),
            ("day", Some(n)) => Self::daily(n).unwrap_or(Self::None),
            _ => Self::None,
        }
    }
}

/// Supervisor rating of a report, 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, EngineError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(EngineError::Validation(format!(
                "score must be between {} and {}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
