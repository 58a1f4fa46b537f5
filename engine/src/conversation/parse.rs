//! Input parsing for conversation steps
//!
//! Every parser is pure. A parse failure never advances a flow; the engine
//! maps each [`ParseError`] to the matching re-prompt.

use chrono::NaiveDate;
use sdk::{ReminderPolicy, Role, Score};
use thiserror::Error;

use super::calendar;
use crate::db::Handle;

/// Unit token for hourly reminders
pub const HOUR_TOKEN: &str = "ساعت";
/// Unit token for daily reminders
pub const DAY_TOKEN: &str = "روز";
/// Phrase offered by the reminder prompt for "deadline day only"
pub const DEADLINE_DAY_ONLY: &str = "فقط روز ددلاین";
/// Word that leaves a task description empty
pub const NO_DESCRIPTION: &str = "ندارد";
/// Callback prefix of an admin picking a manager
pub const ASSIGN_MANAGER_PREFIX: &str = "assign_mgr_";
/// Callback prefix of a manager picking a team member
pub const ASSIGN_MEMBER_PREFIX: &str = "assign_mem_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected @username or a numeric id")]
    Handle,

    #[error("deadline must be `<day> <month name> <year>` in the Solar Hijri calendar")]
    Deadline,

    #[error("hourly reminder must be between 1 and {}", ReminderPolicy::MAX_HOURS)]
    ReminderHours,

    #[error("daily reminder must be between 1 and {}", ReminderPolicy::MAX_DAYS)]
    ReminderDays,

    #[error("score must be a single digit between {} and {}", Score::MIN, Score::MAX)]
    Score,

    #[error("report id must be numeric")]
    ReportId,
}

/// Map Persian and Arabic-Indic digits to ASCII
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            _ => c,
        })
        .collect()
}

fn parse_unsigned<T: std::str::FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `@name` is a display handle, an all-digit string a numeric id
pub fn parse_handle(text: &str) -> Result<Handle, ParseError> {
    let text = text.trim();

    if let Some(username) = text.strip_prefix('@') {
        let username = username.trim();
        if username.is_empty() || username.contains(char::is_whitespace) {
            return Err(ParseError::Handle);
        }
        return Ok(Handle::Display(username.to_string()));
    }

    parse_unsigned::<i64>(&normalize_digits(text))
        .map(Handle::Numeric)
        .ok_or(ParseError::Handle)
}

/// Parse `<day> <month name> <year>` into a Gregorian date
pub fn parse_deadline(text: &str) -> Result<NaiveDate, ParseError> {
    let normalized = normalize_digits(text);
    let parts: Vec<&str> = normalized.split_whitespace().collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(ParseError::Deadline);
    };

    let month = calendar::month_number(month).ok_or(ParseError::Deadline)?;
    let day: u32 = parse_unsigned(day).ok_or(ParseError::Deadline)?;
    let year: i32 = parse_unsigned(year).ok_or(ParseError::Deadline)?;

    calendar::to_gregorian(year, month, day).ok_or(ParseError::Deadline)
}

/// Parse a reminder cadence
///
/// Text carrying a unit token must hold an in-range number. Text with no
/// unit token falls back to [`ReminderPolicy::None`] without complaint.
pub fn parse_reminder(text: &str) -> Result<ReminderPolicy, ParseError> {
    let text = normalize_digits(text.trim());

    // The prompt offers this phrase as the "no reminder" answer even though
    // it holds the day token
    if text == DEADLINE_DAY_ONLY {
        return Ok(ReminderPolicy::None);
    }

    if text.contains(HOUR_TOKEN) {
        let value = text.replace(HOUR_TOKEN, "");
        return parse_unsigned::<u8>(value.trim())
            .and_then(|n| ReminderPolicy::hourly(n).ok())
            .ok_or(ParseError::ReminderHours);
    }

    if text.contains(DAY_TOKEN) {
        let value = text.replace(DAY_TOKEN, "");
        return parse_unsigned::<u8>(value.trim())
            .and_then(|n| ReminderPolicy::daily(n).ok())
            .ok_or(ParseError::ReminderDays);
    }

    Ok(ReminderPolicy::None)
}

/// Exactly one of the ASCII digits `1`..`5`
pub fn parse_score(text: &str) -> Result<Score, ParseError> {
    match text.trim() {
        s @ ("1" | "2" | "3" | "4" | "5") => s
            .parse::<u8>()
            .ok()
            .and_then(|v| Score::new(v).ok())
            .ok_or(ParseError::Score),
        _ => Err(ParseError::Score),
    }
}

/// Description text, with [`NO_DESCRIPTION`] meaning empty
pub fn parse_description(text: &str) -> String {
    let text = text.trim();
    if text.to_lowercase() == NO_DESCRIPTION {
        String::new()
    } else {
        text.to_string()
    }
}

/// Report id argument of the score command
pub fn parse_report_id(text: &str) -> Result<i64, ParseError> {
    parse_unsigned(&normalize_digits(text.trim())).ok_or(ParseError::ReportId)
}

fn assignee_prefix(role: Role) -> Option<&'static str> {
    match role {
        Role::Admin => Some(ASSIGN_MANAGER_PREFIX),
        Role::Manager => Some(ASSIGN_MEMBER_PREFIX),
        Role::Member => None,
    }
}

/// Callback token for an assignee button shown to `role`
pub fn assignee_token(role: Role, user_id: i64) -> Option<String> {
    assignee_prefix(role).map(|prefix| format!("{}{}", prefix, user_id))
}

/// Assignee id from a callback token, if the prefix matches `role`
pub fn parse_assignee_token(role: Role, data: &str) -> Option<i64> {
    data.strip_prefix(assignee_prefix(role)?)
        .and_then(parse_unsigned::<i64>)
}
