//! Read-only views rendered as message text

use sdk::ReminderPolicy;

use crate::db::{Report, ReportView, Task, User};
use crate::texts;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

fn reminder_line(reminder: &ReminderPolicy) -> String {
    match reminder {
        ReminderPolicy::Hourly(n) => format!("یادآوری هر {} ساعت", n),
        ReminderPolicy::Daily(n) => format!("یادآوری هر {} روز", n),
        ReminderPolicy::None => "یادآوری فقط روز ددلاین".to_string(),
    }
}

fn score_label(report: &Report) -> String {
    report
        .score
        .map(|s| s.to_string())
        .unwrap_or_else(|| texts::NO_SCORE.to_string())
}

/// Numeric id when known, otherwise the display handle
fn handle_label(user: &User) -> String {
    match (user.telegram_id, user.username.as_deref()) {
        (Some(id), _) => id.to_string(),
        (None, Some(username)) => format!("@{}", username),
        (None, None) => "-".to_string(),
    }
}

pub fn active_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return texts::NO_ACTIVE_TASKS.to_string();
    }

    let mut out = String::from(texts::TASKS_HEADER);
    for task in tasks {
        out.push_str(&format!(
            "📌 {}\n📝 {}\n⏰ مهلت: {}\n⏱ {}\n\n",
            task.title,
            task.description,
            task.deadline.format("%Y-%m-%d"),
            reminder_line(&task.reminder)
        ));
    }
    out
}

pub fn supervisor_reports(reports: &[ReportView]) -> String {
    if reports.is_empty() {
        return texts::NO_REPORTS.to_string();
    }

    let mut out = String::from(texts::REPORTS_HEADER);
    for view in reports {
        let report = &view.report;
        out.push_str(&format!(
            "🆔 Report ID: {}\n👤 کاربر: {}\n📝 {}\n📅 {}\n⭐ امتیاز: {}\n\n",
            report.id,
            view.author_name,
            report.content,
            report.timestamp.format(TIMESTAMP_FORMAT),
            score_label(report)
        ));
    }
    out.push_str(texts::REPORTS_FOOTER);
    out
}

pub fn own_reports(reports: &[Report]) -> String {
    if reports.is_empty() {
        return texts::NO_OWN_REPORTS.to_string();
    }

    let mut out = String::from(texts::OWN_REPORTS_HEADER);
    for report in reports {
        out.push_str(&format!(
            "📝 {}\n📅 {}\n⭐ امتیاز: {}\n\n",
            report.content,
            report.timestamp.format(TIMESTAMP_FORMAT),
            score_label(report)
        ));
    }
    out
}

/// Managers each followed by their team
pub fn user_tree(teams: &[(User, Vec<User>)]) -> String {
    if teams.is_empty() {
        return texts::NO_USERS.to_string();
    }

    let mut out = String::from(texts::USERS_HEADER);
    for (manager, members) in teams {
        out.push_str(&format!(
            "\n🟦 مدیر: {} (ID:{})\n",
            manager.name,
            handle_label(manager)
        ));
        for member in members {
            out.push_str(&format!(
                "    └ 🟩 {} (ID:{})\n",
                member.name,
                handle_label(member)
            ));
        }
    }
    out
}

pub fn team(members: &[User]) -> String {
    if members.is_empty() {
        return texts::NO_TEAM.to_string();
    }

    let mut out = String::from(texts::TEAM_HEADER);
    for member in members {
        out.push_str(&format!("🟩 {} (ID:{})\n", member.name, handle_label(member)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use sdk::{Role, Score};

    fn user(id: i64, telegram_id: Option<i64>, username: Option<&str>, name: &str) -> User {
        User {
            id,
            telegram_id,
            username: username.map(str::to_string),
            name: name.to_string(),
            role: Role::Member,
            supervisor_id: None,
        }
    }

    fn report(id: i64, content: &str, score: Option<u8>) -> Report {
        Report {
            id,
            task_id: None,
            author_id: 3,
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
            score: score.map(|s| Score::new(s).unwrap()),
        }
    }

    #[test]
    fn test_empty_views() {
        assert_eq!(active_tasks(&[]), texts::NO_ACTIVE_TASKS);
        assert_eq!(supervisor_reports(&[]), texts::NO_REPORTS);
        assert_eq!(own_reports(&[]), texts::NO_OWN_REPORTS);
        assert_eq!(team(&[]), texts::NO_TEAM);
        assert_eq!(user_tree(&[]), texts::NO_USERS);
    }

    #[test]
    fn test_active_tasks_view() {
        let task = Task {
            id: 1,
            title: "Budget".into(),
            description: "Q3".into(),
            assigned_by: 1,
            assigned_to: 2,
            deadline: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            reminder: ReminderPolicy::Daily(3),
            is_done: false,
            is_urgent: false,
            created_at: Utc::now(),
        };
        let text = active_tasks(&[task]);
        assert!(text.starts_with(texts::TASKS_HEADER));
        assert!(text.contains("📌 Budget"));
        assert!(text.contains("2025-06-16"));
        assert!(text.contains("یادآوری هر 3 روز"));
    }

    #[test]
    fn test_supervisor_reports_view() {
        let views = vec![
            ReportView {
                report: report(7, "done", Some(4)),
                author_name: "Ali".into(),
            },
            ReportView {
                report: report(6, "started", None),
                author_name: "Ali".into(),
            },
        ];
        let text = supervisor_reports(&views);
        assert!(text.contains("🆔 Report ID: 7"));
        assert!(text.contains("⭐ امتیاز: 4"));
        assert!(text.contains(&format!("⭐ امتیاز: {}", texts::NO_SCORE)));
        assert!(text.contains("2025-06-01 09:30"));
        assert!(text.ends_with(texts::REPORTS_FOOTER));
    }

    #[test]
    fn test_user_tree_shows_placeholders_by_handle() {
        let manager = user(2, Some(555), None, "Sara (Sales)");
        let members = vec![
            user(3, Some(900), Some("ali"), "Ali"),
            user(4, None, Some("reza"), "Reza"),
        ];
        let text = user_tree(&[(manager, members)]);
        assert!(text.contains("🟦 مدیر: Sara (Sales) (ID:555)"));
        assert!(text.contains("└ 🟩 Ali (ID:900)"));
        assert!(text.contains("└ 🟩 Reza (ID:@reza)"));
    }
}
