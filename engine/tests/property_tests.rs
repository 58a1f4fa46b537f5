use chrono::Duration;
use dozio_engine::bot::telegram::split_message;
use dozio_engine::conversation::calendar::{days_in_month, to_gregorian, MONTHS};
use dozio_engine::conversation::parse::{
    parse_deadline, parse_reminder, parse_score, ParseError, DAY_TOKEN, HOUR_TOKEN,
};
use proptest::prelude::*;
use sdk::ReminderPolicy;

fn to_persian_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => char::from_u32(0x06F0 + d).unwrap_or(c),
            None => c,
        })
        .collect()
}

/// A Solar Hijri date that exists, as (year, month, day)
fn valid_date() -> impl Strategy<Value = (i32, u32, u32)> {
    (1300..1500i32, 1..=12u32).prop_flat_map(|(year, month)| {
        let last = days_in_month(year, month).unwrap_or(29);
        (Just(year), Just(month), 1..=last)
    })
}

proptest! {
    #[test]
    fn test_valid_deadline_parses_with_either_digits((year, month, day) in valid_date()) {
        let text = format!("{} {} {}", day, MONTHS[month as usize - 1], year);

        let ascii = parse_deadline(&text);
        prop_assert!(ascii.is_ok(), "{} should parse", text);
        prop_assert_eq!(parse_deadline(&to_persian_digits(&text)), ascii);
    }

    #[test]
    fn test_consecutive_days_are_one_day_apart((year, month, day) in valid_date()) {
        let today = to_gregorian(year, month, day).unwrap();

        let last = days_in_month(year, month).unwrap();
        let tomorrow = if day < last {
            to_gregorian(year, month, day + 1)
        } else if month < 12 {
            to_gregorian(year, month + 1, 1)
        } else {
            to_gregorian(year + 1, 1, 1)
        };

        prop_assert_eq!(tomorrow, Some(today + Duration::days(1)));
    }

    #[test]
    fn test_day_past_month_end_is_rejected(year in 1300..1500i32, month in 1..=12u32, extra in 1..10u32) {
        let day = days_in_month(year, month).unwrap() + extra;
        let text = format!("{} {} {}", day, MONTHS[month as usize - 1], year);
        prop_assert_eq!(parse_deadline(&text), Err(ParseError::Deadline));
    }

    #[test]
    fn test_hourly_reminder_bounds(n in 0..=255u8) {
        let parsed = parse_reminder(&format!("{} {}", n, HOUR_TOKEN));
        if (1..=ReminderPolicy::MAX_HOURS).contains(&n) {
            prop_assert_eq!(parsed, Ok(ReminderPolicy::Hourly(n)));
        } else {
            prop_assert_eq!(parsed, Err(ParseError::ReminderHours));
        }
    }

    #[test]
    fn test_daily_reminder_bounds(n in 0..=255u8) {
        let parsed = parse_reminder(&to_persian_digits(&format!("{} {}", n, DAY_TOKEN)));
        if (1..=ReminderPolicy::MAX_DAYS).contains(&n) {
            prop_assert_eq!(parsed, Ok(ReminderPolicy::Daily(n)));
        } else {
            prop_assert_eq!(parsed, Err(ParseError::ReminderDays));
        }
    }

    #[test]
    fn test_score_accepts_only_single_ascii_digit(text in "\\PC{0,4}") {
        let expected = matches!(text.trim(), "1" | "2" | "3" | "4" | "5");
        prop_assert_eq!(parse_score(&text).is_ok(), expected);
    }

    #[test]
    fn test_split_message_preserves_text(
        text in "[a-zآ-ی📌📝🆔 \n]{0,400}",
        limit in 2..64usize,
    ) {
        let chunks = split_message(&text, limit);

        prop_assert!(!chunks.is_empty());
        prop_assert_eq!(chunks.concat(), text.clone());
        for chunk in &chunks {
            prop_assert!(chunk.encode_utf16().count() <= limit);
        }
        if !text.is_empty() {
            prop_assert!(chunks.iter().all(|c| !c.is_empty()));
        }
    }
}
