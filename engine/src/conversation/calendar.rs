//! Solar Hijri (Jalali) calendar support
//!
//! Deadlines are typed as `<day> <month name> <year>` in the Solar Hijri
//! calendar and stored as Gregorian dates. Leap years follow the 33-year
//! arithmetic cycle.

use chrono::{Duration, NaiveDate};

/// Month names in calendar order
pub const MONTHS: [&str; 12] = [
    "فروردین",
    "اردیبهشت",
    "خرداد",
    "تیر",
    "مرداد",
    "شهریور",
    "مهر",
    "آبان",
    "آذر",
    "دی",
    "بهمن",
    "اسفند",
];

/// Years accepted by [`to_gregorian`]
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=3000;

/// Remainders of `year % 33` that mark a leap year
const LEAP_REMAINDERS: [i32; 8] = [1, 5, 9, 13, 17, 22, 26, 30];

/// Month number (1-based) for a month name
pub fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
}

pub fn is_leap_year(year: i32) -> bool {
    LEAP_REMAINDERS.contains(&year.rem_euclid(33))
}

/// Number of days in a month, or `None` for an invalid month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    match month {
        1..=6 => Some(31),
        7..=11 => Some(30),
        12 if is_leap_year(year) => Some(30),
        12 => Some(29),
        _ => None,
    }
}

/// Convert a Solar Hijri date to the Gregorian calendar
///
/// Returns `None` when the day does not exist in that month or the year is
/// outside [`YEAR_RANGE`].
pub fn to_gregorian(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !YEAR_RANGE.contains(&year) || day == 0 || day > days_in_month(year, month)? {
        return None;
    }

    let shifted = i64::from(year) + 1595;
    let month_offset = if month < 7 {
        i64::from(month - 1) * 31
    } else {
        i64::from(month - 7) * 30 + 186
    };
    let days = -355_668
        + 365 * shifted
        + (shifted / 33) * 8
        + ((shifted % 33) + 3) / 4
        + i64::from(day)
        + month_offset;

    // Day count is relative to proleptic Gregorian 0000-01-01
    NaiveDate::from_ymd_opt(0, 1, 1)?.checked_add_signed(Duration::days(days))
}
