use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn counted_period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(past|last|next)\s+(\d+)\s+(day|week|month)s?\b")
            .expect("counted period pattern")
    })
}

/// An explicit date range resolved from a relative phrase. `label`
/// keeps the matched phrase for the prompt's date-context section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateHint {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateHint {
    fn new(label: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.to_string(),
            start,
            end,
        }
    }
}

/// Resolve the first recognized relative-period phrase against the
/// caller-supplied current date. Pure; the current date is never read
/// from a clock here.
pub fn detect_date_hint(query: &str, today: NaiveDate) -> Option<DateHint> {
    let q = query.to_lowercase();

    // Counted forms first so "past 6 weeks" is not read as "weeks".
    if let Some(hint) = detect_counted(&q, today) {
        return Some(hint);
    }

    if q.contains("last week") {
        return Some(DateHint::new(
            "last week",
            today - Duration::days(7),
            today - Duration::days(1),
        ));
    }
    if q.contains("this week") {
        return Some(DateHint::new("this week", today - Duration::days(6), today));
    }
    if q.contains("next week") {
        return Some(DateHint::new(
            "next week",
            today + Duration::days(1),
            today + Duration::days(7),
        ));
    }
    if q.contains("yesterday") {
        let d = today - Duration::days(1);
        return Some(DateHint::new("yesterday", d, d));
    }
    if q.contains("today") {
        return Some(DateHint::new("today", today, today));
    }
    if q.contains("last month") {
        let (year, month) = prev_month(today.year(), today.month());
        let (start, end) = month_range(year, month)?;
        return Some(DateHint::new("last month", start, end));
    }
    if q.contains("this month") {
        let (start, end) = month_range(today.year(), today.month())?;
        return Some(DateHint::new("this month", start, end));
    }
    if q.contains("next month") {
        let (year, month) = next_month(today.year(), today.month());
        let (start, end) = month_range(year, month)?;
        return Some(DateHint::new("next month", start, end));
    }
    if q.contains("last quarter") {
        let (start, end) = quarter_range(today, -1)?;
        return Some(DateHint::new("last quarter", start, end));
    }
    if q.contains("this quarter") {
        let (start, end) = quarter_range(today, 0)?;
        return Some(DateHint::new("this quarter", start, end));
    }
    if q.contains("last year") {
        let y = today.year() - 1;
        return Some(DateHint::new(
            "last year",
            NaiveDate::from_ymd_opt(y, 1, 1)?,
            NaiveDate::from_ymd_opt(y, 12, 31)?,
        ));
    }
    if q.contains("this year") {
        let y = today.year();
        return Some(DateHint::new(
            "this year",
            NaiveDate::from_ymd_opt(y, 1, 1)?,
            NaiveDate::from_ymd_opt(y, 12, 31)?,
        ));
    }

    detect_season(&q, today)
}

fn detect_counted(q: &str, today: NaiveDate) -> Option<DateHint> {
    let caps = counted_period_re().captures(q)?;
    let direction = caps.get(1)?.as_str();
    let n: i64 = caps.get(2)?.as_str().parse().ok()?;
    let unit = caps.get(3)?.as_str();
    let label = caps.get(0)?.as_str();

    let days = match unit {
        "day" => n,
        "week" => n * 7,
        // Months approximated as 30-day blocks; the SQL joins on
        // calendar anyway.
        "month" => n * 30,
        _ => return None,
    };

    match direction {
        "past" | "last" => Some(DateHint::new(
            label,
            today - Duration::days(days),
            today - Duration::days(1),
        )),
        "next" => Some(DateHint::new(
            label,
            today + Duration::days(1),
            today + Duration::days(days),
        )),
        _ => None,
    }
}

fn detect_season(q: &str, today: NaiveDate) -> Option<DateHint> {
    let y = today.year();
    if q.contains("holiday season") {
        return Some(DateHint::new(
            "holiday season",
            NaiveDate::from_ymd_opt(y, 11, 1)?,
            NaiveDate::from_ymd_opt(y, 12, 31)?,
        ));
    }
    if q.contains("summer") {
        return Some(DateHint::new(
            "summer",
            NaiveDate::from_ymd_opt(y, 6, 1)?,
            NaiveDate::from_ymd_opt(y, 8, 31)?,
        ));
    }
    if q.contains("winter") {
        // Dec of the current year through end of Feb next year.
        let feb_end = month_range(y + 1, 2)?.1;
        return Some(DateHint::new(
            "winter",
            NaiveDate::from_ymd_opt(y, 12, 1)?,
            feb_end,
        ));
    }
    if q.contains("spring") {
        return Some(DateHint::new(
            "spring",
            NaiveDate::from_ymd_opt(y, 3, 1)?,
            NaiveDate::from_ymd_opt(y, 5, 31)?,
        ));
    }
    if q.contains("fall") || q.contains("autumn") {
        return Some(DateHint::new(
            "fall",
            NaiveDate::from_ymd_opt(y, 9, 1)?,
            NaiveDate::from_ymd_opt(y, 11, 30)?,
        ));
    }
    None
}

fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (ny, nm) = next_month(year, month);
    let end = NaiveDate::from_ymd_opt(ny, nm, 1)? - Duration::days(1);
    Some((start, end))
}

fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 { (year - 1, 12) } else { (year, month - 1) }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

fn quarter_range(today: NaiveDate, offset: i32) -> Option<(NaiveDate, NaiveDate)> {
    let quarter = ((today.month0() / 3) as i32) + offset;
    let year = today.year() + quarter.div_euclid(4);
    let quarter = quarter.rem_euclid(4) as u32;
    let start_month = quarter * 3 + 1;
    let start = NaiveDate::from_ymd_opt(year, start_month, 1)?;
    let end = month_range(year, start_month + 2)?.1;
    Some((start, end))
}
