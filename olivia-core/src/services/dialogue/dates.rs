// File: olivia-core/src/services/dialogue/dates.rs

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use olivia_common::models::DateWindow;

use crate::utils::time::week_of;

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(this\s+)?(monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thur|thu|friday|fri|saturday|sat|sunday|sun)\b",
    )
    .expect("weekday pattern is valid")
});

fn weekday_of(token: &str) -> Option<Weekday> {
    let wd = match token {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tues" | "tue" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thurs" | "thur" | "thu" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(wd)
}

/// Window implied by relative phrases in the message, if any.
///
/// A bare weekday means the next such day (a week out when it is today);
/// "this <weekday>" includes today.
pub fn infer_window(message: &str, today: NaiveDate) -> Option<DateWindow> {
    let msg = message.to_lowercase();

    if msg.contains("today") || msg.contains("tonight") {
        return Some(DateWindow::single_day(today));
    }
    if msg.contains("tomorrow") {
        return Some(DateWindow::single_day(today + Duration::days(1)));
    }
    if msg.contains("next week") {
        return Some(week_of(today + Duration::days(7)));
    }
    if msg.contains("this week") {
        return Some(week_of(today));
    }

    let caps = WEEKDAY_RE.captures(&msg)?;
    let target = weekday_of(caps.get(2)?.as_str())?;
    let explicit_this = caps.get(1).is_some();

    let current = i64::from(today.weekday().num_days_from_monday());
    let wanted = i64::from(target.num_days_from_monday());
    let mut ahead = (wanted - current).rem_euclid(7);
    if ahead == 0 && !explicit_this {
        ahead = 7;
    }
    Some(DateWindow::single_day(today + Duration::days(ahead)))
}

/// Default window when neither the planner nor the message gives one.
pub fn default_window(today: NaiveDate) -> DateWindow {
    week_of(today)
}
