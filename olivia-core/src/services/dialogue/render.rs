// File: olivia-core/src/services/dialogue/render.rs
//
// Deterministic reply text. Used whenever the narrator is skipped, fails or
// returns something unusable.

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use olivia_common::models::{EnrollmentReceipt, SearchMeta, SessionView, SuggestedSession};

static SPOTS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(?:open\s+|more\s+)?(?:spots?|seats?|places?)\b")
        .expect("spots pattern is valid")
});

pub fn format_start(view: &SessionView, tz: Tz) -> String {
    view.start.with_timezone(&tz).format("%a %b %-d %-I:%M %p").to_string()
}

/// Short label stored with offered options.
pub fn option_label(view: &SessionView, tz: Tz) -> String {
    format!("{} @ {} {}", view.class_name, view.branch_name, format_start(view, tz))
}

pub fn option_line(ordinal: usize, suggestion: &SuggestedSession, tz: Tz) -> String {
    let s = &suggestion.session;
    let drive = suggestion
        .drive_minutes
        .map(|m| format!(" (~{m} min drive)"))
        .unwrap_or_default();
    format!(
        "{}) {} @ {}{} {} — {} spots ({})",
        ordinal,
        s.class_name,
        s.branch_name,
        drive,
        format_start(s, tz),
        s.remaining,
        s.availability_color
    )
}

fn primary_name(meta: &SearchMeta) -> &str {
    meta.primary_branch_name.as_deref().unwrap_or("your Y")
}

/// Intro line chosen from which tiers contributed.
pub fn options_header(meta: &SearchMeta, results: &[SuggestedSession]) -> String {
    if results.is_empty() {
        return String::new();
    }
    let counts = &meta.tier_counts;
    let primary = primary_name(meta);
    let nearby = counts.nearby_same_day + counts.nearby_other_day;
    let near_example = results
        .iter()
        .find(|r| r.tier.is_nearby() && r.drive_minutes.is_some());

    if meta.primary_branch_name.is_none() && nearby == 0 && counts.other_day == 0 {
        return "Here are the top options I found:".to_string();
    }
    if counts.primary > 0 && counts.other_day == 0 && nearby == 0 {
        return format!("Here are the top options at {primary}:");
    }
    if counts.primary == 0 && counts.other_day > 0 && nearby == 0 {
        return format!(
            "I didn't see anything on that day at {primary}, but there are a few options on other days at your Y:"
        );
    }
    if counts.primary == 0 && nearby > 0 {
        let other_days = if counts.nearby_other_day > 0 { " on other days" } else { "" };
        return match near_example {
            Some(r) => format!(
                "I didn't see anything at {primary}, but {} is about ~{} minutes away and has a few options{}:",
                r.session.branch_name,
                r.drive_minutes.unwrap_or_default(),
                other_days
            ),
            None => format!("I didn't see anything at {primary}, but a nearby Y has a few options{other_days}:"),
        };
    }
    if counts.primary > 0 && nearby > 0 {
        return match near_example {
            Some(r) => format!(
                "I found options at {primary}. If you're open to nearby Ys too, {} is ~{} minutes away and also has options:",
                r.session.branch_name,
                r.drive_minutes.unwrap_or_default()
            ),
            None => format!("I found options at {primary}. A nearby Y also has options:"),
        };
    }
    "Here are the top options I found:".to_string()
}

/// Header plus numbered option lines.
pub fn listing(meta: &SearchMeta, results: &[SuggestedSession], tz: Tz) -> String {
    let mut lines = vec![options_header(meta, results)];
    lines.extend(
        results
            .iter()
            .enumerate()
            .map(|(i, r)| option_line(i + 1, r, tz)),
    );
    lines.join("\n")
}

pub fn bucket_label(bucket: &str) -> String {
    match bucket.trim().to_lowercase().as_str() {
        "kids" | "kids_club" => "Kids Club".to_string(),
        "mind_body" => "Mind & Body".to_string(),
        "" => "classes".to_string(),
        other => {
            let spaced = other.replace('_', " ");
            let mut chars = spaced.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => spaced,
            }
        }
    }
}

pub fn no_results(meta: &SearchMeta, buckets: &[String]) -> String {
    let what = buckets
        .first()
        .map(|b| bucket_label(b))
        .unwrap_or_else(|| "class".to_string());
    format!(
        "I'm not seeing any {} sessions for {} in the current schedule. If you'd like, I can widen the date range or check nearby Ys.",
        what,
        primary_name(meta)
    )
}

pub fn enrollment_message(receipt: &EnrollmentReceipt, label: Option<&str>) -> String {
    let what = label.unwrap_or("that session");
    if receipt.already_enrolled {
        format!(
            "You're already enrolled in {}. Remaining spots: {}.",
            what, receipt.remaining
        )
    } else {
        format!("You're enrolled in {}! Remaining spots: {}.", what, receipt.remaining)
    }
}

/// Empty or placeholder narrator output.
pub fn is_degenerate(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    t.is_empty() || t == "done" || t == "done."
}

/// Every "<n> spots" figure in `text` must be one of `allowed`.
pub fn spot_counts_consistent(text: &str, allowed: &[i32]) -> bool {
    SPOTS_RE.captures_iter(text).all(|caps| {
        caps.get(1)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .is_some_and(|n| allowed.contains(&n))
    })
}

/// Puts the options header in front of narrator text that left it out.
pub fn with_header(narrated: &str, header: &str) -> String {
    if header.is_empty() || narrated.contains(header) {
        narrated.to_string()
    } else if narrated.is_empty() {
        header.to_string()
    } else {
        format!("{header}\n{narrated}")
    }
}

pub fn with_greeting(greeting: &str, message: &str) -> String {
    if message.is_empty() {
        greeting.to_string()
    } else if message.starts_with(greeting) {
        message.to_string()
    } else {
        format!("{greeting}\n\n{message}")
    }
}
