// File: olivia-common/src/models/catalog.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::availability::{availability_color, AvailabilityColor};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Cancelled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(f, "scheduled"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "cancelled" | "canceled" => Ok(SessionStatus::Cancelled),
            _ => Err(format!("Unknown session status: {}", s)),
        }
    }
}

/// Template for sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub id: String,
    pub name: String,
    pub bucket: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub default_location: String,
    pub default_duration_min: i32,
}

/// One bookable occurrence of a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub class_id: String,
    pub branch_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
    pub instructor: String,
    pub capacity: i32,
    pub status: SessionStatus,
}

/// Session joined with its class, branch and current enrollment count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub class_id: String,
    pub class_name: String,
    pub bucket: String,
    pub tags: Vec<String>,
    pub branch_id: String,
    pub branch_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
    pub instructor: String,
    pub status: SessionStatus,
    pub capacity: i32,
    pub enrolled: i32,
    pub remaining: i32,
    pub percent_full: f64,
    pub availability_color: AvailabilityColor,
}

impl SessionView {
    /// Builds the view and derives remaining / percent_full / color from the raw counts.
    pub fn from_parts(
        session: &Session,
        class: &ClassDefinition,
        branch_name: &str,
        enrolled: i32,
    ) -> Self {
        let capacity = session.capacity;
        Self {
            session_id: session.id.clone(),
            class_id: class.id.clone(),
            class_name: class.name.clone(),
            bucket: class.bucket.clone(),
            tags: class.tags.clone(),
            branch_id: session.branch_id.clone(),
            branch_name: branch_name.to_string(),
            start: session.start,
            end: session.end,
            location: session.location.clone(),
            instructor: session.instructor.clone(),
            status: session.status,
            capacity,
            enrolled,
            remaining: capacity - enrolled,
            percent_full: percent_full(enrolled, capacity),
            availability_color: availability_color(enrolled, capacity),
        }
    }

    pub fn has_open_spot(&self) -> bool {
        self.remaining > 0
    }
}

pub fn percent_full(enrolled: i32, capacity: i32) -> f64 {
    if capacity <= 0 {
        1.0
    } else {
        f64::from(enrolled) / f64::from(capacity)
    }
}

/// Maps the category spellings seen in requests and catalogs onto canonical bucket ids.
pub fn normalize_bucket(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    match key.as_str() {
        "kids_club" | "kids club" | "kidsclub" | "childcare" => "kids".to_string(),
        _ => key,
    }
}

/// CatalogStore query: a start-time window (`[starts_at_or_after, starts_before)`)
/// plus optional branch / bucket / tag restrictions.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFilter {
    pub starts_at_or_after: DateTime<Utc>,
    pub starts_before: DateTime<Utc>,
    pub branch_ids: Option<Vec<String>>,
    pub buckets: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub require_spots: bool,
}

impl SessionFilter {
    pub fn new(starts_at_or_after: DateTime<Utc>, starts_before: DateTime<Utc>) -> Self {
        Self {
            starts_at_or_after,
            starts_before,
            branch_ids: None,
            buckets: None,
            tags: None,
            require_spots: false,
        }
    }

    pub fn branches(mut self, branch_ids: &[String]) -> Self {
        self.branch_ids = non_empty(branch_ids.to_vec());
        self
    }

    pub fn buckets(mut self, buckets: &[String]) -> Self {
        self.buckets = non_empty(buckets.iter().map(|b| normalize_bucket(b)).collect());
        self
    }

    pub fn tags(mut self, tags: &[String]) -> Self {
        self.tags = non_empty(tags.iter().map(|t| t.trim().to_lowercase()).collect());
        self
    }

    pub fn require_spots(mut self, require_spots: bool) -> Self {
        self.require_spots = require_spots;
        self
    }

    /// Bucket filters compare normalized ids, tag filters match on any overlap
    /// (case-insensitive), and only scheduled sessions ever match.
    pub fn matches(&self, view: &SessionView) -> bool {
        if view.status != SessionStatus::Scheduled {
            return false;
        }
        if view.start < self.starts_at_or_after || view.start >= self.starts_before {
            return false;
        }
        if let Some(ids) = &self.branch_ids {
            if !ids.iter().any(|id| *id == view.branch_id) {
                return false;
            }
        }
        if let Some(buckets) = &self.buckets {
            let bucket = normalize_bucket(&view.bucket);
            if !buckets.iter().any(|b| normalize_bucket(b) == bucket) {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            let hit = view
                .tags
                .iter()
                .any(|t| tags.iter().any(|wanted| wanted.eq_ignore_ascii_case(t.trim())));
            if !hit {
                return false;
            }
        }
        if self.require_spots && !view.has_open_spot() {
            return false;
        }
        true
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    let values: Vec<String> = values.into_iter().filter(|v| !v.trim().is_empty()).collect();
    if values.is_empty() { None } else { Some(values) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn view(bucket: &str, tags: &[&str], capacity: i32, enrolled: i32) -> SessionView {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 14, 0, 0).unwrap();
        let session = Session {
            id: "s1".into(),
            class_id: "c1".into(),
            branch_id: "blue_ash".into(),
            start,
            end: start + chrono::Duration::minutes(45),
            location: "Pool".into(),
            instructor: "Staff".into(),
            capacity,
            status: SessionStatus::Scheduled,
        };
        let class = ClassDefinition {
            id: "c1".into(),
            name: "Lap Swim".into(),
            bucket: bucket.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            default_location: "Pool".into(),
            default_duration_min: 45,
        };
        SessionView::from_parts(&session, &class, "Blue Ash YMCA", enrolled)
    }

    fn day_filter() -> SessionFilter {
        SessionFilter::new(
            Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 7, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn derived_fields_are_computed() {
        let v = view("swim", &[], 10, 8);
        assert_eq!(v.remaining, 2);
        assert!((v.percent_full - 0.8).abs() < f64::EPSILON);
        assert_eq!(v.availability_color, AvailabilityColor::Amber);
    }

    #[test]
    fn bucket_aliases_are_normalized() {
        let v = view("kids_club", &[], 10, 0);
        assert!(day_filter().buckets(&["Kids".to_string()]).matches(&v));
        assert!(day_filter().buckets(&["childcare".to_string()]).matches(&v));
        assert!(!day_filter().buckets(&["swim".to_string()]).matches(&v));
    }

    #[test]
    fn tags_match_on_any_overlap() {
        let v = view("gym", &["HIIT", "cardio"], 10, 0);
        assert!(day_filter().tags(&["yoga".into(), "hiit".into()]).matches(&v));
        assert!(!day_filter().tags(&["yoga".into()]).matches(&v));
    }

    #[test]
    fn full_sessions_drop_out_when_spots_required() {
        let v = view("swim", &[], 10, 10);
        assert!(day_filter().matches(&v));
        assert!(!day_filter().require_spots(true).matches(&v));
    }

    #[test]
    fn window_end_is_exclusive() {
        let v = view("swim", &[], 10, 0);
        let f = SessionFilter::new(
            Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 6, 14, 0, 0).unwrap(),
        );
        assert!(!f.matches(&v));
    }
}
