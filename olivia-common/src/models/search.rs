// File: olivia-common/src/models/search.rs

use std::fmt;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::catalog::SessionView;

/// Calendar-day window, start inclusive and end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(rename = "date_start")]
    pub start: NaiveDate,
    #[serde(rename = "date_end")]
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, Error> {
        if end <= start {
            return Err(Error::Validation(format!(
                "date_end ({end}) must be after date_start ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// `day` alone. The last representable date yields an empty window.
    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: shift(day, 1) }
    }

    pub fn is_single_day(&self) -> bool {
        self.end - self.start == Duration::days(1)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day < self.end
    }

    /// Symmetric widening by `days` on both sides, clamped to the representable dates.
    pub fn widen(&self, days: i64) -> Self {
        Self {
            start: shift(self.start, -days),
            end: shift(self.end, days),
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// `day` moved by `days`, saturating at `NaiveDate::MIN` / `NaiveDate::MAX`.
fn shift(day: NaiveDate, days: i64) -> NaiveDate {
    let moved = Duration::try_days(days).and_then(|d| day.checked_add_signed(d));
    moved.unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Input to the tiered availability search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(flatten)]
    pub window: DateWindow,
    #[serde(default, alias = "branch_ids")]
    pub home_branch_ids: Vec<String>,
    #[serde(default)]
    pub buckets: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "has_spots")]
    pub require_spots: bool,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

impl SearchQuery {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            home_branch_ids: Vec::new(),
            buckets: Vec::new(),
            tags: Vec::new(),
            require_spots: false,
            limit: default_limit(),
        }
    }

    pub fn with_branches<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.home_branch_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_buckets<I, S>(mut self, buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buckets = buckets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_require_spots(mut self, require_spots: bool) -> Self {
        self.require_spots = require_spots;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    OtherDay,
    NearbySameDay,
    NearbyOtherDay,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Primary => "primary",
            Tier::OtherDay => "other_day",
            Tier::NearbySameDay => "nearby_same_day",
            Tier::NearbyOtherDay => "nearby_other_day",
        }
    }

    pub fn is_nearby(&self) -> bool {
        matches!(self, Tier::NearbySameDay | Tier::NearbyOtherDay)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A search hit, labelled with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedSession {
    #[serde(flatten)]
    pub session: SessionView,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub primary: usize,
    pub other_day: usize,
    pub nearby_same_day: usize,
    pub nearby_other_day: usize,
}

impl TierCounts {
    pub fn add(&mut self, tier: Tier, n: usize) {
        match tier {
            Tier::Primary => self.primary += n,
            Tier::OtherDay => self.other_day += n,
            Tier::NearbySameDay => self.nearby_same_day += n,
            Tier::NearbyOtherDay => self.nearby_other_day += n,
        }
    }

    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Primary => self.primary,
            Tier::OtherDay => self.other_day,
            Tier::NearbySameDay => self.nearby_same_day,
            Tier::NearbyOtherDay => self.nearby_other_day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearbyBranch {
    pub branch_id: String,
    pub branch_name: String,
    pub drive_minutes: u32,
}

/// Explains how a result set was assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMeta {
    pub primary_branch_id: Option<String>,
    pub primary_branch_name: Option<String>,
    pub requested: Option<DateWindow>,
    pub tiers_used: Vec<Tier>,
    pub tier_counts: TierCounts,
    pub widened_window: Option<DateWindow>,
    pub nearby_branches: Vec<NearbyBranch>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub results: Vec<SuggestedSession>,
    pub meta: SearchMeta,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_rejects_empty_range() {
        assert!(DateWindow::new(d(2025, 1, 6), d(2025, 1, 6)).is_err());
        assert!(DateWindow::new(d(2025, 1, 7), d(2025, 1, 6)).is_err());
    }

    #[test]
    fn single_day_window_and_widening() {
        let w = DateWindow::new(d(2025, 1, 6), d(2025, 1, 7)).unwrap();
        assert!(w.is_single_day());
        assert!(w.contains(d(2025, 1, 6)));
        assert!(!w.contains(d(2025, 1, 7)));

        let wide = w.widen(3);
        assert_eq!(wide.start, d(2025, 1, 3));
        assert_eq!(wide.end, d(2025, 1, 10));
        assert!(!wide.is_single_day());
    }

    #[test]
    fn widening_saturates_at_calendar_limits() {
        let last = DateWindow::single_day(NaiveDate::MAX);
        assert_eq!(last.end, NaiveDate::MAX);
        assert_eq!(last.widen(3).end, NaiveDate::MAX);
        assert_eq!(last.widen(3).start, NaiveDate::MAX - Duration::days(3));

        let first = DateWindow::single_day(NaiveDate::MIN);
        let wide = first.widen(3);
        assert_eq!(wide.start, NaiveDate::MIN);
        assert_eq!(wide.end, NaiveDate::MIN + Duration::days(4));
    }

    #[test]
    fn query_deserializes_from_request_shape() {
        let q: SearchQuery = serde_json::from_value(serde_json::json!({
            "date_start": "2025-01-06",
            "date_end": "2025-01-07",
            "branch_ids": ["blue_ash"],
            "has_spots": true
        }))
        .unwrap();
        assert_eq!(q.home_branch_ids, vec!["blue_ash".to_string()]);
        assert!(q.require_spots);
        assert_eq!(q.limit, 5);
        assert!(q.window.is_single_day());
    }

    #[test]
    fn tier_serializes_snake_case() {
        assert_eq!(serde_json::to_value(Tier::NearbyOtherDay).unwrap(), "nearby_other_day");
    }
}
