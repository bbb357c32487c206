// File: olivia-common/src/models/plan.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const GENERIC_CLARIFY_QUESTION: &str =
    "Do you want class availability, or should I enroll you in a session?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    FindSessions,
    Enroll,
    Clarify,
}

impl PlanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAction::FindSessions => "find_sessions",
            PlanAction::Enroll => "enroll",
            PlanAction::Clarify => "clarify",
        }
    }
}

/// Every field is optional; gaps are filled from UI context, message inference or defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindSessionsParams {
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub branch_ids: Option<Vec<String>>,
    pub buckets: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub has_spots: Option<bool>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollParams {
    pub session_id: Option<String>,
    /// 1-based ordinal into the last offered options.
    pub option: Option<usize>,
    pub member_id: Option<String>,
}

impl EnrollParams {
    pub fn has_target(&self) -> bool {
        self.session_id.is_some() || self.option.is_some()
    }
}

/// Validated planner decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    FindSessions(FindSessionsParams),
    Enroll(EnrollParams),
    Clarify { question: String },
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    enroll: Option<Value>,
    #[serde(default)]
    follow_up_question: Option<Value>,
}

impl Plan {
    pub fn action(&self) -> PlanAction {
        match self {
            Plan::FindSessions(_) => PlanAction::FindSessions,
            Plan::Enroll(_) => PlanAction::Enroll,
            Plan::Clarify { .. } => PlanAction::Clarify,
        }
    }

    pub fn clarify(question: impl Into<String>) -> Self {
        Plan::Clarify { question: question.into() }
    }

    pub fn generic_clarify() -> Self {
        Plan::clarify(GENERIC_CLARIFY_QUESTION)
    }

    /// Builds a plan from the planner's raw JSON. Unknown or missing actions and
    /// non-object payloads collapse to a generic clarification. Individual
    /// malformed parameters are dropped rather than failing the whole plan.
    pub fn from_planner_value(value: &Value) -> Plan {
        let raw: RawPlan = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("planner payload is not a plan object: {}", e);
                return Plan::generic_clarify();
            }
        };

        let action = raw
            .action
            .as_deref()
            .map(|a| a.trim().to_lowercase())
            .unwrap_or_default();
        let follow_up = raw.follow_up_question.as_ref().and_then(non_empty_str);

        match action.as_str() {
            "find_sessions" => Plan::FindSessions(parse_find_params(raw.params.as_ref())),
            "enroll" => Plan::Enroll(parse_enroll_params(raw.enroll.as_ref().or(raw.params.as_ref()))),
            "clarify" => Plan::clarify(follow_up.unwrap_or_else(|| GENERIC_CLARIFY_QUESTION.to_string())),
            other => {
                debug!("planner returned unrecognized action '{}'", other);
                Plan::generic_clarify()
            }
        }
    }
}

fn parse_find_params(value: Option<&Value>) -> FindSessionsParams {
    let Some(Value::Object(map)) = value else {
        return FindSessionsParams::default();
    };
    FindSessionsParams {
        date_start: map.get("date_start").and_then(parse_date),
        date_end: map.get("date_end").and_then(parse_date),
        branch_ids: map.get("branch_ids").and_then(string_list),
        buckets: map.get("buckets").and_then(string_list),
        tags: map.get("tags").and_then(string_list),
        has_spots: map.get("has_spots").and_then(Value::as_bool),
        limit: map.get("limit").and_then(positive_int),
    }
}

fn parse_enroll_params(value: Option<&Value>) -> EnrollParams {
    let Some(Value::Object(map)) = value else {
        return EnrollParams::default();
    };
    EnrollParams {
        session_id: map.get("session_id").and_then(non_empty_str),
        option: map.get("option").and_then(positive_int),
        member_id: map.get("member_id").and_then(non_empty_str),
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    let s = value.as_str()?.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = non_empty_str(value)?;
    // tolerate full timestamps by keeping only the date part
    let day = s.get(..10).unwrap_or(&s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(non_empty_str).collect(),
        Value::String(_) => non_empty_str(value).into_iter().collect(),
        _ => return None,
    };
    if items.is_empty() { None } else { Some(items) }
}

fn positive_int(value: &Value) -> Option<usize> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    if n == 0 { None } else { usize::try_from(n).ok() }
}
