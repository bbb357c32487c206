// File: olivia-common/src/models/enrollment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::availability::{availability_color, AvailabilityColor};

/// Member-level enrollment record. Unique per (session_id, member_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberEnrollment {
    pub session_id: String,
    pub member_id: String,
    #[serde(default = "Utc::now")]
    pub enrolled_at: DateTime<Utc>,
}

/// What the store reports back after an enroll attempt that did not fail.
/// `capacity` / `enrolled` are re-read after the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentOutcome {
    pub already_enrolled: bool,
    pub capacity: i32,
    pub enrolled: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentReceipt {
    pub ok: bool,
    pub already_enrolled: bool,
    pub session_id: String,
    pub capacity: i32,
    pub enrolled: i32,
    pub remaining: i32,
    pub availability_color: AvailabilityColor,
}

impl EnrollmentReceipt {
    pub fn from_outcome(session_id: impl Into<String>, outcome: EnrollmentOutcome) -> Self {
        Self {
            ok: true,
            already_enrolled: outcome.already_enrolled,
            session_id: session_id.into(),
            capacity: outcome.capacity,
            enrolled: outcome.enrolled,
            remaining: outcome.capacity - outcome.enrolled,
            availability_color: availability_color(outcome.enrolled, outcome.capacity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationReceipt {
    pub ok: bool,
    pub was_enrolled: bool,
    pub session_id: String,
    pub capacity: i32,
    pub enrolled: i32,
    pub remaining: i32,
    pub availability_color: AvailabilityColor,
}

impl CancellationReceipt {
    pub fn new(session_id: impl Into<String>, was_enrolled: bool, capacity: i32, enrolled: i32) -> Self {
        Self {
            ok: true,
            was_enrolled,
            session_id: session_id.into(),
            capacity,
            enrolled,
            remaining: capacity - enrolled,
            availability_color: availability_color(enrolled, capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_derives_remaining_and_color() {
        let receipt = EnrollmentReceipt::from_outcome(
            "s1",
            EnrollmentOutcome { already_enrolled: false, capacity: 10, enrolled: 10 },
        );
        assert!(receipt.ok);
        assert_eq!(receipt.remaining, 0);
        assert_eq!(receipt.availability_color, AvailabilityColor::Red);
    }
}
