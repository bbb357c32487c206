// File: olivia-core/src/test_utils/fixtures.rs
//
// A small four-branch world used by unit and integration tests.
// "Today" is Wednesday 2025-01-08 in America/New_York.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use olivia_common::models::{Branch, ClassDefinition, MemberProfile, Neighbor, Session, SessionStatus};

use crate::reference::ReferenceData;
use crate::repositories::memory::catalog::SeedCount;
use crate::repositories::{CatalogSeed, InMemoryCatalog};
use crate::services::search::AvailabilitySearch;
use crate::utils::time::day_start_utc;

pub const TZ: Tz = chrono_tz::America::New_York;

pub fn today() -> NaiveDate {
    day(8)
}

/// A January 2025 date.
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap_or_default()
}

/// Wednesday 2025-01-08, 10:00 local.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 8, 15, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Local wall-clock time on a January 2025 day (no DST transitions in January).
pub fn local(d: u32, hour: i64, minute: i64) -> DateTime<Utc> {
    day_start_utc(TZ, day(d)) + Duration::minutes(hour * 60 + minute)
}

pub fn branches() -> Vec<Branch> {
    vec![
        Branch::new("blue_ash", "Blue Ash YMCA"),
        Branch::new("clippard", "Clippard YMCA"),
        Branch::new("campbell_county", "Campbell County YMCA").with_aliases(["Campbell"]),
        Branch::new("mason", "Mason YMCA"),
    ]
}

fn neighbor(branch_id: &str, drive_minutes: u32) -> Neighbor {
    Neighbor { branch_id: branch_id.to_string(), drive_minutes }
}

pub fn reference() -> ReferenceData {
    let mut proximity = HashMap::new();
    proximity.insert(
        "blue_ash".to_string(),
        vec![neighbor("mason", 18), neighbor("clippard", 12), neighbor("campbell_county", 35)],
    );
    proximity.insert("clippard".to_string(), vec![neighbor("blue_ash", 12)]);
    proximity.insert("mason".to_string(), vec![neighbor("blue_ash", 18)]);

    let mut profiles = HashMap::new();
    profiles.insert(
        "member_blue_ash".to_string(),
        MemberProfile { home_branch_id: Some("blue_ash".to_string()), display_name: Some("Sam".to_string()) },
    );

    ReferenceData::new(branches(), proximity, profiles)
}

fn class(id: &str, name: &str, bucket: &str, tags: &[&str]) -> ClassDefinition {
    ClassDefinition {
        id: id.to_string(),
        name: name.to_string(),
        bucket: bucket.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        default_location: "Main".to_string(),
        default_duration_min: 60,
    }
}

pub fn session(id: &str, class_id: &str, branch_id: &str, start: DateTime<Utc>, capacity: i32) -> Session {
    Session {
        id: id.to_string(),
        class_id: class_id.to_string(),
        branch_id: branch_id.to_string(),
        start,
        end: start + Duration::minutes(60),
        location: "Main".to_string(),
        instructor: "Staff".to_string(),
        capacity,
        status: SessionStatus::Scheduled,
    }
}

/// Catalog contents, by session id:
///
/// | id                 | class      | branch          | local start     | cap | enrolled |
/// |--------------------|------------|-----------------|-----------------|-----|----------|
/// | ba_swim_wed_0700   | lap_swim   | blue_ash        | Wed 8, 07:00    | 10  | 8        |
/// | ba_swim_wed_1800   | lap_swim   | blue_ash        | Wed 8, 18:00    | 12  | 3        |
/// | ba_yoga_thu_0900   | yoga       | blue_ash        | Thu 9, 09:00    | 20  | 5        |
/// | ba_hiit_fri_1730   | hiit       | blue_ash        | Fri 10, 17:30   | 15  | 14       |
/// | ba_yoga_sat_1000   | yoga       | blue_ash        | Sat 11, 10:00   | 20  | 20       |
/// | cl_yoga_thu_1800   | yoga       | clippard        | Thu 9, 18:00    | 20  | 2        |
/// | cl_swim_fri_0600   | lap_swim   | clippard        | Fri 10, 06:00   | 8   | 0        |
/// | ma_yoga_thu_0700   | yoga       | mason           | Thu 9, 07:00    | 15  | 15       |
/// | ma_yoga_thu_1200   | yoga       | mason           | Thu 9, 12:00    | 15  | 1        |
/// | cc_swim_wed_1200   | lap_swim   | campbell_county | Wed 8, 12:00    | 6   | 5        |
/// | cc_youth_swim_sat  | youth_swim | campbell_county | Sat 11, 09:00   | 8   | 0        |
/// | cc_yoga_cancelled  | yoga       | campbell_county | Wed 8, 19:00    | 10  | 0 (cancelled) |
pub fn seed() -> CatalogSeed {
    let classes = vec![
        class("lap_swim", "Lap Swim", "swim", &["lap", "adult"]),
        class("youth_swim", "Youth Swim Lessons", "swim", &["youth"]),
        class("yoga", "Vinyasa Yoga", "yoga", &["adult"]),
        class("hiit", "HIIT Express", "group_exercise", &["adult", "cardio"]),
    ];

    let rows: [(&str, &str, &str, DateTime<Utc>, i32, i32); 12] = [
        ("ba_swim_wed_0700", "lap_swim", "blue_ash", local(8, 7, 0), 10, 8),
        ("ba_swim_wed_1800", "lap_swim", "blue_ash", local(8, 18, 0), 12, 3),
        ("ba_yoga_thu_0900", "yoga", "blue_ash", local(9, 9, 0), 20, 5),
        ("ba_hiit_fri_1730", "hiit", "blue_ash", local(10, 17, 30), 15, 14),
        ("ba_yoga_sat_1000", "yoga", "blue_ash", local(11, 10, 0), 20, 20),
        ("cl_yoga_thu_1800", "yoga", "clippard", local(9, 18, 0), 20, 2),
        ("cl_swim_fri_0600", "lap_swim", "clippard", local(10, 6, 0), 8, 0),
        ("ma_yoga_thu_0700", "yoga", "mason", local(9, 7, 0), 15, 15),
        ("ma_yoga_thu_1200", "yoga", "mason", local(9, 12, 0), 15, 1),
        ("cc_swim_wed_1200", "lap_swim", "campbell_county", local(8, 12, 0), 6, 5),
        ("cc_youth_swim_sat", "youth_swim", "campbell_county", local(11, 9, 0), 8, 0),
        ("cc_yoga_cancelled", "yoga", "campbell_county", local(8, 19, 0), 10, 0),
    ];

    let mut sessions = Vec::new();
    let mut enrollments = Vec::new();
    for (id, class_id, branch_id, start, capacity, enrolled) in rows {
        let mut s = session(id, class_id, branch_id, start, capacity);
        if id == "cc_yoga_cancelled" {
            s.status = SessionStatus::Cancelled;
        }
        sessions.push(s);
        if enrolled > 0 {
            enrollments.push(SeedCount { session_id: id.to_string(), enrolled });
        }
    }

    CatalogSeed {
        branches: branches(),
        classes,
        sessions,
        enrollments,
        member_enrollments: Vec::new(),
    }
}

pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::from_seed(seed())
}

/// Fixture catalog plus a search service over it.
pub fn search_service() -> (Arc<InMemoryCatalog>, AvailabilitySearch) {
    let catalog = Arc::new(catalog());
    let search = AvailabilitySearch::new(catalog.clone(), Arc::new(reference()), TZ);
    (catalog, search)
}
