// File: olivia-core/src/repositories/memory/catalog.rs

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use olivia_common::error::Error;
use olivia_common::models::{
    Branch, CancellationReceipt, ClassDefinition, EnrollmentOutcome, MemberEnrollment, Session,
    SessionFilter, SessionStatus, SessionView,
};
use olivia_common::traits::repository_traits::{CatalogRepository, EnrollmentRepository};

/// Initial enrolled count for a session, without member rows behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCount {
    pub session_id: String,
    pub enrolled: i32,
}

/// JSON fixture for the in-memory catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub classes: Vec<ClassDefinition>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub enrollments: Vec<SeedCount>,
    #[serde(default)]
    pub member_enrollments: Vec<MemberEnrollment>,
}

impl CatalogSeed {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Default)]
struct CatalogState {
    branch_names: HashMap<String, String>,
    classes: HashMap<String, ClassDefinition>,
    sessions: HashMap<String, Session>,
    enrolled: HashMap<String, i32>,
    members: HashSet<(String, String)>,
}

impl CatalogState {
    fn view(&self, session: &Session) -> Option<SessionView> {
        let class = self.classes.get(&session.class_id)?;
        let branch_name = self
            .branch_names
            .get(&session.branch_id)
            .map(String::as_str)
            .unwrap_or(session.branch_id.as_str());
        let enrolled = self.enrolled.get(&session.id).copied().unwrap_or(0);
        Some(SessionView::from_parts(session, class, branch_name, enrolled))
    }

    fn counts(&self, session_id: &str, capacity: i32) -> (i32, i32) {
        (capacity, self.enrolled.get(session_id).copied().unwrap_or(0))
    }
}

/// Catalog and enrollment store held in process memory.
///
/// A single write lock covers the whole enroll/cancel sequence, which makes
/// each mutation atomic with respect to every other one.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let catalog = Self::new();
        {
            let mut state = catalog.state.write();
            for branch in seed.branches {
                state.branch_names.insert(branch.id, branch.name);
            }
            for class in seed.classes {
                state.classes.insert(class.id.clone(), class);
            }
            for session in seed.sessions {
                state.sessions.insert(session.id.clone(), session);
            }
            for count in seed.enrollments {
                state.enrolled.insert(count.session_id, count.enrolled.max(0));
            }
            for m in seed.member_enrollments {
                if state.members.insert((m.session_id.clone(), m.member_id)) {
                    let current = state.enrolled.entry(m.session_id).or_insert(0);
                    *current += 1;
                }
            }
        }
        catalog
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let catalog = Self::from_seed(CatalogSeed::from_path(path)?);
        info!("Loaded catalog seed from {} ({} sessions)", path.display(), catalog.session_count());
        Ok(catalog)
    }

    pub fn add_branch(&self, id: impl Into<String>, name: impl Into<String>) {
        self.state.write().branch_names.insert(id.into(), name.into());
    }

    pub fn add_class(&self, class: ClassDefinition) {
        self.state.write().classes.insert(class.id.clone(), class);
    }

    pub fn add_session(&self, session: Session, enrolled: i32) {
        let mut state = self.state.write();
        state.enrolled.insert(session.id.clone(), enrolled.max(0));
        state.sessions.insert(session.id.clone(), session);
    }

    pub fn set_status(&self, session_id: &str, status: SessionStatus) -> bool {
        match self.state.write().sessions.get_mut(session_id) {
            Some(session) => {
                session.status = status;
                true
            }
            None => false,
        }
    }

    pub fn session_count(&self) -> usize {
        self.state.read().sessions.len()
    }

    pub fn enrolled_count(&self, session_id: &str) -> i32 {
        self.state.read().enrolled.get(session_id).copied().unwrap_or(0)
    }

    pub fn member_count(&self, session_id: &str) -> usize {
        self.state
            .read()
            .members
            .iter()
            .filter(|(sid, _)| sid == session_id)
            .count()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<SessionView>, Error> {
        let state = self.state.read();
        let mut out: Vec<SessionView> = state
            .sessions
            .values()
            .filter_map(|s| state.view(s))
            .filter(|v| filter.matches(v))
            .collect();
        out.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.session_id.cmp(&b.session_id)));
        Ok(out)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionView>, Error> {
        let state = self.state.read();
        Ok(state.sessions.get(session_id).and_then(|s| state.view(s)))
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryCatalog {
    async fn enroll(&self, session_id: &str, member_id: &str) -> Result<EnrollmentOutcome, Error> {
        let mut state = self.state.write();

        let capacity = match state.sessions.get(session_id) {
            Some(s) if s.status == SessionStatus::Scheduled => s.capacity,
            _ => return Err(Error::NotFound(format!("Session not found: {}", session_id))),
        };
        let (_, enrolled) = state.counts(session_id, capacity);

        let key = (session_id.to_string(), member_id.to_string());
        if state.members.contains(&key) {
            return Ok(EnrollmentOutcome { already_enrolled: true, capacity, enrolled });
        }

        if capacity - enrolled <= 0 {
            return Err(Error::Conflict(format!("Session is full: {}", session_id)));
        }

        state.members.insert(key);
        *state.enrolled.entry(session_id.to_string()).or_insert(0) += 1;

        let (capacity, enrolled) = state.counts(session_id, capacity);
        debug!("member {} enrolled in {} ({}/{})", member_id, session_id, enrolled, capacity);
        Ok(EnrollmentOutcome { already_enrolled: false, capacity, enrolled })
    }

    async fn cancel(&self, session_id: &str, member_id: &str) -> Result<CancellationReceipt, Error> {
        let mut state = self.state.write();

        let capacity = match state.sessions.get(session_id) {
            Some(s) => s.capacity,
            None => return Err(Error::NotFound(format!("Session not found: {}", session_id))),
        };

        let was_enrolled = state
            .members
            .remove(&(session_id.to_string(), member_id.to_string()));
        if was_enrolled {
            if let Some(count) = state.enrolled.get_mut(session_id) {
                *count = (*count - 1).max(0);
            }
        }

        let (capacity, enrolled) = state.counts(session_id, capacity);
        Ok(CancellationReceipt::new(session_id, was_enrolled, capacity, enrolled))
    }
}
