// File: olivia-common/src/traits/repository_traits.rs

use async_trait::async_trait;

use crate::error::Error;
use crate::models::{CancellationReceipt, EnrollmentOutcome, SessionFilter, SessionView};

/// Read-only catalog queries.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Matching sessions joined with current enrollment counts, start time ascending.
    /// No match is an empty vector, not an error.
    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<SessionView>, Error>;

    /// Any status. `None` if the id is unknown.
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionView>, Error>;
}

/// Capacity-checked, per-member idempotent enrollment mutations.
///
/// Implementations must run check-existing, check-capacity and mutate as a single
/// atomic unit per session.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// `NotFound` if the session is missing or not scheduled, `Conflict` if full.
    async fn enroll(&self, session_id: &str, member_id: &str) -> Result<EnrollmentOutcome, Error>;

    /// Removes the member's enrollment if present. Not enrolled is a no-op, not an error.
    async fn cancel(&self, session_id: &str, member_id: &str) -> Result<CancellationReceipt, Error>;
}
