// File: olivia-core/src/services/enrollment_service.rs

use std::sync::Arc;

use tracing::{info, warn};

use olivia_common::error::Error;
use olivia_common::models::{CancellationReceipt, EnrollmentReceipt};
use olivia_common::traits::repository_traits::EnrollmentRepository;

pub struct EnrollmentService {
    repo: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    pub fn new(repo: Arc<dyn EnrollmentRepository>) -> Self {
        Self { repo }
    }

    fn validate(session_id: &str, member_id: &str) -> Result<(), Error> {
        if session_id.trim().is_empty() {
            return Err(Error::Validation("session_id is required".into()));
        }
        if member_id.trim().is_empty() {
            return Err(Error::Validation("member_id is required".into()));
        }
        Ok(())
    }

    /// `NotFound` / `Conflict` are returned as-is and never retried.
    pub async fn enroll(&self, session_id: &str, member_id: &str) -> Result<EnrollmentReceipt, Error> {
        Self::validate(session_id, member_id)?;
        match self.repo.enroll(session_id, member_id).await {
            Ok(outcome) => {
                let receipt = EnrollmentReceipt::from_outcome(session_id, outcome);
                if receipt.already_enrolled {
                    info!("member {} already enrolled in {}", member_id, session_id);
                } else {
                    info!(
                        "member {} enrolled in {} ({} spots left)",
                        member_id, session_id, receipt.remaining
                    );
                }
                Ok(receipt)
            }
            Err(e) => {
                if e.is_enrollment_failure() {
                    warn!("enrollment of {} in {} refused: {}", member_id, session_id, e);
                }
                Err(e)
            }
        }
    }

    pub async fn cancel(&self, session_id: &str, member_id: &str) -> Result<CancellationReceipt, Error> {
        Self::validate(session_id, member_id)?;
        let receipt = self.repo.cancel(session_id, member_id).await?;
        if receipt.was_enrolled {
            info!("member {} cancelled {}", member_id, session_id);
        }
        Ok(receipt)
    }
}
