// File: olivia-common/src/models/mod.rs
pub mod availability;
pub mod branch;
pub mod catalog;
pub mod dialogue;
pub mod enrollment;
pub mod plan;
pub mod search;

pub use availability::{availability_color, AvailabilityColor};
pub use branch::{Branch, MemberProfile, Neighbor};
pub use catalog::{ClassDefinition, Session, SessionFilter, SessionStatus, SessionView};
pub use dialogue::{ChatTurn, NarrationRequest, OfferedOption, PlannerContext, TurnRole, UiContext, UserGroup};
pub use enrollment::{CancellationReceipt, EnrollmentOutcome, EnrollmentReceipt, MemberEnrollment};
pub use plan::{EnrollParams, FindSessionsParams, Plan, PlanAction};
pub use search::{DateWindow, NearbyBranch, SearchMeta, SearchOutcome, SearchQuery, SuggestedSession, Tier, TierCounts};
