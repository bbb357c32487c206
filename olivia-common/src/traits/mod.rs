// File: olivia-common/src/traits/mod.rs
pub mod gateway_traits;
pub mod repository_traits;

pub use gateway_traits::{NarratorGateway, PlannerGateway};
pub use repository_traits::{CatalogRepository, EnrollmentRepository};
