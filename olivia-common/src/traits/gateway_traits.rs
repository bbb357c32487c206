// File: olivia-common/src/traits/gateway_traits.rs

use async_trait::async_trait;

use crate::error::Error;
use crate::models::{NarrationRequest, Plan, PlannerContext};

/// Structured-intent extraction. Any failure should come back as
/// `Error::ExternalCapability`; callers recover locally.
#[async_trait]
pub trait PlannerGateway: Send + Sync {
    async fn plan(&self, ctx: &PlannerContext) -> Result<Plan, Error>;
}

/// Natural-language rendering of an action result.
#[async_trait]
pub trait NarratorGateway: Send + Sync {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, Error>;
}
