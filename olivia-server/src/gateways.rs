// File: olivia-server/src/gateways.rs

use async_trait::async_trait;

use olivia_common::error::Error;
use olivia_common::models::{NarrationRequest, Plan, PlannerContext};
use olivia_common::traits::gateway_traits::{NarratorGateway, PlannerGateway};

/// Stand-in when no language model is configured. Every call fails with
/// `ExternalCapability`, so the dialogue layer takes its deterministic paths.
pub struct DisabledGateway;

#[async_trait]
impl PlannerGateway for DisabledGateway {
    async fn plan(&self, _ctx: &PlannerContext) -> Result<Plan, Error> {
        Err(Error::ExternalCapability("language model disabled".into()))
    }
}

#[async_trait]
impl NarratorGateway for DisabledGateway {
    async fn narrate(&self, _request: &NarrationRequest) -> Result<String, Error> {
        Err(Error::ExternalCapability("language model disabled".into()))
    }
}
