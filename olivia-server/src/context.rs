//! olivia-server/src/context.rs
//!
//! Wires repositories, reference data, services and language-model gateways
//! into one shared context.

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use tracing::{info, warn};

use olivia_ai::{AiClient, LlmNarrator, LlmPlanner, Provider, ProviderConfig};
use olivia_common::traits::gateway_traits::{NarratorGateway, PlannerGateway};
use olivia_common::traits::repository_traits::{CatalogRepository, EnrollmentRepository};
use olivia_core::repositories::{
    CatalogSeed, InMemoryCatalog, PostgresCatalogRepository, PostgresEnrollmentRepository,
};
use olivia_core::services::dialogue::{ConversationStore, InMemoryConversationStore};
use olivia_core::services::{AvailabilitySearch, DialogueConfig, DialogueManager, EnrollmentService};
use olivia_core::utils::time::{Clock, SystemClock};
use olivia_core::{Database, Error, ReferenceData};

use crate::args::Args;
use crate::gateways::DisabledGateway;

pub const API_KEY_ENV: &str = "OLIVIA_LLM_API_KEY";

pub struct ServerContext {
    pub db: Option<Database>,
    pub reference: Arc<ReferenceData>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub search: Arc<AvailabilitySearch>,
    pub enrollment: Arc<EnrollmentService>,
    pub conversations: Arc<dyn ConversationStore>,
    pub dialogue: Arc<DialogueManager>,
    pub clock: Arc<dyn Clock>,
    pub timezone: Tz,
}

/// Everything `ServerContext::from_parts` needs. Tests build this by hand.
pub struct ContextParts {
    pub reference: Arc<ReferenceData>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub planner: Arc<dyn PlannerGateway>,
    pub narrator: Arc<dyn NarratorGateway>,
    pub clock: Arc<dyn Clock>,
    pub timezone: Tz,
    pub config: DialogueConfig,
}

impl ServerContext {
    /// Creates and configures the entire context from command-line arguments.
    pub async fn new(args: &Args) -> Result<Self, Error> {
        let timezone: Tz = args
            .timezone
            .parse()
            .map_err(|e| Error::Config(format!("unknown timezone '{}': {}", args.timezone, e)))?;

        let reference = Arc::new(ReferenceData::load(&args.config_dir)?);
        info!(
            "Loaded {} branches from {}",
            reference.branches().len(),
            args.config_dir.display()
        );

        let database_url = args
            .database_url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok());

        let (db, catalog, enrollments): (
            Option<Database>,
            Arc<dyn CatalogRepository>,
            Arc<dyn EnrollmentRepository>,
        ) = match database_url {
            Some(url) => {
                let db = Database::new(&url).await?;
                if args.migrate {
                    db.migrate().await?;
                }
                let catalog = PostgresCatalogRepository::new(db.pool().clone());
                if let Some(path) = &args.seed_file {
                    catalog.import_seed(&CatalogSeed::from_path(path)?).await?;
                }
                let catalog: Arc<dyn CatalogRepository> = Arc::new(catalog);
                let enrollments: Arc<dyn EnrollmentRepository> =
                    Arc::new(PostgresEnrollmentRepository::new(db.pool().clone()));
                (Some(db), catalog, enrollments)
            }
            None => {
                let catalog = match &args.seed_file {
                    Some(path) => InMemoryCatalog::load(path)?,
                    None => {
                        warn!("No database and no seed file; starting with an empty catalog");
                        InMemoryCatalog::from_seed(CatalogSeed {
                            branches: reference.branches().to_vec(),
                            ..CatalogSeed::default()
                        })
                    }
                };
                let shared = Arc::new(catalog);
                let enrollments: Arc<dyn EnrollmentRepository> = shared.clone();
                let catalog: Arc<dyn CatalogRepository> = shared;
                (None, catalog, enrollments)
            }
        };

        let (planner, narrator) = build_gateways(args).await?;

        let mut ctx = Self::from_parts(ContextParts {
            reference,
            catalog,
            enrollments,
            planner,
            narrator,
            clock: Arc::new(SystemClock),
            timezone,
            config: DialogueConfig::default(),
        });
        ctx.db = db;
        Ok(ctx)
    }

    pub fn from_parts(parts: ContextParts) -> Self {
        let search = Arc::new(AvailabilitySearch::new(
            parts.catalog.clone(),
            parts.reference.clone(),
            parts.timezone,
        ));
        let enrollment = Arc::new(EnrollmentService::new(parts.enrollments));
        let conversations: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let dialogue = Arc::new(DialogueManager::new(
            conversations.clone(),
            search.clone(),
            enrollment.clone(),
            parts.planner,
            parts.narrator,
            parts.reference.clone(),
            parts.clock.clone(),
            parts.config,
        ));

        Self {
            db: None,
            reference: parts.reference,
            catalog: parts.catalog,
            search,
            enrollment,
            conversations,
            dialogue,
            clock: parts.clock,
            timezone: parts.timezone,
        }
    }
}

async fn build_gateways(
    args: &Args,
) -> Result<(Arc<dyn PlannerGateway>, Arc<dyn NarratorGateway>), Error> {
    let provider_type = args.llm_provider.trim().to_lowercase();
    if provider_type == "none" {
        info!("Language model disabled; replies are rendered deterministically");
        return Ok((Arc::new(DisabledGateway), Arc::new(DisabledGateway)));
    }

    let mut config = ProviderConfig::new(provider_type.clone(), args.llm_model.clone())
        .with_api_key(std::env::var(API_KEY_ENV).ok());
    if let Some(base) = &args.llm_base_url {
        config = config.with_api_base(base.clone());
    }

    let registry = Arc::new(Provider::new());
    let provider = Provider::from_config(config).map_err(|e| Error::Config(e.to_string()))?;
    registry.register_arc(provider).await;

    let client = Arc::new(AiClient::new(
        registry,
        provider_type.clone(),
        Duration::from_secs(args.llm_timeout_secs),
    ));
    info!("Using {} model '{}' for planning and narration", provider_type, args.llm_model);
    Ok((
        Arc::new(LlmPlanner::new(client.clone())),
        Arc::new(LlmNarrator::new(client)),
    ))
}
