// File: olivia-core/src/services/search/mod.rs

pub mod tiers;

use std::sync::Arc;

use chrono_tz::Tz;
use tracing::debug;

use olivia_common::error::Error;
use olivia_common::models::{SearchMeta, SearchOutcome, SearchQuery, SuggestedSession};
use olivia_common::traits::repository_traits::CatalogRepository;

use crate::reference::ReferenceData;
pub use tiers::{
    NearbyOtherDayTier, NearbySameDayTier, OtherDayTier, PrimaryTier, SearchPlan, TierEnv,
    TierOutput, TierStrategy, MAX_NEIGHBORS, WIDEN_DAYS,
};

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 10;

pub const NO_MATCH_NOTE: &str = "No matching sessions in the requested window, at other days, or at nearby branches.";

/// Tiered fallback search over the catalog.
pub struct AvailabilitySearch {
    catalog: Arc<dyn CatalogRepository>,
    reference: Arc<ReferenceData>,
    tz: Tz,
    tiers: Vec<Box<dyn TierStrategy>>,
}

impl AvailabilitySearch {
    /// Standard tier order: primary, other day, nearby same day, nearby other day.
    pub fn new(catalog: Arc<dyn CatalogRepository>, reference: Arc<ReferenceData>, tz: Tz) -> Self {
        Self::with_tiers(
            catalog,
            reference,
            tz,
            vec![
                Box::new(PrimaryTier),
                Box::new(OtherDayTier),
                Box::new(NearbySameDayTier),
                Box::new(NearbyOtherDayTier),
            ],
        )
    }

    pub fn with_tiers(
        catalog: Arc<dyn CatalogRepository>,
        reference: Arc<ReferenceData>,
        tz: Tz,
        tiers: Vec<Box<dyn TierStrategy>>,
    ) -> Self {
        Self { catalog, reference, tz, tiers }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn plan(&self, query: &SearchQuery) -> SearchPlan {
        let home_branch_ids: Vec<String> = query
            .home_branch_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        SearchPlan {
            window: query.window,
            primary_branch_id: home_branch_ids.first().cloned(),
            home_branch_ids,
            buckets: query.buckets.clone(),
            tags: query.tags.clone(),
            require_spots: query.require_spots,
            limit: query.limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Runs the tiers in order. Results are appended in tier order and never
    /// reordered afterwards.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, Error> {
        let plan = self.plan(query);
        let env = TierEnv {
            catalog: self.catalog.as_ref(),
            reference: self.reference.as_ref(),
            tz: self.tz,
        };

        let mut meta = SearchMeta {
            primary_branch_name: plan
                .primary_branch_id
                .as_deref()
                .map(|id| self.reference.branch_name(id)),
            primary_branch_id: plan.primary_branch_id.clone(),
            requested: Some(plan.window),
            ..SearchMeta::default()
        };
        let mut results: Vec<SuggestedSession> = Vec::new();

        for strategy in &self.tiers {
            let slots = plan.limit.saturating_sub(results.len());
            if slots == 0 {
                break;
            }
            if !strategy.eligible(&plan, &results) {
                continue;
            }

            let output = strategy.run(&env, &plan, slots).await?;
            debug!("tier {} produced {} results", strategy.tier(), output.results.len());
            if output.results.is_empty() {
                continue;
            }

            meta.tiers_used.push(strategy.tier());
            meta.tier_counts.add(strategy.tier(), output.results.len());
            if output.widened_window.is_some() {
                meta.widened_window = output.widened_window;
            }
            if !output.nearby_branches.is_empty() {
                meta.nearby_branches = output.nearby_branches;
            }
            results.extend(output.results.into_iter().take(slots));
        }

        if results.is_empty() {
            meta.note = Some(NO_MATCH_NOTE.to_string());
        }

        Ok(SearchOutcome { results, meta })
    }
}
