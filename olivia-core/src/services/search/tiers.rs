// File: olivia-core/src/services/search/tiers.rs

use async_trait::async_trait;
use chrono_tz::Tz;

use olivia_common::error::Error;
use olivia_common::models::{
    DateWindow, NearbyBranch, SessionFilter, SessionView, SuggestedSession, Tier,
};
use olivia_common::traits::repository_traits::CatalogRepository;

use crate::reference::ReferenceData;
use crate::utils::time::{local_day, window_bounds_utc};

/// Days added on each side of a single-day request by the other-day tiers.
pub const WIDEN_DAYS: i64 = 3;

/// Neighbors consulted by the nearby tiers, nearest first.
pub const MAX_NEIGHBORS: usize = 3;

/// Normalized search request shared by every tier.
#[derive(Debug, Clone)]
pub struct SearchPlan {
    pub window: DateWindow,
    pub home_branch_ids: Vec<String>,
    /// Branch whose proximity list drives the nearby tiers.
    pub primary_branch_id: Option<String>,
    pub buckets: Vec<String>,
    pub tags: Vec<String>,
    pub require_spots: bool,
    pub limit: usize,
}

impl SearchPlan {
    fn filter(&self, tz: Tz, window: &DateWindow, branch_ids: &[String]) -> SessionFilter {
        let (start, end) = window_bounds_utc(tz, window);
        SessionFilter::new(start, end)
            .branches(branch_ids)
            .buckets(&self.buckets)
            .tags(&self.tags)
            .require_spots(self.require_spots)
    }
}

/// What a tier can read.
pub struct TierEnv<'a> {
    pub catalog: &'a dyn CatalogRepository,
    pub reference: &'a ReferenceData,
    pub tz: Tz,
}

#[derive(Debug, Default)]
pub struct TierOutput {
    pub results: Vec<SuggestedSession>,
    pub widened_window: Option<DateWindow>,
    pub nearby_branches: Vec<NearbyBranch>,
}

/// One level of the fallback search. `run` never sees results from other tiers;
/// `eligible` decides whether the tier runs at all given what is already collected.
#[async_trait]
pub trait TierStrategy: Send + Sync {
    fn tier(&self) -> Tier;

    fn eligible(&self, plan: &SearchPlan, collected: &[SuggestedSession]) -> bool;

    /// At most `slots` results, already in final order.
    async fn run(&self, env: &TierEnv<'_>, plan: &SearchPlan, slots: usize) -> Result<TierOutput, Error>;
}

fn label(views: Vec<SessionView>, tier: Tier) -> Vec<SuggestedSession> {
    views
        .into_iter()
        .map(|session| SuggestedSession { session, tier, drive_minutes: None })
        .collect()
}

/// Sessions outside the requested window, so "another day" is literally true.
fn outside_window(tz: Tz, window: &DateWindow, views: Vec<SessionView>) -> Vec<SessionView> {
    views
        .into_iter()
        .filter(|v| !window.contains(local_day(tz, v.start)))
        .collect()
}

fn sort_by_start(views: &mut [SessionView]) {
    views.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.session_id.cmp(&b.session_id)));
}

/// Requested window at the home branch(es), or everywhere when no branch is known.
pub struct PrimaryTier;

#[async_trait]
impl TierStrategy for PrimaryTier {
    fn tier(&self) -> Tier {
        Tier::Primary
    }

    fn eligible(&self, _plan: &SearchPlan, collected: &[SuggestedSession]) -> bool {
        collected.is_empty()
    }

    async fn run(&self, env: &TierEnv<'_>, plan: &SearchPlan, slots: usize) -> Result<TierOutput, Error> {
        let filter = plan.filter(env.tz, &plan.window, &plan.home_branch_ids);
        let mut views = env.catalog.list_sessions(&filter).await?;
        sort_by_start(&mut views);
        views.truncate(slots);
        Ok(TierOutput { results: label(views, Tier::Primary), ..TierOutput::default() })
    }
}

/// Same branch, days around a single requested day.
pub struct OtherDayTier;

#[async_trait]
impl TierStrategy for OtherDayTier {
    fn tier(&self) -> Tier {
        Tier::OtherDay
    }

    fn eligible(&self, plan: &SearchPlan, collected: &[SuggestedSession]) -> bool {
        plan.primary_branch_id.is_some() && plan.window.is_single_day() && collected.is_empty()
    }

    async fn run(&self, env: &TierEnv<'_>, plan: &SearchPlan, slots: usize) -> Result<TierOutput, Error> {
        let widened = plan.window.widen(WIDEN_DAYS);
        let filter = plan.filter(env.tz, &widened, &plan.home_branch_ids);
        let views = env.catalog.list_sessions(&filter).await?;
        let mut views = outside_window(env.tz, &plan.window, views);
        sort_by_start(&mut views);
        views.truncate(slots);
        Ok(TierOutput {
            results: label(views, Tier::OtherDay),
            widened_window: Some(widened),
            ..TierOutput::default()
        })
    }
}

/// Neighbors of the primary branch, nearest first, skipping the home branches
/// themselves. Missing or unknown proximity data yields none.
fn nearest_neighbors(env: &TierEnv<'_>, plan: &SearchPlan) -> Vec<NearbyBranch> {
    let Some(primary) = plan.primary_branch_id.as_deref() else {
        return Vec::new();
    };
    env.reference
        .neighbors(primary)
        .iter()
        .filter(|n| !plan.home_branch_ids.iter().any(|h| *h == n.branch_id))
        .take(MAX_NEIGHBORS)
        .map(|n| NearbyBranch {
            branch_id: n.branch_id.clone(),
            branch_name: env.reference.branch_name(&n.branch_id),
            drive_minutes: n.drive_minutes,
        })
        .collect()
}

async fn run_nearby(
    env: &TierEnv<'_>,
    plan: &SearchPlan,
    slots: usize,
    tier: Tier,
    window: DateWindow,
) -> Result<TierOutput, Error> {
    let neighbors = nearest_neighbors(env, plan);
    if neighbors.is_empty() {
        return Ok(TierOutput::default());
    }

    let ids: Vec<String> = neighbors.iter().map(|n| n.branch_id.clone()).collect();
    let filter = plan.filter(env.tz, &window, &ids);
    let mut views = env.catalog.list_sessions(&filter).await?;
    if tier == Tier::NearbyOtherDay {
        views = outside_window(env.tz, &plan.window, views);
    }

    let mut results: Vec<SuggestedSession> = views
        .into_iter()
        .filter_map(|session| {
            let minutes = neighbors
                .iter()
                .find(|n| n.branch_id == session.branch_id)?
                .drive_minutes;
            Some(SuggestedSession { session, tier, drive_minutes: Some(minutes) })
        })
        .collect();
    // closer branch first, then earlier start
    results.sort_by(|a, b| {
        a.drive_minutes
            .cmp(&b.drive_minutes)
            .then_with(|| a.session.start.cmp(&b.session.start))
            .then_with(|| a.session.session_id.cmp(&b.session.session_id))
    });
    results.truncate(slots);

    Ok(TierOutput {
        results,
        widened_window: (tier == Tier::NearbyOtherDay).then_some(window),
        nearby_branches: neighbors,
    })
}

/// Nearby branches on the requested window. Runs when nothing was found yet or
/// the primary branch produced a single ("thin") result.
pub struct NearbySameDayTier;

#[async_trait]
impl TierStrategy for NearbySameDayTier {
    fn tier(&self) -> Tier {
        Tier::NearbySameDay
    }

    fn eligible(&self, plan: &SearchPlan, collected: &[SuggestedSession]) -> bool {
        let thin_primary = collected.len() == 1 && collected[0].tier == Tier::Primary;
        plan.primary_branch_id.is_some() && (collected.is_empty() || thin_primary)
    }

    async fn run(&self, env: &TierEnv<'_>, plan: &SearchPlan, slots: usize) -> Result<TierOutput, Error> {
        run_nearby(env, plan, slots, Tier::NearbySameDay, plan.window).await
    }
}

/// Nearby branches, days around a single requested day. Last resort.
pub struct NearbyOtherDayTier;

#[async_trait]
impl TierStrategy for NearbyOtherDayTier {
    fn tier(&self) -> Tier {
        Tier::NearbyOtherDay
    }

    fn eligible(&self, plan: &SearchPlan, collected: &[SuggestedSession]) -> bool {
        plan.primary_branch_id.is_some() && plan.window.is_single_day() && collected.is_empty()
    }

    async fn run(&self, env: &TierEnv<'_>, plan: &SearchPlan, slots: usize) -> Result<TierOutput, Error> {
        run_nearby(env, plan, slots, Tier::NearbyOtherDay, plan.window.widen(WIDEN_DAYS)).await
    }
}
