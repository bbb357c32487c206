// File: olivia-core/src/services/dialogue/manager.rs

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use olivia_common::error::Error;
use olivia_common::models::plan::GENERIC_CLARIFY_QUESTION;
use olivia_common::models::{
    ChatTurn, DateWindow, EnrollParams, EnrollmentReceipt, FindSessionsParams, NarrationRequest,
    Plan, PlanAction, PlannerContext, SearchMeta, SearchQuery, SuggestedSession, UiContext,
    UserGroup,
};
use olivia_common::traits::gateway_traits::{NarratorGateway, PlannerGateway};

use crate::reference::ReferenceData;
use crate::services::dialogue::branch_resolver::{BranchMatch, BranchResolver};
use crate::services::dialogue::config::DialogueConfig;
use crate::services::dialogue::dates::{default_window, infer_window};
use crate::services::dialogue::render;
use crate::services::dialogue::state::{ConversationState, DialoguePhase, PendingSearch, PhaseKind};
use crate::services::dialogue::store::ConversationStore;
use crate::services::enrollment_service::EnrollmentService;
use crate::services::search::AvailabilitySearch;
use crate::utils::time::{local_day, Clock};

pub const ENROLL_TARGET_QUESTION: &str =
    "Which class should I enroll you in? Say \"option 1\" (or click Enroll).";
pub const NO_OPTIONS_QUESTION: &str =
    "I don't have recent options for you yet. Ask me for availability first.";
pub const BRANCH_QUESTION: &str =
    "Which branch is \"your Y\"? (Pick one in the branch filters, or say e.g. \"Blue Ash YMCA\".)";
pub const BRANCH_REASK: &str =
    "Sorry, which YMCA branch should I use? (For example: \"Campbell County YMCA\".)";

static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\boption\s*#?\s*(\d+)\b").expect("option pattern is valid"));
static BARE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#?(\d+)\s*[.!]?\s*$").expect("number pattern is valid"));

const ENROLL_WORDS: &[&str] = &["sign me up", "enroll", "register", "book", "reserve"];
const QUERY_WORDS: &[&str] = &[
    "availability", "available", "schedule", "class", "calendar", "open", "swim", "yoga",
    "hiit", "gym", "session", "lesson",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub conversation_id: String,
    pub message: String,
    #[serde(default)]
    pub ui: UiContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReply {
    pub conversation_id: String,
    pub assistant_message: String,
    pub follow_up_question: Option<String>,
    pub suggested_sessions: Vec<SuggestedSession>,
    pub search_meta: Option<SearchMeta>,
    pub enrollment: Option<EnrollmentReceipt>,
    pub phase: PhaseKind,
}

/// Reply content before greeting and bookkeeping are applied.
#[derive(Debug, Default)]
struct Outcome {
    message: String,
    follow_up: Option<String>,
    suggested: Vec<SuggestedSession>,
    meta: Option<SearchMeta>,
    enrollment: Option<EnrollmentReceipt>,
}

impl Outcome {
    fn question(q: impl Into<String>) -> Self {
        let q = q.into();
        Self { message: q.clone(), follow_up: Some(q), ..Self::default() }
    }

    fn say(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }
}

/// Search parameters after merging planner output, UI selections and defaults.
#[derive(Debug, Clone)]
struct ResolvedSearch {
    window: DateWindow,
    branch_ids: Vec<String>,
    buckets: Vec<String>,
    tags: Vec<String>,
    require_spots: bool,
    limit: usize,
}

/// Drives one conversation turn at a time, per conversation id.
pub struct DialogueManager {
    store: Arc<dyn ConversationStore>,
    search: Arc<AvailabilitySearch>,
    enrollment: Arc<EnrollmentService>,
    planner: Arc<dyn PlannerGateway>,
    narrator: Arc<dyn NarratorGateway>,
    reference: Arc<ReferenceData>,
    resolver: BranchResolver,
    clock: Arc<dyn Clock>,
    config: DialogueConfig,
    home_phrases: Vec<Regex>,
}

impl DialogueManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ConversationStore>,
        search: Arc<AvailabilitySearch>,
        enrollment: Arc<EnrollmentService>,
        planner: Arc<dyn PlannerGateway>,
        narrator: Arc<dyn NarratorGateway>,
        reference: Arc<ReferenceData>,
        clock: Arc<dyn Clock>,
        config: DialogueConfig,
    ) -> Self {
        let resolver = BranchResolver::new(reference.branches(), &config.noise_tokens);
        let home_phrases = config
            .home_branch_phrases
            .iter()
            .filter_map(|p| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(p.trim()))).ok())
            .collect();
        Self {
            store,
            search,
            enrollment,
            planner,
            narrator,
            reference,
            resolver,
            clock,
            config,
            home_phrases,
        }
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn ConversationStore> {
        self.store.clone()
    }

    /// Handles one user turn. The conversation's lock is held until the reply
    /// is recorded, so concurrent turns on one conversation run one after another.
    /// A turn that fails leaves the stored state untouched, user turn included.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnReply, Error> {
        let conversation_id = request.conversation_id.trim().to_string();
        if conversation_id.is_empty() {
            return Err(Error::Validation("conversation_id is required".into()));
        }

        let now = self.clock.now();
        let cap = self.config.history_cap;
        let handle = self
            .store
            .get_or_create(&conversation_id, &|| ConversationState::new(conversation_id.clone(), cap, now));
        let mut stored = handle.lock().await;

        let mut state = stored.clone();
        let greet = state.needs_greeting();
        let prior_history = state.history();
        state.push_turn(ChatTurn::user(request.message.clone()));

        let outcome = match self.dispatch(&mut state, &request, prior_history).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("turn failed for conversation {}: {}", conversation_id, e);
                return Err(e);
            }
        };

        let mut message = outcome.message;
        if greet {
            message = render::with_greeting(&self.config.greeting, &message);
        }
        state.push_turn(ChatTurn::assistant(message.clone()));
        state.touch(now);
        *stored = state;
        let state = &*stored;

        debug!(
            "conversation {} now {:?} with {} offered options",
            conversation_id,
            state.phase.kind(),
            state.last_offered().len()
        );

        Ok(TurnReply {
            conversation_id,
            assistant_message: message,
            follow_up_question: outcome.follow_up,
            suggested_sessions: outcome.suggested,
            search_meta: outcome.meta,
            enrollment: outcome.enrollment,
            phase: state.phase.kind(),
        })
    }

    async fn dispatch(
        &self,
        state: &mut ConversationState,
        request: &TurnRequest,
        history: Vec<ChatTurn>,
    ) -> Result<Outcome, Error> {
        let message = request.message.trim();
        let ui = &request.ui;

        if let DialoguePhase::AwaitingBranchClarification { pending } = state.phase.clone() {
            return self.answer_branch_question(state, message, ui, pending).await;
        }

        if message.is_empty() {
            return Ok(Outcome::question(GENERIC_CLARIFY_QUESTION));
        }

        if let Some(ordinal) = self.parse_ordinal(state, message) {
            return self.enroll_by_ordinal(state, request, ordinal).await;
        }

        // a branch named in the message counts as a selection for this turn
        let mut planner_ui = ui.clone();
        if planner_ui.selected_branch_ids.is_empty() {
            if let Some(id) = self.resolver.resolved(message) {
                planner_ui.selected_branch_ids = vec![id];
            }
        }

        let now = self.clock.now();
        let today = local_day(self.search.timezone(), now);
        let ctx = PlannerContext {
            conversation_id: state.conversation_id.clone(),
            now,
            today,
            default_window: default_window(today),
            branches: self.reference.branches().to_vec(),
            history,
            ui: planner_ui.clone(),
            message: message.to_string(),
            offered: state.last_offered().to_vec(),
        };

        let plan = match self.planner.plan(&ctx).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!("planner unavailable for {}: {}; using local fallback", state.conversation_id, e);
                fallback_plan(message, &planner_ui)
            }
        };
        debug!("conversation {} plan: {:?}", state.conversation_id, plan.action());

        match plan {
            Plan::FindSessions(params) => {
                let resolved = self.resolve_search(&params, message, &planner_ui, today);
                if resolved.branch_ids.is_empty() && self.mentions_home_branch(message) {
                    return Ok(park_search(state, message, resolved));
                }
                state.phase = DialoguePhase::Ready;
                self.search_reply(state, message, resolved, true).await
            }
            Plan::Enroll(params) => self.enroll_from_plan(state, request, params).await,
            Plan::Clarify { question } => {
                let has_branch = !planner_ui.selected_branch_ids.is_empty()
                    || !self.default_branches(&planner_ui).is_empty();
                if !has_branch && self.mentions_home_branch(message) {
                    let resolved = self.resolve_search(&FindSessionsParams::default(), message, &planner_ui, today);
                    return Ok(park_search(state, message, resolved));
                }
                state.phase = DialoguePhase::Ready;
                Ok(Outcome::question(question))
            }
        }
    }

    /// The turn after "which branch?". Never consults the planner.
    async fn answer_branch_question(
        &self,
        state: &mut ConversationState,
        message: &str,
        ui: &UiContext,
        pending: PendingSearch,
    ) -> Result<Outcome, Error> {
        let selected = ui
            .selected_branch_ids
            .first()
            .filter(|id| self.reference.branch(id).is_some());
        if selected.is_none() && !ui.selected_branch_ids.is_empty() {
            debug!("ignoring unknown branch selection {:?}", ui.selected_branch_ids);
        }
        let branch_id = match selected {
            Some(id) => Some(id.clone()),
            None => match self.resolver.resolve(message) {
                BranchMatch::Resolved(id) => Some(id),
                BranchMatch::Ambiguous(ids) => {
                    let names: Vec<String> = ids.iter().map(|id| self.reference.branch_name(id)).collect();
                    return Ok(Outcome::question(format!(
                        "I found a few branches matching that: {}. Which one should I use?",
                        names.join(", ")
                    )));
                }
                BranchMatch::Unmatched => None,
            },
        };

        let Some(branch_id) = branch_id else {
            return Ok(Outcome::question(BRANCH_REASK));
        };

        info!(
            "conversation {} resolved branch {}; re-running \"{}\"",
            state.conversation_id, branch_id, pending.original_message
        );
        let resolved = ResolvedSearch {
            window: pending.window,
            branch_ids: vec![branch_id],
            buckets: pending.buckets,
            tags: pending.tags,
            require_spots: pending.require_spots,
            limit: pending.limit,
        };
        let outcome = self.search_reply(state, &pending.original_message, resolved, false).await?;
        state.phase = DialoguePhase::Ready;
        Ok(outcome)
    }

    fn parse_ordinal(&self, state: &ConversationState, message: &str) -> Option<usize> {
        let caps = OPTION_RE.captures(message).or_else(|| {
            (state.phase == DialoguePhase::AwaitingEnrollmentTarget)
                .then(|| BARE_NUMBER_RE.captures(message))
                .flatten()
        })?;
        caps.get(1)?.as_str().parse::<usize>().ok()
    }

    fn member_id(&self, ui: &UiContext, planned: Option<&str>) -> String {
        ui.member_id
            .as_deref()
            .or(planned)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.default_member_id.as_str())
            .to_string()
    }

    async fn enroll_by_ordinal(
        &self,
        state: &mut ConversationState,
        request: &TurnRequest,
        ordinal: usize,
    ) -> Result<Outcome, Error> {
        let Some(option) = state.resolve_ordinal(ordinal).cloned() else {
            state.phase = DialoguePhase::AwaitingEnrollmentTarget;
            if state.last_offered().is_empty() {
                return Ok(Outcome::question(NO_OPTIONS_QUESTION));
            }
            return Ok(Outcome::question(format!(
                "I only have options 1 to {} right now. {}",
                state.last_offered().len(),
                ENROLL_TARGET_QUESTION
            )));
        };
        let member_id = self.member_id(&request.ui, None);
        self.enroll_session(state, request, &option.session_id, Some(option.label.as_str()), &member_id)
            .await
    }

    async fn enroll_from_plan(
        &self,
        state: &mut ConversationState,
        request: &TurnRequest,
        params: EnrollParams,
    ) -> Result<Outcome, Error> {
        let member_id = self.member_id(&request.ui, params.member_id.as_deref());

        if let Some(session_id) = params.session_id.as_deref() {
            let label = state
                .last_offered()
                .iter()
                .find(|o| o.session_id == session_id)
                .map(|o| o.label.clone());
            return self
                .enroll_session(state, request, session_id, label.as_deref(), &member_id)
                .await;
        }

        match params.option {
            Some(ordinal) => self.enroll_by_ordinal(state, request, ordinal).await,
            None => {
                state.phase = DialoguePhase::AwaitingEnrollmentTarget;
                Ok(Outcome::question(ENROLL_TARGET_QUESTION))
            }
        }
    }

    async fn enroll_session(
        &self,
        state: &mut ConversationState,
        request: &TurnRequest,
        session_id: &str,
        label: Option<&str>,
        member_id: &str,
    ) -> Result<Outcome, Error> {
        let receipt = match self.enrollment.enroll(session_id, member_id).await {
            Ok(receipt) => receipt,
            Err(Error::NotFound(_)) | Err(Error::Validation(_)) => {
                state.phase = DialoguePhase::AwaitingEnrollmentTarget;
                return Ok(Outcome::question(format!(
                    "I couldn't find {} on the schedule anymore. {}",
                    label.unwrap_or("that session"),
                    ENROLL_TARGET_QUESTION
                )));
            }
            Err(Error::Conflict(_)) => {
                state.phase = DialoguePhase::Ready;
                return Ok(Outcome::say(format!(
                    "Sorry, {} is full. Want me to look for another time or a nearby Y?",
                    label.unwrap_or("that session")
                )));
            }
            Err(e) => return Err(e),
        };
        state.phase = DialoguePhase::Ready;

        let deterministic = render::enrollment_message(&receipt, label);
        let payload = json!({
            "enroll_result": receipt,
            "session_label": label,
        });
        let message = self
            .narrate(PlanAction::Enroll, &request.message, payload, &[receipt.remaining])
            .await
            .unwrap_or(deterministic);

        Ok(Outcome { message, enrollment: Some(receipt), ..Outcome::default() })
    }

    async fn search_reply(
        &self,
        state: &mut ConversationState,
        user_message: &str,
        resolved: ResolvedSearch,
        use_narrator: bool,
    ) -> Result<Outcome, Error> {
        let query = SearchQuery {
            window: resolved.window,
            home_branch_ids: resolved.branch_ids,
            buckets: resolved.buckets.clone(),
            tags: resolved.tags,
            require_spots: resolved.require_spots,
            limit: resolved.limit,
        };
        let outcome = self.search.search(&query).await?;
        let tz = self.search.timezone();
        state.offer(&outcome.results, tz);

        if outcome.results.is_empty() {
            return Ok(Outcome {
                message: render::no_results(&outcome.meta, &resolved.buckets),
                meta: Some(outcome.meta),
                ..Outcome::default()
            });
        }

        let header = render::options_header(&outcome.meta, &outcome.results);
        let deterministic = render::listing(&outcome.meta, &outcome.results, tz);

        let message = if use_narrator {
            let payload = json!({
                "date_start": query.window.start,
                "date_end": query.window.end,
                "suggested_sessions": outcome.results,
                "search_meta": outcome.meta,
                "options_header": header,
            });
            let allowed: Vec<i32> = outcome.results.iter().map(|r| r.session.remaining).collect();
            match self.narrate(PlanAction::FindSessions, user_message, payload, &allowed).await {
                Some(narrated) => render::with_header(&narrated, &header),
                None => deterministic,
            }
        } else {
            deterministic
        };

        Ok(Outcome {
            message,
            suggested: outcome.results,
            meta: Some(outcome.meta),
            ..Outcome::default()
        })
    }

    /// Narrator text, or `None` when it failed, said nothing useful, or
    /// quoted spot counts that are not in the payload.
    async fn narrate(
        &self,
        action: PlanAction,
        user_message: &str,
        payload: serde_json::Value,
        allowed_spots: &[i32],
    ) -> Option<String> {
        let request = NarrationRequest { action, user_message: user_message.to_string(), payload };
        match self.narrator.narrate(&request).await {
            Ok(text) if render::is_degenerate(&text) => {
                debug!("narrator returned a placeholder; rendering locally");
                None
            }
            Ok(text) if !render::spot_counts_consistent(&text, allowed_spots) => {
                warn!("narrator altered spot counts; rendering locally");
                None
            }
            Ok(text) => Some(text),
            Err(e) => {
                warn!("narrator unavailable: {}; rendering locally", e);
                None
            }
        }
    }

    fn mentions_home_branch(&self, message: &str) -> bool {
        self.home_phrases.iter().any(|re| re.is_match(message))
    }

    /// Member-level defaults: front desk branch, UI default, profile home branch.
    fn default_branches(&self, ui: &UiContext) -> Vec<String> {
        if ui.user_group == Some(UserGroup::FrontDesk) {
            if let Some(id) = &self.config.front_desk_branch_id {
                return vec![id.clone()];
            }
        }
        if let Some(id) = ui.default_branch_id.as_deref().filter(|id| !id.trim().is_empty()) {
            return vec![id.to_string()];
        }
        ui.member_id
            .as_deref()
            .and_then(|m| self.reference.home_branch(m))
            .map(|id| vec![id.to_string()])
            .unwrap_or_default()
    }

    fn resolve_search(
        &self,
        params: &FindSessionsParams,
        message: &str,
        ui: &UiContext,
        today: chrono::NaiveDate,
    ) -> ResolvedSearch {
        let window = match (params.date_start, params.date_end) {
            (Some(start), Some(end)) if end > start => DateWindow { start, end },
            (Some(start), _) => DateWindow::single_day(start),
            _ => infer_window(message, today).unwrap_or_else(|| default_window(today)),
        };

        let mut branch_ids = ui.selected_branch_ids.clone();
        if branch_ids.is_empty() {
            branch_ids = params
                .branch_ids
                .clone()
                .unwrap_or_default()
                .into_iter()
                .filter(|id| self.reference.contains(id))
                .collect();
        }
        if branch_ids.is_empty() {
            if let Some(id) = self.resolver.resolved(message) {
                branch_ids.push(id);
            }
        }
        if branch_ids.is_empty() {
            branch_ids = self.default_branches(ui);
        }

        let buckets = if ui.selected_buckets.is_empty() {
            params.buckets.clone().unwrap_or_default()
        } else {
            ui.selected_buckets.clone()
        };
        let tags = if ui.tags.is_empty() {
            params.tags.clone().unwrap_or_default()
        } else {
            ui.tags.clone()
        };
        let require_spots = ui
            .only_has_spots
            .or(params.has_spots)
            .unwrap_or(self.config.default_require_spots);
        let limit = params
            .limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1));

        ResolvedSearch { window, branch_ids, buckets, tags, require_spots, limit }
    }
}

/// Remembers the search and asks which branch "my Y" means.
fn park_search(state: &mut ConversationState, message: &str, resolved: ResolvedSearch) -> Outcome {
    state.phase = DialoguePhase::AwaitingBranchClarification {
        pending: PendingSearch {
            original_message: message.to_string(),
            window: resolved.window,
            buckets: resolved.buckets,
            tags: resolved.tags,
            require_spots: resolved.require_spots,
            limit: resolved.limit,
        },
    };
    Outcome::question(BRANCH_QUESTION)
}

/// Keyword routing used only when the planner cannot be reached.
pub fn fallback_plan(message: &str, ui: &UiContext) -> Plan {
    let msg = message.to_lowercase();
    if ENROLL_WORDS.iter().any(|w| msg.contains(w)) {
        return Plan::Enroll(EnrollParams::default());
    }
    let has_ui_filters = !ui.selected_branch_ids.is_empty() || !ui.selected_buckets.is_empty();
    if has_ui_filters || QUERY_WORDS.iter().any(|w| msg.contains(w)) {
        return Plan::FindSessions(FindSessionsParams::default());
    }
    Plan::generic_clarify()
}
