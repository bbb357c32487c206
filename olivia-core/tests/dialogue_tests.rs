// File: olivia-core/tests/dialogue_tests.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;

use olivia_common::models::{
    EnrollParams, FindSessionsParams, NarrationRequest, Plan, PlannerContext, SessionFilter,
    SessionView, UiContext,
};
use olivia_common::traits::gateway_traits::{NarratorGateway, PlannerGateway};
use olivia_common::traits::repository_traits::CatalogRepository;
use olivia_core::repositories::InMemoryCatalog;
use olivia_core::services::dialogue::manager::{BRANCH_QUESTION, BRANCH_REASK};
use olivia_core::services::dialogue::{
    DialogueConfig, DialogueManager, InMemoryConversationStore, PhaseKind, TurnRequest,
};
use olivia_core::services::search::AvailabilitySearch;
use olivia_core::services::EnrollmentService;
use olivia_core::test_utils::fixtures::{self, day};
use olivia_core::utils::time::FixedClock;
use olivia_core::Error;

mock! {
    Planner {}
    #[async_trait]
    impl PlannerGateway for Planner {
        async fn plan(&self, ctx: &PlannerContext) -> Result<Plan, Error>;
    }
}

mock! {
    Narrator {}
    #[async_trait]
    impl NarratorGateway for Narrator {
        async fn narrate(&self, request: &NarrationRequest) -> Result<String, Error>;
    }
}

const GREETING: &str = "This is Olivia with the YMCA! How may I help you?";

/// Fixture catalog whose session listing can be switched off.
struct FlakyCatalog {
    inner: Arc<InMemoryCatalog>,
    down: AtomicBool,
}

#[async_trait]
impl CatalogRepository for FlakyCatalog {
    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<SessionView>, Error> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::Config("catalog offline".into()));
        }
        self.inner.list_sessions(filter).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionView>, Error> {
        self.inner.get_session(session_id).await
    }
}

fn build(planner: MockPlanner, narrator: MockNarrator) -> (Arc<InMemoryCatalog>, Arc<DialogueManager>) {
    let catalog = Arc::new(fixtures::catalog());
    let manager = build_over(catalog.clone(), catalog.clone(), planner, narrator);
    (catalog, manager)
}

fn build_over(
    listing: Arc<dyn CatalogRepository>,
    catalog: Arc<InMemoryCatalog>,
    planner: MockPlanner,
    narrator: MockNarrator,
) -> Arc<DialogueManager> {
    let reference = Arc::new(fixtures::reference());
    let search = AvailabilitySearch::new(listing, reference.clone(), fixtures::TZ);
    let manager = DialogueManager::new(
        Arc::new(InMemoryConversationStore::new()),
        Arc::new(search),
        Arc::new(EnrollmentService::new(catalog)),
        Arc::new(planner),
        Arc::new(narrator),
        reference,
        Arc::new(FixedClock(fixtures::now())),
        DialogueConfig::default(),
    );
    Arc::new(manager)
}

fn turn(message: &str) -> TurnRequest {
    TurnRequest {
        conversation_id: "conv-1".to_string(),
        message: message.to_string(),
        ui: UiContext::default(),
    }
}

fn thursday_yoga_at_blue_ash() -> Plan {
    Plan::FindSessions(FindSessionsParams {
        date_start: Some(day(9)),
        date_end: Some(day(10)),
        branch_ids: Some(vec!["blue_ash".to_string()]),
        buckets: Some(vec!["yoga".to_string()]),
        has_spots: Some(true),
        ..FindSessionsParams::default()
    })
}

fn lap_swim_today() -> Plan {
    Plan::FindSessions(FindSessionsParams {
        date_start: Some(day(8)),
        buckets: Some(vec!["swim".to_string()]),
        ..FindSessionsParams::default()
    })
}

fn offline_narrator() -> MockNarrator {
    let mut narrator = MockNarrator::new();
    narrator
        .expect_narrate()
        .returning(|_| Err(Error::ExternalCapability("narrator offline".into())));
    narrator
}

#[tokio::test]
async fn test_search_turn_is_narrated_and_greets_once() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner
        .expect_plan()
        .times(2)
        .returning(|_| Ok(thursday_yoga_at_blue_ash()));
    let mut narrator = MockNarrator::new();
    narrator
        .expect_narrate()
        .returning(|_| Ok("Option 1 still has 15 spots.".to_string()));

    let (_, manager) = build(planner, narrator);

    let reply = manager.handle_turn(turn("yoga on thursday at blue ash?")).await?;
    assert!(reply.assistant_message.starts_with(GREETING));
    assert!(reply.assistant_message.contains("Option 1 still has 15 spots."));
    assert!(reply.assistant_message.contains("I found options at Blue Ash YMCA."));
    assert_eq!(reply.suggested_sessions.len(), 3);
    assert_eq!(reply.phase, PhaseKind::Ready);
    assert!(reply.search_meta.is_some());

    let reply = manager.handle_turn(turn("and again?")).await?;
    assert!(!reply.assistant_message.contains(GREETING));
    Ok(())
}

#[tokio::test]
async fn test_inconsistent_or_empty_narration_falls_back_to_listing() -> Result<(), Error> {
    for narrated in ["", "done", "Hurry, only 99 spots left!"] {
        let mut planner = MockPlanner::new();
        planner.expect_plan().returning(|_| Ok(thursday_yoga_at_blue_ash()));
        let mut narrator = MockNarrator::new();
        let text = narrated.to_string();
        narrator.expect_narrate().returning(move |_| Ok(text.clone()));

        let (_, manager) = build(planner, narrator);
        let reply = manager.handle_turn(turn("yoga thursday")).await?;

        assert!(reply.assistant_message.contains("1) Vinyasa Yoga @ Blue Ash YMCA"), "{narrated:?}");
        assert!(reply.assistant_message.contains("2) Vinyasa Yoga @ Clippard YMCA (~12 min drive)"));
        assert!(!reply.assistant_message.contains("99 spots"));
    }
    Ok(())
}

#[tokio::test]
async fn test_option_number_enrolls_without_planner() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner
        .expect_plan()
        .times(1)
        .returning(|_| Ok(thursday_yoga_at_blue_ash()));
    let (catalog, manager) = build(planner, offline_narrator());

    manager.handle_turn(turn("yoga thursday")).await?;
    let reply = manager.handle_turn(turn("Sign me up for option 2")).await?;

    let receipt = reply.enrollment.expect("enrollment receipt");
    assert_eq!(receipt.session_id, "cl_yoga_thu_1800");
    assert_eq!(receipt.enrolled, 3);
    assert!(reply.assistant_message.contains("You're enrolled in Vinyasa Yoga @ Clippard YMCA"));
    assert_eq!(catalog.member_count("cl_yoga_thu_1800"), 1);
    assert_eq!(reply.phase, PhaseKind::Ready);
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_option_asks_then_bare_number_enrolls() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner
        .expect_plan()
        .times(1)
        .returning(|_| Ok(thursday_yoga_at_blue_ash()));
    let (_, manager) = build(planner, offline_narrator());

    manager.handle_turn(turn("yoga thursday")).await?;

    let reply = manager.handle_turn(turn("option 5")).await?;
    assert_eq!(reply.phase, PhaseKind::AwaitingEnrollmentTarget);
    assert!(reply.enrollment.is_none());
    let question = reply.follow_up_question.expect("follow-up question");
    assert!(question.contains("options 1 to 3"));

    let reply = manager.handle_turn(turn("3")).await?;
    let receipt = reply.enrollment.expect("enrollment receipt");
    assert_eq!(receipt.session_id, "ma_yoga_thu_1200");
    assert_eq!(reply.phase, PhaseKind::Ready);
    Ok(())
}

#[tokio::test]
async fn test_option_before_any_search() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner.expect_plan().times(0);
    let (_, manager) = build(planner, offline_narrator());

    let reply = manager.handle_turn(turn("option 1 please")).await?;
    assert_eq!(reply.phase, PhaseKind::AwaitingEnrollmentTarget);
    assert!(reply.follow_up_question.is_some());
    assert!(reply.enrollment.is_none());
    Ok(())
}

#[tokio::test]
async fn test_my_y_asks_for_branch_then_reruns_search() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner.expect_plan().times(1).returning(|_| {
        Ok(Plan::FindSessions(FindSessionsParams {
            date_start: Some(day(8)),
            buckets: Some(vec!["swim".to_string()]),
            ..FindSessionsParams::default()
        }))
    });
    let mut narrator = MockNarrator::new();
    narrator.expect_narrate().times(0);
    let (_, manager) = build(planner, narrator);

    let reply = manager.handle_turn(turn("any lap swim at my Y today?")).await?;
    assert_eq!(reply.phase, PhaseKind::AwaitingBranchClarification);
    assert_eq!(reply.follow_up_question.as_deref(), Some(BRANCH_QUESTION));
    assert!(reply.suggested_sessions.is_empty());

    let reply = manager.handle_turn(turn("hmm not sure")).await?;
    assert_eq!(reply.phase, PhaseKind::AwaitingBranchClarification);
    assert_eq!(reply.follow_up_question.as_deref(), Some(BRANCH_REASK));

    let reply = manager.handle_turn(turn("Blue Ash")).await?;
    assert_eq!(reply.phase, PhaseKind::Ready);
    let ids: Vec<&str> = reply
        .suggested_sessions
        .iter()
        .map(|s| s.session.session_id.as_str())
        .collect();
    assert_eq!(ids, vec!["ba_swim_wed_0700", "ba_swim_wed_1800"]);
    assert!(reply.assistant_message.contains("Here are the top options at Blue Ash YMCA:"));
    Ok(())
}

#[tokio::test]
async fn test_failed_rerun_keeps_branch_question_pending() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner.expect_plan().times(1).returning(|_| Ok(lap_swim_today()));
    let mut narrator = MockNarrator::new();
    narrator.expect_narrate().times(0);

    let catalog = Arc::new(fixtures::catalog());
    let flaky = Arc::new(FlakyCatalog { inner: catalog.clone(), down: AtomicBool::new(false) });
    let manager = build_over(flaky.clone(), catalog, planner, narrator);

    let reply = manager.handle_turn(turn("any lap swim at my Y today?")).await?;
    assert_eq!(reply.phase, PhaseKind::AwaitingBranchClarification);

    flaky.down.store(true, Ordering::SeqCst);
    assert!(manager.handle_turn(turn("Blue Ash")).await.is_err());
    {
        let handle = manager.store().get("conv-1").expect("conversation exists");
        let state = handle.lock().await;
        assert_eq!(state.phase.kind(), PhaseKind::AwaitingBranchClarification);
        assert_eq!(state.history_len(), 2);
    }

    flaky.down.store(false, Ordering::SeqCst);
    let reply = manager.handle_turn(turn("Blue Ash")).await?;
    assert_eq!(reply.phase, PhaseKind::Ready);
    let ids: Vec<&str> = reply
        .suggested_sessions
        .iter()
        .map(|s| s.session.session_id.as_str())
        .collect();
    assert_eq!(ids, vec!["ba_swim_wed_0700", "ba_swim_wed_1800"]);

    let handle = manager.store().get("conv-1").expect("conversation exists");
    assert_eq!(handle.lock().await.history_len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_unknown_ui_branch_does_not_answer_clarification() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner.expect_plan().times(1).returning(|_| Ok(lap_swim_today()));
    let (_, manager) = build(planner, offline_narrator());

    manager.handle_turn(turn("any lap swim at my Y today?")).await?;

    let mut request = turn("that one");
    request.ui.selected_branch_ids = vec!["atlantis".to_string()];
    let reply = manager.handle_turn(request).await?;

    assert_eq!(reply.phase, PhaseKind::AwaitingBranchClarification);
    assert_eq!(reply.follow_up_question.as_deref(), Some(BRANCH_REASK));
    assert!(reply.suggested_sessions.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_branch_selected_in_ui_answers_clarification() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner
        .expect_plan()
        .times(1)
        .returning(|_| Ok(Plan::FindSessions(FindSessionsParams::default())));
    let (_, manager) = build(planner, offline_narrator());

    let reply = manager.handle_turn(turn("what's on at my gym this week")).await?;
    assert_eq!(reply.phase, PhaseKind::AwaitingBranchClarification);

    let mut request = turn("that one");
    request.ui.selected_branch_ids = vec!["clippard".to_string()];
    let reply = manager.handle_turn(request).await?;

    assert_eq!(reply.phase, PhaseKind::Ready);
    assert!(!reply.suggested_sessions.is_empty());
    assert!(reply.suggested_sessions.iter().all(|s| s.session.branch_id == "clippard"));
    Ok(())
}

#[tokio::test]
async fn test_planner_failure_uses_keyword_fallback() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner
        .expect_plan()
        .returning(|_| Err(Error::ExternalCapability("timed out".into())));
    let (_, manager) = build(planner, offline_narrator());

    let mut request = turn("any swim this week?");
    request.ui.selected_branch_ids = vec!["blue_ash".to_string()];
    request.ui.selected_buckets = vec!["swim".to_string()];
    let reply = manager.handle_turn(request).await?;

    let ids: Vec<&str> = reply
        .suggested_sessions
        .iter()
        .map(|s| s.session.session_id.as_str())
        .collect();
    assert_eq!(ids, vec!["ba_swim_wed_0700", "ba_swim_wed_1800"]);
    assert!(reply.assistant_message.contains("1) Lap Swim @ Blue Ash YMCA"));

    let reply = manager.handle_turn(turn("hello")).await?;
    assert_eq!(
        reply.follow_up_question.as_deref(),
        Some(olivia_common::models::plan::GENERIC_CLARIFY_QUESTION)
    );
    Ok(())
}

#[tokio::test]
async fn test_front_desk_defaults_to_configured_branch() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner.expect_plan().returning(|_| {
        Ok(Plan::FindSessions(FindSessionsParams {
            date_start: Some(day(8)),
            buckets: Some(vec!["swim".to_string()]),
            ..FindSessionsParams::default()
        }))
    });
    let (_, manager) = build(planner, offline_narrator());

    let mut request = turn("swim today?");
    request.ui.user_group = Some(olivia_common::models::UserGroup::FrontDesk);
    let reply = manager.handle_turn(request).await?;

    assert_eq!(reply.suggested_sessions[0].session.session_id, "cc_swim_wed_1200");
    let meta = reply.search_meta.expect("search meta");
    assert_eq!(meta.primary_branch_id.as_deref(), Some("campbell_county"));
    Ok(())
}

#[tokio::test]
async fn test_full_session_is_reported_conversationally() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner.expect_plan().returning(|_| {
        Ok(Plan::Enroll(EnrollParams {
            session_id: Some("ba_yoga_sat_1000".to_string()),
            ..EnrollParams::default()
        }))
    });
    let (_, manager) = build(planner, offline_narrator());

    let reply = manager.handle_turn(turn("enroll me in saturday yoga")).await?;
    assert!(reply.enrollment.is_none());
    assert!(reply.assistant_message.contains("is full"));
    assert_eq!(reply.phase, PhaseKind::Ready);
    Ok(())
}

#[tokio::test]
async fn test_enroll_without_target_asks_which() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner
        .expect_plan()
        .returning(|_| Ok(Plan::Enroll(EnrollParams::default())));
    let (_, manager) = build(planner, offline_narrator());

    let reply = manager.handle_turn(turn("sign me up")).await?;
    assert_eq!(reply.phase, PhaseKind::AwaitingEnrollmentTarget);
    assert!(reply.follow_up_question.is_some());
    Ok(())
}

#[tokio::test]
async fn test_clarify_plan_is_passed_through() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner
        .expect_plan()
        .returning(|_| Ok(Plan::clarify("Which day works for you?")));
    let (_, manager) = build(planner, offline_narrator());

    let reply = manager.handle_turn(turn("I want to swim")).await?;
    assert_eq!(reply.follow_up_question.as_deref(), Some("Which day works for you?"));
    assert!(reply.assistant_message.ends_with("Which day works for you?"));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_turns_on_one_conversation_are_serialized() -> Result<(), Error> {
    let mut planner = MockPlanner::new();
    planner
        .expect_plan()
        .returning(|_| Ok(Plan::clarify("Which day works for you?")));
    let (_, manager) = build(planner, offline_narrator());

    let a = tokio::spawn({
        let manager = manager.clone();
        async move { manager.handle_turn(turn("first")).await }
    });
    let b = tokio::spawn({
        let manager = manager.clone();
        async move { manager.handle_turn(turn("second")).await }
    });
    let replies = [a.await.expect("task panicked")?, b.await.expect("task panicked")?];

    let greeted = replies
        .iter()
        .filter(|r| r.assistant_message.starts_with(GREETING))
        .count();
    assert_eq!(greeted, 1);

    let handle = manager.store().get("conv-1").expect("conversation exists");
    assert_eq!(handle.lock().await.history_len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_blank_conversation_id_is_rejected() {
    let (_, manager) = build(MockPlanner::new(), MockNarrator::new());
    let mut request = turn("hi");
    request.conversation_id = "  ".to_string();
    assert!(matches!(manager.handle_turn(request).await, Err(Error::Validation(_))));
}
