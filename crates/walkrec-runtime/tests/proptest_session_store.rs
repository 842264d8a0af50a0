//! Property-based invariant tests for session persistence.
//!
//! 1. A reload restores exactly the persisted projection of the store.
//! 2. Restored state ids are `1..=n` in table order.
//! 3. Persisting a freshly restored session writes nothing.
//! 4. A `SessionStore` round-trip through a shared backend is lossless.

use std::sync::Arc;

use proptest::prelude::*;
use walkrec_core::PathId;
use walkrec_runtime::{
    Action, ActionType, MemoryStorage, PersistedSession, Recorder, RecorderConfig, SessionStore,
    StorageBackend, StoreState, Transition,
};
use walkrec_widgets::{GuiState, Widget};

// ── Strategies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Step {
    Start(&'static str, u16),
    Click(&'static str, u16, u16),
    Route(&'static str, u16),
    End(&'static str, u16),
}

fn route() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["/", "/projects", "/settings"])
}

fn step() -> impl Strategy<Value = Step> {
    let width = 1u16..6;
    prop_oneof![
        1 => (route(), width.clone()).prop_map(|(r, w)| Step::Start(r, w)),
        4 => (route(), width.clone(), width.clone()).prop_map(|(r, a, b)| Step::Click(r, a, b)),
        1 => (route(), width.clone()).prop_map(|(r, w)| Step::Route(r, w)),
        1 => (route(), width).prop_map(|(r, w)| Step::End(r, w)),
    ]
}

fn page(route: &str, width: u16) -> GuiState {
    GuiState {
        widgets: Some(Widget {
            id: PathId::from("/html/body/div"),
            route: route.to_string(),
            bounding_width: f64::from(width) * 100.0,
            bounding_height: 20.0,
            xpos: 0.0,
            ypos: 0.0,
            style: Default::default(),
            inline_style: Default::default(),
            children: Vec::new(),
            text: None,
        }),
        state_id: -1,
        current_route: route.to_string(),
    }
}

fn action(kind: ActionType, route: &str, prev: u16, next: u16, timestamp: i64) -> Action {
    Action {
        action_type: kind,
        element_id: PathId::from("/html/body/div/button"),
        was_propagated: false,
        prev_state: page(route, prev),
        next_state: page(route, next),
        timestamp,
    }
}

fn replay(recorder: &Recorder, steps: &[Step]) {
    for step in steps {
        let routing = recorder.snapshot().last_action_is_routing();
        let now = recorder.now();
        let transition = match *step {
            Step::Start(r, w) => Transition::StartRecording {
                captured: page(r, w),
                timestamp: now,
            },
            Step::Click(r, a, b) => Transition::RecordAction {
                action: action(ActionType::Click, r, a, b, now),
                prev_action_was_routing: routing,
            },
            Step::Route(r, w) => Transition::RecordAction {
                action: action(ActionType::Route, r, w, w, now),
                prev_action_was_routing: routing,
            },
            Step::End(r, w) => Transition::EndRecording {
                captured: page(r, w),
                timestamp: now,
                prev_action_was_routing: routing,
            },
        };
        recorder.dispatch(transition);
    }
}

fn config() -> RecorderConfig {
    RecorderConfig::default().with_deterministic(true)
}

// ═════════════════════════════════════════════════════════════════════════
// Properties
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn reload_restores_projection(steps in prop::collection::vec(step(), 0..24)) {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        let first = Recorder::with_backend(&config(), Arc::clone(&storage));
        replay(&first, &steps);

        let reloaded = Recorder::with_backend(&config(), storage);
        let before = first.snapshot();
        let after = reloaded.snapshot();
        prop_assert_eq!(
            PersistedSession::from_state(&after),
            PersistedSession::from_state(&before)
        );
        prop_assert!(after.refs.is_empty());
        prop_assert!(after.previous_walkthroughs.is_empty());
    }

    #[test]
    fn restored_state_ids_are_dense(steps in prop::collection::vec(step(), 0..24)) {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        replay(&Recorder::with_backend(&config(), Arc::clone(&storage)), &steps);

        let restored = Recorder::with_backend(&config(), storage).snapshot();
        let ids: Vec<i64> = restored.gui_states.iter().map(|s| s.state_id).collect();
        let expected: Vec<i64> = (1..=ids.len() as i64).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn restored_session_is_not_rewritten(steps in prop::collection::vec(step(), 1..24)) {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        replay(&Recorder::with_backend(&config(), Arc::clone(&storage)), &steps);

        let reloaded = Recorder::with_backend(&config(), storage);
        let session = reloaded.session().expect("persisting recorder");
        prop_assert!(!session.persist(&reloaded.snapshot()).expect("persist"));
    }

    #[test]
    fn session_store_round_trip(steps in prop::collection::vec(step(), 0..24)) {
        let recorder = Recorder::in_memory();
        replay(&recorder, &steps);
        let state = recorder.snapshot();

        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        let writer = SessionStore::new(Arc::clone(&backend), "round-trip");
        writer.persist(&state).expect("persist");

        let restored: StoreState = SessionStore::new(backend, "round-trip").restore();
        prop_assert_eq!(
            PersistedSession::from_state(&restored),
            PersistedSession::from_state(&state)
        );
    }
}
