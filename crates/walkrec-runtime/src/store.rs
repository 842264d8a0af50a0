#![forbid(unsafe_code)]

//! Store state and its transitions.
//!
//! [`StoreState`] is immutable: [`StoreState::apply`] returns a new state and
//! leaves the old one untouched. Collections are persistent (`im`), so the
//! copy shares structure with its predecessor and readers holding an old
//! snapshot never observe a half-applied transition.
//!
//! # State machine
//!
//! ```text
//!   IDLE ──StartRecording──▶ RECORDING ──EndRecording──▶ IDLE
//!                             │    ▲
//!                             └────┘ RecordAction
//! ```
//!
//! `RecordAction` outside a recording and `StartRecording` during one are
//! ignored. `RegisterRef` is accepted in any state.

use std::fmt;

use tracing::debug;

use walkrec_core::{NodeRef, PathId};
use walkrec_widgets::{GuiState, StateTable};

use crate::action::{Action, ActionType, Walkthrough};

/// A single store transition.
#[derive(Clone)]
pub enum Transition {
    /// Record (or replace) the live node mounted under `id`.
    RegisterRef { id: PathId, node: NodeRef },
    /// Begin a recording with the given initial capture.
    StartRecording { captured: GuiState, timestamp: i64 },
    /// Append an intercepted action.
    RecordAction {
        action: Action,
        prev_action_was_routing: bool,
    },
    /// Finish the recording and archive it.
    EndRecording {
        captured: GuiState,
        timestamp: i64,
        prev_action_was_routing: bool,
    },
}

impl Transition {
    /// Whether applying this transition can change the persisted projection.
    pub fn touches_persisted(&self) -> bool {
        !matches!(self, Transition::RegisterRef { .. })
    }

    fn name(&self) -> &'static str {
        match self {
            Transition::RegisterRef { .. } => "register_ref",
            Transition::StartRecording { .. } => "start_recording",
            Transition::RecordAction { .. } => "record_action",
            Transition::EndRecording { .. } => "end_recording",
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::RegisterRef { id, node } => f
                .debug_struct("RegisterRef")
                .field("id", id)
                .field("node", &node.key())
                .finish(),
            Transition::StartRecording { captured, timestamp } => f
                .debug_struct("StartRecording")
                .field("state_id", &captured.state_id)
                .field("timestamp", timestamp)
                .finish(),
            Transition::RecordAction {
                action,
                prev_action_was_routing,
            } => f
                .debug_struct("RecordAction")
                .field("action_type", &action.action_type)
                .field("element_id", &action.element_id)
                .field("prev_action_was_routing", prev_action_was_routing)
                .finish(),
            Transition::EndRecording {
                captured,
                timestamp,
                prev_action_was_routing,
            } => f
                .debug_struct("EndRecording")
                .field("state_id", &captured.state_id)
                .field("timestamp", timestamp)
                .field("prev_action_was_routing", prev_action_was_routing)
                .finish(),
        }
    }
}

/// The global store.
#[derive(Clone, Default)]
pub struct StoreState {
    pub actions: im::Vector<Action>,
    pub refs: im::HashMap<PathId, NodeRef>,
    pub gui_states: StateTable,
    pub walkthrough_active: bool,
    pub previous_walkthroughs: im::Vector<Walkthrough>,
}

impl fmt::Debug for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreState")
            .field("actions", &self.actions.len())
            .field("refs", &self.refs.len())
            .field("gui_states", &self.gui_states.len())
            .field("walkthrough_active", &self.walkthrough_active)
            .field("previous_walkthroughs", &self.previous_walkthroughs.len())
            .finish()
    }
}

impl StoreState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live node registered under `id`.
    pub fn node(&self, id: &PathId) -> Option<&NodeRef> {
        self.refs.get(id)
    }

    pub fn last_action(&self) -> Option<&Action> {
        self.actions.last()
    }

    /// True when the most recent action was a navigation.
    pub fn last_action_is_routing(&self) -> bool {
        self.last_action().is_some_and(Action::is_route)
    }

    /// Apply one transition, returning the successor state.
    #[must_use]
    pub fn apply(&self, transition: Transition) -> StoreState {
        let name = transition.name();
        let mut next = self.clone();
        match transition {
            Transition::RegisterRef { id, node } => {
                next.refs.insert(id, node);
            }
            Transition::StartRecording {
                captured,
                timestamp,
            } => {
                if next.walkthrough_active {
                    debug!("start ignored: already recording");
                    return next;
                }
                let captured = next.gui_states.intern_state(captured);
                next.actions
                    .push_back(Action::marker(ActionType::StartRecording, captured, timestamp));
                next.walkthrough_active = true;
            }
            Transition::RecordAction {
                mut action,
                prev_action_was_routing,
            } => {
                if !next.walkthrough_active {
                    debug!(element = %action.element_id, "action ignored: not recording");
                    return next;
                }
                action.prev_state = next.gui_states.intern_state(action.prev_state);
                action.next_state = next.gui_states.intern_state(action.next_state);
                next.correct_route(prev_action_was_routing, &action.prev_state);
                next.actions.push_back(action);
            }
            Transition::EndRecording {
                captured,
                timestamp,
                prev_action_was_routing,
            } => {
                if !next.walkthrough_active {
                    debug!("end ignored: not recording");
                    return next;
                }
                let captured = next.gui_states.intern_state(captured);
                next.correct_route(prev_action_was_routing, &captured);
                next.actions
                    .push_back(Action::marker(ActionType::EndRecording, captured, timestamp));
                next.walkthrough_active = false;

                let actions: Vec<Action> = std::mem::take(&mut next.actions).into_iter().collect();
                next.previous_walkthroughs
                    .push_back(Walkthrough::archive(actions, timestamp));
            }
        }
        debug!(
            transition = name,
            actions = next.actions.len(),
            states = next.gui_states.len(),
            active = next.walkthrough_active,
            "applied transition"
        );
        next
    }

    /// A ROUTE action's "after" state is taken before navigation settles;
    /// replace it with the "before" state of the action that follows.
    fn correct_route(&mut self, prev_action_was_routing: bool, following_prev: &GuiState) {
        if !prev_action_was_routing {
            return;
        }
        let Some(last) = self.actions.back().filter(|a| a.is_route()).cloned() else {
            return;
        };
        let index = self.actions.len() - 1;
        self.actions.set(
            index,
            Action {
                next_state: following_prev.clone(),
                ..last
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkrec_widgets::Widget;

    fn state(route: &str, width: f64) -> GuiState {
        GuiState {
            widgets: Some(Widget {
                id: PathId::from("/root"),
                route: route.to_string(),
                bounding_width: width,
                bounding_height: 10.0,
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

    fn record(t: ActionType, prev: GuiState, next: GuiState, propagated: bool) -> Transition {
        Transition::RecordAction {
            action: Action {
                action_type: t,
                element_id: PathId::from("/root/button"),
                was_propagated: propagated,
                prev_state: prev,
                next_state: next,
                timestamp: 0,
            },
            prev_action_was_routing: false,
        }
    }

    fn started() -> StoreState {
        StoreState::new().apply(Transition::StartRecording {
            captured: state("/", 1.0),
            timestamp: 1,
        })
    }

    #[test]
    fn start_pushes_marker_and_interns() {
        let s = started();
        assert!(s.walkthrough_active);
        assert_eq!(s.actions.len(), 1);
        let start = &s.actions[0];
        assert_eq!(start.action_type, ActionType::StartRecording);
        assert_eq!(start.prev_state.state_id, 1);
        assert_eq!(start.prev_state, start.next_state);
        assert_eq!(s.gui_states.len(), 1);
    }

    #[test]
    fn actions_are_ignored_while_idle() {
        let s = StoreState::new().apply(record(
            ActionType::Click,
            state("/", 1.0),
            state("/", 1.0),
            false,
        ));
        assert!(s.actions.is_empty());
        assert!(s.gui_states.is_empty());
    }

    #[test]
    fn second_start_is_ignored() {
        let s = started().apply(Transition::StartRecording {
            captured: state("/", 9.0),
            timestamp: 2,
        });
        assert_eq!(s.actions.len(), 1);
    }

    #[test]
    fn record_interns_both_states() {
        let s = started().apply(record(
            ActionType::Click,
            state("/", 1.0),
            state("/", 2.0),
            false,
        ));
        let a = &s.actions[1];
        assert_eq!(a.prev_state.state_id, 1);
        assert_eq!(a.next_state.state_id, 2);
    }

    #[test]
    fn route_correction_rewrites_previous_next_state() {
        let s = started()
            .apply(record(ActionType::Route, state("/", 1.0), state("/", 1.0), false))
            .apply(Transition::RecordAction {
                action: Action {
                    action_type: ActionType::Click,
                    element_id: PathId::from("/root/div"),
                    was_propagated: false,
                    prev_state: state("/page", 5.0),
                    next_state: state("/page", 6.0),
                    timestamp: 3,
                },
                prev_action_was_routing: true,
            });
        let route = &s.actions[1];
        let click = &s.actions[2];
        assert_eq!(route.next_state, click.prev_state);
        assert_eq!(route.next_state.current_route, "/page");
    }

    #[test]
    fn routing_flag_without_route_is_harmless() {
        let s = started()
            .apply(record(ActionType::Click, state("/", 1.0), state("/", 2.0), false))
            .apply(Transition::RecordAction {
                action: Action {
                    action_type: ActionType::Click,
                    element_id: PathId::from("/x"),
                    was_propagated: false,
                    prev_state: state("/", 3.0),
                    next_state: state("/", 3.0),
                    timestamp: 4,
                },
                prev_action_was_routing: true,
            });
        assert_eq!(s.actions[1].next_state.state_id, 2);
    }

    #[test]
    fn end_archives_and_resets() {
        let before = started()
            .apply(record(ActionType::Click, state("/", 1.0), state("/", 1.0), false))
            .apply(record(ActionType::Click, state("/", 1.0), state("/", 1.0), true));
        let after = before.apply(Transition::EndRecording {
            captured: state("/", 1.0),
            timestamp: 9,
            prev_action_was_routing: false,
        });
        assert!(!after.walkthrough_active);
        assert!(after.actions.is_empty());
        assert_eq!(after.previous_walkthroughs.len(), 1);
        let w = &after.previous_walkthroughs[0];
        assert_eq!(w.with_propagated_actions.len(), 4);
        assert_eq!(w.without_propagated_actions.len(), 3);
        assert_eq!(
            w.with_propagated_actions.last().map(|a| a.action_type),
            Some(ActionType::EndRecording)
        );
        assert_eq!(before.actions.len(), 3);
    }

    #[test]
    fn end_applies_route_correction() {
        let s = started()
            .apply(record(ActionType::Route, state("/", 1.0), state("/", 1.0), false))
            .apply(Transition::EndRecording {
                captured: state("/next", 2.0),
                timestamp: 5,
                prev_action_was_routing: true,
            });
        let w = &s.previous_walkthroughs[0];
        let route = &w.with_propagated_actions[1];
        let end = &w.with_propagated_actions[2];
        assert_eq!(route.next_state, end.prev_state);
    }

    #[test]
    fn end_while_idle_is_ignored() {
        let s = StoreState::new().apply(Transition::EndRecording {
            captured: state("/", 1.0),
            timestamp: 1,
            prev_action_was_routing: false,
        });
        assert!(s.previous_walkthroughs.is_empty());
    }
}
