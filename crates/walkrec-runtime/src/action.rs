#![forbid(unsafe_code)]

//! Recorded actions and archived walkthroughs.

use serde::{Deserialize, Serialize};

use walkrec_core::{EventKind, PathId};
use walkrec_widgets::GuiState;

/// Element id recorded on the action that starts a walkthrough.
pub const START_ELEMENT_ID: &str = "start-walkthrough-button";

/// Element id recorded on the action that ends a walkthrough.
pub const END_ELEMENT_ID: &str = "end-walkthrough-button";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Click,
    Submit,
    Input,
    /// A click inside a navigation link.
    Route,
    StartRecording,
    EndRecording,
}

impl ActionType {
    /// Action type recorded for an intercepted event.
    pub fn for_event(kind: EventKind, has_link: bool) -> Self {
        match kind {
            EventKind::Click if has_link => ActionType::Route,
            EventKind::Click => ActionType::Click,
            EventKind::Submit => ActionType::Submit,
            EventKind::Change => ActionType::Input,
        }
    }
}

/// One user action with the UI state before and after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action_type: ActionType,
    pub element_id: PathId,
    pub was_propagated: bool,
    pub prev_state: GuiState,
    pub next_state: GuiState,
    /// Milliseconds since the Unix epoch (or a deterministic sequence).
    pub timestamp: i64,
}

impl Action {
    /// A start/end marker; both states are the same capture.
    #[must_use]
    pub fn marker(action_type: ActionType, captured: GuiState, timestamp: i64) -> Self {
        let element_id = match action_type {
            ActionType::EndRecording => END_ELEMENT_ID,
            _ => START_ELEMENT_ID,
        };
        Self {
            action_type,
            element_id: PathId::from(element_id),
            was_propagated: false,
            prev_state: captured.clone(),
            next_state: captured,
            timestamp,
        }
    }

    pub fn is_route(&self) -> bool {
        self.action_type == ActionType::Route
    }
}

/// A finished recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Walkthrough {
    pub with_propagated_actions: Vec<Action>,
    /// Only actions the user performed directly on their element.
    pub without_propagated_actions: Vec<Action>,
    pub timestamp: i64,
}

impl Walkthrough {
    #[must_use]
    pub fn archive(actions: Vec<Action>, timestamp: i64) -> Self {
        let without_propagated_actions = actions
            .iter()
            .filter(|a| !a.was_propagated)
            .cloned()
            .collect();
        Self {
            with_propagated_actions: actions,
            without_propagated_actions,
            timestamp,
        }
    }
}
