#![forbid(unsafe_code)]

//! Start, end, and print a recording.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use walkrec_core::{Location, PathId};
use walkrec_widgets::GuiState;

use crate::action::{Action, Walkthrough};
use crate::recorder::Recorder;
use crate::store::Transition;

/// Everything the store holds except live node handles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDump {
    pub actions: Vec<Action>,
    pub gui_states: Vec<GuiState>,
    pub previous_walkthroughs: Vec<Walkthrough>,
    pub walkthrough_active: bool,
    /// Number of registered node handles.
    pub refs: usize,
}

/// Control surface for one instrumented tree.
#[derive(Clone)]
pub struct RecordingControls {
    recorder: Recorder,
    location: Arc<dyn Location>,
    root_id: PathId,
}

impl RecordingControls {
    #[must_use]
    pub fn new(recorder: Recorder, location: Arc<dyn Location>, root_id: PathId) -> Self {
        Self {
            recorder,
            location,
            root_id,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Begin a recording. Returns false if one is already running.
    pub fn start(&self) -> bool {
        if self.recorder.is_recording() {
            return false;
        }
        let captured = self.capture();
        info!(
            route = %captured.current_route,
            state_id = captured.state_id,
            "walkthrough started"
        );
        self.recorder.dispatch(Transition::StartRecording {
            captured,
            timestamp: self.recorder.now(),
        });
        self.recorder.is_recording()
    }

    /// End the recording and return the archived walkthrough.
    pub fn end(&self) -> Option<Walkthrough> {
        if !self.recorder.is_recording() {
            return None;
        }
        let captured = self.capture();
        let prev_action_was_routing = self.recorder.snapshot().last_action_is_routing();
        self.recorder.dispatch(Transition::EndRecording {
            captured,
            timestamp: self.recorder.now(),
            prev_action_was_routing,
        });
        let walkthrough = self.recorder.snapshot().previous_walkthroughs.last().cloned();
        if let Some(w) = &walkthrough {
            info!(
                actions = w.with_propagated_actions.len(),
                direct = w.without_propagated_actions.len(),
                "walkthrough ended"
            );
        }
        walkthrough
    }

    /// Snapshot the store and log it as JSON.
    pub fn print(&self) -> SessionDump {
        let state = self.recorder.snapshot();
        let dump = SessionDump {
            actions: state.actions.iter().cloned().collect(),
            gui_states: state.gui_states.to_vec(),
            previous_walkthroughs: state.previous_walkthroughs.iter().cloned().collect(),
            walkthrough_active: state.walkthrough_active,
            refs: state.refs.len(),
        };
        match serde_json::to_string(&dump) {
            Ok(json) => info!(dump = %json, "session dump"),
            Err(e) => warn!(error = %e, "failed to serialize session dump"),
        }
        dump
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    fn capture(&self) -> GuiState {
        self.recorder
            .capture_state(&self.root_id, &self.location.pathname())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;
    use walkrec_core::SharedLocation;

    fn controls() -> RecordingControls {
        RecordingControls::new(
            Recorder::in_memory(),
            Arc::new(SharedLocation::new("/home")),
            PathId::from("/html/body/div"),
        )
    }

    #[test]
    fn start_end_cycle() {
        let c = controls();
        assert!(c.end().is_none());
        assert!(c.start());
        assert!(!c.start());
        assert!(c.is_recording());

        let w = c.end().expect("walkthrough");
        assert!(!c.is_recording());
        let types: Vec<_> = w.with_propagated_actions.iter().map(|a| a.action_type).collect();
        assert_eq!(types, [ActionType::StartRecording, ActionType::EndRecording]);
        assert_eq!(w.with_propagated_actions[0].prev_state.current_route, "/home");
    }

    #[test]
    fn print_reflects_store() {
        let c = controls();
        c.start();
        let dump = c.print();
        assert!(dump.walkthrough_active);
        assert_eq!(dump.actions.len(), 1);
        assert!(dump.previous_walkthroughs.is_empty());

        c.end();
        let dump = c.print();
        assert!(dump.actions.is_empty());
        assert_eq!(dump.previous_walkthroughs.len(), 1);
        let json = serde_json::to_value(&dump).expect("json");
        assert!(json["previousWalkthroughs"][0]["withPropagatedActions"].is_array());
    }

    #[test]
    fn timestamps_are_deterministic_in_memory() {
        let c = controls();
        c.start();
        let w = c.end().expect("walkthrough");
        assert_eq!(w.with_propagated_actions[0].timestamp, 1000);
        assert_eq!(w.with_propagated_actions[1].timestamp, 2000);
        assert_eq!(w.timestamp, 2000);
    }
}
