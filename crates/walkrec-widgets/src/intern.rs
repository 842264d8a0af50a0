#![forbid(unsafe_code)]

//! State interning table.
//!
//! Assigns small integer ids to captured states. Two captures with
//! deep-equal widgets and the same route share an id; anything else gets the
//! next id (`len + 1`). Ids are never reused.
//!
//! The table is a persistent vector so the store can hand out snapshots of
//! it cheaply. Lookup is a linear scan, which is fine at walkthrough scale
//! (tens to hundreds of states).

use tracing::trace;

use crate::snapshot::{GuiState, UNCAPTURED_STATE_ID, Widget};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateTable {
    states: im::Vector<GuiState>,
}

impl StateTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from previously interned states, in id order.
    #[must_use]
    pub fn from_states(states: impl IntoIterator<Item = GuiState>) -> Self {
        Self {
            states: states.into_iter().collect(),
        }
    }

    /// Existing state with this content, if any.
    pub fn lookup(&self, widgets: Option<&Widget>, route: &str) -> Option<&GuiState> {
        self.states.iter().find(|s| s.same_content(widgets, route))
    }

    /// Id this content has, or would be given if interned now.
    pub fn peek_id(&self, widgets: Option<&Widget>, route: &str) -> i64 {
        if widgets.is_none() {
            return UNCAPTURED_STATE_ID;
        }
        match self.lookup(widgets, route) {
            Some(existing) => existing.state_id,
            None => self.next_id(),
        }
    }

    /// Intern `(widgets, route)` and return its id.
    pub fn intern(&mut self, widgets: Option<Widget>, route: &str) -> i64 {
        self.intern_state(GuiState {
            widgets,
            state_id: UNCAPTURED_STATE_ID,
            current_route: route.to_string(),
        })
        .state_id
    }

    /// Intern a captured state, returning the canonical entry.
    ///
    /// The incoming `state_id` is ignored; uncaptured states are returned
    /// unchanged and never stored.
    pub fn intern_state(&mut self, state: GuiState) -> GuiState {
        if state.widgets.is_none() {
            return GuiState {
                state_id: UNCAPTURED_STATE_ID,
                ..state
            };
        }
        if let Some(existing) = self.lookup(state.widgets.as_ref(), &state.current_route) {
            return existing.clone();
        }
        let canonical = GuiState {
            state_id: self.next_id(),
            ..state
        };
        trace!(state_id = canonical.state_id, route = %canonical.current_route, "interned new state");
        self.states.push_back(canonical.clone());
        canonical
    }

    fn next_id(&self) -> i64 {
        self.states.len() as i64 + 1
    }

    pub fn get(&self, state_id: i64) -> Option<&GuiState> {
        usize::try_from(state_id - 1)
            .ok()
            .and_then(|i| self.states.get(i))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GuiState> {
        self.states.iter()
    }

    pub fn to_vec(&self) -> Vec<GuiState> {
        self.states.iter().cloned().collect()
    }
}
