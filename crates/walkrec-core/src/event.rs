#![forbid(unsafe_code)]

//! Interaction events delivered by the host to element handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::mount::NodeKey;

/// Kind of user interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Pointer activation.
    Click,
    /// Form submission.
    Submit,
    /// Text input value changed.
    Change,
}

#[derive(Debug, Default)]
struct EventFlags {
    propagation_stopped: AtomicBool,
    default_prevented: AtomicBool,
}

/// An event as seen by one handler during bubbling.
///
/// `target` is the node the user acted on; `current_target` is the node whose
/// handler is running. Clones made with [`at`](Self::at) share the
/// propagation and default flags, so a handler deep in the tree can stop the
/// host from bubbling further.
#[derive(Debug, Clone)]
pub struct UiEvent {
    kind: EventKind,
    target: NodeKey,
    current_target: NodeKey,
    value: Option<String>,
    flags: Arc<EventFlags>,
}

impl UiEvent {
    /// Create an event targeted at `target`.
    #[must_use]
    pub fn new(kind: EventKind, target: NodeKey) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            value: None,
            flags: Arc::new(EventFlags::default()),
        }
    }

    /// Attach an input value (for [`EventKind::Change`]).
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The same event as delivered to `current_target`.
    #[must_use]
    pub fn at(&self, current_target: NodeKey) -> Self {
        Self {
            current_target,
            ..self.clone()
        }
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    pub fn target(&self) -> NodeKey {
        self.target
    }

    #[inline]
    pub fn current_target(&self) -> NodeKey {
        self.current_target
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// True when this delivery bubbled up from a descendant.
    #[inline]
    pub fn is_propagated(&self) -> bool {
        self.target != self.current_target
    }

    /// Stop the host from delivering this event to further ancestors.
    pub fn stop_propagation(&self) {
        self.flags.propagation_stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.flags.propagation_stopped.load(Ordering::Relaxed)
    }

    /// Ask the host to skip its default action (e.g. form navigation).
    pub fn prevent_default(&self) {
        self.flags.default_prevented.store(true, Ordering::Relaxed);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.flags.default_prevented.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagation_flag_is_shared_across_deliveries() {
        let ev = UiEvent::new(EventKind::Click, NodeKey(3));
        let bubbled = ev.at(NodeKey(1));
        assert!(!ev.is_propagated());
        assert!(bubbled.is_propagated());

        ev.stop_propagation();
        assert!(bubbled.is_propagation_stopped());
    }

    #[test]
    fn value_and_default() {
        let ev = UiEvent::new(EventKind::Change, NodeKey(7)).with_value("abc");
        assert_eq!(ev.value(), Some("abc"));
        assert!(!ev.is_default_prevented());
        ev.at(NodeKey(2)).prevent_default();
        assert!(ev.is_default_prevented());
    }
}
