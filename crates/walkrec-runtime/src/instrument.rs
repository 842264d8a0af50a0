#![forbid(unsafe_code)]

//! Relay instrumentation of element trees.
//!
//! [`instrument_children`] maps a sibling list to a new one in which every
//! renderable element carries [`RelayProps`] and intercepting handlers:
//!
//! - host elements get relay props, a mount callback that registers their
//!   live node, and interceptors for click (always), submit (forms) and
//!   change (text inputs);
//! - composites are rendered until a non-composite element appears, and that
//!   element is wrapped in their place;
//! - links are left structurally intact; their children are instrumented
//!   under the link's id with `has_link` set;
//! - route controls are transparent: their children are instrumented under
//!   the control's parent and nothing is registered for the control itself;
//! - text passes through unchanged.
//!
//! Original handlers and mount callbacks always run.

use std::sync::Arc;

use tracing::{trace, warn};

use walkrec_core::{
    Element, ElementKind, EventKind, Handler, HandlerFuture, Location, MountCallback, NodeRef,
    PathAllocator, PathId, RelayProps, TypeMap, UiEvent,
};
use walkrec_widgets::GuiState;

use crate::action::{Action, ActionType};
use crate::recorder::Recorder;
use crate::store::Transition;

/// Composites nested deeper than this are left unwrapped.
const MAX_RENDER_DEPTH: usize = 64;

/// Everything a relay needs from its surroundings.
#[derive(Clone)]
pub struct InstrumentContext {
    pub recorder: Recorder,
    pub location: Arc<dyn Location>,
    /// Capture root for before/after snapshots.
    pub root_id: PathId,
    pub types: Arc<TypeMap>,
}

impl InstrumentContext {
    fn capture(&self) -> GuiState {
        let route = self.location.pathname();
        self.recorder.capture_state(&self.root_id, &route)
    }
}

/// Instrument one sibling list under `parent_id`.
pub fn instrument_children(
    children: &[Element],
    parent_id: &PathId,
    has_link: bool,
    ctx: &InstrumentContext,
) -> Vec<Element> {
    let mut alloc = PathAllocator::for_siblings(children, &ctx.types);
    children
        .iter()
        .map(|child| {
            let id = alloc.next_id(child, parent_id, &ctx.types);
            wrap(child, &id, parent_id, has_link, ctx, 0)
        })
        .collect()
}

fn wrap(
    element: &Element,
    id: &PathId,
    parent_id: &PathId,
    has_link: bool,
    ctx: &InstrumentContext,
    depth: usize,
) -> Element {
    match element.kind() {
        ElementKind::Text(_) => element.clone(),
        // Links take an `a` slot among their siblings like any host
        // element, so two sibling links give `a[1]` and `a[2]` rather than
        // a shared `a`. The anchor itself carries no relay.
        ElementKind::Link { .. } => {
            let children = instrument_children(element.child_elements(), id, true, ctx);
            element.clone_with_props(children, |_| {})
        }
        ElementKind::Route { .. } | ElementKind::Switch | ElementKind::Redirect { .. } => {
            let children = instrument_children(element.child_elements(), parent_id, has_link, ctx);
            element.clone_with_props(children, |_| {})
        }
        ElementKind::Composite { name, .. } => {
            if depth >= MAX_RENDER_DEPTH {
                warn!(name = %name, "composite nesting too deep; left unwrapped");
                return element.clone();
            }
            match element.render_once() {
                Some(rendered) => wrap(&rendered, id, parent_id, has_link, ctx, depth + 1),
                None => element.clone(),
            }
        }
        ElementKind::Host(_) => relay(element, id, parent_id, has_link, ctx),
    }
}

fn relay(
    element: &Element,
    id: &PathId,
    parent_id: &PathId,
    has_link: bool,
    ctx: &InstrumentContext,
) -> Element {
    trace!(id = %id, has_link, "relay");
    let children = instrument_children(element.child_elements(), id, has_link, ctx);
    let site = Arc::new(InterceptSite {
        ctx: ctx.clone(),
        element_id: id.clone(),
        has_link,
    });
    let is_form = element.is_form();
    let is_text_input = element.is_text_input();

    element.clone_with_props(children, |props| {
        props.relay = Some(RelayProps {
            xpath_component_id: id.clone(),
            has_link,
            parent_id: parent_id.clone(),
        });
        props.on_mount = Some(register_on_mount(
            ctx.recorder.clone(),
            id.clone(),
            props.on_mount.take(),
        ));
        props.on_click = Some(intercept(EventKind::Click, props.on_click.take(), &site));
        if is_form {
            props.on_submit = Some(intercept(EventKind::Submit, props.on_submit.take(), &site));
        }
        if is_text_input {
            props.on_change = Some(intercept(EventKind::Change, props.on_change.take(), &site));
        }
    })
}

fn register_on_mount(recorder: Recorder, id: PathId, original: Option<MountCallback>) -> MountCallback {
    Arc::new(move |node: NodeRef| {
        if let Some(original) = &original {
            original(Arc::clone(&node));
        }
        recorder.register_ref(id.clone(), node);
    })
}

struct InterceptSite {
    ctx: InstrumentContext,
    element_id: PathId,
    has_link: bool,
}

impl InterceptSite {
    fn record(&self, kind: EventKind, was_propagated: bool, prev: GuiState, next: GuiState) {
        let recorder = &self.ctx.recorder;
        let prev_action_was_routing = recorder.snapshot().last_action_is_routing();
        recorder.dispatch(Transition::RecordAction {
            action: Action {
                action_type: ActionType::for_event(kind, self.has_link),
                element_id: self.element_id.clone(),
                was_propagated,
                prev_state: prev,
                next_state: next,
                timestamp: recorder.now(),
            },
            prev_action_was_routing,
        });
    }
}

/// Wrap `original` so the interaction is recorded around it.
///
/// The "before" capture happens synchronously, ahead of the original
/// handler; the "after" capture waits for the handler's future.
fn intercept(kind: EventKind, original: Option<Handler>, site: &Arc<InterceptSite>) -> Handler {
    let site = Arc::clone(site);
    Arc::new(move |event: &UiEvent| -> HandlerFuture {
        if kind == EventKind::Submit {
            event.prevent_default();
        }
        if site.has_link {
            event.stop_propagation();
        }
        let was_propagated = event.is_propagated();
        let prev = site.ctx.recorder.is_recording().then(|| site.ctx.capture());
        let pending = original.as_ref().map(|handler| handler(event));
        let site = Arc::clone(&site);

        Box::pin(async move {
            if let Some(pending) = pending {
                pending.await;
            }
            let Some(prev) = prev else {
                return;
            };
            let next = site.ctx.capture();
            site.record(kind, was_propagated, prev, next);
        })
    })
}
