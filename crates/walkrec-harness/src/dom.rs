#![forbid(unsafe_code)]

//! In-memory host that mounts [`Element`] trees.
//!
//! `MockDom` plays the rendering engine and the router for tests and the
//! demo. Every render rebuilds the node tree from the app closure, unmounts
//! the previous tree, and fires mount callbacks children-first. Layout is
//! deterministic so identical trees produce identical snapshots:
//!
//! | property | value |
//! |----------|-------|
//! | `x` | `depth * 10` |
//! | `y` | `preorder index * 20` |
//! | `width` | inline `width` in px, else 100 |
//! | `height` | inline `height` in px, else 20 |
//!
//! Events bubble from the target to the document root and stop when a
//! handler stops propagation. A click whose path crosses a link navigates
//! after bubbling unless a handler prevented the default.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use futures::executor::block_on;
use tracing::{debug, trace, warn};

use walkrec_core::{
    Bounds, Element, ElementKind, EventKind, GeometryError, Handler, Location, MountedNode,
    NodeKey, NodeRef, Props, SharedLocation, StyleMap, UiEvent,
};

/// Tag of the synthetic document root every render mounts under.
pub const DOCUMENT_TAG: &str = "body";

const LAYOUT_INDENT: f64 = 10.0;
const LAYOUT_ROW: f64 = 20.0;
const DEFAULT_WIDTH: f64 = 100.0;
const DEFAULT_HEIGHT: f64 = 20.0;
const MAX_COMPOSITE_DEPTH: usize = 64;
const MAX_REDIRECTS: usize = 8;

/// A mounted node.
pub struct MockNode {
    key: NodeKey,
    tag: Option<String>,
    text: Option<String>,
    link_to: Option<String>,
    props: Props,
    parent: Weak<MockNode>,
    children: Vec<Arc<MockNode>>,
    mounted: AtomicBool,
    bounds: Bounds,
}

impl MockNode {
    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Target of the link this node renders, if any.
    pub fn link_to(&self) -> Option<&str> {
        self.link_to.as_deref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn child_nodes(&self) -> &[Arc<MockNode>] {
        &self.children
    }

    pub fn parent(&self) -> Option<Arc<MockNode>> {
        self.parent.upgrade()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.props.attrs.get(name).map(String::as_str)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    fn handler(&self, kind: EventKind) -> Option<Handler> {
        match kind {
            EventKind::Click => self.props.on_click.clone(),
            EventKind::Submit => self.props.on_submit.clone(),
            EventKind::Change => self.props.on_change.clone(),
        }
    }

    fn unmount(&self) {
        self.mounted.store(false, Ordering::Relaxed);
        for child in &self.children {
            child.unmount();
        }
    }

    fn fire_mount(self: &Arc<Self>) {
        for child in &self.children {
            child.fire_mount();
        }
        if let Some(callback) = &self.props.on_mount {
            callback(Arc::clone(self) as NodeRef);
        }
    }

    fn walk<'a>(self: &'a Arc<Self>, out: &mut Vec<&'a Arc<MockNode>>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}

impl MountedNode for MockNode {
    fn key(&self) -> NodeKey {
        self.key
    }

    fn tag(&self) -> Option<String> {
        self.tag.clone()
    }

    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Relaxed)
    }

    fn children(&self) -> Vec<NodeRef> {
        self.children
            .iter()
            .map(|c| Arc::clone(c) as NodeRef)
            .collect()
    }

    fn bounding_rect(&self) -> Result<Bounds, GeometryError> {
        if !self.is_mounted() {
            return Err(GeometryError::Detached);
        }
        if self.tag.is_none() {
            return Err(GeometryError::Unavailable("text node".into()));
        }
        Ok(self.bounds)
    }

    fn computed_style(&self) -> StyleMap {
        let display = match self.tag.as_deref() {
            Some("span" | "a" | "button" | "input" | "label" | "b" | "i") => "inline",
            Some(_) => "block",
            None => return StyleMap::new(),
        };
        StyleMap::from([("display".to_string(), display.to_string())])
    }

    fn inline_style(&self) -> StyleMap {
        self.props.style.clone()
    }
}

impl std::fmt::Debug for MockNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockNode")
            .field("key", &self.key)
            .field("tag", &self.tag)
            .field("text", &self.text)
            .field("children", &self.children.len())
            .finish()
    }
}

/// What happened while delivering an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Handlers invoked.
    pub delivered: usize,
    pub propagation_stopped: bool,
    pub default_prevented: bool,
    /// Location navigated to by the default action.
    pub navigated: Option<String>,
}

type AppFn = Arc<dyn Fn() -> Element + Send + Sync>;

struct DomInner {
    location: SharedLocation,
    app: RwLock<Option<AppFn>>,
    root: RwLock<Option<Arc<MockNode>>>,
    next_key: AtomicU64,
    renders: AtomicU64,
}

/// The in-memory host.
#[derive(Clone)]
pub struct MockDom {
    inner: Arc<DomInner>,
}

impl MockDom {
    #[must_use]
    pub fn new(location: SharedLocation) -> Self {
        Self {
            inner: Arc::new(DomInner {
                location,
                app: RwLock::new(None),
                root: RwLock::new(None),
                next_key: AtomicU64::new(1),
                renders: AtomicU64::new(0),
            }),
        }
    }

    /// Handle app state can use to request a re-render.
    pub fn handle(&self) -> RenderHandle {
        RenderHandle(Arc::downgrade(&self.inner))
    }

    pub fn location(&self) -> &SharedLocation {
        &self.inner.location
    }

    /// Install the app and render it.
    pub fn mount<F>(&self, app: F)
    where
        F: Fn() -> Element + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.inner.app.write() {
            *slot = Some(Arc::new(app));
        }
        self.render();
    }

    pub fn render(&self) {
        self.inner.render(0);
    }

    pub fn render_count(&self) -> u64 {
        self.inner.renders.load(Ordering::Relaxed)
    }

    /// The synthetic document root.
    pub fn root(&self) -> Option<Arc<MockNode>> {
        self.inner.root()
    }

    /// All mounted nodes in document order.
    pub fn nodes(&self) -> Vec<Arc<MockNode>> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        root.walk(&mut out);
        out.into_iter().cloned().collect()
    }

    pub fn find(&self, key: NodeKey) -> Option<Arc<MockNode>> {
        self.nodes().into_iter().find(|n| n.key == key)
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<Arc<MockNode>> {
        self.nodes()
            .into_iter()
            .filter(|n| n.tag.as_deref() == Some(tag))
            .collect()
    }

    /// Deepest element whose text content equals `text`.
    pub fn find_by_text(&self, text: &str) -> Option<Arc<MockNode>> {
        self.nodes()
            .into_iter()
            .rev()
            .find(|n| n.tag.is_some() && n.text_content() == text)
    }

    pub fn click(&self, key: NodeKey) -> EventOutcome {
        self.dispatch(UiEvent::new(EventKind::Click, key))
    }

    pub fn submit(&self, key: NodeKey) -> EventOutcome {
        self.dispatch(UiEvent::new(EventKind::Submit, key))
    }

    pub fn input(&self, key: NodeKey, value: &str) -> EventOutcome {
        self.dispatch(UiEvent::new(EventKind::Change, key).with_value(value))
    }

    /// Set the location and re-render.
    pub fn navigate(&self, to: &str) {
        debug!(to, "navigate");
        self.inner.location.set(to);
        self.render();
    }

    fn dispatch(&self, event: UiEvent) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        let Some(target) = self.find(event.target()) else {
            warn!(node = %event.target(), "event target is not mounted");
            return outcome;
        };

        let mut path = vec![Arc::clone(&target)];
        while let Some(parent) = path.last().and_then(|n| n.parent()) {
            path.push(parent);
        }

        for node in &path {
            if let Some(handler) = node.handler(event.kind()) {
                block_on(handler(&event.at(node.key)));
                outcome.delivered += 1;
            }
            if event.is_propagation_stopped() {
                outcome.propagation_stopped = true;
                break;
            }
        }
        outcome.default_prevented = event.is_default_prevented();
        trace!(kind = ?event.kind(), delivered = outcome.delivered, "event delivered");

        if event.kind() == EventKind::Click
            && !outcome.default_prevented
            && let Some(to) = path.iter().find_map(|n| n.link_to.clone())
        {
            self.navigate(&to);
            outcome.navigated = Some(to);
        }
        outcome
    }
}

impl DomInner {
    fn root(&self) -> Option<Arc<MockNode>> {
        self.root.read().ok().and_then(|r| r.clone())
    }

    fn render(&self, redirects: usize) {
        let app = self.app.read().ok().and_then(|a| a.clone());
        let Some(app) = app else {
            return;
        };
        let element = app();
        let location = self.location.pathname();

        let mut builder = TreeBuilder {
            next_key: &self.next_key,
            index: 0,
            location,
            redirect: None,
        };
        let document = builder.document(&element);
        let redirect = builder.redirect.take();

        let previous = match self.root.write() {
            Ok(mut slot) => slot.replace(Arc::clone(&document)),
            Err(_) => {
                warn!("document lock poisoned; render skipped");
                return;
            }
        };
        if let Some(previous) = previous {
            previous.unmount();
        }
        self.renders.fetch_add(1, Ordering::Relaxed);
        document.fire_mount();

        if let Some(to) = redirect
            && to != self.location.pathname()
        {
            if redirects >= MAX_REDIRECTS {
                warn!(to = %to, "redirect loop; giving up");
                return;
            }
            self.location.set(to);
            self.render(redirects + 1);
        }
    }
}

struct TreeBuilder<'a> {
    next_key: &'a AtomicU64,
    index: usize,
    location: String,
    redirect: Option<String>,
}

impl TreeBuilder<'_> {
    fn document(&mut self, app: &Element) -> Arc<MockNode> {
        let key = self.key();
        let bounds = self.layout(0, &StyleMap::new());
        Arc::new_cyclic(|me| {
            let children = self.expand(app, me, 1, 0);
            MockNode {
                key,
                tag: Some(DOCUMENT_TAG.to_string()),
                text: None,
                link_to: None,
                props: Props::default(),
                parent: Weak::new(),
                children,
                mounted: AtomicBool::new(true),
                bounds,
            }
        })
    }

    fn key(&self) -> NodeKey {
        NodeKey(self.next_key.fetch_add(1, Ordering::Relaxed))
    }

    fn layout(&mut self, depth: usize, style: &StyleMap) -> Bounds {
        let index = self.index;
        self.index += 1;
        Bounds::new(
            depth as f64 * LAYOUT_INDENT,
            index as f64 * LAYOUT_ROW,
            px(style, "width").unwrap_or(DEFAULT_WIDTH),
            px(style, "height").unwrap_or(DEFAULT_HEIGHT),
        )
    }

    fn expand(
        &mut self,
        element: &Element,
        parent: &Weak<MockNode>,
        depth: usize,
        nesting: usize,
    ) -> Vec<Arc<MockNode>> {
        match element.kind() {
            ElementKind::Host(tag) => vec![self.element(element, tag, None, parent, depth)],
            ElementKind::Link { to } => {
                vec![self.element(element, "a", Some(to.clone()), parent, depth)]
            }
            ElementKind::Text(text) => vec![self.text(text, parent)],
            ElementKind::Composite { name, .. } => {
                if nesting >= MAX_COMPOSITE_DEPTH {
                    warn!(name = %name, "composite nesting too deep; rendering nothing");
                    return Vec::new();
                }
                match element.render_once() {
                    Some(rendered) => self.expand(&rendered, parent, depth, nesting + 1),
                    None => Vec::new(),
                }
            }
            ElementKind::Route { path } => {
                if self.matches(path) {
                    self.expand_all(element.child_elements(), parent, depth)
                } else {
                    Vec::new()
                }
            }
            ElementKind::Switch => {
                for child in element.child_elements() {
                    match child.kind() {
                        ElementKind::Route { path } if !self.matches(path) => continue,
                        _ => return self.expand(child, parent, depth, nesting),
                    }
                }
                Vec::new()
            }
            ElementKind::Redirect { to } => {
                self.redirect = Some(to.clone());
                Vec::new()
            }
        }
    }

    fn expand_all(
        &mut self,
        elements: &[Element],
        parent: &Weak<MockNode>,
        depth: usize,
    ) -> Vec<Arc<MockNode>> {
        elements
            .iter()
            .flat_map(|e| self.expand(e, parent, depth, 0))
            .collect()
    }

    fn element(
        &mut self,
        element: &Element,
        tag: &str,
        link_to: Option<String>,
        parent: &Weak<MockNode>,
        depth: usize,
    ) -> Arc<MockNode> {
        let key = self.key();
        let bounds = self.layout(depth, &element.props().style);
        Arc::new_cyclic(|me| {
            let children = self.expand_all(element.child_elements(), me, depth + 1);
            MockNode {
                key,
                tag: Some(tag.to_string()),
                text: None,
                link_to,
                props: element.props().clone(),
                parent: parent.clone(),
                children,
                mounted: AtomicBool::new(true),
                bounds,
            }
        })
    }

    fn text(&mut self, text: &str, parent: &Weak<MockNode>) -> Arc<MockNode> {
        Arc::new(MockNode {
            key: self.key(),
            tag: None,
            text: Some(text.to_string()),
            link_to: None,
            props: Props::default(),
            parent: parent.clone(),
            children: Vec::new(),
            mounted: AtomicBool::new(true),
            bounds: Bounds::UNKNOWN,
        })
    }

    fn matches(&self, path: &str) -> bool {
        path == "*" || path == self.location
    }
}

fn px(style: &StyleMap, property: &str) -> Option<f64> {
    let raw = style.get(property)?;
    raw.trim().trim_end_matches("px").trim().parse().ok()
}

/// Lets app code trigger a re-render, like a state setter would.
#[derive(Clone)]
pub struct RenderHandle(Weak<DomInner>);

impl RenderHandle {
    /// Re-render now. Returns false if the host is gone.
    pub fn rerender(&self) -> bool {
        match self.0.upgrade() {
            Some(inner) => {
                inner.render(0);
                true
            }
            None => false,
        }
    }

    /// A state cell whose updates re-render the host.
    pub fn state<T>(&self, initial: T) -> StateCell<T> {
        StateCell {
            value: Arc::new(Mutex::new(initial)),
            handle: self.clone(),
        }
    }
}

/// Shared app state bound to a host.
pub struct StateCell<T> {
    value: Arc<Mutex<T>>,
    handle: RenderHandle,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            handle: self.handle.clone(),
        }
    }
}

impl<T: Clone> StateCell<T> {
    pub fn get(&self) -> T {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the value and re-render.
    pub fn set(&self, value: T) {
        self.update(|v| *v = value);
    }

    /// Edit the value in place and re-render.
    pub fn update(&self, edit: impl FnOnce(&mut T)) {
        {
            let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
            edit(&mut guard);
        }
        self.handle.rerender();
    }
}
