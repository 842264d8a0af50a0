#![forbid(unsafe_code)]

//! Host-neutral element model.
//!
//! An [`Element`] is a description of what the host should render: a
//! concrete tag, a text leaf, a composite that renders other elements, or one
//! of the routing controls. The instrumentation layer consumes and produces
//! `Element` trees; hosts adapt their own component graph into it.
//!
//! Traversal code (path ids, the type map) is written against the
//! [`ViewNode`] capability trait rather than `Element` directly, so any tree
//! that can classify its nodes, list children, and instantiate composites can
//! be addressed.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::event::UiEvent;
use crate::mount::{NodeRef, StyleMap};
use crate::path::PathId;

/// Future returned by an event handler. The recorder awaits it before taking
/// the "after" snapshot.
pub type HandlerFuture = BoxFuture<'static, ()>;

/// Event handler attached to an element.
pub type Handler = Arc<dyn Fn(&UiEvent) -> HandlerFuture + Send + Sync>;

/// Called by the host once the element's node is mounted.
pub type MountCallback = Arc<dyn Fn(NodeRef) + Send + Sync>;

/// Render function of a composite element: props and children in, at most
/// one element out.
pub type RenderFn = Arc<dyn Fn(&Props, &[Element]) -> Option<Element> + Send + Sync>;

/// Wrap a synchronous closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&UiEvent) + Send + Sync + 'static,
{
    Arc::new(move |event: &UiEvent| -> HandlerFuture {
        f(event);
        Box::pin(futures::future::ready(()))
    })
}

/// Wrap an asynchronous closure as a [`Handler`].
pub fn async_handler<F, Fut>(f: F) -> Handler
where
    F: Fn(&UiEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |event: &UiEvent| -> HandlerFuture { Box::pin(f(event)) })
}

/// Data the relay layer attaches to a wrapped element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayProps {
    /// PathId of the wrapped element.
    pub xpath_component_id: PathId,
    /// True when the element sits inside a navigation link.
    pub has_link: bool,
    /// PathId of the element's parent.
    pub parent_id: PathId,
}

/// Element properties.
#[derive(Clone, Default)]
pub struct Props {
    /// Plain attributes (`placeholder`, `type`, ...).
    pub attrs: BTreeMap<String, String>,
    /// Inline style.
    pub style: StyleMap,
    pub on_click: Option<Handler>,
    pub on_submit: Option<Handler>,
    pub on_change: Option<Handler>,
    pub on_mount: Option<MountCallback>,
    /// Present once the element has been wrapped by the relay layer.
    pub relay: Option<RelayProps>,
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("attrs", &self.attrs)
            .field("style", &self.style)
            .field("on_click", &self.on_click.is_some())
            .field("on_submit", &self.on_submit.is_some())
            .field("on_change", &self.on_change.is_some())
            .field("on_mount", &self.on_mount.is_some())
            .field("relay", &self.relay)
            .finish()
    }
}

/// What kind of node an element describes.
#[derive(Clone)]
pub enum ElementKind {
    /// Concrete visual node with a tag.
    Host(String),
    /// Text leaf.
    Text(String),
    /// Element whose output is produced by a render function.
    Composite { name: String, render: RenderFn },
    /// Navigation link; the host renders it as an anchor.
    Link { to: String },
    /// Renders its children when the location matches `path`.
    Route { path: String },
    /// Renders the first matching route among its children.
    Switch,
    /// Navigates to `to`; renders nothing.
    Redirect { to: String },
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Host(tag) => f.debug_tuple("Host").field(tag).finish(),
            ElementKind::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ElementKind::Composite { name, .. } => {
                f.debug_struct("Composite").field("name", name).finish()
            }
            ElementKind::Link { to } => f.debug_struct("Link").field("to", to).finish(),
            ElementKind::Route { path } => f.debug_struct("Route").field("path", path).finish(),
            ElementKind::Switch => write!(f, "Switch"),
            ElementKind::Redirect { to } => f.debug_struct("Redirect").field("to", to).finish(),
        }
    }
}

/// A node in the host's view description.
#[derive(Debug, Clone)]
pub struct Element {
    kind: ElementKind,
    props: Props,
    children: Vec<Element>,
}

impl Element {
    fn from_kind(kind: ElementKind) -> Self {
        Self {
            kind,
            props: Props::default(),
            children: Vec::new(),
        }
    }

    /// Concrete element with the given tag.
    #[must_use]
    pub fn host(tag: impl Into<String>) -> Self {
        Self::from_kind(ElementKind::Host(tag.into()))
    }

    /// Text leaf.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_kind(ElementKind::Text(text.into()))
    }

    /// Composite element named `name`, rendered by `render`.
    #[must_use]
    pub fn composite<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Props, &[Element]) -> Option<Element> + Send + Sync + 'static,
    {
        Self::from_kind(ElementKind::Composite {
            name: name.into(),
            render: Arc::new(render),
        })
    }

    /// Navigation link to `to`.
    #[must_use]
    pub fn link(to: impl Into<String>) -> Self {
        Self::from_kind(ElementKind::Link { to: to.into() })
    }

    /// Route rendering its children at `path`.
    #[must_use]
    pub fn route(path: impl Into<String>) -> Self {
        Self::from_kind(ElementKind::Route { path: path.into() })
    }

    #[must_use]
    pub fn switch() -> Self {
        Self::from_kind(ElementKind::Switch)
    }

    #[must_use]
    pub fn redirect(to: impl Into<String>) -> Self {
        Self::from_kind(ElementKind::Redirect { to: to.into() })
    }

    #[must_use]
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.attrs.insert(key.into(), value.into());
        self
    }

    /// Set an inline style property.
    #[must_use]
    pub fn style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.style.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn on_click(mut self, handler: Handler) -> Self {
        self.props.on_click = Some(handler);
        self
    }

    #[must_use]
    pub fn on_submit(mut self, handler: Handler) -> Self {
        self.props.on_submit = Some(handler);
        self
    }

    #[must_use]
    pub fn on_change(mut self, handler: Handler) -> Self {
        self.props.on_change = Some(handler);
        self
    }

    #[must_use]
    pub fn on_mount(mut self, callback: MountCallback) -> Self {
        self.props.on_mount = Some(callback);
        self
    }

    /// Clone this element with edited props and the given children.
    #[must_use]
    pub fn clone_with_props<F>(&self, children: Vec<Element>, edit: F) -> Self
    where
        F: FnOnce(&mut Props),
    {
        let mut props = self.props.clone();
        edit(&mut props);
        Self {
            kind: self.kind.clone(),
            props,
            children,
        }
    }

    #[inline]
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    #[inline]
    pub fn props(&self) -> &Props {
        &self.props
    }

    #[inline]
    pub fn child_elements(&self) -> &[Element] {
        &self.children
    }

    /// Tag of a host element.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Host(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, ElementKind::Link { .. })
    }

    /// Route, switch, or redirect.
    pub fn is_control(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Route { .. } | ElementKind::Switch | ElementKind::Redirect { .. }
        )
    }

    pub fn is_form(&self) -> bool {
        self.tag() == Some("form")
    }

    pub fn is_text_input(&self) -> bool {
        matches!(self.tag(), Some("input") | Some("textarea"))
    }

    /// Run a composite's render function once. `None` for other kinds or
    /// when the composite renders nothing.
    pub fn render_once(&self) -> Option<Element> {
        match &self.kind {
            ElementKind::Composite { render, .. } => render(&self.props, &self.children),
            _ => None,
        }
    }
}

/// Classification of a view node for addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewNodeClass<'a> {
    /// Concrete node; the tag is its token.
    Concrete(&'a str),
    /// Composite with the given display name.
    Composite(&'a str),
    /// Navigation link.
    Link,
    /// Route, switch, or redirect.
    Control,
    /// Text leaf or other non-addressable marker.
    Text,
}

/// Capability set the path algorithm needs from a view tree.
pub trait ViewNode: Sized {
    fn class(&self) -> ViewNodeClass<'_>;

    fn child_nodes(&self) -> &[Self];

    /// Render a composite one level deep.
    fn instantiate(&self) -> Option<Self>;
}

impl ViewNode for Element {
    fn class(&self) -> ViewNodeClass<'_> {
        match &self.kind {
            ElementKind::Host(tag) => ViewNodeClass::Concrete(tag),
            ElementKind::Composite { name, .. } => ViewNodeClass::Composite(name),
            ElementKind::Link { .. } => ViewNodeClass::Link,
            ElementKind::Route { .. } | ElementKind::Switch | ElementKind::Redirect { .. } => {
                ViewNodeClass::Control
            }
            ElementKind::Text(_) => ViewNodeClass::Text,
        }
    }

    fn child_nodes(&self) -> &[Self] {
        &self.children
    }

    fn instantiate(&self) -> Option<Self> {
        self.render_once()
    }
}
