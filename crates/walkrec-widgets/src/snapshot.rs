#![forbid(unsafe_code)]

//! Snapshot records and capture over mounted nodes.
//!
//! A capture walks the mounted visual tree below one root and produces an
//! immutable [`Widget`] tree. Children are captured before their parent's
//! geometry is read, so a subtree is always complete when its parent record
//! is built. Capture never fails: a missing root yields `None`, and a node
//! whose geometry cannot be read carries [`UNKNOWN_GEOMETRY`].

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use walkrec_core::{
    Bounds, MountedNode, NodeRef, PathAllocator, PathId, StyleMap, TEXT_TOKEN,
};

/// State id of a capture that produced no widgets.
pub const UNCAPTURED_STATE_ID: i64 = -1;

/// Sentinel for geometry that could not be read.
pub const UNKNOWN_GEOMETRY: f64 = -1.0;

/// Immutable snapshot of one visual node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: PathId,
    pub route: String,
    pub bounding_width: f64,
    pub bounding_height: f64,
    pub xpos: f64,
    pub ypos: f64,
    pub style: StyleMap,
    pub inline_style: StyleMap,
    pub children: Vec<Widget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Widget {
    /// Text-only leaf with sentinel geometry and empty styles.
    #[must_use]
    pub fn text_leaf(id: PathId, route: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            route: route.into(),
            bounding_width: UNKNOWN_GEOMETRY,
            bounding_height: UNKNOWN_GEOMETRY,
            xpos: UNKNOWN_GEOMETRY,
            ypos: UNKNOWN_GEOMETRY,
            style: StyleMap::new(),
            inline_style: StyleMap::new(),
            children: Vec::new(),
            text: Some(text.into()),
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.xpos, self.ypos, self.bounding_width, self.bounding_height)
    }

    pub fn has_unknown_geometry(&self) -> bool {
        self.bounds().is_unknown()
    }

    /// Number of records in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Widget::node_count).sum::<usize>()
    }

    /// Depth-first search by id.
    pub fn find(&self, id: &str) -> Option<&Widget> {
        if self.id.as_str() == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Pre-order iterator over the subtree.
    pub fn iter(&self) -> impl Iterator<Item = &Widget> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }
}

/// One captured UI state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuiState {
    pub widgets: Option<Widget>,
    pub state_id: i64,
    pub current_route: String,
}

impl GuiState {
    /// A state whose widgets could not be captured.
    #[must_use]
    pub fn uncaptured(route: impl Into<String>) -> Self {
        Self {
            widgets: None,
            state_id: UNCAPTURED_STATE_ID,
            current_route: route.into(),
        }
    }

    pub fn is_captured(&self) -> bool {
        self.widgets.is_some()
    }

    /// Same widgets and route, ignoring the state id.
    pub fn same_content(&self, widgets: Option<&Widget>, route: &str) -> bool {
        self.current_route == route && self.widgets.as_ref() == widgets
    }
}

/// Capture the mounted subtree below `root`.
///
/// Returns `None` when `root` is missing or no longer mounted.
pub fn capture_tree(root: Option<&NodeRef>, root_id: &PathId, route: &str) -> Option<Widget> {
    let root = root.filter(|node| node.is_mounted())?;
    let widget = capture_node(root.as_ref(), root_id.clone(), route);
    trace!(root = %root_id, nodes = widget.node_count(), "captured widget tree");
    Some(widget)
}

fn capture_node(node: &dyn MountedNode, id: PathId, route: &str) -> Widget {
    if node.tag().is_none() {
        return Widget::text_leaf(id, route, node.text().unwrap_or_default());
    }

    let children = capture_children(node, &id, route);

    let bounds = match node.bounding_rect() {
        Ok(bounds) => bounds,
        Err(err) => {
            warn!(id = %id, error = %err, "geometry read failed; using sentinel");
            Bounds::UNKNOWN
        }
    };

    Widget {
        id,
        route: route.to_string(),
        bounding_width: bounds.width,
        bounding_height: bounds.height,
        xpos: bounds.x,
        ypos: bounds.y,
        style: node.computed_style(),
        inline_style: node.inline_style(),
        children,
        text: None,
    }
}

fn capture_children(node: &dyn MountedNode, id: &PathId, route: &str) -> Vec<Widget> {
    let children: Vec<NodeRef> = node
        .children()
        .into_iter()
        .filter(|child| child.is_mounted())
        .collect();
    let tokens: Vec<Option<String>> = children.iter().map(|c| Some(token_of(c.as_ref()))).collect();
    let mut alloc = PathAllocator::from_tokens(tokens.iter().map(Option::as_deref));

    children
        .iter()
        .zip(&tokens)
        .map(|(child, token)| {
            let child_id = alloc.allocate(id, token.as_deref());
            capture_node(child.as_ref(), child_id, route)
        })
        .collect()
}

fn token_of(node: &dyn MountedNode) -> String {
    node.tag().unwrap_or_else(|| TEXT_TOKEN.to_string())
}
