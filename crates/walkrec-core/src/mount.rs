#![forbid(unsafe_code)]

//! Live handles to mounted host nodes.
//!
//! The rendering engine is an external collaborator. walkrec only needs
//! three things from it once a node is on screen: its children, its
//! bounding geometry, and its style. [`MountedNode`] is that capability set.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::geometry::Bounds;

/// Flat `property -> value` style map. Ordered so snapshots compare and
/// serialize deterministically.
pub type StyleMap = BTreeMap<String, String>;

/// Host-assigned identity of a mounted node.
///
/// Used to compare an event's target with its current target; it carries
/// no structural meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Error reading geometry from a mounted node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// The node was unmounted between lookup and read.
    Detached,
    /// The host could not produce geometry for this node.
    Unavailable(String),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::Detached => write!(f, "node is detached"),
            GeometryError::Unavailable(msg) => write!(f, "geometry unavailable: {msg}"),
        }
    }
}

impl std::error::Error for GeometryError {}

/// A node the host has mounted.
///
/// Implementations must be cheap to query; the snapshot engine walks the
/// whole subtree under the capture root on every interaction.
pub trait MountedNode: Send + Sync {
    /// Host identity of this node.
    fn key(&self) -> NodeKey;

    /// Element tag (`"div"`, `"button"`), or `None` for text nodes.
    fn tag(&self) -> Option<String>;

    /// Text content for text nodes.
    fn text(&self) -> Option<String> {
        None
    }

    /// Whether the node is still attached to the visible tree.
    fn is_mounted(&self) -> bool;

    /// Rendered children, in document order.
    fn children(&self) -> Vec<NodeRef>;

    /// Bounding geometry.
    fn bounding_rect(&self) -> Result<Bounds, GeometryError>;

    /// Declared (computed) style.
    fn computed_style(&self) -> StyleMap {
        StyleMap::new()
    }

    /// Inline style set directly on the node.
    fn inline_style(&self) -> StyleMap {
        StyleMap::new()
    }
}

/// Shared live handle to a mounted node.
pub type NodeRef = Arc<dyn MountedNode>;
