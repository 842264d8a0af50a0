#![forbid(unsafe_code)]

//! Core: element model, structural path ids, and the host collaborator traits.
//!
//! # Role in walkrec
//! `walkrec-core` owns everything that does not depend on the recording
//! store: the [`Element`] tree that hosts hand to the instrumentation layer,
//! the [`PathId`] algorithm that addresses nodes structurally, and the two
//! traits through which the rendering engine ([`MountedNode`]) and the
//! router ([`Location`]) are consumed.

pub mod element;
pub mod event;
pub mod geometry;
pub mod location;
pub mod mount;
pub mod path;

pub use element::{
    Element, ElementKind, Handler, HandlerFuture, MountCallback, Props, RelayProps, RenderFn,
    ViewNode, ViewNodeClass, async_handler, handler,
};
pub use event::{EventKind, UiEvent};
pub use geometry::Bounds;
pub use location::{Location, SharedLocation};
pub use mount::{GeometryError, MountedNode, NodeKey, NodeRef, StyleMap};
pub use path::{
    LINK_TOKEN, PathAllocator, PathId, Resolution, TEXT_TOKEN, TokenCounts, TypeMap, compute_id,
    compute_index_map, resolve_token,
};
