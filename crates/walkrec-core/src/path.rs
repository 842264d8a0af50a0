#![forbid(unsafe_code)]

//! Structural path identifiers.
//!
//! A [`PathId`] addresses a node by the chain of type tokens from the
//! instrumentation root down to it, XPath style: `/html/body/div/button[2]`.
//!
//! # Invariants
//!
//! 1. Two siblings share a segment only if they resolve to the same token.
//! 2. The `[k]` suffix is present iff more than one sibling under the same
//!    parent resolves to that token.
//! 3. `k` is the 1-based occurrence of the token, scanning siblings left to
//!    right.
//! 4. Transparent (route/switch/redirect) and unresolvable nodes return the
//!    parent id unchanged and do not consume an index slot.
//!
//! Ids are recomputed on every traversal. They address structure, not
//! instances: the same id may name a different node after the tree changes
//! shape.
//!
//! # Token resolution
//!
//! | node | token |
//! |------|-------|
//! | concrete (`Host`) | its tag |
//! | composite | token of the first concrete node it renders, via the [`TypeMap`] or by instantiating nested composites |
//! | link | `a` (the anchor the host renders) |
//! | route / switch / redirect | transparent |
//! | text, renders-nothing | unresolved |

use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::element::{ViewNode, ViewNodeClass};

/// Token used for links and the anchors hosts render for them.
pub const LINK_TOKEN: &str = "a";

/// Token used for text leaves of the mounted tree.
pub const TEXT_TOKEN: &str = "text()";

/// Nested composites deeper than this are treated as unresolvable.
const MAX_RESOLVE_DEPTH: usize = 64;

/// Slash-delimited structural address of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(String);

impl PathId {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The empty path; children of the root get `/token` ids.
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append `/token` without an index.
    #[must_use]
    pub fn join(&self, token: &str) -> PathId {
        self.segment(token, None)
    }

    /// Append `/token` or `/token[index]`.
    #[must_use]
    pub fn segment(&self, token: &str, index: Option<usize>) -> PathId {
        let mut out = String::with_capacity(self.0.len() + token.len() + 5);
        out.push_str(&self.0);
        out.push('/');
        out.push_str(token);
        if let Some(k) = index {
            out.push('[');
            out.push_str(&k.to_string());
            out.push(']');
        }
        PathId(out)
    }

    /// Path segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// True if `other` lies strictly below `self`.
    pub fn is_ancestor_of(&self, other: &PathId) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'/'
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PathId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PathId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PathId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Per-token sibling counts.
pub type TokenCounts = HashMap<String, usize>;

/// Outcome of resolving a node's type token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The node is addressed by this token.
    Token(String),
    /// Routing control; contributes no segment.
    Transparent,
    /// Nothing concrete could be found; contributes no segment.
    Unresolved,
}

impl Resolution {
    pub fn token(&self) -> Option<&str> {
        match self {
            Resolution::Token(t) => Some(t),
            _ => None,
        }
    }
}

/// Resolve the token a node is addressed by.
pub fn resolve_token<N: ViewNode>(node: &N, types: &TypeMap) -> Resolution {
    match node.class() {
        ViewNodeClass::Concrete(tag) => Resolution::Token(tag.to_string()),
        ViewNodeClass::Link => Resolution::Token(LINK_TOKEN.to_string()),
        ViewNodeClass::Control => Resolution::Transparent,
        ViewNodeClass::Text => Resolution::Unresolved,
        ViewNodeClass::Composite(name) => match types.get(name) {
            Some(token) => Resolution::Token(token.to_string()),
            None => resolve_rendered(node, 0),
        },
    }
}

/// Instantiate a composite until a concrete node is reached.
fn resolve_rendered<N: ViewNode>(node: &N, depth: usize) -> Resolution {
    if depth > MAX_RESOLVE_DEPTH {
        warn!(depth, "composite nesting too deep to resolve a path token");
        return Resolution::Unresolved;
    }
    match node.class() {
        ViewNodeClass::Concrete(tag) => Resolution::Token(tag.to_string()),
        ViewNodeClass::Link => Resolution::Token(LINK_TOKEN.to_string()),
        ViewNodeClass::Text => Resolution::Unresolved,
        ViewNodeClass::Composite(_) => match node.instantiate() {
            Some(rendered) => resolve_rendered(&rendered, depth + 1),
            None => Resolution::Unresolved,
        },
        // A composite that renders a route is addressed by what the route renders.
        ViewNodeClass::Control => node
            .child_nodes()
            .iter()
            .map(|child| resolve_rendered(child, depth + 1))
            .find(|r| matches!(r, Resolution::Token(_)))
            .unwrap_or(Resolution::Unresolved),
    }
}

/// Count, among all siblings, how many resolve to each token.
pub fn compute_index_map<N: ViewNode>(siblings: &[N], types: &TypeMap) -> TokenCounts {
    let mut map = TokenCounts::new();
    for sibling in siblings {
        if let Resolution::Token(token) = resolve_token(sibling, types) {
            *map.entry(token).or_insert(0) += 1;
        }
    }
    map
}

/// Compute the id of `node` under `parent`.
///
/// `index_map` is the result of [`compute_index_map`] over the full sibling
/// list; `running` accumulates occurrences as siblings are visited in order.
pub fn compute_id<N: ViewNode>(
    node: &N,
    parent: &PathId,
    index_map: &TokenCounts,
    running: &mut TokenCounts,
    types: &TypeMap,
) -> PathId {
    match resolve_token(node, types) {
        Resolution::Token(token) => append_segment(parent, &token, index_map, running),
        Resolution::Transparent | Resolution::Unresolved => parent.clone(),
    }
}

fn append_segment(
    parent: &PathId,
    token: &str,
    index_map: &TokenCounts,
    running: &mut TokenCounts,
) -> PathId {
    let seen = running.entry(token.to_string()).or_insert(0);
    *seen += 1;
    let total = index_map.get(token).copied().unwrap_or(0);
    let index = (total > 1).then_some(*seen);
    parent.segment(token, index)
}

/// Allocates ids for one sibling list, in order.
///
/// Wraps the index map and running counts so callers only feed siblings.
#[derive(Debug, Clone, Default)]
pub struct PathAllocator {
    totals: TokenCounts,
    running: TokenCounts,
}

impl PathAllocator {
    /// Allocator for a list of view nodes.
    #[must_use]
    pub fn for_siblings<N: ViewNode>(siblings: &[N], types: &TypeMap) -> Self {
        Self {
            totals: compute_index_map(siblings, types),
            running: TokenCounts::new(),
        }
    }

    /// Allocator for already-resolved tokens (`None` = no segment).
    #[must_use]
    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut totals = TokenCounts::new();
        for token in tokens.into_iter().flatten() {
            *totals.entry(token.to_string()).or_insert(0) += 1;
        }
        Self {
            totals,
            running: TokenCounts::new(),
        }
    }

    /// Id of the next view node in sibling order.
    pub fn next_id<N: ViewNode>(&mut self, node: &N, parent: &PathId, types: &TypeMap) -> PathId {
        compute_id(node, parent, &self.totals, &mut self.running, types)
    }

    /// Id of the next resolved token in sibling order.
    pub fn allocate(&mut self, parent: &PathId, token: Option<&str>) -> PathId {
        match token {
            Some(token) => append_segment(parent, token, &self.totals, &mut self.running),
            None => parent.clone(),
        }
    }

    pub fn totals(&self) -> &TokenCounts {
        &self.totals
    }
}

/// Composite display name to resolved token.
///
/// Built once per instrumentation pass so composites are not re-instantiated
/// for every id. Display names must be unique: when two composites share a
/// name but render different tokens, the first one wins and a warning is
/// logged.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    tokens: HashMap<String, String>,
    collisions: BTreeSet<String>,
}

impl TypeMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `roots` (rendering composites along the way) and record every
    /// composite's token.
    #[must_use]
    pub fn build<N: ViewNode>(roots: &[N]) -> Self {
        let mut map = Self::new();
        for root in roots {
            map.visit(root, 0);
        }
        trace!(entries = map.tokens.len(), "built composite type map");
        map
    }

    fn visit<N: ViewNode>(&mut self, node: &N, depth: usize) {
        if depth > MAX_RESOLVE_DEPTH {
            return;
        }
        if let ViewNodeClass::Composite(name) = node.class() {
            if let Resolution::Token(token) = resolve_rendered(node, 0) {
                self.insert(name, token);
            }
            if let Some(rendered) = node.instantiate() {
                self.visit(&rendered, depth + 1);
            }
        }
        for child in node.child_nodes() {
            self.visit(child, depth + 1);
        }
    }

    /// Record `name -> token`. Returns false if `name` was already mapped to
    /// a different token.
    pub fn insert(&mut self, name: &str, token: String) -> bool {
        match self.tokens.get(name) {
            Some(existing) if *existing == token => true,
            Some(existing) => {
                warn!(
                    name,
                    existing = %existing,
                    token = %token,
                    "composite display name is not unique; path ids may be wrong"
                );
                self.collisions.insert(name.to_string());
                false
            }
            None => {
                self.tokens.insert(name.to_string(), token);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }

    /// Display names seen with more than one token.
    pub fn collisions(&self) -> impl Iterator<Item = &str> {
        self.collisions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    fn ids(siblings: &[Element], parent: &str) -> Vec<String> {
        let types = TypeMap::build(siblings);
        let parent = PathId::from(parent);
        let mut alloc = PathAllocator::for_siblings(siblings, &types);
        siblings
            .iter()
            .map(|s| alloc.next_id(s, &parent, &types).to_string())
            .collect()
    }

    #[test]
    fn lone_sibling_has_no_suffix() {
        let siblings = [Element::host("div"), Element::host("button")];
        assert_eq!(ids(&siblings, "/root"), ["/root/div", "/root/button"]);
    }

    #[test]
    fn repeated_tokens_are_indexed_left_to_right() {
        let siblings = [
            Element::host("button"),
            Element::host("span"),
            Element::host("button"),
            Element::host("button"),
        ];
        assert_eq!(
            ids(&siblings, ""),
            ["/button[1]", "/span", "/button[2]", "/button[3]"]
        );
    }

    #[test]
    fn composite_resolves_to_first_concrete_node() {
        let inner = Element::composite("Inner", |_, _| Some(Element::host("button")));
        let outer = Element::composite("Outer", move |_, _| Some(inner.clone()));
        let siblings = [outer, Element::host("button")];
        assert_eq!(ids(&siblings, "/p"), ["/p/button[1]", "/p/button[2]"]);
    }

    #[test]
    fn controls_are_transparent_and_consume_no_slot() {
        let siblings = [
            Element::route("/home"),
            Element::host("div"),
            Element::switch(),
            Element::redirect("/x"),
        ];
        assert_eq!(ids(&siblings, "/p"), ["/p", "/p/div", "/p", "/p"]);
    }

    #[test]
    fn unresolvable_returns_parent() {
        let siblings = [
            Element::text("hello"),
            Element::composite("Empty", |_, _| None),
        ];
        assert_eq!(ids(&siblings, "/p"), ["/p", "/p"]);
    }

    #[test]
    fn links_resolve_to_anchor() {
        let siblings = [Element::link("/a"), Element::host("div")];
        assert_eq!(ids(&siblings, "/p"), ["/p/a", "/p/div"]);
    }

    #[test]
    fn composite_rendering_route_uses_route_content() {
        let page = Element::composite("Page", |_, _| {
            Some(Element::route("/home").child(Element::host("main")))
        });
        let types = TypeMap::build(std::slice::from_ref(&page));
        assert_eq!(types.get("Page"), Some("main"));
    }

    #[test]
    fn type_map_reports_collisions() {
        let a = Element::composite("Widget", |_, _| Some(Element::host("div")));
        let b = Element::composite("Widget", |_, _| Some(Element::host("span")));
        let types = TypeMap::build(&[a, b]);
        assert_eq!(types.get("Widget"), Some("div"));
        assert_eq!(types.collisions().collect::<Vec<_>>(), ["Widget"]);
    }

    #[test]
    fn same_name_same_token_is_not_a_collision() {
        let make = || Element::composite("Card", |_, _| Some(Element::host("section")));
        let types = TypeMap::build(&[make(), make()]);
        assert_eq!(types.collisions().count(), 0);
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn type_map_lookup_wins_over_instantiation() {
        let mut types = TypeMap::new();
        types.insert("Card", "article".to_string());
        let card = Element::composite("Card", |_, _| Some(Element::host("section")));
        assert_eq!(
            resolve_token(&card, &types),
            Resolution::Token("article".into())
        );
    }

    #[test]
    fn allocate_from_tokens() {
        let mut alloc = PathAllocator::from_tokens([Some("li"), None, Some("li")]);
        let parent = PathId::from("/ul");
        assert_eq!(alloc.allocate(&parent, Some("li")).as_str(), "/ul/li[1]");
        assert_eq!(alloc.allocate(&parent, None).as_str(), "/ul");
        assert_eq!(alloc.allocate(&parent, Some("li")).as_str(), "/ul/li[2]");
    }

    #[test]
    fn path_helpers() {
        let p = PathId::from("/html/body/div");
        assert_eq!(p.depth(), 3);
        assert_eq!(p.segments().last(), Some("div"));
        assert!(p.is_ancestor_of(&PathId::from("/html/body/div/button")));
        assert!(!p.is_ancestor_of(&PathId::from("/html/body/divx")));
        assert!(!p.is_ancestor_of(&p));
        assert!(PathId::root().is_root());
        assert_eq!(PathId::root().join("div").as_str(), "/div");
    }
}
