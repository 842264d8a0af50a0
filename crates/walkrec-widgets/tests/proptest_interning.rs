//! Property-based invariant tests for the state interning table.
//!
//! 1. Interning deep-equal content with the same route returns the same id.
//! 2. New content receives an id no earlier state used.
//! 3. Ids are dense: the table holds exactly the ids 1..=len.
//! 4. peek_id predicts the id intern will return.

use std::collections::HashSet;

use proptest::prelude::*;
use walkrec_core::PathId;
use walkrec_widgets::{StateTable, Widget};

// ── Strategies ────────────────────────────────────────────────────────────

fn widget_strategy() -> impl Strategy<Value = Widget> {
    (0u8..4, 0u8..3, prop::bool::ANY).prop_map(|(id, width, has_child)| {
        let child = Widget::text_leaf(PathId::from("/r/text()"), "/", "t");
        Widget {
            id: PathId::new(format!("/r{id}")),
            route: "/".into(),
            bounding_width: f64::from(width) * 10.0,
            bounding_height: 20.0,
            xpos: 0.0,
            ypos: 0.0,
            style: Default::default(),
            inline_style: Default::default(),
            children: if has_child { vec![child] } else { Vec::new() },
            text: None,
        }
    })
}

fn route_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["/home", "/project"])
}

// ═════════════════════════════════════════════════════════════════════════
// Properties
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn interning_is_idempotent_and_dense(
        inputs in prop::collection::vec((widget_strategy(), route_strategy()), 1..40)
    ) {
        let mut table = StateTable::new();
        let mut seen_ids = HashSet::new();

        for (widget, route) in &inputs {
            let before = table.len();
            let predicted = table.peek_id(Some(widget), route);
            let id = table.intern(Some(widget.clone()), route);
            prop_assert_eq!(predicted, id);

            if seen_ids.insert(id) {
                prop_assert_eq!(id, before as i64 + 1);
                prop_assert_eq!(table.len(), before + 1);
            } else {
                prop_assert_eq!(table.len(), before);
            }

            prop_assert_eq!(table.intern(Some(widget.clone()), route), id);
        }

        let ids: Vec<i64> = table.iter().map(|s| s.state_id).collect();
        let expected: Vec<i64> = (1..=table.len() as i64).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn distinct_content_gets_distinct_ids(
        a in widget_strategy(),
        b in widget_strategy(),
        route in route_strategy(),
    ) {
        let mut table = StateTable::new();
        let ia = table.intern(Some(a.clone()), route);
        let ib = table.intern(Some(b.clone()), route);
        prop_assert_eq!(ia == ib, a == b);
    }
}
