//! Finder resolution over an `AccessibilityTree`.
//!
//! 1. A root query yields exactly the tree root.
//! 2. Otherwise the candidates are the descendants of every ancestor match
//!    (or of the root), deduplicated, in preorder.
//! 3. Attribute filters prune the candidates; Nth/First picks last.

use super::snapshot::{AccessibilityTree, NodeId};
use super::types::NodeInfo;
use crate::finder::{Pick, Query};

pub fn resolve(tree: &AccessibilityTree, query: &Query) -> Vec<NodeId> {
    if tree.is_empty() {
        return Vec::new();
    }
    if query.is_root() {
        return vec![tree.root()];
    }

    let candidates = match query.ancestor() {
        None => tree.descendants(tree.root()),
        Some(ancestor) => {
            let scopes = resolve(tree, ancestor);
            let mut in_scope = vec![false; tree.len()];
            for scope in scopes {
                for id in tree.descendants(scope) {
                    in_scope[id] = true;
                }
            }
            tree.preorder()
                .into_iter()
                .filter(|id| in_scope[*id])
                .collect()
        }
    };

    let matched = candidates
        .into_iter()
        .filter(|id| tree.node(*id).is_some_and(|n| query.accepts(n)));

    match query.pick() {
        Pick::All => matched.collect(),
        Pick::Nth(n) => matched.skip(n).take(1).collect(),
    }
}

pub fn resolve_infos(tree: &AccessibilityTree, query: &Query) -> Vec<NodeInfo> {
    resolve(tree, query)
        .into_iter()
        .filter_map(|id| tree.node(id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::{Finder, Role, StateKind};

    fn browser() -> AccessibilityTree {
        AccessibilityTree::from_json(
            r#"{
                "role": "desktop", "name": "root",
                "children": [
                    {"role": "window", "className": "BrowserFrame", "name": "w1", "children": [
                        {"role": "button", "className": "NewTabButton", "name": "hidden",
                         "state": {"invisible": true}},
                        {"role": "button", "className": "NewTabButton", "name": "offscreen",
                         "state": {"offscreen": true}},
                        {"role": "button", "className": "NewTabButton", "name": "wanted"},
                        {"role": "button", "className": "NewTabButton", "name": "second"}
                    ]},
                    {"role": "window", "className": "OtherFrame", "children": [
                        {"role": "button", "className": "NewTabButton", "name": "elsewhere"}
                    ]},
                    {"role": "staticText", "name": "What's new"},
                    {"role": "staticText", "name": "What's New"},
                    {"role": "staticText", "name": "Whats new"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn names(tree: &AccessibilityTree, finder: &Finder) -> Vec<String> {
        let query = finder.compile().unwrap();
        resolve_infos(tree, &query).into_iter().map(|n| n.name).collect()
    }

    #[test]
    fn test_ancestor_nesting_picks_first_visible_onscreen() {
        let tree = browser();
        let finder = Finder::new()
            .has_class("NewTabButton")
            .role(Role::Button)
            .visible()
            .onscreen()
            .first()
            .ancestor(&Finder::new().has_class("BrowserFrame").role(Role::Window));
        assert_eq!(names(&tree, &finder), vec!["wanted"]);
    }

    #[test]
    fn test_ancestor_scopes_candidates() {
        let tree = browser();
        let finder = Finder::new()
            .has_class("NewTabButton")
            .ancestor(&Finder::new().has_class("OtherFrame"));
        assert_eq!(names(&tree, &finder), vec!["elsewhere"]);
    }

    #[test]
    fn test_root_resolves_to_tree_root() {
        let tree = browser();
        assert_eq!(names(&tree, &Finder::root()), vec!["root"]);
    }

    #[test]
    fn test_name_regex_matches_both_spellings() {
        let tree = browser();
        let finder = Finder::new().name_regex("What('|')s (n|N)ew");
        assert_eq!(names(&tree, &finder), vec!["What's new", "What's New"]);
    }

    #[test]
    fn test_nth_bounds() {
        let tree = browser();
        let buttons = Finder::new().role(Role::Button);
        assert_eq!(names(&tree, &buttons.nth(0)), vec!["hidden"]);
        assert_eq!(names(&tree, &buttons.nth(4)), vec!["elsewhere"]);
        assert!(names(&tree, &buttons.nth(5)).is_empty());

        let nothing = Finder::new().role(Role::Slider).first();
        assert!(names(&tree, &nothing).is_empty());
    }

    #[test]
    fn test_state_and_name_filters() {
        let tree = browser();
        let finder = Finder::new()
            .role(Role::Button)
            .state(StateKind::Offscreen, true);
        assert_eq!(names(&tree, &finder), vec!["offscreen"]);
        assert_eq!(
            names(&tree, &Finder::new().name_starting_with("What")),
            vec!["What's new", "What's New", "Whats new"]
        );
        assert_eq!(
            names(&tree, &Finder::new().name_containing("cond")),
            vec!["second"]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let tree = browser();
        let query = Finder::new().has_class("NewTabButton").compile().unwrap();
        assert_eq!(resolve(&tree, &query), resolve(&tree, &query));
    }
}
