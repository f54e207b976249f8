//! Tree queries
//!
//! All queries return snapshots in document order, so callers may mutate
//! the tree while walking the result.

use fbtr_dom::{DomTree, NodeId};

use crate::SelectorList;

/// `element.matches(selector)`
pub fn matches(tree: &DomTree, node: NodeId, selector: &SelectorList) -> bool {
    selector.matches(tree, node)
}

/// `element.closest(selector)`: nearest inclusive ancestor that matches
pub fn closest(tree: &DomTree, node: NodeId, selector: &SelectorList) -> Option<NodeId> {
    tree.ancestors_inclusive(node).find(|&n| selector.matches(tree, n))
}

/// `scope.querySelector(selector)` (descendants only)
pub fn query_selector(tree: &DomTree, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
    tree.descendants(scope).find(|&n| selector.matches(tree, n))
}

/// `scope.querySelectorAll(selector)` (descendants only)
pub fn query_selector_all(tree: &DomTree, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
    tree.descendants(scope).filter(|&n| selector.matches(tree, n)).collect()
}

/// Like `query_selector_all`, but `base` itself is included when it matches
pub fn select_all_with_base(tree: &DomTree, base: NodeId, selector: &SelectorList) -> Vec<NodeId> {
    std::iter::once(base)
        .chain(tree.descendants(base))
        .filter(|&n| selector.matches(tree, n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_selector;

    fn feed() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let feed = tree.create_element_with_attrs("div", &[("role", "feed")]);
        let article = tree.create_element_with_attrs("div", &[("class", "story userContentWrapper")]);
        let link = tree.create_element_with_attrs("a", &[("href", "https://l.facebook.com/l.php?u=x")]);
        tree.append_child(NodeId::ROOT, feed).unwrap();
        tree.append_child(feed, article).unwrap();
        tree.append_child(article, link).unwrap();
        (tree, feed, article, link)
    }

    #[test]
    fn test_select_all_with_base_includes_base() {
        let (tree, _, article, _) = feed();
        let sel = parse_selector(".story").unwrap();
        assert_eq!(select_all_with_base(&tree, article, &sel), vec![article]);
        assert!(query_selector_all(&tree, article, &sel).is_empty());
    }

    #[test]
    fn test_closest() {
        let (tree, feed, article, link) = feed();
        let sel = parse_selector("div[role=feed] > div").unwrap();
        assert_eq!(closest(&tree, link, &sel), Some(article));
        let sel = parse_selector("[role=feed]").unwrap();
        assert_eq!(closest(&tree, link, &sel), Some(feed));
        let sel = parse_selector("section").unwrap();
        assert_eq!(closest(&tree, link, &sel), None);
    }

    #[test]
    fn test_descendant_and_has() {
        let (tree, feed, article, link) = feed();
        let sel = parse_selector("[role=feed] a[href*='/l.php?']").unwrap();
        assert_eq!(query_selector(&tree, NodeId::ROOT, &sel), Some(link));
        let sel = parse_selector("div:has(> a)").unwrap();
        assert_eq!(query_selector_all(&tree, NodeId::ROOT, &sel), vec![article]);
        let sel = parse_selector("div:not(.story)").unwrap();
        assert_eq!(query_selector_all(&tree, NodeId::ROOT, &sel), vec![feed]);
    }

    #[test]
    fn test_matching_part() {
        let (tree, _, article, _) = feed();
        let sel = parse_selector("section, .userContentWrapper").unwrap();
        assert!(matches(&tree, article, &sel));
        assert_eq!(sel.matching_part(&tree, article).map(|p| p.text.as_str()), Some(".userContentWrapper"));
    }
}
