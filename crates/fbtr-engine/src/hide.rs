//! Content hiding
//!
//! Rules find a trigger element; the hider climbs to the feed item that
//! holds it and either collapses that item behind a labeled placeholder or
//! removes it.

use fbtr_css::{SelectorList, closest, parse_selector, select_all_with_base};
use fbtr_dom::{DomTree, NodeId};

use crate::config::HideMethod;
use crate::error::Result;
use crate::guard::{self, COLLAPSIBLE_CLASS};
use crate::rules::CompiledRuleTable;
use crate::text::{normalize_string, visible_text};

#[derive(Debug, Clone)]
pub struct Hider {
    method: HideMethod,
    wrapper: SelectorList,
    collapsible: SelectorList,
}

impl Hider {
    pub fn new(method: HideMethod, article_wrapper: &str) -> Result<Self> {
        Ok(Self {
            method,
            wrapper: parse_selector(article_wrapper)?,
            collapsible: parse_selector(&format!(".{COLLAPSIBLE_CLASS}"))?,
        })
    }

    /// Run every rule of `table` over `root` and its descendants.
    /// Returns the number of feed items hidden.
    pub fn apply_content_rules(&self, tree: &mut DomTree, root: NodeId, table: &CompiledRuleTable) -> Result<usize> {
        let mut hidden = 0;
        for rule in &table.rules {
            for element in select_all_with_base(tree, root, &rule.selector) {
                let text = visible_text(tree, element);
                if !rule.is_structural() && !rule.texts.contains(&normalize_string(&text)) {
                    continue;
                }
                let label = match text.split_whitespace().collect::<Vec<_>>().join(" ") {
                    shown if shown.is_empty() => table.name.clone(),
                    shown => shown,
                };

                if self.hide(tree, element, &label)? {
                    hidden += 1;
                    let part = rule
                        .selector
                        .matching_part(tree, element)
                        .map(|s| s.text.as_str())
                        .unwrap_or(rule.selector.text.as_str());
                    tracing::debug!("Hid feed item via {} rule {:?} ({})", table.name, part, label);
                }
            }
        }
        Ok(hidden)
    }

    /// Hide the feed item containing `element`. False when there is no
    /// feed item or it is already collapsed.
    pub fn hide(&self, tree: &mut DomTree, element: NodeId, label: &str) -> Result<bool> {
        let Some(wrapper) = closest(tree, element, &self.wrapper) else {
            return Ok(false);
        };

        match self.method {
            HideMethod::Remove => {
                if tree.parent(wrapper).is_none() {
                    return Ok(false);
                }
                tree.remove(wrapper)?;
                tracing::debug!("Removed {}", label);
            }
            HideMethod::Collapse => {
                if closest(tree, wrapper, &self.collapsible).is_some() {
                    return Ok(false);
                }
                let Some(parent) = tree.parent(wrapper) else {
                    return Ok(false);
                };
                let placeholder = self.build_collapsible(tree, wrapper, label)?;
                tree.insert_before(parent, placeholder, Some(wrapper))?;
                tree.append_child(placeholder, wrapper)?;
                tracing::debug!("Collapsed {}", label);
            }
        }
        Ok(true)
    }

    /// `<details class="fbtrCollapsible ...">` with a summary line, carrying
    /// the wrapper's classes
    fn build_collapsible(&self, tree: &mut DomTree, wrapper: NodeId, label: &str) -> Result<NodeId> {
        let details = tree.create_element("details");
        for class in tree.class_list(wrapper).iter() {
            tree.add_class(details, class)?;
        }
        tree.add_class(details, COLLAPSIBLE_CLASS)?;
        guard::apply_style(tree, details)?;
        guard::mark_processed(tree, details)?;

        let summary = tree.create_element("summary");
        let text = tree.create_text(label);
        tree.append_child(summary, text)?;
        tree.append_child(details, summary)?;
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleTable;
    use pretty_assertions::assert_eq;

    fn feed(tree: &mut DomTree) -> (NodeId, NodeId, NodeId) {
        let stream = tree.create_element("div");
        tree.append_child(NodeId::ROOT, stream).unwrap();
        let story = tree.create_element_with_attrs("div", &[("class", "story _5jmm")]);
        tree.append_child(stream, story).unwrap();
        let label = tree.create_element_with_attrs("span", &[("class", "label")]);
        let text = tree.create_text("Sponsored");
        tree.append_child(label, text).unwrap();
        tree.append_child(story, label).unwrap();
        (stream, story, label)
    }

    #[test]
    fn test_collapse_wraps_story() {
        let mut tree = DomTree::new();
        let (stream, story, label) = feed(&mut tree);
        let hider = Hider::new(HideMethod::Collapse, "div.story").unwrap();

        assert!(hider.hide(&mut tree, label, "sponsored").unwrap());
        let placeholder = tree.parent(story).unwrap();
        assert_eq!(tree.parent(placeholder), Some(stream));
        assert_eq!(tree.tag_name(placeholder), Some("details"));
        assert!(tree.has_class(placeholder, "_5jmm"));
        assert!(tree.has_class(placeholder, COLLAPSIBLE_CLASS));

        // Second attempt sees the placeholder and does nothing.
        assert!(!hider.hide(&mut tree, label, "sponsored").unwrap());
        assert_eq!(tree.children(stream), vec![placeholder]);
    }

    #[test]
    fn test_remove_detaches_story() {
        let mut tree = DomTree::new();
        let (stream, story, label) = feed(&mut tree);
        let hider = Hider::new(HideMethod::Remove, "div.story").unwrap();
        assert!(hider.hide(&mut tree, label, "sponsored").unwrap());
        assert!(tree.children(stream).is_empty());
        assert!(!tree.is_connected(story));
    }

    #[test]
    fn test_no_wrapper_is_noop() {
        let mut tree = DomTree::new();
        let (_, _, label) = feed(&mut tree);
        let hider = Hider::new(HideMethod::Collapse, "article").unwrap();
        assert!(!hider.hide(&mut tree, label, "x").unwrap());
    }

    #[test]
    fn test_apply_content_rules_matches_text() {
        let mut tree = DomTree::new();
        let (stream, _, _) = feed(&mut tree);
        let hider = Hider::new(HideMethod::Remove, "div.story").unwrap();

        let mut table = RuleTable::new();
        table.push("span.label", ["Promoted"]);
        assert_eq!(hider.apply_content_rules(&mut tree, stream, &table.compile("t")).unwrap(), 0);

        table.push("span.label", ["SPONSORED"]);
        assert_eq!(hider.apply_content_rules(&mut tree, stream, &table.compile("t")).unwrap(), 1);
        assert!(tree.children(stream).is_empty());
    }

    fn summary_text(tree: &DomTree, story: NodeId) -> String {
        let placeholder = tree.parent(story).unwrap();
        let summary = tree.first_child(placeholder).unwrap();
        assert_eq!(tree.tag_name(summary), Some("summary"));
        visible_text(tree, summary)
    }

    #[test]
    fn test_label_is_shown_text() {
        let mut tree = DomTree::new();
        let (stream, story, _) = feed(&mut tree);
        let hider = Hider::new(HideMethod::Collapse, "div.story").unwrap();
        let mut table = RuleTable::new();
        table.push("span.label", ["sponsored"]);
        hider.apply_content_rules(&mut tree, stream, &table.compile("sponsored")).unwrap();
        assert_eq!(summary_text(&tree, story), "Sponsored");
    }

    #[test]
    fn test_structural_label_is_shown_text() {
        let mut tree = DomTree::new();
        let (stream, story, _) = feed(&mut tree);
        let hider = Hider::new(HideMethod::Collapse, "div.story").unwrap();
        let mut table = RuleTable::new();
        table.push("span.label", Vec::<String>::new());
        hider.apply_content_rules(&mut tree, stream, &table.compile("user")).unwrap();
        assert_eq!(summary_text(&tree, story), "Sponsored");
    }

    #[test]
    fn test_empty_structural_match_uses_table_name() {
        let mut tree = DomTree::new();
        let (stream, story, _) = feed(&mut tree);
        let marker = tree.create_element("i");
        tree.append_child(story, marker).unwrap();
        let hider = Hider::new(HideMethod::Collapse, "div.story").unwrap();
        let mut table = RuleTable::new();
        table.push("i", Vec::<String>::new());
        hider.apply_content_rules(&mut tree, stream, &table.compile("suggestions")).unwrap();
        assert_eq!(summary_text(&tree, story), "suggestions");
    }
}
