//! Selector model and matching
//!
//! Complex selectors are matched right to left against the live tree.

use fbtr_dom::{DomTree, NodeId};

/// An+B expression for :nth-* selectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NthExpression {
    /// Coefficient (A in An+B)
    pub a: i32,
    /// Offset (B in An+B)
    pub b: i32,
}

impl NthExpression {
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Parse "2n+1", "odd", "even", "3", "-n+3"
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s.trim().to_ascii_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
        match s.as_str() {
            "odd" => return Some(Self::new(2, 1)),
            "even" => return Some(Self::new(2, 0)),
            _ => {}
        }
        if let Ok(n) = s.parse::<i32>() {
            return Some(Self::new(0, n));
        }
        let (a_str, rest) = s.split_once('n')?;
        let a = match a_str {
            "" | "+" => 1,
            "-" => -1,
            _ => a_str.parse().ok()?,
        };
        let b = if rest.is_empty() {
            0
        } else {
            rest.strip_prefix('+').unwrap_or(rest).parse().ok()?
        };
        Some(Self::new(a, b))
    }

    /// Check if index n (1-based) matches this expression
    pub fn matches(&self, n: i32) -> bool {
        if self.a == 0 {
            return n == self.b;
        }
        let diff = n - self.b;
        diff % self.a == 0 && diff / self.a >= 0
    }
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    /// `[attr=value i]`
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Includes(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
}

impl AttributeSelector {
    /// Check if an attribute value matches
    pub fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else { return false };
        let Some(matcher) = &self.matcher else { return true };

        let fold = |s: &str| {
            if self.case_insensitive { s.to_lowercase() } else { s.to_string() }
        };
        let val = fold(value);
        match matcher {
            AttributeMatcher::Exact(expected) => val == fold(expected),
            AttributeMatcher::Includes(expected) => {
                let expected = fold(expected);
                !expected.is_empty() && val.split_ascii_whitespace().any(|w| w == expected)
            }
            AttributeMatcher::DashMatch(expected) => {
                let expected = fold(expected);
                val == expected || val.starts_with(&format!("{expected}-"))
            }
            AttributeMatcher::Prefix(expected) => !expected.is_empty() && val.starts_with(&fold(expected)),
            AttributeMatcher::Suffix(expected) => !expected.is_empty() && val.ends_with(&fold(expected)),
            AttributeMatcher::Substring(expected) => !expected.is_empty() && val.contains(&fold(expected)),
        }
    }
}

/// Pseudo-classes that can be decided from the tree alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    NthChild(NthExpression),
    NthLastChild(NthExpression),
    Not(SelectorList),
    Is(SelectorList),
    Has(SelectorList),
}

/// A simple selector inside a compound selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorComponent {
    /// Universal selector *
    Universal,
    /// Type selector (tag name)
    Type(String),
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
    /// Pseudo-class :first-child, :not(), etc.
    PseudoClass(PseudoClass),
}

/// Relationship between two compound selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

/// Sequence of simple selectors with no combinator (`a.b[c]`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub components: Vec<SelectorComponent>,
}

/// Compound selectors joined by combinators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    /// Source text of this selector
    pub text: String,
    pub compounds: Vec<CompoundSelector>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    pub combinators: Vec<Combinator>,
    /// Leading combinator of a relative selector (inside `:has()`)
    pub leading: Option<Combinator>,
}

/// Comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    pub text: String,
    pub selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    /// Does any selector in the list match `node`?
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.is_element(node) && self.selectors.iter().any(|s| s.matches(tree, node))
    }

    /// The first comma-separated part that matches `node`
    pub fn matching_part(&self, tree: &DomTree, node: NodeId) -> Option<&ComplexSelector> {
        self.selectors.iter().find(|s| s.matches(tree, node))
    }
}

impl std::fmt::Display for SelectorList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl ComplexSelector {
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.is_element(node) && self.match_from(tree, self.compounds.len() - 1, node, None)
    }

    fn match_from(&self, tree: &DomTree, idx: usize, node: NodeId, anchor: Option<NodeId>) -> bool {
        if !self.compounds[idx].matches(tree, node) {
            return false;
        }
        if idx == 0 {
            return match (anchor, self.leading) {
                (Some(anchor), Some(combinator)) => related(tree, combinator, anchor, node),
                (Some(anchor), None) => related(tree, Combinator::Descendant, anchor, node),
                (None, _) => true,
            };
        }
        let next = |n: NodeId| self.match_from(tree, idx - 1, n, anchor);
        match self.combinators[idx - 1] {
            Combinator::Descendant => element_ancestors(tree, node).any(next),
            Combinator::Child => element_parent(tree, node).is_some_and(next),
            Combinator::NextSibling => prev_element_sibling(tree, node).is_some_and(next),
            Combinator::SubsequentSibling => prev_element_siblings(tree, node).any(next),
        }
    }

    /// Match as a relative selector anchored at `anchor` (for `:has()`)
    fn matches_relative(&self, tree: &DomTree, anchor: NodeId) -> bool {
        let last = self.compounds.len() - 1;
        let scope: Vec<NodeId> = match self.leading {
            Some(Combinator::NextSibling) | Some(Combinator::SubsequentSibling) => {
                let mut out = Vec::new();
                let mut cur = tree.next_sibling(anchor);
                while let Some(sibling) = cur {
                    out.push(sibling);
                    out.extend(tree.descendants(sibling));
                    cur = tree.next_sibling(sibling);
                }
                out
            }
            _ => tree.descendants(anchor).collect(),
        };
        scope
            .into_iter()
            .filter(|&n| tree.is_element(n))
            .any(|n| self.match_from(tree, last, n, Some(anchor)))
    }
}

impl CompoundSelector {
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.components.iter().all(|c| match_component(tree, node, c))
    }
}

/// Match a selector component against an element
pub(crate) fn match_component(tree: &DomTree, node: NodeId, component: &SelectorComponent) -> bool {
    let Some(elem) = tree.element(node) else { return false };
    match component {
        SelectorComponent::Universal => true,
        SelectorComponent::Type(tag) => elem.tag.eq_ignore_ascii_case(tag),
        SelectorComponent::Id(id) => elem.id() == Some(id.as_str()),
        SelectorComponent::Class(class) => elem.has_class(class),
        SelectorComponent::Attribute(attr) => attr.matches(elem.get_attr(&attr.name)),
        SelectorComponent::PseudoClass(pseudo) => match_pseudo_class(tree, node, pseudo),
    }
}

fn match_pseudo_class(tree: &DomTree, node: NodeId, pseudo: &PseudoClass) -> bool {
    let position = || {
        let siblings = element_parent(tree, node)
            .map(|p| tree.element_children(p))
            .unwrap_or_else(|| vec![node]);
        let index = siblings.iter().position(|&s| s == node).unwrap_or(0);
        (index as i32 + 1, siblings)
    };
    match pseudo {
        PseudoClass::Root => tree.parent(node) == Some(tree.root()),
        PseudoClass::Empty => tree
            .children(node)
            .iter()
            .all(|&c| !tree.is_element(c) && tree.text_content(c).is_empty()),
        PseudoClass::FirstChild => prev_element_sibling(tree, node).is_none(),
        PseudoClass::LastChild => next_element_sibling(tree, node).is_none(),
        PseudoClass::OnlyChild => {
            prev_element_sibling(tree, node).is_none() && next_element_sibling(tree, node).is_none()
        }
        PseudoClass::FirstOfType => {
            let tag = tree.tag_name(node);
            prev_element_siblings(tree, node).all(|s| tree.tag_name(s) != tag)
        }
        PseudoClass::LastOfType => {
            let tag = tree.tag_name(node);
            let mut cur = next_element_sibling(tree, node);
            while let Some(s) = cur {
                if tree.tag_name(s) == tag {
                    return false;
                }
                cur = next_element_sibling(tree, s);
            }
            true
        }
        PseudoClass::NthChild(expr) => expr.matches(position().0),
        PseudoClass::NthLastChild(expr) => {
            let (index, siblings) = position();
            expr.matches(siblings.len() as i32 - index + 1)
        }
        PseudoClass::Not(list) => !list.matches(tree, node),
        PseudoClass::Is(list) => list.matches(tree, node),
        PseudoClass::Has(list) => list.selectors.iter().any(|s| s.matches_relative(tree, node)),
    }
}

fn related(tree: &DomTree, combinator: Combinator, anchor: NodeId, node: NodeId) -> bool {
    match combinator {
        Combinator::Descendant => tree.is_ancestor_of(anchor, node),
        Combinator::Child => tree.parent(node) == Some(anchor),
        Combinator::NextSibling => prev_element_sibling(tree, node) == Some(anchor),
        Combinator::SubsequentSibling => prev_element_siblings(tree, node).any(|s| s == anchor),
    }
}

fn element_parent(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    tree.parent(node).filter(|&p| tree.is_element(p))
}

fn element_ancestors(tree: &DomTree, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    tree.ancestors(node).filter(move |&a| tree.is_element(a))
}

fn prev_element_sibling(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    prev_element_siblings(tree, node).next()
}

fn prev_element_siblings(tree: &DomTree, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(tree.prev_sibling(node), move |&n| tree.prev_sibling(n))
        .filter(move |&n| tree.is_element(n))
}

fn next_element_sibling(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    std::iter::successors(tree.next_sibling(node), |&n| tree.next_sibling(n)).find(|&n| tree.is_element(n))
}
