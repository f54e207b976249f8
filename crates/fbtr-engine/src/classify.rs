//! Candidate classification
//!
//! Every element the sanitizer might rewrite is classified once and the
//! transform is picked from the variant.

use fbtr_css::{SelectorList, parse_selector, select_all_with_base};
use fbtr_dom::{DomTree, NodeId};

use crate::error::Result;
use crate::guard::SAFE_CLASS;

pub const SHIM_LINK: &str = "a[onclick^='LinkshimAsyncLink.referrer_log']";
pub const INLINE_VIDEO: &str = "div[data-sigil=inlineVideo]";
pub const VIDEO_REDIRECT: &str = "a[href^='/video_redirect/']";
pub const GIF_TRIGGER: &str = "div._5b-_";

/// Where a deferred video keeps its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoPlaceholder {
    /// `src` in the JSON `data-store` attribute
    DataStore,
    /// `src` query parameter of the anchor's href
    RedirectAnchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    ShimLink,
    RedirectLink,
    DeferredVideo(VideoPlaceholder),
    DeferredImage,
    PlainElement,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    shim: SelectorList,
    redirect: SelectorList,
    inline_video: SelectorList,
    video_redirect: SelectorList,
    gif: SelectorList,
    any: SelectorList,
}

impl Classifier {
    /// `site_domain` is the registrable part of the page host, e.g.
    /// `facebook.com`; redirect links are recognized by it.
    pub fn new(site_domain: &str) -> Result<Self> {
        let redirect = format!("a[href*='{site_domain}/l.php?']");
        let any = [SHIM_LINK, redirect.as_str(), INLINE_VIDEO, VIDEO_REDIRECT, GIF_TRIGGER].join(", ");
        Ok(Self {
            shim: parse_selector(SHIM_LINK)?,
            redirect: parse_selector(&redirect)?,
            inline_video: parse_selector(INLINE_VIDEO)?,
            video_redirect: parse_selector(VIDEO_REDIRECT)?,
            gif: parse_selector(GIF_TRIGGER)?,
            any: parse_selector(&any)?,
        })
    }

    pub fn classify(&self, tree: &DomTree, node: NodeId) -> ElementKind {
        if !tree.is_element(node) || inside_safe_subtree(tree, node) {
            return ElementKind::PlainElement;
        }
        if self.shim.matches(tree, node) {
            ElementKind::ShimLink
        } else if self.redirect.matches(tree, node) {
            ElementKind::RedirectLink
        } else if self.inline_video.matches(tree, node) {
            ElementKind::DeferredVideo(VideoPlaceholder::DataStore)
        } else if self.video_redirect.matches(tree, node) {
            ElementKind::DeferredVideo(VideoPlaceholder::RedirectAnchor)
        } else if self.gif.matches(tree, node) {
            ElementKind::DeferredImage
        } else {
            ElementKind::PlainElement
        }
    }

    /// Classified candidates in `root`'s subtree (inclusive), document order
    pub fn candidates(&self, tree: &DomTree, root: NodeId) -> Vec<(NodeId, ElementKind)> {
        select_all_with_base(tree, root, &self.any)
            .into_iter()
            .map(|node| (node, self.classify(tree, node)))
            .filter(|(_, kind)| *kind != ElementKind::PlainElement)
            .collect()
    }
}

/// Engine-built replacements and their content are never rewritten again
fn inside_safe_subtree(tree: &DomTree, node: NodeId) -> bool {
    tree.ancestors_inclusive(node).any(|n| tree.has_class(n, SAFE_CLASS))
}

/// Last two labels of a host name
pub fn site_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    labels[labels.len().saturating_sub(2)..].join(".")
}
