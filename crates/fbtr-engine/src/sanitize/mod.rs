//! Link and media sanitizer
//!
//! Rewrites tracked outbound links, deferred media and internal references.
//! Each transform returns how many elements it changed and only writes when
//! a value actually differs, so running it twice changes nothing.

mod internal;
mod links;
mod media;

pub use internal::{TRACKING_PARAMS, clean_link_params};
pub use links::{ALLOWED_PROTOCOLS, TRACKING_ATTRIBUTES, remove_fbclid};
pub use media::build_video;

use fbtr_css::{SelectorList, parse_selector};
use fbtr_dom::{DomTree, Event, ListenerOptions, NodeId, listener};
use regex::Regex;
use url::Url;

use crate::classify::{Classifier, ElementKind, site_domain};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::guard::{SAFE_CLASS, STYLE_CLASS};

/// Events stopped when they come from a rewritten link
pub const BLOCKED_EVENTS: &[&str] = &["click", "mousedown", "mouseup", "mouseover", "focus"];
const BLOCKER_KEY: &str = "fbtr-event-blocker";

const FBCLID_LINK: &str = "a[href*='fbclid=' i]";
const FBCLID_FALLBACK: &str = r"(?i)((?:[?&]|%3F|%26)fbclid=.*?)($|[?&]|%3F|%26)";

#[derive(Debug, Clone)]
pub struct Sanitizer {
    page_url: Url,
    domains: Vec<String>,
    inline_videos: bool,
    classifier: Classifier,
    fbclid_link: SelectorList,
    fbclid_fallback: Regex,
    anchor: SelectorList,
    poster_image: SelectorList,
    gif_container: SelectorList,
    gif_preview: SelectorList,
    gif_controls: SelectorList,
}

impl Sanitizer {
    pub fn new(config: &Config, page_url: &str) -> Result<Self> {
        let page_url = Url::parse(page_url).map_err(|source| Error::PageUrl {
            url: page_url.to_string(),
            source,
        })?;
        let domain = site_domain(page_url.host_str().unwrap_or(""));
        tracing::debug!("Sanitizer for {} (site domain {:?})", page_url, domain);

        Ok(Self {
            classifier: Classifier::new(&domain)?,
            page_url,
            domains: config.domains.clone(),
            inline_videos: config.settings.inline_vids,
            fbclid_link: parse_selector(FBCLID_LINK)?,
            fbclid_fallback: Regex::new(FBCLID_FALLBACK)?,
            anchor: parse_selector("a")?,
            poster_image: parse_selector(".img,img")?,
            gif_container: parse_selector("div._2lhm")?,
            gif_preview: parse_selector("img.img")?,
            gif_controls: parse_selector("div._393-")?,
        })
    }

    /// Resolve `href` the way an anchor would against the page
    pub fn resolve(&self, href: &str) -> std::result::Result<Url, url::ParseError> {
        Url::options().base_url(Some(&self.page_url)).parse(href)
    }

    /// Rewrite tracked links and deferred media in `node`'s subtree, then
    /// strip tracking ids. Installs event blockers on `node` when anything
    /// changed.
    pub fn remove_link_tracking(&self, tree: &mut DomTree, node: NodeId) -> Result<usize> {
        let mut cleaned = 0;
        for (element, kind) in self.classifier.candidates(tree, node) {
            // An earlier rewrite may have replaced an ancestor.
            if element != node && !tree.is_ancestor_of(node, element) {
                continue;
            }
            let changed = match kind {
                ElementKind::ShimLink => self.fix_shim_link(tree, element)?,
                ElementKind::RedirectLink => self.fix_redirect_link(tree, element)?,
                ElementKind::DeferredVideo(placeholder) => self.fix_video(tree, element, placeholder)?,
                ElementKind::DeferredImage => self.fix_gif(tree, element)?,
                ElementKind::PlainElement => false,
            };
            if changed {
                cleaned += 1;
            }
        }
        cleaned += self.strip_tracking_ids(tree, node)?;

        if cleaned > 0 {
            apply_event_blockers(tree, node);
            tracing::debug!("Cleaned {} links under {}", cleaned, node);
        }
        Ok(cleaned)
    }
}

/// Install the capturing blocker set on `node`. Returns false when it was
/// already installed.
pub fn apply_event_blockers(tree: &mut DomTree, node: NodeId) -> bool {
    let mut installed = false;
    for event_type in BLOCKED_EVENTS {
        installed |= tree.add_event_listener(
            node,
            event_type,
            ListenerOptions::capture().keyed(BLOCKER_KEY),
            listener(block_rewritten_link_events),
        );
    }
    installed
}

/// Stop events whose target sits inside a rewritten link so page scripts
/// above never see them. Engine-built replacements keep their own handlers.
fn block_rewritten_link_events(tree: &mut DomTree, event: &mut Event) {
    for node in tree.ancestors_inclusive(event.target) {
        if tree.has_tag(node, "a") && tree.has_class(node, STYLE_CLASS) && !tree.has_class(node, SAFE_CLASS) {
            event.stop_immediate_propagation();
            event.stop_propagation();
            return;
        }
        if node == event.current_target {
            return;
        }
    }
}
