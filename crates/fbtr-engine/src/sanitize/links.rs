//! Outbound link rewriting

use fbtr_css::select_all_with_base;
use fbtr_dom::{DomTree, NodeId};
use regex::Regex;
use url::Url;

use super::Sanitizer;
use crate::error::Result;
use crate::guard;
use crate::text::{extract_quoted_string, unescape_backslashes};

/// Schemes a rewritten link may point at
pub const ALLOWED_PROTOCOLS: &[&str] = &["http", "https", "ftp"];

/// Attributes that carry click tracking or interception hooks
pub const TRACKING_ATTRIBUTES: &[&str] = &[
    "onclick",
    "onmouseover",
    "onmousedown",
    "data-lynx-mode",
    "data-lynx-uri",
    "data-ft",
    "data-store",
    "data-sigil",
    "ajaxify",
    "data-hovercard",
    "data-hovercard-referrer",
    "data-gt",
];

impl Sanitizer {
    /// Point `a` straight at `href` and drop its tracking hooks.
    ///
    /// Nothing is modified unless `href` resolves to an allowed protocol.
    pub(crate) fn clean_link(&self, tree: &mut DomTree, a: NodeId, href: &str) -> Result<bool> {
        let url = match self.resolve(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Link cleaning encountered an invalid url {:?}: {}", href, e);
                return Ok(false);
            }
        };
        if !ALLOWED_PROTOCOLS.contains(&url.scheme()) {
            tracing::warn!("Refusing to rewrite link to unsupported protocol {:?}: {}", url.scheme(), href);
            return Ok(false);
        }

        strip_tracking_attributes(tree, a)?;
        set_if_changed(tree, a, "target", "_blank")?;
        set_if_changed(tree, a, "rel", "noreferrer noopener")?;
        set_if_changed(tree, a, "href", href)?;
        guard::apply_style(tree, a)?;
        tracing::debug!("Cleaned link to {}", href);
        Ok(true)
    }

    /// `onclick="LinkshimAsyncLink.referrer_log(...)"` links keep their real
    /// destination in the `onmouseover` handler's first string argument.
    pub(crate) fn fix_shim_link(&self, tree: &mut DomTree, a: NodeId) -> Result<bool> {
        let destination = tree
            .get_attribute(a, "onmouseover")
            .and_then(extract_quoted_string)
            .map(unescape_backslashes);
        match destination {
            Some(destination) => self.clean_link(tree, a, &destination),
            None => {
                tracing::warn!("Shim link {} has no destination", a);
                Ok(false)
            }
        }
    }

    /// `/l.php?u=<destination>` redirect links
    pub(crate) fn fix_redirect_link(&self, tree: &mut DomTree, a: NodeId) -> Result<bool> {
        let Some(href) = tree.get_attribute(a, "href") else {
            return Ok(false);
        };
        let destination = match self.resolve(href) {
            Ok(url) => query_param(&url, "u"),
            Err(e) => {
                tracing::warn!("Redirect link has an invalid url {:?}: {}", href, e);
                return Ok(false);
            }
        };
        match destination {
            Some(destination) => self.clean_link(tree, a, &destination),
            None => {
                tracing::warn!("Redirect link {} has no destination parameter", a);
                Ok(false)
            }
        }
    }

    /// Remove `fbclid` from every link under `node` (inclusive)
    pub(crate) fn strip_tracking_ids(&self, tree: &mut DomTree, node: NodeId) -> Result<usize> {
        let mut stripped = 0;
        for a in select_all_with_base(tree, node, &self.fbclid_link) {
            let Some(href) = tree.get_attribute(a, "href").map(str::to_string) else {
                continue;
            };
            let url = match self.resolve(&href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Tracking id removal encountered an invalid url {:?}: {}", href, e);
                    continue;
                }
            };
            match remove_fbclid(&url, &self.fbclid_fallback) {
                Some(cleaned) => {
                    tree.set_attribute(a, "href", &cleaned)?;
                    guard::apply_style(tree, a)?;
                    stripped += 1;
                    tracing::debug!("Removed fbclid from {}", href);
                }
                None => tracing::warn!("Unable to remove fbclid from {}", href),
            }
        }
        Ok(stripped)
    }
}

/// `url` without its `fbclid` parameter, or None when it could not be
/// removed. Structured query editing comes first; the pattern handles ids
/// buried in encoded or malformed parts.
pub fn remove_fbclid(url: &Url, fallback: &Regex) -> Option<String> {
    let original = url.as_str();

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let kept: Vec<&(String, String)> = pairs.iter().filter(|(k, _)| !k.eq_ignore_ascii_case("fbclid")).collect();
    if kept.len() != pairs.len() {
        let mut edited = url.clone();
        if kept.is_empty() {
            edited.set_query(None);
        } else {
            edited.query_pairs_mut().clear().extend_pairs(kept);
        }
        if edited.as_str() != original {
            return Some(edited.into());
        }
    }

    let replaced = fallback.replace_all(original, "$2");
    if replaced == original {
        return None;
    }
    Some(replaced.strip_suffix('?').unwrap_or(&*replaced).to_string())
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
}

pub(super) fn strip_tracking_attributes(tree: &mut DomTree, a: NodeId) -> Result<()> {
    for attr in TRACKING_ATTRIBUTES {
        tree.remove_attribute(a, attr)?;
    }
    Ok(())
}

fn set_if_changed(tree: &mut DomTree, node: NodeId, name: &str, value: &str) -> Result<()> {
    if tree.get_attribute(node, name) != Some(value) {
        tree.set_attribute(node, name, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fallback() -> Regex {
        Regex::new(super::super::FBCLID_FALLBACK).unwrap()
    }

    fn strip(s: &str) -> Option<String> {
        remove_fbclid(&Url::parse(s).unwrap(), &fallback())
    }

    #[test]
    fn test_remove_fbclid_structured() {
        assert_eq!(strip("https://example.com/x?a=1&fbclid=XYZ&b=2").as_deref(), Some("https://example.com/x?a=1&b=2"));
        assert_eq!(strip("https://example.com/x?fbclid=XYZ").as_deref(), Some("https://example.com/x"));
        assert_eq!(strip("https://example.com/x?FBCLID=XYZ#top").as_deref(), Some("https://example.com/x#top"));
    }

    #[test]
    fn test_remove_fbclid_fallback() {
        assert_eq!(
            strip("https://example.com/redirect?next=/page%3Ffbclid=ABC").as_deref(),
            Some("https://example.com/redirect?next=/page")
        );
        assert_eq!(strip("https://example.com/#/feed?fbclid=1").as_deref(), Some("https://example.com/#/feed"));
    }

    #[test]
    fn test_remove_fbclid_gives_up() {
        assert_eq!(strip("https://example.com/xfbclid=1"), None);
        assert_eq!(strip("https://example.com/x?a=1"), None);
    }
}
