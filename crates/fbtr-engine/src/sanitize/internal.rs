//! Internal reference stripping
//!
//! Links that stay on the site carry referral parameters (`fref`,
//! `__tn__`, ...) and hovercard hooks. Their destinations are fine; only
//! the parameters go.

use fbtr_css::query_selector_all;
use fbtr_dom::{DomTree, NodeId};
use url::{Position, Url};

use super::{Sanitizer, apply_event_blockers};
use crate::error::Result;
use crate::guard;

/// Query parameters used only for referral tracking. Bracketed variants
/// (`__cft__[0]`) match by their base name.
pub const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "fref",
    "hc_ref",
    "hc_location",
    "__tn__",
    "__xts__",
    "__cft__",
    "__md__",
    "__mref",
    "eid",
    "rc",
    "ref",
    "refid",
    "ref_component",
    "ref_page",
    "extragetparams",
    "ft_id",
    "source_ref",
    "comment_tracking",
    "dti",
    "app_id",
    "acontext",
    "ftentidentifier",
    "entry_point",
];

fn is_tracking_param(name: &str) -> bool {
    let base = name.split('[').next().unwrap_or(name);
    TRACKING_PARAMS.iter().any(|p| p.eq_ignore_ascii_case(base))
}

/// `value` with tracking parameters removed, resolved against `base`.
/// Path-relative input stays path-relative. Returns the input unchanged
/// when there is nothing to remove, and None when it does not parse.
pub fn clean_link_params(value: &str, base: &Url) -> Option<String> {
    let mut url = base.join(value).ok()?;
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let kept: Vec<&(String, String)> = pairs.iter().filter(|(k, _)| !is_tracking_param(k)).collect();
    if kept.len() == pairs.len() {
        return Some(value.to_string());
    }

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    if value.starts_with('/') && !value.starts_with("//") {
        Some(url[Position::BeforePath..].to_string())
    } else {
        Some(url.into())
    }
}

impl Sanitizer {
    /// Strip referral tracking from `node` and the anchors below it.
    /// Returns how many internal links were visited.
    pub fn strip_refs(&self, tree: &mut DomTree, node: NodeId) -> Result<usize> {
        let mut anchors = vec![node];
        anchors.extend(query_selector_all(tree, node, &self.anchor));

        let mut count = 0;
        for a in anchors {
            if self.strip_ref(tree, a)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn strip_ref(&self, tree: &mut DomTree, a: NodeId) -> Result<bool> {
        if !tree.has_tag(a, "a") {
            return Ok(false);
        }
        let Some(url) = tree.get_attribute(a, "href").and_then(|href| self.resolve(href).ok()) else {
            return Ok(false);
        };
        let host = url.host_str().unwrap_or("");
        if !self.domains.iter().any(|d| host.ends_with(d.as_str())) {
            return Ok(false);
        }

        if let Some(parent) = tree.parent(a) {
            apply_event_blockers(tree, parent);
        }
        tree.remove_attribute(a, "data-ft")?;

        let mut base = url.clone();
        base.set_query(None);
        base.set_fragment(None);

        clean_attribute(tree, a, "href", &base)?;
        clean_attribute(tree, a, "ajaxify", &base)?;
        if tree.dataset_get(a, "hovercard").is_some_and(|v| !v.is_empty()) {
            tree.dataset_remove(a, "hovercardReferrer")?;
            clean_attribute(tree, a, "data-hovercard", &base)?;
        }
        Ok(true)
    }
}

/// Rewrite one URL-valued attribute; writes only on change
fn clean_attribute(tree: &mut DomTree, a: NodeId, name: &str, base: &Url) -> Result<bool> {
    let Some(original) = tree.get_attribute(a, name).map(str::to_string) else {
        return Ok(false);
    };
    match clean_link_params(&original, base) {
        Some(cleaned) if cleaned != original => {
            tree.set_attribute(a, name, &cleaned)?;
            guard::apply_style(tree, a)?;
            tracing::debug!("Removed tracking parameters from {}: {}", name, original);
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://www.facebook.com/profile.php").unwrap()
    }

    #[test]
    fn test_clean_link_params() {
        assert_eq!(
            clean_link_params("/profile.php?id=4&fref=nf&__tn__=%2CdC-R", &base()).as_deref(),
            Some("/profile.php?id=4")
        );
        assert_eq!(
            clean_link_params("https://www.facebook.com/groups/1/?ref=bookmarks", &base()).as_deref(),
            Some("https://www.facebook.com/groups/1/")
        );
        assert_eq!(
            clean_link_params("/x?__cft__[0]=AZ&story=1", &base()).as_deref(),
            Some("/x?story=1")
        );
    }

    #[test]
    fn test_clean_link_params_unchanged() {
        assert_eq!(clean_link_params("/profile.php?id=4", &base()).as_deref(), Some("/profile.php?id=4"));
        assert_eq!(clean_link_params("#", &base()).as_deref(), Some("#"));
    }
}
