//! Engine configuration
//!
//! Three inputs, all JSON: the user's settings, the hide-rule tables and
//! the list of site domains whose links count as internal. Every part is
//! optional and falls back to defaults.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::RuleTable;

/// What happens to a matched wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HideMethod {
    /// Wrap in a labeled collapsible placeholder
    #[default]
    Collapse,
    /// Detach from the tree
    Remove,
}

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Master switch
    pub enabled: bool,
    pub hide_method: HideMethod,
    /// Apply the suggested-content table
    pub del_suggest: bool,
    /// Apply the sponsored-content table
    pub del_pixeled: bool,
    /// Also apply the experimental content table
    pub pending_rules: bool,
    /// Run the external-link sanitizer
    pub fix_links: bool,
    /// Replace deferred videos in place instead of on click
    pub inline_vids: bool,
    /// Strip tracking parameters from internal links
    pub internal_refs: bool,
    /// User-authored rules, see [`RuleTable::parse_user_rules`]
    pub user_rules: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            hide_method: HideMethod::Collapse,
            del_suggest: true,
            del_pixeled: true,
            pending_rules: false,
            fix_links: true,
            inline_vids: false,
            internal_refs: true,
            user_rules: String::new(),
        }
    }
}

/// Hide-rule tables shipped with the engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HideRules {
    /// Selector for the outermost element of one feed item
    pub article_wrapper: String,
    pub suggestions_smart: RuleTable,
    pub content: RuleTable,
    pub content_pending: RuleTable,
}

impl Default for HideRules {
    fn default() -> Self {
        Self {
            article_wrapper: "[data-testid=\"fbfeed_story\"], article, div[role=article]:not([aria-hidden=true])"
                .to_string(),
            suggestions_smart: RuleTable::default(),
            content: RuleTable::default(),
            content_pending: RuleTable::default(),
        }
    }
}

pub const DEFAULT_DOMAINS: &[&str] = &["facebook.com", "messenger.com", "facebookcorewwwi.onion"];

/// Full engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub hide_rules: HideRules,
    /// Hostname suffixes treated as the site itself
    pub domains: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            hide_rules: HideRules::default(),
            domains: DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl Config {
    /// Build a config from optional JSON documents
    pub fn from_json_parts(settings: Option<&str>, rules: Option<&str>, domains: Option<&str>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(json) = settings {
            config.settings = serde_json::from_str(json)?;
        }
        if let Some(json) = rules {
            config.hide_rules = serde_json::from_str(json)?;
        }
        if let Some(json) = domains {
            config.domains = serde_json::from_str(json)?;
        }
        tracing::debug!(
            "Loaded config: enabled={}, hide_method={:?}, {} domains",
            config.settings.enabled,
            config.settings.hide_method,
            config.domains.len()
        );
        Ok(config)
    }

    /// The rule tables the settings enable, in application order.
    /// User rules always apply and come first.
    pub fn enabled_tables(&self) -> Vec<(&'static str, RuleTable)> {
        let mut tables = Vec::new();
        if !self.settings.user_rules.trim().is_empty() {
            tables.push(("user", RuleTable::parse_user_rules(&self.settings.user_rules)));
        }
        if self.settings.del_suggest {
            tables.push(("suggestions", self.hide_rules.suggestions_smart.clone()));
        }
        if self.settings.del_pixeled {
            tables.push(("sponsored", self.hide_rules.content.clone()));
        }
        if self.settings.pending_rules {
            tables.push(("pending", self.hide_rules.content_pending.clone()));
        }
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_fill_missing_keys() {
        let s: Settings = serde_json::from_str(r#"{"hideMethod":"remove","inlineVids":true}"#).unwrap();
        assert_eq!(s.hide_method, HideMethod::Remove);
        assert!(s.inline_vids);
        assert!(s.enabled);
        assert!(s.fix_links);
    }

    #[test]
    fn test_from_json_parts_all_optional() {
        let config = Config::from_json_parts(None, None, None).unwrap();
        assert_eq!(config.domains.len(), DEFAULT_DOMAINS.len());
        assert!(config.hide_rules.content.is_empty());
    }

    #[test]
    fn test_rules_keep_table_order() {
        let rules = r#"{
            "article_wrapper": "div.story",
            "content": {"span.b": ["Sponsored"], "span.a": ["Promoted", "Gesponsert"]}
        }"#;
        let config = Config::from_json_parts(None, Some(rules), None).unwrap();
        assert_eq!(config.hide_rules.article_wrapper, "div.story");
        let selectors: Vec<_> = config.hide_rules.content.entries().iter().map(|e| e.selector.as_str()).collect();
        assert_eq!(selectors, vec!["span.b", "span.a"]);
    }

    #[test]
    fn test_enabled_tables_follow_settings() {
        let mut config = Config::default();
        config.settings.del_suggest = false;
        config.settings.pending_rules = true;
        config.settings.user_rules = "span.x => \"ad\"".to_string();
        let names: Vec<_> = config.enabled_tables().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["user", "sponsored", "pending"]);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = Config::from_json_parts(Some("{enabled"), None, None).unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
