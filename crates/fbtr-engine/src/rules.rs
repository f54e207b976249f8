//! Hide-rule tables
//!
//! A table maps selectors to the set of visible texts that mark a match.
//! An empty text set makes the rule structural: any element matching the
//! selector counts. Tables keep their source order.

use std::collections::HashSet;
use std::fmt;

use fbtr_css::SelectorList;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::text::normalize_string;

/// One selector and its trigger texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    pub selector: String,
    /// Normalized trigger texts; empty means structural
    pub texts: Vec<String>,
}

/// Ordered selector table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    entries: Vec<RuleEntry>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Texts are normalized here, once.
    pub fn push<I, S>(&mut self, selector: &str, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for text in texts {
            let text = normalize_string(text.as_ref());
            if !text.is_empty() && !normalized.contains(&text) {
                normalized.push(text);
            }
        }
        self.entries.push(RuleEntry {
            selector: selector.trim().to_string(),
            texts: normalized,
        });
    }

    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the user's free-form rule text.
    ///
    /// ```text
    /// # comment
    /// // comment
    /// div[data-pagelet=Stories]
    /// span.label => "Sponsored", "Promoted"
    /// ```
    pub fn parse_user_rules(text: &str) -> Self {
        let mut table = Self::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") || is_hash_comment(line) {
                continue;
            }
            match line.split_once("=>") {
                Some((selector, texts)) => {
                    let texts = split_quoted_list(texts);
                    if texts.is_empty() {
                        tracing::warn!("User rule on line {} has no quoted texts: {}", number + 1, line);
                        continue;
                    }
                    table.push(selector, texts);
                }
                None => table.push(line, std::iter::empty::<&str>()),
            }
        }
        table
    }

    /// Parse every selector. Invalid selectors are logged and dropped so one
    /// bad rule does not disable the table.
    pub fn compile(&self, name: &str) -> CompiledRuleTable {
        let mut rules = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match fbtr_css::parse_selector(&entry.selector) {
                Ok(selector) => rules.push(CompiledRule {
                    selector,
                    texts: entry.texts.iter().cloned().collect(),
                }),
                Err(e) => tracing::warn!("Dropping rule from {} table: {}", name, e),
            }
        }
        CompiledRuleTable {
            name: name.to_string(),
            rules,
        }
    }
}

fn is_hash_comment(line: &str) -> bool {
    line.split_whitespace().next() == Some("#")
}

/// `"a", 'b' , "c"` into its unquoted items
fn split_quoted_list(s: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '"' && c != '\'' {
            continue;
        }
        let mut item = String::new();
        while let Some(next) = chars.next() {
            match next {
                '\\' => item.extend(chars.next()),
                q if q == c => break,
                other => item.push(other),
            }
        }
        items.push(item);
    }
    items
}

impl<'de> Deserialize<'de> for RuleTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RuleTableVisitor)
    }
}

struct RuleTableVisitor;

/// A rule's texts: a list, or a single string
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RuleTexts {
    One(String),
    Many(Vec<String>),
}

impl<'de> Visitor<'de> for RuleTableVisitor {
    type Value = RuleTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of selectors to trigger texts")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut table = RuleTable::new();
        while let Some((selector, texts)) = map.next_entry::<String, RuleTexts>()? {
            match texts {
                RuleTexts::One(text) => table.push(&selector, [text]),
                RuleTexts::Many(texts) => table.push(&selector, texts),
            }
        }
        Ok(table)
    }
}

/// Rule with its selector parsed
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub selector: SelectorList,
    pub texts: HashSet<String>,
}

impl CompiledRule {
    pub fn is_structural(&self) -> bool {
        self.texts.is_empty()
    }
}

/// A table ready to run against a tree
#[derive(Debug, Clone)]
pub struct CompiledRuleTable {
    pub name: String,
    pub rules: Vec<CompiledRule>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_normalizes_and_dedupes() {
        let mut table = RuleTable::new();
        table.push(" span.x ", ["Sponsorisé", "  SPONSORISE ", ""]);
        assert_eq!(
            table.entries(),
            &[RuleEntry {
                selector: "span.x".to_string(),
                texts: vec!["sponsorise".to_string()],
            }]
        );
    }

    #[test]
    fn test_parse_user_rules() {
        let text = r#"
            # hide stories
            // and reels
            #stories_tray
            div[data-pagelet=Reels]
            span.label => "Sponsored", 'Promoted'
            a.broken =>
        "#;
        let table = RuleTable::parse_user_rules(text);
        let selectors: Vec<_> = table.entries().iter().map(|e| e.selector.as_str()).collect();
        assert_eq!(selectors, vec!["#stories_tray", "div[data-pagelet=Reels]", "span.label"]);
        assert_eq!(table.entries()[2].texts, vec!["sponsored", "promoted"]);
        assert!(table.entries()[0].texts.is_empty());
    }

    #[test]
    fn test_compile_drops_invalid_selectors() {
        let mut table = RuleTable::new();
        table.push("div >", ["x"]);
        table.push("span.ok", ["x"]);
        let compiled = table.compile("test");
        assert_eq!(compiled.rules.len(), 1);
        assert_eq!(compiled.rules[0].selector.text, "span.ok");
    }

    #[test]
    fn test_deserialize_single_string() {
        let table: RuleTable = serde_json::from_str(r#"{"b.x": "Ad", "i.y": []}"#).unwrap();
        assert_eq!(table.entries()[0].texts, vec!["ad"]);
        assert!(table.entries()[1].texts.is_empty());
    }
}
