//! fbtr CSS selectors
//!
//! Selector parsing and tree queries (`querySelectorAll`, `matches`,
//! `closest`) over an `fbtr_dom::DomTree`.

mod parser;
mod query;
mod selectors;

pub use query::{closest, matches, query_selector, query_selector_all, select_all_with_base};
pub use selectors::{
    AttributeMatcher, AttributeSelector, Combinator, ComplexSelector, CompoundSelector,
    NthExpression, PseudoClass, SelectorComponent, SelectorList,
};

/// Selector parsing error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector {selector:?} at offset {position}: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub position: usize,
    pub message: String,
}

/// Parse a comma-separated selector list
pub fn parse_selector(text: &str) -> Result<SelectorList, SelectorError> {
    parser::SelectorParser::new(text).parse_list()
}
