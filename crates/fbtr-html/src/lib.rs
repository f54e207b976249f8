//! fbtr HTML loader
//!
//! Builds `fbtr_dom` documents and fragments from markup using html5ever.

mod parser;

pub use fbtr_dom::Document;
pub use parser::HtmlParser;

/// Parse an HTML string into a document
pub fn parse(html: &str) -> Document {
    HtmlParser::new().parse(html)
}

/// Loader error
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("tree construction failed: {0}")]
    Dom(#[from] fbtr_dom::DomError),

    #[error("markup has no <body> to take a fragment from")]
    NoBody,
}
