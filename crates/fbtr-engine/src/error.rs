//! Engine errors
//!
//! Per-link URL problems never surface here; they are logged where they
//! happen. These variants are the ones that abort a batch.

use fbtr_dom::{DomError, NodeId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Selector(#[from] fbtr_css::SelectorError),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid page url {url:?}: {source}")]
    PageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("element {node} has malformed media data: {source}")]
    MediaData {
        node: NodeId,
        #[source]
        source: serde_json::Error,
    },

    #[error("element {node} has no media source")]
    MissingMediaSource { node: NodeId },

    #[error("element {node} has no descendant matching {selector:?}")]
    MissingElement { node: NodeId, selector: &'static str },

    #[error("document has no <head> for the style slot")]
    NoHead,
}
