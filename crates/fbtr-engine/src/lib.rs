//! fbtr engine
//!
//! Live tracking removal for an observed document: hides sponsored and
//! suggested feed items, rewrites tracked links and deferred media, and
//! strips referral parameters from internal links.
//!
//! # Example
//! ```rust,ignore
//! use fbtr_engine::{Config, NullChannel, Pipeline};
//!
//! let mut doc = fbtr_html::HtmlParser::new().parse_with_url(html, url);
//! let mut pipeline = Pipeline::new(Config::default(), url, Box::new(NullChannel))?;
//! pipeline.start(&mut doc);
//! // ...mutate doc...
//! pipeline.pump(&mut doc);
//! ```

pub mod classify;
pub mod config;
mod error;
pub mod guard;
pub mod hide;
pub mod host;
pub mod pipeline;
pub mod rules;
pub mod sanitize;
pub mod text;

pub use classify::{Classifier, ElementKind, VideoPlaceholder};
pub use config::{Config, HideMethod, HideRules, Settings};
pub use error::{Error, Result};
pub use hide::Hider;
pub use host::{HostChannel, LogChannel, NullChannel, OutboundMessage, StyleSlot};
pub use pipeline::{Pipeline, PipelineState, PipelineStats};
pub use rules::{CompiledRuleTable, RuleEntry, RuleTable};
pub use sanitize::Sanitizer;

// Re-export sub-crates for hosts driving the tree directly
pub use fbtr_css as css;
pub use fbtr_dom as dom;
pub use fbtr_html as html;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
