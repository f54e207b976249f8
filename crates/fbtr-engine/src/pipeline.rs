//! Mutation pipeline
//!
//! Owns one observer over the document body. Every batch of records runs
//! the enabled rule tables over changed containers and sanitizes newly
//! added elements. A failing batch is logged and dropped; observation
//! continues with the next one.

use std::time::Instant;

use fbtr_css::{parse_selector, query_selector_all};
use fbtr_dom::{Document, MutationObserverInit, MutationRecord, MutationType, NodeId, ObserverId};

use crate::config::Config;
use crate::error::Result;
use crate::guard;
use crate::hide::Hider;
use crate::host::{HostChannel, OutboundMessage, StyleSlot};
use crate::rules::CompiledRuleTable;
use crate::sanitize::{Sanitizer, apply_event_blockers};

const FEED_HEADING_ID: &str = "newsFeedHeading";
const FEED_STREAM: &str = "div._4ikz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    /// Settings turned the engine off
    Disabled,
    /// No `<body>` yet; a bootstrap observer waits for it
    WaitingForRoot(ObserverId),
    Observing { root: NodeId, observer: ObserverId },
}

/// Counters for one pipeline's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub batches: usize,
    pub records: usize,
    pub failed_batches: usize,
    pub hidden: usize,
    pub links_cleaned: usize,
}

pub struct Pipeline {
    config: Config,
    tables: Vec<CompiledRuleTable>,
    hider: Hider,
    sanitizer: Sanitizer,
    channel: Box<dyn HostChannel>,
    style: StyleSlot,
    state: PipelineState,
    stats: PipelineStats,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state)
            .field("tables", &self.tables.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Pipeline {
    /// Compile rules and selectors for a page at `page_url`
    pub fn new(config: Config, page_url: &str, channel: Box<dyn HostChannel>) -> Result<Self> {
        let tables = config
            .enabled_tables()
            .into_iter()
            .map(|(name, table)| table.compile(name))
            .collect();
        let hider = Hider::new(config.settings.hide_method, &config.hide_rules.article_wrapper)?;
        let sanitizer = Sanitizer::new(&config, page_url)?;
        Ok(Self {
            config,
            tables,
            hider,
            sanitizer,
            channel,
            style: StyleSlot::new(),
            state: PipelineState::NotStarted,
            stats: PipelineStats::default(),
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Announce to the host and begin observing. Waits for `<body>` when
    /// the document has none yet. Calling it again does nothing.
    pub fn start(&mut self, doc: &mut Document) {
        if self.state != PipelineState::NotStarted {
            return;
        }
        self.channel.send(OutboundMessage::Activate {});
        if !self.config.settings.enabled {
            tracing::info!("Tracking removal disabled by settings");
            self.state = PipelineState::Disabled;
            return;
        }

        match doc.body() {
            Some(body) => self.run(doc, body),
            None => {
                let observer = doc.tree.create_observer();
                let (target, subtree) = match doc.document_element() {
                    Some(html) => (html, false),
                    None => (doc.tree.root(), true),
                };
                doc.tree.observe(
                    observer,
                    target,
                    MutationObserverInit {
                        child_list: true,
                        subtree,
                        ..Default::default()
                    },
                );
                tracing::debug!("Waiting for <body>");
                self.state = PipelineState::WaitingForRoot(observer);
            }
        }
        self.channel.send(OutboundMessage::Settings(self.config.settings.clone()));
    }

    /// Startup pass over `root`, then observe it
    fn run(&mut self, doc: &mut Document, root: NodeId) {
        if let Err(e) = self.startup_pass(doc, root) {
            tracing::warn!("Startup pass failed: {}", e);
        }

        let observer = doc.tree.create_observer();
        doc.tree.observe(
            observer,
            root,
            MutationObserverInit {
                child_list: true,
                subtree: true,
                attributes: self.config.settings.fix_links,
                attribute_filter: Some(vec!["href".to_string()]),
            },
        );
        self.state = PipelineState::Observing { root, observer };
        tracing::info!("Observing {} with {} rule tables", root, self.tables.len());
    }

    fn startup_pass(&mut self, doc: &mut Document, root: NodeId) -> Result<()> {
        for table in &self.tables {
            self.stats.hidden += self.hider.apply_content_rules(&mut doc.tree, root, table)?;
        }
        if self.config.settings.internal_refs {
            self.sanitizer.strip_refs(&mut doc.tree, root)?;
        }
        if self.config.settings.fix_links {
            let cleaned = self.sanitizer.remove_link_tracking(&mut doc.tree, root)?;
            self.stats.links_cleaned += cleaned;
            if cleaned > 0 {
                self.block_feed_streams(doc)?;
            }
        }
        Ok(())
    }

    /// Event blockers on every stream under the news-feed heading
    fn block_feed_streams(&self, doc: &mut Document) -> Result<()> {
        let Some(feed) = doc.get_element_by_id(FEED_HEADING_ID).and_then(|h| doc.tree.parent(h)) else {
            return Ok(());
        };
        let streams = parse_selector(FEED_STREAM)?;
        for stream in query_selector_all(&doc.tree, feed, &streams) {
            apply_event_blockers(&mut doc.tree, stream);
        }
        Ok(())
    }

    /// Deliver one batch of pending records. Returns the number of records
    /// handled; zero when nothing was pending.
    pub fn pump(&mut self, doc: &mut Document) -> usize {
        match self.state {
            PipelineState::WaitingForRoot(observer) => {
                let records = doc.tree.take_records(observer);
                if records.is_empty() {
                    return 0;
                }
                if let Some(body) = doc.body() {
                    doc.tree.disconnect(observer);
                    tracing::info!("<body> arrived, starting");
                    self.run(doc, body);
                }
                records.len()
            }
            PipelineState::Observing { observer, .. } => {
                let records = doc.tree.take_records(observer);
                if records.is_empty() {
                    return 0;
                }
                self.stats.batches += 1;
                self.stats.records += records.len();
                if let Err(e) = self.process_batch(doc, &records) {
                    self.stats.failed_batches += 1;
                    tracing::warn!("Abandoned batch of {} records: {}", records.len(), e);
                }
                records.len()
            }
            PipelineState::NotStarted | PipelineState::Disabled => 0,
        }
    }

    /// Pump until no records are pending or `max_batches` is reached.
    /// Returns the number of batches delivered.
    pub fn pump_until_idle(&mut self, doc: &mut Document, max_batches: usize) -> usize {
        let mut batches = 0;
        while batches < max_batches && self.pump(doc) > 0 {
            batches += 1;
        }
        batches
    }

    fn process_batch(&mut self, doc: &mut Document, records: &[MutationRecord]) -> Result<()> {
        for record in records {
            match record.mutation_type {
                MutationType::ChildList => self.handle_child_list(doc, record)?,
                MutationType::Attributes => self.handle_attribute(doc, record.target)?,
            }
        }
        Ok(())
    }

    fn handle_child_list(&mut self, doc: &mut Document, record: &MutationRecord) -> Result<()> {
        let target = record.target;
        let skipped = doc
            .tree
            .tag_name(target)
            .is_some_and(|tag| guard::SKIPPED_TAGS.contains(&tag));
        if skipped || !doc.tree.is_connected(target) {
            return Ok(());
        }

        for table in &self.tables {
            self.stats.hidden += self.hider.apply_content_rules(&mut doc.tree, target, table)?;
        }

        for &added in &record.added_nodes {
            if !doc.tree.is_connected(added) || !guard::is_dispatchable(&doc.tree, added) {
                continue;
            }
            if self.config.settings.fix_links {
                self.stats.links_cleaned += self.sanitizer.remove_link_tracking(&mut doc.tree, added)?;
            }
            if self.config.settings.internal_refs {
                self.sanitizer.strip_refs(&mut doc.tree, added)?;
            }
            guard::mark_processed(&mut doc.tree, added)?;
        }
        Ok(())
    }

    fn handle_attribute(&mut self, doc: &mut Document, target: NodeId) -> Result<()> {
        if !doc.tree.is_connected(target) {
            return Ok(());
        }
        if self.config.settings.fix_links {
            self.stats.links_cleaned += self.sanitizer.remove_link_tracking(&mut doc.tree, target)?;
        }
        if self.config.settings.internal_refs {
            self.sanitizer.strip_refs(&mut doc.tree, target)?;
        }
        Ok(())
    }

    /// Style text from the host. Ignored unless the pipeline is enabled.
    pub fn handle_message(&mut self, doc: &mut Document, style: Option<&str>, now: Instant) -> Result<()> {
        if matches!(self.state, PipelineState::NotStarted | PipelineState::Disabled) {
            return Ok(());
        }
        self.style.apply(doc, style, now)
    }

    /// Run timers that are due at `now`
    pub fn run_timers(&mut self, doc: &mut Document, now: Instant) -> Result<()> {
        self.style.run_due(doc, now)?;
        Ok(())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.style.next_deadline()
    }
}
