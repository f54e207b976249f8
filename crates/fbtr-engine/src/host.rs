//! Host messaging and the injected stylesheet
//!
//! The engine announces itself and its settings to the embedding host, and
//! the host may answer with style text. That text becomes the single rule
//! of one `<style>` element, inserted after a short delay.

use std::time::{Duration, Instant};

use fbtr_dom::{Document, NodeId};
use serde::Serialize;

use crate::config::Settings;
use crate::error::{Error, Result};

pub const STYLE_ELEMENT_ID: &str = "fbtr-style";
pub const STYLE_INSERT_DELAY: Duration = Duration::from_millis(50);

/// Messages sent to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// Empty ping; some hosts only activate their page action on it
    Activate {},
    Settings(Settings),
}

/// Fire-and-forget channel to the host
pub trait HostChannel {
    fn send(&mut self, message: OutboundMessage);
}

/// Drops everything
#[derive(Debug, Default)]
pub struct NullChannel;

impl HostChannel for NullChannel {
    fn send(&mut self, _message: OutboundMessage) {}
}

/// Writes each message to the log as JSON
#[derive(Debug, Default)]
pub struct LogChannel;

impl HostChannel for LogChannel {
    fn send(&mut self, message: OutboundMessage) {
        match serde_json::to_string(&message) {
            Ok(json) => tracing::info!("host <- {}", json),
            Err(e) => tracing::warn!("Unable to encode host message: {}", e),
        }
    }
}

#[derive(Debug)]
struct PendingRule {
    text: String,
    due: Instant,
}

/// The `<style id="fbtr-style">` element and its delayed rule
#[derive(Debug, Default)]
pub struct StyleSlot {
    element: Option<NodeId>,
    pending: Option<PendingRule>,
}

impl StyleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle style text from the host. Any current rule is cleared now;
    /// non-empty text is scheduled for insertion.
    pub fn apply(&mut self, doc: &mut Document, text: Option<&str>, now: Instant) -> Result<()> {
        let element = self.element(doc)?;
        if !doc.tree.text_content(element).is_empty() {
            doc.tree.set_text_content(element, "")?;
        }
        self.pending = text.filter(|t| !t.trim().is_empty()).map(|t| PendingRule {
            text: t.to_string(),
            due: now + STYLE_INSERT_DELAY,
        });
        Ok(())
    }

    /// Insert the pending rule once its delay has passed. Returns whether
    /// a rule was inserted.
    pub fn run_due(&mut self, doc: &mut Document, now: Instant) -> Result<bool> {
        let Some(pending) = self.pending.take_if(|p| p.due <= now) else {
            return Ok(false);
        };
        let element = self.element(doc)?;
        doc.tree.set_text_content(element, &pending.text)?;
        tracing::debug!("Inserted host style ({} bytes)", pending.text.len());
        Ok(true)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Find or create the style element in `<head>`
    fn element(&mut self, doc: &mut Document) -> Result<NodeId> {
        if let Some(element) = self.element.filter(|&e| doc.tree.is_connected(e)) {
            return Ok(element);
        }
        let element = match doc.get_element_by_id(STYLE_ELEMENT_ID) {
            Some(existing) => existing,
            None => {
                let head = doc.head().ok_or(Error::NoHead)?;
                let style = doc.tree.create_element_with_attrs("style", &[("id", STYLE_ELEMENT_ID)]);
                doc.tree.append_child(head, style)?;
                style
            }
        };
        self.element = Some(element);
        Ok(element)
    }
}
