//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it into the arena tree.

use fbtr_dom::{Document, DomTree, NodeId};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::LoadError;

/// HTML5 parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Document {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a document URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Document {
        tracing::debug!("Parsing HTML document: {}", url);
        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut document = Document::empty(url);
        let tree = document.tree_mut();
        for child in dom.document.children.borrow().iter() {
            // A fresh document root accepts any converted subtree.
            if let Ok(Some(node)) = self.build(child, tree) {
                let _ = tree.append_child(NodeId::ROOT, node);
            }
        }

        tracing::debug!("Parsed {} nodes", document.tree().len());
        document
    }

    /// Parse `html` as body content and append each top-level node to
    /// `parent`, one insertion per node, the way a host script would.
    pub fn append_fragment(&self, tree: &mut DomTree, parent: NodeId, html: &str) -> Result<Vec<NodeId>, LoadError> {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        let body = find_body(&dom.document).ok_or(LoadError::NoBody)?;

        let mut added = Vec::new();
        for child in body.children.borrow().iter() {
            if let Some(node) = self.build(child, tree)? {
                tree.append_child(parent, node)?;
                added.push(node);
            }
        }
        Ok(added)
    }

    /// Convert one RcDom node (and its subtree) into a detached arena node
    fn build(&self, handle: &Handle, tree: &mut DomTree) -> Result<Option<NodeId>, LoadError> {
        let id = match &handle.data {
            RcNodeData::Doctype { name, .. } => return Ok(Some(tree.create_doctype(name))),
            // Whitespace-only runs are kept: they separate inline words.
            RcNodeData::Text { contents } => return Ok(Some(tree.create_text(&contents.borrow()))),
            RcNodeData::Comment { contents } => return Ok(Some(tree.create_comment(contents))),
            RcNodeData::Element { name, attrs, .. } => {
                let attrs = attrs.borrow();
                let pairs: Vec<(&str, &str)> = attrs
                    .iter()
                    .map(|a| (&*a.name.local, &*a.value))
                    .collect();
                tree.create_element_with_attrs(&name.local, &pairs)
            }
            RcNodeData::Document | RcNodeData::ProcessingInstruction { .. } => return Ok(None),
        };

        for child in handle.children.borrow().iter() {
            if let Some(node) = self.build(child, tree)? {
                tree.append_child(id, node)?;
            }
        }
        Ok(Some(id))
    }
}

fn find_body(document: &Handle) -> Option<Handle> {
    let children = document.children.borrow();
    let html = children.iter().find(|c| is_element(c, "html"))?;
    let html_children = html.children.borrow();
    html_children.iter().find(|c| is_element(c, "body")).cloned()
}

fn is_element(handle: &Handle, tag: &str) -> bool {
    matches!(&handle.data, RcNodeData::Element { name, .. } if &*name.local == tag)
}
