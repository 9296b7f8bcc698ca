//! In-memory [`Host`] implementation.
//!
//! [`Document`] stores elements and text nodes in an arena and records every
//! mutation applied to it. It is the default target for headless rendering
//! and what the test-suite uses to assert that the reconciler touches exactly
//! the nodes it has to.

use alloc::collections::{BTreeMap, BTreeSet};
use core::any::Any;
use core::fmt::Write as _;

use crate::host::{Host, HostNode};
use crate::value::{Props, Value};

/// A single recorded change to the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// A text node's content changed.
    SetText {
        /// The text node.
        node: HostNode,
    },
    /// An attribute was set or overwritten.
    SetAttribute {
        /// The element.
        node: HostNode,
        /// The attribute name.
        name: String,
    },
    /// An attribute was removed.
    RemoveAttribute {
        /// The element.
        node: HostNode,
        /// The attribute name.
        name: String,
    },
    /// An event subscription was added.
    Listen {
        /// The element.
        node: HostNode,
        /// The event name.
        event: String,
    },
    /// An event subscription was dropped.
    Unlisten {
        /// The element.
        node: HostNode,
        /// The event name.
        event: String,
    },
    /// A node was inserted or moved.
    Insert {
        /// The new parent.
        parent: HostNode,
        /// The inserted node.
        node: HostNode,
    },
    /// A node was detached.
    Remove {
        /// The detached node.
        node: HostNode,
    },
}

#[derive(Debug)]
enum NodeData {
    Element(String),
    Text(String),
}

#[derive(Debug)]
struct Entry {
    data: NodeData,
    parent: Option<HostNode>,
    children: Vec<HostNode>,
    attributes: BTreeMap<String, Value>,
    listeners: BTreeSet<String>,
}

impl Entry {
    const fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            listeners: BTreeSet::new(),
        }
    }
}

/// Arena-backed document tree with a mutation log.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Option<Entry>>,
    free: Vec<u32>,
    log: Vec<Mutation>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Creates a detached `div` to render into.
    pub fn create_container(&mut self) -> HostNode {
        self.push(Entry::new(NodeData::Element("div".to_string())))
    }

    /// Returns `true` if the node exists (attached or not).
    #[must_use]
    pub fn contains(&self, node: HostNode) -> bool {
        self.entry(node).is_some()
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|entry| entry.is_some()).count()
    }

    /// Returns `true` if the document holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the tag of an element.
    #[must_use]
    pub fn tag(&self, node: HostNode) -> Option<&str> {
        match &self.entry(node)?.data {
            NodeData::Element(tag) => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    /// Returns the content of a text node.
    #[must_use]
    pub fn text(&self, node: HostNode) -> Option<&str> {
        match &self.entry(node)?.data {
            NodeData::Text(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }

    /// Returns the children of a node.
    #[must_use]
    pub fn children(&self, node: HostNode) -> &[HostNode] {
        self.entry(node)
            .map_or(&[], |entry| entry.children.as_slice())
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, node: HostNode, name: &str) -> Option<&Value> {
        self.entry(node)?.attributes.get(name)
    }

    /// Returns `true` if the node is subscribed to `event`.
    #[must_use]
    pub fn has_listener(&self, node: HostNode, event: &str) -> bool {
        self.entry(node)
            .is_some_and(|entry| entry.listeners.contains(event))
    }

    /// Concatenated text of a node and its descendants.
    #[must_use]
    pub fn text_content(&self, node: HostNode) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    /// Serializes the children of a node as HTML.
    #[must_use]
    pub fn inner_html(&self, node: HostNode) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    /// Serializes a node and its descendants as HTML.
    #[must_use]
    pub fn outer_html(&self, node: HostNode) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Mutations recorded since the last [`take_mutations`](Self::take_mutations).
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    /// Drains the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        core::mem::take(&mut self.log)
    }

    fn entry(&self, node: HostNode) -> Option<&Entry> {
        self.nodes.get(node.index() as usize)?.as_ref()
    }

    fn entry_mut(&mut self, node: HostNode) -> Option<&mut Entry> {
        self.nodes.get_mut(node.index() as usize)?.as_mut()
    }

    fn push(&mut self, entry: Entry) -> HostNode {
        if let Some(index) = self.free.pop() {
            self.nodes[index as usize] = Some(entry);
            return HostNode::new(index);
        }
        let index = u32::try_from(self.nodes.len()).expect("document node count should fit in u32");
        self.nodes.push(Some(entry));
        HostNode::new(index)
    }

    /// Unlinks a node from its parent, returning `true` if it was attached.
    fn detach(&mut self, node: HostNode) -> bool {
        let Some(parent) = self.entry_mut(node).and_then(|entry| entry.parent.take()) else {
            return false;
        };
        if let Some(parent) = self.entry_mut(parent) {
            parent.children.retain(|&child| child != node);
        }
        true
    }

    fn collect_text(&self, node: HostNode, out: &mut String) {
        let Some(entry) = self.entry(node) else {
            return;
        };
        match &entry.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) => {
                for &child in &entry.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    fn write_html(&self, node: HostNode, out: &mut String) {
        let Some(entry) = self.entry(node) else {
            return;
        };
        match &entry.data {
            NodeData::Text(text) => escape_into(text, out),
            NodeData::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &entry.attributes {
                    let _ = write!(out, " {name}=\"");
                    escape_into(&value.to_string(), out);
                    out.push('"');
                }
                out.push('>');
                for &child in &entry.children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

impl Host for Document {
    fn create_element(&mut self, tag: &str) -> HostNode {
        self.push(Entry::new(NodeData::Element(tag.to_string())))
    }

    fn create_text(&mut self, text: &str) -> HostNode {
        self.push(Entry::new(NodeData::Text(text.to_string())))
    }

    fn set_text(&mut self, node: HostNode, text: &str) {
        if let Some(entry) = self.entry_mut(node) {
            entry.data = NodeData::Text(text.to_string());
            self.log.push(Mutation::SetText { node });
        }
    }

    fn set_attribute(&mut self, node: HostNode, name: &str, value: &Value) {
        if let Some(entry) = self.entry_mut(node) {
            entry.attributes.insert(name.to_string(), value.clone());
            self.log.push(Mutation::SetAttribute {
                node,
                name: name.to_string(),
            });
        }
    }

    fn remove_attribute(&mut self, node: HostNode, name: &str) {
        if let Some(entry) = self.entry_mut(node)
            && entry.attributes.remove(name).is_some()
        {
            self.log.push(Mutation::RemoveAttribute {
                node,
                name: name.to_string(),
            });
        }
    }

    fn listen(&mut self, node: HostNode, event: &str) {
        if let Some(entry) = self.entry_mut(node)
            && entry.listeners.insert(event.to_string())
        {
            self.log.push(Mutation::Listen {
                node,
                event: event.to_string(),
            });
        }
    }

    fn unlisten(&mut self, node: HostNode, event: &str) {
        if let Some(entry) = self.entry_mut(node)
            && entry.listeners.remove(event)
        {
            self.log.push(Mutation::Unlisten {
                node,
                event: event.to_string(),
            });
        }
    }

    fn insert_before(&mut self, parent: HostNode, node: HostNode, before: Option<HostNode>) {
        if !self.contains(parent) || !self.contains(node) {
            return;
        }
        self.detach(node);
        let Some(entry) = self.entry_mut(parent) else {
            return;
        };
        let index = before
            .and_then(|before| entry.children.iter().position(|&child| child == before))
            .unwrap_or(entry.children.len());
        entry.children.insert(index, node);
        if let Some(entry) = self.entry_mut(node) {
            entry.parent = Some(parent);
        }
        self.log.push(Mutation::Insert { parent, node });
    }

    fn remove(&mut self, node: HostNode) {
        if self.detach(node) {
            self.log.push(Mutation::Remove { node });
        }
    }

    fn release(&mut self, node: HostNode) {
        self.detach(node);
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(entry) = self
                .nodes
                .get_mut(current.index() as usize)
                .and_then(Option::take)
            {
                stack.extend(entry.children);
                self.free.push(current.index());
            }
        }
    }

    fn parent(&self, node: HostNode) -> Option<HostNode> {
        self.entry(node)?.parent
    }

    fn first_child(&self, node: HostNode) -> Option<HostNode> {
        self.entry(node)?.children.first().copied()
    }

    fn next_sibling(&self, node: HostNode) -> Option<HostNode> {
        let parent = self.entry(node)?.parent?;
        let siblings = &self.entry(parent)?.children;
        let index = siblings.iter().position(|&child| child == node)?;
        siblings.get(index + 1).copied()
    }

    fn node_tag(&self, node: HostNode) -> Option<&str> {
        self.tag(node)
    }

    fn node_text(&self, node: HostNode) -> Option<&str> {
        self.text(node)
    }

    fn node_attributes(&self, node: HostNode) -> Props {
        self.entry(node).map_or_else(Props::new, |entry| {
            entry
                .attributes
                .iter()
                .map(|(name, value)| (name.as_str(), value.clone()))
                .collect()
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
