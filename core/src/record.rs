//! Mounted-tree records.
//!
//! Every live position of a rendered tree has exactly one record. Records sit
//! in a generational arena owned by the runtime; a [`RecordId`] whose record
//! has been destroyed never resolves again, even if its slot is reused.
//!
//! Host nodes do not point back at their records. The [`Tree`] keeps side
//! tables instead: host node → record for text and element positions, and
//! container → root record for every render root.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use std::collections::HashMap;

use crate::host::HostNode;
use crate::instance::Instance;
use crate::node::Node;
use crate::value::{Callback, Props, Str};

/// Identifier of a mounted-tree record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    index: u32,
    generation: u32,
}

/// What a record stands for.
#[derive(Debug)]
pub(crate) enum RecordKind {
    Text,
    Element,
    Component(Rc<Instance>),
}

/// Runtime bookkeeping for one tree position.
#[derive(Debug)]
pub(crate) struct Record {
    pub kind: RecordKind,
    /// Host node owned by text and element positions.
    pub node: Option<HostNode>,
    /// The descriptor this position was last reconciled against.
    pub descriptor: Node,
    /// Attributes last applied to the host, without listeners.
    pub attributes: Props,
    /// Current handler per event name.
    pub listeners: BTreeMap<Str, Callback>,
    pub children: Vec<RecordId>,
    pub parent: Option<RecordId>,
    pub depth: usize,
}

impl Record {
    pub fn new(kind: RecordKind, descriptor: Node, parent: Option<RecordId>, depth: usize) -> Self {
        Self {
            kind,
            node: None,
            descriptor,
            attributes: Props::new(),
            listeners: BTreeMap::new(),
            children: Vec::new(),
            parent,
            depth,
        }
    }

    pub fn key(&self) -> Option<&Str> {
        self.descriptor.key_str()
    }

    pub const fn instance(&self) -> Option<&Rc<Instance>> {
        match &self.kind {
            RecordKind::Component(instance) => Some(instance),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    record: Option<Record>,
}

/// Arena of records plus the node and container side tables.
#[derive(Debug, Default)]
pub(crate) struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_node: HashMap<HostNode, RecordId>,
    roots: HashMap<HostNode, RecordId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: Record) -> RecordId {
        let node = record.node;
        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            RecordId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).expect("record count should fit in u32");
            self.slots.push(Slot {
                generation: 0,
                record: Some(record),
            });
            RecordId {
                index,
                generation: 0,
            }
        };
        if let Some(node) = node {
            self.by_node.insert(node, id);
        }
        id
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.record.as_ref()
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.record.as_mut()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    /// Takes a record out of the arena and forgets its host node.
    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        if let Some(node) = record.node {
            self.by_node.remove(&node);
        }
        Some(record)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.record.is_some()).count()
    }

    /// The record owning a host node.
    pub fn record_for(&self, node: HostNode) -> Option<RecordId> {
        self.by_node.get(&node).copied()
    }

    pub fn root(&self, container: HostNode) -> Option<RecordId> {
        self.roots.get(&container).copied()
    }

    pub fn set_root(&mut self, container: HostNode, id: RecordId) {
        self.roots.insert(container, id);
    }

    pub fn remove_root(&mut self, container: HostNode) -> Option<RecordId> {
        self.roots.remove(&container)
    }

    /// Host node rendered by a position. Component positions resolve through
    /// their single child.
    pub fn host_node(&self, mut id: RecordId) -> Option<HostNode> {
        loop {
            let record = self.get(id)?;
            if let Some(node) = record.node {
                return Some(node);
            }
            id = *record.children.first()?;
        }
    }
}
