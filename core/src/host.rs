//! The real output tree the reconciler mutates.
//!
//! A [`Host`] owns concrete nodes (elements and text) and exposes the handful
//! of primitive mutations the reconciler needs. Normalizing attribute values
//! onto a concrete platform (styles, properties, event registration) is the
//! host's business; the reconciler only decides *what* changes.

use core::any::Any;
use core::fmt;

use crate::value::{Props, Value};

/// Identifier of a node owned by a [`Host`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNode(u32);

impl HostNode {
    /// Creates a [`HostNode`] from the raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index backing this identifier.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for HostNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive operations on the real output tree.
///
/// Every method that changes an attached tree counts as a mutation. Creating
/// or releasing detached nodes does not.
pub trait Host: Any {
    /// Creates a detached element.
    fn create_element(&mut self, tag: &str) -> HostNode;

    /// Creates a detached text node.
    fn create_text(&mut self, text: &str) -> HostNode;

    /// Replaces the content of a text node.
    fn set_text(&mut self, node: HostNode, text: &str);

    /// Sets or overwrites an attribute.
    fn set_attribute(&mut self, node: HostNode, name: &str, value: &Value);

    /// Removes an attribute.
    fn remove_attribute(&mut self, node: HostNode, name: &str);

    /// Subscribes the node to an event. Delivery goes through
    /// [`Runtime::dispatch`](crate::Runtime::dispatch), which resolves the
    /// current handler, so this is called once per event name.
    fn listen(&mut self, node: HostNode, event: &str);

    /// Drops an event subscription.
    fn unlisten(&mut self, node: HostNode, event: &str);

    /// Inserts `node` into `parent` before `before`, or appends it when
    /// `before` is `None`. An attached node is moved.
    fn insert_before(&mut self, parent: HostNode, node: HostNode, before: Option<HostNode>);

    /// Detaches a node from its parent.
    fn remove(&mut self, node: HostNode);

    /// Frees a detached node and everything below it.
    fn release(&mut self, node: HostNode);

    /// Returns the parent of a node.
    fn parent(&self, node: HostNode) -> Option<HostNode>;

    /// Returns the first child of a node.
    fn first_child(&self, node: HostNode) -> Option<HostNode>;

    /// Returns the next sibling of a node.
    fn next_sibling(&self, node: HostNode) -> Option<HostNode>;

    /// Returns the tag of an element node.
    ///
    /// Together with [`node_text`](Self::node_text) this lets
    /// [`Runtime::render_into`](crate::Runtime::render_into) adopt nodes that
    /// exist already. Hosts that keep the default never have nodes adopted.
    fn node_tag(&self, node: HostNode) -> Option<&str> {
        let _ = node;
        None
    }

    /// Returns the content of a text node.
    fn node_text(&self, node: HostNode) -> Option<&str> {
        let _ = node;
        None
    }

    /// Returns the attributes currently set on an element node.
    fn node_attributes(&self, node: HostNode) -> Props {
        let _ = node;
        Props::new()
    }

    /// Upcasts for downcasting to the concrete host.
    fn as_any(&self) -> &dyn Any;

    /// Upcasts for downcasting to the concrete host.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
