//! Immutable node descriptors.
//!
//! A [`Node`] describes what one position of the UI should look like: a text
//! leaf, an intrinsic element with attributes and children, or a component
//! with props. Descriptors are reference counted and never mutated after
//! construction, so cloning one is cheap and a descriptor can be shared
//! between renders.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use crate::component::{ComponentType, Construct};
use crate::host::HostNode;
use crate::value::{Callback, Context, Event, Props, Str, Value};

/// What a descriptor renders.
#[derive(Clone, PartialEq)]
pub enum NodeKind {
    /// A text leaf.
    Text(Str),
    /// An intrinsic element, identified by its tag.
    Element(Str),
    /// A component, identified by its type.
    Component(ComponentType),
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "Text({text:?})"),
            Self::Element(tag) => write!(f, "Element({tag})"),
            Self::Component(ty) => write!(f, "Component({})", ty.name()),
        }
    }
}

#[derive(Clone)]
struct NodeData {
    kind: NodeKind,
    attributes: Props,
    children: Vec<Node>,
    key: Option<Str>,
    node_ref: Option<NodeRef>,
}

/// An immutable UI descriptor.
///
/// Builder methods consume and return the node; they only copy the
/// underlying data when the descriptor is shared.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeData>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            inner: Rc::new(NodeData {
                kind,
                attributes: Props::new(),
                children: Vec::new(),
                key: None,
                node_ref: None,
            }),
        }
    }

    /// Creates a text leaf.
    pub fn text(text: impl Into<Str>) -> Self {
        Self::new(NodeKind::Text(text.into()))
    }

    /// Creates an empty text leaf, the rendering of "nothing".
    #[must_use]
    pub fn empty() -> Self {
        Self::text("")
    }

    /// Creates an intrinsic element.
    pub fn element(tag: impl Into<Str>) -> Self {
        Self::new(NodeKind::Element(tag.into()))
    }

    /// Creates a descriptor for the component type `C`.
    #[must_use]
    pub fn component<C: Construct>() -> Self {
        Self::new(NodeKind::Component(ComponentType::of::<C>()))
    }

    /// Creates a descriptor for a function component.
    ///
    /// Two descriptors built from the same function are of the same type.
    #[must_use]
    pub fn function(name: &'static str, render: fn(&Props, &Context) -> Self) -> Self {
        Self::new(NodeKind::Component(ComponentType::function(name, render)))
    }

    /// Creates a descriptor for an already resolved component type.
    #[must_use]
    pub fn from_type(ty: ComponentType) -> Self {
        Self::new(NodeKind::Component(ty))
    }

    fn data_mut(&mut self) -> &mut NodeData {
        Rc::make_mut(&mut self.inner)
    }

    /// Sets an attribute (or prop, for components).
    ///
    /// The reserved name `key` sets the identity key instead.
    #[must_use]
    pub fn attr(mut self, name: impl Into<Str>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        if &*name == "key" {
            self.data_mut().key = Some(Str::from(value.to_string()));
        } else {
            self.data_mut().attributes.insert(name, value);
        }
        self
    }

    /// Merges a whole bag of attributes.
    #[must_use]
    pub fn attrs(mut self, attributes: &Props) -> Self {
        for (name, value) in attributes {
            self = self.attr(name.clone(), value.clone());
        }
        self
    }

    /// Attaches an event handler, stored as the `on<event>` attribute.
    #[must_use]
    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.attr(format!("on{event}"), Callback::new(handler))
    }

    /// Sets the identity key used to match children across renders.
    #[must_use]
    pub fn key(mut self, key: impl Into<Str>) -> Self {
        self.data_mut().key = Some(key.into());
        self
    }

    /// Binds a [`NodeRef`] that receives the host node once mounted. On a
    /// component it follows the host node the component renders to.
    #[must_use]
    pub fn node_ref(mut self, node_ref: &NodeRef) -> Self {
        self.data_mut().node_ref = Some(node_ref.clone());
        self
    }

    /// Appends children. `None` and booleans are skipped, vectors flattened.
    #[must_use]
    pub fn child(mut self, child: impl IntoChildren) -> Self {
        child.push_into(&mut self.data_mut().children);
        self
    }

    /// Appends every item of an iterator as children.
    #[must_use]
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoChildren,
    {
        let data = self.data_mut();
        for child in children {
            child.push_into(&mut data.children);
        }
        self
    }

    /// What this descriptor renders.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.inner.kind
    }

    /// Returns `true` for text leaves.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.inner.kind, NodeKind::Text(_))
    }

    /// The content of a text leaf.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.inner.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The tag of an element.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match &self.inner.kind {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    /// The type of a component descriptor.
    #[must_use]
    pub fn component_type(&self) -> Option<&ComponentType> {
        match &self.inner.kind {
            NodeKind::Component(ty) => Some(ty),
            _ => None,
        }
    }

    /// Attributes, without the identity key.
    #[must_use]
    pub fn attributes(&self) -> &Props {
        &self.inner.attributes
    }

    /// Children in order.
    #[must_use]
    pub fn child_nodes(&self) -> &[Self] {
        &self.inner.children
    }

    /// The identity key, if any.
    #[must_use]
    pub fn key_str(&self) -> Option<&Str> {
        self.inner.key.as_ref()
    }

    /// The bound [`NodeRef`], if any.
    #[must_use]
    pub fn get_node_ref(&self) -> Option<&NodeRef> {
        self.inner.node_ref.as_ref()
    }

    /// Returns `true` if both handles point to the same descriptor.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Two descriptors are of the same type if both are text leaves, both are
    /// elements with the same tag (ASCII case-insensitive), or both are the
    /// same component type.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        match (&self.inner.kind, &other.inner.kind) {
            (NodeKind::Text(_), NodeKind::Text(_)) => true,
            (NodeKind::Element(a), NodeKind::Element(b)) => a.eq_ignore_ascii_case(b),
            (NodeKind::Component(a), NodeKind::Component(b)) => a == b,
            _ => false,
        }
    }

    /// Props handed to a component: attributes, non-empty `children`, and the
    /// type's default props for every missing key.
    #[must_use]
    pub fn component_props(&self) -> Props {
        let mut props = self.inner.attributes.clone();
        if !self.inner.children.is_empty() {
            props.insert("children", self.inner.children.clone());
        }
        if let NodeKind::Component(ty) = &self.inner.kind {
            for (key, value) in &ty.default_props() {
                if !props.contains_key(key) {
                    props.insert(key.clone(), value.clone());
                }
            }
        }
        props
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let NodeKind::Text(text) = &self.inner.kind {
            return write!(f, "{text:?}");
        }
        let mut debug = f.debug_struct("Node");
        debug.field("kind", &self.inner.kind);
        if let Some(key) = &self.inner.key {
            debug.field("key", key);
        }
        if !self.inner.attributes.is_empty() {
            debug.field("attributes", &self.inner.attributes);
        }
        if !self.inner.children.is_empty() {
            debug.field("children", &self.inner.children);
        }
        debug.finish()
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

/// Returns the event name for a listener attribute: `onClick` → `click`.
pub(crate) fn event_name(attribute: &str) -> Option<String> {
    let rest = attribute.strip_prefix("on")?;
    (!rest.is_empty()).then(|| rest.to_ascii_lowercase())
}

// ============================================================================
// Children
// ============================================================================

/// Values accepted as children.
///
/// `None`, `true` and `false` contribute nothing, strings and numbers become
/// text leaves, and collections are flattened.
pub trait IntoChildren {
    /// Appends the produced nodes.
    fn push_into(self, children: &mut Vec<Node>);
}

impl IntoChildren for Node {
    fn push_into(self, children: &mut Vec<Node>) {
        children.push(self);
    }
}

impl IntoChildren for &Node {
    fn push_into(self, children: &mut Vec<Node>) {
        children.push(self.clone());
    }
}

impl IntoChildren for &str {
    fn push_into(self, children: &mut Vec<Node>) {
        children.push(Node::text(self));
    }
}

impl IntoChildren for String {
    fn push_into(self, children: &mut Vec<Node>) {
        children.push(Node::text(self));
    }
}

impl IntoChildren for Str {
    fn push_into(self, children: &mut Vec<Node>) {
        children.push(Node::text(self));
    }
}

impl IntoChildren for bool {
    fn push_into(self, _children: &mut Vec<Node>) {}
}

macro_rules! impl_number_children {
    ($($ty:ty),*) => {
        $(
            impl IntoChildren for $ty {
                fn push_into(self, children: &mut Vec<Node>) {
                    children.push(Node::text(self.to_string()));
                }
            }
        )*
    };
}

impl_number_children!(i32, i64, u32, u64, usize, f64);

impl<T: IntoChildren> IntoChildren for Option<T> {
    fn push_into(self, children: &mut Vec<Node>) {
        if let Some(child) = self {
            child.push_into(children);
        }
    }
}

impl<T: IntoChildren> IntoChildren for Vec<T> {
    fn push_into(self, children: &mut Vec<Node>) {
        for child in self {
            child.push_into(children);
        }
    }
}

impl<T: IntoChildren, const N: usize> IntoChildren for [T; N] {
    fn push_into(self, children: &mut Vec<Node>) {
        for child in self {
            child.push_into(children);
        }
    }
}

// ============================================================================
// Refs
// ============================================================================

/// A shared slot that receives the host node of an element, or the host
/// node a component currently renders to.
///
/// The slot is filled when the position is mounted, follows re-renders that
/// swap the component's output, and is cleared when it is unmounted.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<Cell<Option<HostNode>>>);

impl NodeRef {
    /// Creates an empty ref.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The host node, while mounted.
    #[must_use]
    pub fn get(&self) -> Option<HostNode> {
        self.0.get()
    }

    pub(crate) fn set(&self, node: Option<HostNode>) {
        self.0.set(node);
    }

    /// Returns `true` if both refs share one slot.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.get()).finish()
    }
}

// ============================================================================
// Serialization
// ============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for Node {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let ty: &str = match &self.inner.kind {
            NodeKind::Text(text) => return serializer.serialize_str(text),
            NodeKind::Element(tag) => tag,
            NodeKind::Component(ty) => ty.name(),
        };
        let mut node = serializer.serialize_struct("Node", 4)?;
        node.serialize_field("type", ty)?;
        node.serialize_field("key", &self.inner.key.as_deref())?;
        node.serialize_field("attributes", &self.inner.attributes)?;
        node.serialize_field("children", &self.inner.children)?;
        node.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_skip_placeholders_and_flatten() {
        let node = Node::element("ul").child(Some("a")).child(None::<Node>).child(false).child(vec![
            Node::text("b"),
            Node::text("c"),
        ]);

        let texts: Vec<_> = node.child_nodes().iter().filter_map(Node::as_text).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn test_numbers_become_text() {
        let node = Node::element("span").child(42).child(1.5);
        let texts: Vec<_> = node.child_nodes().iter().filter_map(Node::as_text).collect();
        assert_eq!(texts, ["42", "1.5"]);
    }

    #[test]
    fn test_key_attribute_is_reserved() {
        let node = Node::element("li").attr("key", 3).attr("class", "row");

        assert_eq!(node.key_str().map(|key| &**key), Some("3"));
        assert!(!node.attributes().contains_key("key"));
        assert_eq!(node.attributes().get_str("class"), Some("row"));
    }

    #[test]
    fn test_same_type_rules() {
        assert!(Node::text("a").same_type(&Node::text("b")));
        assert!(Node::element("div").same_type(&Node::element("DIV")));
        assert!(!Node::element("div").same_type(&Node::element("span")));
        assert!(!Node::element("div").same_type(&Node::text("div")));

        fn first(_: &Props, _: &Context) -> Node {
            Node::empty()
        }
        fn second(_: &Props, _: &Context) -> Node {
            Node::empty()
        }
        assert!(Node::function("first", first).same_type(&Node::function("first", first)));
        assert!(!Node::function("first", first).same_type(&Node::function("second", second)));
    }

    #[test]
    fn test_builders_copy_shared_descriptors() {
        let base = Node::element("div").attr("id", "a");
        let derived = base.clone().attr("id", "b");

        assert_eq!(base.attributes().get_str("id"), Some("a"));
        assert_eq!(derived.attributes().get_str("id"), Some("b"));
        assert!(!base.same(&derived));
    }

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("onClick").as_deref(), Some("click"));
        assert_eq!(event_name("on"), None);
        assert_eq!(event_name("title"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize_shape() {
        let node = Node::element("ul")
            .key("list")
            .attr("class", "items")
            .attr("onclick", Callback::new(|_| {}))
            .child("a");

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "ul",
                "key": "list",
                "attributes": { "class": "items", "onclick": null },
                "children": ["a"],
            })
        );
    }
}
