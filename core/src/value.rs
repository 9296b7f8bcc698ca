//! Schema-less value bags for props, state and context.
//!
//! Components exchange data through [`Props`]: an ordered mapping from string
//! keys to a closed set of [`Value`] variants. The same type backs component
//! [`State`] and inherited [`Context`], so merging and comparing works the same
//! way everywhere.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use crate::host::HostNode;
use crate::node::Node;

/// Shared, immutable string used for keys, tags and text.
pub type Str = Rc<str>;

/// Component state. Mutated only through [`Handle::set_state`](crate::Handle::set_state).
pub type State = Props;

/// Inherited context, read-only from a component's point of view.
pub type Context = Props;

/// A single prop, state or context value.
///
/// Strings, numbers, booleans and maps compare by value. Node descriptors and
/// callbacks compare by identity, so a freshly built closure or descriptor is
/// always considered changed.
#[derive(Clone)]
pub enum Value {
    /// A string.
    Str(Str),
    /// A number. Integers are stored as `f64`.
    Number(f64),
    /// A boolean.
    Bool(bool),
    /// A node descriptor.
    Node(Node),
    /// A list of node descriptors, used for `children`.
    Children(Vec<Node>),
    /// A function reference.
    Callback(Callback),
    /// A nested mapping.
    Map(Props),
}

impl Value {
    /// Returns the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the numeric payload, if any.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the boolean payload, if any.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the callback payload, if any.
    #[must_use]
    pub const fn as_callback(&self) -> Option<&Callback> {
        match self {
            Self::Callback(callback) => Some(callback),
            _ => None,
        }
    }

    /// Returns the node payload, if any.
    #[must_use]
    pub const fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the children payload, if any.
    #[must_use]
    pub fn as_children(&self) -> Option<&[Node]> {
        match self {
            Self::Children(children) => Some(children),
            _ => None,
        }
    }

    /// Returns the nested map, if any.
    #[must_use]
    pub const fn as_map(&self) -> Option<&Props> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            #[allow(clippy::float_cmp)]
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Node(a), Self::Node(b)) => a.same(b),
            (Self::Children(a), Self::Children(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same(b))
            }
            (Self::Callback(a), Self::Callback(b)) => a.ptr_eq(b),
            (Self::Map(a), Self::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Node(node) => write!(f, "{node:?}"),
            Self::Children(children) => f.debug_list().entries(children).finish(),
            Self::Callback(callback) => write!(f, "{callback:?}"),
            Self::Map(map) => write!(f, "{map:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Node(_) => f.write_str("[node]"),
            Self::Children(_) => f.write_str("[children]"),
            Self::Callback(_) => f.write_str("[callback]"),
            Self::Map(_) => f.write_str("[map]"),
        }
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

impl_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(Str::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(Str::from(value))
    }
}

impl From<Str> for Value {
    fn from(value: Str) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Self::Node(value)
    }
}

impl From<Vec<Node>> for Value {
    fn from(value: Vec<Node>) -> Self {
        Self::Children(value)
    }
}

impl From<Callback> for Value {
    fn from(value: Callback) -> Self {
        Self::Callback(value)
    }
}

impl From<Props> for Value {
    fn from(value: Props) -> Self {
        Self::Map(value)
    }
}

// ============================================================================
// Props
// ============================================================================

/// Ordered mapping from string keys to [`Value`]s.
///
/// Keys are kept sorted, so two bags with the same entries compare equal no
/// matter in which order the entries were inserted.
#[derive(Clone, Default, PartialEq)]
pub struct Props {
    entries: BTreeMap<Str, Value>,
}

impl Props {
    /// Creates an empty bag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bag holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Looks up a string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Looks up a number value.
    #[must_use]
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_number)
    }

    /// Looks up a boolean value.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Looks up a callback value.
    #[must_use]
    pub fn get_callback(&self, key: &str) -> Option<&Callback> {
        self.get(key).and_then(Value::as_callback)
    }

    /// Returns the `children` entry, or an empty slice.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        self.get("children")
            .and_then(Value::as_children)
            .unwrap_or(&[])
    }

    /// Inserts an entry, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<Str>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<Str>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Shallow merge: every top-level entry of `other` overwrites ours.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Returns a copy of `self` with `other` merged on top.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Compares the top-level entries of two bags.
    ///
    /// Nested maps are compared by value, descriptors and callbacks by identity.
    #[must_use]
    pub fn shallow_eq(&self, other: &Self) -> bool {
        self == other
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Str, &Value)> {
        self.entries.iter()
    }

    /// Iterates over the keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &Str> {
        self.entries.keys()
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<K: Into<Str>, V: Into<Value>> FromIterator<(K, V)> for Props {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Props {
    type Item = (&'a Str, &'a Value);
    type IntoIter = alloc::collections::btree_map::Iter<'a, Str, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ============================================================================
// Callbacks and events
// ============================================================================

/// A reference-counted event handler.
///
/// Two callbacks are equal only if they share the same allocation.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);

impl_debug!(Callback);

impl Callback {
    /// Wraps a closure.
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// Invokes the handler.
    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }

    /// Returns `true` if both callbacks point to the same handler.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        core::ptr::eq(
            Rc::as_ptr(&self.0).cast::<()>(),
            Rc::as_ptr(&other.0).cast::<()>(),
        )
    }
}

/// An event delivered through [`Runtime::dispatch`](crate::Runtime::dispatch).
#[derive(Debug, Clone)]
pub struct Event {
    name: Str,
    detail: Option<Value>,
    target: Option<HostNode>,
    current: Option<HostNode>,
    stopped: Cell<bool>,
}

impl Event {
    /// Creates an event with the given name, e.g. `"click"`.
    pub fn new(name: impl Into<Str>) -> Self {
        Self {
            name: name.into(),
            detail: None,
            target: None,
            current: None,
            stopped: Cell::new(false),
        }
    }

    /// Attaches a payload to the event.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// The event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The payload attached with [`with_detail`](Self::with_detail).
    #[must_use]
    pub const fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }

    /// The node the event was dispatched to.
    #[must_use]
    pub const fn target(&self) -> Option<HostNode> {
        self.target
    }

    /// The node whose listener is currently running.
    #[must_use]
    pub const fn current_target(&self) -> Option<HostNode> {
        self.current
    }

    /// Stops the event from bubbling to further ancestors.
    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    pub(crate) const fn set_target(&mut self, target: HostNode) {
        self.target = Some(target);
    }

    pub(crate) const fn set_current(&mut self, current: HostNode) {
        self.current = Some(current);
    }
}

// ============================================================================
// Serialization
// ============================================================================

#[cfg(feature = "serde")]
mod serialize {
    use serde::ser::{Serialize, SerializeMap, Serializer};

    use super::{Props, Value};

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Self::Str(value) => serializer.serialize_str(value),
                Self::Number(value) => serializer.serialize_f64(*value),
                Self::Bool(value) => serializer.serialize_bool(*value),
                Self::Node(node) => node.serialize(serializer),
                Self::Children(children) => serializer.collect_seq(children),
                Self::Callback(_) => serializer.serialize_unit(),
                Self::Map(map) => map.serialize(serializer),
            }
        }
    }

    impl Serialize for Props {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self {
                map.serialize_entry(&**key, value)?;
            }
            map.end()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_top_level_keys() {
        let mut state = Props::new().with("count", 0).with("label", "a");
        state.merge(&Props::new().with("count", 42));

        assert_eq!(state.get_number("count"), Some(42.0));
        assert_eq!(state.get_str("label"), Some("a"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_insertion_order_is_irrelevant() {
        let a = Props::new().with("x", 1).with("y", true);
        let b = Props::new().with("y", true).with("x", 1);

        assert_eq!(a, b);
        assert!(a.shallow_eq(&b));
    }

    #[test]
    fn test_callbacks_compare_by_identity() {
        let first = Callback::new(|_| {});
        let second = Callback::new(|_| {});

        assert_eq!(Value::from(first.clone()), Value::from(first.clone()));
        assert_ne!(Value::from(first), Value::from(second));
    }

    #[test]
    fn test_nodes_compare_by_identity() {
        let node = Node::text("a");
        let same = node.clone();

        assert_eq!(Value::from(node), Value::from(same));
        assert_ne!(Value::from(Node::text("a")), Value::from(Node::text("a")));
    }

    #[test]
    fn test_display_numbers_without_fraction() {
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_children_accessor_defaults_to_empty() {
        let props = Props::new();
        assert!(props.children().is_empty());

        let props = props.with("children", vec![Node::text("x")]);
        assert_eq!(props.children().len(), 1);
    }

    #[test]
    fn test_event_stop_propagation() {
        let event = Event::new("click").with_detail("payload");
        assert!(!event.is_stopped());
        event.stop_propagation();
        assert!(event.is_stopped());
        assert_eq!(event.name(), "click");
        assert_eq!(event.detail().and_then(Value::as_str), Some("payload"));
    }
}
