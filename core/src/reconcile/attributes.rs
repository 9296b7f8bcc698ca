//! Attribute and listener diffing for element positions.

use alloc::collections::BTreeMap;

use tracing::trace;

use crate::host::{Host, HostNode};
use crate::node::event_name;
use crate::value::{Callback, Props, Str};

/// Patches `node` from the `applied` attributes and `listeners` to `next`.
///
/// Attributes are diffed over the union of old and new names: absent ones
/// are removed, changed ones set, equal ones left alone. `on<event>`
/// attributes holding a callback go to the listener table instead; the host
/// only hears about an event when it starts or stops being listened to.
pub(super) fn patch(
    host: &mut dyn Host,
    node: HostNode,
    applied: &mut Props,
    listeners: &mut BTreeMap<Str, Callback>,
    next: &Props,
) {
    let mut next_listeners = BTreeMap::new();
    let mut next_attributes = Props::new();
    for (name, value) in next {
        match (event_name(name), value.as_callback()) {
            (Some(event), Some(callback)) => {
                next_listeners.insert(Str::from(event), callback.clone());
            }
            _ => {
                next_attributes.insert(name.clone(), value.clone());
            }
        }
    }

    let stale: Vec<Str> = applied
        .keys()
        .filter(|name| !next_attributes.contains_key(name))
        .cloned()
        .collect();
    for name in stale {
        applied.remove(&name);
        host.remove_attribute(node, &name);
    }
    for (name, value) in &next_attributes {
        if applied.get(name) != Some(value) {
            host.set_attribute(node, name, value);
            applied.insert(name.clone(), value.clone());
        }
    }

    for event in listeners.keys() {
        if !next_listeners.contains_key(event) {
            trace!(?node, %event, "unlisten");
            host.unlisten(node, event);
        }
    }
    for event in next_listeners.keys() {
        if !listeners.contains_key(event) {
            trace!(?node, %event, "listen");
            host.listen(node, event);
        }
    }
    *listeners = next_listeners;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Mutation};
    use crate::props;

    type Applied = (Props, BTreeMap<Str, Callback>);

    fn patched(document: &mut Document, node: HostNode, state: &mut Applied, next: &Props) -> Vec<Mutation> {
        patch(document, node, &mut state.0, &mut state.1, next);
        document.take_mutations()
    }

    #[test]
    fn test_only_changed_attributes_are_touched() {
        let mut document = Document::new();
        let node = document.create_element("div");
        let mut state = Applied::default();

        patched(&mut document, node, &mut state, &props! { "id" => "a", "title" => "t" });
        let mutations = patched(&mut document, node, &mut state, &props! { "id" => "b", "title" => "t" });
        assert_eq!(
            mutations,
            [Mutation::SetAttribute {
                node,
                name: "id".into()
            }]
        );

        let mutations = patched(&mut document, node, &mut state, &props! { "id" => "b" });
        assert_eq!(
            mutations,
            [Mutation::RemoveAttribute {
                node,
                name: "title".into()
            }]
        );
    }

    #[test]
    fn test_swapping_handlers_keeps_subscription() {
        let mut document = Document::new();
        let node = document.create_element("button");
        let mut state = Applied::default();

        let mutations = patched(&mut document, node, &mut state, &props! { "onClick" => Callback::new(|_| {}) });
        assert_eq!(
            mutations,
            [Mutation::Listen {
                node,
                event: "click".into()
            }]
        );

        let mutations = patched(&mut document, node, &mut state, &props! { "onClick" => Callback::new(|_| {}) });
        assert!(mutations.is_empty());
        assert!(state.1.contains_key("click"));

        let mutations = patched(&mut document, node, &mut state, &Props::new());
        assert_eq!(
            mutations,
            [Mutation::Unlisten {
                node,
                event: "click".into()
            }]
        );
        assert!(document.attribute(node, "onClick").is_none());
    }
}
