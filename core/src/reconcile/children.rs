//! Child-list reconciliation.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use super::Pass;
use crate::error::RenderError;
use crate::host::HostNode;
use crate::node::Node;
use crate::record::RecordId;
use crate::value::{Context, Str};

/// Matches the new children of an element against its mounted ones.
///
/// A keyed child takes the old child with the same key; an unkeyed child
/// takes the first unused unkeyed old child of the same type. Each result is
/// placed right after the previously placed node, moving it only when it is
/// not there already. Old children left unmatched are unmounted at the end.
pub(super) fn reconcile_children(
    pass: &mut Pass<'_>,
    parent: RecordId,
    parent_node: HostNode,
    nodes: &[Node],
    context: &Context,
    depth: usize,
) -> Result<(), RenderError> {
    let old = pass
        .rt
        .tree
        .borrow()
        .get(parent)
        .map(|record| record.children.clone())
        .unwrap_or_default();

    let matches = match_children(pass, &old, nodes);
    let leftovers: Vec<RecordId> = {
        let matched: HashSet<RecordId> = matches.iter().flatten().copied().collect();
        old.iter().copied().filter(|id| !matched.contains(id)).collect()
    };
    let leaving: HashSet<HostNode> = {
        let tree = pass.rt.tree.borrow();
        leftovers.iter().filter_map(|&id| tree.host_node(id)).collect()
    };

    let mut placed = Vec::with_capacity(nodes.len());
    let mut previous: Option<HostNode> = None;
    for (node, matched) in nodes.iter().zip(matches) {
        let id = match pass.reconcile(matched, node, context, Some(parent), depth) {
            Ok(id) => id,
            Err(error) => {
                keep_consistent(pass, parent, &old, placed);
                return Err(error);
            }
        };
        let Some(host_node) = pass.rt.tree.borrow().host_node(id) else {
            placed.push(id);
            continue;
        };

        let mut host = pass.rt.host_mut();
        let mut expected = match previous {
            Some(previous) => host.next_sibling(previous),
            None => host.first_child(parent_node),
        };
        while let Some(candidate) = expected
            && leaving.contains(&candidate)
        {
            expected = host.next_sibling(candidate);
        }
        if expected != Some(host_node) {
            trace!(?host_node, before = ?expected, "placing child");
            host.insert_before(parent_node, host_node, expected);
        }
        drop(host);

        previous = Some(host_node);
        placed.push(id);
    }

    for id in leftovers {
        pass.unmount(id);
    }
    if let Some(record) = pass.rt.tree.borrow_mut().get_mut(parent) {
        record.children = placed;
    }
    Ok(())
}

/// Pairs every new child with the old child it reuses, if any.
fn match_children(pass: &Pass<'_>, old: &[RecordId], nodes: &[Node]) -> Vec<Option<RecordId>> {
    let tree = pass.rt.tree.borrow();
    let mut keyed: HashMap<Str, RecordId> = HashMap::new();
    let mut unkeyed: Vec<Option<RecordId>> = Vec::new();
    for &id in old {
        let Some(record) = tree.get(id) else {
            continue;
        };
        match record.key() {
            // A duplicate key stays unmatched and is unmounted.
            Some(key) => {
                keyed.entry(key.clone()).or_insert(id);
            }
            None => unkeyed.push(Some(id)),
        }
    }

    nodes
        .iter()
        .map(|node| match node.key_str() {
            Some(key) => keyed.remove(key),
            None => unkeyed
                .iter_mut()
                .find(|slot| {
                    slot.and_then(|id| tree.get(id))
                        .is_some_and(|record| record.descriptor.same_type(node))
                })
                .and_then(Option::take),
        })
        .collect()
}

/// After a failed child render, records every child that is still alive so
/// the next render starts from what is actually mounted.
fn keep_consistent(pass: &Pass<'_>, parent: RecordId, old: &[RecordId], mut placed: Vec<RecordId>) {
    let mut tree = pass.rt.tree.borrow_mut();
    for &id in old {
        if tree.contains(id) && !placed.contains(&id) {
            placed.push(id);
        }
    }
    if let Some(record) = tree.get_mut(parent) {
        record.children = placed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Mutation};
    use crate::runtime::Runtime;

    fn list(keys: &[&str]) -> Node {
        Node::element("ul").children(keys.iter().map(|key| Node::element("li").key(*key).child(*key)))
    }

    fn order(runtime: &Runtime, container: HostNode) -> String {
        runtime.host::<Document>().unwrap().text_content(container)
    }

    #[test]
    fn test_keyed_moves_are_minimal() {
        let mut document = Document::new();
        let container = document.create_container();
        let runtime = Runtime::new(document);

        runtime.render(&list(&["a", "b", "c", "d"]), container).unwrap();
        runtime.host_mut::<Document>().unwrap().take_mutations();

        runtime.render(&list(&["d", "a", "b", "c"]), container).unwrap();
        assert_eq!(order(&runtime, container), "dabc");
        let mutations = runtime.host_mut::<Document>().unwrap().take_mutations();
        assert_eq!(mutations.len(), 1);
        assert!(matches!(mutations[0], Mutation::Insert { .. }));
    }

    #[test]
    fn test_removal_does_not_move_survivors() {
        let mut document = Document::new();
        let container = document.create_container();
        let runtime = Runtime::new(document);

        runtime.render(&list(&["a", "b", "c"]), container).unwrap();
        runtime.host_mut::<Document>().unwrap().take_mutations();

        runtime.render(&list(&["a", "c"]), container).unwrap();
        assert_eq!(order(&runtime, container), "ac");
        let mutations = runtime.host_mut::<Document>().unwrap().take_mutations();
        assert_eq!(mutations.len(), 1);
        assert!(matches!(mutations[0], Mutation::Remove { .. }));
    }

    #[test]
    fn test_unkeyed_children_match_by_type() {
        let mut document = Document::new();
        let container = document.create_container();
        let runtime = Runtime::new(document);

        let before = Node::element("div").child(Node::element("p").child("x")).child(Node::element("span").child("y"));
        runtime.render(&before, container).unwrap();
        let p = {
            let document = runtime.host::<Document>().unwrap();
            document.children(document.children(container)[0])[0]
        };
        runtime.host_mut::<Document>().unwrap().take_mutations();

        let after = Node::element("div").child(Node::element("span").child("y")).child(Node::element("p").child("z"));
        runtime.render(&after, container).unwrap();

        let document = runtime.host::<Document>().unwrap();
        let div = document.children(container)[0];
        assert_eq!(document.inner_html(div), "<span>y</span><p>z</p>");
        assert_eq!(document.children(div)[1], p);
    }
}
