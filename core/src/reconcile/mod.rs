//! The reconciler.
//!
//! A [`Pass`] walks a new descriptor tree against the mounted records,
//! reusing positions whose type is unchanged and replacing the rest. All host
//! mutations happen synchronously while the pass runs; `did_mount` and
//! `did_update` are collected and fire from [`Pass::finish`], children before
//! parents.
//!
//! No borrow of the record tree, the host or instance data is held while
//! user code runs. A component is borrowed for the duration of its own hook
//! only; a render that reaches a component whose hook is still running is
//! queued for the next flush instead.

mod attributes;
mod children;

use alloc::rc::Rc;

use tracing::trace;

use crate::component::ComponentType;
use crate::error::RenderError;
use crate::host::HostNode;
use crate::instance::{Instance, Scope, Snapshot};
use crate::node::{Node, NodeKind, NodeRef};
use crate::options::{self, Hook};
use crate::record::{Record, RecordId, RecordKind};
use crate::runtime::Shared;
use crate::value::Context;

/// Post-render work, in completion order.
enum Commit {
    Mount(Rc<Instance>),
    Update {
        instance: Rc<Instance>,
        previous: Snapshot,
    },
    /// A vetoed update; only the queued callbacks run.
    Settle(Rc<Instance>),
}

/// One top-level reconciliation.
pub(crate) struct Pass<'rt> {
    rt: &'rt Shared,
    commits: Vec<Commit>,
    /// Existing host node the next mount tries to reuse.
    adopt: Option<HostNode>,
}

impl<'rt> Pass<'rt> {
    pub const fn new(rt: &'rt Shared) -> Self {
        Self {
            rt,
            commits: Vec::new(),
            adopt: None,
        }
    }

    /// Lets the next mount reuse `node`, and its children, where their kind
    /// matches the descriptors.
    pub const fn adopt(&mut self, node: Option<HostNode>) {
        self.adopt = node;
    }

    /// Brings the position `old` in line with `node` and returns the record
    /// now standing there.
    pub fn reconcile(
        &mut self,
        old: Option<RecordId>,
        node: &Node,
        context: &Context,
        parent: Option<RecordId>,
        depth: usize,
    ) -> Result<RecordId, RenderError> {
        let Some(old) = old else {
            return self.mount(node, context, parent, depth);
        };
        let reusable = self.rt.tree.borrow().get(old).is_some_and(|record| {
            record.descriptor.same_type(node)
                && !record.instance().is_some_and(|instance| instance.is_unmounted())
        });
        if reusable {
            self.update(old, node, context)?;
            return Ok(old);
        }
        self.replace(old, node, context, parent, depth)
    }

    /// Unmounts `old`, mounts `node` fresh and puts it where `old` was.
    ///
    /// The old host nodes are only detached once the new subtree is built, so
    /// a failing build leaves the old (inert) output in place.
    fn replace(
        &mut self,
        old: RecordId,
        node: &Node,
        context: &Context,
        parent: Option<RecordId>,
        depth: usize,
    ) -> Result<RecordId, RenderError> {
        self.notify_unmount(old);
        let id = self.mount(node, context, parent, depth)?;
        let (old_node, new_node) = {
            let tree = self.rt.tree.borrow();
            (tree.host_node(old), tree.host_node(id))
        };
        if let (Some(old_node), Some(new_node)) = (old_node, new_node) {
            let mut host = self.rt.host_mut();
            if let Some(parent_node) = host.parent(old_node) {
                host.insert_before(parent_node, new_node, Some(old_node));
            }
        }
        trace!(?old, new = ?id, "replaced position");
        self.discard(old);
        Ok(id)
    }

    // ========================================================================
    // Mounting
    // ========================================================================

    fn mount(
        &mut self,
        node: &Node,
        context: &Context,
        parent: Option<RecordId>,
        depth: usize,
    ) -> Result<RecordId, RenderError> {
        let existing = self.adopt.take();
        match node.kind() {
            NodeKind::Text(text) => {
                let host_node = if let Some(found) = self.claim(existing, node) {
                    let mut host = self.rt.host_mut();
                    if host.node_text(found) != Some(&**text) {
                        host.set_text(found, text);
                    }
                    trace!(?found, "adopted text");
                    found
                } else {
                    self.rt.host_mut().create_text(text)
                };
                let mut record = Record::new(RecordKind::Text, node.clone(), parent, depth);
                record.node = Some(host_node);
                Ok(self.rt.tree.borrow_mut().insert(record))
            }
            NodeKind::Element(tag) => self.mount_element(tag, node, context, parent, depth, existing),
            NodeKind::Component(ty) => self.mount_component(*ty, node, context, parent, depth, existing),
        }
    }

    /// Returns `existing` if it is an unowned host node of the kind `node`
    /// describes.
    fn claim(&self, existing: Option<HostNode>, node: &Node) -> Option<HostNode> {
        let existing = existing?;
        if self.rt.tree.borrow().record_for(existing).is_some() {
            return None;
        }
        let host = self.rt.host.borrow();
        let fits = match node.kind() {
            NodeKind::Text(_) => host.node_text(existing).is_some(),
            NodeKind::Element(tag) => host
                .node_tag(existing)
                .is_some_and(|found| found.eq_ignore_ascii_case(tag)),
            NodeKind::Component(_) => false,
        };
        fits.then_some(existing)
    }

    fn mount_element(
        &mut self,
        tag: &str,
        node: &Node,
        context: &Context,
        parent: Option<RecordId>,
        depth: usize,
        existing: Option<HostNode>,
    ) -> Result<RecordId, RenderError> {
        let adopted = self.claim(existing, node);
        let host_node = match adopted {
            Some(found) => found,
            None => self.rt.host_mut().create_element(tag),
        };
        let mut record = Record::new(RecordKind::Element, node.clone(), parent, depth);
        record.node = Some(host_node);
        if adopted.is_some() {
            record.attributes = self.rt.host.borrow().node_attributes(host_node);
        }
        attributes::patch(
            &mut **self.rt.host_mut(),
            host_node,
            &mut record.attributes,
            &mut record.listeners,
            node.attributes(),
        );
        let id = self.rt.tree.borrow_mut().insert(record);

        // Existing children of an adopted element are matched by position.
        let mut cursor = adopted.and_then(|found| self.rt.host.borrow().first_child(found));
        for child in node.child_nodes() {
            self.adopt = cursor;
            let child = match self.mount(child, context, Some(id), depth + 1) {
                Ok(child) => child,
                Err(error) => {
                    // Siblings mounted so far already ran `will_mount`.
                    self.unmount(id);
                    return Err(error);
                }
            };
            let mut tree = self.rt.tree.borrow_mut();
            if let Some(child_node) = tree.host_node(child) {
                let mut host = self.rt.host_mut();
                if Some(child_node) == cursor {
                    cursor = host.next_sibling(child_node);
                } else {
                    host.insert_before(host_node, child_node, cursor);
                }
            }
            if let Some(record) = tree.get_mut(id) {
                record.children.push(child);
            }
        }
        while let Some(stale) = cursor {
            let mut host = self.rt.host_mut();
            cursor = host.next_sibling(stale);
            host.remove(stale);
            host.release(stale);
        }

        if let Some(node_ref) = node.get_node_ref() {
            node_ref.set(Some(host_node));
        }
        trace!(tag, ?host_node, adopted = adopted.is_some(), "mounted element");
        Ok(id)
    }

    fn mount_component(
        &mut self,
        ty: ComponentType,
        node: &Node,
        context: &Context,
        parent: Option<RecordId>,
        depth: usize,
        existing: Option<HostNode>,
    ) -> Result<RecordId, RenderError> {
        let props = node.component_props();
        let component = ty.create(&props, context);
        let state = component.initial_state(&props, context);
        let instance = Instance::new(ty, component, props, state, context.clone(), depth, self.rt.weak());
        let record = Record::new(RecordKind::Component(instance.clone()), node.clone(), parent, depth);
        let id = self.rt.tree.borrow_mut().insert(record);
        instance.set_record(id);
        trace!(component = ty.name(), depth, "mounting component");

        let scope = instance.scope();
        instance.hook(|component| component.will_mount(&scope));

        // The rendered child stands where the component does.
        self.adopt = existing;
        let rendered = self.render_component(&instance, id, false);
        self.adopt = None;
        if let Err(error) = rendered {
            self.unmount(id);
            return Err(error);
        }
        Ok(id)
    }

    // ========================================================================
    // Updating
    // ========================================================================

    fn update(&mut self, id: RecordId, node: &Node, context: &Context) -> Result<(), RenderError> {
        match node.kind() {
            NodeKind::Text(text) => {
                self.update_text(id, node, text);
                Ok(())
            }
            NodeKind::Element(_) => self.update_element(id, node, context),
            NodeKind::Component(_) => self.update_component(id, node, context),
        }
    }

    fn update_text(&self, id: RecordId, node: &Node, text: &str) {
        let mut tree = self.rt.tree.borrow_mut();
        let Some(record) = tree.get_mut(id) else {
            return;
        };
        if record.descriptor.as_text() != Some(text)
            && let Some(host_node) = record.node
        {
            self.rt.host_mut().set_text(host_node, text);
        }
        record.descriptor = node.clone();
    }

    fn update_element(&mut self, id: RecordId, node: &Node, context: &Context) -> Result<(), RenderError> {
        let (host_node, depth) = {
            let mut tree = self.rt.tree.borrow_mut();
            let Some(record) = tree.get_mut(id) else {
                return Ok(());
            };
            let Some(host_node) = record.node else {
                return Ok(());
            };
            attributes::patch(
                &mut **self.rt.host_mut(),
                host_node,
                &mut record.attributes,
                &mut record.listeners,
                node.attributes(),
            );
            rebind_ref(record.descriptor.get_node_ref(), node.get_node_ref(), host_node);
            record.descriptor = node.clone();
            (host_node, record.depth)
        };
        children::reconcile_children(self, id, host_node, node.child_nodes(), context, depth + 1)
    }

    fn update_component(&mut self, id: RecordId, node: &Node, context: &Context) -> Result<(), RenderError> {
        let (instance, unchanged) = {
            let tree = self.rt.tree.borrow();
            let Some(record) = tree.get(id) else {
                return Ok(());
            };
            let Some(instance) = record.instance() else {
                return Ok(());
            };
            (instance.clone(), record.descriptor.same(node))
        };
        if unchanged && !instance.is_dirty() && instance.data.borrow().context.shallow_eq(context) {
            trace!(component = instance.name(), "descriptor unchanged, skipping");
            return Ok(());
        }

        let next_props = node.component_props();
        if instance.is_mounted() {
            let scope = instance.scope();
            let received = instance.hook(|component| component.will_receive_props(&scope, &next_props, context));
            if received.is_none() {
                trace!(component = instance.name(), "component busy, skipping will_receive_props");
            }
        }
        instance.commit_props(next_props, context.clone());
        let old_ref = {
            let mut tree = self.rt.tree.borrow_mut();
            let Some(record) = tree.get_mut(id) else {
                return Ok(());
            };
            let old_ref = record.descriptor.get_node_ref().cloned();
            record.descriptor = node.clone();
            old_ref
        };
        if let Some(old_ref) = old_ref
            && !node.get_node_ref().is_some_and(|next| next.ptr_eq(&old_ref))
        {
            old_ref.set(None);
        }
        self.sync_refs(id);
        self.render_component(&instance, id, false)
    }

    /// Runs the guard, render and child reconciliation of a component.
    ///
    /// The first render of an instance mounts its child; later ones patch it.
    /// `force` bypasses `should_update`. An instance whose own hook is
    /// running keeps its output and is queued instead.
    pub fn render_component(
        &mut self,
        instance: &Rc<Instance>,
        id: RecordId,
        force: bool,
    ) -> Result<(), RenderError> {
        if instance.is_busy() {
            self.defer(instance, force);
            return Ok(());
        }
        let force = instance.take_forced() || force;
        let old_child = {
            let tree = self.rt.tree.borrow();
            let Some(record) = tree.get(id) else {
                return Ok(());
            };
            record.children.first().copied()
        };
        let previous = instance.previous();

        if old_child.is_some() {
            let next = instance.scope();
            let before = Scope::new(
                instance,
                previous.props.clone(),
                previous.state.clone(),
                previous.context.clone(),
            );
            if !force {
                let proceed = instance
                    .hook(|component| component.should_update(&before, next.props(), next.state(), next.context()))
                    .unwrap_or(true);
                if !proceed {
                    trace!(component = instance.name(), "update vetoed");
                    instance.clear_previous();
                    instance.set_dirty(false);
                    self.commits.push(Commit::Settle(instance.clone()));
                    return Ok(());
                }
            }
            instance.hook(|component| component.will_update(&before, next.props(), next.state(), next.context()));
        }

        instance.clear_previous();
        instance.set_dirty(false);
        let scope = instance.scope();
        let Some(rendered) = instance.hook(|component| component.render(&scope)) else {
            self.defer(instance, force);
            return Ok(());
        };
        let rendered = rendered?;
        let extra = instance.hook(|component| component.child_context(&scope)).flatten();
        let child_context = match extra {
            Some(extra) => scope.context().merged(&extra),
            None => scope.context().clone(),
        };

        let child = self.reconcile(old_child, &rendered, &child_context, Some(id), instance.depth() + 1)?;
        if let Some(record) = self.rt.tree.borrow_mut().get_mut(id) {
            record.children = vec![child];
        }
        self.sync_refs(id);

        self.commits.push(match old_child {
            Some(_) => Commit::Update {
                instance: instance.clone(),
                previous,
            },
            None => Commit::Mount(instance.clone()),
        });
        Ok(())
    }

    /// Points the refs of a component position, and of the enclosing
    /// component positions rendering through it, at their host node.
    fn sync_refs(&self, mut id: RecordId) {
        let tree = self.rt.tree.borrow();
        while let Some(record) = tree.get(id)
            && record.instance().is_some()
        {
            if let Some(node_ref) = record.descriptor.get_node_ref() {
                node_ref.set(tree.host_node(id));
            }
            let Some(parent) = record.parent else {
                break;
            };
            id = parent;
        }
    }

    /// Queues a render that cannot run while the instance's hook is on the
    /// stack.
    fn defer(&self, instance: &Rc<Instance>, force: bool) {
        trace!(component = instance.name(), force, "component busy, render queued");
        if force {
            instance.set_forced();
        }
        self.rt.enqueue(instance);
    }

    // ========================================================================
    // Unmounting
    // ========================================================================

    /// Runs `will_unmount` top-down over the subtree, then detaches and
    /// destroys it.
    pub fn unmount(&self, id: RecordId) {
        self.notify_unmount(id);
        self.discard(id);
    }

    /// Runs `will_unmount` top-down. Instances become inert right after
    /// their hook.
    fn notify_unmount(&self, id: RecordId) {
        let (instance, children) = {
            let tree = self.rt.tree.borrow();
            let Some(record) = tree.get(id) else {
                return;
            };
            (record.instance().cloned(), record.children.clone())
        };
        if let Some(instance) = instance
            && !instance.is_unmounted()
        {
            trace!(component = instance.name(), "unmounting component");
            instance.will_unmount();
            instance.set_unmounted();
        }
        for child in children {
            self.notify_unmount(child);
        }
    }

    /// Detaches the subtree and destroys it without running hooks.
    fn discard(&self, id: RecordId) {
        let top = self.rt.tree.borrow().host_node(id);
        if let Some(top) = top {
            self.rt.host_mut().remove(top);
        }
        self.destroy(id);
    }

    fn destroy(&self, id: RecordId) {
        let resolved = self.rt.tree.borrow().host_node(id);
        let Some(record) = self.rt.tree.borrow_mut().remove(id) else {
            return;
        };
        for &child in &record.children {
            self.destroy(child);
        }
        if let Some(instance) = record.instance() {
            instance.set_unmounted();
            if let Some(node_ref) = record.descriptor.get_node_ref()
                && node_ref.get() == resolved
            {
                node_ref.set(None);
            }
        }
        if let Some(node) = record.node {
            if let Some(node_ref) = record.descriptor.get_node_ref()
                && node_ref.get() == Some(node)
            {
                node_ref.set(None);
            }
            self.rt.host_mut().release(node);
        }
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Fires the collected `did_mount`/`did_update` hooks, observers and
    /// queued callbacks.
    pub fn finish(self) {
        for commit in self.commits {
            match commit {
                Commit::Mount(instance) => {
                    if instance.is_unmounted() {
                        continue;
                    }
                    instance.set_mounted();
                    let scope = instance.scope();
                    instance.hook(|component| component.did_mount(&scope));
                    options::notify(Hook::AfterMount, &instance.handle());
                    instance.run_callbacks();
                }
                Commit::Update { instance, previous } => {
                    if instance.is_unmounted() {
                        continue;
                    }
                    // Re-rendered before its own `did_mount`; that hook is
                    // still to come.
                    if !instance.is_mounted() {
                        instance.run_callbacks();
                        continue;
                    }
                    let scope = instance.scope();
                    instance.hook(|component| {
                        component.did_update(&scope, &previous.props, &previous.state, &previous.context);
                    });
                    options::notify(Hook::AfterUpdate, &instance.handle());
                    instance.run_callbacks();
                }
                Commit::Settle(instance) => {
                    if !instance.is_unmounted() {
                        instance.run_callbacks();
                    }
                }
            }
        }
    }
}

impl_debug!(Pass<'_>);

/// Moves a ref binding from the old descriptor to the new one.
fn rebind_ref(old: Option<&NodeRef>, new: Option<&NodeRef>, node: HostNode) {
    if let (Some(old), Some(new)) = (old, new)
        && old.ptr_eq(new)
    {
        return;
    }
    if let Some(old) = old {
        old.set(None);
    }
    if let Some(new) = new {
        new.set(Some(node));
    }
}
