//! The render entry point.

use alloc::rc::{Rc, Weak};
use core::cell::{Ref, RefCell, RefMut};
use core::fmt;

use tracing::{debug, debug_span, trace};

use crate::error::RenderError;
use crate::host::{Host, HostNode};
use crate::instance::{Handle, Instance};
use crate::node::Node;
use crate::reconcile::Pass;
use crate::record::{RecordId, Tree};
use crate::scheduler::{Defer, FlushTask, Manual, RenderQueue};
use crate::value::{Context, Event};

// ============================================================================
// Configuration
// ============================================================================

/// Runtime configuration.
///
/// ```
/// use ripple_core::{Config, Document, Manual, Runtime};
///
/// let runtime = Runtime::with_config(Document::new(), Config::new().defer(Manual));
/// # let _ = runtime;
/// ```
#[derive(Clone)]
pub struct Config {
    defer: Rc<dyn Defer>,
}

impl Config {
    /// The default configuration: flushes only happen on
    /// [`Runtime::rerender`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            defer: Rc::new(Manual),
        }
    }

    /// Sets the strategy deciding when scheduled flushes run.
    #[must_use]
    pub fn defer(mut self, defer: impl Defer) -> Self {
        self.defer = Rc::new(defer);
        self
    }

    /// Like [`defer`](Self::defer), sharing an existing strategy.
    #[must_use]
    pub fn defer_shared(mut self, defer: Rc<dyn Defer>) -> Self {
        self.defer = defer;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl_debug!(Config);

// ============================================================================
// Shared state
// ============================================================================

/// Everything a runtime owns. Instances and flush tasks refer back to it
/// weakly.
pub(crate) struct Shared {
    pub host: RefCell<Box<dyn Host>>,
    pub tree: RefCell<Tree>,
    pub queue: RenderQueue,
    config: Config,
    this: Weak<Self>,
}

impl_debug!(Shared);

impl Shared {
    pub fn weak(&self) -> Weak<Self> {
        self.this.clone()
    }

    pub fn host_mut(&self) -> RefMut<'_, Box<dyn Host>> {
        self.host.borrow_mut()
    }

    /// Marks an instance dirty and queues it. Already dirty instances are
    /// queued or rendering already.
    pub fn enqueue(&self, instance: &Rc<Instance>) {
        if instance.is_dirty() {
            return;
        }
        instance.set_dirty(true);
        trace!(component = instance.name(), "queued re-render");
        if self.queue.push(instance.clone()) {
            self.config.defer.schedule(FlushTask::new(self.weak()));
        }
    }

    /// Renders the pending batch, shallowest first.
    pub fn flush(&self) -> Result<(), RenderError> {
        let batch = self.queue.take();
        if batch.is_empty() {
            return Ok(());
        }
        let span = debug_span!("flush", batch = batch.len());
        let _enter = span.enter();

        let mut rest = batch.into_iter();
        while let Some(instance) = rest.next() {
            if !instance.is_dirty() || instance.is_unmounted() {
                trace!(component = instance.name(), "skipping stale queue entry");
                continue;
            }
            if let Err(error) = self.render_instance(&instance, false) {
                debug!(%error, "flush aborted");
                if self.queue.requeue(rest.collect()) {
                    self.config.defer.schedule(FlushTask::new(self.weak()));
                }
                return Err(error);
            }
        }
        Ok(())
    }

    /// Re-renders one instance, bypassing the guard.
    pub fn force(&self, instance: &Rc<Instance>) -> Result<(), RenderError> {
        let span = debug_span!("force_update", component = instance.name());
        let _enter = span.enter();
        self.render_instance(instance, true)
    }

    fn render_instance(&self, instance: &Rc<Instance>, force: bool) -> Result<(), RenderError> {
        let Some(record) = instance.record() else {
            return Ok(());
        };
        let mut pass = Pass::new(self);
        let result = pass.render_component(instance, record, force);
        pass.finish();
        result
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Owns a host, the mounted trees rendered into it and their render queue.
///
/// The runtime is single-threaded. Cloning it yields another reference to
/// the same runtime.
#[derive(Clone)]
pub struct Runtime {
    shared: Rc<Shared>,
}

impl_debug!(Runtime);

impl Runtime {
    /// Creates a runtime with the default [`Config`].
    pub fn new(host: impl Host) -> Self {
        Self::with_config(host, Config::default())
    }

    /// Creates a runtime rendering into `host`.
    pub fn with_config(host: impl Host, config: Config) -> Self {
        let shared = Rc::new_cyclic(|this| Shared {
            host: RefCell::new(Box::new(host)),
            tree: RefCell::new(Tree::new()),
            queue: RenderQueue::new(),
            config,
            this: this.clone(),
        });
        Self { shared }
    }

    /// Renders `node` into `container`.
    ///
    /// The first call for a container mounts a new tree and appends it to
    /// the container; later calls reconcile against the tree mounted there.
    ///
    /// # Errors
    ///
    /// Returns the first render error. A failed first render leaves nothing
    /// attached; a failed update leaves the last committed output in place.
    pub fn render(&self, node: &Node, container: HostNode) -> Result<RootHandle, RenderError> {
        self.render_root(node, container, None)
    }

    /// Renders `node` into `container`, merging it into `merge`, a child of
    /// the container that was not rendered by this runtime.
    ///
    /// Existing host nodes are kept and patched where their kind matches the
    /// descriptor at the same position; children are matched by position.
    /// Mismatching nodes are replaced and surplus children of kept elements
    /// are removed. Other children of the container are left alone. Once a
    /// tree is mounted in `container` this behaves like
    /// [`render`](Self::render).
    ///
    /// # Errors
    ///
    /// See [`render`](Self::render). Kept nodes are released with the rest
    /// of a failed first render.
    pub fn render_into(&self, node: &Node, container: HostNode, merge: HostNode) -> Result<RootHandle, RenderError> {
        self.render_root(node, container, Some(merge))
    }

    fn render_root(&self, node: &Node, container: HostNode, merge: Option<HostNode>) -> Result<RootHandle, RenderError> {
        let span = debug_span!("render", ?container, ?merge);
        let _enter = span.enter();

        let shared = &*self.shared;
        let old = shared.tree.borrow().root(container);
        let merge = merge.filter(|&merge| old.is_none() && shared.host.borrow().parent(merge) == Some(container));
        let mut pass = Pass::new(shared);
        pass.adopt(merge);
        let result = pass.reconcile(old, node, &Context::new(), None, 0);
        if let Ok(root) = &result {
            let root = *root;
            if old.is_none() {
                let rendered = shared.tree.borrow().host_node(root);
                if let Some(rendered) = rendered
                    && Some(rendered) != merge
                {
                    let mut host = shared.host_mut();
                    host.insert_before(container, rendered, merge);
                    if let Some(merge) = merge {
                        host.remove(merge);
                        host.release(merge);
                    }
                }
            }
            shared.tree.borrow_mut().set_root(container, root);
        }
        pass.finish();
        result?;

        Ok(RootHandle {
            container,
            runtime: shared.weak(),
        })
    }

    /// Tears down the tree mounted in `container`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownContainer`] if nothing is mounted there.
    pub fn unmount(&self, container: HostNode) -> Result<(), RenderError> {
        let root = self
            .shared
            .tree
            .borrow_mut()
            .remove_root(container)
            .ok_or(RenderError::UnknownContainer(container))?;
        debug!(?container, "unmounting root");
        let pass = Pass::new(&self.shared);
        pass.unmount(root);
        pass.finish();
        Ok(())
    }

    /// Synchronously renders every pending component.
    ///
    /// # Errors
    ///
    /// Returns the first render error; the rest of the batch stays queued.
    pub fn rerender(&self) -> Result<(), RenderError> {
        self.shared.flush()
    }

    /// Number of components waiting for a flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Delivers `event` to the listeners of `target` and its ancestors,
    /// innermost first, until one of them stops propagation.
    ///
    /// Returns `true` if any listener ran.
    pub fn dispatch(&self, target: HostNode, mut event: Event) -> bool {
        let name = event.name().to_ascii_lowercase();
        event.set_target(target);
        let mut handled = false;
        let mut current = Some(target);
        while let Some(node) = current {
            let listener = {
                let tree = self.shared.tree.borrow();
                tree.record_for(node)
                    .and_then(|id| tree.get(id))
                    .and_then(|record| record.listeners.get(name.as_str()).cloned())
            };
            if let Some(listener) = listener {
                trace!(event = %name, ?node, "dispatching");
                event.set_current(node);
                listener.call(&event);
                handled = true;
                if event.is_stopped() {
                    break;
                }
            }
            current = self.shared.host.borrow().parent(node);
        }
        handled
    }

    /// The outermost component rendering `node` as its root host node.
    #[must_use]
    pub fn find_component(&self, node: HostNode) -> Option<Handle> {
        let tree = self.shared.tree.borrow();
        let mut id = tree.record_for(node)?;
        let mut found = None;
        while let Some(parent) = tree.get(id)?.parent {
            let Some(instance) = tree.get(parent)?.instance() else {
                break;
            };
            found = Some(instance.handle());
            id = parent;
        }
        found
    }

    /// Borrows the host as its concrete type.
    #[must_use]
    pub fn host<H: Host>(&self) -> Option<Ref<'_, H>> {
        Ref::filter_map(self.shared.host.borrow(), |host| {
            host.as_any().downcast_ref::<H>()
        })
        .ok()
    }

    /// Mutably borrows the host as its concrete type.
    ///
    /// # Panics
    ///
    /// Panics if the host is borrowed already, e.g. while a render is running.
    #[must_use]
    pub fn host_mut<H: Host>(&self) -> Option<RefMut<'_, H>> {
        RefMut::filter_map(self.shared.host.borrow_mut(), |host| {
            host.as_any_mut().downcast_mut::<H>()
        })
        .ok()
    }

    /// The record mounted in `container`.
    #[must_use]
    pub fn root(&self, container: HostNode) -> Option<RecordId> {
        self.shared.tree.borrow().root(container)
    }
}

/// Refers to a tree mounted by [`Runtime::render`].
#[derive(Clone)]
pub struct RootHandle {
    container: HostNode,
    runtime: Weak<Shared>,
}

impl RootHandle {
    /// The container the tree is mounted in.
    #[must_use]
    pub const fn container(&self) -> HostNode {
        self.container
    }

    /// The root component, if the root descriptor is a component.
    #[must_use]
    pub fn component(&self) -> Option<Handle> {
        let runtime = self.runtime.upgrade()?;
        let tree = runtime.tree.borrow();
        let root = tree.root(self.container)?;
        tree.get(root)?.instance().map(|instance| instance.handle())
    }

    /// The host node the root renders to.
    #[must_use]
    pub fn host_node(&self) -> Option<HostNode> {
        let runtime = self.runtime.upgrade()?;
        let tree = runtime.tree.borrow();
        tree.host_node(tree.root(self.container)?)
    }
}

impl fmt::Debug for RootHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootHandle")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}
