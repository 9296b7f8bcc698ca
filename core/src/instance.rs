//! Component instances and the handles user code holds on to them.

use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::component::{Component, ComponentType};
use crate::error::RenderError;
use crate::host::HostNode;
use crate::options::{self, Hook};
use crate::record::RecordId;
use crate::runtime::Shared;
use crate::value::{Context, Props, State};

type Updater = Box<dyn FnOnce(&State, &Props) -> Option<State>>;
type Callback = Box<dyn FnOnce()>;

/// A pending state change.
pub enum StateUpdate {
    /// Entries shallowly merged into the current state.
    Partial(State),
    /// Computes the entries to merge from the current state and props.
    /// Returning `None` drops the update.
    With(Updater),
}

impl_debug!(StateUpdate);

impl From<State> for StateUpdate {
    fn from(partial: State) -> Self {
        Self::Partial(partial)
    }
}

#[derive(Default)]
pub(crate) struct InstanceData {
    pub props: Props,
    pub state: State,
    pub context: Context,
    pub prev_props: Option<Props>,
    pub prev_state: Option<State>,
    pub prev_context: Option<Context>,
    pub callbacks: Vec<Callback>,
}

/// Values from before an update, as handed to `did_update`.
pub(crate) struct Snapshot {
    pub props: Props,
    pub state: State,
    pub context: Context,
}

/// The engine-owned half of a mounted component.
pub(crate) struct Instance {
    ty: ComponentType,
    component: RefCell<Box<dyn Component>>,
    pub data: RefCell<InstanceData>,
    dirty: Cell<bool>,
    /// A forced render was deferred and still has to bypass the guard.
    forced: Cell<bool>,
    mounted: Cell<bool>,
    unmounted: Cell<bool>,
    /// `will_unmount` arrived while another hook of this instance ran.
    unmount_owed: Cell<bool>,
    record: Cell<Option<RecordId>>,
    depth: usize,
    runtime: Weak<Shared>,
    this: Weak<Self>,
}

impl Instance {
    pub fn new(
        ty: ComponentType,
        component: Box<dyn Component>,
        props: Props,
        state: State,
        context: Context,
        depth: usize,
        runtime: Weak<Shared>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            ty,
            component: RefCell::new(component),
            data: RefCell::new(InstanceData {
                props,
                state,
                context,
                ..InstanceData::default()
            }),
            dirty: Cell::new(true),
            forced: Cell::new(false),
            mounted: Cell::new(false),
            unmounted: Cell::new(false),
            unmount_owed: Cell::new(false),
            record: Cell::new(None),
            depth,
            runtime,
            this: this.clone(),
        })
    }

    pub const fn name(&self) -> &'static str {
        self.ty.name()
    }

    pub fn handle(&self) -> Handle {
        Handle {
            instance: self.this.clone(),
        }
    }

    /// A scope over the current values.
    pub fn scope(&self) -> Scope {
        let data = self.data.borrow();
        Scope {
            handle: self.handle(),
            props: data.props.clone(),
            state: data.state.clone(),
            context: data.context.clone(),
        }
    }

    /// Runs `hook` on the component.
    ///
    /// Returns `None` without running it while another hook of the same
    /// instance is on the stack, e.g. when `did_mount` forces its own
    /// update. A `will_unmount` that arrived meanwhile runs as soon as the
    /// outer hook returns.
    pub fn hook<R>(&self, hook: impl FnOnce(&mut dyn Component) -> R) -> Option<R> {
        let result = hook(&mut **self.component.try_borrow_mut().ok()?);
        if self.unmount_owed.take() {
            self.will_unmount();
        }
        Some(result)
    }

    /// Returns `true` while a hook of this instance runs.
    pub fn is_busy(&self) -> bool {
        self.component.try_borrow_mut().is_err()
    }

    /// Runs `will_unmount` and the unmount observers, now or once the
    /// running hook returns.
    pub fn will_unmount(&self) {
        let scope = self.scope();
        if self.hook(|component| component.will_unmount(&scope)).is_some() {
            options::notify(Hook::BeforeUnmount, &self.handle());
        } else {
            tracing::trace!(component = self.name(), "component busy, will_unmount postponed");
            self.unmount_owed.set(true);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.set(dirty);
    }

    /// Remembers that the next render has to bypass the guard.
    pub fn set_forced(&self) {
        self.forced.set(true);
    }

    pub fn take_forced(&self) -> bool {
        self.forced.take()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get() && !self.unmounted.get()
    }

    pub fn set_mounted(&self) {
        self.mounted.set(true);
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted.get()
    }

    pub fn set_unmounted(&self) {
        self.unmounted.set(true);
        self.dirty.set(false);
        self.forced.set(false);
    }

    pub fn record(&self) -> Option<RecordId> {
        self.record.get()
    }

    pub fn set_record(&self, record: RecordId) {
        self.record.set(Some(record));
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Replaces props and context, keeping the first snapshot of the batch.
    pub fn commit_props(&self, props: Props, context: Context) {
        let mut data = self.data.borrow_mut();
        if data.prev_props.is_none() {
            data.prev_props = Some(data.props.clone());
        }
        if data.prev_context.is_none() {
            data.prev_context = Some(data.context.clone());
        }
        data.props = props;
        data.context = context;
    }

    /// The values from before the pending update.
    pub fn previous(&self) -> Snapshot {
        let data = self.data.borrow();
        Snapshot {
            props: data.prev_props.clone().unwrap_or_else(|| data.props.clone()),
            state: data.prev_state.clone().unwrap_or_else(|| data.state.clone()),
            context: data.prev_context.clone().unwrap_or_else(|| data.context.clone()),
        }
    }

    pub fn clear_previous(&self) {
        let mut data = self.data.borrow_mut();
        data.prev_props = None;
        data.prev_state = None;
        data.prev_context = None;
    }

    pub fn push_callback(&self, callback: Callback) {
        self.data.borrow_mut().callbacks.push(callback);
    }

    /// Runs the queued post-render callbacks in FIFO order.
    pub fn run_callbacks(&self) {
        let callbacks = core::mem::take(&mut self.data.borrow_mut().callbacks);
        for callback in callbacks {
            callback();
        }
    }

    fn apply(&self, update: StateUpdate) -> bool {
        let partial = match update {
            StateUpdate::Partial(partial) => Some(partial),
            StateUpdate::With(updater) => {
                let (state, props) = {
                    let data = self.data.borrow();
                    (data.state.clone(), data.props.clone())
                };
                updater(&state, &props)
            }
        };
        let Some(partial) = partial else {
            return false;
        };
        let mut data = self.data.borrow_mut();
        if data.prev_state.is_none() {
            data.prev_state = Some(data.state.clone());
        }
        data.state.merge(&partial);
        true
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name())
            .field("dirty", &self.dirty.get())
            .field("mounted", &self.mounted.get())
            .field("unmounted", &self.unmounted.get())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Handles
// ============================================================================

/// A cheap, clonable reference to a component instance.
///
/// Once the instance is unmounted every operation on the handle is a no-op.
#[derive(Clone)]
pub struct Handle {
    instance: Weak<Instance>,
}

impl Handle {
    fn live(&self) -> Option<Rc<Instance>> {
        let instance = self.instance.upgrade()?;
        if instance.is_unmounted() {
            tracing::trace!(component = instance.name(), "ignoring update of unmounted component");
            return None;
        }
        Some(instance)
    }

    /// Shallowly merges `partial` into the state and schedules a re-render.
    pub fn set_state(&self, partial: State) {
        self.enqueue_state(StateUpdate::Partial(partial), None);
    }

    /// Like [`set_state`](Self::set_state), computing the entries from the
    /// current state and props. Returning `None` skips the update.
    pub fn set_state_with(&self, updater: impl FnOnce(&State, &Props) -> Option<State> + 'static) {
        self.enqueue_state(StateUpdate::With(Box::new(updater)), None);
    }

    /// Like [`set_state`](Self::set_state), running `callback` once the
    /// re-render completed.
    pub fn set_state_then(&self, partial: State, callback: impl FnOnce() + 'static) {
        self.enqueue_state(StateUpdate::Partial(partial), Some(Box::new(callback)));
    }

    /// Applies a state update now and schedules the re-render.
    ///
    /// The merge happens immediately; rendering never does. The first merge
    /// of a batch remembers the previous state for `did_update`.
    pub fn enqueue_state(&self, update: StateUpdate, callback: Option<Box<dyn FnOnce()>>) {
        let Some(instance) = self.live() else {
            return;
        };
        if !instance.apply(update) {
            return;
        }
        if let Some(callback) = callback {
            instance.push_callback(callback);
        }
        if let Some(runtime) = instance.runtime.upgrade() {
            runtime.enqueue(&instance);
        }
    }

    /// Re-renders the component now, bypassing `should_update`.
    ///
    /// Called from within one of the component's own hooks, the render
    /// cannot run now; it is queued like a `set_state` instead and still
    /// bypasses the guard when the queue is flushed.
    ///
    /// # Errors
    ///
    /// Returns the error of any render in the updated subtree.
    pub fn force_update(&self) -> Result<(), RenderError> {
        let Some(instance) = self.live() else {
            return Ok(());
        };
        let Some(runtime) = instance.runtime.upgrade() else {
            return Ok(());
        };
        runtime.force(&instance)
    }

    /// Queues `callback` and re-renders the component now.
    ///
    /// # Errors
    ///
    /// See [`force_update`](Self::force_update).
    pub fn force_update_then(&self, callback: impl FnOnce() + 'static) -> Result<(), RenderError> {
        if let Some(instance) = self.live() {
            instance.push_callback(Box::new(callback));
        }
        self.force_update()
    }

    /// Current props. Empty once the instance is gone.
    #[must_use]
    pub fn props(&self) -> Props {
        self.instance
            .upgrade()
            .map(|instance| instance.data.borrow().props.clone())
            .unwrap_or_default()
    }

    /// Current state. Empty once the instance is gone.
    #[must_use]
    pub fn state(&self) -> State {
        self.instance
            .upgrade()
            .map(|instance| instance.data.borrow().state.clone())
            .unwrap_or_default()
    }

    /// Returns `true` between `did_mount` and `will_unmount`.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.instance
            .upgrade()
            .is_some_and(|instance| instance.is_mounted())
    }

    /// Name of the component type.
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        self.instance.upgrade().map(|instance| instance.name())
    }

    /// The host node the component currently renders to.
    #[must_use]
    pub fn host_node(&self) -> Option<HostNode> {
        let instance = self.live()?;
        let runtime = instance.runtime.upgrade()?;
        let tree = runtime.tree.borrow();
        tree.host_node(instance.record()?)
    }

    /// Returns `true` if both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.instance.ptr_eq(&other.instance)
    }
}

#[cfg(test)]
impl Handle {
    pub(crate) const fn dangling() -> Self {
        Self {
            instance: Weak::new(),
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance.upgrade() {
            Some(instance) => f.debug_tuple("Handle").field(&instance.name()).finish(),
            None => f.write_str("Handle(<dropped>)"),
        }
    }
}

// ============================================================================
// Scopes
// ============================================================================

/// What a hook sees of its component: a handle plus a snapshot of props,
/// state and context.
///
/// The snapshot does not change while the hook runs; a `set_state` from the
/// hook becomes visible to the next render.
#[derive(Debug, Clone)]
pub struct Scope {
    handle: Handle,
    props: Props,
    state: State,
    context: Context,
}

impl Scope {
    pub(crate) fn new(instance: &Instance, props: Props, state: State, context: Context) -> Self {
        Self {
            handle: instance.handle(),
            props,
            state,
            context,
        }
    }

    /// Props of the component.
    #[must_use]
    pub const fn props(&self) -> &Props {
        &self.props
    }

    /// State of the component.
    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Context inherited from ancestors.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// A handle that outlives the hook, e.g. for event listeners.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// See [`Handle::set_state`].
    pub fn set_state(&self, partial: State) {
        self.handle.set_state(partial);
    }

    /// See [`Handle::set_state_with`].
    pub fn set_state_with(&self, updater: impl FnOnce(&State, &Props) -> Option<State> + 'static) {
        self.handle.set_state_with(updater);
    }

    /// See [`Handle::force_update`].
    ///
    /// # Errors
    ///
    /// Returns the error of any render in the updated subtree.
    pub fn force_update(&self) -> Result<(), RenderError> {
        self.handle.force_update()
    }
}
