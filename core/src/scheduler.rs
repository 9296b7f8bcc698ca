//! Render scheduling.
//!
//! `set_state` never renders synchronously. It marks the instance dirty and
//! pushes it onto the runtime's render queue; the first push after the queue
//! was last drained asks the configured [`Defer`] strategy to schedule a
//! [`FlushTask`]. A flush drains the queue as one batch, shallowest
//! components first, so a parent re-rendering its children makes their own
//! queued renders redundant.

use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};

use crate::error::RenderError;
use crate::instance::Instance;
use crate::runtime::Shared;

/// Decides when a scheduled flush runs.
pub trait Defer: 'static {
    /// Called once per batch, when the first component becomes dirty.
    fn schedule(&self, task: FlushTask);
}

/// Never flushes on its own; pending renders run on
/// [`Runtime::rerender`](crate::Runtime::rerender).
#[derive(Debug, Clone, Copy, Default)]
pub struct Manual;

impl Defer for Manual {
    fn schedule(&self, _task: FlushTask) {}
}

/// A request to flush the render queue of a runtime.
///
/// The task only holds a weak reference; running it after the runtime was
/// dropped does nothing.
#[derive(Clone)]
pub struct FlushTask {
    runtime: Weak<Shared>,
}

impl_debug!(FlushTask);

impl FlushTask {
    pub(crate) const fn new(runtime: Weak<Shared>) -> Self {
        Self { runtime }
    }

    /// Flushes the pending batch.
    ///
    /// # Errors
    ///
    /// Returns the first render error of the batch. The components that did
    /// not get to render stay queued.
    pub fn run(self) -> Result<(), RenderError> {
        self.runtime.upgrade().map_or(Ok(()), |runtime| runtime.flush())
    }

    /// Returns `true` while the runtime is alive.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.runtime.strong_count() > 0
    }
}

/// Dirty components waiting for the next flush.
#[derive(Debug, Default)]
pub(crate) struct RenderQueue {
    pending: RefCell<Vec<Rc<Instance>>>,
    scheduled: Cell<bool>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an instance. Returns `true` when a flush has to be scheduled.
    pub fn push(&self, instance: Rc<Instance>) -> bool {
        self.pending.borrow_mut().push(instance);
        !self.scheduled.replace(true)
    }

    /// Drains the queue into a batch ordered by depth, shallowest first.
    /// Pushes from now on start a new batch.
    pub fn take(&self) -> Vec<Rc<Instance>> {
        self.scheduled.set(false);
        let mut batch = core::mem::take(&mut *self.pending.borrow_mut());
        batch.sort_by_key(|instance| instance.depth());
        batch
    }

    /// Puts back the unprocessed rest of a failed batch, ahead of anything
    /// queued meanwhile. Returns `true` when a flush has to be scheduled.
    pub fn requeue(&self, rest: Vec<Rc<Instance>>) -> bool {
        if rest.is_empty() {
            return false;
        }
        let mut pending = self.pending.borrow_mut();
        let queued = core::mem::replace(&mut *pending, rest);
        pending.extend(queued);
        !self.scheduled.replace(true)
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }
}
