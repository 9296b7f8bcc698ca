//! Process-wide lifecycle observers.
//!
//! Tooling such as inspectors or test harnesses can watch every component of
//! the current thread without touching the components themselves:
//!
//! ```
//! use ripple_core::options::{self, Hook};
//!
//! let restore = options::observe(Hook::AfterMount, |handle| {
//!     println!("mounted {:?}", handle.name());
//! });
//! // ... render ...
//! restore.restore();
//! ```
//!
//! Observers chain: a newly installed observer runs first, then the one it
//! replaced. Dropping the returned [`Restore`] guard reinstates the previous
//! chain.

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::instance::Handle;

/// Lifecycle points that can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// After `did_mount`.
    AfterMount,
    /// After `did_update`.
    AfterUpdate,
    /// After `will_unmount`, before the subtree is torn down.
    BeforeUnmount,
}

type Observer = Rc<dyn Fn(&Handle)>;

#[derive(Default)]
struct Observers {
    after_mount: Option<Observer>,
    after_update: Option<Observer>,
    before_unmount: Option<Observer>,
}

impl Observers {
    const fn slot(&mut self, hook: Hook) -> &mut Option<Observer> {
        match hook {
            Hook::AfterMount => &mut self.after_mount,
            Hook::AfterUpdate => &mut self.after_update,
            Hook::BeforeUnmount => &mut self.before_unmount,
        }
    }
}

std::thread_local! {
    static OBSERVERS: RefCell<Observers> = RefCell::default();
}

/// Installs `observer` for `hook` in front of the current chain.
#[must_use = "dropping the guard uninstalls the observer; call `leak` to keep it"]
pub fn observe(hook: Hook, observer: impl Fn(&Handle) + 'static) -> Restore {
    OBSERVERS.with(|observers| {
        let mut observers = observers.borrow_mut();
        let slot = observers.slot(hook);
        let previous = slot.clone();
        let next = previous.clone();
        let chained: Observer = Rc::new(move |handle: &Handle| {
            observer(handle);
            if let Some(next) = &next {
                next(handle);
            }
        });
        *slot = Some(chained);
        Restore {
            hook,
            previous: Some(previous),
        }
    })
}

/// Notifies the observers of `hook`. No borrow is held while they run.
pub(crate) fn notify(hook: Hook, handle: &Handle) {
    let observer = OBSERVERS.with(|observers| observers.borrow_mut().slot(hook).clone());
    if let Some(observer) = observer {
        observer(handle);
    }
}

/// Guard returned by [`observe`].
pub struct Restore {
    hook: Hook,
    previous: Option<Option<Observer>>,
}

impl_debug!(Restore);

impl Restore {
    /// Reinstates the chain that was installed before [`observe`].
    pub fn restore(mut self) {
        self.reinstate();
    }

    /// Keeps the observer installed for the rest of the thread's life.
    pub fn leak(mut self) {
        self.previous = None;
    }

    fn reinstate(&mut self) {
        if let Some(previous) = self.previous.take() {
            OBSERVERS.with(|observers| {
                *observers.borrow_mut().slot(self.hook) = previous;
            });
        }
    }
}

impl Drop for Restore {
    fn drop(&mut self) {
        self.reinstate();
    }
}
