//! Flushing scheduled renders on a `futures` executor.

use futures::task::{LocalSpawn, LocalSpawnExt};
use ripple_core::{Defer, FlushTask};

/// Runs each scheduled flush as a task on a local executor.
///
/// The flush happens the next time the executor polls, so every `set_state`
/// issued before that lands in the same batch.
///
/// ```
/// use futures::executor::LocalPool;
/// use ripple::{Config, Document, Runtime};
/// use ripple::task::Spawner;
///
/// let mut pool = LocalPool::new();
/// let mut document = Document::new();
/// let container = document.create_container();
/// let runtime = Runtime::with_config(document, Config::new().defer(Spawner::new(pool.spawner())));
/// # let _ = (runtime, container);
/// pool.run_until_stalled();
/// ```
#[derive(Debug, Clone)]
pub struct Spawner<S> {
    spawner: S,
}

impl<S> Spawner<S> {
    /// Wraps a local spawner such as
    /// [`LocalSpawner`](futures::executor::LocalSpawner).
    pub const fn new(spawner: S) -> Self {
        Self { spawner }
    }
}

impl<S: LocalSpawn + 'static> Defer for Spawner<S> {
    fn schedule(&self, task: FlushTask) {
        let spawned = self.spawner.spawn_local(async move {
            if let Err(error) = task.run() {
                tracing::error!(%error, "scheduled render failed");
            }
        });
        if let Err(error) = spawned {
            tracing::warn!(%error, "executor is shut down, render stays pending");
        }
    }
}
