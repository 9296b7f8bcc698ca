//! Automatic flushing through a `futures` local executor.

use std::cell::Cell;
use std::rc::Rc;

use futures::executor::LocalPool;
use ripple::prelude::*;
use ripple::task::Spawner;
use ripple::{Config, Document, HostNode};

/// Counts its renders and shows `count`.
struct Counter {
    renders: Rc<Cell<usize>>,
}

thread_local! {
    static RENDERS: Rc<Cell<usize>> = Rc::new(Cell::new(0));
}

impl Component for Counter {
    fn initial_state(&self, _props: &Props, _context: &Context) -> State {
        props! { "count" => 0 }
    }

    fn render(&mut self, cx: &Scope) -> Result<Node, RenderError> {
        self.renders.set(self.renders.get() + 1);
        let count = cx.state().get_number("count").unwrap_or_default();
        if count < 0.0 {
            return Err(RenderError::component::<Self>("negative"));
        }
        Ok(Node::element("span").child(count))
    }
}

impl Construct for Counter {
    fn construct(_props: &Props, _context: &Context) -> Self {
        Self {
            renders: RENDERS.with(Clone::clone),
        }
    }
}

fn setup(pool: &LocalPool) -> (Runtime, HostNode) {
    let mut document = Document::new();
    let container = document.create_container();
    let config = Config::new().defer(Spawner::new(pool.spawner()));
    (Runtime::with_config(document, config), container)
}

fn html(runtime: &Runtime, container: HostNode) -> String {
    runtime.host::<Document>().unwrap().inner_html(container)
}

#[test]
fn test_spawner_flushes_on_next_poll() {
    let mut pool = LocalPool::new();
    let (runtime, container) = setup(&pool);
    let counter = runtime
        .render(&Node::component::<Counter>(), container)
        .unwrap()
        .component()
        .unwrap();
    let renders = RENDERS.with(Clone::clone);
    renders.set(0);

    counter.set_state(props! { "count" => 1 });
    counter.set_state(props! { "count" => 2 });
    assert_eq!(html(&runtime, container), "<span>0</span>");

    pool.run_until_stalled();
    assert_eq!(html(&runtime, container), "<span>2</span>");
    assert_eq!(renders.get(), 1);
    assert_eq!(runtime.pending(), 0);

    counter.set_state(props! { "count" => 3 });
    pool.run_until_stalled();
    assert_eq!(html(&runtime, container), "<span>3</span>");
    assert_eq!(renders.get(), 2);
}

#[test]
fn test_failed_scheduled_flush_keeps_output() {
    let mut pool = LocalPool::new();
    let (runtime, container) = setup(&pool);
    let counter = runtime
        .render(&Node::component::<Counter>(), container)
        .unwrap()
        .component()
        .unwrap();

    counter.set_state(props! { "count" => -1 });
    pool.run_until_stalled();
    assert_eq!(html(&runtime, container), "<span>0</span>");

    counter.set_state(props! { "count" => 5 });
    pool.run_until_stalled();
    assert_eq!(html(&runtime, container), "<span>5</span>");
}

#[test]
fn test_dropped_runtime_is_not_flushed() {
    let mut pool = LocalPool::new();
    let (runtime, container) = setup(&pool);
    let counter = runtime
        .render(&Node::component::<Counter>(), container)
        .unwrap()
        .component()
        .unwrap();

    counter.set_state(props! { "count" => 1 });
    drop(runtime);
    pool.run_until_stalled();
    assert!(!counter.is_mounted());
}
