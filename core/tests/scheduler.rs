//! Batching, ordering and failure handling of scheduled renders.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{html, log, setup, take_log};
use ripple_core::{
    Component, Config, Construct, Context, Defer, Document, FlushTask, Handle, HostNode, Node, Props, RenderError,
    Runtime, Scope, State, props,
};

/// Renders a `Child` while `show` is set.
struct Parent;

impl Component for Parent {
    fn initial_state(&self, _props: &Props, _context: &Context) -> State {
        props! { "show" => true, "n" => 0 }
    }

    fn render(&mut self, cx: &Scope) -> Result<Node, RenderError> {
        log("parent render");
        let state = cx.state();
        let n = state.get_number("n").unwrap_or_default();
        let mut div = Node::element("div");
        if state.get_bool("show").unwrap_or_default() {
            div = div.child(Node::component::<Child>().attr("n", n));
        }
        Ok(div)
    }
}

impl Construct for Parent {
    fn construct(_props: &Props, _context: &Context) -> Self {
        Self
    }
}

/// Shows the parent's `n` next to its own `local` state.
struct Child;

impl Component for Child {
    fn initial_state(&self, _props: &Props, _context: &Context) -> State {
        props! { "local" => 0 }
    }

    fn render(&mut self, cx: &Scope) -> Result<Node, RenderError> {
        log("child render");
        let n = cx.props().get_number("n").unwrap_or_default();
        let local = cx.state().get_number("local").unwrap_or_default();
        Ok(Node::text(format!("{n}/{local}")))
    }
}

impl Construct for Child {
    fn construct(_props: &Props, _context: &Context) -> Self {
        Self
    }
}

/// Mounts a `Parent` and returns handles to it and its child.
fn mount_family(runtime: &Runtime, container: HostNode) -> (Handle, Handle) {
    let root = runtime.render(&Node::component::<Parent>(), container).unwrap();
    let parent = root.component().unwrap();
    let div = root.host_node().unwrap();
    let child = runtime
        .find_component(common::children(runtime, div)[0])
        .unwrap();
    assert_ne!(child, parent);
    take_log();
    (parent, child)
}

#[test]
fn test_flush_renders_parents_first() {
    let (runtime, container) = setup();
    let (parent, child) = mount_family(&runtime, container);

    child.set_state(props! { "local" => 7 });
    parent.set_state(props! { "n" => 1 });
    assert_eq!(runtime.pending(), 2);

    runtime.rerender().unwrap();
    assert_eq!(take_log(), ["parent render", "child render"]);
    assert_eq!(html(&runtime, container), "<div>1/7</div>");
    assert_eq!(runtime.pending(), 0);
}

#[test]
fn test_flush_skips_removed_components() {
    let (runtime, container) = setup();
    let (parent, child) = mount_family(&runtime, container);

    child.set_state(props! { "local" => 1 });
    parent.set_state(props! { "show" => false });
    runtime.rerender().unwrap();

    assert_eq!(take_log(), ["parent render"]);
    assert_eq!(html(&runtime, container), "<div></div>");
    assert!(!child.is_mounted());

    child.set_state(props! { "local" => 2 });
    assert_eq!(runtime.pending(), 0);
}

/// Bumps its count once more after every update until it reaches `limit`.
struct Chase;

impl Component for Chase {
    fn initial_state(&self, _props: &Props, _context: &Context) -> State {
        props! { "count" => 0 }
    }

    fn render(&mut self, cx: &Scope) -> Result<Node, RenderError> {
        Ok(Node::text(cx.state().get_number("count").unwrap_or_default().to_string()))
    }

    fn did_update(&mut self, cx: &Scope, _prev_props: &Props, _prev_state: &State, _prev_context: &Context) {
        let count = cx.state().get_number("count").unwrap_or_default();
        if count < cx.props().get_number("limit").unwrap_or_default() {
            cx.set_state(props! { "count" => count + 1.0 });
        }
    }
}

impl Construct for Chase {
    fn construct(_props: &Props, _context: &Context) -> Self {
        Self
    }
}

#[test]
fn test_state_set_during_flush_waits_for_next_batch() {
    let (runtime, container) = setup();
    let root = runtime
        .render(&Node::component::<Chase>().attr("limit", 3), container)
        .unwrap();
    let chase = root.component().unwrap();

    chase.set_state(props! { "count" => 1 });
    runtime.rerender().unwrap();
    assert_eq!(html(&runtime, container), "1");
    assert_eq!(runtime.pending(), 1);

    runtime.rerender().unwrap();
    assert_eq!(html(&runtime, container), "2");
    runtime.rerender().unwrap();
    assert_eq!(html(&runtime, container), "3");
    assert_eq!(runtime.pending(), 0);
}

/// Fails to render whenever its props or state say `fail`.
struct Fallible;

impl Component for Fallible {
    fn render(&mut self, cx: &Scope) -> Result<Node, RenderError> {
        let fail = cx.props().get_bool("fail").unwrap_or_default() || cx.state().get_bool("fail").unwrap_or_default();
        if fail {
            return Err(RenderError::component::<Self>("boom"));
        }
        log("fallible render");
        Ok(Node::element("b").child(cx.state().get_str("label").unwrap_or("ok").to_string()))
    }
}

impl Construct for Fallible {
    fn construct(_props: &Props, _context: &Context) -> Self {
        Self
    }
}

#[test]
fn test_failed_flush_keeps_output_and_requeues_rest() {
    let (runtime, container) = setup();
    let tree = Node::element("div")
        .child(Node::component::<Fallible>())
        .child(Node::component::<Fallible>());
    runtime.render(&tree, container).unwrap();
    let div = common::children(&runtime, container)[0];
    let first = runtime.find_component(common::children(&runtime, div)[0]).unwrap();
    let second = runtime.find_component(common::children(&runtime, div)[1]).unwrap();
    take_log();

    first.set_state(props! { "fail" => true });
    second.set_state(props! { "label" => "fresh" });

    let error = runtime.rerender().unwrap_err();
    assert!(matches!(error, RenderError::Component { ref message, .. } if message == "boom"));
    assert_eq!(html(&runtime, container), "<div><b>ok</b><b>ok</b></div>");
    assert_eq!(runtime.pending(), 1);

    runtime.rerender().unwrap();
    assert_eq!(take_log(), ["fallible render"]);
    assert_eq!(html(&runtime, container), "<div><b>ok</b><b>fresh</b></div>");
}

#[test]
fn test_failed_first_mount_leaves_container_empty() {
    let (runtime, container) = setup();
    let error = runtime
        .render(
            &Node::element("section").child(Node::component::<Fallible>().attr("fail", true)),
            container,
        )
        .unwrap_err();

    assert!(matches!(error, RenderError::Component { component, .. } if component.ends_with("Fallible")));
    assert_eq!(html(&runtime, container), "");
    assert!(runtime.root(container).is_none());

    runtime
        .render(&Node::element("section").child(Node::component::<Fallible>()), container)
        .unwrap();
    assert_eq!(html(&runtime, container), "<section><b>ok</b></section>");
}

/// Collects scheduled flushes instead of running them.
#[derive(Clone, Default)]
struct Collect(Rc<RefCell<Vec<FlushTask>>>);

impl Defer for Collect {
    fn schedule(&self, task: FlushTask) {
        self.0.borrow_mut().push(task);
    }
}

#[test]
fn test_custom_defer_gets_one_task_per_batch() {
    let tasks = Collect::default();
    let mut document = Document::new();
    let container = document.create_container();
    let runtime = Runtime::with_config(document, Config::new().defer(tasks.clone()));
    let (parent, child) = mount_family(&runtime, container);
    tasks.0.borrow_mut().clear();

    parent.set_state(props! { "n" => 5 });
    child.set_state(props! { "local" => 5 });
    parent.set_state(props! { "n" => 6 });
    assert_eq!(tasks.0.borrow().len(), 1);

    let task = tasks.0.borrow_mut().remove(0);
    assert!(task.is_live());
    task.run().unwrap();
    assert_eq!(html(&runtime, container), "<div>6/5</div>");
    assert_eq!(runtime.pending(), 0);

    child.set_state(props! { "local" => 9 });
    assert_eq!(tasks.0.borrow().len(), 1);

    drop(runtime);
    let task = tasks.0.borrow_mut().remove(0);
    assert!(!task.is_live());
    assert_eq!(task.run(), Ok(()));
}

#[test]
fn test_failed_scheduled_flush_reschedules_rest() {
    let tasks = Collect::default();
    let mut document = Document::new();
    let container = document.create_container();
    let runtime = Runtime::with_config(document, Config::new().defer(tasks.clone()));
    let tree = Node::element("div")
        .child(Node::component::<Fallible>())
        .child(Node::component::<Fallible>());
    runtime.render(&tree, container).unwrap();
    let div = common::children(&runtime, container)[0];
    let first = runtime.find_component(common::children(&runtime, div)[0]).unwrap();
    let second = runtime.find_component(common::children(&runtime, div)[1]).unwrap();
    tasks.0.borrow_mut().clear();

    first.set_state(props! { "fail" => true });
    second.set_state(props! { "label" => "seven" });
    let task = tasks.0.borrow_mut().remove(0);
    assert!(task.run().is_err());
    assert_eq!(runtime.pending(), 1);
    assert_eq!(tasks.0.borrow().len(), 1);

    second.set_state(props! { "label" => "eight" });
    assert_eq!(tasks.0.borrow().len(), 1);

    let task = tasks.0.borrow_mut().remove(0);
    task.run().unwrap();
    assert_eq!(html(&runtime, container), "<div><b>ok</b><b>eight</b></div>");
    assert_eq!(runtime.pending(), 0);
}
