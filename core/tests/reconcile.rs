//! Host-level effects of reconciliation.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{children, html, mutations, setup};
use ripple_core::{
    Component, Construct, Context, Document, Event, Host, Mutation, Node, Props, RenderError, Runtime, Scope, Value,
};

#[test]
fn test_text_updates_touch_only_changed_nodes() {
    let (runtime, container) = setup();
    let tree = |second: &str| Node::element("p").child("first").child(second.to_string());

    runtime.render(&tree("a"), container).unwrap();
    let p = children(&runtime, container)[0];
    let texts = children(&runtime, p);
    mutations(&runtime);

    runtime.render(&tree("b"), container).unwrap();
    assert_eq!(mutations(&runtime), [Mutation::SetText { node: texts[1] }]);
    assert_eq!(html(&runtime, container), "<p>firstb</p>");
}

#[test]
fn test_attribute_diff_is_minimal() {
    let (runtime, container) = setup();
    runtime
        .render(
            &Node::element("input")
                .attr("type", "text")
                .attr("value", "a")
                .attr("disabled", true),
            container,
        )
        .unwrap();
    let input = children(&runtime, container)[0];
    mutations(&runtime);

    runtime
        .render(
            &Node::element("input")
                .attr("type", "text")
                .attr("value", "b")
                .attr("placeholder", "name"),
            container,
        )
        .unwrap();

    let mut changes = mutations(&runtime);
    changes.sort_by_key(|mutation| format!("{mutation:?}"));
    assert_eq!(
        changes,
        [
            Mutation::RemoveAttribute {
                node: input,
                name: "disabled".into()
            },
            Mutation::SetAttribute {
                node: input,
                name: "placeholder".into()
            },
            Mutation::SetAttribute {
                node: input,
                name: "value".into()
            },
        ]
    );
}

#[test]
fn test_listeners_are_stable_across_renders() {
    let (runtime, container) = setup();
    let hits = Rc::new(Cell::new(0));
    let button = |step: i32| {
        let hits = hits.clone();
        Node::element("button").on("click", move |_| hits.set(hits.get() + step))
    };

    runtime.render(&button(1), container).unwrap();
    let node = children(&runtime, container)[0];
    assert!(runtime.dispatch(node, Event::new("click")));
    assert_eq!(hits.get(), 1);
    mutations(&runtime);

    runtime.render(&button(10), container).unwrap();
    assert!(mutations(&runtime).is_empty());
    runtime.dispatch(node, Event::new("click"));
    assert_eq!(hits.get(), 11);

    runtime.render(&Node::element("button"), container).unwrap();
    assert_eq!(
        mutations(&runtime),
        [Mutation::Unlisten {
            node,
            event: "click".into()
        }]
    );
    assert!(!runtime.dispatch(node, Event::new("click")));
}

#[test]
fn test_dispatch_bubbles_until_stopped() {
    let (runtime, container) = setup();
    let order = Rc::new(std::cell::RefCell::new(Vec::new()));
    let tree = |stop: bool| {
        let outer = order.clone();
        let inner = order.clone();
        Node::element("div")
            .on("click", move |event: &Event| {
                outer.borrow_mut().push(("div", event.target(), event.current_target()));
            })
            .child(Node::element("button").child("go").on("click", move |event: &Event| {
                inner.borrow_mut().push(("button", event.target(), event.current_target()));
                if stop {
                    event.stop_propagation();
                }
            }))
    };

    runtime.render(&tree(false), container).unwrap();
    let div = children(&runtime, container)[0];
    let button = children(&runtime, div)[0];
    let text = children(&runtime, button)[0];

    assert!(runtime.dispatch(text, Event::new("click")));
    assert_eq!(
        *order.borrow(),
        [
            ("button", Some(text), Some(button)),
            ("div", Some(text), Some(div)),
        ]
    );

    order.borrow_mut().clear();
    runtime.render(&tree(true), container).unwrap();
    runtime.dispatch(button, Event::new("click"));
    assert_eq!(*order.borrow(), [("button", Some(button), Some(button))]);

    assert!(!runtime.dispatch(div, Event::new("keydown")));
}

/// Renders a component that renders the element.
struct Outer;

impl Component for Outer {
    fn render(&mut self, _cx: &Scope) -> Result<Node, RenderError> {
        Ok(Node::component::<Inner>())
    }
}

impl Construct for Outer {
    fn construct(_props: &Props, _context: &Context) -> Self {
        Self
    }
}

struct Inner;

impl Component for Inner {
    fn render(&mut self, _cx: &Scope) -> Result<Node, RenderError> {
        Ok(Node::element("article"))
    }
}

impl Construct for Inner {
    fn construct(_props: &Props, _context: &Context) -> Self {
        Self
    }
}

#[test]
fn test_find_component_returns_outermost() {
    let (runtime, container) = setup();
    let root = runtime
        .render(
            &Node::element("main").child(Node::component::<Outer>()),
            container,
        )
        .unwrap();
    let main = root.host_node().unwrap();
    let article = children(&runtime, main)[0];

    let found = runtime.find_component(article).unwrap();
    assert!(found.name().unwrap().ends_with("Outer"));
    assert_eq!(found.host_node(), Some(article));
    assert!(runtime.find_component(main).is_none());
}

/// Forgets to implement render.
struct Blank;

impl Component for Blank {}

impl Construct for Blank {
    fn construct(_props: &Props, _context: &Context) -> Self {
        Self
    }
}

#[test]
fn test_missing_render_is_reported() {
    let (runtime, container) = setup();
    let error = runtime
        .render(
            &Node::element("div").child(Node::component::<Blank>()),
            container,
        )
        .unwrap_err();

    assert!(matches!(error, RenderError::MissingRender { component } if component.ends_with("Blank")));
    assert_eq!(html(&runtime, container), "");
    assert!(runtime.root(container).is_none());
}

#[test]
fn test_type_change_inside_list_keeps_order() {
    let (runtime, container) = setup();
    let tree = |middle: Node| {
        Node::element("ul")
            .child(Node::element("li").child("a"))
            .child(middle)
            .child(Node::element("li").child("c"))
    };

    runtime
        .render(&tree(Node::element("li").child("b")), container)
        .unwrap();
    runtime
        .render(&tree(Node::element("hr").attr("class", "sep")), container)
        .unwrap();

    assert_eq!(
        html(&runtime, container),
        "<ul><li>a</li><hr class=\"sep\"></hr><li>c</li></ul>"
    );
}

fn card(_props: &Props, _context: &Context) -> Node {
    Node::element("div")
        .attr("class", "new")
        .child(Node::element("p").child("fresh"))
}

#[test]
fn test_render_into_adopts_existing_nodes() {
    let mut document = Document::new();
    let container = document.create_container();
    let div = document.create_element("div");
    document.set_attribute(div, "class", &Value::from("old"));
    document.set_attribute(div, "title", &Value::from("x"));
    let p = document.create_element("p");
    let text = document.create_text("stale");
    let span = document.create_element("span");
    document.insert_before(p, text, None);
    document.insert_before(div, p, None);
    document.insert_before(div, span, None);
    document.insert_before(container, div, None);
    document.take_mutations();
    let runtime = Runtime::new(document);

    let root = runtime
        .render_into(&Node::function("card", card), container, div)
        .unwrap();
    assert_eq!(root.host_node(), Some(div));
    assert_eq!(children(&runtime, div), [p]);
    assert_eq!(children(&runtime, p), [text]);
    assert_eq!(html(&runtime, container), "<div class=\"new\"><p>fresh</p></div>");

    let log = mutations(&runtime);
    assert!(!log.iter().any(|mutation| matches!(mutation, Mutation::Insert { .. })));
    assert!(log.contains(&Mutation::Remove { node: span }));
    assert!(log.contains(&Mutation::RemoveAttribute {
        node: div,
        name: "title".to_string()
    }));
    assert!(log.contains(&Mutation::SetText { node: text }));

    runtime.render(&Node::function("card", card), container).unwrap();
    assert!(mutations(&runtime).is_empty());
}

#[test]
fn test_render_into_replaces_mismatched_node() {
    let mut document = Document::new();
    let container = document.create_container();
    let section = document.create_element("section");
    let aside = document.create_element("aside");
    document.insert_before(container, section, None);
    document.insert_before(container, aside, None);
    let runtime = Runtime::new(document);

    let root = runtime
        .render_into(&Node::element("div").child("new"), container, section)
        .unwrap();
    assert_ne!(root.host_node(), Some(section));
    assert_eq!(html(&runtime, container), "<div>new</div><aside></aside>");
    assert!(!runtime.host::<Document>().unwrap().contains(section));
}
