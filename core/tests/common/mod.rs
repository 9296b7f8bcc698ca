#![allow(dead_code)]

use std::cell::RefCell;

use ripple_core::{Document, HostNode, Mutation, Runtime};

std::thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Appends an entry to the per-thread hook log.
pub fn log(entry: impl Into<String>) {
    LOG.with(|log| log.borrow_mut().push(entry.into()));
}

/// Drains the per-thread hook log.
pub fn take_log() -> Vec<String> {
    LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

pub fn setup() -> (Runtime, HostNode) {
    let mut document = Document::new();
    let container = document.create_container();
    (Runtime::new(document), container)
}

pub fn html(runtime: &Runtime, node: HostNode) -> String {
    runtime.host::<Document>().unwrap().inner_html(node)
}

pub fn mutations(runtime: &Runtime) -> Vec<Mutation> {
    runtime.host_mut::<Document>().unwrap().take_mutations()
}

pub fn children(runtime: &Runtime, node: HostNode) -> Vec<HostNode> {
    runtime.host::<Document>().unwrap().children(node).to_vec()
}
