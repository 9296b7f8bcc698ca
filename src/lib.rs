#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]

pub mod logging;
/// Deferring scheduled renders onto an async executor.
pub mod task;

#[doc(inline)]
pub use ripple_core::{
    Callback, Component, ComponentType, Config, Construct, Context, Defer, Document, Event, FlushTask, Handle, Host,
    HostNode, IntoChildren, Manual, Mutation, Node, NodeKind, NodeRef, Props, Pure, RecordId, RenderError,
    RootHandle, Runtime, Scope, State, StateUpdate, Str, Value, options, props,
};

/// Re-export of `tracing`, the logging facade every Ripple crate reports through.
pub use tracing as log;

pub mod prelude {
    //! The types most applications need, for a single glob import.
    //!
    //! # Example
    //!
    //! ```rust
    //! use ripple::prelude::*;
    //!
    //! struct Empty;
    //!
    //! impl Component for Empty {
    //!     fn render(&mut self, _cx: &Scope) -> Result<Node, RenderError> {
    //!         Ok(Node::element("div"))
    //!     }
    //! }
    //! ```
    pub use crate::task::Spawner;
    pub use ripple_core::{
        Component, Construct, Context, Event, Handle, Node, NodeRef, Props, Pure, RenderError, Runtime, Scope,
        State, props,
    };
}
