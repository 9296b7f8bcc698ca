//! # Ripple Core
//!
//! The reconciliation engine and render scheduler behind Ripple.
//!
//! Components describe the UI they want as trees of [`Node`] descriptors. The
//! [`Runtime`] keeps a mounted tree of records for every live position, diffs
//! each new descriptor tree against it and applies the smallest set of
//! mutations to a [`Host`] (the real output tree).
//!
//! ```text
//! event ─► Handle::set_state ─► scheduler (dedup) ─► flush (shallowest first)
//!                                                      │
//!                                                      ▼
//!            lifecycle hooks ◄── host mutations ◄── reconcile(record, node)
//! ```
//!
//! # Example
//!
//! ```
//! use ripple_core::{Component, Construct, Context, Document, Node, Props, RenderError, Runtime, Scope};
//!
//! struct Hello;
//!
//! impl Component for Hello {
//!     fn render(&mut self, cx: &Scope) -> Result<Node, RenderError> {
//!         let name = cx.props().get_str("name").unwrap_or("world");
//!         Ok(Node::element("p").child(format!("Hello, {name}!")))
//!     }
//! }
//!
//! impl Construct for Hello {
//!     fn construct(_props: &Props, _context: &Context) -> Self {
//!         Self
//!     }
//! }
//!
//! let mut document = Document::new();
//! let container = document.create_container();
//! let runtime = Runtime::new(document);
//!
//! runtime
//!     .render(&Node::component::<Hello>().attr("name", "Ripple"), container)
//!     .unwrap();
//!
//! let html = runtime.host::<Document>().unwrap().inner_html(container);
//! assert_eq!(html, "<p>Hello, Ripple!</p>");
//! ```

extern crate alloc;

#[macro_use]
mod macros;

pub mod component;
pub mod document;
mod error;
pub mod host;
mod instance;
pub mod node;
pub mod options;
mod reconcile;
pub mod record;
mod runtime;
pub mod scheduler;
pub mod value;

pub use component::{Component, ComponentType, Construct, Pure};
pub use document::{Document, Mutation};
pub use error::RenderError;
pub use host::{Host, HostNode};
pub use instance::{Handle, Scope, StateUpdate};
pub use node::{IntoChildren, Node, NodeKind, NodeRef};
pub use record::RecordId;
pub use runtime::{Config, RootHandle, Runtime};
pub use scheduler::{Defer, FlushTask, Manual};
pub use value::{Callback, Context, Event, Props, State, Str, Value};
