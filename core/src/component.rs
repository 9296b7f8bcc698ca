//! The component model.
//!
//! A component is any type implementing [`Component`]. Every lifecycle hook
//! has a default no-op body, so a component only spells out the hooks it
//! cares about. Props, state and context live in the engine-owned instance
//! and are handed to hooks through a [`Scope`].
//!
//! Hook order for a position whose type stays stable:
//!
//! ```text
//! construct → initial_state → will_mount → render → (attach) → did_mount
//!   ↳ will_receive_props → should_update ─false─► (commit, stop)
//!                              │ true
//!                              ▼
//!                         will_update → render → (patch) → did_update → callbacks
//! will_unmount → (children unmounted, node detached)
//! ```

use core::any::{TypeId, type_name};
use core::fmt;

use crate::error::RenderError;
use crate::instance::Scope;
use crate::node::Node;
use crate::value::{Context, Props, State};

/// Lifecycle hooks and the render function of a component.
pub trait Component: 'static {
    /// Initial state. Defaults to an empty bag.
    fn initial_state(&self, _props: &Props, _context: &Context) -> State {
        State::new()
    }

    /// Produces the single child descriptor of this component.
    ///
    /// # Errors
    ///
    /// The default implementation fails with [`RenderError::MissingRender`]:
    /// a component that renders must override it.
    fn render(&mut self, _cx: &Scope) -> Result<Node, RenderError> {
        Err(RenderError::MissingRender {
            component: type_name::<Self>(),
        })
    }

    /// Runs before the first render.
    fn will_mount(&mut self, _cx: &Scope) {}

    /// Runs once the rendered node is attached to the document.
    fn did_mount(&mut self, _cx: &Scope) {}

    /// Runs before the rendered subtree is torn down.
    fn will_unmount(&mut self, _cx: &Scope) {}

    /// Runs when the parent re-renders this position, before the new props are
    /// committed. State set from here is merged into the same pass.
    fn will_receive_props(&mut self, _cx: &Scope, _next_props: &Props, _next_context: &Context) {}

    /// Update guard. Returning `false` skips render, [`will_update`] and
    /// [`did_update`] while still committing the new props and state.
    ///
    /// The scope exposes the values from before the update.
    ///
    /// [`will_update`]: Component::will_update
    /// [`did_update`]: Component::did_update
    fn should_update(
        &mut self,
        _cx: &Scope,
        _next_props: &Props,
        _next_state: &State,
        _next_context: &Context,
    ) -> bool {
        true
    }

    /// Runs before a re-render that was not vetoed by [`should_update`](Component::should_update).
    fn will_update(
        &mut self,
        _cx: &Scope,
        _next_props: &Props,
        _next_state: &State,
        _next_context: &Context,
    ) {
    }

    /// Runs after a re-render with the values from before the update.
    fn did_update(
        &mut self,
        _cx: &Scope,
        _prev_props: &Props,
        _prev_state: &State,
        _prev_context: &Context,
    ) {
    }

    /// Entries merged into the context of every descendant.
    fn child_context(&self, _cx: &Scope) -> Option<Context> {
        None
    }
}

/// Components that the engine can create from a descriptor.
pub trait Construct: Component + Sized {
    /// Builds a fresh instance for a newly mounted position.
    fn construct(props: &Props, context: &Context) -> Self;

    /// Props used for every key the descriptor leaves unset.
    #[must_use]
    fn default_props() -> Props {
        Props::new()
    }
}

// ============================================================================
// Component types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Identity {
    Type(TypeId),
    Function(usize),
}

type ConstructFn = fn(&Props, &Context) -> Box<dyn Component>;
type RenderFn = fn(&Props, &Context) -> Node;

#[derive(Clone, Copy)]
enum Factory {
    Construct(ConstructFn),
    Function(RenderFn),
}

/// Identity and factory of a component.
///
/// Struct components are identified by their [`TypeId`], function components
/// by the address of their function.
#[derive(Clone, Copy)]
pub struct ComponentType {
    identity: Identity,
    name: &'static str,
    factory: Factory,
    default_props: fn() -> Props,
}

impl ComponentType {
    /// The type of the struct component `C`.
    #[must_use]
    pub fn of<C: Construct>() -> Self {
        Self {
            identity: Identity::Type(TypeId::of::<C>()),
            name: type_name::<C>(),
            factory: Factory::Construct(construct_boxed::<C>),
            default_props: C::default_props,
        }
    }

    /// The type of a function component.
    #[must_use]
    pub fn function(name: &'static str, render: RenderFn) -> Self {
        Self {
            identity: Identity::Function(render as usize),
            name,
            factory: Factory::Function(render),
            default_props: Props::new,
        }
    }

    /// Human readable name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` for function components.
    #[must_use]
    pub const fn is_function(&self) -> bool {
        matches!(self.factory, Factory::Function(_))
    }

    /// The type's default props.
    #[must_use]
    pub fn default_props(&self) -> Props {
        (self.default_props)()
    }

    pub(crate) fn create(&self, props: &Props, context: &Context) -> Box<dyn Component> {
        match self.factory {
            Factory::Construct(construct) => construct(props, context),
            Factory::Function(render) => Box::new(Stateless { render }),
        }
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for ComponentType {}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentType").field(&self.name).finish()
    }
}

fn construct_boxed<C: Construct>(props: &Props, context: &Context) -> Box<dyn Component> {
    Box::new(C::construct(props, context))
}

/// Adapter rendering a function component.
struct Stateless {
    render: RenderFn,
}

impl Component for Stateless {
    fn render(&mut self, cx: &Scope) -> Result<Node, RenderError> {
        Ok((self.render)(cx.props(), cx.context()))
    }
}

// ============================================================================
// Pure components
// ============================================================================

/// Wraps a component and skips updates whose props and state are shallowly
/// equal to the current ones.
///
/// ```
/// use ripple_core::{Component, Construct, Context, Node, Props, Pure, RenderError, Scope};
///
/// struct Label;
///
/// impl Component for Label {
///     fn render(&mut self, cx: &Scope) -> Result<Node, RenderError> {
///         Ok(Node::text(cx.props().get_str("text").unwrap_or_default()))
///     }
/// }
///
/// impl Construct for Label {
///     fn construct(_: &Props, _: &Context) -> Self {
///         Self
///     }
/// }
///
/// let node = Node::component::<Pure<Label>>().attr("text", "hi");
/// # let _ = node;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pure<C>(pub C);

impl<C: Component> Component for Pure<C> {
    fn initial_state(&self, props: &Props, context: &Context) -> State {
        self.0.initial_state(props, context)
    }

    fn render(&mut self, cx: &Scope) -> Result<Node, RenderError> {
        self.0.render(cx)
    }

    fn will_mount(&mut self, cx: &Scope) {
        self.0.will_mount(cx);
    }

    fn did_mount(&mut self, cx: &Scope) {
        self.0.did_mount(cx);
    }

    fn will_unmount(&mut self, cx: &Scope) {
        self.0.will_unmount(cx);
    }

    fn will_receive_props(&mut self, cx: &Scope, next_props: &Props, next_context: &Context) {
        self.0.will_receive_props(cx, next_props, next_context);
    }

    fn should_update(
        &mut self,
        cx: &Scope,
        next_props: &Props,
        next_state: &State,
        next_context: &Context,
    ) -> bool {
        if cx.props().shallow_eq(next_props) && cx.state().shallow_eq(next_state) {
            return false;
        }
        self.0.should_update(cx, next_props, next_state, next_context)
    }

    fn will_update(
        &mut self,
        cx: &Scope,
        next_props: &Props,
        next_state: &State,
        next_context: &Context,
    ) {
        self.0.will_update(cx, next_props, next_state, next_context);
    }

    fn did_update(
        &mut self,
        cx: &Scope,
        prev_props: &Props,
        prev_state: &State,
        prev_context: &Context,
    ) {
        self.0.did_update(cx, prev_props, prev_state, prev_context);
    }

    fn child_context(&self, cx: &Scope) -> Option<Context> {
        self.0.child_context(cx)
    }
}

impl<C: Construct> Construct for Pure<C> {
    fn construct(props: &Props, context: &Context) -> Self {
        Self(C::construct(props, context))
    }

    fn default_props() -> Props {
        C::default_props()
    }
}
