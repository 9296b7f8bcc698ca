use crate::host::HostNode;

/// Errors surfaced by rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A component was rendered without overriding [`Component::render`](crate::Component::render).
    #[error("component `{component}` does not implement render")]
    MissingRender {
        /// Type name of the offending component.
        component: &'static str,
    },
    /// A component's render chose to fail.
    #[error("component `{component}` failed to render: {message}")]
    Component {
        /// Type name of the failing component.
        component: &'static str,
        /// What went wrong.
        message: String,
    },
    /// The container has no mounted tree.
    #[error("no tree is mounted in container {0:?}")]
    UnknownContainer(HostNode),
}

impl RenderError {
    /// Builds a [`RenderError::Component`] for the component type `C`.
    pub fn component<C: ?Sized>(message: impl Into<String>) -> Self {
        Self::Component {
            component: core::any::type_name::<C>(),
            message: message.into(),
        }
    }
}
