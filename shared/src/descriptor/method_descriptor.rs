use std::{fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;

use crate::{Instance, Value, Visibility};

pub type MethodFuture = BoxFuture<'static, Result<Value, String>>;
pub type MethodHandler = Arc<dyn Fn(Instance, Vec<Value>) -> MethodFuture + Send + Sync>;

/// Whether the caller waits for a `Result`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvokeMode {
    #[default]
    AwaitReply,
    FireAndForget,
}

/// A declared remote method of a user type
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    mode: InvokeMode,
    visibility: Visibility,
    handler: Option<MethodHandler>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: InvokeMode::AwaitReply,
            visibility: Visibility::All,
            handler: None,
        }
    }

    pub fn mode(mut self, mode: InvokeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn visible_to(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the code run when this side receives a call. A method without a
    /// handler can only be called on the other side.
    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Instance, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |this, args| -> MethodFuture {
            Box::pin(handler(this, args))
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke_mode(&self) -> InvokeMode {
        self.mode
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn method_handler(&self) -> Option<&MethodHandler> {
        self.handler.as_ref()
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("visibility", &self.visibility)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
