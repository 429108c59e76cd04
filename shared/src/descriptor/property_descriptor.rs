use std::{fmt, sync::Arc};

use crate::{Instance, Value, Visibility};

/// Runs on the receiving side after a property value has been applied
pub type ChangeHook = Arc<dyn Fn(&Instance, &Value) + Send + Sync>;

/// A declared property of a user type
#[derive(Clone)]
pub struct PropertyDescriptor {
    name: String,
    visibility: Visibility,
    on_change: Option<ChangeHook>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::All,
            on_change: None,
        }
    }

    pub fn visible_to(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn on_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Instance, &Value) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn change_hook(&self) -> Option<&ChangeHook> {
        self.on_change.as_ref()
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}
