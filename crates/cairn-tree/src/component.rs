//! Reusable render units registered on directories.
//!
//! A directory's visible components are its own registry merged over every
//! ancestor's, nearest name winning; see
//! [`ContentTree::get_components`](crate::ContentTree::get_components).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::data::Data;

/// Error returned by a component render function.
#[derive(Debug, thiserror::Error)]
#[error("Component {name} failed to render: {source}")]
pub struct ComponentError {
    /// Name of the failing component.
    pub name: String,
    /// Collaborator error.
    #[source]
    pub source: BoxError,
}

/// Boxed collaborator error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

impl ComponentError {
    /// Wrap a collaborator error.
    pub fn new(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Render function of a component.
///
/// Implemented for closures taking the props and returning markup.
pub trait ComponentRender: Send + Sync {
    /// Render the component with `props`.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error as a boxed error.
    fn render(&self, props: &Data) -> Result<String, BoxError>;
}

impl<F> ComponentRender for F
where
    F: Fn(&Data) -> Result<String, BoxError> + Send + Sync,
{
    fn render(&self, props: &Data) -> Result<String, BoxError> {
        self(props)
    }
}

/// Named render unit with optional CSS and JS assets.
#[derive(Clone)]
pub struct Component {
    name: String,
    render: Arc<dyn ComponentRender>,
    css: Option<String>,
    js: Option<String>,
}

impl Component {
    /// Create a component from a name and render closure.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Data) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self::with_renderer(name, Arc::new(render))
    }

    /// Create a component from a shared renderer.
    pub fn with_renderer(name: impl Into<String>, render: Arc<dyn ComponentRender>) -> Self {
        Self {
            name: name.into(),
            render,
            css: None,
            js: None,
        }
    }

    /// Attach a stylesheet.
    #[must_use]
    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    /// Attach a script.
    #[must_use]
    pub fn with_js(mut self, js: impl Into<String>) -> Self {
        self.js = Some(js.into());
        self
    }

    /// Registry key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stylesheet, if any.
    #[must_use]
    pub fn css(&self) -> Option<&str> {
        self.css.as_deref()
    }

    /// Script, if any.
    #[must_use]
    pub fn js(&self) -> Option<&str> {
        self.js.as_deref()
    }

    /// Render with `props`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] if the render function fails.
    pub fn render(&self, props: &Data) -> Result<String, ComponentError> {
        self.render
            .render(props)
            .map_err(|source| ComponentError::new(&self.name, source))
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("css", &self.css.is_some())
            .field("js", &self.js.is_some())
            .finish_non_exhaustive()
    }
}

/// Components visible from a directory, by name.
pub type Components = BTreeMap<String, Arc<Component>>;
