//! Name-to-constructor registry for pluggable components.
//!
//! Configuration selects implementations by dotted name (`pkg.module.Type`).
//! The registry splits the name on its last dot into a module path and an
//! attribute, then looks both up in a table filled in at startup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while resolving a dotted name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The name was empty or whitespace.
    #[error("Component name must not be empty")]
    EmptyName,

    /// No component was registered under this module path.
    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    /// The module exists but does not export the attribute.
    #[error("Module '{module}' has no attribute '{attribute}'")]
    AttributeNotFound {
        /// Module path portion of the name.
        module: String,
        /// Attribute portion of the name.
        attribute: String,
    },
}

impl From<RegistryError> for crate::VizorError {
    fn from(err: RegistryError) -> Self {
        Self::Configuration(err.to_string())
    }
}

type Constructor<C, T> = Arc<dyn Fn(&C) -> T + Send + Sync>;

/// Table of constructors keyed by module path and attribute name.
///
/// `C` is the context handed to each constructor, `T` is what it builds.
pub struct ComponentRegistry<C, T> {
    modules: HashMap<String, HashMap<String, Constructor<C, T>>>,
}

impl<C, T> ComponentRegistry<C, T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Registers a constructor under a dotted name.
    ///
    /// A name without a dot is registered as an attribute of the empty module,
    /// which no lookup can reach.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> &mut Self
    where
        F: Fn(&C) -> T + Send + Sync + 'static,
    {
        let (module, attribute) = split_name(name);
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(attribute.to_string(), Arc::new(constructor));
        self
    }

    /// Returns true if a constructor is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let (module, attribute) = split_name(name);
        self.modules
            .get(module)
            .is_some_and(|attrs| attrs.contains_key(attribute))
    }

    /// Resolves `name` and invokes its constructor with `context`.
    pub fn resolve(&self, name: &str, context: &C) -> Result<T, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let (module, attribute) = split_name(name);
        if module.is_empty() {
            return Err(RegistryError::ModuleNotFound(name.to_string()));
        }

        let attrs = self
            .modules
            .get(module)
            .ok_or_else(|| RegistryError::ModuleNotFound(module.to_string()))?;

        let constructor = attrs
            .get(attribute)
            .ok_or_else(|| RegistryError::AttributeNotFound {
                module: module.to_string(),
                attribute: attribute.to_string(),
            })?;

        debug!(component = %name, "Resolved component");
        Ok(constructor(context))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .modules
            .iter()
            .flat_map(|(module, attrs)| {
                attrs.keys().map(move |attr| format!("{}.{}", module, attr))
            })
            .collect();
        names.sort();
        names
    }
}

impl<C, T> Default for ComponentRegistry<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, T> fmt::Debug for ComponentRegistry<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("names", &self.names())
            .finish()
    }
}

fn split_name(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or(("", name))
}
