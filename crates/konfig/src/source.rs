//! Configuration sources.
//!
//! The engine does not read files or enumerate resources itself; it
//! consumes a [`SourceProvider`]: a function producing zero or more raw
//! default fragments, a function resolving one override selector to
//! configuration text, and a flat key-value overlay queried by exact key.
//!
//! [`SearchPathSources`] is the production provider: it discovers every
//! [`DEFAULT_RESOURCE`] file across an ordered search path and resolves
//! override selectors through a [`PropertyStore`], honoring the
//! [`CLASSPATH_PREFIX`] marker. [`StaticSources`] holds everything in
//! memory and is what tests and embedded callers use.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::BindError;

/// Well-known resource name of default configuration fragments.
pub const DEFAULT_RESOURCE: &str = "konfig.props";

/// Marker prefix selecting search-path resolution for an override value.
pub const CLASSPATH_PREFIX: &str = "classpath:";

/// Supplier of raw configuration texts and the per-call overlay.
pub trait SourceProvider: Send + Sync {
    /// Every discovered default fragment, in discovery order. Callers must
    /// not depend on that order for correctness, only tolerate it.
    fn default_fragments(&self) -> Result<Vec<String>, BindError>;

    /// Resolve one override selector to configuration text, or `None` when
    /// the selector has no value.
    fn resolve_override(&self, selector: &str) -> Result<Option<String>, BindError>;

    /// Query the flat key-value overlay by exact key.
    fn overlay(&self, key: &str) -> Option<String>;
}

/// An explicit process-wide key-value store.
///
/// Stands in for ambient system properties: the highest-priority overlay
/// consulted lazily per operation path, and the store override selectors
/// are resolved through. Handles are cheap clones sharing one map, so a
/// test can set a key on its handle and observe it through a provider
/// constructed earlier.
///
/// # Example
///
/// ```
/// use konfig::PropertyStore;
///
/// let store = PropertyStore::new();
/// let handle = store.clone();
/// handle.set("bb", "3");
/// assert_eq!(store.get("bb"), Some("3".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl PropertyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key to a value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.write().insert(key.into(), value.into());
    }

    /// Removes a key.
    pub fn remove(&self, key: &str) {
        self.inner.write().remove(key);
    }

    /// Returns the value for an exact key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    /// Removes every key.
    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

/// Filesystem-backed source provider.
///
/// Defaults are every [`DEFAULT_RESOURCE`] found across the search path
/// directories, in search-path order. An override selector is a key in the
/// [`PropertyStore`]; its value is either a `classpath:`-prefixed resource
/// name resolved against the search path, or a filesystem path.
#[derive(Debug)]
pub struct SearchPathSources {
    search_path: Vec<PathBuf>,
    store: PropertyStore,
}

impl SearchPathSources {
    /// Creates a provider with an empty search path.
    #[must_use]
    pub fn new(store: PropertyStore) -> Self {
        Self {
            search_path: Vec::new(),
            store,
        }
    }

    /// Appends a directory to the search path.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_path.push(dir.into());
        self
    }

    fn read(path: &Path) -> Result<String, BindError> {
        fs::read_to_string(path).map_err(|e| BindError::io(path, e))
    }

    fn find_resource(&self, name: &str) -> Option<PathBuf> {
        self.search_path
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

impl SourceProvider for SearchPathSources {
    fn default_fragments(&self) -> Result<Vec<String>, BindError> {
        let mut fragments = Vec::new();
        for dir in &self.search_path {
            let candidate = dir.join(DEFAULT_RESOURCE);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "discovered default configuration fragment");
                fragments.push(Self::read(&candidate)?);
            }
        }
        Ok(fragments)
    }

    fn resolve_override(&self, selector: &str) -> Result<Option<String>, BindError> {
        let Some(value) = self.store.get(selector) else {
            return Ok(None);
        };

        let path = if let Some(resource) = value.strip_prefix(CLASSPATH_PREFIX) {
            self.find_resource(resource).ok_or_else(|| {
                BindError::io(
                    resource,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "resource not found on search path",
                    ),
                )
            })?
        } else {
            PathBuf::from(&value)
        };

        debug!(selector, path = %path.display(), "resolved override configuration");
        Self::read(&path).map(Some)
    }

    fn overlay(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }
}

/// In-memory source provider.
///
/// Mirrors the production layout without touching the filesystem: default
/// fragments are plain texts, `classpath:` selector values resolve against
/// named resources, and other selector values resolve against named files.
#[derive(Debug, Default)]
pub struct StaticSources {
    defaults: Vec<String>,
    resources: HashMap<String, String>,
    files: HashMap<String, String>,
    store: PropertyStore,
}

impl StaticSources {
    /// Creates an empty provider backed by the given store.
    #[must_use]
    pub fn new(store: PropertyStore) -> Self {
        Self {
            defaults: Vec::new(),
            resources: HashMap::new(),
            files: HashMap::new(),
            store,
        }
    }

    /// Appends a default configuration fragment.
    #[must_use]
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.defaults.push(text.into());
        self
    }

    /// Registers a named resource reachable through `classpath:` selector
    /// values.
    #[must_use]
    pub fn with_resource(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.resources.insert(name.into(), text.into());
        self
    }

    /// Registers a named file reachable through plain selector values.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }
}

impl SourceProvider for StaticSources {
    fn default_fragments(&self) -> Result<Vec<String>, BindError> {
        Ok(self.defaults.clone())
    }

    fn resolve_override(&self, selector: &str) -> Result<Option<String>, BindError> {
        let Some(value) = self.store.get(selector) else {
            return Ok(None);
        };

        let text = if let Some(resource) = value.strip_prefix(CLASSPATH_PREFIX) {
            self.resources.get(resource)
        } else {
            self.files.get(value.as_str())
        };

        text.cloned().map(Some).ok_or_else(|| {
            BindError::io(
                value.as_str(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such static source"),
            )
        })
    }

    fn overlay(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }
}
