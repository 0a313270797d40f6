//! Name-keyed logger registry
//!
//! The registry owns the dotted-name hierarchy: `svc.api` is a child of
//! `svc`, and every top-level logger is a child of the root logger. It is
//! exposed behind the [`LoggerRegistry`] trait so callers can hand the
//! resolver an isolated instance instead of the process-wide one.

use super::log_level::LogLevel;
use super::logger::{Logger, LoggerHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Lookup-or-create access to named loggers
pub trait LoggerRegistry: Send + Sync {
    /// Return the logger registered under `name`, creating and linking it
    /// into the hierarchy if it does not exist yet.
    fn lookup_or_create(&self, name: &str) -> LoggerHandle;

    fn lookup(&self, name: &str) -> Option<LoggerHandle>;
}

/// Default [`LoggerRegistry`] implementation
///
/// # Example
///
/// ```
/// use rust_logutils::core::{LoggerRegistry, Registry};
///
/// let registry = Registry::new();
/// let api = registry.lookup_or_create("svc.api");
/// let svc = registry.lookup_or_create("svc");
///
/// // `svc` was created after `svc.api` and adopted it
/// assert_eq!(api.parent().unwrap().name(), "svc");
/// assert_eq!(svc.parent().unwrap().name(), "root");
/// ```
pub struct Registry {
    root: LoggerHandle,
    loggers: Mutex<HashMap<String, LoggerHandle>>,
}

impl Registry {
    pub const ROOT_NAME: &'static str = "root";

    /// Create an empty registry whose root logger sits at `WARNING`
    #[must_use]
    pub fn new() -> Self {
        let root = Logger::new(Self::ROOT_NAME);
        root.set_level(LogLevel::Warning);
        Self {
            root: Arc::new(root),
            loggers: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry
    pub fn global() -> Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::new())))
    }

    pub fn root(&self) -> LoggerHandle {
        Arc::clone(&self.root)
    }

    /// Drop a logger from the registry, relinking its children to its
    /// parent. Handles held elsewhere stay valid.
    pub fn remove(&self, name: &str) -> Option<LoggerHandle> {
        let mut loggers = self.loggers.lock();
        let removed = loggers.remove(name)?;
        let grandparent = removed.parent();

        for logger in loggers.values() {
            let is_child = logger
                .parent()
                .is_some_and(|parent| Arc::ptr_eq(&parent, &removed));
            if is_child {
                logger.set_parent(grandparent.clone());
            }
        }
        Some(removed)
    }

    /// Names of every registered logger, root excluded, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.loggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_root_name(name: &str) -> bool {
        name.is_empty() || name == Self::ROOT_NAME
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerRegistry for Registry {
    fn lookup_or_create(&self, name: &str) -> LoggerHandle {
        if Self::is_root_name(name) {
            return self.root();
        }

        let mut loggers = self.loggers.lock();
        if let Some(existing) = loggers.get(name) {
            return Arc::clone(existing);
        }

        let logger = Arc::new(Logger::new(name));

        // Nearest registered ancestor, else root
        let parent = name
            .rmatch_indices('.')
            .find_map(|(idx, _)| loggers.get(&name[..idx]))
            .cloned()
            .unwrap_or_else(|| self.root());
        logger.set_parent(Some(parent));

        // Adopt descendants whose current parent sits above the new logger
        let prefix = format!("{}.", name);
        for other in loggers.values() {
            if !other.name().starts_with(&prefix) {
                continue;
            }
            let above = match other.parent() {
                Some(parent) => !parent.name().starts_with(&prefix),
                None => true,
            };
            if above {
                other.set_parent(Some(Arc::clone(&logger)));
            }
        }

        loggers.insert(name.to_string(), Arc::clone(&logger));
        logger
    }

    fn lookup(&self, name: &str) -> Option<LoggerHandle> {
        if Self::is_root_name(name) {
            return Some(self.root());
        }
        self.loggers.lock().get(name).cloned()
    }
}
