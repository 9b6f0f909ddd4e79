//! Namespace registry
//!
//! A [`LogRegistry`] owns everything a group of loggers shares: the
//! namespace-to-logger map, the per-namespace log store, the global defaults
//! and the console sink. Registries are explicitly constructed, so separate
//! registries never see each other's loggers or logs.
//!
//! Lock order: defaults, then the logger map, then a logger's settings, then
//! the log store. User code (parsers, callbacks, sinks, tracing subscribers)
//! never runs while a registry lock is held.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::config::{ConfigError, LoggingConfig, DEFAULT_NAMESPACE};

use super::buffer::LogStore;
use super::console::{ConsoleSink, WriterSink};
use super::entry::LogEntry;
use super::error_parser::DefaultErrorParser;
use super::logger::{Logger, LoggerState};
use super::settings::{
    is_valid_buffer_size, DefaultsUpdate, GlobalDefaults, LoggerSettings, MIN_BUFFER_SIZE,
};

/// State shared by a registry and every logger it hands out
pub(crate) struct Shared {
    defaults: RwLock<GlobalDefaults>,
    loggers: RwLock<HashMap<String, Arc<LoggerState>>>,
    pub(crate) store: LogStore,
    pub(crate) sink: Arc<dyn ConsoleSink>,
    default_namespace: String,
}

impl Shared {
    pub(crate) fn defaults(&self) -> RwLockReadGuard<'_, GlobalDefaults> {
        self.defaults.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Printing is global only and read fresh on every entry
    pub(crate) fn print_enabled(&self) -> bool {
        self.defaults().print_enabled
    }

    pub(crate) fn get_logger(self: &Arc<Self>, namespace: &str) -> Logger {
        if let Some(state) = self
            .loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
        {
            return Logger::new(Arc::clone(state), Arc::clone(self));
        }

        // Held across the insert so a concurrent set_defaults cannot slip in
        // between seeding and registration.
        let (state, created) = {
            let defaults = self.defaults();
            let mut loggers = self.loggers.write().unwrap_or_else(PoisonError::into_inner);
            match loggers.get(namespace) {
                Some(state) => (Arc::clone(state), false),
                None => {
                    let state = Arc::new(LoggerState::new(
                        namespace.to_string(),
                        LoggerSettings::inherit_from(&defaults),
                    ));
                    loggers.insert(namespace.to_string(), Arc::clone(&state));
                    (state, true)
                }
            }
        };

        // Subscribers may log back into this registry, so events go out only
        // after the guards are released.
        if created {
            tracing::debug!(namespace, "Registering logger");
        }
        Logger::new(state, Arc::clone(self))
    }

    pub(crate) fn set_defaults(&self, update: DefaultsUpdate) {
        let rejected = update
            .settings
            .buffer_size
            .filter(|size| !is_valid_buffer_size(*size));

        let propagated = {
            let mut defaults = self.defaults.write().unwrap_or_else(PoisonError::into_inner);
            let accepted = defaults.apply(update);
            if accepted.is_empty() {
                None
            } else {
                let loggers = self.loggers.read().unwrap_or_else(PoisonError::into_inner);
                let mut resized = 0;
                for state in loggers.values() {
                    let mut settings = state.write_settings();
                    if let Some(size) = settings.inherit(&accepted) {
                        self.store.truncate(state.namespace(), size);
                        resized += 1;
                    }
                }
                Some((loggers.len(), resized))
            }
        };

        if let Some(size) = rejected {
            tracing::debug!(size, min = MIN_BUFFER_SIZE, "Ignoring buffer size below minimum");
        }
        if let Some((loggers, resized)) = propagated {
            tracing::debug!(loggers, resized, "Propagated default settings");
        }
    }
}

/// Owner of a set of namespaced loggers and their logs
#[derive(Clone)]
pub struct LogRegistry {
    shared: Arc<Shared>,
}

impl LogRegistry {
    /// Create a registry with built-in defaults, printing to stderr
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> LogRegistryBuilder {
        LogRegistryBuilder::default()
    }

    /// Create a registry seeded from configuration
    pub fn from_config(config: &LoggingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let parser = DefaultErrorParser::with_headers(config.correlation_headers.iter().cloned());
        Ok(Self::builder()
            .default_namespace(config.default_namespace.clone())
            .defaults(
                DefaultsUpdate::new()
                    .buffer_size(config.buffer_size)
                    .print_enabled(config.print_enabled)
                    .error_parser(parser.into_parser()),
            )
            .build())
    }

    /// Get the logger for a namespace, creating it on first request
    pub fn get_logger(&self, namespace: &str) -> Logger {
        self.shared.get_logger(namespace)
    }

    /// Get the logger for the configured default namespace
    pub fn default_logger(&self) -> Logger {
        self.shared.get_logger(&self.shared.default_namespace)
    }

    /// Update global defaults and push them into every inherited setting
    ///
    /// Invalid values are ignored field by field.
    pub fn set_defaults(&self, update: DefaultsUpdate) {
        self.shared.set_defaults(update);
    }

    /// Copy of every non-empty namespace log
    pub fn get_all_logs(&self) -> BTreeMap<String, Vec<LogEntry>> {
        self.shared.store.snapshot()
    }

    /// Names of all registered loggers, sorted
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .shared
            .loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn defaults_snapshot(&self) -> GlobalDefaults {
        self.shared.defaults().clone()
    }
}

impl Default for LogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRegistry")
            .field("namespaces", &self.namespaces())
            .field("default_namespace", &self.shared.default_namespace)
            .finish()
    }
}

/// Builder for [`LogRegistry`]
pub struct LogRegistryBuilder {
    defaults: DefaultsUpdate,
    sink: Option<Arc<dyn ConsoleSink>>,
    default_namespace: String,
}

impl Default for LogRegistryBuilder {
    fn default() -> Self {
        Self {
            defaults: DefaultsUpdate::new(),
            sink: None,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl LogRegistryBuilder {
    /// Initial global defaults; invalid fields fall back to built-in values
    pub fn defaults(mut self, defaults: DefaultsUpdate) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ConsoleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    pub fn build(self) -> LogRegistry {
        let mut defaults = GlobalDefaults::default();
        defaults.apply(self.defaults);
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(WriterSink::stderr()));

        LogRegistry {
            shared: Arc::new(Shared {
                defaults: RwLock::new(defaults),
                loggers: RwLock::new(HashMap::new()),
                store: LogStore::new(),
                sink,
                default_namespace: self.default_namespace,
            }),
        }
    }
}
