//! Logger handles
//!
//! A [`Logger`] is a cheap handle onto one namespace of a registry. All
//! handles for the same namespace share one settings record and one log.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::console::render_entry;
use super::entry::{ExtraData, LogEntry};
use super::error_parser::ErrorLike;
use super::registry::Shared;
use super::settings::{DefaultsUpdate, LoggerSettings, SettingKey, SettingsUpdate};

/// Registered state of one namespace
pub(crate) struct LoggerState {
    namespace: String,
    settings: RwLock<LoggerSettings>,
}

impl LoggerState {
    pub(crate) fn new(namespace: String, settings: LoggerSettings) -> Self {
        Self {
            namespace,
            settings: RwLock::new(settings),
        }
    }

    pub(crate) fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) fn read_settings(&self) -> RwLockReadGuard<'_, LoggerSettings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_settings(&self) -> RwLockWriteGuard<'_, LoggerSettings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle for logging into one namespace
#[derive(Clone)]
pub struct Logger {
    state: Arc<LoggerState>,
    shared: Arc<Shared>,
}

impl Logger {
    pub(crate) fn new(state: Arc<LoggerState>, shared: Arc<Shared>) -> Self {
        Self { state, shared }
    }

    pub fn namespace(&self) -> &str {
        self.state.namespace()
    }

    /// Record an info entry
    pub fn log(&self, message: &str, data: Option<ExtraData>) {
        self.collect(LogEntry::info(message, data));
    }

    /// Record an info entry without data
    pub fn info(&self, message: &str) {
        self.log(message, None);
    }

    /// Record an error entry
    ///
    /// The stored entry holds the error as parsed by this logger's current
    /// parser. The error callback, if any, runs after storage and receives the
    /// original error.
    pub fn log_error(&self, message: &str, error: Option<ErrorLike>, data: Option<ExtraData>) {
        let (parser, callback) = {
            let settings = self.state.read_settings();
            (
                settings.error_parser.value().clone(),
                settings.error_callback.value().clone(),
            )
        };

        let parsed = error.as_ref().map(|error| parser.parse(error));
        self.collect(LogEntry::error(message, parsed, data.clone()));

        if let Some(callback) = callback {
            callback.call(message, error.as_ref(), data.as_ref());
        }
    }

    fn collect(&self, entry: LogEntry) {
        if self.shared.print_enabled() {
            render_entry(self.shared.sink.as_ref(), self.namespace(), &entry);
        }

        // Truncate under the settings lock so a concurrent resize cannot be
        // undone by an append using the old size.
        let settings = self.state.read_settings();
        self.shared
            .store
            .append(self.namespace(), entry, *settings.buffer_size.value());
    }

    /// Override settings for this logger only
    ///
    /// Each provided field stops following the global defaults. A new buffer
    /// size applies to the existing log straight away.
    pub fn set_settings(&self, update: SettingsUpdate) {
        let mut settings = self.state.write_settings();
        if let Some(size) = settings.pin(update) {
            self.shared.store.truncate(self.namespace(), size);
        }
    }

    /// Update the registry-wide defaults
    pub fn set_defaults(&self, update: DefaultsUpdate) {
        self.shared.set_defaults(update);
    }

    /// Get another logger from the same registry
    ///
    /// Children are flat: `namespace` is used as given, not prefixed with
    /// this logger's namespace.
    pub fn get_child(&self, namespace: &str) -> Logger {
        self.shared.get_logger(namespace)
    }

    /// Copy of every non-empty namespace log in the registry
    pub fn get_all_logs(&self) -> BTreeMap<String, Vec<LogEntry>> {
        self.shared.store.snapshot()
    }

    /// Entries of this logger's namespace, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.shared.store.entries(self.namespace())
    }

    pub fn buffer_size(&self) -> usize {
        *self.state.read_settings().buffer_size.value()
    }

    pub fn is_pinned(&self, key: SettingKey) -> bool {
        self.state.read_settings().is_pinned(key)
    }

    pub fn pinned_settings(&self) -> BTreeSet<SettingKey> {
        self.state.read_settings().pinned()
    }

    /// Whether both handles refer to the same registered logger
    pub fn ptr_eq(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("namespace", &self.namespace())
            .field("buffer_size", &self.buffer_size())
            .field("pinned", &self.pinned_settings())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use crate::logging::error_parser::{ErrorObject, ErrorParser};
    use crate::logging::registry::LogRegistry;
    use crate::logging::settings::ErrorCallback;
    use crate::logging::LogLevel;

    fn quiet_registry() -> LogRegistry {
        LogRegistry::builder()
            .defaults(DefaultsUpdate::new().print_enabled(false))
            .build()
    }

    fn data(value: Value) -> Option<ExtraData> {
        value.as_object().cloned()
    }

    #[test]
    fn test_log_records_info_entry_with_data() {
        let registry = quiet_registry();
        let logger = registry.default_logger();
        logger.log("log", data(json!({"value": "value"})));

        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level(), LogLevel::Info);
        assert_eq!(entries[0].message(), "log");
        assert_eq!(entries[0].data(), data(json!({"value": "value"})).as_ref());
    }

    #[test]
    fn test_log_error_without_error_stores_none() {
        let registry = quiet_registry();
        let logger = registry.get_logger("new");
        logger.info("log");
        logger.log_error("Failed", None, None);

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].level(), LogLevel::Error);
        assert!(entries[1].error_value().is_none());
    }

    #[test]
    fn test_callback_receives_unparsed_error() {
        let registry = quiet_registry();
        let logger = registry.get_logger("p");
        let seen: Arc<Mutex<Vec<(String, Option<ErrorLike>, Option<ExtraData>)>>> =
            Arc::default();

        let record = Arc::clone(&seen);
        logger.set_settings(
            SettingsUpdate::new()
                .error_parser(ErrorParser::new(|_| json!({"parsed": true})))
                .error_callback(ErrorCallback::new(move |message, error, data| {
                    record.lock().unwrap().push((
                        message.to_string(),
                        error.cloned(),
                        data.cloned(),
                    ));
                })),
        );

        let error = ErrorObject::new("failed").with_field("code", "E1");
        logger.log_error(
            "error message",
            Some(error.clone().into()),
            data(json!({"attempt": 2})),
        );

        assert_eq!(
            logger.entries()[0].error_value(),
            Some(&json!({"parsed": true}))
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "error message");
        assert_eq!(seen[0].1, Some(ErrorLike::Error(error)));
        assert_eq!(seen[0].2, data(json!({"attempt": 2})));
    }

    #[test]
    fn test_callback_runs_after_storage() {
        let registry = quiet_registry();
        let logger = registry.get_logger("ordered");
        let observed = Arc::new(Mutex::new(0));

        let probe = logger.clone();
        let count = Arc::clone(&observed);
        logger.set_settings(SettingsUpdate::new().error_callback(ErrorCallback::new(
            move |_, _, _| *count.lock().unwrap() = probe.entries().len(),
        )));

        logger.log_error("failed", None, None);
        assert_eq!(*observed.lock().unwrap(), 1);
    }

    #[test]
    fn test_set_settings_truncates_immediately() {
        let registry = quiet_registry();
        let logger = registry.get_logger("jobs");
        for i in 0..5 {
            logger.log(&format!("msg {}", i), None);
        }

        logger.set_settings(SettingsUpdate::new().buffer_size(2));

        let messages: Vec<_> = logger
            .entries()
            .iter()
            .map(|e| e.message().to_string())
            .collect();
        assert_eq!(messages, vec!["msg 3", "msg 4"]);
        assert!(logger.is_pinned(SettingKey::BufferSize));
    }

    #[test]
    fn test_set_settings_below_minimum_is_ignored() {
        let registry = quiet_registry();
        let logger = registry.get_logger("jobs");
        logger.info("kept");

        logger.set_settings(SettingsUpdate::new().buffer_size(0));

        assert_eq!(logger.entries().len(), 1);
        assert!(logger.pinned_settings().is_empty());
    }

    #[test]
    fn test_get_child_is_flat() {
        let registry = quiet_registry();
        let parent = registry.get_logger("new");
        let child = parent.get_child("some");

        assert_eq!(child.namespace(), "some");
        assert!(child.ptr_eq(&registry.get_logger("some")));

        child.info("from child");
        assert!(parent.get_all_logs().contains_key("some"));
    }

    #[test]
    fn test_set_defaults_through_logger() {
        let registry = quiet_registry();
        let logger = registry.get_logger("a");
        let other = registry.get_logger("b");

        logger.set_defaults(DefaultsUpdate::new().buffer_size(7));

        assert_eq!(logger.buffer_size(), 7);
        assert_eq!(other.buffer_size(), 7);
    }

    #[test]
    #[should_panic(expected = "parser failed")]
    fn test_parser_panic_propagates() {
        let registry = quiet_registry();
        let logger = registry.get_logger("fragile");
        logger.set_settings(
            SettingsUpdate::new().error_parser(ErrorParser::new(|_| panic!("parser failed"))),
        );
        logger.log_error("m", Some(ErrorObject::new("x").into()), None);
    }

    #[test]
    fn test_debug_shows_namespace() {
        let registry = quiet_registry();
        let logger = registry.get_logger("dbg");
        assert!(format!("{:?}", logger).contains("dbg"));
    }
}
