//! Logger settings and their inheritance from global defaults
//!
//! Every per-logger field is either inherited from the global defaults or
//! pinned by the logger itself. Global updates only reach inherited fields.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::entry::ExtraData;
use super::error_parser::{ErrorLike, ErrorParser};

/// Default number of entries kept per namespace
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Smallest accepted buffer size; smaller values are ignored
pub const MIN_BUFFER_SIZE: usize = 1;

/// Hook invoked after an error entry is stored, with the unparsed error
#[derive(Clone)]
pub struct ErrorCallback(Arc<dyn Fn(&str, Option<&ErrorLike>, Option<&ExtraData>) + Send + Sync>);

impl ErrorCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str, Option<&ErrorLike>, Option<&ExtraData>) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    pub fn call(&self, message: &str, error: Option<&ErrorLike>, data: Option<&ExtraData>) {
        (self.0)(message, error, data)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ErrorCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorCallback(..)")
    }
}

/// Per-logger setting names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingKey {
    BufferSize,
    ErrorParser,
    ErrorCallback,
}

/// Where a logger's current value for a field came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Follows the global defaults
    Inherited,
    /// Set on the logger; global updates leave it alone
    Pinned,
}

/// A setting value tagged with its source
#[derive(Debug, Clone)]
pub struct Setting<T> {
    value: T,
    source: Source,
}

impl<T> Setting<T> {
    pub fn inherited(value: T) -> Self {
        Self {
            value,
            source: Source::Inherited,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn is_pinned(&self) -> bool {
        self.source == Source::Pinned
    }

    /// Set a value chosen by the logger itself
    pub fn pin(&mut self, value: T) {
        self.value = value;
        self.source = Source::Pinned;
    }

    /// Take a new global value; returns false if the field is pinned
    pub fn inherit(&mut self, value: T) -> bool {
        if self.is_pinned() {
            return false;
        }
        self.value = value;
        true
    }
}

/// Process-wide defaults that loggers inherit from
#[derive(Debug, Clone)]
pub struct GlobalDefaults {
    pub buffer_size: usize,
    pub error_parser: ErrorParser,
    /// Global only; loggers never carry their own copy
    pub print_enabled: bool,
    pub error_callback: Option<ErrorCallback>,
}

impl Default for GlobalDefaults {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            error_parser: ErrorParser::default(),
            print_enabled: true,
            error_callback: None,
        }
    }
}

/// Effective settings held by one logger
#[derive(Debug, Clone)]
pub struct LoggerSettings {
    pub buffer_size: Setting<usize>,
    pub error_parser: Setting<ErrorParser>,
    pub error_callback: Setting<Option<ErrorCallback>>,
}

impl LoggerSettings {
    /// Seed a logger from the current global defaults, all fields inherited
    pub fn inherit_from(defaults: &GlobalDefaults) -> Self {
        Self {
            buffer_size: Setting::inherited(defaults.buffer_size),
            error_parser: Setting::inherited(defaults.error_parser.clone()),
            error_callback: Setting::inherited(defaults.error_callback.clone()),
        }
    }

    pub fn is_pinned(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::BufferSize => self.buffer_size.is_pinned(),
            SettingKey::ErrorParser => self.error_parser.is_pinned(),
            SettingKey::ErrorCallback => self.error_callback.is_pinned(),
        }
    }

    /// Names of every pinned field
    pub fn pinned(&self) -> BTreeSet<SettingKey> {
        [
            SettingKey::BufferSize,
            SettingKey::ErrorParser,
            SettingKey::ErrorCallback,
        ]
        .into_iter()
        .filter(|key| self.is_pinned(*key))
        .collect()
    }

    /// Apply a logger-local update, pinning each field it sets
    ///
    /// Returns the new buffer size if it changed, so the caller can
    /// re-truncate the namespace log.
    pub fn pin(&mut self, update: SettingsUpdate) -> Option<usize> {
        let mut resized = None;
        if let Some(size) = update.buffer_size.filter(|size| is_valid_buffer_size(*size)) {
            self.buffer_size.pin(size);
            resized = Some(size);
        }
        if let Some(parser) = update.error_parser {
            self.error_parser.pin(parser);
        }
        if let Some(callback) = update.error_callback {
            self.error_callback.pin(Some(callback));
        }
        resized
    }

    /// Push accepted global values into every inherited field
    ///
    /// Returns the new buffer size if this logger took one.
    pub fn inherit(&mut self, accepted: &SettingsUpdate) -> Option<usize> {
        let mut resized = None;
        if let Some(size) = accepted.buffer_size {
            if self.buffer_size.inherit(size) {
                resized = Some(size);
            }
        }
        if let Some(parser) = &accepted.error_parser {
            self.error_parser.inherit(parser.clone());
        }
        if let Some(callback) = &accepted.error_callback {
            self.error_callback.inherit(Some(callback.clone()));
        }
        resized
    }
}

pub fn is_valid_buffer_size(size: usize) -> bool {
    size >= MIN_BUFFER_SIZE
}

/// Partial update of a logger's own settings
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub buffer_size: Option<usize>,
    pub error_parser: Option<ErrorParser>,
    pub error_callback: Option<ErrorCallback>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }

    pub fn error_parser(mut self, parser: ErrorParser) -> Self {
        self.error_parser = Some(parser);
        self
    }

    pub fn error_callback(mut self, callback: ErrorCallback) -> Self {
        self.error_callback = Some(callback);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buffer_size.is_none() && self.error_parser.is_none() && self.error_callback.is_none()
    }
}

/// Partial update of the global defaults
#[derive(Debug, Clone, Default)]
pub struct DefaultsUpdate {
    pub settings: SettingsUpdate,
    pub print_enabled: Option<bool>,
}

impl DefaultsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.settings.buffer_size = Some(size);
        self
    }

    pub fn error_parser(mut self, parser: ErrorParser) -> Self {
        self.settings.error_parser = Some(parser);
        self
    }

    pub fn error_callback(mut self, callback: ErrorCallback) -> Self {
        self.settings.error_callback = Some(callback);
        self
    }

    pub fn print_enabled(mut self, enabled: bool) -> Self {
        self.print_enabled = Some(enabled);
        self
    }
}

impl GlobalDefaults {
    /// Apply the valid parts of an update
    ///
    /// Invalid fields are dropped one by one. Emits no tracing events; the
    /// registry calls this with its defaults lock held. The returned update
    /// holds only the per-logger fields that were accepted, ready for
    /// propagation.
    pub fn apply(&mut self, update: DefaultsUpdate) -> SettingsUpdate {
        let DefaultsUpdate {
            settings,
            print_enabled,
        } = update;

        let mut accepted = SettingsUpdate::new();
        if let Some(size) = settings.buffer_size.filter(|size| is_valid_buffer_size(*size)) {
            self.buffer_size = size;
            accepted.buffer_size = Some(size);
        }
        if let Some(parser) = settings.error_parser {
            self.error_parser = parser.clone();
            accepted.error_parser = Some(parser);
        }
        if let Some(callback) = settings.error_callback {
            self.error_callback = Some(callback.clone());
            accepted.error_callback = Some(callback);
        }
        if let Some(enabled) = print_enabled {
            self.print_enabled = enabled;
        }
        accepted
    }
}
