//! nslog - Namespaced in-memory logging
//!
//! This library keeps a bounded history of log entries per namespace. Loggers
//! inherit buffer size, error parser and error callback from registry-wide
//! defaults until they pin their own values.

pub mod config;
pub mod logging;

pub use config::{ConfigError, LoggingConfig, DEFAULT_NAMESPACE};
pub use logging::{
    DefaultsUpdate, ErrorCallback, ErrorLike, ErrorObject, ErrorParser, LogEntry, LogLevel,
    LogRegistry, Logger, SettingsUpdate,
};
