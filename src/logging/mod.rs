//! Namespaced in-memory logging
//!
//! Provides per-namespace bounded logs, settings inherited from registry-wide
//! defaults, error parsing into plain data, and optional console printing.

mod buffer;
mod console;
mod diagnostics;
mod entry;
mod error_parser;
mod logger;
mod registry;
mod settings;

pub use buffer::{LogStore, NamespaceLog};
pub use console::{format_time, render_entry, ConsoleSink, EntryHeader, TracingSink, WriterSink};
pub use diagnostics::{env_filter, init_tracing, DEFAULT_FILTER};
pub use entry::{ExtraData, LogEntry, LogLevel};
pub use error_parser::{
    DefaultErrorParser, ErrorLike, ErrorObject, ErrorParser, ErrorResponse, ERROR_FIELDS,
    REQUEST_ID_HEADER, TRACE_ID_HEADER,
};
pub use logger::Logger;
pub use registry::{LogRegistry, LogRegistryBuilder};
pub use settings::{
    DefaultsUpdate, ErrorCallback, GlobalDefaults, LoggerSettings, Setting, SettingKey,
    SettingsUpdate, Source, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE,
};
