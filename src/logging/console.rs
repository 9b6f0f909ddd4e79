//! Console rendering of log entries
//!
//! Rendering is two-tier. Sinks that support groups get a collapsed group with
//! a header line and one line per extra field. Sinks without groups, and
//! sinks whose group rendering fails, get a single plain write instead.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;

use super::entry::{LogEntry, LogLevel};

const GREY: &str = "\x1b[90m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Header of a rendered entry group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader<'a> {
    pub namespace: &'a str,
    pub message: &'a str,
    pub level: LogLevel,
    /// Wall-clock time, already formatted
    pub time: String,
}

/// Destination for printed entries
///
/// Only [`ConsoleSink::plain`] is required. The group methods default to
/// `Unsupported`, which routes rendering to the plain path.
pub trait ConsoleSink: Send + Sync {
    fn supports_groups(&self) -> bool {
        true
    }

    fn group_collapsed(&self, _header: &EntryHeader<'_>) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn write_field(&self, _key: &str, _value: &Value) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn write_note(&self, _note: &str) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn group_end(&self) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    /// Fallback write of the raw entry at its own severity; must not fail
    fn plain(&self, namespace: &str, entry: &LogEntry);
}

/// Format a timestamp as `HH:MM:SS.mmm`
pub fn format_time<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format("%H:%M:%S%.3f").to_string()
}

/// Print one entry, falling back to a plain write if grouping is unavailable
pub fn render_entry(sink: &dyn ConsoleSink, namespace: &str, entry: &LogEntry) {
    if sink.supports_groups() {
        match render_group(sink, namespace, entry) {
            Ok(()) => return,
            Err(e) => tracing::debug!(namespace, error = %e, "Grouped render failed, writing plain"),
        }
    }
    sink.plain(namespace, entry);
}

fn render_group(sink: &dyn ConsoleSink, namespace: &str, entry: &LogEntry) -> io::Result<()> {
    let header = EntryHeader {
        namespace,
        message: entry.message(),
        level: entry.level(),
        time: format_time(&entry.time().with_timezone(&Local)),
    };
    sink.group_collapsed(&header)?;

    let fields: Vec<_> = entry
        .extra_fields()
        .into_iter()
        .filter(|(_, value)| !is_empty_value(value))
        .collect();
    if fields.is_empty() {
        sink.write_note("No extra data")?;
    }
    for (key, value) in &fields {
        sink.write_field(key, value)?;
    }

    sink.group_end()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Text sink over any writer; groups become a header plus indented lines
pub struct WriterSink<W> {
    writer: Mutex<W>,
    ansi: bool,
}

impl WriterSink<io::Stderr> {
    /// Sink printing to standard error with colours
    pub fn stderr() -> Self {
        Self::new(io::stderr()).with_ansi(true)
    }
}

impl<W: Write + Send> WriterSink<W> {
    /// Create a sink without colours
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            ansi: false,
        }
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Run a closure against the underlying writer
    pub fn with_writer<R>(&self, f: impl FnOnce(&W) -> R) -> io::Result<R> {
        let writer = self.lock()?;
        Ok(f(&writer))
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, W>> {
        self.writer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "console writer poisoned"))
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.ansi {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }
}

impl<W: Write + Send> ConsoleSink for WriterSink<W> {
    fn group_collapsed(&self, header: &EntryHeader<'_>) -> io::Result<()> {
        let namespace = self.paint(GREY, &format!("[{}]", header.namespace));
        let message = match header.level {
            LogLevel::Error => self.paint(RED, header.message),
            LogLevel::Info => header.message.to_string(),
        };
        let time = self.paint(GREY, &format!("@ {}", header.time));

        let mut writer = self.lock()?;
        writeln!(writer, "▸ {} {} {}", namespace, message, time)
    }

    fn write_field(&self, key: &str, value: &Value) -> io::Result<()> {
        let rendered = serde_json::to_string(value)?;
        let key = self.paint(GREY, key);
        let mut writer = self.lock()?;
        writeln!(writer, "    {} {}", key, rendered)
    }

    fn write_note(&self, note: &str) -> io::Result<()> {
        let note = self.paint(GREY, note);
        let mut writer = self.lock()?;
        writeln!(writer, "    {}", note)
    }

    fn group_end(&self) -> io::Result<()> {
        self.lock()?.flush()
    }

    fn plain(&self, namespace: &str, entry: &LogEntry) {
        let rendered = serde_json::to_string(entry).unwrap_or_else(|_| entry.message().to_string());
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(
                writer,
                "{} [{}] {}",
                entry.level().as_str().to_uppercase(),
                namespace,
                rendered
            );
            let _ = writer.flush();
        }
    }
}

/// Sink forwarding entries to `tracing` as info or error events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ConsoleSink for TracingSink {
    fn supports_groups(&self) -> bool {
        false
    }

    fn plain(&self, namespace: &str, entry: &LogEntry) {
        let fields: serde_json::Map<String, Value> = entry
            .extra_fields()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        let fields = Value::Object(fields);
        match entry.level() {
            LogLevel::Info => {
                tracing::info!(target: "nslog", namespace, fields = %fields, "{}", entry.message())
            }
            LogLevel::Error => {
                tracing::error!(target: "nslog", namespace, fields = %fields, "{}", entry.message())
            }
        }
    }
}
