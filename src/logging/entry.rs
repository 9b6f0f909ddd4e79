//! Log entry types
//!
//! Entries are plain data: once stored they hold no live handles, so a whole
//! namespace log can be serialized with serde and read back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form structured data attached to an entry
pub type ExtraData = serde_json::Map<String, Value>;

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }
}

/// A single stored log entry
///
/// The error variant only ever carries the parsed projection of an error,
/// never the raw error value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum LogEntry {
    Info {
        #[serde(rename = "msg")]
        message: String,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        time: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<ExtraData>,
    },
    Error {
        #[serde(rename = "msg")]
        message: String,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        time: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<ExtraData>,
    },
}

impl LogEntry {
    /// Create an info entry stamped with the current time
    pub fn info(message: impl Into<String>, data: Option<ExtraData>) -> Self {
        LogEntry::Info {
            message: message.into(),
            time: Utc::now(),
            data,
        }
    }

    /// Create an error entry stamped with the current time
    ///
    /// `error` must already be the parsed form.
    pub fn error(
        message: impl Into<String>,
        error: Option<Value>,
        data: Option<ExtraData>,
    ) -> Self {
        LogEntry::Error {
            message: message.into(),
            time: Utc::now(),
            error,
            data,
        }
    }

    pub fn level(&self) -> LogLevel {
        match self {
            LogEntry::Info { .. } => LogLevel::Info,
            LogEntry::Error { .. } => LogLevel::Error,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LogEntry::Info { message, .. } | LogEntry::Error { message, .. } => message,
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        match self {
            LogEntry::Info { time, .. } | LogEntry::Error { time, .. } => *time,
        }
    }

    pub fn data(&self) -> Option<&ExtraData> {
        match self {
            LogEntry::Info { data, .. } | LogEntry::Error { data, .. } => data.as_ref(),
        }
    }

    /// Parsed error, if this is an error entry that carried one
    pub fn error_value(&self) -> Option<&Value> {
        match self {
            LogEntry::Info { .. } => None,
            LogEntry::Error { error, .. } => error.as_ref(),
        }
    }

    /// Extra fields shown beneath the header when printing, in display order
    pub fn extra_fields(&self) -> Vec<(&'static str, Value)> {
        let mut fields = Vec::new();
        if let Some(data) = self.data() {
            fields.push(("data", Value::Object(data.clone())));
        }
        if let Some(error) = self.error_value() {
            fields.push(("error", error.clone()));
        }
        fields
    }
}
