//! Error values and the parsers that turn them into plain data
//!
//! A logged error is never stored as-is. The logger's current [`ErrorParser`]
//! projects it into a `serde_json::Value` first, so stored entries stay safe to
//! serialize.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::entry::ExtraData;

/// Correlation header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation header carrying the trace id
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Fields the default parser copies from an error, when present
pub const ERROR_FIELDS: &[&str] = &[
    "status",
    "code",
    "message",
    "stack",
    "details",
    "debug",
    "traceId",
    "requestId",
];

/// Response attached to an error raised by an HTTP client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorResponse {
    pub status: Option<u16>,
    pub data: Option<Value>,
    pub headers: Option<HashMap<String, String>>,
}

/// A thrown error: message, stack text, and any named fields it carries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorObject {
    pub message: String,
    pub stack: String,
    pub fields: ExtraData,
    pub response: Option<ErrorResponse>,
}

impl ErrorObject {
    /// Create an error with a message and a one-frame stack
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            stack: format!("Error: {}", message),
            message,
            fields: ExtraData::new(),
            response: None,
        }
    }

    /// Capture a Rust error; the `source()` chain becomes the stack text
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let message = error.to_string();
        let mut stack = format!("Error: {}", message);
        let mut source = error.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }

        Self {
            message,
            stack,
            fields: ExtraData::new(),
            response: None,
        }
    }

    /// Attach a named field such as `status` or `requestId`
    ///
    /// `message` and `stack` replace the error's own text rather than being
    /// stored as extra fields; non-string values are rendered as JSON.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            "message" => self.message = value_text(value),
            "stack" => self.stack = value_text(value),
            _ => {
                self.fields.insert(key, value);
            }
        }
        self
    }

    pub fn with_response(mut self, response: ErrorResponse) -> Self {
        self.response = Some(response);
        self
    }

    /// Look up a field by name, including `message` and `stack`
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "message" => Some(Value::String(self.message.clone())),
            "stack" => Some(Value::String(self.stack.clone())),
            _ => self.fields.get(key).cloned(),
        }
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Anything passed where an error is expected
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorLike {
    /// A real error value
    Error(ErrorObject),
    /// Data that is already plain; parsers pass it through
    Plain(Value),
}

impl ErrorLike {
    /// Wrap a Rust error
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        ErrorLike::Error(ErrorObject::from_error(error))
    }
}

impl From<ErrorObject> for ErrorLike {
    fn from(error: ErrorObject) -> Self {
        ErrorLike::Error(error)
    }
}

impl From<Value> for ErrorLike {
    fn from(value: Value) -> Self {
        ErrorLike::Plain(value)
    }
}

impl From<&anyhow::Error> for ErrorLike {
    fn from(error: &anyhow::Error) -> Self {
        let error: &(dyn std::error::Error + Send + Sync + 'static) = error.as_ref();
        ErrorLike::from_error(error)
    }
}

/// Shared error parsing strategy
///
/// Parsers are expected to be total. A panicking parser unwinds into the
/// caller of `log_error`.
#[derive(Clone)]
pub struct ErrorParser(Arc<dyn Fn(&ErrorLike) -> Value + Send + Sync>);

impl ErrorParser {
    pub fn new<F>(parse: F) -> Self
    where
        F: Fn(&ErrorLike) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(parse))
    }

    pub fn parse(&self, error: &ErrorLike) -> Value {
        (self.0)(error)
    }

    /// Whether both handles share the same parser function
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ErrorParser {
    fn default() -> Self {
        DefaultErrorParser::default().into_parser()
    }
}

impl fmt::Debug for ErrorParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorParser(..)")
    }
}

/// Built-in parser: copies [`ERROR_FIELDS`] and a trimmed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultErrorParser {
    correlation_headers: Vec<String>,
}

impl DefaultErrorParser {
    /// Create a parser keeping only the given response headers
    pub fn with_headers<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            correlation_headers: headers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn parse(&self, error: &ErrorLike) -> Value {
        let error = match error {
            ErrorLike::Error(error) => error,
            ErrorLike::Plain(value) => return value.clone(),
        };

        let mut parsed = Map::new();
        for field in ERROR_FIELDS {
            if let Some(value) = error.field(field) {
                parsed.insert((*field).to_string(), value);
            }
        }

        if let Some(response) = &error.response {
            parsed.insert("response".to_string(), self.trim_response(response));
        }

        Value::Object(parsed)
    }

    fn trim_response(&self, response: &ErrorResponse) -> Value {
        let mut trimmed = Map::new();
        if let Some(status) = response.status {
            trimmed.insert("status".to_string(), Value::from(status));
        }
        if let Some(data) = &response.data {
            trimmed.insert("data".to_string(), data.clone());
        }
        if let Some(headers) = &response.headers {
            trimmed.insert(
                "headers".to_string(),
                Value::Object(self.pick_headers(headers)),
            );
        }
        Value::Object(trimmed)
    }

    fn pick_headers(&self, headers: &HashMap<String, String>) -> Map<String, Value> {
        let mut picked = Map::new();
        for wanted in &self.correlation_headers {
            // An exact-case name wins; otherwise the smallest matching name,
            // so the choice never depends on map iteration order.
            let found = headers
                .get(wanted)
                .filter(|value| !value.is_empty())
                .or_else(|| {
                    headers
                        .iter()
                        .filter(|(name, value)| {
                            name.eq_ignore_ascii_case(wanted) && !value.is_empty()
                        })
                        .min_by(|a, b| a.0.cmp(b.0))
                        .map(|(_, value)| value)
                });
            if let Some(value) = found {
                picked.insert(wanted.clone(), Value::String(value.clone()));
            }
        }
        picked
    }

    /// Wrap this parser as a shareable strategy
    pub fn into_parser(self) -> ErrorParser {
        ErrorParser::new(move |error| self.parse(error))
    }
}

impl Default for DefaultErrorParser {
    fn default() -> Self {
        Self::with_headers([REQUEST_ID_HEADER, TRACE_ID_HEADER])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection reset")
        }
    }

    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("request failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_from_error_renders_source_chain() {
        let error = ErrorObject::from_error(&Outer(Inner));
        assert_eq!(error.message, "request failed");
        assert_eq!(
            error.stack,
            "Error: request failed\n    caused by: connection reset"
        );
    }

    #[test]
    fn test_default_parser_copies_allowed_fields() {
        let error = ErrorObject::new("boom")
            .with_field("status", 500)
            .with_field("requestId", "req-1")
            .with_field("secret", "hunter2");

        let parsed = DefaultErrorParser::default().parse(&error.into());

        assert_eq!(parsed["message"], "boom");
        assert_eq!(parsed["stack"], "Error: boom");
        assert_eq!(parsed["status"], 500);
        assert_eq!(parsed["requestId"], "req-1");
        assert!(parsed.get("secret").is_none());
        assert!(parsed.get("response").is_none());
    }

    #[test]
    fn test_default_parser_trims_response_headers() {
        let mut headers = HashMap::new();
        headers.insert("X-Request-Id".to_string(), "abc".to_string());
        headers.insert("x-trace-id".to_string(), String::new());
        headers.insert("set-cookie".to_string(), "session=1".to_string());

        let error = ErrorObject::new("bad gateway").with_response(ErrorResponse {
            status: Some(502),
            data: Some(json!({"reason": "upstream"})),
            headers: Some(headers),
        });

        let parsed = DefaultErrorParser::default().parse(&error.into());

        assert_eq!(
            parsed["response"],
            json!({
                "status": 502,
                "data": {"reason": "upstream"},
                "headers": {"x-request-id": "abc"},
            })
        );
    }

    #[test]
    fn test_header_pick_is_deterministic() {
        let mut headers = HashMap::new();
        headers.insert("X-Request-Id".to_string(), "upper".to_string());
        headers.insert("x-request-id".to_string(), "exact".to_string());
        headers.insert("X-TRACE-ID".to_string(), "shout".to_string());
        headers.insert("X-Trace-Id".to_string(), "title".to_string());

        let error = ErrorObject::new("x").with_response(ErrorResponse {
            headers: Some(headers),
            ..ErrorResponse::default()
        });

        for _ in 0..10 {
            let parsed = DefaultErrorParser::default().parse(&error.clone().into());
            assert_eq!(
                parsed["response"]["headers"],
                json!({"x-request-id": "exact", "x-trace-id": "shout"})
            );
        }
    }

    #[test]
    fn test_with_field_message_and_stack_replace_text() {
        let error = ErrorObject::new("boom")
            .with_field("message", "replaced")
            .with_field("stack", "Error: replaced\n    at job")
            .with_field("code", 7);

        assert_eq!(error.message, "replaced");
        assert!(error.fields.get("message").is_none());
        assert!(error.fields.get("stack").is_none());

        let parsed = DefaultErrorParser::default().parse(&error.into());
        assert_eq!(parsed["message"], "replaced");
        assert_eq!(parsed["stack"], "Error: replaced\n    at job");
        assert_eq!(parsed["code"], 7);
    }

    #[test]
    fn test_default_parser_response_without_headers() {
        let error = ErrorObject::new("teapot").with_response(ErrorResponse {
            status: Some(418),
            ..ErrorResponse::default()
        });

        let parsed = DefaultErrorParser::default().parse(&error.into());
        assert_eq!(parsed["response"], json!({"status": 418}));
    }

    #[test]
    fn test_default_parser_custom_headers() {
        let mut headers = HashMap::new();
        headers.insert("x-correlation-id".to_string(), "c-9".to_string());
        headers.insert("x-request-id".to_string(), "r-1".to_string());

        let parser = DefaultErrorParser::with_headers(["x-correlation-id"]);
        let error = ErrorObject::new("x").with_response(ErrorResponse {
            headers: Some(headers),
            ..ErrorResponse::default()
        });

        let parsed = parser.parse(&error.into());
        assert_eq!(
            parsed["response"]["headers"],
            json!({"x-correlation-id": "c-9"})
        );
    }

    #[test]
    fn test_plain_values_pass_through() {
        let value = json!({"already": "plain"});
        let parsed = DefaultErrorParser::default().parse(&ErrorLike::Plain(value.clone()));
        assert_eq!(parsed, value);

        let parsed = DefaultErrorParser::default().parse(&ErrorLike::Plain(json!("text")));
        assert_eq!(parsed, json!("text"));
    }

    #[test]
    fn test_anyhow_error_conversion() {
        let error = anyhow::Error::new(Inner).context("while syncing");
        let error = ErrorLike::from(&error);

        match error {
            ErrorLike::Error(error) => {
                assert_eq!(error.message, "while syncing");
                assert!(error.stack.contains("caused by: connection reset"));
            }
            ErrorLike::Plain(_) => panic!("expected an error object"),
        }
    }

    #[test]
    fn test_error_parser_closure_and_identity() {
        let parser = ErrorParser::new(|_| json!({"tag": "custom"}));
        let same = parser.clone();
        let other = ErrorParser::default();

        assert_eq!(
            parser.parse(&ErrorObject::new("x").into()),
            json!({"tag": "custom"})
        );
        assert!(parser.ptr_eq(&same));
        assert!(!parser.ptr_eq(&other));
    }
}
