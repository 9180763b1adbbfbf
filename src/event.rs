use std::error::Error;
use std::fmt;

use chrono::{DateTime, Utc};
use tracing_core::field::{Field, Visit};
use tracing_core::Event;

/// Severity of a [`LogEvent`], ordered from least to most severe.
///
/// `tracing` stops at ERROR; an ERROR event recorded with `fatal = true` is
/// captured as [`Level::Fatal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub fn name(self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }

    /// Three letter upper-case abbreviation, e.g. `INF`.
    pub fn short_name(self) -> &'static str {
        match self {
            Level::Verbose => "VRB",
            Level::Debug => "DBG",
            Level::Information => "INF",
            Level::Warning => "WRN",
            Level::Error => "ERR",
            Level::Fatal => "FTL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<tracing_core::Level> for Level {
    fn from(level: tracing_core::Level) -> Self {
        match level {
            tracing_core::Level::TRACE => Level::Verbose,
            tracing_core::Level::DEBUG => Level::Debug,
            tracing_core::Level::INFO => Level::Information,
            tracing_core::Level::WARN => Level::Warning,
            tracing_core::Level::ERROR => Level::Error,
        }
    }
}

/// A single structured log record, captured once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    timestamp: DateTime<Utc>,
    level: Level,
    message: String,
    target: String,
    properties: Vec<(String, String)>,
    exception: Option<String>,
}

impl LogEvent {
    /// Creates an event stamped with the current time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            target: String::new(),
            properties: Vec::new(),
            exception: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Captures a `tracing` event.
    ///
    /// The `message` field becomes the message, `error` and `exception`
    /// fields become the exception text, and `fatal = true` on an ERROR
    /// event raises it to [`Level::Fatal`]. Every other field is kept as a
    /// property in the order it was recorded.
    pub fn from_tracing(event: &Event<'_>) -> Self {
        let metadata = event.metadata();
        let mut log_event = LogEvent::new(Level::from(*metadata.level()), String::new())
            .with_target(metadata.target());
        event.record(&mut LogEventVisitor(&mut log_event));
        log_event
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }
}

struct LogEventVisitor<'a>(&'a mut LogEvent);

impl LogEventVisitor<'_> {
    fn record_value(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.0.message = value,
            "error" | "exception" => self.0.exception = Some(value),
            name => self.0.properties.push((name.to_string(), value)),
        }
    }
}

impl Visit for LogEventVisitor<'_> {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "fatal" {
            if value && self.0.level == Level::Error {
                self.0.level = Level::Fatal;
            }
            return;
        }
        self.record_value(field, value.to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        let mut rendered = value.to_string();
        let mut source = value.source();
        while let Some(cause) = source {
            rendered.push_str("\n  caused by: ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        match field.name() {
            "message" => self.0.message = rendered,
            _ => self.0.exception = Some(rendered),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }
}
