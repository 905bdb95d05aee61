//! Output formatting
//!
//! Commands report through an [`OutputFormatter`]. Each message kind is
//! rendered to a line and a target stream; in JSON mode only documents and
//! status objects are emitted so stdout stays machine-readable.

use serde_json::{json, Value};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Kind of a reported message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message<'a> {
    Success(&'a str),
    Error(&'a str),
    Warn(&'a str),
    Info(&'a str),
    Field(&'a str, &'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Formats CLI output
pub trait OutputFormatter {
    /// Line for `message`, or `None` when this format drops it.
    fn render(&self, message: Message<'_>) -> Option<(Stream, String)>;

    /// Rendering of a structured document, or `None`.
    fn render_json(&self, value: &Value) -> Option<String>;

    fn emit(&self, message: Message<'_>) {
        match self.render(message) {
            Some((Stream::Stdout, line)) => println!("{}", line),
            Some((Stream::Stderr, line)) => eprintln!("{}", line),
            None => {}
        }
    }

    fn success(&self, message: &str) {
        self.emit(Message::Success(message));
    }

    fn error(&self, message: &str) {
        self.emit(Message::Error(message));
    }

    fn warn(&self, message: &str) {
        self.emit(Message::Warn(message));
    }

    fn info(&self, message: &str) {
        self.emit(Message::Info(message));
    }

    /// A `label: value` line
    fn field(&self, label: &str, value: &str) {
        self.emit(Message::Field(label, value));
    }

    fn print_json(&self, value: &Value) {
        if let Some(text) = self.render_json(value) {
            println!("{}", text);
        }
    }
}

/// Checkmarks and indentation for terminals
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn render(&self, message: Message<'_>) -> Option<(Stream, String)> {
        Some(match message {
            Message::Success(m) => (Stream::Stdout, format!("\u{2713} {}", m)),
            Message::Error(m) => (Stream::Stderr, format!("\u{2717} Error: {}", m)),
            Message::Warn(m) => (Stream::Stderr, format!("\u{26a0} Warning: {}", m)),
            Message::Info(m) => (Stream::Stdout, format!("  {}", m)),
            Message::Field(label, value) => {
                (Stream::Stdout, format!("  {:<14} {}", format!("{}:", label), value))
            }
        })
    }

    fn render_json(&self, _value: &Value) -> Option<String> {
        None
    }
}

/// One JSON document per line
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn render(&self, message: Message<'_>) -> Option<(Stream, String)> {
        match message {
            Message::Success(m) => Some((
                Stream::Stdout,
                json!({"success": true, "message": m}).to_string(),
            )),
            Message::Error(m) => Some((
                Stream::Stderr,
                json!({"success": false, "error": m}).to_string(),
            )),
            Message::Warn(m) => Some((
                Stream::Stderr,
                json!({"level": "warning", "message": m}).to_string(),
            )),
            Message::Info(_) | Message::Field(..) => None,
        }
    }

    fn render_json(&self, value: &Value) -> Option<String> {
        serde_json::to_string_pretty(value).ok()
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}
