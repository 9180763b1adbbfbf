use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{FixedOffset, Local, Utc};

use crate::error::{ConfigError, FormatError};
use crate::event::LogEvent;

pub const DEFAULT_OUTPUT_TEMPLATE: &str =
    "{Timestamp:%Y-%m-%d %H:%M:%S%.3f %:z} [{Level}] {Message}{NewLine}{Exception}";
const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %:z";

/// Renders a single event as text, appending to `output`.
pub trait TextFormatter: Send + Sync {
    fn format(&self, event: &LogEvent, output: &mut String) -> Result<(), FormatError>;
}

/// Zone that timestamps are rendered in. Without one, the local zone is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatProvider {
    Utc,
    Offset(FixedOffset),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Timestamp(String),
    Level(LevelFormat),
    Message,
    NewLine,
    Exception,
    Properties,
    SourceContext,
    Property(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelFormat {
    Full,
    Upper,
    Lower,
    ShortUpper,
    ShortLower,
}

/// Output template such as `{Timestamp} [{Level:u3}] {Message}{NewLine}`,
/// parsed once and rendered for every event.
#[derive(Debug, Clone)]
pub struct MessageTemplateFormatter {
    tokens: Vec<Token>,
    format_provider: Option<FormatProvider>,
}

impl MessageTemplateFormatter {
    pub fn new(
        template: &str,
        format_provider: Option<FormatProvider>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            tokens: parse(template)?,
            format_provider,
        })
    }

    fn write_timestamp(
        &self,
        event: &LogEvent,
        format: &str,
        output: &mut String,
    ) -> Result<(), FormatError> {
        let timestamp = event.timestamp();
        let written = match self.format_provider {
            None => write!(output, "{}", timestamp.with_timezone(&Local).format(format)),
            Some(FormatProvider::Utc) => {
                write!(output, "{}", timestamp.with_timezone(&Utc).format(format))
            }
            Some(FormatProvider::Offset(offset)) => {
                write!(output, "{}", timestamp.with_timezone(&offset).format(format))
            }
        };
        written.map_err(|_| FormatError::Timestamp(format.to_string()))
    }
}

impl TextFormatter for MessageTemplateFormatter {
    fn format(&self, event: &LogEvent, output: &mut String) -> Result<(), FormatError> {
        for token in &self.tokens {
            match token {
                Token::Text(text) => output.push_str(text),
                Token::Timestamp(format) => self.write_timestamp(event, format, output)?,
                Token::Level(format) => {
                    let level = event.level();
                    match format {
                        LevelFormat::Full => output.push_str(level.name()),
                        LevelFormat::Upper => output.push_str(&level.name().to_uppercase()),
                        LevelFormat::Lower => output.push_str(&level.name().to_lowercase()),
                        LevelFormat::ShortUpper => output.push_str(level.short_name()),
                        LevelFormat::ShortLower => {
                            output.push_str(&level.short_name().to_lowercase())
                        }
                    }
                }
                Token::Message => output.push_str(event.message()),
                Token::NewLine => output.push('\n'),
                Token::Exception => {
                    if let Some(exception) = event.exception() {
                        output.push_str(exception);
                        if !exception.ends_with('\n') {
                            output.push('\n');
                        }
                    }
                }
                Token::Properties => {
                    output.push('{');
                    for (i, (name, value)) in event.properties().iter().enumerate() {
                        if i > 0 {
                            output.push_str(", ");
                        }
                        write!(output, "{}={}", name, value)?;
                    }
                    output.push('}');
                }
                Token::SourceContext => output.push_str(event.target()),
                Token::Property(name) => {
                    if let Some(value) = event.property(name) {
                        output.push_str(value);
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse(template: &str) -> Result<Vec<Token>, ConfigError> {
    let invalid = |offset: usize, reason: &'static str| ConfigError::InvalidTemplate {
        template: template.to_string(),
        offset,
        reason,
    };

    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                text.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut body = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    body.push(c);
                }
                if !closed {
                    return Err(invalid(offset, "unclosed property"));
                }
                if !text.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut text)));
                }
                tokens.push(parse_property(&body).map_err(|reason| invalid(offset, reason))?);
            }
            c => text.push(c),
        }
    }

    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    Ok(tokens)
}

fn parse_property(body: &str) -> Result<Token, &'static str> {
    let (name, format) = match body.split_once(':') {
        Some((name, format)) => (name, Some(format)),
        None => (body, None),
    };
    if name.is_empty() {
        return Err("empty property name");
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err("invalid property name");
    }

    let token = match name {
        "Timestamp" => {
            let format = format.unwrap_or(DEFAULT_TIMESTAMP_FORMAT);
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err("invalid timestamp format");
            }
            Token::Timestamp(format.to_string())
        }
        "Level" => Token::Level(match format {
            None => LevelFormat::Full,
            Some("u") => LevelFormat::Upper,
            Some("w") => LevelFormat::Lower,
            Some("u3") => LevelFormat::ShortUpper,
            Some("w3") => LevelFormat::ShortLower,
            Some(_) => return Err("unsupported level format"),
        }),
        "Message" => Token::Message,
        "NewLine" => Token::NewLine,
        "Exception" => Token::Exception,
        "Properties" => Token::Properties,
        "SourceContext" => Token::SourceContext,
        name => Token::Property(name.to_string()),
    };
    Ok(token)
}
