//! Record formatter driven by `%(attribute)s` templates
//!
//! Templates use the percent-style attribute syntax common to logging
//! configuration files:
//!
//! ```text
//! %(asctime)s %(name)s - %(funcName)s [%(levelname)s]: %(message)s
//! ```
//!
//! Each directive is `%(attr)` followed by an optional `-` (left align), an
//! optional width, an optional `.precision`, and a conversion of `s`, `d` or
//! `f`. `%%` renders a literal percent sign. Templates are parsed once, when
//! the formatter is built, so a bad template is reported as a configuration
//! error instead of failing at emission time.

use super::error::{LoggerError, Result};
use super::record::LogRecord;
use super::timestamp::TimestampFormat;

/// Template used when neither the handler nor the logger configures one.
pub const DEFAULT_FORMAT: &str =
    "%(asctime)s %(name)s - %(funcName)s [%(levelname)s]: %(message)s";

/// Record attribute addressable from a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    AscTime,
    Created,
    FileName,
    FuncName,
    LevelName,
    LevelNo,
    LineNo,
    Message,
    Module,
    Msecs,
    Name,
    PathName,
    Process,
    Thread,
    ThreadName,
}

impl Attribute {
    fn from_name(name: &str) -> Option<Self> {
        let attr = match name {
            "asctime" => Attribute::AscTime,
            "created" => Attribute::Created,
            "filename" => Attribute::FileName,
            "funcName" => Attribute::FuncName,
            "levelname" => Attribute::LevelName,
            "levelno" => Attribute::LevelNo,
            "lineno" => Attribute::LineNo,
            "message" => Attribute::Message,
            "module" => Attribute::Module,
            "msecs" => Attribute::Msecs,
            "name" => Attribute::Name,
            "pathname" => Attribute::PathName,
            "process" => Attribute::Process,
            "thread" => Attribute::Thread,
            "threadName" => Attribute::ThreadName,
            _ => return None,
        };
        Some(attr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Str,
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        attr: Attribute,
        left_align: bool,
        width: usize,
        precision: Option<usize>,
        conversion: Conversion,
    },
}

/// Renders records into output lines
///
/// # Examples
///
/// ```
/// use rust_logutils::core::{Formatter, LogLevel, LogRecord};
///
/// let formatter = Formatter::new("[%(levelname)-8s] %(name)s: %(message)s").unwrap();
/// let record = LogRecord::new("svc.api", LogLevel::Info, "ready");
/// assert_eq!(formatter.format(&record), "[INFO    ] svc.api: ready");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    template: String,
    segments: Vec<Segment>,
    timestamp_format: TimestampFormat,
}

impl Formatter {
    /// Parse a template
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown attributes, unterminated
    /// directives or unsupported conversions.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let segments = parse(&template)?;
        Ok(Self {
            template,
            segments,
            timestamp_format: TimestampFormat::default(),
        })
    }

    /// Set the layout used for `%(asctime)s`
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// The template this formatter was built from
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }

    /// Render a record
    pub fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(self.template.len() + record.message.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    attr,
                    left_align,
                    width,
                    precision,
                    conversion,
                } => {
                    let value = self.render(*attr, *conversion, *precision, record);
                    pad_into(&mut out, &value, *width, *left_align);
                }
            }
        }
        out
    }

    fn render(
        &self,
        attr: Attribute,
        conversion: Conversion,
        precision: Option<usize>,
        record: &LogRecord,
    ) -> String {
        let number = |n: f64| match conversion {
            Conversion::Float => format!("{:.*}", precision.unwrap_or(6), n),
            Conversion::Int => format!("{}", n.trunc() as i64),
            Conversion::Str => n.to_string(),
        };

        let text = match attr {
            Attribute::AscTime => self.timestamp_format.format(&record.timestamp),
            Attribute::Created => return number(record.created()),
            Attribute::FileName => record
                .file
                .as_deref()
                .map(|path| {
                    std::path::Path::new(path)
                        .file_name()
                        .and_then(|name| name.to_str())
                        .unwrap_or(path)
                        .to_string()
                })
                .unwrap_or_else(|| "(unknown file)".to_string()),
            Attribute::FuncName => record
                .function
                .clone()
                .unwrap_or_else(|| "(unknown function)".to_string()),
            Attribute::LevelName => record.level.to_str().to_string(),
            Attribute::LevelNo => return number(f64::from(record.level.value())),
            Attribute::LineNo => return number(f64::from(record.line.unwrap_or(0))),
            Attribute::Message => record.message.clone(),
            Attribute::Module => record
                .module_path
                .as_deref()
                .and_then(|path| path.rsplit("::").next())
                .unwrap_or("(unknown module)")
                .to_string(),
            Attribute::Msecs => {
                return number(f64::from(record.timestamp.timestamp_subsec_millis()))
            }
            Attribute::Name => record.logger_name.clone(),
            Attribute::PathName => record
                .file
                .clone()
                .unwrap_or_else(|| "(unknown file)".to_string()),
            Attribute::Process => return number(f64::from(record.process_id)),
            Attribute::Thread => record.thread_id.clone(),
            Attribute::ThreadName => record
                .thread_name
                .clone()
                .unwrap_or_else(|| record.thread_id.clone()),
        };

        match (conversion, precision) {
            (Conversion::Str, Some(max)) => text.chars().take(max).collect(),
            _ => text,
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            template: DEFAULT_FORMAT.to_string(),
            segments: parse(DEFAULT_FORMAT).unwrap_or_default(),
            timestamp_format: TimestampFormat::default(),
        }
    }
}

fn pad_into(out: &mut String, value: &str, width: usize, left_align: bool) {
    let len = value.chars().count();
    if len >= width {
        out.push_str(value);
    } else if left_align {
        out.push_str(value);
        out.push_str(&" ".repeat(width - len));
    } else {
        out.push_str(&" ".repeat(width - len));
        out.push_str(value);
    }
}

fn invalid(template: &str, message: impl std::fmt::Display) -> LoggerError {
    LoggerError::config("format", format!("{} in template '{}'", message, template))
}

fn parse(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        match chars.next() {
            Some((_, '%')) => literal.push('%'),
            Some((start, '(')) => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, ')')) => break,
                        Some((_, ch)) => name.push(ch),
                        None => {
                            return Err(invalid(
                                template,
                                format!("unterminated directive at offset {}", start - 1),
                            ))
                        }
                    }
                }
                let attr = Attribute::from_name(&name)
                    .ok_or_else(|| invalid(template, format!("unknown attribute '{}'", name)))?;

                let left_align = chars.next_if(|(_, ch)| *ch == '-').is_some();
                let width = take_number(&mut chars, template, "width")?.unwrap_or(0);
                let precision = if chars.next_if(|(_, ch)| *ch == '.').is_some() {
                    Some(take_number(&mut chars, template, "precision")?.unwrap_or(0))
                } else {
                    None
                };
                let conversion = match chars.next() {
                    Some((_, 's')) => Conversion::Str,
                    Some((_, 'd')) => Conversion::Int,
                    Some((_, 'f')) => Conversion::Float,
                    Some((_, other)) => {
                        return Err(invalid(
                            template,
                            format!("unsupported conversion '{}' for '{}'", other, name),
                        ))
                    }
                    None => {
                        return Err(invalid(
                            template,
                            format!("missing conversion for '{}'", name),
                        ))
                    }
                };

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field {
                    attr,
                    left_align,
                    width,
                    precision,
                    conversion,
                });
            }
            Some((offset, other)) => {
                return Err(invalid(
                    template,
                    format!("stray '%{}' at offset {}", other, offset - 1),
                ))
            }
            None => return Err(invalid(template, "trailing '%'")),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Largest width or precision a directive may ask for
pub const MAX_FIELD_WIDTH: usize = 4096;

fn take_number(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    template: &str,
    what: &str,
) -> Result<Option<usize>> {
    let mut digits = String::new();
    while let Some((_, ch)) = chars.next_if(|(_, ch)| ch.is_ascii_digit()) {
        digits.push(ch);
    }
    if digits.is_empty() {
        return Ok(None);
    }
    match digits.parse::<usize>() {
        Ok(n) if n <= MAX_FIELD_WIDTH => Ok(Some(n)),
        _ => Err(invalid(
            template,
            format!("{} {} exceeds the maximum of {}", what, digits, MAX_FIELD_WIDTH),
        )),
    }
}
