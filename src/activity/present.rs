use std::{fmt::Display, str::FromStr};

use clap::ValueEnum;
use serde::Serialize;

use crate::utils::time::format_hhmm;

use super::Activity;

pub const DEFAULT_TEMPLATE: &str = "{icon} {label}";

const ACTIVE_ICON: &str = "●";
const INACTIVE_ICON: &str = "○";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown field {field:?} at position {position}")]
    UnknownField { field: String, position: usize },
    #[error("unclosed '{{' at position {0}")]
    Unclosed(usize),
    #[error("unexpected '}}' at position {0}, use '}}}}' for a literal brace")]
    UnexpectedClose(usize),
}

/// Values a template can refer to, computed once per rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayFields {
    pub label: String,
    pub name: String,
    pub elapsed: String,
    pub duration: String,
    pub active: bool,
}

impl From<&Activity> for DisplayFields {
    fn from(activity: &Activity) -> Self {
        Self {
            label: activity.label(),
            name: activity.name().to_string(),
            elapsed: format_hhmm(activity.time_since()),
            duration: format_hhmm(activity.duration()),
            active: activity.is_active(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Label,
    Name,
    Elapsed,
    Duration,
    Active,
    Icon,
}

impl Field {
    fn value<'a>(&self, fields: &'a DisplayFields) -> &'a str {
        match self {
            Field::Label => &fields.label,
            Field::Name => &fields.name,
            Field::Elapsed => &fields.elapsed,
            Field::Duration => &fields.duration,
            Field::Active if fields.active => "true",
            Field::Active => "false",
            Field::Icon if fields.active => ACTIVE_ICON,
            Field::Icon => INACTIVE_ICON,
        }
    }
}

impl FromStr for Field {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "label" => Ok(Field::Label),
            "name" => Ok(Field::Name),
            "elapsed" => Ok(Field::Elapsed),
            "duration" => Ok(Field::Duration),
            "active" => Ok(Field::Active),
            "icon" => Ok(Field::Icon),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
}

/// A parsed template like `{icon} {label}`. Fields are written in braces, `{{` and `}}` produce
/// literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|(_, next)| *next == '{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek().is_some_and(|(_, next)| *next == '}') => {
                    chars.next();
                    text.push('}');
                }
                '}' => return Err(TemplateError::UnexpectedClose(position)),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => name.push(c),
                            None => return Err(TemplateError::Unclosed(position)),
                        }
                    }
                    let field = name
                        .trim()
                        .parse::<Field>()
                        .map_err(|_| TemplateError::UnknownField {
                            field: name.clone(),
                            position,
                        })?;
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Field(field));
                }
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, fields: &DisplayFields) -> String {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Field(field) => output.push_str(field.value(fields)),
            }
        }
        output.trim().to_string()
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::parse(s)
    }
}

impl Default for Template {
    fn default() -> Self {
        Self {
            segments: vec![
                Segment::Field(Field::Icon),
                Segment::Text(" ".into()),
                Segment::Field(Field::Label),
            ],
        }
    }
}

/// Predefined output styles, used when a template isn't needed.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Style {
    Label,
    Name,
    Json,
}

impl Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Style::Label => write!(f, "label"),
            Style::Name => write!(f, "name"),
            Style::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Style(Style),
    Template(Template),
}

/// Renders `activity` in the requested output.
pub fn format(activity: &Activity, output: &Output) -> String {
    let fields = DisplayFields::from(activity);
    match output {
        Output::Style(Style::Label) => fields.label,
        Output::Style(Style::Name) => fields.name,
        // Serializing strings and bools can't fail
        Output::Style(Style::Json) => serde_json::to_string(&fields).unwrap_or_default(),
        Output::Template(template) => template.render(&fields),
    }
}

/// Parses `template` and renders `activity` with it.
pub fn format_with(activity: &Activity, template: &str) -> Result<String, TemplateError> {
    Ok(format(activity, &Output::Template(Template::parse(template)?)))
}
