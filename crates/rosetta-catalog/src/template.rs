//! Mapping templates.
//!
//! Template text is target-notation source with three kinds of holes:
//!
//! - `{{name}}` - replaced by the binding `name`
//! - `{{name|default}}` - replaced by `name`, or `default` when unbound
//! - `{{@name}}` - a name the template introduces; renamed on collision
//!
//! Templates are parsed once at catalog load so malformed text fails early.

use crate::TemplateSyntaxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Placeholder {
        name: String,
        default: Option<String>,
    },
    Fresh(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateSyntaxError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let start = offset + open;
            let after = &rest[open + 2..];
            let close = after
                .find("}}")
                .ok_or(TemplateSyntaxError::Unterminated(start))?;
            segments.push(parse_hole(&after[..close], start)?);

            let consumed = open + 2 + close + 2;
            rest = &rest[consumed..];
            offset += consumed;
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of bound placeholders, in order of appearance (may repeat).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Names the template introduces, in order of appearance (may repeat).
    pub fn fresh_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Fresh(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

fn parse_hole(inner: &str, offset: usize) -> Result<Segment, TemplateSyntaxError> {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return Err(TemplateSyntaxError::Empty(offset));
    }

    if let Some(fresh) = trimmed.strip_prefix('@') {
        let name = fresh.trim();
        check_name(name, offset)?;
        return Ok(Segment::Fresh(name.to_string()));
    }

    let (name, default) = match inner.split_once('|') {
        Some((name, default)) => (name.trim(), Some(default.to_string())),
        None => (trimmed, None),
    };
    check_name(name, offset)?;
    Ok(Segment::Placeholder {
        name: name.to_string(),
        default,
    })
}

fn check_name(name: &str, offset: usize) -> Result<(), TemplateSyntaxError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TemplateSyntaxError::InvalidName {
            name: name.to_string(),
            offset,
        })
    }
}
