//! # Width-Limited YAML Emitter
//!
//! Renders a canonical payload as block-style YAML whose lines stay within a
//! configured width. Scalar quoting is delegated to `serde_yaml`; a string
//! that would overrun the width is re-emitted as a double-quoted scalar
//! folded at single spaces, which YAML reads back as the same string.
//!
//! Sequences are written indentless under their key, matching the layout
//! `serde_yaml` produces:
//!
//! ```yaml
//! sector:
//! - ENERGY
//! - TRANSPORT
//! ```

use std::fmt::Write as _;

use serde_yaml::{Mapping, Value};

use crate::error::StoreError;

/// Default maximum line width.
pub const DEFAULT_WIDTH: usize = 78;

/// Smallest accepted width.
pub const MIN_WIDTH: usize = 20;

/// Block-style YAML emitter with a line-width limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emitter {
    width: usize,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
        }
    }
}

impl Emitter {
    /// Emitter wrapping at `width` columns.
    pub fn new(width: usize) -> Result<Self, StoreError> {
        if width < MIN_WIDTH {
            return Err(StoreError::InvalidWidth(width));
        }
        Ok(Self { width })
    }

    /// The configured width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Render `doc` as a YAML document with a trailing newline.
    ///
    /// Lines exceed the width only where a single token is itself too long,
    /// such as a URL or a word without spaces.
    pub fn emit(&self, doc: &Mapping) -> Result<String, StoreError> {
        let mut out = String::new();
        if doc.is_empty() {
            out.push_str("{}\n");
        } else {
            self.mapping(doc, 0, &mut out)?;
        }
        Ok(out)
    }

    fn mapping(&self, map: &Mapping, indent: usize, out: &mut String) -> Result<(), StoreError> {
        let pad = " ".repeat(indent);
        for (key, value) in map {
            let prefix = format!("{pad}{}:", render_key(key)?);
            match value {
                Value::Mapping(inner) if !inner.is_empty() => {
                    out.push_str(&prefix);
                    out.push('\n');
                    self.mapping(inner, indent + 2, out)?;
                }
                Value::Sequence(items) if !items.is_empty() => {
                    out.push_str(&prefix);
                    out.push('\n');
                    self.sequence(items, indent, out)?;
                }
                _ => {
                    let column = prefix.chars().count() + 1;
                    let text = self.scalar(value, column, indent + 2)?;
                    let _ = writeln!(out, "{prefix} {text}");
                }
            }
        }
        Ok(())
    }

    fn sequence(&self, items: &[Value], indent: usize, out: &mut String) -> Result<(), StoreError> {
        let pad = " ".repeat(indent);
        for item in items {
            // Nested collections render one level deeper; their first line's
            // indentation is then replaced by the item marker.
            let mut nested = String::new();
            match item {
                Value::Mapping(inner) if !inner.is_empty() => {
                    self.mapping(inner, indent + 2, &mut nested)?;
                }
                Value::Sequence(inner) if !inner.is_empty() => {
                    self.sequence(inner, indent + 2, &mut nested)?;
                }
                _ => {
                    let text = self.scalar(item, indent + 2, indent + 2)?;
                    let _ = writeln!(out, "{pad}- {text}");
                    continue;
                }
            }
            out.push_str(&pad);
            out.push_str("- ");
            out.push_str(&nested[indent + 2..]);
        }
        Ok(())
    }

    /// Render a scalar starting at `column`; folded lines continue at `continuation`.
    fn scalar(&self, value: &Value, column: usize, continuation: usize) -> Result<String, StoreError> {
        match value {
            Value::Mapping(_) => Ok("{}".to_string()),
            Value::Sequence(_) => Ok("[]".to_string()),
            Value::Tagged(_) => Err(StoreError::Unsupported("tagged")),
            Value::String(s) => {
                let plain = render(value)?;
                let single_line = !plain.contains('\n');
                if single_line && column + plain.chars().count() <= self.width {
                    return Ok(plain);
                }
                let folded = fold_quoted(s, column, continuation, self.width);
                if single_line && !folded.contains('\n') {
                    // Nothing to fold at; keep the lighter quoting.
                    return Ok(plain);
                }
                Ok(folded)
            }
            _ => render(value),
        }
    }
}

fn render(value: &Value) -> Result<String, StoreError> {
    let text = serde_yaml::to_string(value)?;
    Ok(text.trim_end_matches('\n').to_string())
}

fn render_key(key: &Value) -> Result<String, StoreError> {
    match key {
        Value::Mapping(_) | Value::Sequence(_) => Err(StoreError::Unsupported("collection key")),
        Value::Tagged(_) => Err(StoreError::Unsupported("tagged")),
        Value::String(s) => {
            let plain = render(key)?;
            if plain.contains('\n') {
                Ok(format!("\"{}\"", escape(s)))
            } else {
                Ok(plain)
            }
        }
        _ => render(key),
    }
}

/// Double-quoted rendering of `s`, folded at single spaces so that no line
/// passes `width` unless one word is wider than the line.
fn fold_quoted(s: &str, column: usize, continuation: usize, width: usize) -> String {
    let body = escape(s);
    let words = foldable_words(&body);
    let last = words.len() - 1;
    let mut out = String::with_capacity(body.len() + 8);
    out.push('"');
    let mut line = column + 1;
    for (i, word) in words.iter().enumerate() {
        let len = word.chars().count();
        let closing = usize::from(i == last);
        if i == 0 {
            out.push_str(word);
            line += len;
        } else if line + 1 + len + closing > width {
            out.push('\n');
            out.push_str(&" ".repeat(continuation));
            out.push_str(word);
            line = continuation + len;
        } else {
            out.push(' ');
            out.push_str(word);
            line += 1 + len;
        }
    }
    out.push('"');
    out
}

/// Split at spaces whose neighbours are both non-space. A line break there
/// folds back to exactly one space; runs of spaces would not survive.
fn foldable_words(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut words = Vec::new();
    let mut start = 0;
    for i in 1..bytes.len().saturating_sub(1) {
        if bytes[i] == b' ' && bytes[i - 1] != b' ' && bytes[i + 1] != b' ' {
            words.push(&body[start..i]);
            start = i + 1;
        }
    }
    words.push(&body[start..]);
    words
}

/// Escape `s` for the body of a double-quoted YAML scalar.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\u{85}' => out.push_str("\\N"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            '\u{feff}' => out.push_str("\\uFEFF"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
