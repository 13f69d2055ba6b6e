//! Field path addresses.
//!
//! Parses path strings such as `body[_key=="a1"].children[0].text` into a
//! [`PathAddress`] and renders addresses back into their canonical form.
//!
//! Grammar, informally:
//!
//! - `name`: a property (any run of characters other than `.`, `[` and `]`)
//! - `[3]`, `[-1]`: an array position, negative positions count from the end
//! - `[1:3]`, `[:2]`, `[2:]`: an index range, for read paths only
//! - `[_key=="a1"]`: the array element whose `_key` equals `a1`
//! - `['odd-name']`: a property whose name is not a plain identifier
//!
//! Properties are separated by `.`; bracket groups attach directly to the
//! previous segment (`tags[0]`), although `tags.[0]` is accepted too.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One step of a [`PathAddress`].
///
/// Serializes as a single-key object: `{"property": "title"}`,
/// `{"index": -1}`, `{"indexRange": [1, null]}` or `{"keyMatch": "a1"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathSegment {
    /// Object field access.
    Property(String),
    /// Array position; negative values count from the end.
    Index(i64),
    /// Array slice with optional bounds.
    IndexRange(Option<i64>, Option<i64>),
    /// Array element whose `_key` attribute equals the given key.
    KeyMatch(String),
}

impl PathSegment {
    /// Create a property segment.
    pub fn property(name: impl Into<String>) -> Self {
        PathSegment::Property(name.into())
    }

    /// Create a key-match segment.
    pub fn key(key: impl Into<String>) -> Self {
        PathSegment::KeyMatch(key.into())
    }
}

/// A malformed path string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path '{input}' at offset {offset}: {reason}")]
pub struct PathSyntaxError {
    /// The rejected input, verbatim.
    pub input: String,
    /// Byte offset where parsing failed.
    pub offset: usize,
    /// What was wrong.
    pub reason: String,
}

/// A parsed, never-empty field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathAddress {
    segments: Vec<PathSegment>,
}

impl PathAddress {
    /// Parse a path string.
    pub fn parse(input: &str) -> Result<Self, PathSyntaxError> {
        PathScanner::new(input).scan()
    }

    /// Build an address from segments. Fails on an empty segment list.
    pub fn from_segments(segments: Vec<PathSegment>) -> Result<Self, PathSyntaxError> {
        if segments.is_empty() {
            return Err(PathSyntaxError {
                input: String::new(),
                offset: 0,
                reason: "a path needs at least one segment".to_string(),
            });
        }
        Ok(Self { segments })
    }

    /// Single-property address.
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Property(name.into())],
        }
    }

    /// The segments of this path, in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments (always at least one).
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The final segment.
    pub fn last(&self) -> &PathSegment {
        // Non-empty by construction.
        &self.segments[self.segments.len() - 1]
    }

    /// Everything but the final segment, or `None` for single-segment paths.
    pub fn parent(&self) -> Option<PathAddress> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// A new address with `segment` appended.
    pub fn join(&self, segment: PathSegment) -> PathAddress {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Whether the path can address a single write location (no ranges).
    pub fn is_write_path(&self) -> bool {
        !self
            .segments
            .iter()
            .any(|s| matches!(s, PathSegment::IndexRange(..)))
    }
}

impl FromStr for PathAddress {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_segments(&self.segments))
    }
}

impl Serialize for PathAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PathAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PathAddress::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Render a segment list in canonical form. An empty list renders as `""`.
pub fn format_segments(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        match segment {
            PathSegment::Property(name) if is_plain_name(name) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathSegment::Property(name) => {
                out.push_str("['");
                push_escaped(&mut out, name, '\'');
                out.push_str("']");
            }
            PathSegment::Index(n) => {
                out.push('[');
                out.push_str(&n.to_string());
                out.push(']');
            }
            PathSegment::IndexRange(from, to) => {
                out.push('[');
                if let Some(from) = from {
                    out.push_str(&from.to_string());
                }
                out.push(':');
                if let Some(to) = to {
                    out.push_str(&to.to_string());
                }
                out.push(']');
            }
            PathSegment::KeyMatch(key) => {
                out.push_str("[_key==\"");
                push_escaped(&mut out, key, '"');
                out.push_str("\"]");
            }
        }
    }
    out
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| !matches!(c, '.' | '[' | ']' | '\'' | '"' | '\\') && !c.is_whitespace())
}

fn push_escaped(out: &mut String, raw: &str, quote: char) {
    for c in raw.chars() {
        if c == quote || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Single-pass scanner over a path string.
struct PathScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> PathScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn scan(mut self) -> Result<PathAddress, PathSyntaxError> {
        if self.input.is_empty() {
            return Err(self.error("empty path"));
        }

        let mut segments = Vec::new();
        // True at the start and right after a '.'.
        let mut expect_segment = true;
        let mut after_dot = false;

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    if expect_segment {
                        return Err(self.error("unexpected '.'"));
                    }
                    self.advance();
                    expect_segment = true;
                    after_dot = true;
                }
                '[' => {
                    segments.push(self.scan_bracket()?);
                    expect_segment = false;
                    after_dot = false;
                }
                ']' => return Err(self.error("unexpected ']'")),
                _ => {
                    if !expect_segment {
                        return Err(self.error("expected '.' or '[' before property name"));
                    }
                    segments.push(PathSegment::Property(self.scan_name()));
                    expect_segment = false;
                    after_dot = false;
                }
            }
        }

        if after_dot {
            return Err(self.error("path ends with '.'"));
        }

        PathAddress::from_segments(segments).map_err(|_| self.error("empty path"))
    }

    fn scan_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '.' | '[' | ']') {
                break;
            }
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    fn scan_bracket(&mut self) -> Result<PathSegment, PathSyntaxError> {
        let open = self.pos;
        self.advance();
        let start = self.pos;
        let mut quote: Option<char> = None;

        loop {
            let Some(c) = self.peek() else {
                return Err(if quote.is_some() {
                    self.error_at(open, "unterminated quote")
                } else {
                    self.error_at(open, "unterminated '['")
                });
            };
            match (quote, c) {
                (Some(_), '\\') => {
                    self.advance();
                    if self.peek().is_none() {
                        return Err(self.error_at(open, "unterminated quote"));
                    }
                    self.advance();
                }
                (Some(q), c) if c == q => {
                    quote = None;
                    self.advance();
                }
                (Some(_), _) => self.advance(),
                (None, '"') | (None, '\'') => {
                    quote = Some(c);
                    self.advance();
                }
                (None, ']') => break,
                (None, _) => self.advance(),
            }
        }

        let content = &self.input[start..self.pos];
        // Consume the closing bracket.
        self.advance();

        classify_bracket(content.trim()).ok_or_else(|| {
            self.error_at(open, &format!("malformed bracket expression '[{}]'", content))
        })
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, reason: &str) -> PathSyntaxError {
        self.error_at(self.pos, reason)
    }

    fn error_at(&self, offset: usize, reason: &str) -> PathSyntaxError {
        PathSyntaxError {
            input: self.input.to_string(),
            offset,
            reason: reason.to_string(),
        }
    }
}

/// Interpret the content of a bracket group.
fn classify_bracket(content: &str) -> Option<PathSegment> {
    if let Some(rest) = content.strip_prefix("_key") {
        let rest = rest.trim_start().strip_prefix("==")?.trim_start();
        return unquote(rest).map(PathSegment::KeyMatch);
    }

    if content.starts_with('"') || content.starts_with('\'') {
        return unquote(content).map(PathSegment::Property);
    }

    if let Some((from, to)) = content.split_once(':') {
        return Some(PathSegment::IndexRange(
            parse_bound(from.trim())?,
            parse_bound(to.trim())?,
        ));
    }

    parse_integer(content).map(PathSegment::Index)
}

fn parse_bound(raw: &str) -> Option<Option<i64>> {
    if raw.is_empty() {
        return Some(None);
    }
    parse_integer(raw).map(Some)
}

fn parse_integer(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Strip matching quotes and resolve backslash escapes. The whole input must
/// be a single quoted string.
fn unquote(raw: &str) -> Option<String> {
    let mut chars = raw.chars();
    let quote = chars.next().filter(|c| *c == '"' || *c == '\'')?;
    let mut out = String::new();
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            // Nothing may follow the closing quote.
            return chars.next().is_none().then_some(out);
        } else {
            out.push(c);
        }
    }
    None
}
