//! # Path Traversal
//!
//! Walks a `serde_json::Value` tree using the path notations schema
//! validators emit:
//!
//! - dotted: `a.b.c`, with an optional leading dot (`.a.b`)
//! - bracketed: `items[2].name`, `['odd.key']`, `["x"]`
//! - JSON Pointer (RFC 6901): `/items/2/name`, with `~1` and `~0` escapes
//!
//! Missing intermediate nodes are not an error: [`get`] returns `None`.

use serde_json::Value;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member name.
    Key(String),
    /// Array position.
    Index(usize),
}

impl PathSegment {
    fn from_token(token: String) -> Self {
        match token.parse::<usize>() {
            Ok(index) => PathSegment::Index(index),
            Err(_) => PathSegment::Key(token),
        }
    }
}

/// Parse a dotted, bracketed or JSON-pointer path into segments.
///
/// Empty segments (from a leading separator or `a..b`) are skipped.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    if path.starts_with('/') {
        return path
            .split('/')
            .skip(1)
            .filter(|token| !token.is_empty())
            .map(|token| PathSegment::from_token(unescape_pointer_token(token)))
            .collect();
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => flush(&mut current, &mut segments),
            '[' => {
                flush(&mut current, &mut segments);
                match chars.peek().copied() {
                    Some(quote @ ('\'' | '"')) => {
                        chars.next();
                        let mut key = String::new();
                        while let Some(inner) = chars.next() {
                            if inner == quote && chars.peek() == Some(&']') {
                                chars.next();
                                break;
                            }
                            key.push(inner);
                        }
                        segments.push(PathSegment::Key(key));
                    }
                    _ => {
                        let mut token = String::new();
                        for inner in chars.by_ref() {
                            if inner == ']' {
                                break;
                            }
                            token.push(inner);
                        }
                        if !token.is_empty() {
                            segments.push(PathSegment::from_token(token));
                        }
                    }
                }
            }
            other => current.push(other),
        }
    }
    flush(&mut current, &mut segments);
    segments
}

fn flush(current: &mut String, segments: &mut Vec<PathSegment>) {
    if !current.is_empty() {
        segments.push(PathSegment::from_token(std::mem::take(current)));
    }
}

/// Undo RFC 6901 escaping for one pointer token.
pub fn unescape_pointer_token(token: &str) -> String {
    if !token.contains('~') {
        return token.to_string();
    }
    token.replace("~1", "/").replace("~0", "~")
}

/// Look up the value at `path` inside `target`.
///
/// Returns `None` as soon as a step cannot be taken: a missing member, an
/// out-of-range index, or descending into a scalar. Numeric segments index
/// arrays and also match object members spelled as digits.
pub fn get<'a>(target: &'a Value, path: &str) -> Option<&'a Value> {
    parse_path(path)
        .into_iter()
        .try_fold(target, |node, segment| match (node, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(&key),
            (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string()),
            (Value::Array(items), PathSegment::Index(index)) => items.get(index),
            _ => None,
        })
}
