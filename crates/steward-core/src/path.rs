use crate::error::{Result, StewardError};
use serde_json::{Map, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// PathSegment / Path
// ---------------------------------------------------------------------------

/// One selector in a field path: a map key or a list index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// An ordered sequence of field selectors used to descend into a document.
///
/// Parsed from dotted text: `status.conditions.0.type` selects the `type`
/// key of the first element of `status.conditions`. A segment made entirely
/// of digits is a list index; everything else is a map key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    raw: String,
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(StewardError::InvalidPath {
                path: text.to_string(),
                reason: "empty path".to_string(),
            });
        }
        let mut segments = Vec::new();
        for part in text.split('.') {
            if part.is_empty() {
                return Err(StewardError::InvalidPath {
                    path: text.to_string(),
                    reason: "empty segment".to_string(),
                });
            }
            if part.bytes().all(|b| b.is_ascii_digit()) {
                // overflow on an absurd index is still just an invalid path
                let index = part.parse::<usize>().map_err(|e| StewardError::InvalidPath {
                    path: text.to_string(),
                    reason: e.to_string(),
                })?;
                segments.push(PathSegment::Index(index));
            } else {
                segments.push(PathSegment::Key(part.to_string()));
            }
        }
        Ok(Self {
            raw: text.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Resolve against a document root. Any selector that does not apply
    /// (missing key, index out of range, or a scalar where a container is
    /// expected) yields `None` rather than an error; the `exists` and
    /// `not_exists` operators are defined precisely for that case.
    pub fn resolve<'a>(&self, root: &'a Map<String, Value>) -> Option<&'a Value> {
        let mut iter = self.segments.iter();
        let mut current = match iter.next()? {
            PathSegment::Key(key) => root.get(key)?,
            PathSegment::Index(_) => return None,
        };
        for segment in iter {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
