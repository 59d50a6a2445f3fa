//! Dotted field paths and their resolution against a message schema.
//!
//! A flatten path such as `detail.inner.note` or `tags[0]` names a field
//! reachable from a request message. Each segment is a field name, optionally
//! followed by a literal `[0]`; any other index is rejected, as is indexing
//! more than one segment of the same path.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::schema::{FieldKind, FieldSchema, MessageSchema, SchemaIndex};

/// One `name` or `name[0]` segment of a [`FlattenPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    /// Proto field name.
    pub name: String,
    /// Explicit element index; only `Some(0)` can be constructed by parsing.
    pub index: Option<u32>,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{i}]", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A parsed, validated dotted field path. Always has at least one segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlattenPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl FlattenPath {
    /// Parse a dotted path.
    ///
    /// A segment is an index only when it has the exact shape
    /// `name[digits]` with a non-empty name; anything else (`tags[x]`,
    /// `[0]`) is kept verbatim as a field name and will fail to resolve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedIndex`] for an index other than `0`, or
    /// for a second indexed segment.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut indexed = false;

        for part in raw.split('.') {
            let segment = match split_index(part) {
                Some((name, literal)) => {
                    if !literal.bytes().all(|b| b == b'0') || indexed {
                        return Err(Error::UnsupportedIndex {
                            path: raw.to_string(),
                            index: literal.to_string(),
                        });
                    }
                    indexed = true;
                    PathSegment {
                        name: name.to_string(),
                        index: Some(0),
                    }
                }
                None => PathSegment {
                    name: part.to_string(),
                    index: None,
                },
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// All segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments (the path's depth).
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; present for API symmetry with [`len`](Self::len).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment, which names the flattened field itself.
    #[must_use]
    pub fn terminal(&self) -> &PathSegment {
        &self.segments[self.segments.len() - 1]
    }

    /// The first `depth` segments as a new path.
    #[must_use]
    pub fn prefix(&self, depth: usize) -> Self {
        let segments = self.segments[..depth.min(self.segments.len())].to_vec();
        Self {
            raw: join(&segments),
            segments,
        }
    }

    /// Dot-joined key of the first `depth` segments (`""` for depth 0).
    #[must_use]
    pub fn key(&self, depth: usize) -> String {
        join(&self.segments[..depth.min(self.segments.len())])
    }
}

impl FromStr for FlattenPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FlattenPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn join(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split `name[digits]` into `(name, digits)`.
fn split_index(part: &str) -> Option<(&str, &str)> {
    let inner = part.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let (name, literal) = (&inner[..open], &inner[open + 1..]);
    if name.is_empty() || literal.is_empty() || !literal.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((name, literal))
}

/// A field reached by walking a [`FlattenPath`].
#[derive(Debug, Clone, Copy)]
pub struct ResolvedField<'a> {
    /// The field named by the final segment.
    pub field: &'a FieldSchema,
    /// The message that declares it.
    pub message: &'a MessageSchema,
    /// Position of `field` inside `message.fields`.
    pub field_index: usize,
    /// Index carried by the final segment (`Some(0)` for `tags[0]`).
    pub index: Option<u32>,
}

/// Walk `path` from `root`, one field per segment.
///
/// # Errors
///
/// - [`Error::FieldNotFound`] if a segment names no field of the current message
/// - [`Error::NonTraversableType`] if a non-final segment is not a message
///   field resolvable in `index` (scalars and enums stop traversal; a map
///   field descends into its entry message)
pub fn resolve<'a>(
    index: &'a SchemaIndex,
    root: &'a MessageSchema,
    path: &FlattenPath,
) -> Result<ResolvedField<'a>> {
    resolve_segments(index, root, path.segments(), path.as_str())
}

/// Parse `path` and [`resolve`] it in one step.
///
/// # Errors
///
/// Any error of [`FlattenPath::parse`] or [`resolve`].
pub fn resolve_str<'a>(
    index: &'a SchemaIndex,
    root: &'a MessageSchema,
    path: &str,
) -> Result<ResolvedField<'a>> {
    resolve(index, root, &FlattenPath::parse(path)?)
}

fn resolve_segments<'a>(
    index: &'a SchemaIndex,
    message: &'a MessageSchema,
    segments: &[PathSegment],
    full_path: &str,
) -> Result<ResolvedField<'a>> {
    let Some((first, rest)) = segments.split_first() else {
        return Err(Error::FieldNotFound {
            message: message.name.clone(),
            field: String::new(),
        });
    };

    let (field_index, field) =
        message
            .field(&first.name)
            .ok_or_else(|| Error::FieldNotFound {
                message: message.name.clone(),
                field: first.name.clone(),
            })?;

    if rest.is_empty() {
        return Ok(ResolvedField {
            field,
            message,
            field_index,
            index: first.index,
        });
    }

    let next = traverse(index, field, full_path)?;
    resolve_segments(index, next, rest, full_path)
}

/// The message a path descends into through `field`.
pub(crate) fn traverse<'a>(
    index: &'a SchemaIndex,
    field: &FieldSchema,
    full_path: &str,
) -> Result<&'a MessageSchema> {
    let stop = |reason: String| Error::NonTraversableType {
        path: full_path.to_string(),
        field: field.name.clone(),
        reason,
    };

    match &field.kind {
        FieldKind::Message(name) => index
            .message(name)
            .map_err(|_| stop(format!("message type '{name}' is not in the schema"))),
        FieldKind::Enum(name) => Err(stop(format!("enum '{name}' has no fields"))),
        FieldKind::Primitive(kind) => Err(stop(format!("{kind:?} scalar has no fields"))),
        FieldKind::Unsupported(id) => Err(stop(format!("wire type {id} has no fields"))),
    }
}
