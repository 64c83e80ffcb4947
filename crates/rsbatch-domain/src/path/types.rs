//! Parsed path representation.

use std::fmt;

/// One `/`-separated segment of a sub-request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Text copied into the resolved path as-is.
    Literal { value: String },
    /// A field of an earlier item's result, substituted at execution time.
    Reference { index: usize, field: String },
}

impl PathSegment {
    pub fn literal(value: impl Into<String>) -> Self {
        PathSegment::Literal {
            value: value.into(),
        }
    }

    pub fn reference(index: usize, field: impl Into<String>) -> Self {
        PathSegment::Reference {
            index,
            field: field.into(),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, PathSegment::Reference { .. })
    }
}

/// Renders the segment in template syntax, without the leading `/`.
impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Literal { value } => f.write_str(value),
            PathSegment::Reference { index, field } => write!(f, "${index}.{field}"),
        }
    }
}

/// The ordered segments of one sub-request path.
///
/// `to_string()` reproduces the template the path was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPath {
    segments: Vec<PathSegment>,
}

impl ParsedPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true if any segment refers to another item's result.
    ///
    /// Items with references run after every independent item has finished.
    pub fn has_reference(&self) -> bool {
        self.segments.iter().any(PathSegment::is_reference)
    }

    /// Indices of the items this path refers to, in segment order.
    pub fn referenced_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            PathSegment::Reference { index, .. } => Some(*index),
            PathSegment::Literal { .. } => None,
        })
    }
}

impl fmt::Display for ParsedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
