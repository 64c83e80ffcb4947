//! Tokenizer for sub-request path templates.
//!
//! The scan is a single left-to-right pass over the input:
//!
//! 1. Every segment must begin with `/`, which is consumed.
//! 2. `$<digits>.` directly after the `/` marks a reference segment.
//! 3. The segment text runs until the next `/` or `$`.
//!
//! Input left over that does not start with `/` (for example a stray `$`)
//! makes the whole path invalid.

use crate::error::{PathError, PathResult};

use super::types::{ParsedPath, PathSegment};

/// Parses the path of the item at `position` in the batch.
///
/// References must point at an item strictly before `position`.
///
/// # Errors
///
/// - [`PathError::ForwardReference`] if a reference index is `>= position`
/// - [`PathError::InvalidFormat`] if any part of the input is not a segment,
///   or the input is empty
pub fn parse_path(input: &str, position: usize) -> PathResult<ParsedPath> {
    if input.is_empty() {
        return Err(PathError::InvalidFormat { item: position });
    }

    let mut segments = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let Some(after_slash) = rest.strip_prefix('/') else {
            return Err(PathError::InvalidFormat { item: position });
        };

        let (segment, remaining) = match split_reference_prefix(after_slash) {
            Some((index, tail)) => {
                if index >= position {
                    return Err(PathError::ForwardReference {
                        item: position,
                        index,
                    });
                }
                let (field, remaining) = split_segment_text(tail);
                (PathSegment::reference(index, field), remaining)
            }
            None => {
                let (value, remaining) = split_segment_text(after_slash);
                (PathSegment::literal(value), remaining)
            }
        };

        segments.push(segment);
        rest = remaining;
    }

    Ok(ParsedPath::new(segments))
}

/// Parses every path of a batch, stopping at the first invalid one.
pub fn parse_batch<'a, I>(paths: I) -> PathResult<Vec<ParsedPath>>
where
    I: IntoIterator<Item = &'a str>,
{
    paths
        .into_iter()
        .enumerate()
        .map(|(position, path)| parse_path(path, position))
        .collect()
}

/// Splits a leading `$<digits>.` off `input`.
///
/// Returns the referenced index and the text after the `.`, or `None` if the
/// input does not start with a complete reference prefix. An index too large
/// for `usize` saturates, which always reads as a forward reference.
fn split_reference_prefix(input: &str) -> Option<(usize, &str)> {
    let body = input.strip_prefix('$')?;
    let digit_count = body.bytes().take_while(u8::is_ascii_digit).count();
    if digit_count == 0 {
        return None;
    }

    let (digits, after_digits) = body.split_at(digit_count);
    let tail = after_digits.strip_prefix('.')?;
    let index = digits.parse::<usize>().unwrap_or(usize::MAX);

    Some((index, tail))
}

/// Splits `input` at the first `/` or `$`.
fn split_segment_text(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| c == '/' || c == '$')
        .unwrap_or(input.len());
    input.split_at(end)
}
