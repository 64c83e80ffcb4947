//! Property-based tests for the path tokenizer.

use proptest::prelude::*;

use super::{parse_path, PathSegment};
use crate::error::PathError;

/// Position of the item under test; references are drawn below it.
const POSITION: usize = 16;

/// Strategy for literal segment text (anything except `/` and `$`)
fn literal_strategy() -> impl Strategy<Value = PathSegment> {
    "[a-zA-Z0-9_.:?=&%-]{0,12}".prop_map(PathSegment::literal)
}

/// Strategy for reference segments pointing at earlier items
fn reference_strategy() -> impl Strategy<Value = PathSegment> {
    (0..POSITION, "[a-z_][a-z0-9_.]{0,12}")
        .prop_map(|(index, field)| PathSegment::reference(index, field))
}

fn segment_strategy() -> impl Strategy<Value = PathSegment> {
    prop_oneof![literal_strategy(), reference_strategy()]
}

fn render(segments: &[PathSegment]) -> String {
    segments.iter().map(|s| format!("/{s}")).collect()
}

proptest! {
    #[test]
    fn test_parse_recovers_constructed_segments(
        segments in prop::collection::vec(segment_strategy(), 1..8)
    ) {
        let input = render(&segments);
        let parsed = parse_path(&input, POSITION);
        prop_assert!(parsed.is_ok(), "failed to parse {}", input);
        let parsed = parsed.unwrap();
        prop_assert_eq!(parsed.segments(), segments.as_slice());
        prop_assert_eq!(parsed.to_string(), input);
    }

    #[test]
    fn test_has_reference_matches_construction(
        segments in prop::collection::vec(segment_strategy(), 1..8)
    ) {
        let input = render(&segments);
        let parsed = parse_path(&input, POSITION).unwrap();
        let expected = segments.iter().any(PathSegment::is_reference);
        prop_assert_eq!(parsed.has_reference(), expected);
    }

    #[test]
    fn test_reference_at_or_after_position_is_rejected(
        position in 0usize..32,
        offset in 0usize..32,
        field in "[a-z]{1,8}"
    ) {
        let index = position + offset;
        let input = format!("/items/${index}.{field}");
        let result = parse_path(&input, position);
        prop_assert_eq!(result, Err(PathError::ForwardReference { item: position, index }));
    }

    #[test]
    fn test_text_without_leading_slash_is_rejected(text in "[a-z0-9]{1,12}") {
        let result = parse_path(&text, 0);
        prop_assert_eq!(result, Err(PathError::InvalidFormat { item: 0 }));
    }
}
