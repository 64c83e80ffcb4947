//! Path templates for batch sub-requests.
//!
//! A sub-request path is a sequence of `/`-separated segments. A segment of
//! the form `$<N>.<field>` refers to `<field>` in the result of item `N`,
//! which must be an earlier item in the batch. Any other segment is literal.
//!
//! ```text
//! /users/$0.id/profile
//!  └┬──┘ └──┬──┘ └─┬───┘
//! literal reference literal
//! ```

mod parser;
#[cfg(test)]
mod parser_proptest;
mod types;

pub use parser::{parse_batch, parse_path};
pub use types::{ParsedPath, PathSegment};
