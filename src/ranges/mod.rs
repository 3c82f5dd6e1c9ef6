//! Source ranges: the [`TextRange`] value, attaching ranges to parsed nodes,
//! and mapping ranges back to nodes and text.

mod annotate;
mod locate;
mod text_range;

pub use annotate::{mark_text_ranges, mark_text_ranges_bytes, parse_source, AnnotateError};
pub use locate::{extract_text_range, find_expression, find_expression_from, ExtractError};
pub use text_range::TextRange;
