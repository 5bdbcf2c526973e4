//! Core text types for postponed formatting: ranges, edits, tracked spans,
//! documents, and indentation arithmetic.

/// Rope-backed document text with tracked spans.
pub mod document;
/// Edit shapes and position mapping.
pub mod edit;
/// Text buffer error types.
pub mod error;
/// Indentation width and fill helpers.
pub mod indent;
/// Char-offset text ranges.
pub mod range;
/// Span storage that follows text edits.
pub mod span;

pub use document::{Document, DocumentId};
pub use edit::{Bias, Edit};
pub use error::EditError;
pub use indent::{IndentOptions, indent_runs};
pub use range::{CharIdx, CharLen, TextRange};
pub use ropey::{Rope, RopeSlice};
pub use span::{SpanId, SpanTable};
