//! Error types for text buffer operations.

use thiserror::Error;

use crate::range::{CharIdx, CharLen};
use crate::span::SpanId;

/// Errors produced when editing a [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
	/// The requested range reaches past the end of the text.
	#[error("range {start}..{end} is out of bounds for text of length {len}")]
	OutOfBounds {
		/// Start of the rejected range.
		start: CharIdx,
		/// End of the rejected range.
		end: CharIdx,
		/// Current text length.
		len: CharLen,
	},

	/// The range start is after its end.
	#[error("inverted range {start}..{end}")]
	InvertedRange {
		/// Start of the rejected range.
		start: CharIdx,
		/// End of the rejected range.
		end: CharIdx,
	},

	/// The span was never created by this document or was already disposed.
	#[error("unknown span {0:?}")]
	UnknownSpan(SpanId),
}

/// Result type for text buffer operations.
pub type Result<T> = std::result::Result<T, EditError>;
