//! Document - the live, rope-backed text of one file.
//!
//! A [`Document`] owns its text and every [`SpanId`] created against it. All
//! text mutation goes through [`Document::replace`], which keeps tracked spans
//! in step with the text.

use std::sync::atomic::{AtomicU64, Ordering};

use ropey::Rope;

use crate::edit::Edit;
use crate::error::{EditError, Result};
use crate::indent::is_indent_char;
use crate::range::{CharIdx, CharLen, TextRange};
use crate::span::{SpanId, SpanTable};

/// Counter for generating unique document IDs.
static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

impl DocumentId {
	/// Generates a new unique document ID.
	pub fn next() -> Self {
		Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
	}
}

/// Text content plus the spans tracking it.
#[derive(Debug)]
pub struct Document {
	id: DocumentId,
	content: Rope,
	spans: SpanTable,
	/// Incremented on every replacement.
	version: u64,
}

impl Document {
	/// Creates a document holding `text`.
	pub fn new(text: &str) -> Self {
		Self {
			id: DocumentId::next(),
			content: Rope::from_str(text),
			spans: SpanTable::new(),
			version: 0,
		}
	}

	/// Returns the document's id.
	pub fn id(&self) -> DocumentId {
		self.id
	}

	/// Returns the document version.
	pub fn version(&self) -> u64 {
		self.version
	}

	/// Returns a reference to the document's text content.
	pub fn content(&self) -> &Rope {
		&self.content
	}

	/// Returns the whole text as a `String`.
	pub fn text(&self) -> String {
		self.content.to_string()
	}

	/// Returns the text inside `range`.
	pub fn slice(&self, range: TextRange) -> Result<String> {
		self.check_range(range)?;
		Ok(self.content.slice(range.start..range.end).to_string())
	}

	/// Text length in characters.
	pub fn len_chars(&self) -> CharLen {
		self.content.len_chars()
	}

	/// Number of lines, including the empty line after a trailing newline.
	pub fn line_count(&self) -> usize {
		self.content.len_lines()
	}

	/// Zero-based line containing `offset`.
	pub fn line_of_offset(&self, offset: CharIdx) -> Result<usize> {
		self.check_range(TextRange::empty(offset))?;
		Ok(self.content.char_to_line(offset))
	}

	/// Offset of the first character of `line`.
	pub fn line_start(&self, line: usize) -> CharIdx {
		self.content.line_to_char(line.min(self.content.len_lines().saturating_sub(1)))
	}

	/// The spaces and tabs opening the line that contains `offset`.
	pub fn line_indent(&self, offset: CharIdx) -> Result<String> {
		let line = self.line_of_offset(offset)?;
		let start = self.line_start(line);
		Ok(self.content.chars_at(start).take_while(|&c| is_indent_char(c)).collect())
	}

	/// Replaces `range` with `text` and remaps every live span.
	///
	/// # Errors
	///
	/// Returns [`EditError::OutOfBounds`] if the range reaches past the text.
	pub fn replace(&mut self, range: TextRange, text: &str) -> Result<Edit> {
		self.check_range(range)?;

		if !range.is_empty() {
			self.content.remove(range.start..range.end);
		}
		if !text.is_empty() {
			self.content.insert(range.start, text);
		}

		let edit = Edit::new(range, text.chars().count());
		self.spans.apply_edit(&edit);
		self.version = self.version.wrapping_add(1);
		Ok(edit)
	}

	/// Inserts `text` at `offset`.
	pub fn insert(&mut self, offset: CharIdx, text: &str) -> Result<Edit> {
		self.replace(TextRange::empty(offset), text)
	}

	/// Removes the text in `range`.
	pub fn delete(&mut self, range: TextRange) -> Result<Edit> {
		self.replace(range, "")
	}

	/// Starts tracking `range`.
	pub fn create_span(&mut self, range: TextRange) -> Result<SpanId> {
		self.check_range(range)?;
		Ok(self.spans.insert(range))
	}

	/// Current range of a span, or `None` once invalidated or disposed.
	pub fn span_range(&self, id: SpanId) -> Option<TextRange> {
		self.spans.get(id)
	}

	/// Like [`span_range`](Self::span_range), but distinguishes a disposed span.
	pub fn try_span_range(&self, id: SpanId) -> Result<Option<TextRange>> {
		if !self.spans.contains(id) {
			return Err(EditError::UnknownSpan(id));
		}
		Ok(self.spans.get(id))
	}

	/// Stops tracking a span. Disposing twice is harmless.
	pub fn dispose_span(&mut self, id: SpanId) -> bool {
		self.spans.remove(id)
	}

	/// Number of spans that have not been disposed.
	pub fn live_span_count(&self) -> usize {
		self.spans.len()
	}

	/// Replaces the whole text, invalidating spans the way a full edit would.
	pub fn set_text(&mut self, text: &str) -> Result<Edit> {
		self.replace(TextRange::new(0, self.len_chars()), text)
	}

	fn check_range(&self, range: TextRange) -> Result<()> {
		if range.start > range.end {
			return Err(EditError::InvertedRange {
				start: range.start,
				end: range.end,
			});
		}
		let len = self.len_chars();
		if range.end > len {
			return Err(EditError::OutOfBounds {
				start: range.start,
				end: range.end,
				len,
			});
		}
		Ok(())
	}
}
