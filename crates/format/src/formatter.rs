//! Seams to the formatting engines.
//!
//! The scheduler decides *where* to format; a [`Formatter`] decides *how*.
//! Formatters receive the requested ranges and may only rewrite whitespace
//! inside them. When [`FormatRanges::extend_to_context`] is set they may read
//! the enclosing nodes from [`FormatRanges::context_ranges`] to decide on
//! layout.

use reflow_primitives::{CharLen, IndentOptions, TextRange};
use reflow_syntax::{NodeId, SyntaxTree};

use crate::error::Result;
use crate::file::FileView;

/// One requested range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRange {
	pub range: TextRange,
	/// The whitespace directly in front of `range` may be rewritten too.
	pub with_leading_whitespace: bool,
}

/// Ranges handed to a formatter in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatRanges {
	entries: Vec<FormatRange>,
	extend_to_context: bool,
}

impl FormatRanges {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, range: TextRange, with_leading_whitespace: bool) {
		self.entries.push(FormatRange {
			range,
			with_leading_whitespace,
		});
	}

	pub fn entries(&self) -> &[FormatRange] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn extend_to_context(&self) -> bool {
		self.extend_to_context
	}

	pub fn set_extend_to_context(&mut self, extend: bool) {
		self.extend_to_context = extend;
	}

	/// Copy in which empty leading-whitespace ranges cover one character, so
	/// the formatter has a token to anchor on.
	pub fn ensure_non_empty(&self, text_len: CharLen) -> Self {
		let entries = self
			.entries
			.iter()
			.map(|entry| {
				let range = entry.range;
				if entry.with_leading_whitespace && range.is_empty() && range.start < text_len {
					FormatRange {
						range: TextRange::new(range.start, range.start + 1),
						..*entry
					}
				} else {
					*entry
				}
			})
			.collect();
		Self {
			entries,
			extend_to_context: self.extend_to_context,
		}
	}

	/// Each range widened to the smallest composite node enclosing it, or the
	/// raw ranges when context extension is off.
	pub fn context_ranges(&self, tree: &SyntaxTree) -> Vec<TextRange> {
		self.entries
			.iter()
			.map(|entry| {
				if self.extend_to_context {
					enclosing_composite(tree, entry.range)
				} else {
					entry.range
				}
			})
			.collect()
	}

	/// Returns true if a formatter may rewrite the whitespace run `ws`.
	///
	/// A run is editable when it lies inside a range, or when it ends exactly
	/// where a leading-whitespace range starts.
	pub fn allows_whitespace_edit(&self, ws: TextRange) -> bool {
		self.entries.iter().any(|entry| {
			let r = entry.range;
			let inside = r.start <= ws.start && ws.end <= r.end;
			let leading = entry.with_leading_whitespace && ws.end == r.start;
			inside || leading
		})
	}
}

fn enclosing_composite(tree: &SyntaxTree, range: TextRange) -> TextRange {
	let mut node = tree.root_node();
	let mut node_start = 0;
	'descend: loop {
		let mut offset = node_start;
		for child in node.children() {
			let child_range = TextRange::at(offset, child.text_len());
			if !child.is_leaf() && child_range.contains_range(&range) {
				node = child;
				node_start = offset;
				continue 'descend;
			}
			offset = child_range.end;
		}
		return TextRange::at(node_start, node.text_len());
	}
}

/// Settings passed to a formatter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatContext {
	pub indent: IndentOptions,
	/// Whether documentation comments may be reflowed.
	pub format_doc_comments: bool,
}

/// The engine that rewrites whitespace inside requested ranges.
pub trait Formatter: Send + Sync {
	/// Formats `ranges` of `file`, editing it through
	/// [`FileView::replace_text`].
	fn format(&self, file: &mut FileView, ranges: &FormatRanges, ctx: &FormatContext) -> Result<()>;
}

/// A formatter mandated for some files in place of the built-in one.
///
/// It receives the raw ranges, without context extension or empty-range
/// widening.
pub trait ExternalFormatter: Formatter {
	fn applies_to(&self, file: &FileView) -> bool;
}

/// Supplies ranges that reindentation must leave alone, such as the body of a
/// raw string.
pub trait DisabledIndentRanges: Send + Sync {
	fn disabled_ranges(&self, file: &FileView, node: NodeId) -> Vec<TextRange>;
}
